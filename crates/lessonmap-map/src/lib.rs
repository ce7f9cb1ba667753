//! LessonMap Map: the mind-map tree model and the engine that repairs,
//! merges and normalizes model-generated trees.

pub mod extract;
pub mod merge;
pub mod normalize;
pub mod types;

pub use extract::{extract_json_object, repair_json};
pub use merge::{merge_mindmaps, MergeOptions};
pub use normalize::{post_process, post_process_value, NormalizeOptions};
pub use types::*;
