//! Test doubles.

use std::sync::Mutex;

use futures::future::{self, BoxFuture};
use lessonmap_chat::{GenerationRequest, Generator};
use lessonmap_core::Result;

type Respond = dyn Fn(&GenerationRequest) -> Result<String> + Send + Sync;

/// Generator answering from a closure and recording every request.
pub struct FnGenerator {
    respond: Box<Respond>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FnGenerator {
    pub fn new(respond: impl Fn(&GenerationRequest) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Generator for FnGenerator {
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, Result<String>> {
        self.requests.lock().unwrap().push(request.clone());
        Box::pin(future::ready((self.respond)(request)))
    }
}

/// JSON of a root with the given children, keyed from 1.
pub fn tree_json(root: &str, children: &[&str]) -> String {
    let mut nodes = vec![format!(r#"{{"key": 0, "text": "{}"}}"#, root)];
    for (i, child) in children.iter().enumerate() {
        nodes.push(format!(r#"{{"key": {}, "parent": 0, "text": "{}"}}"#, i + 1, child));
    }
    format!(r#"{{"class": "go.TreeModel", "nodeDataArray": [{}]}}"#, nodes.join(", "))
}
