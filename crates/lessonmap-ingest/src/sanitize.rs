//! Content cleanup applied before anything is sent to the model.

use sha2::{Digest, Sha256};

/// Trim, drop Private Use Area characters (PDF extraction artifacts) and
/// collapse every whitespace run to a single space.
pub fn sanitize_content(content: &str) -> String {
    content
        .split_whitespace()
        .map(|word| word.chars().filter(|c| !is_private_use(*c)).collect::<String>())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_private_use(c: char) -> bool {
    ('\u{E000}'..='\u{F8FF}').contains(&c)
}

/// Compute SHA-256 content hash.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
