//! Sentence-aware text chunking for per-chunk generation.
//!
//! Windows are measured in characters, not bytes, so Arabic lessons get the
//! same window length as English ones. A window is cut after the last
//! sentence terminator it contains unless that would throw away more than 40%
//! of the window, in which case it is cut at the hard limit.

use std::iter::FusedIterator;

/// Characters that end a sentence for boundary search.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '\n'];
/// A boundary cut must keep more than this share of the window.
const MIN_KEPT_RATIO: f64 = 0.6;

/// Lazy iterator over overlapping, trimmed windows of a text.
pub struct ChunkSplitter<'a> {
    text: &'a str,
    size: usize,
    overlap: usize,
    /// Byte offset of the next window; `None` once exhausted.
    next_start: Option<usize>,
}

impl<'a> ChunkSplitter<'a> {
    /// Split `text` into windows of `size` characters overlapping by
    /// `overlap` characters. A `size` of 0 yields the whole text once.
    pub fn new(text: &'a str, size: usize, overlap: usize) -> Self {
        Self {
            text,
            size,
            overlap,
            next_start: Some(0),
        }
    }

    fn window_end(&self, start: usize) -> usize {
        let rest = &self.text[start..];
        let hard_end = start + byte_offset_after_chars(rest, self.size);
        let window = &self.text[start..hard_end];

        match window.rfind(SENTENCE_TERMINATORS) {
            Some(pos) => {
                let kept_chars = window[..pos].chars().count() + 1;
                if kept_chars as f64 > self.size as f64 * MIN_KEPT_RATIO {
                    // Terminators are single-byte ASCII.
                    start + pos + 1
                } else {
                    hard_end
                }
            }
            None => hard_end,
        }
    }

    fn overlapped_start(&self, end: usize) -> usize {
        if self.overlap == 0 {
            return end;
        }
        self.text[..end]
            .char_indices()
            .rev()
            .take(self.overlap)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }
}

impl<'a> Iterator for ChunkSplitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let start = self.next_start?;

            if self.size == 0 {
                self.next_start = None;
                return Some(self.text);
            }
            if start >= self.text.len() {
                self.next_start = None;
                return None;
            }

            let end = self.window_end(start);
            let chunk = self.text[start..end].trim();

            self.next_start = if end >= self.text.len() {
                None
            } else {
                let candidate = self.overlapped_start(end);
                // Always move forward, even when the overlap swallows the window.
                Some(if candidate > start { candidate } else { end })
            };

            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
    }
}

impl FusedIterator for ChunkSplitter<'_> {}

/// Byte offset just past the first `chars` characters of `s` (or `s.len()`).
fn byte_offset_after_chars(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map(|(i, _)| i).unwrap_or(s.len())
}

/// Whether `text` is longer than one chunk window.
pub fn needs_chunking(text: &str, size: usize) -> bool {
    size > 0 && text.chars().count() > size
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str, size: usize, overlap: usize) -> Vec<&str> {
        ChunkSplitter::new(text, size, overlap).collect()
    }

    #[test]
    fn test_zero_size_returns_whole_text() {
        let text = "  Anything goes. Really.  ";
        assert_eq!(split(text, 0, 10), vec![text]);
    }

    #[test]
    fn test_short_text_single_chunk() {
        assert_eq!(split("Hello, world!", 1800, 250), vec!["Hello, world!"]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        assert!(split("", 100, 10).is_empty());
        assert!(split("     ", 100, 10).is_empty());
    }

    #[test]
    fn test_hard_cuts_without_terminators() {
        let text = "a".repeat(100);
        let chunks = split(&text, 30, 10);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        assert_eq!(chunks[4].len(), 20);
    }

    #[test]
    fn test_cuts_at_sentence_boundary() {
        let text = "This is short. Then a much longer tail without any stops at all";
        let chunks = split(text, 20, 0);
        assert_eq!(chunks[0], "This is short.");
    }

    #[test]
    fn test_ignores_boundary_that_drops_too_much() {
        let text = format!("Hi. {}", "a".repeat(40));
        let chunks = split(&text, 20, 0);
        assert_eq!(chunks[0].chars().count(), 20);
        assert!(chunks[0].starts_with("Hi. a"));
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let text = "b".repeat(50);
        let chunks = split(&text, 20, 5);
        // starts at 0, 15, 30
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 20);
    }

    #[test]
    fn test_overlap_larger_than_window_still_terminates() {
        let text = "c".repeat(100);
        let chunks = split(&text, 10, 50);
        assert_eq!(chunks.len(), 10);
    }

    #[test]
    fn test_multibyte_windows_are_char_sized() {
        let text = "ط".repeat(45);
        let chunks = split(&text, 20, 0);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 20);
        assert_eq!(chunks[2].chars().count(), 5);
    }

    #[test]
    fn test_covers_whole_text() {
        let sentence = "Plants convert light into chemical energy. ";
        let text = sentence.repeat(60);
        let chunks = split(&text, 300, 50);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.ends_with('.')));
        assert!(text.trim_end().ends_with(chunks.last().unwrap()));
    }

    #[test]
    fn test_needs_chunking() {
        assert!(!needs_chunking("short", 1800));
        assert!(needs_chunking(&"x".repeat(1801), 1800));
        assert!(!needs_chunking(&"x".repeat(5000), 0));
    }
}
