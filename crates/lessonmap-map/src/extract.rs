//! JSON extraction and repair for model output.
//!
//! Model replies wrap the object in prose or code fences, get truncated
//! mid-string, leave trailing commas or emit Python literals. Extraction
//! tries progressively more permissive strategies and only accepts a JSON
//! object.

use lessonmap_core::{Error, Result};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
enum Strategy {
    Strict,
    Collapsed,
    Repaired,
    RepairedCollapsed,
}

impl Strategy {
    const ALL: [Strategy; 4] = [
        Strategy::Strict,
        Strategy::Collapsed,
        Strategy::Repaired,
        Strategy::RepairedCollapsed,
    ];
}

/// Pull the first JSON object out of a model reply.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(text);
    let Some(candidate) = slice_object(cleaned) else {
        return Err(Error::parse("no JSON object found", cleaned));
    };
    let collapsed = collapse_whitespace(candidate);

    for strategy in Strategy::ALL {
        let attempt = match strategy {
            Strategy::Strict => parse_object(candidate),
            Strategy::Collapsed => parse_object(&collapsed),
            Strategy::Repaired => parse_lenient(&repair_json(candidate)),
            Strategy::RepairedCollapsed => parse_lenient(&repair_json(&collapsed)),
        };
        match attempt {
            Ok(obj) => {
                debug!("Extracted JSON object with {:?} strategy", strategy);
                return Ok(obj);
            }
            Err(e) => debug!("{:?} JSON parse failed: {}", strategy, e),
        }
    }

    Err(Error::parse("all JSON extraction strategies failed", cleaned))
}

/// Remove a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after_open = &trimmed[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body = match after_open.find('\n') {
        Some(nl) if !after_open[..nl].contains('{') => &after_open[nl + 1..],
        _ => after_open.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// First `{` through last `}`, or through the end when the object was cut off.
fn slice_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    match text.rfind('}') {
        Some(end) if end > start => Some(&text[start..=end]),
        _ => Some(&text[start..]),
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_object(text: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(format!("expected an object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_lenient(text: &str) -> std::result::Result<Map<String, Value>, String> {
    parse_object(text).or_else(|strict_err| match json5::from_str::<Value>(text) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(format!("expected an object, got {}", type_name(&other))),
        Err(e) => Err(format!("{}; json5: {}", strict_err, e)),
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

struct Frame {
    closer: char,
    /// Objects only: a `:` was seen for the current member.
    seen_colon: bool,
}

/// Best-effort lexical repair of almost-JSON.
///
/// Escapes control characters and stray quotes inside strings, drops
/// trailing commas and unmatched closers, maps `True`/`False`/`None`,
/// completes a dangling member with `null` and closes whatever is still open.
pub fn repair_json(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                out.push(c);
                escaped = true;
            } else if c == '"' {
                if closes_string(&chars, i + 1) {
                    in_string = false;
                    out.push(c);
                } else {
                    out.push_str("\\\"");
                }
            } else if c.is_control() && (c as u32) < 0x20 {
                match c {
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    other => out.push_str(&format!("\\u{:04x}", other as u32)),
                }
            } else {
                out.push(c);
            }
            i += 1;
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '{' => {
                stack.push(Frame {
                    closer: '}',
                    seen_colon: false,
                });
                out.push(c);
            }
            '[' => {
                stack.push(Frame {
                    closer: ']',
                    seen_colon: false,
                });
                out.push(c);
            }
            '}' | ']' => {
                if stack.iter().any(|f| f.closer == c) {
                    // Close anything left open inside the matching container.
                    while let Some(frame) = stack.pop() {
                        finish_member(&mut out, &frame);
                        out.push(frame.closer);
                        if frame.closer == c {
                            break;
                        }
                    }
                }
            }
            ':' => {
                if let Some(frame) = stack.last_mut() {
                    frame.seen_colon = true;
                }
                out.push(c);
            }
            ',' => {
                // Collapse `,,` and `[,` into nothing.
                if !matches!(last_significant(&out), Some(',') | Some('{') | Some('[') | None) {
                    if let Some(frame) = stack.last_mut() {
                        frame.seen_colon = false;
                    }
                    out.push(c);
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    _ => word.as_str(),
                });
                continue;
            }
            _ => out.push(c),
        }
        i += 1;
    }

    if in_string {
        if escaped {
            out.pop();
        }
        out.push('"');
    }
    while let Some(frame) = stack.pop() {
        finish_member(&mut out, &frame);
        out.push(frame.closer);
    }
    out
}

/// Whether a `"` at `chars[next - 1]` ends the string: the next
/// non-whitespace character is structural (or the input ends).
fn closes_string(chars: &[char], next: usize) -> bool {
    chars[next..]
        .iter()
        .find(|c| !c.is_whitespace())
        .map_or(true, |c| matches!(c, ',' | '}' | ']' | ':'))
}

fn last_significant(out: &str) -> Option<char> {
    out.chars().rev().find(|c| !c.is_whitespace())
}

fn strip_trailing_comma(out: &mut String) -> bool {
    let trimmed_len = out.trim_end().len();
    if out[..trimmed_len].ends_with(',') {
        out.truncate(trimmed_len - 1);
        true
    } else {
        false
    }
}

/// Make the last member of a container valid before it is closed.
fn finish_member(out: &mut String, frame: &Frame) {
    if strip_trailing_comma(out) {
        return;
    }
    match last_significant(out) {
        Some(':') => out.push_str("null"),
        Some('"') if frame.closer == '}' && !frame.seen_colon => out.push_str(":null"),
        _ => {}
    }
}
