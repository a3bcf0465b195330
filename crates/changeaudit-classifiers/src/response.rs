//! Parsing model replies into verdicts
//!
//! Replies are tried as bare JSON first. Free-text replies (typical of hosted
//! models) are searched for the first embedded `{...}` block that parses as a
//! JSON object; braces in the surrounding prose are skipped.

use changeaudit_core::{AlignedPair, Error, Result, Verdict};
use regex::Regex;
use serde_json::{Map, Value};

/// Extracts verdicts from raw model text
#[derive(Debug, Clone)]
pub struct ResponseParser {
    object_start: Regex,
}

impl ResponseParser {
    /// Create a new parser
    pub fn new() -> Result<Self> {
        Ok(Self {
            object_start: Regex::new(r"\{").map_err(|e| {
                Error::internal(format!("Failed to compile object start regex: {}", e))
            })?,
        })
    }

    /// Parse a reply for `pair`, searching prose for an embedded object
    pub fn parse(&self, text: &str, pair: &AlignedPair) -> Result<Verdict> {
        let object = match direct_object(text) {
            Some(map) => map,
            None => self.embedded_object(text)?,
        };
        verdict_from_object(object, pair)
    }

    /// Parse a reply that must be a bare JSON object
    pub fn parse_json(&self, text: &str, pair: &AlignedPair) -> Result<Verdict> {
        let object = direct_object(text)
            .ok_or_else(|| Error::classification("model reply is not a JSON object"))?;
        verdict_from_object(object, pair)
    }

    /// First `{` position from which a complete JSON object can be read
    fn embedded_object(&self, text: &str) -> Result<Map<String, Value>> {
        let mut last_error = None;

        for start in self.object_start.find_iter(text) {
            let mut values =
                serde_json::Deserializer::from_str(&text[start.start()..]).into_iter::<Value>();
            match values.next() {
                Some(Ok(Value::Object(map))) => return Ok(map),
                Some(Err(e)) => last_error = Some(e),
                _ => {}
            }
        }

        Err(match last_error {
            Some(e) => Error::classification(format!("embedded JSON is malformed: {}", e)),
            None => Error::classification("no JSON object in model reply"),
        })
    }
}

fn direct_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Read a field that may be a string or a number
fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn verdict_from_object(map: Map<String, Value>, pair: &AlignedPair) -> Result<Verdict> {
    let description = text_field(&map, "description")
        .ok_or_else(|| Error::classification("model reply has no description"))?;
    let refined_q_no = text_field(&map, "refined_q_no").unwrap_or_else(|| pair.id().to_string());

    let mut verdict = Verdict::new(description, refined_q_no);
    verdict.classification = text_field(&map, "classification");
    Ok(verdict)
}
