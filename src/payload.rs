//! JSON request decoding and response encoding.
//!
//! Output uses `", "` and `": "` separators so the calling pipeline sees the
//! same byte layout for success lists and error envelopes.

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;
use std::io;

use crate::error::{Result, SubtransError};

pub const INVALID_JSON: &str = "Invalid JSON payload";
pub const EXPECTED_LIST: &str = "Expected a list of strings";

/// `{"error": <message>}` printed on any failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
}

impl From<&SubtransError> for ErrorEnvelope {
    fn from(err: &SubtransError) -> Self {
        Self {
            error: err.to_string(),
        }
    }
}

/// Decode stdin bytes into the list of subtitle lines.
pub fn parse_payload(raw: &[u8]) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|_| SubtransError::InvalidInput(INVALID_JSON.to_string()))?;

    match value {
        Value::Array(items) => Ok(items),
        _ => Err(SubtransError::InvalidInput(EXPECTED_LIST.to_string())),
    }
}

/// Extract the text of every line. Nulls become empty strings; any other
/// non-string element rejects the whole payload.
pub fn line_texts(lines: &[Value]) -> Result<Vec<String>> {
    lines
        .iter()
        .map(|line| match line {
            Value::String(text) => Ok(text.clone()),
            Value::Null => Ok(String::new()),
            _ => Err(SubtransError::InvalidInput(EXPECTED_LIST.to_string())),
        })
        .collect()
}

/// Serializer formatter with spaced separators: `["a", "b"]`, `{"k": "v"}`
#[derive(Debug, Default, Clone, Copy)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Render any serializable value with [`SpacedFormatter`]. Non-ASCII text is
/// written literally.
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, SpacedFormatter);
    value.serialize(&mut serializer)?;

    String::from_utf8(buffer)
        .map_err(|e| SubtransError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Render the error envelope for `err`.
pub fn render_error(err: &SubtransError) -> String {
    let envelope = ErrorEnvelope::from(err);
    render(&envelope).unwrap_or_else(|_| format!("{{\"error\": {:?}}}", envelope.error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_array() {
        let lines = parse_payload(br#"["hello", null, "world"]"#).unwrap();
        assert_eq!(lines, vec![json!("hello"), Value::Null, json!("world")]);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_payload(b"not a json array").unwrap_err();
        assert_eq!(err.to_string(), INVALID_JSON);
    }

    #[test]
    fn test_parse_rejects_empty_and_non_utf8_input() {
        assert_eq!(parse_payload(b"").unwrap_err().to_string(), INVALID_JSON);
        assert_eq!(parse_payload(&[0xff, 0xfe, b'[']).unwrap_err().to_string(), INVALID_JSON);
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse_payload(br#"{"a": 1}"#).unwrap_err();
        assert_eq!(err.to_string(), EXPECTED_LIST);
        assert_eq!(parse_payload(b"\"just a string\"").unwrap_err().to_string(), EXPECTED_LIST);
    }

    #[test]
    fn test_line_texts_maps_null_to_empty() {
        let texts = line_texts(&[json!("a"), Value::Null, json!("")]).unwrap();
        assert_eq!(texts, vec!["a".to_string(), String::new(), String::new()]);
    }

    #[test]
    fn test_line_texts_rejects_numbers_and_objects() {
        assert!(line_texts(&[json!("a"), json!(3)]).is_err());
        assert!(line_texts(&[json!({"text": "a"})]).is_err());
    }

    #[test]
    fn test_render_uses_spaced_separators() {
        assert_eq!(render(&json!(["hello", "world"])).unwrap(), r#"["hello", "world"]"#);
        assert_eq!(render(&json!([])).unwrap(), "[]");
        assert_eq!(
            render(&json!([{"b": 1, "a": [true, null]}])).unwrap(),
            r#"[{"b": 1, "a": [true, null]}]"#
        );
    }

    #[test]
    fn test_render_keeps_non_ascii_literal() {
        assert_eq!(render(&json!(["こんにちは", "café"])).unwrap(), r#"["こんにちは", "café"]"#);
    }

    #[test]
    fn test_render_error_envelope() {
        let err = SubtransError::InvalidInput(INVALID_JSON.to_string());
        assert_eq!(render_error(&err), r#"{"error": "Invalid JSON payload"}"#);
    }

    #[test]
    fn test_render_round_trips_object_key_order() {
        let lines = parse_payload(br#"[{"z": 1, "a": 2}]"#).unwrap();
        assert_eq!(render(&lines).unwrap(), r#"[{"z": 1, "a": 2}]"#);
    }
}
