//! Canonical JSON for hashed documents.
//!
//! Minutes are hashed as canonical JSON so the document embedded in a
//! packet re-encodes to exactly the bytes that were signed.
//!
//! ## Rules
//!
//! - No insignificant whitespace
//! - Object keys sorted by their UTF-8 bytes
//! - Strings escaped as `serde_json` escapes them
//! - Numbers rendered as `serde_json` renders them

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, Result};

/// Encode a JSON value canonically.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

/// Serialize any value to canonical JSON.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(canonical_json(&value))
}

/// Parse `bytes` and require that they are already canonical.
pub fn parse_canonical(bytes: &[u8]) -> Result<Value> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CoreError::MalformedInput(format!("document is not JSON: {}", e)))?;
    if canonical_json(&value) != bytes {
        return Err(CoreError::MalformedInput(
            "document is not canonical JSON".into(),
        ));
    }
    Ok(value)
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.as_bytes().cmp(b.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(item, out);
            }
            out.push(b'}');
        }
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    // Serializing a str cannot fail.
    if let Ok(escaped) = serde_json::to_string(s) {
        out.extend_from_slice(escaped.as_bytes());
    }
}
