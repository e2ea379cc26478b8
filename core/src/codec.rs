//! Body encoding and decoding.
//!
//! JSON goes through `serde_json`; `application/x-www-form-urlencoded` bodies
//! are built here from a flat object of string values.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

pub const JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Serialize any `Serialize` value into a JSON `Value`.
///
/// Fails for values JSON cannot represent, such as maps with non-string keys.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, ClientError> {
    Ok(serde_json::to_value(value)?)
}

pub fn encode(value: &Value) -> Result<Bytes, ClientError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Decode a JSON body. An empty (or all-whitespace) body decodes to `Null`.
pub fn decode(bytes: &[u8]) -> Result<Value, ClientError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Join `key=value` pairs with `&`, in insertion order.
///
/// Values are written as-is, without percent-escaping.
pub fn encode_form(value: &Value) -> Result<Bytes, ClientError> {
    let Value::Object(map) = value else {
        return Err(form_mismatch());
    };
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        let Value::String(value) = value else {
            return Err(form_mismatch());
        };
        pairs.push(format!("{key}={value}"));
    }
    Ok(Bytes::from(pairs.join("&")))
}

/// Encode `value` for the given media type: form-urlencoded when asked for,
/// JSON otherwise.
pub fn encode_body(value: &Value, media_type: Option<&str>) -> Result<Bytes, ClientError> {
    match media_type {
        Some(FORM_URLENCODED) => encode_form(value),
        _ => encode(value),
    }
}

fn form_mismatch() -> ClientError {
    ClientError::Serialization(format!("{FORM_URLENCODED} requires key-values as string"))
}
