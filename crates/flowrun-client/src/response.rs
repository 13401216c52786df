//! Response classification and JSON field access.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::transport::RawResponse;

/// Classify a response and return its JSON body.
///
/// Any status >= 400 becomes [`Error::Api`] carrying the body's `detail`
/// (preferred) or `message` field, or the raw body when neither is present.
pub fn parse(response: &RawResponse) -> Result<Value> {
    if response.status >= 400 {
        return Err(Error::Api {
            status: response.status,
            message: error_detail(&response.body),
        });
    }

    let value: Value = serde_json::from_str(&response.body)?;
    if !value.is_object() {
        return Err(Error::Protocol(format!(
            "expected a JSON object, got: {}",
            response.body
        )));
    }
    Ok(value)
}

fn error_detail(body: &str) -> String {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };

    match fields.get("detail").or_else(|| fields.get("message")) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => body.to_string(),
    }
}

/// Required string at a JSON pointer (e.g. `/state/type`).
pub fn required_str<'a>(value: &'a Value, pointer: &str) -> Result<&'a str> {
    optional_str(value, pointer)?
        .ok_or_else(|| Error::Protocol(format!("missing field '{}'", field_name(pointer))))
}

/// Optional string at a JSON pointer; missing and `null` both map to `None`.
pub fn optional_str<'a>(value: &'a Value, pointer: &str) -> Result<Option<&'a str>> {
    match value.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(Error::Protocol(format!(
            "field '{}' should be a string, got: {}",
            field_name(pointer),
            other
        ))),
    }
}

/// `/state/type` -> `state.type`
fn field_name(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}
