// SPDX-License-Identifier: MIT

//! The East value codec (`spec.md` §6.2) is an external, self-describing
//! value/type system this engine treats as opaque — we only need the four
//! operations it exposes. `spec.md` §1 puts the real `beast2`/`east`
//! formats out of scope ("an opaque codec with the operations listed in
//! §6.2"); this module is a concrete stand-in implementing that same
//! four-operation contract over `serde_json`, so the engine has something
//! to actually run end-to-end against.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded value together with its declared type name — what
/// `decodeValue`/`parseTextInferring` both hand back per `spec.md` §6.2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedValue {
    pub r#type: String,
    pub value: serde_json::Value,
}

impl TypedValue {
    pub fn new(r#type: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            r#type: r#type.into(),
            value,
        }
    }
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("binary decode failed: {0}")]
    Binary(#[from] serde_json::Error),
    #[error("text form {0:?} is not valid `type: value` east text")]
    Text(String),
    #[error("text value failed to parse: {0}")]
    TextValue(serde_json::Error),
}

/// `encodeValue`: binary (`beast2`) form.
pub fn encode_value(tv: &TypedValue) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(tv)?)
}

/// `decodeValue`: binary form back to `{type, value}`.
pub fn decode_value(bytes: &[u8]) -> Result<TypedValue, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// `encodeText`: human-readable (`east`) form, `<type>: <json value>`.
pub fn encode_text(tv: &TypedValue) -> Result<String, CodecError> {
    Ok(format!("{}: {}", tv.r#type, serde_json::to_string(&tv.value)?))
}

/// `parseTextInferring`: the text form back to `{type, value}`.
pub fn parse_text_inferring(text: &str) -> Result<TypedValue, CodecError> {
    let (r#type, value) = text
        .split_once(':')
        .ok_or_else(|| CodecError::Text(text.to_string()))?;
    let value = serde_json::from_str(value.trim()).map_err(CodecError::TextValue)?;
    Ok(TypedValue::new(r#type.trim(), value))
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
