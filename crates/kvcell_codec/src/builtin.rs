//! Built-in codecs for the supported value kinds.

use crate::codec::ValueCodec;
use crate::error::CodecResult;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Strings pass through storage unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ValueCodec<String> for StringCodec {
    fn encode(&self, value: &String) -> CodecResult<String> {
        Ok(value.clone())
    }

    fn decode(&self, text: &str) -> Option<String> {
        Some(text.to_string())
    }
}

/// Integers round-trip through decimal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCodec;

impl ValueCodec<i64> for IntCodec {
    fn encode(&self, value: &i64) -> CodecResult<String> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str) -> Option<i64> {
        text.parse().ok()
    }
}

/// Floats round-trip through decimal text; `NaN` decodes to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCodec;

impl ValueCodec<f64> for FloatCodec {
    fn encode(&self, value: &f64) -> CodecResult<String> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str) -> Option<f64> {
        text.parse::<f64>().ok().filter(|v| !v.is_nan())
    }
}

/// Booleans are stored as the literal text `"true"` or `"false"`; anything
/// else decodes to `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCodec;

impl ValueCodec<bool> for BoolCodec {
    fn encode(&self, value: &bool) -> CodecResult<String> {
        Ok(value.to_string())
    }

    fn decode(&self, text: &str) -> Option<bool> {
        match text {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }
}

/// Byte sequences are stored as standard base64 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesCodec;

impl ValueCodec<Vec<u8>> for BytesCodec {
    fn encode(&self, value: &Vec<u8>) -> CodecResult<String> {
        Ok(BASE64.encode(value))
    }

    fn decode(&self, text: &str) -> Option<Vec<u8>> {
        BASE64.decode(text).ok()
    }
}

/// Structured values round-trip through a JSON encoding.
///
/// The default codec for arbitrary serializable types.
#[derive(Debug)]
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Creates a JSON codec for `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> ValueCodec<T> for JsonCodec<T>
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> CodecResult<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, text: &str) -> Option<T> {
        serde_json::from_str(text).ok()
    }
}
