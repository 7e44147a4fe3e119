//! The codec trait and the closure-based custom codec adapter.

use crate::error::CodecResult;

/// Maps a value to and from the text form stored in the engine.
///
/// Encoding is fallible (a structured value can fail to serialize); decoding
/// is not - malformed stored text decodes to `None` and the caller falls
/// back to its default. Codecs must be stateless and thread-safe: the same
/// codec instance serves every cell it was configured on.
pub trait ValueCodec<T>: Send + Sync {
    /// Encodes a value to its stored text form.
    ///
    /// # Errors
    ///
    /// Returns an error when the value cannot be represented as text.
    fn encode(&self, value: &T) -> CodecResult<String>;

    /// Decodes stored text, or `None` when the text is not a valid encoding.
    fn decode(&self, text: &str) -> Option<T>;
}

/// A codec built from a pair of closures.
///
/// For value types without a built-in codec, or when a cell needs a storage
/// format other than the default.
///
/// # Example
///
/// ```
/// use kvcell_codec::{FnCodec, ValueCodec};
///
/// // Store a pair as "x,y".
/// let codec = FnCodec::new(
///     |&(x, y): &(i64, i64)| Ok(format!("{x},{y}")),
///     |text| {
///         let (x, y) = text.split_once(',')?;
///         Some((x.parse().ok()?, y.parse().ok()?))
///     },
/// );
///
/// assert_eq!(codec.encode(&(3, 4)).unwrap(), "3,4");
/// assert_eq!(codec.decode("3,4"), Some((3, 4)));
/// assert_eq!(codec.decode("garbage"), None);
/// ```
pub struct FnCodec<T> {
    encode: Box<dyn Fn(&T) -> CodecResult<String> + Send + Sync>,
    decode: Box<dyn Fn(&str) -> Option<T> + Send + Sync>,
}

impl<T> FnCodec<T> {
    /// Creates a codec from an encode and a decode closure.
    pub fn new(
        encode: impl Fn(&T) -> CodecResult<String> + Send + Sync + 'static,
        decode: impl Fn(&str) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            encode: Box::new(encode),
            decode: Box::new(decode),
        }
    }
}

impl<T> ValueCodec<T> for FnCodec<T> {
    fn encode(&self, value: &T) -> CodecResult<String> {
        (self.encode)(value)
    }

    fn decode(&self, text: &str) -> Option<T> {
        (self.decode)(text)
    }
}
