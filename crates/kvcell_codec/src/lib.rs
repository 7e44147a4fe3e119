//! # kvcell Codec
//!
//! Typed value (de)serialization for kvcell.
//!
//! Reactive cells store every value as text in the engine; this crate maps
//! typed values to and from that text form:
//!
//! - [`ValueCodec`] - the codec trait every cell is configured with
//! - Built-ins per supported value kind: [`StringCodec`], [`IntCodec`],
//!   [`FloatCodec`], [`BoolCodec`], [`BytesCodec`], [`JsonCodec`]
//! - [`FnCodec`] - a custom codec from a closure pair
//!
//! Decoding is total: malformed stored text decodes to `None`, never an
//! error, so a corrupt entry degrades to the cell's default value.
//!
//! ## Usage
//!
//! ```
//! use kvcell_codec::{IntCodec, ValueCodec};
//!
//! let codec = IntCodec;
//! assert_eq!(codec.encode(&42).unwrap(), "42");
//! assert_eq!(codec.decode("42"), Some(42));
//! assert_eq!(codec.decode("abc"), None);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builtin;
mod codec;
mod error;

pub use builtin::{BoolCodec, BytesCodec, FloatCodec, IntCodec, JsonCodec, StringCodec};
pub use codec::{FnCodec, ValueCodec};
pub use error::{CodecError, CodecResult};
