//! # TLV Value Codec
//!
//! Self-describing encoding of typed values: one tag byte followed by a
//! type-specific payload. All multi-byte integers are little-endian.
//!
//! ## Key Types
//!
//! - [`Value`] - Tagged union of the supported types (recursive arrays)
//! - [`ValueType`] - Payload-free discriminant of a value
//! - [`WireEncode`] / [`WireDecode`] - Traits for writing and reading payloads
//!
//! ## Example
//!
//! ```
//! use wireless::codec::Value;
//!
//! let bytes = Value::from("Hello").to_bytes().unwrap();
//! assert_eq!(bytes, [3, 5, 0, b'H', b'e', b'l', b'l', b'o']);
//! assert_eq!(Value::from_bytes(&bytes).unwrap(), Value::from("Hello"));
//! ```

pub mod tags;
pub mod traits;
pub mod primitives;
pub mod complex;
pub mod value;

pub use tags::ValueType;
pub use traits::{WireDecode, WireEncode};
pub use value::{Value, MAX_DEPTH};
