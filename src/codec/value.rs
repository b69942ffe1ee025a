use super::complex::{decode_len, encode_len};
use super::tags::*;
use super::traits::{WireDecode, WireEncode};
use crate::error::CodecError;
use std::fmt;
use std::io::{Cursor, Read, Write};

/// Maximum array nesting accepted by the decoder.
pub const MAX_DEPTH: usize = 64;

/// A typed value exchanged between endpoints.
///
/// Every variant maps to exactly one wire tag (two for `Bool`). Integers keep
/// their declared width and signedness: `Int8(-1)` and `UInt8(255)` are
/// different values even though both encode a `0xFF` payload byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    String(String),
    Array(Vec<Value>),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::String(_) => ValueType::String,
            Value::Array(_) => ValueType::Array,
            Value::Int8(_) => ValueType::Int8,
            Value::Int16(_) => ValueType::Int16,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::UInt8(_) => ValueType::UInt8,
            Value::UInt16(_) => ValueType::UInt16,
            Value::UInt32(_) => ValueType::UInt32,
            Value::UInt64(_) => ValueType::UInt64,
        }
    }

    /// The leading wire byte for this value.
    pub fn tag(&self) -> u8 {
        match self {
            Value::Null => TAG_NULL,
            Value::Bool(true) => TAG_TRUE,
            Value::Bool(false) => TAG_FALSE,
            Value::String(_) => TAG_STRING,
            Value::Array(_) => TAG_ARRAY,
            Value::Int8(_) => TAG_INT8,
            Value::Int16(_) => TAG_INT16,
            Value::Int32(_) => TAG_INT32,
            Value::Int64(_) => TAG_INT64,
            Value::UInt8(_) => TAG_UINT8,
            Value::UInt16(_) => TAG_UINT16,
            Value::UInt32(_) => TAG_UINT32,
            Value::UInt64(_) => TAG_UINT64,
        }
    }

    /// Number of bytes [`to_bytes`](Self::to_bytes) will produce.
    pub fn encoded_len(&self) -> usize {
        1 + match self {
            Value::Null | Value::Bool(_) => 0,
            Value::String(s) => 2 + s.len(),
            Value::Array(items) => 2 + items.iter().map(Value::encoded_len).sum::<usize>(),
            other => other.value_type().fixed_width().unwrap_or(0),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decode exactly one value occupying the whole buffer.
    ///
    /// Leftover bytes are an error: a datagram carries one value, never a
    /// value followed by garbage or a second value.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut cursor = Cursor::new(bytes);
        let value = Value::decode(&mut cursor)?;

        let remaining = bytes.len() - cursor.position() as usize;
        if remaining != 0 {
            return Err(CodecError::TrailingBytes { remaining });
        }
        Ok(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Any integer variant whose value fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int8(v) => Some(v.into()),
            Value::Int16(v) => Some(v.into()),
            Value::Int32(v) => Some(v.into()),
            Value::Int64(v) => Some(v),
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any integer variant whose value fits in a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => Some(v),
            Value::Int8(v) => u64::try_from(v).ok(),
            Value::Int16(v) => u64::try_from(v).ok(),
            Value::Int32(v) => u64::try_from(v).ok(),
            Value::Int64(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_array(self) -> Option<Vec<Value>> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl WireEncode for Value {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        writer.write_all(&[self.tag()])?;
        match self {
            Value::Null | Value::Bool(_) => Ok(()),
            Value::String(s) => s.encode(writer),
            Value::Array(items) => {
                encode_len(items.len(), writer)?;
                for item in items {
                    item.encode(writer)?;
                }
                Ok(())
            }
            Value::Int8(v) => v.encode(writer),
            Value::Int16(v) => v.encode(writer),
            Value::Int32(v) => v.encode(writer),
            Value::Int64(v) => v.encode(writer),
            Value::UInt8(v) => v.encode(writer),
            Value::UInt16(v) => v.encode(writer),
            Value::UInt32(v) => v.encode(writer),
            Value::UInt64(v) => v.encode(writer),
        }
    }
}

impl WireDecode for Value {
    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        decode_nested(reader, 0)
    }
}

fn decode_nested<R: Read>(reader: &mut R, depth: usize) -> Result<Value, CodecError> {
    let tag = u8::decode(reader)?;
    let ty = ValueType::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
    let value = match ty {
        ValueType::Null => Value::Null,
        ValueType::Bool => Value::Bool(tag == TAG_TRUE),
        ValueType::String => Value::String(String::decode(reader)?),
        ValueType::Array => {
            if depth >= MAX_DEPTH {
                return Err(CodecError::DepthExceeded);
            }
            let count = decode_len(reader)?;
            // The count is untrusted until the elements actually arrive.
            let mut items = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                items.push(decode_nested(reader, depth + 1)?);
            }
            Value::Array(items)
        }
        ValueType::Int8 => Value::Int8(i8::decode(reader)?),
        ValueType::Int16 => Value::Int16(i16::decode(reader)?),
        ValueType::Int32 => Value::Int32(i32::decode(reader)?),
        ValueType::Int64 => Value::Int64(i64::decode(reader)?),
        ValueType::UInt8 => Value::UInt8(u8::decode(reader)?),
        ValueType::UInt16 => Value::UInt16(u16::decode(reader)?),
        ValueType::UInt32 => Value::UInt32(u32::decode(reader)?),
        ValueType::UInt64 => Value::UInt64(u64::decode(reader)?),
    };
    Ok(value)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! impl_from {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from!(bool, Bool);
impl_from!(String, String);
impl_from!(Vec<Value>, Array);
impl_from!(i8, Int8);
impl_from!(i16, Int16);
impl_from!(i32, Int32);
impl_from!(i64, Int64);
impl_from!(u8, UInt8);
impl_from!(u16, UInt16);
impl_from!(u32, UInt32);
impl_from!(u64, UInt64);

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}
