use std::fmt;

pub const TAG_NULL: u8 = 0;
pub const TAG_TRUE: u8 = 1;
pub const TAG_FALSE: u8 = 2;
pub const TAG_STRING: u8 = 3;
pub const TAG_ARRAY: u8 = 4;
pub const TAG_INT8: u8 = 5;
pub const TAG_INT16: u8 = 6;
pub const TAG_INT32: u8 = 7;
pub const TAG_INT64: u8 = 8;
pub const TAG_UINT8: u8 = 9;
pub const TAG_UINT16: u8 = 10;
pub const TAG_UINT32: u8 = 11;
pub const TAG_UINT64: u8 = 12;

/// Payload-free discriminant of a [`Value`](super::Value).
///
/// `Bool` covers both `TAG_TRUE` and `TAG_FALSE` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Null,
    Bool,
    String,
    Array,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
}

impl ValueType {
    /// Map a wire tag to its type, `None` for bytes outside the table.
    pub fn from_tag(tag: u8) -> Option<Self> {
        let ty = match tag {
            TAG_NULL => ValueType::Null,
            TAG_TRUE | TAG_FALSE => ValueType::Bool,
            TAG_STRING => ValueType::String,
            TAG_ARRAY => ValueType::Array,
            TAG_INT8 => ValueType::Int8,
            TAG_INT16 => ValueType::Int16,
            TAG_INT32 => ValueType::Int32,
            TAG_INT64 => ValueType::Int64,
            TAG_UINT8 => ValueType::UInt8,
            TAG_UINT16 => ValueType::UInt16,
            TAG_UINT32 => ValueType::UInt32,
            TAG_UINT64 => ValueType::UInt64,
            _ => return None,
        };
        Some(ty)
    }

    /// Size of the fixed payload for integer types, `None` otherwise.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ValueType::Int8 | ValueType::UInt8 => Some(1),
            ValueType::Int16 | ValueType::UInt16 => Some(2),
            ValueType::Int32 | ValueType::UInt32 => Some(4),
            ValueType::Int64 | ValueType::UInt64 => Some(8),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Null => "Null",
            ValueType::Bool => "Bool",
            ValueType::String => "String",
            ValueType::Array => "Array",
            ValueType::Int8 => "Int8",
            ValueType::Int16 => "Int16",
            ValueType::Int32 => "Int32",
            ValueType::Int64 => "Int64",
            ValueType::UInt8 => "UInt8",
            ValueType::UInt16 => "UInt16",
            ValueType::UInt32 => "UInt32",
            ValueType::UInt64 => "UInt64",
        };
        f.write_str(name)
    }
}
