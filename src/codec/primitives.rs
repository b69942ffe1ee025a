use super::traits::{WireDecode, WireEncode};
use crate::error::CodecError;
use std::io::{Read, Write};

// Fixed-width payloads only; the tag byte is written by `Value`.
macro_rules! impl_primitive {
    ($type:ty, $bytes:expr) => {
        impl WireEncode for $type {
            fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
                writer.write_all(&self.to_le_bytes())?;
                Ok(())
            }
        }

        impl WireDecode for $type {
            fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
                let mut buf = [0u8; $bytes];
                reader.read_exact(&mut buf)?;
                Ok(<$type>::from_le_bytes(buf))
            }
        }
    };
}

impl_primitive!(u8, 1);
impl_primitive!(u16, 2);
impl_primitive!(u32, 4);
impl_primitive!(u64, 8);

impl_primitive!(i8, 1);
impl_primitive!(i16, 2);
impl_primitive!(i32, 4);
impl_primitive!(i64, 8);
