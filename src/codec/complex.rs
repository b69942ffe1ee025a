use super::traits::{WireDecode, WireEncode};
use crate::error::CodecError;
use std::io::{Read, Write};

/// Write a 16-bit little-endian length prefix.
///
/// Fails with [`CodecError::LengthOverflow`] instead of truncating.
pub(crate) fn encode_len<W: Write>(len: usize, writer: &mut W) -> Result<(), CodecError> {
    let prefix = u16::try_from(len).map_err(|_| CodecError::LengthOverflow { len })?;
    prefix.encode(writer)
}

pub(crate) fn decode_len<R: Read>(reader: &mut R) -> Result<usize, CodecError> {
    Ok(u16::decode(reader)? as usize)
}

// Strings carry a byte-length prefix, not a character count.
impl WireEncode for str {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        encode_len(self.len(), writer)?;
        writer.write_all(self.as_bytes())?;
        Ok(())
    }
}

impl WireEncode for String {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        self.as_str().encode(writer)
    }
}

impl WireDecode for String {
    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let len = decode_len(reader)?;
        let mut buffer = vec![0u8; len];
        reader.read_exact(&mut buffer)?;

        String::from_utf8(buffer).map_err(|_| CodecError::InvalidUtf8)
    }
}
