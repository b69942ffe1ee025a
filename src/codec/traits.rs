use crate::error::CodecError;
use std::io::{Read, Write};

// Types that can be written in the TLV wire format
pub trait WireEncode {
    fn encode<W: Write>(&self, writer: &mut W) -> Result<(), CodecError>;
}

// Types that can be read back from the TLV wire format
pub trait WireDecode: Sized {
    fn decode<R: Read>(reader: &mut R) -> Result<Self, CodecError>;
}
