pub mod codec;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod transport;

pub use codec::{Value, ValueType, WireDecode, WireEncode};
pub use error::{CodecError, Result, WirelessError};
pub use runtime::{Channel, Wireless, WirelessConfig, MAX_PACKET_SIZE};
pub use transport::{DatagramTransport, UdpTransport};
