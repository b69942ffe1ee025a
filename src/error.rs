use std::net::SocketAddr;

/// Errors produced while encoding or decoding a [`Value`](crate::codec::Value).
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The buffer ended before the declared tag, length or payload.
    #[error("buffer truncated")]
    Truncated,

    /// A complete value was parsed but bytes were left over.
    #[error("{remaining} trailing bytes after value")]
    TrailingBytes { remaining: usize },

    /// The tag byte is not part of the wire format.
    #[error("unknown type tag {0}")]
    UnknownTag(u8),

    /// A string payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// A string or array does not fit the 16-bit length prefix.
    #[error("length {len} exceeds the 16-bit length prefix")]
    LengthOverflow { len: usize },

    /// Arrays nested deeper than [`MAX_DEPTH`](crate::codec::MAX_DEPTH).
    #[error("array nesting too deep")]
    DepthExceeded,

    #[error("codec I/O error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for CodecError {
    fn from(e: std::io::Error) -> Self {
        // read_exact reports a short buffer as UnexpectedEof
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::Truncated
        } else {
            CodecError::Io(e)
        }
    }
}

/// Errors surfaced by [`Wireless`](crate::runtime::Wireless).
#[derive(Debug, thiserror::Error)]
pub enum WirelessError {
    /// The transport was deactivated; no further operations are allowed.
    #[error("transport is not active")]
    Inactive,

    /// A receive socket could not be bound.
    #[error("failed to bind rx port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot resolve {host}:{port} to an IPv4 address")]
    AddrResolve { host: String, port: u16 },

    /// The encoded value is larger than one datagram may carry.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("send to {peer} failed: {source}")]
    Send {
        peer: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, WirelessError>;
