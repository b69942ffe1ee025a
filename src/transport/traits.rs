use std::io::Result;
use std::net::SocketAddr;

/// A datagram endpoint the channel runtime sends and receives through.
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to `destination`.
    fn send(&self, data: &[u8], destination: SocketAddr) -> Result<usize>;

    /// Receive one datagram. Bytes beyond `buffer.len()` are discarded.
    /// Returns the number of bytes read and the source address.
    fn receive(&self, buffer: &mut [u8]) -> Result<(usize, SocketAddr)>;

    /// Get the local socket address.
    fn local_addr(&self) -> Result<SocketAddr>;
}
