//! # Channel Runtime
//!
//! Multiplexes logical channels over UDP sockets.
//!
//! ## Key Types
//!
//! - [`Wireless`] - Scoped transport: inbound queues, outbound fan-out
//! - [`WirelessConfig`] - Tunables and initial bindings, loaded from JSON
//! - [`ReceiverPool`] - One receive loop thread per listening port
//!
//! ## Lifecycle
//!
//! 1. Activate: `Wireless::activate(config)` or `Wireless::load("wireless.json")`
//! 2. Bind channels: `rx_attach(port, channel)`, `tx_attach(host, port, channel)`
//! 3. Exchange values: `write`, `available`, `read`
//! 4. Release: `deactivate()` (or drop) stops and joins every receive loop
//!
//! ## Example
//!
//! ```no_run
//! use wireless::{Value, Wireless};
//!
//! let wl = Wireless::new().unwrap();
//! wl.rx_attach(50000, 0).unwrap();
//! wl.tx_attach("192.168.1.1", 50000, 0).unwrap();
//! wl.write(&Value::from("Hello"), 0).unwrap();
//! if let Some(value) = wl.read(0).unwrap() {
//!     println!("received {}", value);
//! }
//! ```

pub mod threadpool;
pub mod config;

pub use threadpool::*;
pub use config::{MAX_PACKET_SIZE, RxBinding, TxBinding, WirelessConfig};

use crate::codec::Value;
use crate::error::{Result, WirelessError};
use crate::logging::{LogFacade, LogLevel, WirelessLogger};
use crate::transport::{DatagramTransport, UdpTransport};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use std::time::Duration;

/// Logical stream identifier, independent of sockets and peers.
pub type Channel = u8;

const COMPONENT: &str = "Wireless";

/// Inbound state. Receive loops and the control thread share it under one lock.
#[derive(Default)]
struct RxState {
    buffers: HashMap<Channel, VecDeque<Value>>,
    subscriptions: HashMap<u16, HashSet<Channel>>,
}

/// Outbound state. `socket` is `None` once the transport is released.
#[derive(Default)]
struct TxState {
    socket: Option<UdpTransport>,
    peers: HashMap<Channel, HashSet<SocketAddr>>,
}

/// Channel-multiplexed UDP transport.
///
/// Owns one outbound socket shared by every `write`, one receive loop per
/// listening port, and the per-channel inbound queues. All methods take
/// `&self`; the type is `Send + Sync` and can be shared through an `Arc`.
///
/// Once [`deactivate`](Self::deactivate) has run, every operation returns
/// [`WirelessError::Inactive`]. Dropping an active transport deactivates it.
pub struct Wireless {
    rx: Arc<Mutex<RxState>>,
    tx: RwLock<TxState>,
    pool: ReceiverPool,
    active: AtomicBool,
    config: WirelessConfig,
    logger: Arc<dyn WirelessLogger>,
}

impl Wireless {
    /// Activate with default settings and no bindings.
    pub fn new() -> Result<Self> {
        Self::activate(WirelessConfig::default())
    }

    /// Load `config_path`, activate, then apply its rx and tx bindings.
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let config = WirelessConfig::load(config_path)?;
        let wireless = Self::activate(config.clone())?;
        wireless.apply_bindings(&config)?;
        Ok(wireless)
    }

    /// Bind the outbound socket and start with empty maps.
    ///
    /// Bindings listed in `config` are not applied; see
    /// [`apply_bindings`](Self::apply_bindings).
    pub fn activate(config: WirelessConfig) -> Result<Self> {
        Self::activate_with_logger(config, LogFacade::new())
    }

    pub fn activate_with_logger(config: WirelessConfig, logger: Arc<dyn WirelessLogger>) -> Result<Self> {
        config.validate()?;

        let socket = UdpTransport::new(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
        logger.log(
            LogLevel::Info,
            COMPONENT,
            &format!("Activated, outbound socket {}", socket.local_addr()?),
        );

        Ok(Wireless {
            rx: Arc::new(Mutex::new(RxState::default())),
            tx: RwLock::new(TxState { socket: Some(socket), peers: HashMap::new() }),
            pool: ReceiverPool::new(),
            active: AtomicBool::new(true),
            config,
            logger,
        })
    }

    /// Apply every `rx` then every `tx` binding of `config`.
    pub fn apply_bindings(&self, config: &WirelessConfig) -> Result<()> {
        for binding in &config.rx {
            self.rx_attach(binding.port, binding.channel)?;
        }
        for binding in &config.tx {
            self.tx_attach(&binding.host, binding.port, binding.channel)?;
        }
        Ok(())
    }

    /// Stop and join every receive loop, close the outbound socket and clear
    /// all channel state. Runs once; later calls return `Inactive`.
    pub fn deactivate(&self) -> Result<()> {
        if !self.active.swap(false, Ordering::AcqRel) {
            return Err(WirelessError::Inactive);
        }

        // Join first so no loop can repopulate the queues after they are cleared.
        let loops = self.pool.len();
        self.pool.shutdown();
        {
            let mut rx = self.lock_rx();
            rx.buffers.clear();
            rx.subscriptions.clear();
        }
        {
            let mut tx = self.write_tx();
            tx.socket = None;
            tx.peers.clear();
        }

        self.logger.log(
            LogLevel::Info,
            COMPONENT,
            &format!("Deactivated, joined {} receive loop(s)", loops),
        );
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &WirelessConfig {
        &self.config
    }

    pub fn get_logger(&self) -> Arc<dyn WirelessLogger> {
        self.logger.clone()
    }

    /// Address of the shared outbound socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.ensure_active()?;
        let tx = self.read_tx();
        let socket = tx.socket.as_ref().ok_or(WirelessError::Inactive)?;
        Ok(socket.local_addr()?)
    }

    // ----- outbound -----

    /// Add `host:port` to the peers of `channel`. Idempotent.
    pub fn tx_attach(&self, host: &str, port: u16, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        let peer = resolve_v4(host, port)?;
        self.tx_attach_addr(peer, channel)
    }

    pub fn tx_attach_addr(&self, peer: SocketAddr, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        let added = self.write_tx().peers.entry(channel).or_default().insert(peer);
        if added {
            self.logger.log(LogLevel::Debug, COMPONENT, &format!("tx ch{} += {}", channel, peer));
        }
        Ok(())
    }

    /// Remove `host:port` from the peers of `channel`. No-op if absent.
    pub fn tx_detach(&self, host: &str, port: u16, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        let peer = resolve_v4(host, port)?;
        self.tx_detach_addr(peer, channel)
    }

    pub fn tx_detach_addr(&self, peer: SocketAddr, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        self.retain_peers(channel, |p| *p != peer);
        Ok(())
    }

    /// Remove every peer of `channel` whose address is `ip`, whatever its port.
    pub fn tx_detach_host(&self, ip: IpAddr, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        self.retain_peers(channel, |p| p.ip() != ip);
        Ok(())
    }

    /// Remove every peer of `channel` listening on `port`, whatever its address.
    pub fn tx_detach_port(&self, port: u16, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        self.retain_peers(channel, |p| p.port() != port);
        Ok(())
    }

    /// Current peers of `channel`, sorted.
    pub fn tx_peers(&self, channel: Channel) -> Result<Vec<SocketAddr>> {
        self.ensure_active()?;
        let mut peers: Vec<SocketAddr> = self
            .read_tx()
            .peers
            .get(&channel)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        peers.sort();
        Ok(peers)
    }

    /// Encode `value` once and send it to every peer of `channel`.
    ///
    /// Returns the number of datagrams sent; a channel without peers sends
    /// nothing and returns `Ok(0)`. Every peer is attempted even if an earlier
    /// send fails; the first failure is then returned.
    pub fn write(&self, value: &Value, channel: Channel) -> Result<usize> {
        self.ensure_active()?;
        let tx = self.read_tx();
        let Some(peers) = tx.peers.get(&channel).filter(|peers| !peers.is_empty()) else {
            return Ok(0);
        };
        let socket = tx.socket.as_ref().ok_or(WirelessError::Inactive)?;

        let bytes = value.to_bytes()?;
        if bytes.len() > self.config.max_packet_size {
            return Err(WirelessError::PayloadTooLarge {
                size: bytes.len(),
                max: self.config.max_packet_size,
            });
        }

        #[cfg(feature = "packet-dump")]
        self.logger.log(
            LogLevel::Trace,
            COMPONENT,
            &format!("tx ch{} -> {} peer(s): {}", channel, peers.len(), hex_dump(&bytes)),
        );

        let mut sent = 0;
        let mut first_error = None;
        for &peer in peers {
            match socket.send(&bytes, peer) {
                Ok(_) => sent += 1,
                Err(source) => {
                    self.logger.log(
                        LogLevel::Warn,
                        COMPONENT,
                        &format!("tx ch{} to {} failed: {}", channel, peer, source),
                    );
                    if first_error.is_none() {
                        first_error = Some(WirelessError::Send { peer, source });
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(sent),
        }
    }

    /// Write each value in order; returns the total number of datagrams sent.
    pub fn write_all(&self, values: &[Value], channel: Channel) -> Result<usize> {
        let mut sent = 0;
        for value in values {
            sent += self.write(value, channel)?;
        }
        Ok(sent)
    }

    // ----- inbound -----

    /// Subscribe `channel` to values arriving on `port`.
    ///
    /// The first subscription for a port binds `0.0.0.0:port` and starts its
    /// receive loop; later ones reuse it. Port 0 binds an ephemeral port.
    /// Returns the bound port.
    pub fn rx_attach(&self, port: u16, channel: Channel) -> Result<u16> {
        self.ensure_active()?;
        let mut rx = self.lock_rx();
        if let Some(channels) = rx.subscriptions.get_mut(&port) {
            channels.insert(channel);
            return Ok(port);
        }

        let socket = UdpTransport::bind_any(port).map_err(|source| WirelessError::Bind { port, source })?;
        socket.set_read_timeout(Some(self.config.rx_poll_interval()))?;
        let bound = socket.local_addr()?.port();

        let loop_ctx = ReceiveLoop {
            socket,
            port: bound,
            rx: Arc::clone(&self.rx),
            logger: self.logger.clone(),
            max_packet_size: self.config.max_packet_size,
        };
        self.pool
            .spawn(format!("wl-rx-{}", bound), move |stop| loop_ctx.run(stop))
            .map_err(|e| if self.is_active() { WirelessError::Io(e) } else { WirelessError::Inactive })?;

        rx.subscriptions.insert(bound, HashSet::from([channel]));
        self.logger.log(
            LogLevel::Info,
            COMPONENT,
            &format!("rx loop started on port {} (ch{})", bound, channel),
        );
        Ok(bound)
    }

    /// Unsubscribe `channel` from `port`. The port's receive loop keeps running.
    pub fn rx_detach(&self, port: u16, channel: Channel) -> Result<()> {
        self.ensure_active()?;
        if let Some(channels) = self.lock_rx().subscriptions.get_mut(&port) {
            channels.remove(&channel);
        }
        Ok(())
    }

    /// Ports with a running receive loop, sorted.
    pub fn rx_ports(&self) -> Result<Vec<u16>> {
        self.ensure_active()?;
        let mut ports: Vec<u16> = self.lock_rx().subscriptions.keys().copied().collect();
        ports.sort_unstable();
        Ok(ports)
    }

    /// Number of receive loop threads started by this transport.
    pub fn receive_loops(&self) -> usize {
        self.pool.len()
    }

    /// Pop the oldest buffered value of `channel`.
    pub fn read(&self, channel: Channel) -> Result<Option<Value>> {
        self.ensure_active()?;
        Ok(self.lock_rx().buffers.get_mut(&channel).and_then(VecDeque::pop_front))
    }

    /// Pop up to `max` buffered values of `channel`, oldest first.
    pub fn read_many(&self, channel: Channel, max: usize) -> Result<Vec<Value>> {
        self.ensure_active()?;
        let mut rx = self.lock_rx();
        let Some(buffer) = rx.buffers.get_mut(&channel) else {
            return Ok(Vec::new());
        };
        let n = max.min(buffer.len());
        Ok(buffer.drain(..n).collect())
    }

    /// Number of values buffered for `channel`.
    pub fn available(&self, channel: Channel) -> Result<usize> {
        self.ensure_active()?;
        Ok(self.lock_rx().buffers.get(&channel).map_or(0, VecDeque::len))
    }

    // ----- helpers -----

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() { Ok(()) } else { Err(WirelessError::Inactive) }
    }

    fn retain_peers(&self, channel: Channel, keep: impl Fn(&SocketAddr) -> bool) {
        let mut tx = self.write_tx();
        if let Some(peers) = tx.peers.get_mut(&channel) {
            peers.retain(|p| keep(p));
            if peers.is_empty() {
                tx.peers.remove(&channel);
            }
        }
    }

    fn lock_rx(&self) -> MutexGuard<'_, RxState> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_tx(&self) -> RwLockReadGuard<'_, TxState> {
        self.tx.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_tx(&self) -> RwLockWriteGuard<'_, TxState> {
        self.tx.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Wireless {
    fn drop(&mut self) {
        if self.is_active() {
            let _ = self.deactivate();
        }
    }
}

/// Everything one port's receive loop owns or shares.
struct ReceiveLoop {
    socket: UdpTransport,
    port: u16,
    rx: Arc<Mutex<RxState>>,
    logger: Arc<dyn WirelessLogger>,
    max_packet_size: usize,
}

impl ReceiveLoop {
    fn run(self, stop: StopSignal) {
        // One spare byte tells an oversized datagram apart from one that fills the limit.
        let mut buf = vec![0u8; self.max_packet_size + 1];

        while !stop.is_stopped() {
            let (size, src) = match self.socket.receive(&mut buf) {
                Ok(received) => received,
                Err(ref e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => continue,
                Err(e) => {
                    self.logger.log(LogLevel::Warn, COMPONENT, &format!("rx port {}: {}", self.port, e));
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            if size > self.max_packet_size {
                self.logger.log(
                    LogLevel::Debug,
                    COMPONENT,
                    &format!(
                        "rx port {}: dropped oversized datagram from {} (over {} bytes)",
                        self.port, src, self.max_packet_size
                    ),
                );
                continue;
            }

            #[cfg(feature = "packet-dump")]
            self.logger.log(
                LogLevel::Trace,
                COMPONENT,
                &format!("rx port {} <- {}: {}", self.port, src, hex_dump(&buf[..size])),
            );

            let value = match Value::from_bytes(&buf[..size]) {
                Ok(value) => value,
                Err(e) => {
                    self.logger.log(
                        LogLevel::Debug,
                        COMPONENT,
                        &format!("rx port {}: dropped {} bytes from {}: {}", self.port, size, src, e),
                    );
                    continue;
                }
            };

            let mut state = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
            let RxState { buffers, subscriptions } = &mut *state;
            if let Some(channels) = subscriptions.get(&self.port) {
                for &channel in channels {
                    buffers.entry(channel).or_default().push_back(value.clone());
                }
            }
        }

        // The socket closes when `self` drops here.
        self.logger.log(LogLevel::Debug, COMPONENT, &format!("rx loop on port {} stopped", self.port));
    }
}

fn resolve_v4(host: &str, port: u16) -> Result<SocketAddr> {
    let unresolved = || WirelessError::AddrResolve { host: host.to_string(), port };
    (host, port)
        .to_socket_addrs()
        .map_err(|_| unresolved())?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(unresolved)
}

#[cfg(feature = "packet-dump")]
fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}
