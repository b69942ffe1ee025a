use super::Channel;
use crate::error::{Result, WirelessError};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

/// Largest datagram payload a receive loop accepts by default.
pub const MAX_PACKET_SIZE: usize = 256;

/// Largest payload a single IPv4 UDP datagram can carry.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Subscribe `channel` to values arriving on local `port`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct RxBinding {
    pub port: u16,
    #[serde(default)]
    pub channel: Channel,
}

/// Fan values written on `channel` out to `host:port`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct TxBinding {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub channel: Channel,
}

/// Transport tunables and initial bindings.
/// All timing values are in milliseconds.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct WirelessConfig {
    /// Receive buffer size and largest encoded value `write` accepts (default: 256)
    #[serde(default = "default_max_packet_size")]
    pub max_packet_size: usize,
    /// How often a blocked receive loop wakes to check for shutdown (default: 100)
    #[serde(default = "default_rx_poll_interval")]
    pub rx_poll_interval_ms: u64,
    #[serde(default)]
    pub rx: Vec<RxBinding>,
    #[serde(default)]
    pub tx: Vec<TxBinding>,
}

impl Default for WirelessConfig {
    fn default() -> Self {
        WirelessConfig {
            max_packet_size: default_max_packet_size(),
            rx_poll_interval_ms: default_rx_poll_interval(),
            rx: Vec::new(),
            tx: Vec::new(),
        }
    }
}

fn default_max_packet_size() -> usize { MAX_PACKET_SIZE }
fn default_rx_poll_interval() -> u64 { 100 }

impl WirelessConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| WirelessError::Config(format!("{}: {}", path.display(), e)))?;
        let config: WirelessConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| WirelessError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: WirelessConfig =
            serde_json::from_str(json).map_err(|e| WirelessError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_packet_size == 0 || self.max_packet_size > MAX_UDP_PAYLOAD {
            return Err(WirelessError::Config(format!(
                "max_packet_size must be within 1..={}, got {}",
                MAX_UDP_PAYLOAD, self.max_packet_size
            )));
        }
        if self.rx_poll_interval_ms == 0 {
            return Err(WirelessError::Config("rx_poll_interval_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn rx_poll_interval(&self) -> Duration {
        Duration::from_millis(self.rx_poll_interval_ms)
    }
}
