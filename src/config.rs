use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "packet_cache.bin";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RESPONSE_BUFFER: usize = 1024;

/// Bounds for the `connect` exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectConfig {
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    pub read_timeout: Duration,
    /// Largest response read back, in bytes.
    pub response_buffer: usize,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        ConnectConfig {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            response_buffer: DEFAULT_RESPONSE_BUFFER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_path: PathBuf,
    pub connect: ConnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            connect: ConnectConfig::default(),
        }
    }
}
