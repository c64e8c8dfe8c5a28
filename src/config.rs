//! Command-line configuration for the server binary.

use crate::dispatch::{BodyLimits, UpdateMode};
use crate::flush::FlushPolicy;
use crate::store::IdStrategy;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8081;

/// Server configuration, parsed from the command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "products-server", version, about = "CRUD over a JSON file of products")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
    pub bind: SocketAddr,

    /// Backing JSON document.
    #[arg(long, default_value = "data.json")]
    pub data: PathBuf,

    /// Largest request body accepted, in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    /// Seconds a client gets to send its whole request body.
    #[arg(long, default_value_t = 30)]
    pub read_timeout_secs: u64,

    /// How new product ids are assigned.
    #[arg(long, value_enum, default_value_t = IdStrategy::MaxPlusOne)]
    pub id_strategy: IdStrategy,

    /// Whether PUT merges into or replaces the stored product.
    #[arg(long, value_enum, default_value_t = UpdateMode::Merge)]
    pub put_mode: UpdateMode,

    /// Flush to disk in the background every N milliseconds instead of after
    /// every write. Reads are then served from memory.
    #[arg(long)]
    pub flush_interval_ms: Option<u64>,

    /// Write single-line JSON instead of indented JSON.
    #[arg(long)]
    pub compact: bool,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Flush policy implied by `--flush-interval-ms`.
    #[must_use]
    pub fn flush_policy(&self) -> FlushPolicy {
        match self.flush_interval_ms {
            Some(ms) => FlushPolicy::Async(Duration::from_millis(ms)),
            None => FlushPolicy::Immediate,
        }
    }

    /// Body limits implied by `--max-body-bytes` and `--read-timeout-secs`.
    #[must_use]
    pub fn body_limits(&self) -> BodyLimits {
        BodyLimits {
            max_bytes: self.max_body_bytes,
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::parse_from(["products-server"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind.port(), DEFAULT_PORT);
        assert_eq!(config.data, PathBuf::from("data.json"));
        assert_eq!(config.flush_policy(), FlushPolicy::Immediate);
        assert_eq!(config.id_strategy, IdStrategy::MaxPlusOne);
        assert_eq!(config.put_mode, UpdateMode::Merge);
        assert_eq!(config.body_limits(), BodyLimits::default());
        assert!(!config.compact);
    }

    #[test]
    fn parses_flags() {
        let config = ServerConfig::parse_from([
            "products-server",
            "--bind",
            "127.0.0.1:9000",
            "--data",
            "/tmp/p.json",
            "--id-strategy",
            "length",
            "--put-mode",
            "replace",
            "--flush-interval-ms",
            "250",
            "--compact",
        ]);
        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.id_strategy, IdStrategy::Length);
        assert_eq!(config.put_mode, UpdateMode::Replace);
        assert_eq!(
            config.flush_policy(),
            FlushPolicy::Async(Duration::from_millis(250))
        );
        assert!(config.compact);
    }
}
