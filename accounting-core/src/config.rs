//! Configuration for the accounting core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Metrics listen address
    pub metrics_listen_addr: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,

    /// Reconciliation matching configuration
    pub reconcile: ReconcileConfig,

    /// Actor mailbox configuration
    pub actor: ActorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/accounting"),
            service_name: "accounting-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            metrics_listen_addr: "0.0.0.0:9090".to_string(),
            rocksdb: RocksDbConfig::default(),
            reconcile: ReconcileConfig::default(),
            actor: ActorConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,       // 64 MB
            max_write_buffer_number: 4,
            target_file_size_mb: 64,        // 64 MB
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}

/// Reconciliation matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Max day gap for high confidence (correlated transfer legs)
    pub high_confidence_days: i64,

    /// Max day gap for medium confidence (exact amount, no correlation)
    pub medium_confidence_days: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            high_confidence_days: 1,     // same or adjacent day
            medium_confidence_days: 7,   // one week window
        }
    }
}

/// Actor mailbox configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Bounded mailbox capacity (backpressure)
    pub mailbox_size: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_size: 1000,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("ACCOUNTING_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(addr) = std::env::var("ACCOUNTING_METRICS_ADDR") {
            config.metrics_listen_addr = addr;
        }

        if let Ok(days) = std::env::var("ACCOUNTING_HIGH_CONFIDENCE_DAYS") {
            config.reconcile.high_confidence_days = days
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad high confidence days: {}", e)))?;
        }

        if let Ok(days) = std::env::var("ACCOUNTING_MEDIUM_CONFIDENCE_DAYS") {
            config.reconcile.medium_confidence_days = days
                .parse()
                .map_err(|e| crate::Error::Config(format!("Bad medium confidence days: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field rules
    pub fn validate(&self) -> crate::Result<()> {
        if self.reconcile.high_confidence_days < 0 || self.reconcile.medium_confidence_days < 0 {
            return Err(crate::Error::Config(
                "confidence windows cannot be negative".to_string(),
            ));
        }
        if self.reconcile.high_confidence_days > self.reconcile.medium_confidence_days {
            return Err(crate::Error::Config(
                "high confidence window cannot exceed the medium window".to_string(),
            ));
        }
        if self.actor.mailbox_size == 0 {
            return Err(crate::Error::Config(
                "actor mailbox size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
