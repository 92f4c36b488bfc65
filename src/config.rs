//! Configuration for bookie-storage
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, StorageError};

/// Main configuration for the channel and write cache
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Buffered Channel Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the write-accumulation buffer (in bytes)
    pub write_capacity: usize,

    /// Capacity of the read-ahead buffer (in bytes)
    pub read_capacity: usize,

    /// When to force buffered writes to stable storage
    pub sync_policy: SyncPolicy,

    // -------------------------------------------------------------------------
    // Write Cache Configuration
    // -------------------------------------------------------------------------
    /// Max bytes resident in the write cache before puts are refused
    pub write_cache_max_size: u64,

    /// Size of each pre-allocated cache segment (in bytes)
    pub write_cache_max_segment_size: usize,
}

/// Durability window policy for the buffered channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPolicy {
    /// Only force when the caller asks for it
    Explicit,

    /// Flush and force once this many bytes are unpersisted
    UnpersistedBytes { bound: u64 },
}

impl SyncPolicy {
    /// The unpersisted-bytes bound, 0 meaning "no bound"
    pub fn bound(&self) -> u64 {
        match self {
            SyncPolicy::Explicit => 0,
            SyncPolicy::UnpersistedBytes { bound } => *bound,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_capacity: 64 * 1024,      // 64 KB
            read_capacity: 64 * 1024,       // 64 KB
            sync_policy: SyncPolicy::Explicit,
            write_cache_max_size: 64 * 1024 * 1024, // 64 MB
            write_cache_max_segment_size: 1024 * 1024, // 1 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Channel settings derived from this config
    pub fn channel(&self) -> ChannelConfig {
        ChannelConfig {
            write_capacity: self.write_capacity,
            read_capacity: self.read_capacity,
            unpersisted_bytes_bound: self.sync_policy.bound(),
        }
    }

    /// Check that every size is usable
    pub fn validate(&self) -> Result<()> {
        self.channel().validate()?;
        if self.write_cache_max_size == 0 {
            return Err(StorageError::Config(
                "write cache max size must be positive".to_string(),
            ));
        }
        if self.write_cache_max_segment_size == 0 {
            return Err(StorageError::Config(
                "write cache segment size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the write buffer capacity (in bytes)
    pub fn write_capacity(mut self, bytes: usize) -> Self {
        self.config.write_capacity = bytes;
        self
    }

    /// Set the read-ahead buffer capacity (in bytes)
    pub fn read_capacity(mut self, bytes: usize) -> Self {
        self.config.read_capacity = bytes;
        self
    }

    /// Set the sync policy
    pub fn sync_policy(mut self, policy: SyncPolicy) -> Self {
        self.config.sync_policy = policy;
        self
    }

    /// Set the write cache capacity (in bytes)
    pub fn write_cache_max_size(mut self, bytes: u64) -> Self {
        self.config.write_cache_max_size = bytes;
        self
    }

    /// Set the write cache segment size (in bytes)
    pub fn write_cache_max_segment_size(mut self, bytes: usize) -> Self {
        self.config.write_cache_max_segment_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Per-channel settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub write_capacity: usize,
    pub read_capacity: usize,
    /// 0 disables the durability window
    pub unpersisted_bytes_bound: u64,
}

impl ChannelConfig {
    /// Same capacity for both buffers, no durability window
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            write_capacity: capacity,
            read_capacity: capacity,
            unpersisted_bytes_bound: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.write_capacity == 0 {
            return Err(StorageError::Config(
                "write capacity must be positive".to_string(),
            ));
        }
        if self.read_capacity == 0 {
            return Err(StorageError::Config(
                "read capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Config::default().channel()
    }
}
