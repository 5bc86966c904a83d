//! Built-in backends and the configuration they read from the environment.
//!
//! - [`NullBackend`]: echoes everything, stores nothing.
//! - `memory`: [`KvBackend`] over an ordered in-memory map.
//! - `redb` (feature `redb`): [`KvBackend`] over a redb file.

pub mod engine;
pub mod kv;
pub mod memory;
pub mod null;
#[cfg(feature = "redb")]
pub mod redb_engine;

use std::path::PathBuf;

use dbzmq_core::framing::KEY_SIZE_ENV;
use dbzmq_core::KeyFraming;

pub use engine::KvEngine;
pub use kv::KvBackend;
pub use memory::MemoryEngine;
pub use null::NullBackend;
#[cfg(feature = "redb")]
pub use redb_engine::RedbEngine;

/// Environment variable naming the redb database file.
pub const REDB_FILE_ENV: &str = "REDB_FILE";

/// Database file used when `REDB_FILE` is not set.
pub const DEFAULT_REDB_FILE: &str = "database.redb";

/// Errors in the environment-provided backend configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("DBZMQ_KEYSIZE={value:?} is not a key width in 1..=255")]
    InvalidKeySize { value: String },
}

/// Settings shared by the built-in backends.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Key width for `put` payloads (`DBZMQ_KEYSIZE`, default 20).
    pub framing: KeyFraming,
    /// Database file of the redb backend (`REDB_FILE`).
    pub redb_file: PathBuf,
}

impl BackendConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidKeySize`] if `DBZMQ_KEYSIZE` is set but
    /// not an integer in `1..=255`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, which maps a variable name to its
    /// value.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let framing = match lookup(KEY_SIZE_ENV) {
            None => KeyFraming::default(),
            Some(value) => value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(KeyFraming::new)
                .ok_or(ConfigError::InvalidKeySize { value })?,
        };
        let redb_file = lookup(REDB_FILE_ENV)
            .filter(|path| !path.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_REDB_FILE), PathBuf::from);
        Ok(Self { framing, redb_file })
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            framing: KeyFraming::default(),
            redb_file: PathBuf::from(DEFAULT_REDB_FILE),
        }
    }
}
