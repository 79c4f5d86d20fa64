//! Process configuration.
//!
//! Built once at startup and passed to whatever needs it. Nothing in the crate reads ambient settings on its own.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::alias::generate_alias;
use crate::keys::KeyPair;

/// ENV_PREFIX starts every environment variable Config::from_env reads
pub const ENV_PREFIX: &str = "MESSENGER_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// TestModeConfig drives simulated activity. Turning it on forces an in-memory store and disables config saving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModeConfig {
    pub enabled: bool,
    /// Number of simulated nodes
    pub threads: usize,
    /// Minimum seconds between simulated actions
    pub min_interval: u64,
    /// Maximum seconds between simulated actions
    pub max_interval: u64,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threads: 3,
            min_interval: 1,
            max_interval: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Own display name, also the identity seed
    pub name: String,
    pub test_mode: TestModeConfig,
    pub save_config: bool,
    pub config_dir: PathBuf,
    pub rpc_server_port: u16,
    pub rpc_server_remote_address: String,
    /// Port of the object store daemon
    pub cxo_port: u16,
    pub cxo_memory_mode: bool,
    pub cxo_dir: PathBuf,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: generate_alias(),
            test_mode: TestModeConfig::default(),
            save_config: true,
            config_dir: PathBuf::from("."),
            rpc_server_port: 6421,
            rpc_server_remote_address: "127.0.0.1:6421".to_string(),
            cxo_port: 8998,
            cxo_memory_mode: true,
            cxo_dir: PathBuf::from("msg"),
            log_level: "info".to_string(),
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::InvalidValue(format!("{}{}={:?}: {}", ENV_PREFIX, key, value, e)))
}

impl Config {
    /// from_env overlays MESSENGER_* variables on the defaults, then post-processes.
    ///
    /// Example: MESSENGER_NAME=alice MESSENGER_CXO_PORT=9000
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars())
    }

    /// from_vars is from_env over an explicit set of variables
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::default();
        for (key, value) in vars {
            let Some(key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "NAME" => config.name = value,
                "TEST_MODE" => config.test_mode.enabled = parse_var(key, &value)?,
                "TEST_MODE_THREADS" => config.test_mode.threads = parse_var(key, &value)?,
                "TEST_MODE_MIN" => config.test_mode.min_interval = parse_var(key, &value)?,
                "TEST_MODE_MAX" => config.test_mode.max_interval = parse_var(key, &value)?,
                "SAVE_CONFIG" => config.save_config = parse_var(key, &value)?,
                "CONFIG_DIR" => config.config_dir = PathBuf::from(value),
                "RPC_SERVER_PORT" => config.rpc_server_port = parse_var(key, &value)?,
                "RPC_SERVER_REMOTE_ADDRESS" => config.rpc_server_remote_address = value,
                "CXO_PORT" => config.cxo_port = parse_var(key, &value)?,
                "CXO_MEMORY_MODE" => config.cxo_memory_mode = parse_var(key, &value)?,
                "CXO_DIR" => config.cxo_dir = PathBuf::from(value),
                "LOG_LEVEL" => config.log_level = value.to_lowercase(),
                _ => {}
            }
        }
        config.post_process()
    }

    /// post_process validates the settings and applies what test mode enforces
    pub fn post_process(mut self) -> Result<Self, ConfigError> {
        if self.test_mode.enabled {
            if self.test_mode.min_interval < 1 {
                return Err(ConfigError::ValidationFailed(
                    "invalid test mode minimum interval specified".to_string(),
                ));
            }
            if self.test_mode.max_interval < 1 {
                return Err(ConfigError::ValidationFailed(
                    "invalid test mode maximum interval specified".to_string(),
                ));
            }
            if self.test_mode.min_interval > self.test_mode.max_interval {
                return Err(ConfigError::ValidationFailed(
                    "test mode minimum interval > maximum interval".to_string(),
                ));
            }
            self.cxo_memory_mode = true;
            self.save_config = false;
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!("invalid log level: {}", self.log_level)));
        }
        Ok(self)
    }

    /// identity_seed is the byte string the node's key pair is derived from
    pub fn identity_seed(&self) -> &[u8] {
        self.name.as_bytes()
    }

    pub fn key_pair(&self) -> KeyPair {
        KeyPair::derive(self.identity_seed())
    }
}

/* ------------------------------------------------------------------------- */

// TESTS
