//! Runtime configuration.
//!
//! Values start from [`Config::default`], are overridden by `DCN_*`
//! environment variables in [`Config::from_env`], and finally by command-line
//! flags in `main`.

use crate::core::errors::ChainErrorKind;
use crate::utils::log::Level;
use std::path::PathBuf;
use thiserror::Error;

/// Gas given to deployments, calls and freshly funded accounts.
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    pub fn kind(&self) -> ChainErrorKind {
        ChainErrorKind::InvalidConfig
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Compiler executable.
    pub solc_path: PathBuf,
    /// Root of the contract templates (`contracts/`, `node_modules/`, `out/`).
    pub pt_path: PathBuf,
    /// Root of JSON records and build caches.
    pub storage_path: PathBuf,
    pub log_level: Level,
    pub default_gas_limit: u64,
    pub evm_chain_id: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            solc_path: PathBuf::from("solc"),
            pt_path: PathBuf::from("./pt"),
            storage_path: PathBuf::from("./storage"),
            log_level: Level::Info,
            default_gas_limit: DEFAULT_GAS_LIMIT,
            evm_chain_id: 1,
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `DCN_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(v) = lookup("DCN_SOLC") {
            config.solc_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DCN_PT_PATH") {
            config.pt_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DCN_STORAGE_PATH") {
            config.storage_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("DCN_LOG_LEVEL") {
            config.log_level = v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "DCN_LOG_LEVEL",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("DCN_GAS_LIMIT") {
            config.default_gas_limit = match v.parse() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "DCN_GAS_LIMIT",
                        value: v,
                    });
                }
            };
        }
        Ok(config)
    }

    pub fn contracts_dir(&self) -> PathBuf {
        self.pt_path.join("contracts")
    }

    pub fn node_modules_dir(&self) -> PathBuf {
        self.pt_path.join("node_modules")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.pt_path.join("out")
    }
}
