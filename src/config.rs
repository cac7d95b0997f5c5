use std::env;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::hex_to_byte_array;
use crate::data_items::{IV_SIZE, KEY_SIZE};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

pub const SUPPORTED_HASHING_ALGORITHM: &str = "SHA-256";
pub const SUPPORTED_SIGNING_ALGORITHM: &str = "SECP256K1";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Algorithms this requester can produce
    pub hashing_algorithm: String,
    pub signing_algorithm: String,

    // Keys
    pub requester_sk_hex: String,
    pub session_key_hex: String,
    pub session_iv_hex: String,
    pub encrypted_session_key_hex: String,
    pub data_key_hex: Option<String>,
    pub data_iv_hex: Option<String>,

    // Monitoring and logging
    pub log_level: String,
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hashing_algorithm: SUPPORTED_HASHING_ALGORITHM.to_string(),
            signing_algorithm: SUPPORTED_SIGNING_ALGORITHM.to_string(),

            requester_sk_hex: String::new(),
            session_key_hex: String::new(),
            session_iv_hex: String::new(),
            encrypted_session_key_hex: String::new(),
            data_key_hex: None,
            data_iv_hex: None,

            log_level: "info".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let required = |name: &str| lookup(name).ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()));

        config.requester_sk_hex = required("REQUESTER_SK_HEX")?;
        config.session_key_hex = required("SESSION_KEY_HEX")?;
        config.session_iv_hex = required("SESSION_IV_HEX")?;
        config.encrypted_session_key_hex = required("ENCRYPTED_SESSION_KEY_HEX")?;

        if let Some(val) = lookup("TCS_HASHING_ALGORITHM") {
            config.hashing_algorithm = val;
        }

        if let Some(val) = lookup("TCS_SIGNING_ALGORITHM") {
            config.signing_algorithm = val;
        }

        config.data_key_hex = lookup("DATA_KEY_HEX");
        config.data_iv_hex = lookup("DATA_IV_HEX");

        if let Some(val) = lookup("LOG_LEVEL") {
            config.log_level = val;
        }

        if let Some(val) = lookup("METRICS_ENABLED") {
            config.metrics_enabled = val == "1";
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.requester_sk_hex.len() != 64 {
            return Err(ConfigError::ValidationError("REQUESTER_SK_HEX must be 64 characters".to_string()));
        }

        Self::check_hex("SESSION_KEY_HEX", &self.session_key_hex, Some(KEY_SIZE))?;
        Self::check_hex("SESSION_IV_HEX", &self.session_iv_hex, Some(IV_SIZE))?;
        Self::check_hex("ENCRYPTED_SESSION_KEY_HEX", &self.encrypted_session_key_hex, None)?;

        match (&self.data_key_hex, &self.data_iv_hex) {
            (Some(key), Some(iv)) => {
                Self::check_hex("DATA_KEY_HEX", key, Some(KEY_SIZE))?;
                Self::check_hex("DATA_IV_HEX", iv, Some(IV_SIZE))?;
            }
            (None, None) => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "DATA_KEY_HEX and DATA_IV_HEX must be set together".to_string(),
                ));
            }
        }

        if self.hashing_algorithm.is_empty() || self.signing_algorithm.is_empty() {
            return Err(ConfigError::ValidationError("algorithms must not be empty".to_string()));
        }

        Ok(())
    }

    fn check_hex(name: &str, value: &str, bytes: Option<usize>) -> Result<(), ConfigError> {
        let decoded = hex_to_byte_array(value)
            .map_err(|e| ConfigError::InvalidEnvVar(name.to_string(), e.to_string()))?;
        match bytes {
            Some(n) if decoded.len() != n => Err(ConfigError::ValidationError(format!(
                "{name} must be {n} bytes, got {}",
                decoded.len()
            ))),
            _ => Ok(()),
        }
    }
}
