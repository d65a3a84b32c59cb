//! Compiler configuration
//!
//! Values come from, in order of precedence: an explicit [`Config`], the
//! process environment (after loading `.env` if present), or a YAML file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::signing::SigningKey;

/// Base64-encoded 32 byte signing key
pub const SIGNING_KEY_ENV: &str = "MATHLANG_SIGNING_KEY";
/// Allow decompiling artifacts whose signature cannot be verified
pub const UNSAFE_ENV: &str = "MATHLANG_UNSAFE";

/// Filename recorded in executables when none is given
pub const DEFAULT_FILENAME: &str = "<mathlang>";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base64 signing key; `None` means an ephemeral per-process key.
    pub signing_key: Option<String>,
    /// Default for the `unsafe` flag of configured decompilation.
    pub unsafe_decompile: bool,
    /// Filename recorded in compiled executables.
    pub target_filename: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            signing_key: None,
            unsafe_decompile: false,
            target_filename: DEFAULT_FILENAME.to_string(),
        }
    }
}

impl Config {
    /// Read configuration from the environment, loading `.env` first
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let config = Self {
            signing_key: lookup(SIGNING_KEY_ENV).filter(|s| !s.trim().is_empty()),
            unsafe_decompile: lookup(UNSAFE_ENV).is_some_and(|s| parse_flag(&s)),
            ..Default::default()
        };
        debug!(
            has_key = config.signing_key.is_some(),
            unsafe_decompile = config.unsafe_decompile,
            "loaded config from environment"
        );
        config
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Decode the configured key, if any
    pub fn signing_key(&self) -> Result<Option<SigningKey>, ConfigError> {
        self.signing_key
            .as_deref()
            .map(SigningKey::from_base64)
            .transpose()
    }

    pub fn with_signing_key(mut self, key: &SigningKey) -> Self {
        self.signing_key = Some(key.to_base64());
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
