//! Application Configuration
//!
//! Manages bindguard settings:
//! - Allow-list and package inventory locations
//! - Signature hashing parameters
//! - Logging level

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use tracing::{info, debug};

use crate::error::{GuardError, Result};

/// Digest used to fingerprint signing certificates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    /// Digest length in bytes
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            other => Err(GuardError::Config(format!("unsupported digest algorithm: {}", other))),
        }
    }
}

/// Which signing certificates of a package feed the signature hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateSelection {
    /// Only the first signing certificate
    #[default]
    First,
    /// Every signing certificate, concatenated in order
    All,
}

/// Signature hashing configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureConfig {
    /// Digest algorithm
    pub digest: DigestAlgorithm,
    /// Certificate selection
    pub certificates: CertificateSelection,
}

/// One trusted signer and the package names it may vouch for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListEntry {
    /// Hex encoded certificate digest, any case, `:` separators allowed
    pub signature: String,
    /// Literal package names or regular expressions
    pub packages: Vec<String>,
}

/// Serialized form of an allow-list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowListConfig {
    #[serde(default)]
    pub entries: Vec<AllowListEntry>,
}

impl AllowListConfig {
    /// Parse an allow-list from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load an allow-list file
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(GuardError::NotFound(path.to_path_buf()));
        }

        debug!("Loading allow-list from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&contents)?;
        debug!("Allow-list has {} entries", config.entries.len());
        Ok(config)
    }

    /// Add an entry
    pub fn push(&mut self, signature: &str, packages: &[&str]) {
        self.entries.push(AllowListEntry {
            signature: signature.to_string(),
            packages: packages.iter().map(|p| p.to_string()).collect(),
        });
    }
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration version for migrations
    pub version: u32,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Allow-list file
    pub allowlist: Option<PathBuf>,
    /// Package inventory file
    pub inventory: Option<PathBuf>,
    /// Signature hashing settings
    pub signature: SignatureConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: 1,
            log_level: "info".to_string(),
            allowlist: None,
            inventory: None,
            signature: SignatureConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the configuration directory path
    pub fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "bindguard", "bindguard")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the configuration file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Load configuration from the default location, writing defaults when absent
    pub async fn load() -> Result<Self> {
        let config_file = Self::config_file()
            .ok_or_else(|| GuardError::Config("Cannot determine config path".into()))?;

        if config_file.exists() {
            Self::load_from(&config_file).await
        } else {
            info!("Config file not found, using defaults");
            let config = AppConfig::default();
            config.save_to(&config_file).await?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub async fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config.resolve_relative_to(path))
    }

    /// Save configuration to a specific file
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = toml::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    /// Relative file paths are taken from the config file's directory
    fn resolve_relative_to(mut self, config_path: &Path) -> Self {
        let Some(base) = config_path.parent() else {
            return self;
        };
        for path in [&mut self.allowlist, &mut self.inventory].into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        self
    }
}
