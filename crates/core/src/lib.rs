//! bindguard Core - Shared configuration and error types
//!
//! This crate holds the pieces every other bindguard crate builds on:
//! the TOML configuration layer and the common error type.

pub mod config;
pub mod error;

pub use config::{
    AllowListConfig, AllowListEntry, AppConfig, CertificateSelection, DigestAlgorithm,
    SignatureConfig,
};
pub use error::{GuardError, Result};

/// bindguard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "bindguard";
