//! Package Store
//!
//! Offline package data for caller checks: inventories captured from a
//! device, `pm list packages` parsing and certificate file decoding.

pub mod certificate;
pub mod inventory;
pub mod pm;

pub use certificate::{parse_certificates, read_certificates};
pub use inventory::{InventoryFormat, PackageInventory, PackageRecord};
pub use pm::parse_package_list;

use std::path::PathBuf;

/// Inventory errors
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Inventory not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("Unsupported inventory format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
