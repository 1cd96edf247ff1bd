//! bindguard - Signature-based caller access control
//!
//! Lets a privileged service decide whether the process binding to it is
//! trusted: the caller's uid is resolved to its packages, their signing
//! certificates are fingerprinted, and the fingerprint is matched against
//! an allow-list of trusted signers and the package names they may sign.
//!
//! ## Architecture
//!
//! - `bindguard-core`: configuration and shared error type
//! - `bindguard-access`: allow-list, signature hashing and the access check
//! - `bindguard-package-store`: offline package inventories and certificate files

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod commands;

// Re-export main components for library usage
pub use bindguard_access as access;
pub use bindguard_core as core;
pub use bindguard_package_store as store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use bindguard_access::{
        AccessDecision, AccessGuard, AllowList, CallerResolver, CertificateSource, SignatureFetcher,
        SignatureHash, Uid,
    };
    pub use bindguard_core::config::{AllowListConfig, AppConfig};
    pub use bindguard_package_store::PackageInventory;
}
