//! Error types for the access check

use thiserror::Error;

use bindguard_core::DigestAlgorithm;

use crate::identity::Uid;

/// A signature hash that could not be parsed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HashParseError {
    #[error("empty signature hash")]
    Empty,
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("{actual}-byte digest, expected {expected} bytes for {}", .algorithm.as_str())]
    WrongLength {
        algorithm: DigestAlgorithm,
        expected: usize,
        actual: usize,
    },
}

/// Allow-list construction errors
#[derive(Debug, Error)]
pub enum AllowListError {
    #[error("invalid signature hash {signature:?}: {source}")]
    InvalidSignature {
        signature: String,
        #[source]
        source: HashParseError,
    },
    #[error("invalid package pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Failures while reading a package's signing certificates
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Package not found: {0}")]
    PackageNotFound(String),
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("no packages associated with caller uid {0}")]
    UnknownUid(Uid),
}
