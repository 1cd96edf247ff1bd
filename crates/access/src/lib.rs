//! Signature-based caller access control
//!
//! Decides whether the process calling into a privileged service may use
//! it. The caller's uid is resolved to package names, their signing
//! certificates are hashed, and the hash is looked up in an allow-list
//! mapping trusted signers to the package names they may vouch for.
//!
//! The platform queries sit behind [`CallerResolver`] and
//! [`CertificateSource`] so the check runs the same against a live
//! package manager or a captured snapshot.

pub mod allowlist;
pub mod error;
pub mod guard;
pub mod identity;
pub mod signature;

pub use allowlist::{AllowList, AllowListBuilder, PackagePattern};
pub use error::{AccessError, AllowListError, HashParseError, SourceError};
pub use guard::{AccessDecision, AccessGuard};
pub use identity::{CallerResolver, CallingUid, Uid};
pub use signature::{
    hash_certificates, Certificate, CertificateSelection, CertificateSource, DigestAlgorithm,
    SignatureFetcher, SignatureHash,
};
