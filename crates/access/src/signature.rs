//! Package signatures
//!
//! Hashes the signing certificates of a package into a hex fingerprint
//! comparable against allow-list entries.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::{debug, warn};

pub use bindguard_core::{CertificateSelection, DigestAlgorithm, SignatureConfig};

use crate::error::{HashParseError, SourceError};

/// DER encoded signing certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    pub fn new(der: Vec<u8>) -> Self {
        Self(der)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Certificate {
    fn from(der: Vec<u8>) -> Self {
        Self(der)
    }
}

impl From<&[u8]> for Certificate {
    fn from(der: &[u8]) -> Self {
        Self(der.to_vec())
    }
}

/// Lower-case hex digest of a package's signing certificate(s)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignatureHash(String);

impl SignatureHash {
    /// Wrap raw digest bytes
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse a hex fingerprint.
    ///
    /// Accepts either case and the `AA:BB:..` form printed by `keytool`
    /// and `apksigner`.
    pub fn parse(text: &str) -> Result<Self, HashParseError> {
        let cleaned: String = text.trim().chars().filter(|c| *c != ':').collect();
        if cleaned.is_empty() {
            return Err(HashParseError::Empty);
        }
        let digest = hex::decode(&cleaned)?;
        Ok(Self::from_digest(&digest))
    }

    /// Parse a hex fingerprint that must be a full `algorithm` digest
    pub fn parse_for(text: &str, algorithm: DigestAlgorithm) -> Result<Self, HashParseError> {
        let hash = Self::parse(text)?;
        if hash.digest_len() != algorithm.output_len() {
            return Err(HashParseError::WrongLength {
                algorithm,
                expected: algorithm.output_len(),
                actual: hash.digest_len(),
            });
        }
        Ok(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Digest length in bytes
    pub fn digest_len(&self) -> usize {
        self.0.len() / 2
    }
}

impl fmt::Display for SignatureHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SignatureHash {
    type Err = HashParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Gives access to the signing certificates of installed packages
pub trait CertificateSource {
    /// Certificates in the order the platform reports them
    fn signing_certificates(&self, package: &str) -> Result<Vec<Certificate>, SourceError>;
}

impl<T: CertificateSource + ?Sized> CertificateSource for &T {
    fn signing_certificates(&self, package: &str) -> Result<Vec<Certificate>, SourceError> {
        (**self).signing_certificates(package)
    }
}

impl<T: CertificateSource + ?Sized> CertificateSource for Arc<T> {
    fn signing_certificates(&self, package: &str) -> Result<Vec<Certificate>, SourceError> {
        (**self).signing_certificates(package)
    }
}

fn digest_parts<'a, D, I>(mut hasher: D, parts: I) -> Vec<u8>
where
    D: Digest,
    I: IntoIterator<Item = &'a [u8]>,
{
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().to_vec()
}

/// Hash a certificate chain.
///
/// Returns `None` when there is nothing to hash.
pub fn hash_certificates(
    certificates: &[Certificate],
    algorithm: DigestAlgorithm,
    selection: CertificateSelection,
) -> Option<SignatureHash> {
    let selected = match selection {
        CertificateSelection::First => certificates.get(..1)?,
        CertificateSelection::All => certificates,
    };
    if selected.iter().all(Certificate::is_empty) {
        return None;
    }

    let parts = selected.iter().map(Certificate::as_bytes);
    let digest = match algorithm {
        DigestAlgorithm::Sha256 => digest_parts(Sha256::new(), parts),
        DigestAlgorithm::Sha384 => digest_parts(Sha384::new(), parts),
        DigestAlgorithm::Sha512 => digest_parts(Sha512::new(), parts),
    };
    Some(SignatureHash::from_digest(&digest))
}

/// Computes signature hashes of packages from a [`CertificateSource`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureFetcher {
    algorithm: DigestAlgorithm,
    selection: CertificateSelection,
}

impl SignatureFetcher {
    pub fn new(algorithm: DigestAlgorithm, selection: CertificateSelection) -> Self {
        Self {
            algorithm,
            selection,
        }
    }

    pub fn from_config(config: &SignatureConfig) -> Self {
        Self::new(config.digest, config.certificates)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn selection(&self) -> CertificateSelection {
        self.selection
    }

    /// Signature hash of `package`.
    ///
    /// Unknown packages, packages without certificates and source failures
    /// all yield `None`, which matches no allow-list entry.
    pub fn signature_hash<S>(&self, source: &S, package: &str) -> Option<SignatureHash>
    where
        S: CertificateSource + ?Sized,
    {
        if package.trim().is_empty() {
            return None;
        }

        let certificates = match source.signing_certificates(package) {
            Ok(certificates) => certificates,
            Err(e) => {
                warn!("Cannot read signing certificates of {}: {}", package, e);
                return None;
            }
        };

        let hash = hash_certificates(&certificates, self.algorithm, self.selection);
        match &hash {
            Some(hash) => debug!(
                "Package {} {} signature: {}",
                package,
                self.algorithm.as_str(),
                hash
            ),
            None => warn!("Package {} has no signing certificate", package),
        }
        hash
    }
}
