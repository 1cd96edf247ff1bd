//! Allow-list
//!
//! Maps trusted signature hashes to the package names each signer may
//! vouch for. Built once, then only read.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;
use tracing::debug;

use bindguard_core::AllowListConfig;

use crate::error::AllowListError;
use crate::signature::{DigestAlgorithm, SignatureHash};

/// Literal package name or regular expression
///
/// A package matches when it equals the pattern text, or when the pattern
/// matches the whole package name.
#[derive(Debug, Clone)]
pub struct PackagePattern {
    pattern: String,
    regex: Regex,
}

impl PackagePattern {
    pub fn new(pattern: &str) -> Result<Self, AllowListError> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(AllowListError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "empty pattern".to_string(),
            });
        }

        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|e| {
            AllowListError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, package: &str) -> bool {
        package == self.pattern || self.regex.is_match(package)
    }
}

impl PartialEq for PackagePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for PackagePattern {}

impl fmt::Display for PackagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Immutable mapping of signature hash to permitted package patterns
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: HashMap<SignatureHash, Vec<PackagePattern>>,
}

impl AllowList {
    /// An allow-list that rejects everyone
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builder accepting SHA-256 signatures
    pub fn builder() -> AllowListBuilder {
        AllowListBuilder::default()
    }

    /// Build from the serialized form. Entries sharing a signature merge.
    ///
    /// Every signature must be a full `digest` hash.
    pub fn from_config(
        config: &AllowListConfig,
        digest: DigestAlgorithm,
    ) -> Result<Self, AllowListError> {
        let mut builder = AllowListBuilder::new(digest);
        for entry in &config.entries {
            for package in &entry.packages {
                builder = builder.allow(&entry.signature, package)?;
            }
        }
        let allow_list = builder.build();
        debug!(
            "Allow-list built: {} signatures, {} patterns",
            allow_list.len(),
            allow_list.pattern_count()
        );
        Ok(allow_list)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of trusted signatures
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn patterns_for(&self, signature: &SignatureHash) -> Option<&[PackagePattern]> {
        self.entries.get(signature).map(Vec::as_slice)
    }

    /// Whether `signature` may vouch for `package`
    pub fn permits(&self, signature: &SignatureHash, package: &str) -> bool {
        self.patterns_for(signature)
            .map(|patterns| patterns.iter().any(|p| p.matches(package)))
            .unwrap_or(false)
    }

    /// First of `packages` that `signature` may vouch for
    pub fn permits_any<'a, I>(&self, signature: &SignatureHash, packages: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let patterns = self.patterns_for(signature)?;
        packages
            .into_iter()
            .find(|package| patterns.iter().any(|p| p.matches(package)))
    }

    /// Entries sorted by signature
    pub fn iter(&self) -> impl Iterator<Item = (&SignatureHash, &[PackagePattern])> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(signature, patterns)| (signature, patterns.as_slice()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter()
    }
}

/// Incremental [`AllowList`] construction
#[derive(Debug, Default)]
pub struct AllowListBuilder {
    digest: DigestAlgorithm,
    entries: HashMap<SignatureHash, Vec<PackagePattern>>,
}

impl AllowListBuilder {
    /// Builder accepting `digest` signatures only
    pub fn new(digest: DigestAlgorithm) -> Self {
        Self {
            digest,
            entries: HashMap::new(),
        }
    }

    /// Let packages matching `pattern` through when signed by `signature`
    pub fn allow(mut self, signature: &str, pattern: &str) -> Result<Self, AllowListError> {
        let hash = SignatureHash::parse_for(signature, self.digest).map_err(|source| {
            AllowListError::InvalidSignature {
                signature: signature.to_string(),
                source,
            }
        })?;
        let pattern = PackagePattern::new(pattern)?;

        let patterns = self.entries.entry(hash).or_default();
        if !patterns.contains(&pattern) {
            patterns.push(pattern);
        }
        Ok(self)
    }

    pub fn allow_all(mut self, signature: &str, patterns: &[&str]) -> Result<Self, AllowListError> {
        for pattern in patterns {
            self = self.allow(signature, pattern)?;
        }
        Ok(self)
    }

    pub fn build(self) -> AllowList {
        AllowList {
            entries: self.entries,
        }
    }
}
