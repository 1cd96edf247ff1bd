//! Caller access check
//!
//! Resolves the caller's uid to package names, fingerprints their signing
//! certificates and consults the [`AllowList`].

use std::sync::Arc;

use tracing::{debug, info};

use crate::allowlist::AllowList;
use crate::error::AccessError;
use crate::identity::{CallerResolver, CallingUid, Uid};
use crate::signature::{CertificateSource, SignatureFetcher, SignatureHash};

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// `package`, signed with `signature`, is on the allow-list
    Allowed {
        package: String,
        signature: SignatureHash,
    },
    /// None of `packages` is allowed
    Denied { packages: Vec<String> },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed { .. })
    }
}

/// Decides whether a caller may use a privileged interface
///
/// The allow-list is fixed at construction. The guard holds no mutable
/// state and can be shared between threads.
#[derive(Debug, Clone)]
pub struct AccessGuard<R, C> {
    allow_list: Arc<AllowList>,
    resolver: R,
    certificates: C,
    fetcher: SignatureFetcher,
}

impl<R, C> AccessGuard<R, C>
where
    R: CallerResolver,
    C: CertificateSource,
{
    pub fn new(allow_list: impl Into<Arc<AllowList>>, resolver: R, certificates: C) -> Self {
        Self {
            allow_list: allow_list.into(),
            resolver,
            certificates,
            fetcher: SignatureFetcher::default(),
        }
    }

    /// Use a different digest or certificate selection
    pub fn with_fetcher(mut self, fetcher: SignatureFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn fetcher(&self) -> &SignatureFetcher {
        &self.fetcher
    }

    /// Packages running under `uid`
    pub fn packages_for_uid(&self, uid: Uid) -> Result<Vec<String>, AccessError> {
        match self.resolver.packages_for_uid(uid) {
            Some(packages) if !packages.is_empty() => Ok(packages),
            _ => Err(AccessError::UnknownUid(uid)),
        }
    }

    /// Representative package of `uid`; the first one under a shared uid
    pub fn primary_package_for_uid(&self, uid: Uid) -> Result<String, AccessError> {
        let mut packages = self.packages_for_uid(uid)?;
        Ok(packages.swap_remove(0))
    }

    /// Check `uid` and report which package and signature let it through
    pub fn evaluate(&self, uid: Uid) -> Result<AccessDecision, AccessError> {
        let packages = self.packages_for_uid(uid)?;
        debug!("Uid {} resolves to {:?}", uid, packages);
        Ok(self.evaluate_packages(&packages))
    }

    /// Check a set of packages sharing one process identity.
    ///
    /// Each package's signature is looked up in turn; a signature on the
    /// allow-list grants access if any of the packages matches one of its
    /// patterns.
    pub fn evaluate_packages(&self, packages: &[String]) -> AccessDecision {
        if self.allow_list.is_empty() {
            info!("Allow-list is empty, rejecting {:?}", packages);
            return AccessDecision::Denied {
                packages: packages.to_vec(),
            };
        }

        for candidate in packages {
            let Some(signature) = self.fetcher.signature_hash(&self.certificates, candidate) else {
                continue;
            };
            debug!(
                "Checking if packages {:?} with signature {} are allowed",
                packages, signature
            );

            let matched = self
                .allow_list
                .permits_any(&signature, packages.iter().map(String::as_str));
            if let Some(package) = matched {
                debug!("Package {} is allowed", package);
                return AccessDecision::Allowed {
                    package: package.to_string(),
                    signature,
                };
            }
        }

        info!("Packages {:?} are NOT allowed", packages);
        AccessDecision::Denied {
            packages: packages.to_vec(),
        }
    }

    /// Whether the process running as `uid` is allowed.
    ///
    /// Fails only when the platform knows no package for `uid`.
    pub fn try_is_uid_allowed(&self, uid: Uid) -> Result<bool, AccessError> {
        self.evaluate(uid).map(|decision| decision.is_allowed())
    }

    /// Whether the process running as `uid` is allowed.
    ///
    /// # Panics
    ///
    /// Panics if the platform knows no package for `uid`. Every process able
    /// to make a binder call has one, so this means the package database is
    /// corrupt or the resolver is wired to the wrong source.
    pub fn is_uid_allowed(&self, uid: Uid) -> bool {
        match self.try_is_uid_allowed(uid) {
            Ok(allowed) => allowed,
            Err(e) => panic!("caller identity cannot be resolved: {}", e),
        }
    }

    /// Whether `package` is allowed, skipping uid resolution
    pub fn is_package_allowed(&self, package: &str) -> bool {
        self.evaluate_packages(&[package.to_string()]).is_allowed()
    }

    /// Whether the process currently calling into the service is allowed.
    ///
    /// # Panics
    ///
    /// Same as [`AccessGuard::is_uid_allowed`].
    pub fn is_caller_allowed<I>(&self, caller: &I) -> bool
    where
        I: CallingUid + ?Sized,
    {
        self.is_uid_allowed(caller.calling_uid())
    }
}
