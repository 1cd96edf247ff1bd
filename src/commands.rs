//! CLI commands for bindguard
//!
//! Runs access checks against a captured package inventory, for scripting
//! and for auditing an allow-list before it ships with a service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use bindguard_access::{
    hash_certificates, AccessDecision, AccessGuard, AllowList, CertificateSelection,
    DigestAlgorithm, SignatureFetcher, SignatureHash, Uid,
};
use bindguard_core::config::{AllowListConfig, AppConfig};
use bindguard_package_store::{parse_package_list, read_certificates, PackageInventory};

/// Load the allow-list named by the configuration
pub async fn load_allow_list(config: &AppConfig) -> Result<AllowList> {
    let path = config
        .allowlist
        .as_deref()
        .context("no allow-list configured (use --allowlist or set `allowlist` in config.toml)")?;

    let allow_list_config = AllowListConfig::load(path)
        .await
        .with_context(|| format!("failed to load allow-list {}", path.display()))?;
    let allow_list = AllowList::from_config(&allow_list_config, config.signature.digest)
        .with_context(|| format!("invalid allow-list {}", path.display()))?;

    if allow_list.is_empty() {
        info!("Allow-list {:?} is empty, every caller will be rejected", path);
    }
    Ok(allow_list)
}

/// Load the package inventory named by the configuration
pub async fn load_inventory(config: &AppConfig) -> Result<PackageInventory> {
    let path = config.inventory.as_deref().context(
        "no package inventory configured (use --inventory or set `inventory` in config.toml)",
    )?;

    PackageInventory::load(path)
        .await
        .with_context(|| format!("failed to load inventory {}", path.display()))
}

/// What a check command looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckTarget {
    /// A process identity, resolved through the inventory
    Uid(Uid),
    /// A single package, no uid resolution
    Package(String),
}

/// Check command options
pub struct CheckCommand {
    /// Caller to check
    pub target: CheckTarget,
    /// `pm list packages -U` output to merge into the inventory first
    pub package_list: Option<PathBuf>,
}

impl CheckCommand {
    /// Execute the check command
    pub async fn execute(&self, config: &AppConfig) -> Result<AccessDecision> {
        let allow_list = load_allow_list(config).await?;
        let mut inventory = load_inventory(config).await?;

        if let Some(path) = &self.package_list {
            let output = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read package list {}", path.display()))?;
            let added = inventory.merge_package_list(&parse_package_list(&output));
            debug!("Merged package list {:?}, {} new records", path, added);
        }

        let guard = AccessGuard::new(allow_list, &inventory, &inventory)
            .with_fetcher(SignatureFetcher::from_config(&config.signature));

        let decision = match &self.target {
            CheckTarget::Uid(uid) => guard
                .evaluate(*uid)
                .with_context(|| format!("cannot check uid {}", uid))?,
            CheckTarget::Package(package) => guard.evaluate_packages(&[package.clone()]),
        };

        info!("Check of {:?}: allowed = {}", self.target, decision.is_allowed());
        Ok(decision)
    }
}

/// Hash command options
pub struct HashCommand {
    /// Certificate files, in signing order
    pub files: Vec<PathBuf>,
    /// Digest algorithm
    pub digest: DigestAlgorithm,
    /// Certificate selection
    pub selection: CertificateSelection,
}

impl HashCommand {
    /// Compute the signature hash of the given certificates
    pub fn execute(&self) -> Result<SignatureHash> {
        let mut certificates = Vec::new();
        for file in &self.files {
            let certs = read_certificates(file)
                .with_context(|| format!("failed to read certificate {}", file.display()))?;
            certificates.extend(certs);
        }

        hash_certificates(&certificates, self.digest, self.selection)
            .context("no certificate data to hash")
    }
}

/// Allow-list command
pub struct AllowListCommand;

impl AllowListCommand {
    /// Validate the configured allow-list and return it
    pub async fn execute(&self, config: &AppConfig) -> Result<AllowList> {
        load_allow_list(config).await
    }
}

/// Render an allow-list for display
pub fn format_allow_list(allow_list: &AllowList) -> String {
    let mut out = String::new();
    for (signature, patterns) in allow_list.iter() {
        out.push_str(signature.as_str());
        out.push('\n');
        for pattern in patterns {
            out.push_str("    ");
            out.push_str(pattern.as_str());
            out.push('\n');
        }
    }
    out
}

/// Resolve the configuration, applying command line overrides
pub async fn resolve_config(
    config_file: Option<&Path>,
    allowlist: Option<PathBuf>,
    inventory: Option<PathBuf>,
) -> Result<AppConfig> {
    let mut config = match config_file {
        Some(path) => AppConfig::load_from(path)
            .await
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AppConfig::load().await.context("failed to load config")?,
    };

    if allowlist.is_some() {
        config.allowlist = allowlist;
    }
    if inventory.is_some() {
        config.inventory = inventory;
    }
    Ok(config)
}
