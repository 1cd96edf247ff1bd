//! Package inventory
//!
//! Offline snapshot of a device's packages: which uid each one runs as
//! and which certificates signed it. Serves as both the caller resolver
//! and the certificate source of an access check.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use bindguard_access::{CallerResolver, Certificate, CertificateSource, SourceError, Uid};

use crate::certificate::read_certificates;
use crate::InventoryError;

/// One installed package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Package name
    pub name: String,
    /// Uid the package runs as
    pub uid: Uid,
    /// Hex encoded DER certificates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificates: Vec<String>,
    /// DER or PEM certificate files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_files: Vec<PathBuf>,
}

impl PackageRecord {
    pub fn new(name: &str, uid: Uid) -> Self {
        Self {
            name: name.to_string(),
            uid,
            certificates: Vec::new(),
            certificate_files: Vec::new(),
        }
    }

    /// Add an inline DER certificate
    pub fn with_certificate(mut self, der: &[u8]) -> Self {
        self.certificates.push(hex::encode(der));
        self
    }

    pub fn with_certificate_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.certificate_files.push(path.into());
        self
    }
}

/// Inventory file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryFormat {
    Toml,
    Json,
}

impl InventoryFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(InventoryFormat::Toml),
            "json" => Some(InventoryFormat::Json),
            _ => None,
        }
    }
}

/// Snapshot of installed packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInventory {
    #[serde(default, rename = "package")]
    packages: Vec<PackageRecord>,
    /// Base for relative certificate paths
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl PackageInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative certificate paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, InventoryError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> Result<Self, InventoryError> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Load an inventory file; TOML or JSON by extension
    pub async fn load(path: &Path) -> Result<Self, InventoryError> {
        if !path.exists() {
            return Err(InventoryError::NotFound(path.to_path_buf()));
        }
        let format = InventoryFormat::from_path(path)
            .ok_or_else(|| InventoryError::UnsupportedFormat(path.to_path_buf()))?;

        debug!("Loading package inventory from {:?}", path);
        let contents = tokio::fs::read_to_string(path).await?;
        let inventory = match format {
            InventoryFormat::Toml => Self::from_toml_str(&contents)?,
            InventoryFormat::Json => Self::from_json_str(&contents)?,
        };
        info!("Loaded {} packages from {:?}", inventory.len(), path);

        Ok(match path.parent() {
            Some(dir) => inventory.with_base_dir(dir),
            None => inventory,
        })
    }

    pub fn add(&mut self, record: PackageRecord) {
        self.packages.push(record);
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.packages
    }

    /// First record for `name`
    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|record| record.name == name)
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Apply `pm list packages -U` results.
    ///
    /// Known packages take the first uid listed for them; further uids
    /// (other users) become extra records sharing the certificates.
    /// Returns the number of records added.
    pub fn merge_package_list(&mut self, listing: &[(String, Uid)]) -> usize {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut added = 0;

        for (name, uid) in listing {
            if self.packages.iter().any(|r| r.name == *name && r.uid == *uid) {
                seen.insert(name.as_str());
                continue;
            }

            let first_sighting = seen.insert(name.as_str());
            match self.packages.iter_mut().find(|r| r.name == *name) {
                Some(record) if first_sighting => {
                    debug!("Package {} moved from uid {} to {}", name, record.uid, uid);
                    record.uid = *uid;
                }
                Some(record) => {
                    let extra = PackageRecord {
                        uid: *uid,
                        ..record.clone()
                    };
                    self.packages.push(extra);
                    added += 1;
                }
                None => {
                    self.packages.push(PackageRecord::new(name, *uid));
                    added += 1;
                }
            }
        }

        added
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl CallerResolver for PackageInventory {
    fn packages_for_uid(&self, uid: Uid) -> Option<Vec<String>> {
        let packages: Vec<String> = self
            .packages
            .iter()
            .filter(|record| record.uid == uid)
            .map(|record| record.name.clone())
            .collect();

        if packages.is_empty() {
            None
        } else {
            Some(packages)
        }
    }
}

impl CertificateSource for PackageInventory {
    fn signing_certificates(&self, package: &str) -> Result<Vec<Certificate>, SourceError> {
        let record = self
            .get(package)
            .ok_or_else(|| SourceError::PackageNotFound(package.to_string()))?;

        let mut certificates = Vec::new();
        for encoded in &record.certificates {
            let der = hex::decode(encoded.trim()).map_err(|e| {
                SourceError::InvalidCertificate(format!("{}: {}", package, e))
            })?;
            certificates.push(Certificate::new(der));
        }
        for path in &record.certificate_files {
            certificates.extend(read_certificates(&self.resolve(path))?);
        }

        Ok(certificates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindguard_access::{AccessGuard, AllowList, SignatureFetcher};

    const INVENTORY: &str = r#"
[[package]]
name = "com.example.app"
uid = 10057
certificates = ["3003020101"]

[[package]]
name = "com.example.core"
uid = 10090

[[package]]
name = "com.example.plugin"
uid = 10090
certificates = ["3003020101"]
"#;

    #[test]
    fn test_parse_toml() {
        let inventory = PackageInventory::from_toml_str(INVENTORY).unwrap();
        assert_eq!(inventory.len(), 3);
        assert_eq!(inventory.get("com.example.app").unwrap().uid, Uid(10057));
        assert_eq!(
            inventory.packages_for_uid(Uid(10090)),
            Some(vec!["com.example.core".to_string(), "com.example.plugin".to_string()])
        );
        assert_eq!(inventory.packages_for_uid(Uid(1)), None);
    }

    #[test]
    fn test_parse_json() {
        let inventory = PackageInventory::from_json_str(
            r#"{"package": [{"name": "com.example.app", "uid": 10057, "certificates": ["AABB"]}]}"#,
        )
        .unwrap();
        let certs = inventory.signing_certificates("com.example.app").unwrap();
        assert_eq!(certs, vec![Certificate::new(vec![0xaa, 0xbb])]);
    }

    #[test]
    fn test_built_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lineage.der"), b"second").unwrap();

        let mut inventory = PackageInventory::new().with_base_dir(dir.path());
        inventory.add(
            PackageRecord::new("com.example.app", Uid(10057))
                .with_certificate(b"first")
                .with_certificate_file("lineage.der"),
        );

        let certs = inventory.signing_certificates("com.example.app").unwrap();
        assert_eq!(
            certs,
            vec![Certificate::from(&b"first"[..]), Certificate::from(&b"second"[..])]
        );
    }

    #[test]
    fn test_certificate_errors() {
        let mut inventory = PackageInventory::new();
        inventory.add(PackageRecord {
            certificates: vec!["xyz".into()],
            ..PackageRecord::new("com.example.bad", Uid(10001))
        });

        assert!(matches!(
            inventory.signing_certificates("com.example.bad"),
            Err(SourceError::InvalidCertificate(_))
        ));
        assert!(matches!(
            inventory.signing_certificates("com.example.missing"),
            Err(SourceError::PackageNotFound(_))
        ));
    }

    #[test]
    fn test_merge_package_list() {
        let mut inventory = PackageInventory::from_toml_str(INVENTORY).unwrap();
        let listing = crate::parse_package_list(
            "package:com.example.app uid:10058,1010058\n\
             package:com.example.core uid:10090\n\
             package:com.example.new uid:10200\n",
        );

        let added = inventory.merge_package_list(&listing);
        assert_eq!(added, 2);
        assert_eq!(inventory.packages_for_uid(Uid(10057)), None);
        let packages = |uid| inventory.packages_for_uid(Uid(uid));
        assert_eq!(packages(10058), Some(vec!["com.example.app".to_string()]));
        assert_eq!(packages(1_010_058), Some(vec!["com.example.app".to_string()]));
        assert_eq!(packages(10200), Some(vec!["com.example.new".to_string()]));

        // second user keeps the signer
        let record = inventory.records().iter().find(|r| r.uid == Uid(1_010_058)).unwrap();
        assert_eq!(record.certificates, vec!["3003020101".to_string()]);

        // re-applying is a no-op
        assert_eq!(inventory.merge_package_list(&listing), 0);
    }

    #[tokio::test]
    async fn test_load_resolves_certificate_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("certs")).unwrap();
        std::fs::write(dir.path().join("certs/release.der"), b"release-cert").unwrap();
        std::fs::write(
            dir.path().join("inventory.toml"),
            r#"
[[package]]
name = "com.example.app"
uid = 10057
certificate_files = ["certs/release.der"]
"#,
        )
        .unwrap();

        let inventory = PackageInventory::load(&dir.path().join("inventory.toml")).await.unwrap();
        let certs = inventory.signing_certificates("com.example.app").unwrap();
        assert_eq!(certs, vec![Certificate::from(&b"release-cert"[..])]);

        // the inventory plugs straight into a guard
        let signature = SignatureFetcher::default()
            .signature_hash(&inventory, "com.example.app")
            .unwrap();
        let allow_list = AllowList::builder()
            .allow(signature.as_str(), "com.example.app")
            .unwrap()
            .build();
        let guard = AccessGuard::new(allow_list, &inventory, &inventory);
        assert!(guard.is_uid_allowed(Uid(10057)));
    }

    #[tokio::test]
    async fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("inventory.yaml");
        std::fs::write(&yaml, "package: []").unwrap();

        assert!(matches!(
            PackageInventory::load(&yaml).await,
            Err(InventoryError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            PackageInventory::load(&dir.path().join("missing.toml")).await,
            Err(InventoryError::NotFound(_))
        ));
    }
}
