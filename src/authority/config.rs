use crate::utils::errors::{HostCaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_VALIDITY_DAYS: u32 = 365;
/// Upper bound on `validity_days`; keeps notAfter well inside year 9999
pub const MAX_VALIDITY_DAYS: u32 = 36_525;

/// Top-level authority configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub authorities: Vec<AuthorityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfig {
    pub name: String,
    /// CA certificate (PEM)
    pub certificate: PathBuf,
    /// CA private key (PEM, PKCS#8)
    pub private_key: PathBuf,
    /// Namespace for certificates issued by this authority
    pub storage_root: PathBuf,
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
    #[serde(default)]
    pub key_algorithm: KeyAlgorithm,
}

/// Algorithm used for generated leaf keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithm {
    #[default]
    EcdsaP256,
    EcdsaP384,
    Ed25519,
}

impl KeyAlgorithm {
    pub fn signature_algorithm(&self) -> &'static rcgen::SignatureAlgorithm {
        match self {
            Self::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            Self::EcdsaP384 => &rcgen::PKCS_ECDSA_P384_SHA384,
            Self::Ed25519 => &rcgen::PKCS_ED25519,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EcdsaP256 => "ecdsa-p256",
            Self::EcdsaP384 => "ecdsa-p384",
            Self::Ed25519 => "ed25519",
        }
    }
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

impl RegistryConfig {
    /// Read a YAML config file; relative paths inside it are resolved against
    /// the file's directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HostCaError::Config(format!(
                "Failed to read authority config '{}': {e}",
                path.display()
            ))
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base)
    }

    pub fn from_yaml(content: &str, base_dir: &Path) -> Result<Self> {
        let mut config: RegistryConfig = serde_yaml::from_str(content)?;
        for authority in &mut config.authorities {
            authority.resolve_paths(base_dir);
        }
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.authorities.is_empty() {
            return Err(HostCaError::Config("No authorities configured".to_string()));
        }
        for (i, authority) in self.authorities.iter().enumerate() {
            if authority.name.trim().is_empty() {
                return Err(HostCaError::Config(format!(
                    "Authority #{} has an empty name",
                    i + 1
                )));
            }
            if authority.validity_days == 0 {
                return Err(HostCaError::Config(format!(
                    "Authority '{}' has a zero validity period",
                    authority.name
                )));
            }
            if authority.validity_days > MAX_VALIDITY_DAYS {
                return Err(HostCaError::Config(format!(
                    "Authority '{}': validity_days {} exceeds {MAX_VALIDITY_DAYS}",
                    authority.name, authority.validity_days
                )));
            }
            if self.authorities[..i]
                .iter()
                .any(|other| other.name == authority.name)
            {
                return Err(HostCaError::Config(format!(
                    "Duplicate authority name '{}'",
                    authority.name
                )));
            }
        }
        Ok(())
    }
}

impl AuthorityConfig {
    fn resolve_paths(&mut self, base_dir: &Path) {
        for path in [
            &mut self.certificate,
            &mut self.private_key,
            &mut self.storage_root,
        ] {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}
