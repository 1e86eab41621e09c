use crate::authority::config::{AuthorityConfig, KeyAlgorithm, RegistryConfig};
use crate::cert::CertificateParser;
use crate::utils::errors::{HostCaError, Result};
use ordermap::OrderMap;
use rcgen::{Issuer, KeyPair};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use x509_parser::prelude::*;

/// Per-authority issuance settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthoritySettings {
    pub validity_days: u32,
    pub key_algorithm: KeyAlgorithm,
}

impl Default for AuthoritySettings {
    fn default() -> Self {
        Self {
            validity_days: 365,
            key_algorithm: KeyAlgorithm::default(),
        }
    }
}

/// A loaded certificate authority. Immutable once built; the signing key is
/// only reachable from inside the crate's signer.
pub struct Authority {
    name: String,
    issuer: Issuer<'static, KeyPair>,
    ca_certificate_pem: String,
    storage_root: PathBuf,
    settings: AuthoritySettings,
}

impl Authority {
    /// Build an authority from PEM material, checking that the key belongs
    /// to the certificate
    pub fn from_pem(
        name: &str,
        ca_certificate_pem: &str,
        private_key_pem: &str,
        storage_root: impl Into<PathBuf>,
        settings: AuthoritySettings,
    ) -> Result<Self> {
        let key_pair = KeyPair::from_pem(private_key_pem).map_err(|e| {
            HostCaError::Config(format!("Authority '{name}': unreadable private key: {e}"))
        })?;

        let der = CertificateParser::pem_to_der(ca_certificate_pem)?;
        let (_, ca_cert) = X509Certificate::from_der(&der).map_err(|e| {
            HostCaError::Config(format!("Authority '{name}': invalid CA certificate: {e}"))
        })?;

        if ca_cert.public_key().subject_public_key.data.as_ref() != key_pair.public_key_raw() {
            return Err(HostCaError::Config(format!(
                "Authority '{name}': private key does not match CA certificate"
            )));
        }

        match ca_cert.basic_constraints() {
            Ok(Some(bc)) if bc.value.ca => {}
            _ => tracing::warn!("Authority '{name}': CA certificate lacks CA:TRUE basic constraints"),
        }

        let issuer = Issuer::from_ca_cert_pem(ca_certificate_pem, key_pair).map_err(|e| {
            HostCaError::Config(format!("Authority '{name}': cannot build issuer: {e}"))
        })?;

        Ok(Self {
            name: name.to_string(),
            issuer,
            ca_certificate_pem: ca_certificate_pem.to_string(),
            storage_root: storage_root.into(),
            settings,
        })
    }

    /// Load an authority from the files named in its config entry
    pub fn load(config: &AuthorityConfig) -> Result<Self> {
        let read = |path: &Path, what: &str| {
            fs::read_to_string(path).map_err(|e| {
                HostCaError::Config(format!(
                    "Authority '{}': failed to read {what} '{}': {e}",
                    config.name,
                    path.display()
                ))
            })
        };

        let certificate = read(&config.certificate, "certificate")?;
        let private_key = read(&config.private_key, "private key")?;

        Self::from_pem(
            &config.name,
            &certificate,
            &private_key,
            config.storage_root.clone(),
            AuthoritySettings {
                validity_days: config.validity_days,
                key_algorithm: config.key_algorithm,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ca_certificate_pem(&self) -> &str {
        &self.ca_certificate_pem
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn settings(&self) -> &AuthoritySettings {
        &self.settings
    }

    pub(crate) fn issuer(&self) -> &Issuer<'static, KeyPair> {
        &self.issuer
    }
}

impl fmt::Debug for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authority")
            .field("name", &self.name)
            .field("storage_root", &self.storage_root)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Immutable name → authority table, built once and shared read-only
#[derive(Debug, Default)]
pub struct AuthorityRegistry {
    authorities: OrderMap<String, Arc<Authority>>,
}

impl AuthorityRegistry {
    pub fn new(authorities: impl IntoIterator<Item = Authority>) -> Result<Self> {
        let mut map = OrderMap::new();
        for authority in authorities {
            let name = authority.name().to_string();
            if map.insert(name.clone(), Arc::new(authority)).is_some() {
                return Err(HostCaError::Config(format!(
                    "Duplicate authority name '{name}'"
                )));
            }
        }
        Ok(Self { authorities: map })
    }

    pub fn from_config(config: &RegistryConfig) -> Result<Self> {
        let authorities = config
            .authorities
            .iter()
            .map(|entry| {
                let authority = Authority::load(entry)?;
                tracing::info!(
                    "Loaded authority '{}' (storage: {})",
                    authority.name(),
                    authority.storage_root().display()
                );
                Ok(authority)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(authorities)
    }

    /// Read the YAML config at `path` and load every authority in it
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_config(&RegistryConfig::load(path)?)
    }

    pub fn get(&self, name: &str) -> Result<Arc<Authority>> {
        self.authorities
            .get(name)
            .cloned()
            .ok_or_else(|| HostCaError::AuthorityNotFound(name.to_string()))
    }

    /// Authority names in configuration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.authorities.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Authority>> {
        self.authorities.values()
    }

    pub fn len(&self) -> usize {
        self.authorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authorities.is_empty()
    }
}
