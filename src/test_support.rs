//! Throwaway authorities for unit tests.

use crate::authority::{Authority, AuthorityRegistry, AuthoritySettings};
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Self-signed CA material: (certificate PEM, private key PEM)
pub(crate) fn ca_material(common_name: &str) -> (String, String) {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    (cert.pem(), key.serialize_pem())
}

/// Registry with authorities `Test` and `Other`, each rooted in a temp dir
pub(crate) struct TestAuthority {
    pub dir: TempDir,
    pub registry: Arc<AuthorityRegistry>,
}

impl TestAuthority {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let authorities = ["Test", "Other"].map(|name| {
            let (cert, key) = ca_material(&format!("{name} CA"));
            Authority::from_pem(
                name,
                &cert,
                &key,
                dir.path().join(format!("{name}-CA")),
                AuthoritySettings::default(),
            )
            .unwrap()
        });
        let registry = Arc::new(AuthorityRegistry::new(authorities).unwrap());
        Self { dir, registry }
    }

    /// Storage root of the `Test` authority
    pub fn storage_root(&self) -> PathBuf {
        self.dir.path().join("Test-CA")
    }
}
