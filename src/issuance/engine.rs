use crate::authority::AuthorityRegistry;
use crate::cert::{validate, LeafSigner, Signer};
use crate::issuance::auth::{Authenticator, RemoteUser};
use crate::issuance::request::IssuanceRequest;
use crate::storage::{CertificateRecord, CertificateStore};
use crate::utils::errors::{HostCaError, Result};
use std::sync::Arc;

/// Orchestrates authorize → validate → reserve → sign → commit.
///
/// Cheap to clone; clones share the store's reservation table, so every
/// handler in a process should use clones of one engine.
#[derive(Clone)]
pub struct IssuanceEngine {
    registry: Arc<AuthorityRegistry>,
    store: CertificateStore,
    signer: Arc<dyn Signer>,
    authenticator: Arc<dyn Authenticator>,
}

impl IssuanceEngine {
    pub fn new(registry: Arc<AuthorityRegistry>) -> Self {
        Self {
            store: CertificateStore::new(Arc::clone(&registry)),
            registry,
            signer: Arc::new(LeafSigner),
            authenticator: Arc::new(RemoteUser),
        }
    }

    pub fn with_signer(self, signer: impl Signer + 'static) -> Self {
        Self {
            signer: Arc::new(signer),
            ..self
        }
    }

    pub fn with_authenticator(self, authenticator: impl Authenticator + 'static) -> Self {
        Self {
            authenticator: Arc::new(authenticator),
            ..self
        }
    }

    pub fn registry(&self) -> &AuthorityRegistry {
        &self.registry
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    /// Issue a certificate for `request` on behalf of `caller`.
    ///
    /// Every failure is terminal for the call; nothing is retried and no
    /// reservation outlives it.
    pub async fn issue(
        &self,
        caller: Option<&str>,
        request: IssuanceRequest,
    ) -> Result<CertificateRecord> {
        let user = self.authenticator.authenticate(caller)?;
        validate(&request)?;

        let authority = self.registry.get(&request.authority)?;
        let token = match self.store.reserve(&request.authority, &request.hostname) {
            Ok(token) => token,
            Err(e @ HostCaError::Conflict { .. }) => {
                tracing::warn!(
                    "{user} requested {}/{} which already exists",
                    request.authority,
                    request.hostname
                );
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "{user} issuing {} under '{}' (alt names: {:?})",
            request.hostname,
            request.authority,
            request.alt_names
        );

        // Key generation, signing and fsync block; keep them off the runtime
        // threads. A failed or panicked task in either phase still releases
        // the token.
        let signer = Arc::clone(&self.signer);
        let signed = tokio::task::spawn_blocking(move || {
            signer.sign(&authority, &request.hostname, &request.alt_names)
        })
        .await
        .map_err(|e| HostCaError::Signing(format!("signing task failed: {e}")));

        let outcome = match signed {
            Ok(Ok(signed)) => {
                let store = self.store.clone();
                tokio::task::spawn_blocking(move || store.commit(token, &signed))
                    .await
                    .map_err(|e| HostCaError::Storage(format!("commit task failed: {e}")))
                    .and_then(|committed| committed)
            }
            Ok(Err(e)) | Err(e) => {
                self.store.abort(token);
                Err(e)
            }
        };

        match &outcome {
            Ok(record) => tracing::info!(
                "Issued {}/{} serial {}",
                record.authority,
                record.hostname,
                record.serial
            ),
            Err(e) => tracing::error!("Issuance failed: {e}"),
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::Authority;
    use crate::cert::{CertificateParser, SignedCertificate};
    use crate::test_support::TestAuthority;

    struct BrokenSigner;

    impl Signer for BrokenSigner {
        fn sign(&self, _: &Authority, _: &str, _: &[String]) -> Result<SignedCertificate> {
            Err(HostCaError::Signing("key unreadable".to_string()))
        }
    }

    /// Signs normally, then leaves a plain file where the key directory goes
    struct BlockingKeyDirSigner;

    impl Signer for BlockingKeyDirSigner {
        fn sign(
            &self,
            authority: &Authority,
            name: &str,
            alt: &[String],
        ) -> Result<SignedCertificate> {
            let signed = LeafSigner.sign(authority, name, alt)?;
            std::fs::create_dir_all(authority.storage_root()).unwrap();
            std::fs::write(authority.storage_root().join("private"), "not a dir").unwrap();
            Ok(signed)
        }
    }

    struct PanickingSigner;

    impl Signer for PanickingSigner {
        fn sign(&self, _: &Authority, _: &str, _: &[String]) -> Result<SignedCertificate> {
            panic!("signer blew up");
        }
    }

    #[tokio::test]
    async fn test_issue_new_host() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone());

        let record = engine
            .issue(
                Some("testuser"),
                IssuanceRequest::new("Test", "newhost.example.com", "test@example.com"),
            )
            .await
            .unwrap();

        let meta = CertificateParser::parse_pem(&record.pem, "Test").unwrap();
        assert_eq!(meta.cn, "newhost.example.com");
        assert!(!meta.has_san_extension);
        assert!(!engine.store().is_reserved("Test", "newhost.example.com"));
    }

    #[tokio::test]
    async fn test_auth_checked_before_validation() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone());

        let malformed = IssuanceRequest {
            authority: "Nope".to_string(),
            hostname: "not a host".to_string(),
            email: None,
            alt_names: vec!["_bad".to_string()],
        };
        let err = engine.issue(None, malformed).await.unwrap_err();
        assert!(matches!(err, HostCaError::Auth(_)));
    }

    #[tokio::test]
    async fn test_validation_before_authority_lookup() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone());

        let mut req = IssuanceRequest::new("Nope", "fail.example.com", "x@example.com");
        req.email = None;
        let err = engine.issue(Some("testuser"), req).await.unwrap_err();
        assert!(matches!(err, HostCaError::Validation(_)));

        let req = IssuanceRequest::new("Nope", "fail.example.com", "x@example.com");
        let err = engine.issue(Some("testuser"), req).await.unwrap_err();
        assert!(matches!(err, HostCaError::AuthorityNotFound(_)));
    }

    #[tokio::test]
    async fn test_signing_failure_releases_reservation() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone()).with_signer(BrokenSigner);

        let req = IssuanceRequest::new("Test", "broken.example.com", "test@example.com");
        let err = engine.issue(Some("testuser"), req).await.unwrap_err();
        assert!(matches!(err, HostCaError::Signing(_)));
        assert!(!engine.store().is_reserved("Test", "broken.example.com"));
        assert!(engine.store().list("Test").unwrap().is_empty());

        // Hostname is not blocked for a working signer
        let healthy = IssuanceEngine::new(fixture.registry.clone());
        let req = IssuanceRequest::new("Test", "broken.example.com", "test@example.com");
        healthy.issue(Some("testuser"), req).await.unwrap();
    }

    #[tokio::test]
    async fn test_commit_failure_reported_as_storage() {
        let fixture = TestAuthority::new();
        let engine =
            IssuanceEngine::new(fixture.registry.clone()).with_signer(BlockingKeyDirSigner);

        let req = IssuanceRequest::new("Test", "stuck.example.com", "test@example.com");
        let err = engine.issue(Some("testuser"), req).await.unwrap_err();
        assert!(matches!(err, HostCaError::Storage(_)));
        assert!(!engine.store().is_reserved("Test", "stuck.example.com"));
        assert!(!fixture
            .storage_root()
            .join("certs/by-name/stuck.example.com.crt")
            .exists());
    }

    #[tokio::test]
    async fn test_signer_panic_releases_reservation() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone()).with_signer(PanickingSigner);

        let req = IssuanceRequest::new("Test", "panic.example.com", "test@example.com");
        let err = engine.issue(Some("testuser"), req).await.unwrap_err();
        assert!(matches!(err, HostCaError::Signing(_)));
        assert!(!engine.store().is_reserved("Test", "panic.example.com"));
    }

    #[tokio::test]
    async fn test_custom_authenticator() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone()).with_authenticator(
            |identity: Option<&str>| match identity {
                Some("ops") => Ok("ops".to_string()),
                _ => Err(HostCaError::Auth("ops only".to_string())),
            },
        );

        let req = IssuanceRequest::new("Test", "ops.example.com", "ops@example.com");
        assert!(matches!(
            engine.issue(Some("testuser"), req.clone()).await,
            Err(HostCaError::Auth(_))
        ));
        engine.issue(Some("ops"), req).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_hostname_different_authorities() {
        let fixture = TestAuthority::new();
        let engine = IssuanceEngine::new(fixture.registry.clone());

        for authority in ["Test", "Other"] {
            let req = IssuanceRequest::new(authority, "shared.example.com", "test@example.com");
            let record = engine.issue(Some("testuser"), req).await.unwrap();
            assert_eq!(record.authority, authority);
        }
    }
}
