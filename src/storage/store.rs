use crate::authority::AuthorityRegistry;
use crate::cert::signer::SignedCertificate;
use crate::cert::validate::{check_dns_name, ValidationError};
use crate::cert::CertificateParser;
use crate::storage::record::CertificateRecord;
use crate::utils::errors::{HostCaError, Result};
use crate::utils::paths::HostCaPaths;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type ReservationKey = (String, String);

/// Filesystem certificate store, one namespace per authority.
///
/// Reservations live in a keyed table: two callers contend only when they
/// ask for the same (authority, hostname) pair.
#[derive(Clone)]
pub struct CertificateStore {
    registry: Arc<AuthorityRegistry>,
    reservations: Arc<DashMap<ReservationKey, ()>>,
}

/// Exclusive claim on one (authority, hostname) key.
///
/// Dropping the token releases the claim, so every exit path (commit, abort,
/// error, panic) frees the key.
#[derive(Debug)]
#[must_use = "dropping a reservation releases it immediately"]
pub struct ReservationToken {
    key: ReservationKey,
    storage_root: PathBuf,
    reservations: Arc<DashMap<ReservationKey, ()>>,
}

impl ReservationToken {
    pub fn authority(&self) -> &str {
        &self.key.0
    }

    pub fn hostname(&self) -> &str {
        &self.key.1
    }
}

impl Drop for ReservationToken {
    fn drop(&mut self) {
        self.reservations.remove(&self.key);
        tracing::trace!("Released reservation {}/{}", self.key.0, self.key.1);
    }
}

impl CertificateStore {
    pub fn new(registry: Arc<AuthorityRegistry>) -> Self {
        Self {
            registry,
            reservations: Arc::new(DashMap::new()),
        }
    }

    /// Atomically check for an existing record and claim the key.
    ///
    /// Fails with `Conflict` if a certificate or key is already stored or
    /// another caller holds the key; nothing is touched on failure.
    pub fn reserve(&self, authority: &str, hostname: &str) -> Result<ReservationToken> {
        let ca = self.registry.get(authority)?;
        check_dns_name(hostname).map_err(|reason| ValidationError::InvalidHostname {
            value: hostname.to_string(),
            reason,
        })?;
        let certificate_path = HostCaPaths::certificate_path(ca.storage_root(), hostname);
        let private_key_path = HostCaPaths::private_key_path(ca.storage_root(), hostname);
        let key = (authority.to_string(), hostname.to_string());

        match self.reservations.entry(key.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!("Reservation {authority}/{hostname} already held");
                Err(conflict(authority, hostname))
            }
            Entry::Vacant(slot) => {
                // The shard stays locked until the slot is filled, so the
                // existence check and the claim are one step. A key without a
                // certificate belongs to a writer outside this store.
                for path in [&certificate_path, &private_key_path] {
                    let exists = path.try_exists().map_err(|e| {
                        HostCaError::Storage(format!("Cannot stat '{}': {e}", path.display()))
                    })?;
                    if exists {
                        return Err(conflict(authority, hostname));
                    }
                }
                slot.insert(());
                tracing::trace!("Acquired reservation {authority}/{hostname}");
                Ok(ReservationToken {
                    key,
                    storage_root: ca.storage_root().to_path_buf(),
                    reservations: Arc::clone(&self.reservations),
                })
            }
        }
    }

    /// Persist a signed certificate under the reserved key, then release it.
    ///
    /// Both files are published with no-clobber renames. The key goes first
    /// and acts as the cross-process claim; the certificate goes last so
    /// readers never observe a partial record. A file that already exists is
    /// left untouched and the call ends in `Conflict`.
    pub fn commit(
        &self,
        token: ReservationToken,
        signed: &SignedCertificate,
    ) -> Result<CertificateRecord> {
        let hostname = token.hostname();
        let certs_dir = HostCaPaths::certs_dir(&token.storage_root);
        let private_dir = HostCaPaths::private_dir(&token.storage_root);
        let certificate_path = HostCaPaths::certificate_path(&token.storage_root, hostname);
        let private_key_path = HostCaPaths::private_key_path(&token.storage_root, hostname);

        for (dir, mode) in [(&certs_dir, 0o755), (&private_dir, 0o700)] {
            HostCaPaths::ensure_dir_exists(dir, mode).map_err(|e| {
                HostCaError::Storage(format!("Cannot create '{}': {e}", dir.display()))
            })?;
        }

        if let Err(e) = write_atomic(
            &private_dir,
            &private_key_path,
            signed.private_key_pem.as_bytes(),
            0o600,
        ) {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                tracing::warn!(
                    "{} is held by another writer",
                    private_key_path.display()
                );
                return Err(conflict(token.authority(), hostname));
            }
            tracing::error!("Writing {} failed: {e}", private_key_path.display());
            return Err(write_error(&private_key_path, e));
        }

        if let Err(e) = write_atomic(
            &certs_dir,
            &certificate_path,
            signed.certificate_pem.as_bytes(),
            0o644,
        ) {
            // The no-clobber rename above means this key is ours
            let _ = fs::remove_file(&private_key_path);
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                tracing::warn!(
                    "{} appeared outside this store",
                    certificate_path.display()
                );
                return Err(conflict(token.authority(), hostname));
            }
            tracing::error!("Publishing {} failed: {e}", certificate_path.display());
            return Err(write_error(&certificate_path, e));
        }

        let record = CertificateRecord {
            authority: token.authority().to_string(),
            hostname: hostname.to_string(),
            pem: signed.certificate_pem.clone(),
            serial: signed.serial.clone(),
            issued_at: Utc::now(),
            certificate_path,
            private_key_path,
        };

        tracing::info!(
            "Stored certificate {}",
            record.certificate_path.display()
        );
        drop(token);
        Ok(record)
    }

    /// Release a reservation without persisting anything
    pub fn abort(&self, token: ReservationToken) {
        tracing::debug!(
            "Aborting reservation {}/{}",
            token.authority(),
            token.hostname()
        );
        drop(token);
    }

    /// Whether a reservation is currently held for the key
    pub fn is_reserved(&self, authority: &str, hostname: &str) -> bool {
        self.reservations
            .contains_key(&(authority.to_string(), hostname.to_string()))
    }

    /// Read back a stored certificate
    pub fn load(&self, authority: &str, hostname: &str) -> Result<CertificateRecord> {
        check_dns_name(hostname)
            .map_err(|e| HostCaError::InvalidInput(format!("hostname {hostname:?}: {e}")))?;
        let ca = self.registry.get(authority)?;
        let certificate_path = HostCaPaths::certificate_path(ca.storage_root(), hostname);

        let pem = match fs::read_to_string(&certificate_path) {
            Ok(pem) => pem,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(HostCaError::CertNotFound(format!("{authority}/{hostname}")));
            }
            Err(e) => {
                return Err(HostCaError::Storage(format!(
                    "Cannot read '{}': {e}",
                    certificate_path.display()
                )))
            }
        };
        let meta = CertificateParser::parse_pem(&pem, authority)?;

        Ok(CertificateRecord {
            authority: authority.to_string(),
            hostname: hostname.to_string(),
            pem,
            serial: meta.serial,
            issued_at: meta.not_before,
            certificate_path,
            private_key_path: HostCaPaths::private_key_path(ca.storage_root(), hostname),
        })
    }

    /// Hostnames with a stored certificate, sorted
    pub fn list(&self, authority: &str) -> Result<Vec<String>> {
        let ca = self.registry.get(authority)?;
        let certs_dir = HostCaPaths::certs_dir(ca.storage_root());
        if !certs_dir.exists() {
            return Ok(Vec::new());
        }

        let mut hostnames = Vec::new();
        for entry in fs::read_dir(&certs_dir)? {
            let name = entry?.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if let Some(hostname) = name.strip_suffix(".crt") {
                hostnames.push(hostname.to_string());
            }
        }
        hostnames.sort();
        Ok(hostnames)
    }
}

fn conflict(authority: &str, hostname: &str) -> HostCaError {
    HostCaError::Conflict {
        authority: authority.to_string(),
        hostname: hostname.to_string(),
    }
}

/// Write `contents` to a temp file in `dir`, sync it, then rename onto
/// `target`. The rename fails with `AlreadyExists` if `target` exists.
fn write_atomic(dir: &Path, target: &Path, contents: &[u8], mode: u32) -> std::io::Result<()> {
    let mut tmp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist_noclobber(target).map_err(|e| e.error)?;
    Ok(())
}

fn write_error(target: &Path, e: std::io::Error) -> HostCaError {
    HostCaError::Storage(format!("Cannot write '{}': {e}", target.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::{LeafSigner, Signer};
    use crate::test_support::TestAuthority;

    fn sign(fixture: &TestAuthority, hostname: &str) -> SignedCertificate {
        let authority = fixture.registry.get("Test").unwrap();
        LeafSigner.sign(&authority, hostname, &[]).unwrap()
    }

    #[test]
    fn test_reserve_commit_then_conflict() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        let token = store.reserve("Test", "newhost.example.com").unwrap();
        assert!(store.is_reserved("Test", "newhost.example.com"));

        let signed = sign(&fixture, "newhost.example.com");
        let record = store.commit(token, &signed).unwrap();
        assert!(!store.is_reserved("Test", "newhost.example.com"));
        assert_eq!(
            record.certificate_path,
            fixture
                .storage_root()
                .join("certs/by-name/newhost.example.com.crt")
        );
        assert_eq!(
            fs::read_to_string(&record.certificate_path).unwrap(),
            signed.certificate_pem
        );
        assert!(record.private_key_path.exists());

        let err = store.reserve("Test", "newhost.example.com").unwrap_err();
        assert!(matches!(err, HostCaError::Conflict { .. }));
    }

    #[test]
    fn test_reservation_blocks_second_reserve() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        let _held = store.reserve("Test", "busy.example.com").unwrap();
        assert!(matches!(
            store.reserve("Test", "busy.example.com"),
            Err(HostCaError::Conflict { .. })
        ));
        // Other keys are independent
        let _other = store.reserve("Test", "idle.example.com").unwrap();
    }

    #[test]
    fn test_abort_and_drop_release() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        let token = store.reserve("Test", "retry.example.com").unwrap();
        store.abort(token);
        assert!(!store.is_reserved("Test", "retry.example.com"));

        {
            let _token = store.reserve("Test", "retry.example.com").unwrap();
        }
        assert!(!store.is_reserved("Test", "retry.example.com"));

        assert!(store.list("Test").unwrap().is_empty());
        assert!(!fixture
            .storage_root()
            .join("certs/by-name/retry.example.com.crt")
            .exists());
    }

    #[test]
    fn test_unknown_authority() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());
        assert!(matches!(
            store.reserve("Nope", "host.example.com"),
            Err(HostCaError::AuthorityNotFound(_))
        ));
    }

    #[test]
    fn test_commit_refuses_to_overwrite() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        let token = store.reserve("Test", "race.example.com").unwrap();
        // Simulate another writer publishing behind our back
        let certs_dir = fixture.storage_root().join("certs/by-name");
        fs::create_dir_all(&certs_dir).unwrap();
        fs::write(certs_dir.join("race.example.com.crt"), "original").unwrap();

        let err = store
            .commit(token, &sign(&fixture, "race.example.com"))
            .unwrap_err();
        assert!(matches!(err, HostCaError::Conflict { .. }));
        assert_eq!(
            fs::read_to_string(certs_dir.join("race.example.com.crt")).unwrap(),
            "original"
        );
        assert!(!fixture
            .storage_root()
            .join("private/by-name/race.example.com.key")
            .exists());
        assert!(!store.is_reserved("Test", "race.example.com"));
    }

    #[test]
    fn test_second_store_cannot_clobber_winner() {
        let fixture = TestAuthority::new();
        let first = CertificateStore::new(fixture.registry.clone());
        let second = CertificateStore::new(fixture.registry.clone());

        // Separate tables, as in two processes sharing a storage root
        let losing = first.reserve("Test", "dup.example.com").unwrap();
        let winning = second.reserve("Test", "dup.example.com").unwrap();

        let winner = sign(&fixture, "dup.example.com");
        second.commit(winning, &winner).unwrap();

        let err = first
            .commit(losing, &sign(&fixture, "dup.example.com"))
            .unwrap_err();
        assert!(matches!(err, HostCaError::Conflict { .. }));

        let root = fixture.storage_root();
        assert_eq!(
            fs::read_to_string(root.join("private/by-name/dup.example.com.key")).unwrap(),
            winner.private_key_pem
        );
        assert_eq!(
            fs::read_to_string(root.join("certs/by-name/dup.example.com.crt")).unwrap(),
            winner.certificate_pem
        );
        assert!(!first.is_reserved("Test", "dup.example.com"));
    }

    #[test]
    fn test_leftover_key_blocks_commit() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        let token = store.reserve("Test", "orphan.example.com").unwrap();
        let private_dir = fixture.storage_root().join("private/by-name");
        fs::create_dir_all(&private_dir).unwrap();
        fs::write(private_dir.join("orphan.example.com.key"), "in flight").unwrap();

        let err = store
            .commit(token, &sign(&fixture, "orphan.example.com"))
            .unwrap_err();
        assert!(matches!(err, HostCaError::Conflict { .. }));
        assert_eq!(
            fs::read_to_string(private_dir.join("orphan.example.com.key")).unwrap(),
            "in flight"
        );
        assert!(!fixture
            .storage_root()
            .join("certs/by-name/orphan.example.com.crt")
            .exists());

        // Later callers are turned away before signing
        assert!(matches!(
            store.reserve("Test", "orphan.example.com"),
            Err(HostCaError::Conflict { .. })
        ));
    }

    #[test]
    fn test_load_and_list() {
        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());

        for host in ["b.example.com", "a.example.com"] {
            let token = store.reserve("Test", host).unwrap();
            store.commit(token, &sign(&fixture, host)).unwrap();
        }

        assert_eq!(
            store.list("Test").unwrap(),
            vec!["a.example.com".to_string(), "b.example.com".to_string()]
        );

        let record = store.load("Test", "a.example.com").unwrap();
        assert_eq!(record.hostname, "a.example.com");
        assert!(record.pem.starts_with("-----BEGIN CERTIFICATE-----"));

        assert!(matches!(
            store.load("Test", "missing.example.com"),
            Err(HostCaError::CertNotFound(_))
        ));
        assert!(matches!(
            store.load("Test", "../../etc/passwd"),
            Err(HostCaError::InvalidInput(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_modes() {
        use std::os::unix::fs::PermissionsExt;

        let fixture = TestAuthority::new();
        let store = CertificateStore::new(fixture.registry.clone());
        let token = store.reserve("Test", "modes.example.com").unwrap();
        let record = store
            .commit(token, &sign(&fixture, "modes.example.com"))
            .unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&record.certificate_path), 0o644);
        assert_eq!(mode(&record.private_key_path), 0o600);
    }
}
