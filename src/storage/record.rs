use crate::cert::SerialNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A persisted, issued certificate. Created once by a successful commit and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub authority: String,
    pub hostname: String,
    /// PEM encoding of the signed certificate
    pub pem: String,
    pub serial: SerialNumber,
    pub issued_at: DateTime<Utc>,
    pub certificate_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl CertificateRecord {
    pub fn pem_bytes(&self) -> &[u8] {
        self.pem.as_bytes()
    }
}
