pub mod authority;
pub mod cert;
pub mod cli;
pub mod issuance;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export specific items to avoid conflicts
pub use authority::{Authority, AuthorityRegistry};
pub use cert::{CertificateMetadata, CertificateParser, SerialNumber};
pub use issuance::{IssuanceEngine, IssuanceRequest};
pub use storage::{CertificateRecord, CertificateStore};
pub use utils::errors::{HostCaError, Outcome, Result};
