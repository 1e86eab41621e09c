pub mod metadata;
pub mod parser;
pub mod serial;
pub mod signer;
pub mod validate;

pub use metadata::{CertificateColumn, CertificateMetadata};
pub use parser::CertificateParser;
pub use serial::SerialNumber;
pub use signer::{LeafSigner, SignedCertificate, Signer};
pub use validate::{validate, ValidationError};
