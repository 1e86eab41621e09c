pub mod record;
pub mod store;

pub use record::CertificateRecord;
pub use store::{CertificateStore, ReservationToken};
