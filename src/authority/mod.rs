pub mod config;
pub mod registry;

pub use config::{AuthorityConfig, KeyAlgorithm, RegistryConfig};
pub use registry::{Authority, AuthorityRegistry, AuthoritySettings};
