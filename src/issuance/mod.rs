pub mod auth;
pub mod engine;
pub mod request;

pub use auth::{Authenticator, RemoteUser};
pub use engine::IssuanceEngine;
pub use request::{IssuanceBody, IssuanceRequest};
