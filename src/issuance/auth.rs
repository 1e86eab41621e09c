use crate::utils::errors::{HostCaError, Result};

/// Decides whether a caller may issue certificates.
///
/// Identity itself is established elsewhere (web server, CLI); the engine
/// only sees whatever identity string, if any, came with the request.
pub trait Authenticator: Send + Sync {
    /// Return the accepted caller name, or `HostCaError::Auth`
    fn authenticate(&self, identity: Option<&str>) -> Result<String>;
}

/// Accepts any non-empty identity, like a front end that sets `REMOTE_USER`
/// only after a successful login
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteUser;

impl Authenticator for RemoteUser {
    fn authenticate(&self, identity: Option<&str>) -> Result<String> {
        match identity.map(str::trim) {
            Some(user) if !user.is_empty() => Ok(user.to_string()),
            _ => Err(HostCaError::Auth("no authenticated caller".to_string())),
        }
    }
}

/// Closures work as authenticators, which keeps tests short
impl<F> Authenticator for F
where
    F: Fn(Option<&str>) -> Result<String> + Send + Sync,
{
    fn authenticate(&self, identity: Option<&str>) -> Result<String> {
        self(identity)
    }
}
