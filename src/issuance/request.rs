use serde::{Deserialize, Serialize};

/// One issuance call: target authority and hostname plus the request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceRequest {
    pub authority: String,
    pub hostname: String,
    pub email: Option<String>,
    pub alt_names: Vec<String>,
}

/// Body accepted alongside an (authority, hostname) target, e.g.
/// `{"email": "ops@example.com", "alt_names": ["www.example.com"]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuanceBody {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alt_names: Vec<String>,
}

impl IssuanceRequest {
    pub fn new(authority: &str, hostname: &str, email: &str) -> Self {
        Self {
            authority: authority.to_string(),
            hostname: hostname.to_string(),
            email: Some(email.to_string()),
            alt_names: Vec::new(),
        }
    }

    pub fn with_alt_names<I, S>(mut self, alt_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alt_names = alt_names.into_iter().map(Into::into).collect();
        self
    }

    /// Combine a routed target with a deserialized body
    pub fn from_body(authority: &str, hostname: &str, body: IssuanceBody) -> Self {
        Self {
            authority: authority.to_string(),
            hostname: hostname.to_string(),
            email: body.email,
            alt_names: body.alt_names,
        }
    }
}
