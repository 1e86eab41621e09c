//! Request validation for certificate issuance.
//!
//! Pure checks only: nothing here touches storage or key material. Fields are
//! checked in a fixed order (email, hostname, then each alt-name) and the
//! first failure is reported.

use crate::issuance::IssuanceRequest;
use thiserror::Error;

const MAX_NAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("email is required")]
    MissingEmail,

    #[error("hostname {value:?} is not a valid DNS name: {reason}")]
    InvalidHostname { value: String, reason: DnsNameError },

    #[error("alt_names[{index}] {value:?} is not a valid DNS name: {reason}")]
    InvalidAltName {
        index: usize,
        value: String,
        reason: DnsNameError,
    },
}

impl ValidationError {
    /// Name of the offending request field
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingEmail => "email",
            Self::InvalidHostname { .. } => "hostname",
            Self::InvalidAltName { .. } => "alt_names",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsNameError {
    #[error("name is empty")]
    Empty,
    #[error("name exceeds {MAX_NAME_LEN} characters")]
    TooLong,
    #[error("empty label")]
    EmptyLabel,
    #[error("label exceeds {MAX_LABEL_LEN} characters")]
    LabelTooLong,
    #[error("invalid character {0:?}")]
    InvalidCharacter(char),
    #[error("label starts or ends with a hyphen")]
    HyphenEdge,
}

/// Check a request against the issuance rules
pub fn validate(request: &IssuanceRequest) -> Result<(), ValidationError> {
    match request.email.as_deref() {
        Some(email) if !email.trim().is_empty() => {}
        _ => return Err(ValidationError::MissingEmail),
    }

    check_dns_name(&request.hostname).map_err(|reason| ValidationError::InvalidHostname {
        value: request.hostname.clone(),
        reason,
    })?;

    for (index, name) in request.alt_names.iter().enumerate() {
        check_dns_name(name).map_err(|reason| ValidationError::InvalidAltName {
            index,
            value: name.clone(),
            reason,
        })?;
    }

    Ok(())
}

/// Syntax check for a DNS host name: dot-separated LDH labels.
///
/// Trailing dots and wildcards are rejected; an accepted name is always a
/// safe single path component.
pub fn check_dns_name(name: &str) -> Result<(), DnsNameError> {
    if name.is_empty() {
        return Err(DnsNameError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(DnsNameError::TooLong);
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(DnsNameError::EmptyLabel);
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DnsNameError::LabelTooLong);
        }
        if let Some(ch) = label
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '-'))
        {
            return Err(DnsNameError::InvalidCharacter(ch));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DnsNameError::HyphenEdge);
        }
    }

    Ok(())
}
