use crate::cert::SerialNumber;
use crate::utils::output::GetColumnValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub serial: SerialNumber,
    pub cn: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub sans: Vec<String>,
    /// Whether a subjectAltName extension is present at all
    pub has_san_extension: bool,
    pub key_usage: Vec<String>,
    pub extended_key_usage: Vec<String>,
    pub is_ca: bool,
    pub issuer: String,
    pub authority: String,
    /// SHA-256 over the DER encoding, lowercase hex
    pub fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateColumn {
    Cn,
    Serial,
    NotBefore,
    NotAfter,
    Sans,
    KeyUsage,
    ExtendedKeyUsage,
    Issuer,
    Authority,
    Fingerprint,
    Expired,
}

impl FromStr for CertificateColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cn" => Ok(Self::Cn),
            "serial" => Ok(Self::Serial),
            "not_before" => Ok(Self::NotBefore),
            "not_after" => Ok(Self::NotAfter),
            "sans" => Ok(Self::Sans),
            "key_usage" => Ok(Self::KeyUsage),
            "extended_key_usage" | "ext_key_usage" => Ok(Self::ExtendedKeyUsage),
            "issuer" => Ok(Self::Issuer),
            "authority" | "ca" => Ok(Self::Authority),
            "fingerprint" | "sha256" => Ok(Self::Fingerprint),
            "expired" | "e" => Ok(Self::Expired),
            _ => Err(format!("Invalid column: {s}")),
        }
    }
}

impl CertificateColumn {
    /// Columns shown by `list` when none are requested
    pub fn defaults() -> Vec<Self> {
        vec![Self::Authority, Self::Cn, Self::Serial, Self::NotAfter, Self::Sans]
    }

    /// Parse a comma-separated column list; a leading `+` appends to the defaults
    pub fn parse_list(selection: Option<&str>) -> Result<Vec<Self>, String> {
        let Some(selection) = selection else {
            return Ok(Self::defaults());
        };

        let (mut columns, rest) = match selection.strip_prefix('+') {
            Some(rest) => (Self::defaults(), rest),
            None => (Vec::new(), selection),
        };

        for name in rest.split(',').filter(|name| !name.trim().is_empty()) {
            columns.push(name.parse()?);
        }

        if columns.is_empty() {
            return Err("No columns selected".to_string());
        }
        Ok(columns)
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Cn => "CN",
            Self::Serial => "Serial",
            Self::NotBefore => "Not Before",
            Self::NotAfter => "Not After",
            Self::Sans => "SANs",
            Self::KeyUsage => "Key Usage",
            Self::ExtendedKeyUsage => "Ext Key Usage",
            Self::Issuer => "Issuer",
            Self::Authority => "Authority",
            Self::Fingerprint => "SHA-256",
            Self::Expired => "E",
        }
    }
}

impl GetColumnValue for CertificateMetadata {
    fn get_column_value(&self, column: &CertificateColumn) -> String {
        match column {
            CertificateColumn::Cn => self.cn.clone(),
            CertificateColumn::Serial => self.serial.to_string(),
            CertificateColumn::NotBefore => self.not_before.format("%Y-%m-%d %H:%M").to_string(),
            CertificateColumn::NotAfter => self.not_after.format("%Y-%m-%d %H:%M").to_string(),
            CertificateColumn::Sans => {
                if self.has_san_extension {
                    self.sans.join(",")
                } else {
                    "-".to_string()
                }
            }
            CertificateColumn::KeyUsage => self.key_usage.join(","),
            CertificateColumn::ExtendedKeyUsage => {
                let ca_prefix = if self.is_ca { "CA:" } else { "" };
                format!("{ca_prefix}{}", self.extended_key_usage.join(","))
            }
            CertificateColumn::Issuer => self.issuer.clone(),
            CertificateColumn::Authority => self.authority.clone(),
            CertificateColumn::Fingerprint => self.fingerprint.clone(),
            CertificateColumn::Expired => {
                if self.is_expired() {
                    "✗".to_string()
                } else {
                    " ".to_string()
                }
            }
        }
    }
}

impl CertificateMetadata {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.not_after
    }

    /// Key/value rows for detailed display
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authority", self.authority.clone()),
            ("Subject CN", self.cn.clone()),
            ("Issuer", self.issuer.clone()),
            ("Serial", self.serial.as_colon_hex()),
            ("Not Before", self.not_before.to_rfc3339()),
            ("Not After", self.not_after.to_rfc3339()),
            (
                "Alt Names",
                if self.has_san_extension {
                    self.sans.join(", ")
                } else {
                    "(none)".to_string()
                },
            ),
            ("Key Usage", self.key_usage.join(", ")),
            ("Ext Key Usage", self.extended_key_usage.join(", ")),
            ("CA", self.is_ca.to_string()),
            ("SHA-256", self.fingerprint.clone()),
        ]
    }
}

impl fmt::Display for CertificateMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CN: {}, Serial: {}, Expires: {}",
            self.cn,
            self.serial,
            self.not_after.format("%Y-%m-%d %H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(has_san_extension: bool, sans: &[&str]) -> CertificateMetadata {
        CertificateMetadata {
            serial: SerialNumber::from_bytes(&[0x4a, 0x01]),
            cn: "multi.example.com".to_string(),
            not_before: Utc::now(),
            not_after: Utc::now() + chrono::Duration::days(30),
            sans: sans.iter().map(|s| s.to_string()).collect(),
            has_san_extension,
            key_usage: vec!["DigitalSignature".to_string()],
            extended_key_usage: vec!["ServerAuth".to_string()],
            is_ca: false,
            issuer: "Test CA".to_string(),
            authority: "Test".to_string(),
            fingerprint: "ab".repeat(32),
        }
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(
            CertificateColumn::parse_list(None).unwrap(),
            CertificateColumn::defaults()
        );
        assert_eq!(
            CertificateColumn::parse_list(Some("cn,serial")).unwrap(),
            vec![CertificateColumn::Cn, CertificateColumn::Serial]
        );

        let appended = CertificateColumn::parse_list(Some("+issuer")).unwrap();
        assert_eq!(appended.len(), CertificateColumn::defaults().len() + 1);
        assert_eq!(appended.last(), Some(&CertificateColumn::Issuer));

        assert!(CertificateColumn::parse_list(Some("cn,bogus")).is_err());
        assert!(CertificateColumn::parse_list(Some("")).is_err());
    }

    #[test]
    fn test_sans_column_distinguishes_absent_extension() {
        let without = sample(false, &[]);
        assert_eq!(without.get_column_value(&CertificateColumn::Sans), "-");

        let with = sample(true, &["multi1.example.com", "multi2.example.com"]);
        assert_eq!(
            with.get_column_value(&CertificateColumn::Sans),
            "multi1.example.com,multi2.example.com"
        );
    }

    #[test]
    fn test_not_expired() {
        let meta = sample(false, &[]);
        assert!(!meta.is_expired());
        assert_eq!(meta.get_column_value(&CertificateColumn::Expired), " ");
    }
}
