use crate::cert::metadata::CertificateMetadata;
use crate::cert::SerialNumber;
use crate::utils::errors::{HostCaError, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::DateTime;
use sha2::{Digest, Sha256};
use x509_parser::der_parser::oid;
use x509_parser::prelude::*;

// X.509 Extension OIDs
const SUBJECT_ALT_NAME_OID: oid::Oid = oid!(2.5.29 .17);
const KEY_USAGE_OID: oid::Oid = oid!(2.5.29 .15);
const EXTENDED_KEY_USAGE_OID: oid::Oid = oid!(2.5.29 .37);
const BASIC_CONSTRAINTS_OID: oid::Oid = oid!(2.5.29 .19);

pub struct CertificateParser;

impl CertificateParser {
    /// Parse certificate PEM data into metadata
    pub fn parse_pem(pem_data: &str, authority: &str) -> Result<CertificateMetadata> {
        let der_bytes = Self::pem_to_der(pem_data)?;

        let (_, cert) = X509Certificate::from_der(&der_bytes)
            .map_err(|e| HostCaError::CertParsing(format!("DER parsing error: {e}")))?;

        let fingerprint = hex::encode(Sha256::digest(&der_bytes));
        Self::extract_metadata(&cert, authority, fingerprint)
    }

    /// Decode the first CERTIFICATE block of a PEM document to DER
    pub fn pem_to_der(pem_data: &str) -> Result<Vec<u8>> {
        let mut in_cert = false;
        let mut cert_lines = Vec::new();

        for line in pem_data.lines() {
            let line = line.trim();
            if line == "-----BEGIN CERTIFICATE-----" {
                in_cert = true;
            } else if line == "-----END CERTIFICATE-----" {
                break;
            } else if in_cert {
                cert_lines.push(line);
            }
        }

        if cert_lines.is_empty() {
            return Err(HostCaError::CertParsing(
                "No certificate data found in PEM".to_string(),
            ));
        }

        general_purpose::STANDARD
            .decode(cert_lines.concat())
            .map_err(|e| HostCaError::CertParsing(format!("Base64 decode error: {e}")))
    }

    /// Check that `leaf_pem` names `ca_pem`'s subject as issuer and carries a
    /// valid signature from the CA key
    pub fn verify_issued_by(leaf_pem: &str, ca_pem: &str) -> Result<()> {
        let leaf_der = Self::pem_to_der(leaf_pem)?;
        let ca_der = Self::pem_to_der(ca_pem)?;

        let (_, leaf) = X509Certificate::from_der(&leaf_der)
            .map_err(|e| HostCaError::CertParsing(format!("leaf certificate: {e}")))?;
        let (_, ca) = X509Certificate::from_der(&ca_der)
            .map_err(|e| HostCaError::CertParsing(format!("CA certificate: {e}")))?;

        if leaf.issuer().as_raw() != ca.subject().as_raw() {
            return Err(HostCaError::CertParsing(format!(
                "issuer '{}' does not match CA subject '{}'",
                leaf.issuer(),
                ca.subject()
            )));
        }

        leaf.verify_signature(Some(ca.public_key()))
            .map_err(|e| HostCaError::CertParsing(format!("signature check failed: {e}")))
    }

    /// Extract metadata from X509 certificate
    fn extract_metadata(
        cert: &X509Certificate,
        authority: &str,
        fingerprint: String,
    ) -> Result<CertificateMetadata> {
        let serial = SerialNumber::from_bytes(&cert.serial.to_bytes_be());

        let cn = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        let issuer = cert
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or("Unknown")
            .to_string();

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| HostCaError::CertParsing("notBefore out of range".to_string()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| HostCaError::CertParsing("notAfter out of range".to_string()))?;

        let mut sans = Vec::new();
        let mut has_san_extension = false;
        let mut key_usage = Vec::new();
        let mut extended_key_usage = Vec::new();
        let mut is_ca = false;

        for ext in cert.extensions() {
            if ext.oid == SUBJECT_ALT_NAME_OID {
                has_san_extension = true;
                let (_, san) = SubjectAlternativeName::from_der(ext.value)
                    .map_err(|e| HostCaError::CertParsing(format!("subjectAltName: {e}")))?;
                for name in &san.general_names {
                    match name {
                        GeneralName::DNSName(dns) => sans.push(dns.to_string()),
                        GeneralName::IPAddress(ip) if ip.len() == 4 => {
                            sans.push(format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]));
                        }
                        _ => {}
                    }
                }
            } else if ext.oid == KEY_USAGE_OID {
                if let Ok((_, ku)) = KeyUsage::from_der(ext.value) {
                    let flags = [
                        (ku.digital_signature(), "DigitalSignature"),
                        (ku.non_repudiation(), "NonRepudiation"),
                        (ku.key_encipherment(), "KeyEncipherment"),
                        (ku.data_encipherment(), "DataEncipherment"),
                        (ku.key_agreement(), "KeyAgreement"),
                        (ku.key_cert_sign(), "KeyCertSign"),
                        (ku.crl_sign(), "CRLSign"),
                    ];
                    key_usage.extend(
                        flags
                            .iter()
                            .filter(|(set, _)| *set)
                            .map(|(_, name)| name.to_string()),
                    );
                }
            } else if ext.oid == EXTENDED_KEY_USAGE_OID {
                if let Ok((_, eku)) = ExtendedKeyUsage::from_der(ext.value) {
                    if eku.server_auth {
                        extended_key_usage.push("ServerAuth".to_string());
                    }
                    if eku.client_auth {
                        extended_key_usage.push("ClientAuth".to_string());
                    }
                    extended_key_usage.extend(eku.other.iter().map(|oid| oid.to_string()));
                }
            } else if ext.oid == BASIC_CONSTRAINTS_OID {
                if let Ok((_, bc)) = BasicConstraints::from_der(ext.value) {
                    is_ca = bc.ca;
                }
            }
        }

        Ok(CertificateMetadata {
            serial,
            cn,
            not_before,
            not_after,
            sans,
            has_san_extension,
            key_usage,
            extended_key_usage,
            is_ca,
            issuer,
            authority: authority.to_string(),
            fingerprint,
        })
    }
}
