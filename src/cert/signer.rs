//! Leaf certificate signing.
//!
//! The signer is a pure function of its inputs plus a fresh key pair and
//! serial number; it never reads or writes the certificate store.

use crate::authority::Authority;
use crate::cert::SerialNumber;
use crate::utils::errors::{HostCaError, Result};
use chrono::{DateTime, Days, Utc};
use rcgen::string::Ia5String;
use rcgen::{
    CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose, IsCa, KeyPair,
    KeyUsagePurpose, SanType,
};
use std::time::SystemTime;

/// 9999-12-31T23:59:59Z, the last instant an X.509 GeneralizedTime can hold
const X509_MAX_TIMESTAMP: i64 = 253_402_300_799;

/// Output of a successful signing operation
#[derive(Debug, Clone)]
pub struct SignedCertificate {
    pub certificate_pem: String,
    pub private_key_pem: String,
    pub serial: SerialNumber,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// Produces leaf certificates on behalf of an authority
pub trait Signer: Send + Sync {
    fn sign(
        &self,
        authority: &Authority,
        subject_name: &str,
        alt_names: &[String],
    ) -> Result<SignedCertificate>;
}

/// Default signer: fresh key per leaf, random serial, TLS server/client usage
#[derive(Debug, Default, Clone, Copy)]
pub struct LeafSigner;

impl Signer for LeafSigner {
    fn sign(
        &self,
        authority: &Authority,
        subject_name: &str,
        alt_names: &[String],
    ) -> Result<SignedCertificate> {
        let settings = authority.settings();
        let serial = SerialNumber::generate();

        let mut params = CertificateParams::default();
        params.distinguished_name = subject(subject_name);
        params.subject_alt_names = san_entries(alt_names)?;
        params.is_ca = IsCa::ExplicitNoCa;
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyEncipherment,
        ];
        params.extended_key_usages = vec![
            ExtendedKeyUsagePurpose::ServerAuth,
            ExtendedKeyUsagePurpose::ClientAuth,
        ];
        params.use_authority_key_identifier_extension = true;
        params.serial_number = Some((&serial).into());

        let not_before = Utc::now();
        let not_after = validity_end(not_before, settings.validity_days)?;
        params.not_before = SystemTime::from(not_before).into();
        params.not_after = SystemTime::from(not_after).into();

        let key_pair = KeyPair::generate_for(settings.key_algorithm.signature_algorithm())
            .map_err(|e| HostCaError::Signing(format!("Failed to generate leaf key: {e}")))?;

        let cert = params
            .signed_by(&key_pair, authority.issuer())
            .map_err(|e| {
                HostCaError::Signing(format!(
                    "Authority '{}' failed to sign {subject_name}: {e}",
                    authority.name()
                ))
            })?;

        tracing::debug!(
            "Signed {subject_name} under '{}' with serial {serial}",
            authority.name()
        );

        Ok(SignedCertificate {
            certificate_pem: cert.pem(),
            private_key_pem: key_pair.serialize_pem(),
            serial,
            not_before,
            not_after,
        })
    }
}

fn validity_end(start: DateTime<Utc>, validity_days: u32) -> Result<DateTime<Utc>> {
    start
        .checked_add_days(Days::new(u64::from(validity_days)))
        .filter(|end| end.timestamp() <= X509_MAX_TIMESTAMP)
        .ok_or_else(|| {
            HostCaError::Signing(format!(
                "validity of {validity_days} days ends after 9999-12-31"
            ))
        })
}

fn subject(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn
}

/// One DNS SAN per alt-name, in request order. Empty input means no SAN
/// extension is emitted.
fn san_entries(alt_names: &[String]) -> Result<Vec<SanType>> {
    alt_names
        .iter()
        .map(|name| {
            Ia5String::try_from(name.clone())
                .map(SanType::DnsName)
                .map_err(|e| HostCaError::Signing(format!("invalid DNS name '{name}': {e}")))
        })
        .collect()
}
