//! X.509 certificates.

use super::name::{DistinguishedName, SerialNumber};
use crate::crypto::SignatureAlgorithm;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use der::asn1::{AnyRef, ObjectIdentifier};
use der::{Decode, Sequence};
use sha2::{Digest, Sha256};

/// OID of the qcStatements certificate extension.
const QC_STATEMENTS_EXTENSION: &str = "1.3.6.1.5.5.7.1.3";

/// QcCompliance statement (ETSI EN 319 412-5).
pub const QC_COMPLIANCE: &str = "0.4.0.1862.1.1";

/// QcSSCD statement: private key held in a secure signature creation device.
pub const QC_SSCD: &str = "0.4.0.1862.1.4";

/// A decoded X.509 certificate.
///
/// Only the fields the validation engine needs are kept; the original DER
/// encoding is retained for digest-based matching.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// DER encoding of the whole certificate
    pub der: Vec<u8>,
    /// Subject name
    pub subject: DistinguishedName,
    /// Issuer name
    pub issuer: DistinguishedName,
    /// Serial number
    pub serial: SerialNumber,
    /// Start of the validity period
    pub not_before: DateTime<Utc>,
    /// End of the validity period
    pub not_after: DateTime<Utc>,
    /// DER-encoded SubjectPublicKeyInfo
    pub public_key_der: Vec<u8>,
    /// DER-encoded TBSCertificate (the signed portion)
    pub tbs: Vec<u8>,
    /// Algorithm of the issuer's signature
    pub signature_algorithm: SignatureAlgorithm,
    /// Issuer's signature value
    pub signature: Vec<u8>,
    /// OIDs of the QC statements carried by the certificate
    pub qc_statements: Vec<String>,
}

#[derive(Sequence)]
struct QcStatement<'a> {
    statement_id: ObjectIdentifier,
    statement_info: Option<AnyRef<'a>>,
}

impl Certificate {
    /// Decode a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        use x509_parser::prelude::*;

        let (_, x509) = X509Certificate::from_der(der)
            .map_err(|e| Error::InvalidCertificate(e.to_string()))?;

        let validity = x509.validity();
        let not_before = timestamp(validity.not_before.timestamp())
            .ok_or_else(|| Error::InvalidCertificate("notBefore out of range".to_string()))?;
        let not_after = timestamp(validity.not_after.timestamp())
            .ok_or_else(|| Error::InvalidCertificate("notAfter out of range".to_string()))?;

        let qc_statements = x509
            .extensions()
            .iter()
            .filter(|ext| ext.oid.to_id_string() == QC_STATEMENTS_EXTENSION)
            .flat_map(|ext| decode_qc_statements(ext.value))
            .collect();

        Ok(Self {
            der: der.to_vec(),
            subject: DistinguishedName::new(x509.subject().to_string()),
            issuer: DistinguishedName::new(x509.issuer().to_string()),
            serial: SerialNumber::from_bytes(x509.raw_serial()),
            not_before,
            not_after,
            public_key_der: x509.public_key().raw.to_vec(),
            tbs: x509.tbs_certificate.as_ref().to_vec(),
            signature_algorithm: SignatureAlgorithm::from_oid(
                &x509.signature_algorithm.algorithm.to_id_string(),
            ),
            signature: x509.signature_value.data.to_vec(),
            qc_statements,
        })
    }

    /// Whether subject and issuer names are equal.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    /// Whether `instant` falls inside the validity period.
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.not_before <= instant && instant <= self.not_after
    }

    /// Whether the certificate carries the given QC statement.
    pub fn has_qc_statement(&self, oid: &str) -> bool {
        self.qc_statements.iter().any(|s| s == oid)
    }

    /// SHA-1 over the subjectPublicKey bit string, as used by OCSP `ResponderID.byKey`.
    pub fn public_key_sha1(&self) -> Option<Vec<u8>> {
        use sha1::Sha1;
        let spki = spki::SubjectPublicKeyInfoRef::from_der(&self.public_key_der).ok()?;
        Some(Sha1::digest(spki.subject_public_key.raw_bytes()).to_vec())
    }

    /// Base64 SHA-256 fingerprint of the DER encoding.
    pub fn fingerprint(&self) -> String {
        STANDARD.encode(Sha256::digest(&self.der))
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

pub(crate) fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
}

fn decode_qc_statements(value: &[u8]) -> Vec<String> {
    match Vec::<QcStatement<'_>>::from_der(value) {
        Ok(statements) => statements
            .iter()
            .map(|s| s.statement_id.to_string())
            .collect(),
        Err(e) => {
            log::warn!("Ignoring malformed qcStatements extension: {}", e);
            Vec::new()
        },
    }
}
