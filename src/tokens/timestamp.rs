//! RFC 3161 timestamp tokens.
//!
//! Like OCSP responses, tokens arrive already decoded from the CMS layer.

use super::certificate::Certificate;
use super::name::{DistinguishedName, SerialNumber};
use crate::crypto::SignatureAlgorithm;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// TSTInfo message imprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageImprint {
    /// Dotted OID of the hash algorithm
    pub algorithm_oid: String,
    /// Hash of the timestamped data
    pub digest: Vec<u8>,
}

/// A decoded timestamp token.
#[derive(Debug, Clone)]
pub struct TimestampToken {
    /// DER encoding of the ContentInfo
    pub der: Vec<u8>,
    /// genTime
    pub gen_time: DateTime<Utc>,
    /// messageImprint
    pub imprint: MessageImprint,
    /// Issuer of the TSA certificate (SignerInfo sid)
    pub signer_issuer: DistinguishedName,
    /// Serial of the TSA certificate (SignerInfo sid)
    pub signer_serial: SerialNumber,
    /// DER-encoded signed attributes (the signed portion)
    pub signed_attributes: Vec<u8>,
    /// Signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Signature value
    pub signature: Vec<u8>,
    /// Certificates bundled in the SignedData
    pub certificates: Vec<Arc<Certificate>>,
}

impl TimestampToken {
    /// The embedded certificate matching the signer identifier.
    pub fn signer_certificate(&self) -> Option<&Arc<Certificate>> {
        self.certificates
            .iter()
            .find(|c| c.issuer == self.signer_issuer && c.serial == self.signer_serial)
    }
}

impl PartialEq for TimestampToken {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for TimestampToken {}
