//! Certificate revocation lists.

use super::certificate::timestamp;
use super::name::{DistinguishedName, SerialNumber};
use crate::crypto::SignatureAlgorithm;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};

/// A revoked certificate entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    /// Serial number of the revoked certificate
    pub serial: SerialNumber,
    /// Date of revocation
    pub revocation_date: DateTime<Utc>,
}

/// A decoded CRL.
#[derive(Debug, Clone)]
pub struct Crl {
    /// DER encoding of the whole CRL
    pub der: Vec<u8>,
    /// Issuer name
    pub issuer: DistinguishedName,
    /// cRLNumber extension, when present
    pub number: Option<SerialNumber>,
    /// thisUpdate
    pub this_update: DateTime<Utc>,
    /// nextUpdate
    pub next_update: Option<DateTime<Utc>>,
    /// Revoked certificates
    pub revoked: Vec<RevokedEntry>,
    /// DER-encoded TBSCertList
    pub tbs: Vec<u8>,
    /// Signature algorithm
    pub signature_algorithm: SignatureAlgorithm,
    /// Signature value
    pub signature: Vec<u8>,
}

impl Crl {
    /// Decode a DER-encoded CRL.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        use x509_parser::prelude::*;

        let (_, crl) =
            CertificateRevocationList::from_der(der).map_err(|e| Error::InvalidCrl(e.to_string()))?;

        let this_update = timestamp(crl.last_update().timestamp())
            .ok_or_else(|| Error::InvalidCrl("thisUpdate out of range".to_string()))?;
        let next_update = crl.next_update().and_then(|t| timestamp(t.timestamp()));

        let mut revoked = Vec::new();
        for entry in crl.iter_revoked_certificates() {
            let revocation_date = timestamp(entry.revocation_date.timestamp())
                .ok_or_else(|| Error::InvalidCrl("revocationDate out of range".to_string()))?;
            revoked.push(RevokedEntry {
                serial: SerialNumber::from_bytes(entry.raw_serial()),
                revocation_date,
            });
        }

        Ok(Self {
            der: der.to_vec(),
            issuer: DistinguishedName::new(crl.issuer().to_string()),
            number: crl
                .crl_number()
                .map(|n| SerialNumber::from_bytes(&n.to_bytes_be())),
            this_update,
            next_update,
            revoked,
            tbs: crl.tbs_cert_list.as_ref().to_vec(),
            signature_algorithm: SignatureAlgorithm::from_oid(
                &crl.signature_algorithm.algorithm.to_id_string(),
            ),
            signature: crl.signature_value.data.to_vec(),
        })
    }

    /// Revocation entry for `serial`, if listed.
    pub fn find_revoked(&self, serial: &SerialNumber) -> Option<&RevokedEntry> {
        self.revoked.iter().find(|entry| &entry.serial == serial)
    }
}

impl PartialEq for Crl {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Crl {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_revoked() {
        let date = timestamp(1_700_000_000).unwrap();
        let crl = Crl {
            der: vec![1],
            issuer: DistinguishedName::new("CN=CA"),
            number: None,
            this_update: date,
            next_update: None,
            revoked: vec![RevokedEntry {
                serial: SerialNumber::from_u64(7),
                revocation_date: date,
            }],
            tbs: vec![],
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature: vec![],
        };
        assert!(crl.find_revoked(&SerialNumber::from_u64(7)).is_some());
        assert!(crl.find_revoked(&SerialNumber::from_u64(8)).is_none());
    }

    #[test]
    fn test_from_der_rejects_garbage() {
        assert!(matches!(Crl::from_der(b"not a crl"), Err(Error::InvalidCrl(_))));
    }
}
