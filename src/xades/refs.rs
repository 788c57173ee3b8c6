//! Certificate and revocation references.
//!
//! References name a value by digest (and optionally by identifier). Matching a
//! reference against a value always recomputes the digest over the value's DER
//! encoding with the reference's own algorithm.

use crate::crypto::{compute_digest, CryptoProvider, DigestAlgorithm};
use crate::tokens::{Certificate, Crl, DistinguishedName, OcspResponse, ResponderId, SerialNumber};
use chrono::{DateTime, Utc};

/// A `Cert` entry of SigningCertificate or CompleteCertificateRefs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertRef {
    /// DigestMethod algorithm URI
    pub digest_method: String,
    /// DigestValue
    pub digest_value: Vec<u8>,
    /// X509IssuerName
    pub issuer: DistinguishedName,
    /// X509SerialNumber (decimal)
    pub serial: String,
}

impl CertRef {
    /// Build the reference a producer would write for `certificate`.
    pub fn for_certificate(certificate: &Certificate, algorithm: DigestAlgorithm) -> Self {
        Self {
            digest_method: algorithm.uri().to_string(),
            digest_value: compute_digest(algorithm, &certificate.der),
            issuer: certificate.issuer.clone(),
            serial: certificate.serial.to_decimal(),
        }
    }

    /// The digest algorithm, when supported.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        DigestAlgorithm::from_uri(&self.digest_method)
    }

    /// Whether the digest of `certificate` equals the referenced digest.
    pub fn matches(&self, certificate: &Certificate, crypto: &dyn CryptoProvider) -> bool {
        match self.digest_algorithm() {
            Some(algorithm) => crypto.digest(algorithm, &certificate.der) == self.digest_value,
            None => {
                log::warn!("Unsupported digest method in CertRef: {}", self.digest_method);
                false
            },
        }
    }

    /// Whether issuer name and serial number designate `certificate`.
    pub fn matches_issuer_serial(&self, certificate: &Certificate) -> bool {
        self.issuer == certificate.issuer
            && SerialNumber::from_decimal(&self.serial).as_ref() == Some(&certificate.serial)
    }
}

/// A `CRLRef` entry of CompleteRevocationRefs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrlRef {
    /// DigestMethod algorithm URI
    pub digest_method: String,
    /// DigestValue
    pub digest_value: Vec<u8>,
    /// CRLIdentifier/Issuer
    pub issuer: Option<DistinguishedName>,
    /// CRLIdentifier/IssueTime
    pub issue_time: Option<DateTime<Utc>>,
    /// CRLIdentifier/Number
    pub number: Option<SerialNumber>,
}

impl CrlRef {
    /// Build the reference a producer would write for `crl`.
    pub fn for_crl(crl: &Crl, algorithm: DigestAlgorithm) -> Self {
        Self {
            digest_method: algorithm.uri().to_string(),
            digest_value: compute_digest(algorithm, &crl.der),
            issuer: Some(crl.issuer.clone()),
            issue_time: Some(crl.this_update),
            number: crl.number.clone(),
        }
    }

    /// Whether `crl` is the referenced CRL.
    ///
    /// The digest must match. Identifier fields, when present, must agree too.
    pub fn matches(&self, crl: &Crl, crypto: &dyn CryptoProvider) -> bool {
        let Some(algorithm) = DigestAlgorithm::from_uri(&self.digest_method) else {
            log::warn!("Unsupported digest method in CRLRef: {}", self.digest_method);
            return false;
        };
        if crypto.digest(algorithm, &crl.der) != self.digest_value {
            return false;
        }
        self.issuer.as_ref().map_or(true, |issuer| issuer == &crl.issuer)
            && self.issue_time.map_or(true, |time| time == crl.this_update)
            && self
                .number
                .as_ref()
                .map_or(true, |number| crl.number.as_ref() == Some(number))
    }
}

/// An `OCSPRef` entry of CompleteRevocationRefs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcspRef {
    /// OCSPIdentifier/ResponderID
    pub responder: Option<ResponderId>,
    /// OCSPIdentifier/ProducedAt
    pub produced_at: DateTime<Utc>,
    /// DigestAlgAndValue, algorithm URI
    pub digest_method: Option<String>,
    /// DigestAlgAndValue, value
    pub digest_value: Option<Vec<u8>>,
}

impl OcspRef {
    /// Build the reference a producer would write for `response`.
    pub fn for_response(response: &OcspResponse, algorithm: DigestAlgorithm) -> Self {
        Self {
            responder: Some(response.responder.clone()),
            produced_at: response.produced_at,
            digest_method: Some(algorithm.uri().to_string()),
            digest_value: Some(compute_digest(algorithm, &response.der)),
        }
    }

    /// Whether `response` is the referenced OCSP response.
    ///
    /// With a digest the match is by digest; without one, by responder and
    /// producedAt.
    pub fn matches(&self, response: &OcspResponse, crypto: &dyn CryptoProvider) -> bool {
        if let (Some(method), Some(value)) = (&self.digest_method, &self.digest_value) {
            return match DigestAlgorithm::from_uri(method) {
                Some(algorithm) => &crypto.digest(algorithm, &response.der) == value,
                None => {
                    log::warn!("Unsupported digest method in OCSPRef: {}", method);
                    false
                },
            };
        }
        self.produced_at == response.produced_at
            && self
                .responder
                .as_ref()
                .map_or(true, |responder| responder == &response.responder)
    }
}
