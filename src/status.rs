//! Revocation status of a certificate.
//!
//! [`OcspAndCrlCertificateVerifier`] is the chain used by the validation context:
//! OCSP first, CRL as fallback. A verifier returns `None` when it could not
//! produce any answer, which callers must keep distinct from an answer that says
//! `Unknown` or `Revoked`.

use crate::crypto::CryptoProvider;
use crate::sources::{CrlSource, OcspSource};
use crate::tokens::{Certificate, Crl, OcspCertStatus, OcspResponse, SignedObject, SignedToken};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Revocation verdict for one certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateValidity {
    /// Not revoked at the validation date
    Valid,
    /// Revoked at or before the validation date
    Revoked,
    /// The status source does not know the certificate
    Unknown,
}

/// Kind of object proving a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusSourceType {
    /// A CRL
    Crl,
    /// An OCSP response
    Ocsp,
    /// The certificate is published in a trusted list
    TrustedList,
}

/// The CRL or OCSP response backing a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusSource {
    /// CRL evidence
    Crl(Arc<Crl>),
    /// OCSP evidence
    Ocsp(Arc<OcspResponse>),
}

impl StatusSource {
    /// The evidence as a signed token.
    pub fn to_token(&self) -> SignedToken {
        match self {
            StatusSource::Crl(crl) => SignedToken::Crl(crl.clone()),
            StatusSource::Ocsp(ocsp) => SignedToken::Ocsp(ocsp.clone()),
        }
    }
}

/// Revocation status of a certificate at a validation date.
#[derive(Debug, Clone)]
pub struct CertificateStatus {
    /// The checked certificate
    pub certificate: Arc<Certificate>,
    /// Its issuer
    pub issuer_certificate: Option<Arc<Certificate>>,
    /// Verdict
    pub validity: CertificateValidity,
    /// Evidence, absent for trusted-list certificates
    pub status_source: Option<StatusSource>,
    /// Revocation date, when revoked
    pub revocation_date: Option<DateTime<Utc>>,
    /// Date the status was evaluated for
    pub validation_date: DateTime<Utc>,
}

impl CertificateStatus {
    /// Type of the evidence.
    pub fn status_source_type(&self) -> StatusSourceType {
        match &self.status_source {
            Some(StatusSource::Crl(_)) => StatusSourceType::Crl,
            Some(StatusSource::Ocsp(_)) => StatusSourceType::Ocsp,
            None => StatusSourceType::TrustedList,
        }
    }
}

/// Produces the revocation status of a certificate.
pub trait CertificateStatusVerifier {
    /// Check `certificate`, issued by `issuer`, at `validation_date`.
    fn check(
        &self,
        certificate: &Arc<Certificate>,
        issuer: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) -> Option<CertificateStatus>;
}

/// Status from a CRL source.
pub struct CrlCertificateVerifier<'a> {
    source: &'a dyn CrlSource,
    crypto: &'a dyn CryptoProvider,
}

impl<'a> CrlCertificateVerifier<'a> {
    /// Create a verifier over `source`.
    pub fn new(source: &'a dyn CrlSource, crypto: &'a dyn CryptoProvider) -> Self {
        Self { source, crypto }
    }
}

impl CertificateStatusVerifier for CrlCertificateVerifier<'_> {
    fn check(
        &self,
        certificate: &Arc<Certificate>,
        issuer: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) -> Option<CertificateStatus> {
        let crl = self.source.get_at(certificate, issuer, validation_date)?;

        if !crl.is_signed_by(issuer, self.crypto) {
            log::warn!(
                "CRL of '{}' is not signed by '{}', ignoring it",
                crl.issuer,
                issuer.subject
            );
            return None;
        }
        if crl.this_update > validation_date {
            log::debug!(
                "CRL of '{}' was issued after {}, ignoring it",
                crl.issuer,
                validation_date
            );
            return None;
        }

        let (validity, revocation_date) = match crl.find_revoked(&certificate.serial) {
            Some(entry) if entry.revocation_date <= validation_date => {
                (CertificateValidity::Revoked, Some(entry.revocation_date))
            },
            _ => (CertificateValidity::Valid, None),
        };

        Some(CertificateStatus {
            certificate: certificate.clone(),
            issuer_certificate: Some(issuer.clone()),
            validity,
            status_source: Some(StatusSource::Crl(crl)),
            revocation_date,
            validation_date,
        })
    }
}

/// Status from an OCSP source.
///
/// A response is used only when it is signed by the issuer itself, or by a
/// responder certificate it carries that the issuer signed.
pub struct OcspCertificateVerifier<'a> {
    source: &'a dyn OcspSource,
    crypto: &'a dyn CryptoProvider,
}

impl<'a> OcspCertificateVerifier<'a> {
    /// Create a verifier over `source`.
    pub fn new(source: &'a dyn OcspSource, crypto: &'a dyn CryptoProvider) -> Self {
        Self { source, crypto }
    }

    fn is_authorized(&self, response: &OcspResponse, issuer: &Certificate) -> bool {
        if response.is_signed_by(issuer, self.crypto) {
            return true;
        }
        response.responder_certificate().is_some_and(|responder| {
            responder.is_signed_by(issuer, self.crypto) && response.is_signed_by(responder, self.crypto)
        })
    }
}

impl CertificateStatusVerifier for OcspCertificateVerifier<'_> {
    fn check(
        &self,
        certificate: &Arc<Certificate>,
        issuer: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) -> Option<CertificateStatus> {
        let response = self.source.get_at(certificate, issuer, validation_date)?;
        if !self.is_authorized(&response, issuer) {
            log::warn!(
                "OCSP response from '{}' is not signed by '{}' or a responder it certified, ignoring it",
                response.responder_label(),
                issuer.subject
            );
            return None;
        }
        let single = response.find_response(&certificate.serial)?;
        if single.this_update > validation_date {
            log::debug!(
                "OCSP response for serial {} is newer than {}, ignoring it",
                certificate.serial,
                validation_date
            );
            return None;
        }

        let (validity, revocation_date) = match single.status {
            OcspCertStatus::Good => (CertificateValidity::Valid, None),
            OcspCertStatus::Revoked(at) if at <= validation_date => {
                (CertificateValidity::Revoked, Some(at))
            },
            OcspCertStatus::Revoked(_) => (CertificateValidity::Valid, None),
            OcspCertStatus::Unknown => (CertificateValidity::Unknown, None),
        };

        Some(CertificateStatus {
            certificate: certificate.clone(),
            issuer_certificate: Some(issuer.clone()),
            validity,
            status_source: Some(StatusSource::Ocsp(response.clone())),
            revocation_date,
            validation_date,
        })
    }
}

/// OCSP first; CRL when OCSP gives no determinate answer.
pub struct OcspAndCrlCertificateVerifier<'a> {
    ocsp: Option<&'a dyn OcspSource>,
    crl: Option<&'a dyn CrlSource>,
    crypto: &'a dyn CryptoProvider,
}

impl<'a> OcspAndCrlCertificateVerifier<'a> {
    /// Create the chain. Either source may be absent.
    pub fn new(
        ocsp: Option<&'a dyn OcspSource>,
        crl: Option<&'a dyn CrlSource>,
        crypto: &'a dyn CryptoProvider,
    ) -> Self {
        Self { ocsp, crl, crypto }
    }
}

impl CertificateStatusVerifier for OcspAndCrlCertificateVerifier<'_> {
    fn check(
        &self,
        certificate: &Arc<Certificate>,
        issuer: &Arc<Certificate>,
        validation_date: DateTime<Utc>,
    ) -> Option<CertificateStatus> {
        let ocsp_status = self.ocsp.and_then(|source| {
            OcspCertificateVerifier::new(source, self.crypto).check(certificate, issuer, validation_date)
        });
        if let Some(status) = &ocsp_status {
            if status.validity != CertificateValidity::Unknown {
                log::debug!("OCSP status of '{}': {:?}", certificate.subject, status.validity);
                return ocsp_status;
            }
        }

        let crl_status = self.crl.and_then(|source| {
            CrlCertificateVerifier::new(source, self.crypto).check(
                certificate,
                issuer,
                validation_date,
            )
        });
        match crl_status {
            Some(status) => {
                log::debug!("CRL status of '{}': {:?}", certificate.subject, status.validity);
                Some(status)
            },
            // An OCSP "unknown" is still an answer.
            None => ocsp_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SignatureAlgorithm;
    use crate::sources::{ListCrlSource, ListOcspSource};
    use crate::tokens::{DistinguishedName, ResponderId, RevokedEntry, SerialNumber, SingleResponse};
    use chrono::TimeZone;

    /// Accepts a signature when its bytes spell the signer's subject name.
    struct NameCrypto;

    impl CryptoProvider for NameCrypto {
        fn verify_signature(&self, signer: &Certificate, _: &SignatureAlgorithm, _: &[u8], signature: &[u8]) -> bool {
            signature == signer.subject.as_str().as_bytes()
        }
    }

    fn at(month: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, 1, 0, 0, 0).unwrap()
    }

    fn certificate(subject: &str, issuer: &str, serial: u64) -> Arc<Certificate> {
        Arc::new(Certificate {
            der: format!("{}/{}", subject, serial).into_bytes(),
            subject: DistinguishedName::new(subject),
            issuer: DistinguishedName::new(issuer),
            serial: SerialNumber::from_u64(serial),
            not_before: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            not_after: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
            public_key_der: Vec::new(),
            tbs: Vec::new(),
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature: issuer.as_bytes().to_vec(),
            qc_statements: Vec::new(),
        })
    }

    fn crl_signed_by(signer: &str, this_update: DateTime<Utc>, revoked: &[(u64, DateTime<Utc>)]) -> Arc<Crl> {
        Arc::new(Crl {
            der: format!("crl/{}", this_update).into_bytes(),
            issuer: DistinguishedName::new("CN=CA"),
            number: Some(SerialNumber::from_u64(this_update.timestamp() as u64)),
            this_update,
            next_update: None,
            revoked: revoked
                .iter()
                .map(|(serial, revocation_date)| RevokedEntry {
                    serial: SerialNumber::from_u64(*serial),
                    revocation_date: *revocation_date,
                })
                .collect(),
            tbs: Vec::new(),
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature: signer.as_bytes().to_vec(),
        })
    }

    fn crl(this_update: DateTime<Utc>, revoked: &[(u64, DateTime<Utc>)]) -> Arc<Crl> {
        crl_signed_by("CN=CA", this_update, revoked)
    }

    fn response(
        responder: &str,
        signer: &str,
        certificates: Vec<Arc<Certificate>>,
        serial: u64,
        status: OcspCertStatus,
        this_update: DateTime<Utc>,
    ) -> Arc<OcspResponse> {
        Arc::new(OcspResponse {
            der: format!("ocsp/{}/{}/{}", responder, serial, this_update).into_bytes(),
            responder: ResponderId::ByName(DistinguishedName::new(responder)),
            produced_at: this_update,
            responses: vec![SingleResponse {
                serial: SerialNumber::from_u64(serial),
                status,
                this_update,
                next_update: None,
            }],
            tbs: Vec::new(),
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature: signer.as_bytes().to_vec(),
            certificates,
        })
    }

    fn ocsp(serial: u64, status: OcspCertStatus, this_update: DateTime<Utc>) -> Arc<OcspResponse> {
        response("CN=CA", "CN=CA", Vec::new(), serial, status, this_update)
    }

    #[test]
    fn test_crl_revocation_dates() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let crls = ListCrlSource::new([crl(at(2), &[(7, at(4))])]);
        let verifier = CrlCertificateVerifier::new(&crls, &NameCrypto);

        let status = verifier.check(&leaf, &ca, at(6)).unwrap();
        assert_eq!(status.validity, CertificateValidity::Revoked);
        assert_eq!(status.revocation_date, Some(at(4)));
        assert_eq!(status.status_source_type(), StatusSourceType::Crl);

        let status = verifier.check(&leaf, &ca, at(3)).unwrap();
        assert_eq!(status.validity, CertificateValidity::Valid);
        assert!(status.revocation_date.is_none());

        let other = certificate("CN=Other", "CN=CA", 8);
        assert_eq!(verifier.check(&other, &ca, at(6)).map(|s| s.validity), Some(CertificateValidity::Valid));
    }

    #[test]
    fn test_crl_ignored_when_too_recent_or_unsigned() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);

        let recent = ListCrlSource::new([crl(at(5), &[])]);
        assert!(CrlCertificateVerifier::new(&recent, &NameCrypto).check(&leaf, &ca, at(4)).is_none());

        let forged = ListCrlSource::new([crl_signed_by("CN=Mallory", at(2), &[])]);
        assert!(CrlCertificateVerifier::new(&forged, &NameCrypto).check(&leaf, &ca, at(6)).is_none());
    }

    #[test]
    fn test_crl_published_before_the_validation_date_is_used() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let crls = ListCrlSource::new([crl(at(2), &[(7, at(3))]), crl(at(8), &[])]);

        let status = CrlCertificateVerifier::new(&crls, &NameCrypto).check(&leaf, &ca, at(6)).unwrap();
        assert_eq!(status.validity, CertificateValidity::Revoked);
        match &status.status_source {
            Some(StatusSource::Crl(used)) => assert_eq!(used.this_update, at(2)),
            other => panic!("unexpected status source: {:?}", other),
        }
    }

    #[test]
    fn test_ocsp_statuses() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);

        let revoked_later = ListOcspSource::new([ocsp(7, OcspCertStatus::Revoked(at(8)), at(2))]);
        let verifier = OcspCertificateVerifier::new(&revoked_later, &NameCrypto);
        let status = verifier.check(&leaf, &ca, at(6)).unwrap();
        assert_eq!(status.validity, CertificateValidity::Valid);
        assert_eq!(status.status_source_type(), StatusSourceType::Ocsp);

        let status = verifier.check(&leaf, &ca, at(9)).unwrap();
        assert_eq!(status.validity, CertificateValidity::Revoked);
        assert_eq!(status.revocation_date, Some(at(8)));

        assert!(verifier.check(&leaf, &ca, at(1)).is_none());
    }

    #[test]
    fn test_ocsp_response_current_at_the_validation_date_is_used() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let responses = ListOcspSource::new([
            ocsp(7, OcspCertStatus::Good, at(2)),
            ocsp(7, OcspCertStatus::Revoked(at(7)), at(8)),
        ]);

        let status = OcspCertificateVerifier::new(&responses, &NameCrypto)
            .check(&leaf, &ca, at(6))
            .unwrap();
        assert_eq!(status.validity, CertificateValidity::Valid);
    }

    #[test]
    fn test_delegated_ocsp_responder() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let responder = certificate("CN=Responder", "CN=CA", 50);
        let delegated = response("CN=Responder", "CN=Responder", vec![responder], 7, OcspCertStatus::Good, at(2));
        let responses = ListOcspSource::new([delegated]);

        let status = OcspCertificateVerifier::new(&responses, &NameCrypto).check(&leaf, &ca, at(6));
        assert_eq!(status.map(|s| s.validity), Some(CertificateValidity::Valid));

        // A responder certificate the issuer did not sign.
        let mut rogue = certificate("CN=Responder", "CN=CA", 51);
        Arc::make_mut(&mut rogue).signature = b"CN=Mallory".to_vec();
        let responses = ListOcspSource::new([response(
            "CN=Responder",
            "CN=Responder",
            vec![rogue],
            7,
            OcspCertStatus::Good,
            at(2),
        )]);
        assert!(OcspCertificateVerifier::new(&responses, &NameCrypto).check(&leaf, &ca, at(6)).is_none());
    }

    #[test]
    fn test_ocsp_of_another_issuer_is_not_used() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let foreign = response("CN=Other CA", "CN=Other CA", Vec::new(), 7, OcspCertStatus::Good, at(2));
        let responses = ListOcspSource::new([foreign]);

        assert!(OcspCertificateVerifier::new(&responses, &NameCrypto).check(&leaf, &ca, at(6)).is_none());
    }

    #[test]
    fn test_forged_ocsp_does_not_override_crl() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let forged = response("CN=CA", "CN=Mallory", Vec::new(), 7, OcspCertStatus::Good, at(2));
        let ocsps = ListOcspSource::new([forged]);
        let crls = ListCrlSource::new([crl(at(2), &[(7, at(3))])]);

        assert!(OcspCertificateVerifier::new(&ocsps, &NameCrypto).check(&leaf, &ca, at(6)).is_none());

        let status = OcspAndCrlCertificateVerifier::new(Some(&ocsps), Some(&crls), &NameCrypto)
            .check(&leaf, &ca, at(6))
            .unwrap();
        assert_eq!(status.validity, CertificateValidity::Revoked);
        assert_eq!(status.status_source_type(), StatusSourceType::Crl);
    }

    #[test]
    fn test_ocsp_answer_wins_over_crl() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let ocsps = ListOcspSource::new([ocsp(7, OcspCertStatus::Good, at(2))]);
        let crls = ListCrlSource::new([crl(at(2), &[(7, at(3))])]);

        let status = OcspAndCrlCertificateVerifier::new(Some(&ocsps), Some(&crls), &NameCrypto)
            .check(&leaf, &ca, at(6))
            .unwrap();
        assert_eq!(status.validity, CertificateValidity::Valid);
        assert_eq!(status.status_source_type(), StatusSourceType::Ocsp);
    }

    #[test]
    fn test_ocsp_unknown_falls_back_to_crl() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        let ocsps = ListOcspSource::new([ocsp(7, OcspCertStatus::Unknown, at(2))]);
        let crls = ListCrlSource::new([crl(at(2), &[(7, at(3))])]);

        let status = OcspAndCrlCertificateVerifier::new(Some(&ocsps), Some(&crls), &NameCrypto)
            .check(&leaf, &ca, at(6))
            .unwrap();
        assert_eq!(status.validity, CertificateValidity::Revoked);
        assert_eq!(status.status_source_type(), StatusSourceType::Crl);

        // Without a CRL the unknown answer is kept.
        let status = OcspAndCrlCertificateVerifier::new(Some(&ocsps), None, &NameCrypto)
            .check(&leaf, &ca, at(6))
            .unwrap();
        assert_eq!(status.validity, CertificateValidity::Unknown);
    }

    #[test]
    fn test_no_answer() {
        let ca = certificate("CN=CA", "CN=CA", 1);
        let leaf = certificate("CN=Leaf", "CN=CA", 7);
        assert!(OcspAndCrlCertificateVerifier::new(None, None, &NameCrypto)
            .check(&leaf, &ca, at(6))
            .is_none());

        let empty = ListCrlSource::default();
        assert!(OcspAndCrlCertificateVerifier::new(None, Some(&empty), &NameCrypto)
            .check(&leaf, &ca, at(6))
            .is_none());
    }
}
