//! BES → EPES → T → C → X → XL → A.
//!
//! Each level check is independent: a failing T does not stop C from being
//! evaluated. Results are composed worst-of (INVALID over UNDETERMINED over
//! VALID).

use super::timestamps::TimestampVerifier;
use super::types::{CheckResult, LevelConsistency, LevelResults, ReasonCode, SignatureLevel};
use crate::context::ValidationContext;
use crate::crypto::CryptoProvider;
use crate::xades::{SignaturePolicy, XadesSignature};

/// Outcome of the level pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelReport {
    /// Per-level results
    pub levels: LevelResults,
    /// Cross-level consistency rules
    pub consistency: LevelConsistency,
    /// Highest level reached
    pub highest_level: Option<SignatureLevel>,
}

/// Runs every level check over one signature.
pub struct LevelPipeline<'a> {
    signature: &'a XadesSignature,
    context: Option<&'a ValidationContext>,
    crypto: &'a dyn CryptoProvider,
    timestamps: &'a TimestampVerifier<'a>,
}

impl<'a> LevelPipeline<'a> {
    /// Create a pipeline. `context` is the validation context of the signing
    /// certificate, absent when the signing certificate could not be resolved.
    pub fn new(
        signature: &'a XadesSignature,
        context: Option<&'a ValidationContext>,
        crypto: &'a dyn CryptoProvider,
        timestamps: &'a TimestampVerifier<'a>,
    ) -> Self {
        Self {
            signature,
            context,
            crypto,
            timestamps,
        }
    }

    /// Run all levels and consistency rules.
    pub fn run(&self) -> LevelReport {
        let levels = LevelResults {
            bes: self.check_bes(),
            epes: self.check_epes(),
            t: self.check_t(),
            c: self.check_c(),
            x: self.check_x(),
            xl: self.check_xl(),
            a: self.check_a(),
        };
        let consistency = LevelConsistency {
            c_implies_t: self.check_c_implies_t(),
            xl_implies_x: self.check_xl_implies_x(),
        };
        let highest_level = levels.highest_level();
        log::debug!(
            "Levels of signature {:?}: highest {:?}",
            self.signature.id,
            highest_level
        );
        LevelReport {
            levels,
            consistency,
            highest_level,
        }
    }

    /// XAdES-BES: the signing certificate reference must resolve.
    pub fn check_bes(&self) -> CheckResult {
        let refs = self.signature.signing_certificate_refs();
        let Some(first) = refs.first() else {
            return CheckResult::invalid(
                ReasonCode::NoSigningCertificate,
                "no SigningCertificate reference",
            );
        };

        let embedded = self.signature.embedded_certificates();
        if embedded.iter().any(|cert| first.matches(cert, self.crypto)) {
            return CheckResult::valid("signing certificate resolved");
        }
        if embedded.iter().any(|cert| first.matches_issuer_serial(cert)) {
            return CheckResult::invalid(
                ReasonCode::SigningCertificateDigestMismatch,
                format!(
                    "certificate {} / {} found but its digest differs from the reference",
                    first.issuer, first.serial
                ),
            );
        }
        CheckResult::invalid(
            ReasonCode::NoSigningCertificate,
            "no signing certificate matches the SigningCertificate reference",
        )
    }

    /// XAdES-EPES: a policy identifier, explicit or implied.
    pub fn check_epes(&self) -> CheckResult {
        let policy = self
            .signature
            .signed_properties
            .as_ref()
            .and_then(|p| p.policy.as_ref());
        match policy {
            Some(SignaturePolicy::Implied) => CheckResult::valid("implied signature policy"),
            Some(SignaturePolicy::Explicit { identifier, .. }) => {
                CheckResult::valid(format!("signature policy {}", identifier))
            },
            None => CheckResult::invalid(ReasonCode::NoPolicy, "no SignaturePolicyIdentifier"),
        }
    }

    /// XAdES-T: at least one signature timestamp, each over the SignatureValue.
    pub fn check_t(&self) -> CheckResult {
        let timestamps = self.signature.signature_timestamps();
        if timestamps.is_empty() {
            return CheckResult::invalid(ReasonCode::NoTimestamp, "no SignatureTimeStamp");
        }
        let covered = self.signature.signature_timestamp_data();
        let details = timestamps
            .into_iter()
            .map(|ts| self.timestamps.verify("SignatureTimeStamp", ts, &covered))
            .collect();
        CheckResult::combine("signature timestamps", details)
    }

    /// XAdES-C: every needed certificate and revocation value is referenced.
    pub fn check_c(&self) -> CheckResult {
        CheckResult::combine(
            "complete validation references",
            vec![self.check_certificate_refs(), self.check_revocation_refs()],
        )
    }

    fn check_certificate_refs(&self) -> CheckResult {
        let refs = match self.signature.complete_certificate_refs() {
            Some(refs) if !refs.refs.is_empty() => refs,
            _ => {
                return CheckResult::invalid(ReasonCode::NoCertificateRef, "no certificate reference")
            },
        };
        let Some(context) = self.context else {
            return no_context();
        };

        let signing = context.target_certificate();
        let details: Vec<CheckResult> = context
            .needed_certificates()
            .filter(|needed| Some(&needed.certificate) != signing)
            .map(|needed| {
                let cert = &needed.certificate;
                if refs.refs.iter().any(|r| r.matches(cert, self.crypto)) {
                    CheckResult::valid(format!("'{}' referenced", cert.subject))
                } else {
                    CheckResult::invalid(
                        ReasonCode::MissingCertificateRef,
                        format!("no reference to certificate '{}'", cert.subject),
                    )
                }
            })
            .collect();
        CheckResult::combine("certificate references", details)
    }

    fn check_revocation_refs(&self) -> CheckResult {
        let refs = match self.signature.complete_revocation_refs() {
            Some(refs) if !refs.is_empty() => refs,
            _ => return CheckResult::invalid(ReasonCode::NoRevocationRef, "no revocation reference"),
        };
        let Some(context) = self.context else {
            return no_context();
        };

        let mut details = Vec::new();
        for crl in context.needed_crls() {
            details.push(if refs.crl_refs.iter().any(|r| r.matches(crl, self.crypto)) {
                CheckResult::valid(format!("CRL of '{}' referenced", crl.issuer))
            } else {
                CheckResult::invalid(
                    ReasonCode::MissingRevocationRef,
                    format!("no reference to CRL of '{}'", crl.issuer),
                )
            });
        }
        for response in context.needed_ocsp_responses() {
            details.push(if refs.ocsp_refs.iter().any(|r| r.matches(response, self.crypto)) {
                CheckResult::valid(format!("OCSP response of '{}' referenced", response.responder_label()))
            } else {
                CheckResult::invalid(
                    ReasonCode::MissingRevocationRef,
                    format!("no reference to OCSP response of '{}'", response.responder_label()),
                )
            });
        }
        CheckResult::combine("revocation references", details)
    }

    /// XAdES-X: type 1 or type 2 timestamps over the references.
    pub fn check_x(&self) -> CheckResult {
        let x1 = self.signature.sig_and_refs_timestamps();
        let x2 = self.signature.refs_only_timestamps();
        if x1.is_empty() && x2.is_empty() {
            return CheckResult::invalid(
                ReasonCode::NoXTimestamp,
                "no SigAndRefsTimeStamp or RefsOnlyTimeStamp",
            );
        }

        let mut details = Vec::new();
        if !x1.is_empty() {
            let covered = self.signature.sig_and_refs_data();
            details.extend(
                x1.into_iter()
                    .map(|ts| self.timestamps.verify("SigAndRefsTimeStamp", ts, &covered)),
            );
        }
        if !x2.is_empty() {
            let covered = self.signature.refs_only_data();
            details.extend(
                x2.into_iter()
                    .map(|ts| self.timestamps.verify("RefsOnlyTimeStamp", ts, &covered)),
            );
        }
        CheckResult::combine("X timestamps", details)
    }

    /// XAdES-XL: every needed value is embedded, and values cover their refs.
    pub fn check_xl(&self) -> CheckResult {
        let mut details = vec![self.check_certificate_values(), self.check_revocation_values()];
        if self.signature.complete_certificate_refs().is_some() {
            details.push(self.certificate_values_match_refs());
        }
        if self.signature.complete_revocation_refs().is_some() {
            details.push(self.revocation_values_match_refs());
        }
        CheckResult::combine("validation values", details)
    }

    fn check_certificate_values(&self) -> CheckResult {
        let values = match self.signature.certificate_values() {
            Some(values) if !values.certificates.is_empty() => values,
            _ => {
                return CheckResult::invalid(
                    ReasonCode::NoCertificateValues,
                    "no certificate values",
                )
            },
        };
        let Some(context) = self.context else {
            return no_context();
        };

        let signing = context.target_certificate();
        let details = context
            .needed_certificates()
            .filter(|needed| Some(&needed.certificate) != signing)
            .map(|needed| {
                if values.certificates.contains(&needed.certificate) {
                    CheckResult::valid(format!("'{}' embedded", needed.certificate.subject))
                } else {
                    CheckResult::invalid(
                        ReasonCode::MissingCertificateValue,
                        format!("certificate '{}' not embedded", needed.certificate.subject),
                    )
                }
            })
            .collect();
        CheckResult::combine("certificate values", details)
    }

    fn check_revocation_values(&self) -> CheckResult {
        let values = match self.signature.revocation_values() {
            Some(values) if !values.is_empty() => values,
            _ => {
                return CheckResult::invalid(ReasonCode::NoRevocationValues, "no revocation values")
            },
        };
        let Some(context) = self.context else {
            return no_context();
        };

        let mut details = Vec::new();
        for crl in context.needed_crls() {
            details.push(if values.crls.contains(crl) {
                CheckResult::valid(format!("CRL of '{}' embedded", crl.issuer))
            } else {
                CheckResult::invalid(
                    ReasonCode::MissingRevocationValue,
                    format!("CRL of '{}' not embedded", crl.issuer),
                )
            });
        }
        for response in context.needed_ocsp_responses() {
            details.push(if values.ocsp_responses.contains(response) {
                CheckResult::valid(format!("OCSP response of '{}' embedded", response.responder_label()))
            } else {
                CheckResult::invalid(
                    ReasonCode::MissingRevocationValue,
                    format!("OCSP response of '{}' not embedded", response.responder_label()),
                )
            });
        }
        CheckResult::combine("revocation values", details)
    }

    /// Every CertRef is matched by some CertificateValue (or the signing
    /// certificate). Matched refs are removed; leftovers fail.
    pub fn certificate_values_match_refs(&self) -> CheckResult {
        let leftover = self.signature.unmatched_certificate_refs(self.crypto);
        if leftover.is_empty() {
            CheckResult::valid("certificate values match references")
        } else {
            let missing: Vec<String> = leftover
                .iter()
                .map(|r| format!("{} / {}", r.issuer, r.serial))
                .collect();
            CheckResult::invalid(
                ReasonCode::CertificateValuesMismatch,
                format!("no value for certificate refs: {}", missing.join(", ")),
            )
        }
    }

    /// Every CRLRef and OCSPRef is matched by some revocation value.
    pub fn revocation_values_match_refs(&self) -> CheckResult {
        let (crl_refs, ocsp_refs) = self.signature.unmatched_revocation_refs(self.crypto);
        if crl_refs.is_empty() && ocsp_refs.is_empty() {
            CheckResult::valid("revocation values match references")
        } else {
            CheckResult::invalid(
                ReasonCode::RevocationValuesMismatch,
                format!(
                    "{} CRL refs and {} OCSP refs without a value",
                    crl_refs.len(),
                    ocsp_refs.len()
                ),
            )
        }
    }

    /// XAdES-A: archive timestamps over everything that precedes them.
    pub fn check_a(&self) -> CheckResult {
        let archives = self.signature.archive_timestamps();
        if archives.is_empty() {
            return CheckResult::invalid(ReasonCode::NoArchiveTimestamp, "no ArchiveTimeStamp");
        }
        let details = archives
            .into_iter()
            .map(|(position, ts)| {
                let covered = self.signature.archive_data(position);
                self.timestamps.verify("ArchiveTimeStamp", ts, &covered)
            })
            .collect();
        CheckResult::combine("archive timestamps", details)
    }

    /// C-level properties require a signature timestamp.
    pub fn check_c_implies_t(&self) -> Option<CheckResult> {
        let has_c = self.signature.complete_certificate_refs().is_some()
            || self.signature.complete_revocation_refs().is_some();
        if !has_c {
            return None;
        }
        Some(if self.signature.signature_timestamps().is_empty() {
            CheckResult::invalid(
                ReasonCode::CWithoutT,
                "complete references present without a SignatureTimeStamp",
            )
        } else {
            CheckResult::valid("XAdES-C builds on XAdES-T")
        })
    }

    /// XL-level properties require an X timestamp.
    pub fn check_xl_implies_x(&self) -> Option<CheckResult> {
        let has_xl = self.signature.certificate_values().is_some()
            || self.signature.revocation_values().is_some();
        if !has_xl {
            return None;
        }
        let has_x = !self.signature.sig_and_refs_timestamps().is_empty()
            || !self.signature.refs_only_timestamps().is_empty();
        Some(if has_x {
            CheckResult::valid("XAdES-XL builds on XAdES-X")
        } else {
            CheckResult::invalid(
                ReasonCode::XlWithoutX,
                "validation values present without an X timestamp",
            )
        })
    }
}

fn no_context() -> CheckResult {
    CheckResult::undetermined(
        ReasonCode::NoValidationContext,
        "signing certificate chain was not discovered",
    )
}
