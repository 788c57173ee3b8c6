//! Signature validation entry point.
//!
//! [`SignatureValidator`] ties everything together for one signature:
//!
//! 1. mandatory elements are checked (missing SignedProperties or an empty
//!    SignatureValue abort with [`Error::Structural`])
//! 2. the structural checker runs over the property graph
//! 3. the signing certificate is resolved and its [`ValidationContext`] built,
//!    with the signature's embedded values consulted before external sources
//! 4. integrity, chain trust, levels and qualification are evaluated
//! 5. counter-signatures are validated recursively
//!
//! # Example
//!
//! ```ignore
//! use xades_oxide::{SignatureValidator, ListCertificateSource, CertificateSourceType};
//!
//! let mut trusted = ListCertificateSource::new(CertificateSourceType::TrustedList);
//! trusted.add_trusted(root, service);
//!
//! let mut validator = SignatureValidator::new(trusted);
//! let report = validator.validate(&signature, chrono::Utc::now())?;
//! println!("{}", report.to_json()?);
//! ```

use crate::config::ValidationConfig;
use crate::context::{RevocationData, UnresolvedReason, ValidationContext, ValidationSources};
use crate::crypto::{compute_digest, CryptoProvider, DigestAlgorithm, RsaCryptoProvider, SignatureAlgorithm};
use crate::error::{Error, Result};
use crate::levels::{CheckResult, LevelPipeline, ReasonCode, TimestampVerifier};
use crate::report::{CertificateSummary, EvidenceSummary, Qualification, ValidationReport};
use crate::sources::{
    CertificateSource, CertificateSourceType, CompositeCertificateSource, CompositeCrlSource,
    CompositeOcspSource, CrlSource, ListCertificateSource, ListCrlSource, ListOcspSource,
    OcspSource,
};
use crate::status::CertificateValidity;
use crate::structure::StructuralChecker;
use crate::tokens::{Certificate, QC_COMPLIANCE, QC_SSCD};
use crate::xades::XadesSignature;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// The last context built, reused when the same certificate is validated at
/// the same instant with the same embedded evidence.
#[derive(Debug, Clone)]
struct CachedContext {
    certificate: Arc<Certificate>,
    validation_date: DateTime<Utc>,
    evidence_digest: Vec<u8>,
    context: ValidationContext,
}

/// Validates XAdES signatures.
pub struct SignatureValidator {
    crypto: Box<dyn CryptoProvider>,
    trusted_list: ListCertificateSource,
    certificate_source: Option<Box<dyn CertificateSource>>,
    crl_source: Option<Box<dyn CrlSource>>,
    ocsp_source: Option<Box<dyn OcspSource>>,
    config: ValidationConfig,
    last_context: Option<CachedContext>,
}

impl SignatureValidator {
    /// Create a validator trusting `trusted_list`, with the RSA crypto provider
    /// and default configuration.
    pub fn new(trusted_list: ListCertificateSource) -> Self {
        Self {
            crypto: Box::new(RsaCryptoProvider::new()),
            trusted_list,
            certificate_source: None,
            crl_source: None,
            ocsp_source: None,
            config: ValidationConfig::default(),
            last_context: None,
        }
    }

    /// Replace the crypto provider.
    pub fn with_crypto(mut self, crypto: impl CryptoProvider + 'static) -> Self {
        self.crypto = Box::new(crypto);
        self
    }

    /// Add an external certificate source (AIA, intermediate store).
    pub fn with_certificate_source(mut self, source: impl CertificateSource + 'static) -> Self {
        self.certificate_source = Some(Box::new(source));
        self
    }

    /// Add an external CRL source.
    pub fn with_crl_source(mut self, source: impl CrlSource + 'static) -> Self {
        self.crl_source = Some(Box::new(source));
        self
    }

    /// Add an external OCSP source.
    pub fn with_ocsp_source(mut self, source: impl OcspSource + 'static) -> Self {
        self.ocsp_source = Some(Box::new(source));
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ValidationConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The context built by the last validation, if any.
    pub fn last_context(&self) -> Option<&ValidationContext> {
        self.last_context.as_ref().map(|cached| &cached.context)
    }

    /// Validate `signature` at `validation_time`.
    pub fn validate(
        &mut self,
        signature: &XadesSignature,
        validation_time: DateTime<Utc>,
    ) -> Result<ValidationReport> {
        let mut memo = self.last_context.take();
        let report = self.validate_signature(signature, validation_time, &mut memo);
        self.last_context = memo;
        report
    }

    fn validate_signature(
        &self,
        signature: &XadesSignature,
        validation_time: DateTime<Utc>,
        memo: &mut Option<CachedContext>,
    ) -> Result<ValidationReport> {
        let label = signature.id.as_deref().unwrap_or("<no id>");
        log::info!("Validating signature {} at {}", label, validation_time.to_rfc3339());

        if signature.signed_properties.is_none() {
            return Err(Error::Structural(format!(
                "signature {} has no SignedProperties",
                label
            )));
        }
        if signature.signature_value.value.is_empty() {
            return Err(Error::Structural(format!(
                "signature {} has an empty SignatureValue",
                label
            )));
        }

        let crypto = self.crypto.as_ref();
        let structure = StructuralChecker::from_config(&self.config).check(signature, crypto);
        let signing_certificate = signature.signing_certificate(crypto);

        // Embedded values are consulted before any external source.
        let embedded_certificates = ListCertificateSource::from_certificates(
            CertificateSourceType::Embedded,
            signature.embedded_certificates(),
        );
        let revocation_values = signature.revocation_values();
        let embedded_crls = ListCrlSource::new(revocation_values.iter().flat_map(|v| v.crls.iter().cloned()));
        let embedded_ocsp = ListOcspSource::new(
            revocation_values
                .iter()
                .flat_map(|v| v.ocsp_responses.iter().cloned()),
        );

        let mut certificates = CompositeCertificateSource::new().with(&embedded_certificates);
        if let Some(source) = &self.certificate_source {
            certificates = certificates.with(source.as_ref());
        }
        let mut crls = CompositeCrlSource::new().with(&embedded_crls);
        if let Some(source) = &self.crl_source {
            crls = crls.with(source.as_ref());
        }
        let mut ocsp = CompositeOcspSource::new().with(&embedded_ocsp);
        if let Some(source) = &self.ocsp_source {
            ocsp = ocsp.with(source.as_ref());
        }

        let sources = ValidationSources::new(crypto)
            .with_trusted_list(&self.trusted_list)
            .with_external(&certificates)
            .with_crl_source(&crls)
            .with_ocsp_source(&ocsp);

        let context = match &signing_certificate {
            Some(certificate) => Some(self.signing_context(
                signature,
                certificate,
                validation_time,
                &sources,
                memo,
            )?),
            None => {
                log::warn!("Signing certificate of {} could not be resolved", label);
                None
            },
        };

        let mut timestamps = TimestampVerifier::new(crypto, validation_time);
        if self.config.verify_timestamp_signers {
            timestamps = timestamps.with_signer_check(sources, &self.config);
        }
        let level_report = LevelPipeline::new(signature, context.as_ref(), crypto, &timestamps).run();

        let integrity = check_integrity(signature, signing_certificate.as_deref(), crypto);
        let chain = check_chain(context.as_ref());
        let qualification = qualify(signing_certificate.as_deref(), context.as_ref());
        let evidence = context
            .as_ref()
            .map(EvidenceSummary::from_context)
            .unwrap_or_default();

        let mut counter_signatures = Vec::new();
        if self.config.validate_counter_signatures {
            for counter in signature.counter_signatures() {
                counter_signatures.push(self.validate_signature(
                    &counter.signature,
                    validation_time,
                    memo,
                )?);
            }
        }

        let report = ValidationReport {
            signature_id: signature.id.clone(),
            validation_time,
            signing_certificate: signing_certificate
                .as_ref()
                .map(|c| CertificateSummary::from_certificate(c, CertificateSourceType::Embedded)),
            integrity,
            chain,
            levels: level_report.levels,
            highest_level: level_report.highest_level,
            level_consistency: level_report.consistency,
            structure,
            qualification,
            evidence,
            counter_signatures,
        };
        log::info!(
            "Signature {}: {} (highest level {:?})",
            label,
            report.indication(),
            report.highest_level
        );
        Ok(report)
    }

    fn signing_context(
        &self,
        signature: &XadesSignature,
        certificate: &Arc<Certificate>,
        validation_time: DateTime<Utc>,
        sources: &ValidationSources<'_>,
        memo: &mut Option<CachedContext>,
    ) -> Result<ValidationContext> {
        let evidence_digest = evidence_digest(signature);
        if let Some(cached) = memo.as_ref() {
            if cached.certificate == *certificate
                && cached.validation_date == validation_time
                && cached.evidence_digest == evidence_digest
            {
                log::debug!("Reusing validation context of '{}'", certificate.subject);
                return Ok(cached.context.clone());
            }
        }

        let mut context = ValidationContext::new(certificate.clone(), validation_time);
        context.validate(sources, &self.config)?;
        *memo = Some(CachedContext {
            certificate: certificate.clone(),
            validation_date: validation_time,
            evidence_digest,
            context: context.clone(),
        });
        Ok(context)
    }
}

/// Digest over every embedded certificate, CRL and OCSP response.
fn evidence_digest(signature: &XadesSignature) -> Vec<u8> {
    let mut data = Vec::new();
    for certificate in signature.embedded_certificates() {
        data.extend_from_slice(&certificate.der);
    }
    if let Some(values) = signature.revocation_values() {
        for crl in &values.crls {
            data.extend_from_slice(&crl.der);
        }
        for response in &values.ocsp_responses {
            data.extend_from_slice(&response.der);
        }
    }
    compute_digest(DigestAlgorithm::Sha256, &data)
}

/// Reference digests and the SignatureValue over SignedInfo.
pub fn check_integrity(
    signature: &XadesSignature,
    signing_certificate: Option<&Certificate>,
    crypto: &dyn CryptoProvider,
) -> CheckResult {
    let mut details = Vec::new();

    for (i, reference) in signature.references.iter().enumerate() {
        let name = match &reference.id {
            Some(id) => format!("Reference '{}'", id),
            None => format!("Reference[{}] ({})", i, reference.uri),
        };
        details.push(match DigestAlgorithm::from_uri(&reference.digest_method) {
            None => CheckResult::undetermined(
                ReasonCode::UnsupportedAlgorithm,
                format!("{}: unsupported digest method {}", name, reference.digest_method),
            ),
            Some(algorithm) if crypto.digest(algorithm, &reference.data) == reference.digest_value => {
                CheckResult::valid(format!("{}: digest matches", name))
            },
            Some(_) => CheckResult::invalid(
                ReasonCode::ReferenceDigestMismatch,
                format!("{}: digest does not match the referenced data", name),
            ),
        });
    }

    let algorithm = SignatureAlgorithm::from_uri(&signature.signed_info.signature_method);
    details.push(match signing_certificate {
        None => CheckResult::undetermined(
            ReasonCode::NoSigningCertificate,
            "SignatureValue not checked: no signing certificate",
        ),
        Some(_) if algorithm.digest_algorithm().is_none() => CheckResult::undetermined(
            ReasonCode::UnsupportedAlgorithm,
            format!("unsupported signature method {}", signature.signed_info.signature_method),
        ),
        Some(certificate) => {
            let verified = crypto.verify_signature(
                certificate,
                &algorithm,
                &signature.signed_info.canonical,
                &signature.signature_value.value,
            );
            if verified {
                CheckResult::valid("SignatureValue verifies over SignedInfo")
            } else {
                CheckResult::invalid(
                    ReasonCode::SignatureValueInvalid,
                    format!("SignatureValue does not verify with '{}'", certificate.subject),
                )
            }
        },
    });

    CheckResult::combine("signature integrity", details)
}

/// Trust and revocation of the discovered chain.
pub fn check_chain(context: Option<&ValidationContext>) -> CheckResult {
    let Some(context) = context else {
        return CheckResult::undetermined(
            ReasonCode::NoValidationContext,
            "signing certificate chain was not discovered",
        );
    };

    let chain = context.chain();
    let mut details = Vec::new();
    for entry in &chain {
        let subject = &entry.certificate.subject;
        let data = context.revocation_data_for_certificate(&entry.certificate);
        details.push(match data {
            Some(RevocationData::NoCheckNeeded(reason)) => {
                CheckResult::valid(format!("'{}': no revocation check needed ({:?})", subject, reason))
            },
            Some(RevocationData::Unresolved { reason, .. }) => {
                let what = match reason {
                    UnresolvedReason::IssuerNotFound => "issuer not found",
                    UnresolvedReason::NoRevocationData => "no revocation data",
                };
                CheckResult::undetermined(ReasonCode::Unresolved, format!("'{}': {}", subject, what))
            },
            Some(data) => {
                // The CRL or OCSP response behind the status must itself be trusted.
                let evidence_unverified = match data {
                    RevocationData::Checked {
                        evidence: Some(evidence),
                        ..
                    } => context
                        .revocation_data_of(*evidence)
                        .map_or(true, RevocationData::is_unresolved),
                    _ => false,
                };
                match data.status().map(|s| s.validity) {
                    _ if evidence_unverified => CheckResult::undetermined(
                        ReasonCode::Unresolved,
                        format!("'{}': revocation evidence could not be verified", subject),
                    ),
                    Some(CertificateValidity::Revoked) => {
                        let at = data
                            .status()
                            .and_then(|s| s.revocation_date)
                            .map(|d| d.to_rfc3339())
                            .unwrap_or_default();
                        CheckResult::invalid(ReasonCode::Revoked, format!("'{}' revoked {}", subject, at))
                    },
                    Some(CertificateValidity::Unknown) => CheckResult::undetermined(
                        ReasonCode::StatusUnknown,
                        format!("'{}': status unknown", subject),
                    ),
                    _ => CheckResult::valid(format!("'{}': not revoked", subject)),
                }
            },
            None => CheckResult::undetermined(
                ReasonCode::Unresolved,
                format!("'{}' was not processed", subject),
            ),
        });
    }

    let anchored = chain.iter().any(|entry| entry.is_trusted_list());
    if !anchored {
        details.push(CheckResult::undetermined(
            ReasonCode::NoTrustAnchor,
            "chain does not reach a trusted-list certificate",
        ));
    }
    CheckResult::combine("certificate chain", details)
}

/// QC statements of the signing certificate and the attesting trusted-list service.
pub fn qualify(signing_certificate: Option<&Certificate>, context: Option<&ValidationContext>) -> Qualification {
    let Some(certificate) = signing_certificate else {
        return Qualification::default();
    };
    let service = context.and_then(|ctx| {
        ctx.parent_from_trusted_list(certificate)
            .and_then(|anchor| anchor.service)
    });

    let qc_compliance = certificate.has_qc_statement(QC_COMPLIANCE);
    let qualified = qc_compliance && service.is_some();
    Qualification {
        qc_compliance,
        qc_sscd: certificate.has_qc_statement(QC_SSCD),
        trusted_service: service.as_ref().map(|s| s.name.clone()),
        service_qualifiers: service.map(|s| s.qualifiers).unwrap_or_default(),
        qualified,
    }
}
