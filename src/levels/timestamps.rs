//! Timestamp verification shared by levels T, X and A.

use super::types::{CheckResult, ReasonCode};
use crate::config::ValidationConfig;
use crate::context::{ValidationContext, ValidationSources};
use crate::crypto::{CryptoProvider, DigestAlgorithm};
use crate::xades::XadesTimestamp;
use chrono::{DateTime, Utc};

/// Verifies timestamp imprints and, optionally, timestamp signers.
pub struct TimestampVerifier<'a> {
    crypto: &'a dyn CryptoProvider,
    signer_check: Option<(ValidationSources<'a>, &'a ValidationConfig)>,
    validation_date: DateTime<Utc>,
}

impl<'a> TimestampVerifier<'a> {
    /// Imprint-only verifier.
    pub fn new(crypto: &'a dyn CryptoProvider, validation_date: DateTime<Utc>) -> Self {
        Self {
            crypto,
            signer_check: None,
            validation_date,
        }
    }

    /// Also establish the TSA certificate through its own validation context.
    pub fn with_signer_check(
        mut self,
        sources: ValidationSources<'a>,
        config: &'a ValidationConfig,
    ) -> Self {
        self.signer_check = Some((sources, config));
        self
    }

    /// Verify `timestamp` against the bytes it claims to cover.
    ///
    /// An unknown imprint algorithm is UNDETERMINED; a digest mismatch is INVALID.
    pub fn verify(&self, label: &str, timestamp: &XadesTimestamp, covered: &[u8]) -> CheckResult {
        let name = match &timestamp.id {
            Some(id) => format!("{} '{}'", label, id),
            None => label.to_string(),
        };
        let imprint = &timestamp.token.imprint;

        let Some(algorithm) = DigestAlgorithm::from_oid(&imprint.algorithm_oid) else {
            return CheckResult::undetermined(
                ReasonCode::UnsupportedDigest,
                format!("{}: unsupported imprint algorithm {}", name, imprint.algorithm_oid),
            );
        };

        if self.crypto.digest(algorithm, covered) != imprint.digest {
            log::info!("{} imprint does not match the covered data", name);
            return CheckResult::invalid(
                ReasonCode::ImprintMismatch,
                format!("{}: {} imprint does not match the covered data", name, algorithm.name()),
            );
        }

        if let Some((sources, config)) = &self.signer_check {
            if let Some(failure) = self.check_signer(&name, timestamp, sources, config) {
                return failure;
            }
        }

        CheckResult::valid(format!(
            "{}: imprint verified (genTime {})",
            name,
            timestamp.token.gen_time.to_rfc3339()
        ))
    }

    fn check_signer(
        &self,
        name: &str,
        timestamp: &XadesTimestamp,
        sources: &ValidationSources<'_>,
        config: &ValidationConfig,
    ) -> Option<CheckResult> {
        let mut context = ValidationContext::for_timestamp(timestamp.token.clone(), self.validation_date);
        if let Err(e) = context.validate(sources, config) {
            log::warn!("Discovery for {} failed: {}", name, e);
            return Some(CheckResult::undetermined(
                ReasonCode::TimestampSignerUnverified,
                format!("{}: signer discovery failed: {}", name, e),
            ));
        }

        let target = context.revocation_data_of(context.target());
        if target.map_or(true, |data| data.is_unresolved()) {
            return Some(CheckResult::undetermined(
                ReasonCode::TimestampSignerUnverified,
                format!("{}: TSA certificate could not be established", name),
            ));
        }

        let chain = context.chain();
        for entry in &chain {
            let data = context.revocation_data_for_certificate(&entry.certificate);
            if data.map_or(false, |d| d.is_revoked()) {
                return Some(CheckResult::invalid(
                    ReasonCode::TimestampSignerUnverified,
                    format!("{}: TSA chain certificate '{}' is revoked", name, entry.certificate.subject),
                ));
            }
            if data.map_or(true, |d| d.is_unresolved()) {
                return Some(CheckResult::undetermined(
                    ReasonCode::TimestampSignerUnverified,
                    format!("{}: TSA chain certificate '{}' is unresolved", name, entry.certificate.subject),
                ));
            }
        }

        if !chain.iter().any(|entry| entry.is_trusted_list()) {
            return Some(CheckResult::undetermined(
                ReasonCode::TimestampSignerUnverified,
                format!("{}: TSA chain does not reach a trusted-list certificate", name),
            ));
        }
        None
    }
}
