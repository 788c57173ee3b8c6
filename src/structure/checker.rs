//! Mask-driven structural checker.

use super::checks::{self, CheckInput};
use super::types::{StructuralCheck, StructuralChecks, StructuralReport};
use crate::config::ValidationConfig;
use crate::crypto::CryptoProvider;
use crate::xades::XadesSignature;

/// Runs the structural checks selected by a mask.
///
/// By default every selected check runs and all failures are reported. With
/// `stop_on_first_failure` the pass ends after the first check that fails.
#[derive(Debug, Clone)]
pub struct StructuralChecker {
    checks: StructuralChecks,
    stop_on_first_failure: bool,
}

impl Default for StructuralChecker {
    fn default() -> Self {
        Self::new(StructuralChecks::all())
    }
}

impl StructuralChecker {
    /// Create a checker running the checks in `checks`.
    pub fn new(checks: StructuralChecks) -> Self {
        Self {
            checks,
            stop_on_first_failure: false,
        }
    }

    /// Create a checker from the validation configuration.
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.structural_checks).stop_on_first_failure(config.stop_on_first_failure)
    }

    /// Configure whether to stop on the first failing check.
    pub fn stop_on_first_failure(mut self, stop: bool) -> Self {
        self.stop_on_first_failure = stop;
        self
    }

    /// The selected checks.
    pub fn checks(&self) -> StructuralChecks {
        self.checks
    }

    /// Run the selected checks over `signature`.
    pub fn check(&self, signature: &XadesSignature, crypto: &dyn CryptoProvider) -> StructuralReport {
        let input = CheckInput { signature, crypto };
        let mut report = StructuralReport::default();

        macro_rules! run_check {
            ($check:expr, $function:expr) => {
                if self.checks.contains($check.flag()) {
                    report.checks_run.push($check);
                    $function(&input, &mut report);
                    if self.should_stop(&report) {
                        report.stopped_early = true;
                        return report;
                    }
                }
            };
        }

        run_check!(
            StructuralCheck::SigningCertificateDigest,
            checks::check_signing_certificate_digest
        );
        run_check!(
            StructuralCheck::SigningCertificateIssuerSerial,
            checks::check_signing_certificate_issuer_serial
        );
        run_check!(
            StructuralCheck::AllDataObjectsTimestamp,
            checks::check_all_data_objects_timestamp
        );
        run_check!(
            StructuralCheck::IndividualDataObjectsTimestamp,
            checks::check_individual_data_objects_timestamp
        );
        run_check!(
            StructuralCheck::CommitmentObjectReferences,
            checks::check_commitment_object_references
        );
        run_check!(
            StructuralCheck::DataObjectFormatReferences,
            checks::check_data_object_format_references
        );
        run_check!(StructuralCheck::SignerRole, checks::check_signer_role);
        run_check!(StructuralCheck::SignaturePolicy, checks::check_signature_policy);
        run_check!(
            StructuralCheck::SignatureTimestampIncludes,
            checks::check_signature_timestamp_includes
        );
        run_check!(
            StructuralCheck::CompleteCertificateRefs,
            checks::check_complete_certificate_refs
        );
        run_check!(
            StructuralCheck::CompleteRevocationRefs,
            checks::check_complete_revocation_refs
        );
        run_check!(
            StructuralCheck::SigAndRefsTimestampIncludes,
            checks::check_sig_and_refs_timestamp_includes
        );
        run_check!(
            StructuralCheck::RefsOnlyTimestampIncludes,
            checks::check_refs_only_timestamp_includes
        );
        run_check!(
            StructuralCheck::ArchiveTimestampIncludes,
            checks::check_archive_timestamp_includes
        );
        run_check!(
            StructuralCheck::CertificateValuesMatchRefs,
            checks::check_certificate_values_match_refs
        );
        run_check!(
            StructuralCheck::RevocationValuesMatchRefs,
            checks::check_revocation_values_match_refs
        );
        run_check!(
            StructuralCheck::CounterSignatureReferences,
            checks::check_counter_signature_references
        );
        run_check!(StructuralCheck::UniqueIdentifiers, checks::check_unique_identifiers);

        log::debug!(
            "Structural pass: {} checks, {} failures",
            report.checks_run.len(),
            report.failures.len()
        );
        report
    }

    fn should_stop(&self, report: &StructuralReport) -> bool {
        self.stop_on_first_failure && report.has_failures()
    }
}
