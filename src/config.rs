//! Configuration for signature validation.

use crate::error::{Error, Result};
use crate::sources::{CertificateAndContext, CertificateSourceType};
use crate::structure::StructuralChecks;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How to choose among several issuer candidates that all pass the filters
/// (subject match, validity, service window, signature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IssuerSelection {
    /// First candidate in source order: trusted list, token-embedded, external.
    #[default]
    FirstMatch,
    /// Candidate with the most recent `notBefore`; ties keep source order.
    LatestNotBefore,
    /// First trusted-list candidate, otherwise the first candidate.
    PreferTrustedList,
}

impl IssuerSelection {
    /// Pick one candidate.
    pub fn select(
        &self,
        candidates: Vec<CertificateAndContext>,
    ) -> Option<CertificateAndContext> {
        match self {
            IssuerSelection::FirstMatch => candidates.into_iter().next(),
            IssuerSelection::LatestNotBefore => {
                let mut best: Option<CertificateAndContext> = None;
                for candidate in candidates {
                    let newer = best
                        .as_ref()
                        .map_or(true, |b| candidate.certificate.not_before > b.certificate.not_before);
                    if newer {
                        best = Some(candidate);
                    }
                }
                best
            },
            IssuerSelection::PreferTrustedList => {
                let trusted = candidates
                    .iter()
                    .position(|c| c.source_type == CertificateSourceType::TrustedList);
                match trusted {
                    Some(index) => candidates.into_iter().nth(index),
                    None => candidates.into_iter().next(),
                }
            },
        }
    }
}

/// Validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Issuer tie-break policy.
    pub issuer_selection: IssuerSelection,

    /// Structural checks to run.
    pub structural_checks: StructuralChecks,

    /// Abort the structural pass on the first failing check.
    pub stop_on_first_failure: bool,

    /// Reject trusted-list issuers whose service window does not cover the
    /// validation date.
    pub check_service_window: bool,

    /// Safety bound on worklist discovery passes.
    pub max_passes: usize,

    /// Establish trust in timestamp signers, not only the message imprint.
    pub verify_timestamp_signers: bool,

    /// Validate counter-signatures recursively.
    pub validate_counter_signatures: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            issuer_selection: IssuerSelection::FirstMatch,
            structural_checks: StructuralChecks::all(),
            stop_on_first_failure: false,
            check_service_window: true,
            max_passes: 64,
            verify_timestamp_signers: true,
            validate_counter_signatures: true,
        }
    }

    /// Load configuration from a JSON string. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validated()
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Set the issuer selection policy.
    pub fn with_issuer_selection(mut self, selection: IssuerSelection) -> Self {
        self.issuer_selection = selection;
        self
    }

    /// Set the structural check mask.
    pub fn with_structural_checks(mut self, checks: StructuralChecks) -> Self {
        self.structural_checks = checks;
        self
    }

    /// Stop the structural pass on the first failure.
    pub fn with_stop_on_first_failure(mut self, stop: bool) -> Self {
        self.stop_on_first_failure = stop;
        self
    }

    /// Enable or disable the trusted-list service window filter.
    pub fn with_service_window_check(mut self, enable: bool) -> Self {
        self.check_service_window = enable;
        self
    }

    /// Enable or disable timestamp signer validation.
    pub fn with_timestamp_signer_check(mut self, enable: bool) -> Self {
        self.verify_timestamp_signers = enable;
        self
    }

    /// Enable or disable counter-signature validation.
    pub fn with_counter_signatures(mut self, enable: bool) -> Self {
        self.validate_counter_signatures = enable;
        self
    }

    fn validated(self) -> Result<Self> {
        if self.max_passes == 0 {
            return Err(Error::Config("max_passes must be at least 1".to_string()));
        }
        Ok(self)
    }
}
