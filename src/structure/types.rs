//! Structural check identifiers, mask and report.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Selects which structural checks run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StructuralChecks: u32 {
        /// KeyInfo certificate digest equals the first SigningCertificate digest
        const SIGNING_CERTIFICATE_DIGEST = 1 << 0;
        /// KeyInfo certificate issuer and serial equal the first SigningCertificate
        const SIGNING_CERTIFICATE_ISSUER_SERIAL = 1 << 1;
        /// AllDataObjectsTimeStamp covers exactly the data References
        const ALL_DATA_OBJECTS_TIMESTAMP = 1 << 2;
        /// IndividualDataObjectsTimeStamp includes resolve to References
        const INDIVIDUAL_DATA_OBJECTS_TIMESTAMP = 1 << 3;
        /// CommitmentTypeIndication ObjectReferences resolve
        const COMMITMENT_OBJECT_REFERENCES = 1 << 4;
        /// DataObjectFormat ObjectReferences resolve
        const DATA_OBJECT_FORMAT_REFERENCES = 1 << 5;
        /// SignerRole carries at least one role
        const SIGNER_ROLE = 1 << 6;
        /// Explicit policy carries identifier and hash
        const SIGNATURE_POLICY = 1 << 7;
        /// SignatureTimeStamp includes only the SignatureValue
        const SIGNATURE_TIMESTAMP_INCLUDES = 1 << 8;
        /// CompleteCertificateRefs present when needed, without the signing certificate
        const COMPLETE_CERTIFICATE_REFS = 1 << 9;
        /// CompleteRevocationRefs present together with CompleteCertificateRefs
        const COMPLETE_REVOCATION_REFS = 1 << 10;
        /// SigAndRefsTimeStamp includes the exact X type 1 set
        const SIG_AND_REFS_TIMESTAMP_INCLUDES = 1 << 11;
        /// RefsOnlyTimeStamp includes the exact X type 2 set
        const REFS_ONLY_TIMESTAMP_INCLUDES = 1 << 12;
        /// ArchiveTimeStamp includes everything preceding it
        const ARCHIVE_TIMESTAMP_INCLUDES = 1 << 13;
        /// Every CertRef has a certificate value
        const CERTIFICATE_VALUES_MATCH_REFS = 1 << 14;
        /// Every CRLRef and OCSPRef has a revocation value
        const REVOCATION_VALUES_MATCH_REFS = 1 << 15;
        /// Counter-signatures reference their parent SignatureValue
        const COUNTER_SIGNATURE_REFERENCES = 1 << 16;
        /// No two elements share an Id
        const UNIQUE_IDENTIFIERS = 1 << 17;
    }
}

impl Default for StructuralChecks {
    fn default() -> Self {
        StructuralChecks::all()
    }
}

/// One structural check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructuralCheck {
    /// See [`StructuralChecks::SIGNING_CERTIFICATE_DIGEST`]
    SigningCertificateDigest,
    /// See [`StructuralChecks::SIGNING_CERTIFICATE_ISSUER_SERIAL`]
    SigningCertificateIssuerSerial,
    /// See [`StructuralChecks::ALL_DATA_OBJECTS_TIMESTAMP`]
    AllDataObjectsTimestamp,
    /// See [`StructuralChecks::INDIVIDUAL_DATA_OBJECTS_TIMESTAMP`]
    IndividualDataObjectsTimestamp,
    /// See [`StructuralChecks::COMMITMENT_OBJECT_REFERENCES`]
    CommitmentObjectReferences,
    /// See [`StructuralChecks::DATA_OBJECT_FORMAT_REFERENCES`]
    DataObjectFormatReferences,
    /// See [`StructuralChecks::SIGNER_ROLE`]
    SignerRole,
    /// See [`StructuralChecks::SIGNATURE_POLICY`]
    SignaturePolicy,
    /// See [`StructuralChecks::SIGNATURE_TIMESTAMP_INCLUDES`]
    SignatureTimestampIncludes,
    /// See [`StructuralChecks::COMPLETE_CERTIFICATE_REFS`]
    CompleteCertificateRefs,
    /// See [`StructuralChecks::COMPLETE_REVOCATION_REFS`]
    CompleteRevocationRefs,
    /// See [`StructuralChecks::SIG_AND_REFS_TIMESTAMP_INCLUDES`]
    SigAndRefsTimestampIncludes,
    /// See [`StructuralChecks::REFS_ONLY_TIMESTAMP_INCLUDES`]
    RefsOnlyTimestampIncludes,
    /// See [`StructuralChecks::ARCHIVE_TIMESTAMP_INCLUDES`]
    ArchiveTimestampIncludes,
    /// See [`StructuralChecks::CERTIFICATE_VALUES_MATCH_REFS`]
    CertificateValuesMatchRefs,
    /// See [`StructuralChecks::REVOCATION_VALUES_MATCH_REFS`]
    RevocationValuesMatchRefs,
    /// See [`StructuralChecks::COUNTER_SIGNATURE_REFERENCES`]
    CounterSignatureReferences,
    /// See [`StructuralChecks::UNIQUE_IDENTIFIERS`]
    UniqueIdentifiers,
}

impl StructuralCheck {
    /// Every check, in execution order.
    pub const ALL: [StructuralCheck; 18] = [
        StructuralCheck::SigningCertificateDigest,
        StructuralCheck::SigningCertificateIssuerSerial,
        StructuralCheck::AllDataObjectsTimestamp,
        StructuralCheck::IndividualDataObjectsTimestamp,
        StructuralCheck::CommitmentObjectReferences,
        StructuralCheck::DataObjectFormatReferences,
        StructuralCheck::SignerRole,
        StructuralCheck::SignaturePolicy,
        StructuralCheck::SignatureTimestampIncludes,
        StructuralCheck::CompleteCertificateRefs,
        StructuralCheck::CompleteRevocationRefs,
        StructuralCheck::SigAndRefsTimestampIncludes,
        StructuralCheck::RefsOnlyTimestampIncludes,
        StructuralCheck::ArchiveTimestampIncludes,
        StructuralCheck::CertificateValuesMatchRefs,
        StructuralCheck::RevocationValuesMatchRefs,
        StructuralCheck::CounterSignatureReferences,
        StructuralCheck::UniqueIdentifiers,
    ];

    /// Mask bit of this check.
    pub fn flag(&self) -> StructuralChecks {
        match self {
            StructuralCheck::SigningCertificateDigest => StructuralChecks::SIGNING_CERTIFICATE_DIGEST,
            StructuralCheck::SigningCertificateIssuerSerial => {
                StructuralChecks::SIGNING_CERTIFICATE_ISSUER_SERIAL
            },
            StructuralCheck::AllDataObjectsTimestamp => StructuralChecks::ALL_DATA_OBJECTS_TIMESTAMP,
            StructuralCheck::IndividualDataObjectsTimestamp => {
                StructuralChecks::INDIVIDUAL_DATA_OBJECTS_TIMESTAMP
            },
            StructuralCheck::CommitmentObjectReferences => {
                StructuralChecks::COMMITMENT_OBJECT_REFERENCES
            },
            StructuralCheck::DataObjectFormatReferences => {
                StructuralChecks::DATA_OBJECT_FORMAT_REFERENCES
            },
            StructuralCheck::SignerRole => StructuralChecks::SIGNER_ROLE,
            StructuralCheck::SignaturePolicy => StructuralChecks::SIGNATURE_POLICY,
            StructuralCheck::SignatureTimestampIncludes => {
                StructuralChecks::SIGNATURE_TIMESTAMP_INCLUDES
            },
            StructuralCheck::CompleteCertificateRefs => StructuralChecks::COMPLETE_CERTIFICATE_REFS,
            StructuralCheck::CompleteRevocationRefs => StructuralChecks::COMPLETE_REVOCATION_REFS,
            StructuralCheck::SigAndRefsTimestampIncludes => {
                StructuralChecks::SIG_AND_REFS_TIMESTAMP_INCLUDES
            },
            StructuralCheck::RefsOnlyTimestampIncludes => {
                StructuralChecks::REFS_ONLY_TIMESTAMP_INCLUDES
            },
            StructuralCheck::ArchiveTimestampIncludes => StructuralChecks::ARCHIVE_TIMESTAMP_INCLUDES,
            StructuralCheck::CertificateValuesMatchRefs => {
                StructuralChecks::CERTIFICATE_VALUES_MATCH_REFS
            },
            StructuralCheck::RevocationValuesMatchRefs => {
                StructuralChecks::REVOCATION_VALUES_MATCH_REFS
            },
            StructuralCheck::CounterSignatureReferences => {
                StructuralChecks::COUNTER_SIGNATURE_REFERENCES
            },
            StructuralCheck::UniqueIdentifiers => StructuralChecks::UNIQUE_IDENTIFIERS,
        }
    }

    /// Stable code, `STRUCT-001` to `STRUCT-018`.
    pub fn code(&self) -> String {
        let position = StructuralCheck::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or_default();
        format!("STRUCT-{:03}", position + 1)
    }
}

impl fmt::Display for StructuralCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failed structural check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralFailure {
    /// The check that failed
    pub check: StructuralCheck,
    /// Human-readable message
    pub message: String,
    /// Offending element, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl StructuralFailure {
    /// Create a failure.
    pub fn new(check: StructuralCheck, message: impl Into<String>) -> Self {
        Self {
            check,
            message: message.into(),
            location: None,
        }
    }

    /// Set the offending element.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for StructuralFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.check, self.message)?;
        if let Some(ref loc) = self.location {
            write!(f, " (at {})", loc)?;
        }
        Ok(())
    }
}

/// Result of a structural pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuralReport {
    /// Checks that ran, in order
    pub checks_run: Vec<StructuralCheck>,
    /// Failures, in order
    pub failures: Vec<StructuralFailure>,
    /// Whether the pass stopped at the first failure
    pub stopped_early: bool,
}

impl StructuralReport {
    /// Record a failure.
    pub fn add_failure(&mut self, failure: StructuralFailure) {
        log::debug!("Structural check failed: {}", failure);
        self.failures.push(failure);
    }

    /// Whether any check failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Whether every check that ran passed.
    pub fn is_consistent(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures of one check.
    pub fn failures_of(&self, check: StructuralCheck) -> Vec<&StructuralFailure> {
        self.failures.iter().filter(|f| f.check == check).collect()
    }

    /// Whether `check` ran and produced no failure.
    pub fn passed(&self, check: StructuralCheck) -> bool {
        self.checks_run.contains(&check) && self.failures.iter().all(|f| f.check != check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_cover_all_checks() {
        let mut mask = StructuralChecks::empty();
        for check in StructuralCheck::ALL {
            assert!(!mask.contains(check.flag()));
            mask |= check.flag();
        }
        assert_eq!(mask, StructuralChecks::all());
    }

    #[test]
    fn test_codes() {
        assert_eq!(StructuralCheck::SigningCertificateDigest.code(), "STRUCT-001");
        assert_eq!(StructuralCheck::UniqueIdentifiers.code(), "STRUCT-018");
    }

    #[test]
    fn test_failure_display() {
        let failure = StructuralFailure::new(StructuralCheck::SignerRole, "SignerRole is empty")
            .with_location("SignedProperties");
        assert_eq!(failure.to_string(), "[STRUCT-007] SignerRole is empty (at SignedProperties)");
    }

    #[test]
    fn test_mask_json_roundtrip() {
        let mask = StructuralChecks::SIGNER_ROLE | StructuralChecks::UNIQUE_IDENTIFIERS;
        let json = serde_json::to_string(&mask).unwrap();
        let back: StructuralChecks = serde_json::from_str(&json).unwrap();
        assert_eq!(back, mask);
    }
}
