//! Level verdicts, reason codes and result trees.

use serde::{Serialize, Serializer};
use std::fmt;

/// Tri-state verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Indication {
    /// The check passed
    Valid,
    /// Evidence is missing; the check may pass with more evidence
    Undetermined,
    /// The check failed
    Invalid,
}

impl Indication {
    fn severity(&self) -> u8 {
        match self {
            Indication::Valid => 0,
            Indication::Undetermined => 1,
            Indication::Invalid => 2,
        }
    }

    /// The more severe of two indications.
    pub fn worst(self, other: Indication) -> Indication {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for Indication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indication::Valid => write!(f, "VALID"),
            Indication::Undetermined => write!(f, "UNDETERMINED"),
            Indication::Invalid => write!(f, "INVALID"),
        }
    }
}

/// Machine-readable reason attached to a non-valid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReasonCode {
    // BES
    /// No resolvable signing certificate
    NoSigningCertificate,
    /// The signing certificate digest differs from its reference
    SigningCertificateDigestMismatch,

    // EPES
    /// No signature policy identifier
    NoPolicy,

    // T
    /// No signature timestamp
    NoTimestamp,
    /// Timestamp imprint differs from the covered data digest
    ImprintMismatch,
    /// Timestamp imprint uses an unknown digest algorithm
    UnsupportedDigest,
    /// The timestamp signer could not be established
    TimestampSignerUnverified,

    // C
    /// CompleteCertificateRefs absent or empty
    NoCertificateRef,
    /// A needed certificate has no reference
    MissingCertificateRef,
    /// CompleteRevocationRefs absent or empty
    NoRevocationRef,
    /// A needed CRL or OCSP response has no reference
    MissingRevocationRef,
    /// C-level properties without a signature timestamp
    CWithoutT,
    /// No validation context for the signing certificate
    NoValidationContext,

    // X
    /// Neither SigAndRefsTimeStamp nor RefsOnlyTimeStamp
    NoXTimestamp,

    // XL
    /// CertificateValues absent or empty
    NoCertificateValues,
    /// A needed certificate has no value
    MissingCertificateValue,
    /// RevocationValues absent or empty
    NoRevocationValues,
    /// A needed CRL or OCSP response has no value
    MissingRevocationValue,
    /// XL-level properties without an X timestamp
    XlWithoutX,
    /// Some certificate reference has no matching value
    CertificateValuesMismatch,
    /// Some revocation reference has no matching value
    RevocationValuesMismatch,

    // A
    /// No archive timestamp
    NoArchiveTimestamp,

    // Chain
    /// A chain certificate is revoked
    Revoked,
    /// Issuer or revocation evidence could not be found
    Unresolved,
    /// The chain does not reach a trust anchor
    NoTrustAnchor,
    /// A status source answered "unknown"
    StatusUnknown,

    // Integrity
    /// A Reference digest does not match its data
    ReferenceDigestMismatch,
    /// SignatureValue does not verify over SignedInfo
    SignatureValueInvalid,
    /// Unknown digest or signature algorithm
    UnsupportedAlgorithm,
}

impl ReasonCode {
    /// Stable code string.
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::NoSigningCertificate => "BES-001",
            ReasonCode::SigningCertificateDigestMismatch => "BES-002",
            ReasonCode::NoPolicy => "EPES-001",
            ReasonCode::NoTimestamp => "T-001",
            ReasonCode::ImprintMismatch => "T-002",
            ReasonCode::UnsupportedDigest => "T-003",
            ReasonCode::TimestampSignerUnverified => "T-004",
            ReasonCode::NoCertificateRef => "C-001",
            ReasonCode::MissingCertificateRef => "C-002",
            ReasonCode::NoRevocationRef => "C-003",
            ReasonCode::MissingRevocationRef => "C-004",
            ReasonCode::CWithoutT => "C-005",
            ReasonCode::NoValidationContext => "C-006",
            ReasonCode::NoXTimestamp => "X-001",
            ReasonCode::NoCertificateValues => "XL-001",
            ReasonCode::MissingCertificateValue => "XL-002",
            ReasonCode::NoRevocationValues => "XL-003",
            ReasonCode::MissingRevocationValue => "XL-004",
            ReasonCode::XlWithoutX => "XL-005",
            ReasonCode::CertificateValuesMismatch => "XL-006",
            ReasonCode::RevocationValuesMismatch => "XL-007",
            ReasonCode::NoArchiveTimestamp => "A-001",
            ReasonCode::Revoked => "CHAIN-001",
            ReasonCode::Unresolved => "CHAIN-002",
            ReasonCode::NoTrustAnchor => "CHAIN-003",
            ReasonCode::StatusUnknown => "CHAIN-004",
            ReasonCode::ReferenceDigestMismatch => "INTEGRITY-001",
            ReasonCode::SignatureValueInvalid => "INTEGRITY-002",
            ReasonCode::UnsupportedAlgorithm => "INTEGRITY-003",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for ReasonCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

/// A verdict with its reason and the sub-results it was composed from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResult {
    /// Verdict
    pub indication: Indication,
    /// Reason, for non-valid results
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
    /// Human-readable message
    pub message: String,
    /// Sub-results
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<CheckResult>,
}

impl CheckResult {
    /// A passing result.
    pub fn valid(message: impl Into<String>) -> Self {
        Self {
            indication: Indication::Valid,
            reason: None,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// A failing result.
    pub fn invalid(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            indication: Indication::Invalid,
            reason: Some(reason),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// A result that lacks evidence.
    pub fn undetermined(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            indication: Indication::Undetermined,
            reason: Some(reason),
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Compose sub-results: the worst indication wins and its first reason is
    /// carried up. No sub-results compose to VALID.
    pub fn combine(message: impl Into<String>, details: Vec<CheckResult>) -> Self {
        let mut indication = Indication::Valid;
        let mut reason = None;
        for detail in &details {
            let worst = indication.worst(detail.indication);
            if worst != indication {
                indication = worst;
                reason = detail.reason;
            }
        }
        Self {
            indication,
            reason,
            message: message.into(),
            details,
        }
    }

    /// Attach sub-results without changing the verdict.
    pub fn with_details(mut self, details: Vec<CheckResult>) -> Self {
        self.details = details;
        self
    }

    /// Whether the verdict is VALID.
    pub fn is_valid(&self) -> bool {
        self.indication == Indication::Valid
    }

    /// Whether the verdict is INVALID.
    pub fn is_invalid(&self) -> bool {
        self.indication == Indication::Invalid
    }

    /// Whether the verdict is UNDETERMINED.
    pub fn is_undetermined(&self) -> bool {
        self.indication == Indication::Undetermined
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.indication)?;
        if let Some(reason) = self.reason {
            write!(f, " [{}]", reason)?;
        }
        write!(f, " {}", self.message)
    }
}

/// XAdES maturity levels, in escalation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum SignatureLevel {
    /// Basic electronic signature
    Bes,
    /// With explicit policy
    Epes,
    /// With signature timestamp
    T,
    /// With complete validation references
    C,
    /// With timestamps over the references
    X,
    /// With validation values
    Xl,
    /// With archive timestamps
    A,
}

impl fmt::Display for SignatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureLevel::Bes => "XAdES-BES",
            SignatureLevel::Epes => "XAdES-EPES",
            SignatureLevel::T => "XAdES-T",
            SignatureLevel::C => "XAdES-C",
            SignatureLevel::X => "XAdES-X",
            SignatureLevel::Xl => "XAdES-XL",
            SignatureLevel::A => "XAdES-A",
        };
        write!(f, "{}", name)
    }
}

/// One result per level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelResults {
    /// XAdES-BES
    pub bes: CheckResult,
    /// XAdES-EPES
    pub epes: CheckResult,
    /// XAdES-T
    pub t: CheckResult,
    /// XAdES-C
    pub c: CheckResult,
    /// XAdES-X
    pub x: CheckResult,
    /// XAdES-XL
    pub xl: CheckResult,
    /// XAdES-A
    pub a: CheckResult,
}

impl LevelResults {
    /// Result of `level`.
    pub fn get(&self, level: SignatureLevel) -> &CheckResult {
        match level {
            SignatureLevel::Bes => &self.bes,
            SignatureLevel::Epes => &self.epes,
            SignatureLevel::T => &self.t,
            SignatureLevel::C => &self.c,
            SignatureLevel::X => &self.x,
            SignatureLevel::Xl => &self.xl,
            SignatureLevel::A => &self.a,
        }
    }

    /// Highest level reached.
    ///
    /// BES must be valid. EPES counts only on its own: T and above build on BES
    /// and need every level from T up to themselves to be valid.
    pub fn highest_level(&self) -> Option<SignatureLevel> {
        if !self.bes.is_valid() {
            return None;
        }
        let mut highest = if self.epes.is_valid() {
            SignatureLevel::Epes
        } else {
            SignatureLevel::Bes
        };
        for level in [
            SignatureLevel::T,
            SignatureLevel::C,
            SignatureLevel::X,
            SignatureLevel::Xl,
            SignatureLevel::A,
        ] {
            if !self.get(level).is_valid() {
                break;
            }
            highest = level;
        }
        Some(highest)
    }
}

/// Cross-level consistency results; `None` when the rule does not apply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LevelConsistency {
    /// XAdES-C present implies XAdES-T present
    pub c_implies_t: Option<CheckResult>,
    /// XAdES-XL present implies XAdES-X present
    pub xl_implies_x: Option<CheckResult>,
}
