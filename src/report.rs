//! Validation report.
//!
//! The report is a plain serde tree so it can be stored or shipped as JSON.

use crate::context::{RevocationData, ValidationContext};
use crate::error::Result;
use crate::levels::{CheckResult, Indication, LevelConsistency, LevelResults, SignatureLevel};
use crate::sources::{CertificateAndContext, CertificateSourceType};
use crate::status::CertificateValidity;
use crate::structure::StructuralReport;
use crate::tokens::{Certificate, Crl, OcspResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Certificate as shown in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateSummary {
    /// Subject name
    pub subject: String,
    /// Issuer name
    pub issuer: String,
    /// Serial number (hex)
    pub serial: String,
    /// Base64 SHA-256 of the DER encoding
    pub fingerprint: String,
    /// Start of validity
    pub not_before: DateTime<Utc>,
    /// End of validity
    pub not_after: DateTime<Utc>,
    /// Provenance
    pub source: CertificateSourceType,
    /// Trusted-list service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Revocation status found during discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CertificateValidity>,
    /// Whether revocation checking was short-circuited
    pub no_check_needed: bool,
}

impl CertificateSummary {
    /// Summarize a certificate without discovery data.
    pub fn from_certificate(certificate: &Certificate, source: CertificateSourceType) -> Self {
        Self {
            subject: certificate.subject.to_string(),
            issuer: certificate.issuer.to_string(),
            serial: certificate.serial.to_hex(),
            fingerprint: certificate.fingerprint(),
            not_before: certificate.not_before,
            not_after: certificate.not_after,
            source,
            service: None,
            status: None,
            no_check_needed: false,
        }
    }

    /// Summarize a discovered certificate.
    pub fn from_context(entry: &CertificateAndContext, data: Option<&RevocationData>) -> Self {
        let mut summary = Self::from_certificate(&entry.certificate, entry.source_type);
        summary.service = entry.service.as_ref().map(|s| s.name.clone());
        summary.status = data.and_then(|d| d.status()).map(|s| s.validity);
        summary.no_check_needed = data.map_or(false, |d| d.is_no_check_needed());
        summary
    }
}

/// CRL as shown in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrlSummary {
    /// Issuer name
    pub issuer: String,
    /// thisUpdate
    pub this_update: DateTime<Utc>,
    /// nextUpdate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_update: Option<DateTime<Utc>>,
    /// Number of revoked entries
    pub revoked_count: usize,
}

impl From<&Crl> for CrlSummary {
    fn from(crl: &Crl) -> Self {
        Self {
            issuer: crl.issuer.to_string(),
            this_update: crl.this_update,
            next_update: crl.next_update,
            revoked_count: crl.revoked.len(),
        }
    }
}

/// OCSP response as shown in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OcspSummary {
    /// Responder label
    pub responder: String,
    /// producedAt
    pub produced_at: DateTime<Utc>,
    /// Number of single responses
    pub responses: usize,
}

impl From<&OcspResponse> for OcspSummary {
    fn from(response: &OcspResponse) -> Self {
        Self {
            responder: response.responder_label(),
            produced_at: response.produced_at,
            responses: response.responses.len(),
        }
    }
}

/// Evidence bag collected by discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvidenceSummary {
    /// Chain from the signing certificate upwards
    pub chain: Vec<CertificateSummary>,
    /// Certificates needed to trust the signing certificate
    pub certificates: Vec<CertificateSummary>,
    /// CRLs needed
    pub crls: Vec<CrlSummary>,
    /// OCSP responses needed
    pub ocsp_responses: Vec<OcspSummary>,
    /// Discovery passes run
    pub discovery_passes: usize,
}

impl EvidenceSummary {
    /// Summarize a finished context.
    pub fn from_context(context: &ValidationContext) -> Self {
        let summarize = |entry: &CertificateAndContext| {
            CertificateSummary::from_context(
                entry,
                context.revocation_data_for_certificate(&entry.certificate),
            )
        };
        Self {
            chain: context.chain().iter().map(summarize).collect(),
            certificates: context.needed_certificates().map(|e| summarize(&e)).collect(),
            crls: context.needed_crls().map(|crl| CrlSummary::from(crl.as_ref())).collect(),
            ocsp_responses: context
                .needed_ocsp_responses()
                .map(|r| OcspSummary::from(r.as_ref()))
                .collect(),
            discovery_passes: context.passes(),
        }
    }
}

/// QC statement and trusted-list findings for the signing certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Qualification {
    /// QcCompliance statement present
    pub qc_compliance: bool,
    /// QcSSCD statement present
    pub qc_sscd: bool,
    /// Trusted-list service attesting the chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_service: Option<String>,
    /// Qualifiers of that service
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_qualifiers: Vec<String>,
    /// QcCompliance backed by a trusted-list service
    pub qualified: bool,
}

/// Validation outcome for one signature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Id of the ds:Signature
    pub signature_id: Option<String>,
    /// Validation instant
    pub validation_time: DateTime<Utc>,
    /// Signing certificate, when resolved
    pub signing_certificate: Option<CertificateSummary>,
    /// Reference digests and SignatureValue
    pub integrity: CheckResult,
    /// Trust and revocation of the signing certificate chain
    pub chain: CheckResult,
    /// Per-level results
    pub levels: LevelResults,
    /// Highest level reached
    pub highest_level: Option<SignatureLevel>,
    /// Cross-level consistency rules
    pub level_consistency: LevelConsistency,
    /// Structural checks
    pub structure: StructuralReport,
    /// QC findings
    pub qualification: Qualification,
    /// Evidence bag
    pub evidence: EvidenceSummary,
    /// Reports of counter-signatures
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub counter_signatures: Vec<ValidationReport>,
}

impl ValidationReport {
    /// Overall verdict: worst of integrity, chain, XAdES-BES and structure.
    pub fn indication(&self) -> Indication {
        let structure = if self.structure.is_consistent() {
            Indication::Valid
        } else {
            Indication::Invalid
        };
        self.integrity
            .indication
            .worst(self.chain.indication)
            .worst(self.levels.bes.indication)
            .worst(structure)
    }

    /// Whether the overall verdict is VALID.
    pub fn is_valid(&self) -> bool {
        self.indication() == Indication::Valid
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
