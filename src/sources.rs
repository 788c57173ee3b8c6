//! Pluggable evidence sources.
//!
//! A validation consumes up to three kinds of sources: certificate sources
//! (trusted lists, embedded certificates, AIA downloads), CRL sources and OCSP
//! sources. Network-backed implementations live outside this crate; they must
//! report fetch failures and timeouts as "no answer" (`None` / empty results).
//! The list-backed sources here serve evidence already at hand, typically the
//! values embedded in a signature.

use crate::tokens::{Certificate, Crl, DistinguishedName, OcspResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Provenance of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CertificateSourceType {
    /// Published in a trusted list
    TrustedList,
    /// Downloaded through Authority Information Access
    Aia,
    /// Embedded in the signature or in a token
    Embedded,
    /// Anything else
    Other,
}

/// Trusted-list service whose validity window constrains a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Start of the service status
    pub start: DateTime<Utc>,
    /// End of the service status (open when `None`)
    pub end: Option<DateTime<Utc>>,
    /// Qualifiers attached to the service (e.g. QCWithSSCD)
    pub qualifiers: Vec<String>,
}

impl ServiceInfo {
    /// Create a service entry with an open-ended window.
    pub fn new(name: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start,
            end: None,
            qualifiers: Vec::new(),
        }
    }

    /// Close the service window.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Add a service qualifier.
    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// Whether `instant` falls inside the service window.
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && self.end.map_or(true, |end| instant <= end)
    }
}

/// A certificate plus where it came from.
#[derive(Debug, Clone)]
pub struct CertificateAndContext {
    /// The certificate
    pub certificate: Arc<Certificate>,
    /// Provenance
    pub source_type: CertificateSourceType,
    /// Trusted-list service, for `TrustedList` provenance
    pub service: Option<ServiceInfo>,
}

impl CertificateAndContext {
    /// Wrap a certificate with a provenance tag.
    pub fn new(certificate: Arc<Certificate>, source_type: CertificateSourceType) -> Self {
        Self {
            certificate,
            source_type,
            service: None,
        }
    }

    /// Wrap a trusted-list certificate.
    pub fn trusted(certificate: Arc<Certificate>, service: ServiceInfo) -> Self {
        Self {
            certificate,
            source_type: CertificateSourceType::TrustedList,
            service: Some(service),
        }
    }

    /// Whether the certificate comes from a trusted list.
    pub fn is_trusted_list(&self) -> bool {
        self.source_type == CertificateSourceType::TrustedList
    }

    /// Whether the trusted-list service window (if any) covers `instant`.
    pub fn service_active_at(&self, instant: DateTime<Utc>) -> bool {
        match (&self.source_type, &self.service) {
            (CertificateSourceType::TrustedList, Some(service)) => service.is_active_at(instant),
            _ => true,
        }
    }
}

/// Lookup of certificates by subject name.
pub trait CertificateSource {
    /// All certificates whose subject equals `name`.
    fn by_subject_name(&self, name: &DistinguishedName) -> Vec<CertificateAndContext>;
}

/// Lookup of the CRL covering a certificate.
pub trait CrlSource {
    /// A CRL issued by `issuer` that may list `certificate`.
    fn get(&self, certificate: &Certificate, issuer: &Certificate) -> Option<Arc<Crl>>;

    /// A CRL already published at `validation_date`.
    ///
    /// Sources that keep history should pick the newest CRL whose `this_update`
    /// does not exceed the instant. The default asks [`CrlSource::get`].
    fn get_at(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
        _validation_date: DateTime<Utc>,
    ) -> Option<Arc<Crl>> {
        self.get(certificate, issuer)
    }
}

/// Lookup of an OCSP response for a certificate.
pub trait OcspSource {
    /// An OCSP response reporting on `certificate`.
    fn get(&self, certificate: &Certificate, issuer: &Certificate) -> Option<Arc<OcspResponse>>;

    /// An OCSP response whose entry for `certificate` was current at `validation_date`.
    ///
    /// The default asks [`OcspSource::get`].
    fn get_at(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
        _validation_date: DateTime<Utc>,
    ) -> Option<Arc<OcspResponse>> {
        self.get(certificate, issuer)
    }
}

/// In-memory certificate source.
#[derive(Debug, Clone)]
pub struct ListCertificateSource {
    source_type: CertificateSourceType,
    entries: Vec<CertificateAndContext>,
}

impl ListCertificateSource {
    /// Create an empty source whose certificates get the given provenance.
    pub fn new(source_type: CertificateSourceType) -> Self {
        Self {
            source_type,
            entries: Vec::new(),
        }
    }

    /// Create a source holding `certificates`.
    pub fn from_certificates(
        source_type: CertificateSourceType,
        certificates: impl IntoIterator<Item = Arc<Certificate>>,
    ) -> Self {
        let mut source = Self::new(source_type);
        for cert in certificates {
            source.add_certificate(cert);
        }
        source
    }

    /// Add a certificate with this source's provenance. Duplicates are ignored.
    pub fn add_certificate(&mut self, certificate: Arc<Certificate>) {
        let entry = CertificateAndContext::new(certificate, self.source_type);
        self.add(entry);
    }

    /// Add a trusted-list certificate bound to a service window.
    pub fn add_trusted(&mut self, certificate: Arc<Certificate>, service: ServiceInfo) {
        self.add(CertificateAndContext::trusted(certificate, service));
    }

    /// Add a pre-built entry. Duplicates are ignored.
    pub fn add(&mut self, entry: CertificateAndContext) {
        if !self
            .entries
            .iter()
            .any(|e| e.certificate == entry.certificate)
        {
            self.entries.push(entry);
        }
    }

    /// Provenance assigned to added certificates.
    pub fn source_type(&self) -> CertificateSourceType {
        self.source_type
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> &[CertificateAndContext] {
        &self.entries
    }

    /// Number of certificates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CertificateSource for ListCertificateSource {
    fn by_subject_name(&self, name: &DistinguishedName) -> Vec<CertificateAndContext> {
        self.entries
            .iter()
            .filter(|e| &e.certificate.subject == name)
            .cloned()
            .collect()
    }
}

/// Chains several certificate sources; results keep source order.
#[derive(Default)]
pub struct CompositeCertificateSource<'a> {
    sources: Vec<&'a dyn CertificateSource>,
}

impl<'a> CompositeCertificateSource<'a> {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source.
    pub fn with(mut self, source: &'a dyn CertificateSource) -> Self {
        self.sources.push(source);
        self
    }
}

impl CertificateSource for CompositeCertificateSource<'_> {
    fn by_subject_name(&self, name: &DistinguishedName) -> Vec<CertificateAndContext> {
        self.sources
            .iter()
            .flat_map(|s| s.by_subject_name(name))
            .collect()
    }
}

/// In-memory CRL source.
#[derive(Debug, Clone, Default)]
pub struct ListCrlSource {
    crls: Vec<Arc<Crl>>,
}

impl ListCrlSource {
    /// Create a source holding `crls`.
    pub fn new(crls: impl IntoIterator<Item = Arc<Crl>>) -> Self {
        Self {
            crls: crls.into_iter().collect(),
        }
    }

    /// Add a CRL.
    pub fn add(&mut self, crl: Arc<Crl>) {
        if !self.crls.contains(&crl) {
            self.crls.push(crl);
        }
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.crls.is_empty()
    }
}

impl CrlSource for ListCrlSource {
    /// Picks the most recent CRL issued under the issuer's subject name.
    fn get(&self, _certificate: &Certificate, issuer: &Certificate) -> Option<Arc<Crl>> {
        self.crls
            .iter()
            .filter(|crl| crl.issuer == issuer.subject)
            .max_by_key(|crl| crl.this_update)
            .cloned()
    }

    /// Picks the most recent CRL of the issuer already published at `validation_date`.
    fn get_at(
        &self,
        _certificate: &Certificate,
        issuer: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> Option<Arc<Crl>> {
        self.crls
            .iter()
            .filter(|crl| crl.issuer == issuer.subject && crl.this_update <= validation_date)
            .max_by_key(|crl| crl.this_update)
            .cloned()
    }
}

/// In-memory OCSP source.
#[derive(Debug, Clone, Default)]
pub struct ListOcspSource {
    responses: Vec<Arc<OcspResponse>>,
}

impl ListOcspSource {
    /// Create a source holding `responses`.
    pub fn new(responses: impl IntoIterator<Item = Arc<OcspResponse>>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
        }
    }

    /// Add a response.
    pub fn add(&mut self, response: Arc<OcspResponse>) {
        if !self.responses.contains(&response) {
            self.responses.push(response);
        }
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl OcspSource for ListOcspSource {
    /// Picks the most recent response of the issuer's responder carrying an entry
    /// for the certificate serial.
    fn get(&self, certificate: &Certificate, issuer: &Certificate) -> Option<Arc<OcspResponse>> {
        self.responses
            .iter()
            .filter(|r| r.is_responder_for(issuer) && r.find_response(&certificate.serial).is_some())
            .max_by_key(|r| r.produced_at)
            .cloned()
    }

    /// Like [`get`](OcspSource::get), skipping entries newer than `validation_date`.
    fn get_at(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> Option<Arc<OcspResponse>> {
        self.responses
            .iter()
            .filter(|r| {
                r.is_responder_for(issuer)
                    && r
                        .find_response(&certificate.serial)
                        .is_some_and(|single| single.this_update <= validation_date)
            })
            .max_by_key(|r| r.produced_at)
            .cloned()
    }
}

/// First answer wins across several CRL sources.
#[derive(Default)]
pub struct CompositeCrlSource<'a> {
    sources: Vec<&'a dyn CrlSource>,
}

impl<'a> CompositeCrlSource<'a> {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source.
    pub fn with(mut self, source: &'a dyn CrlSource) -> Self {
        self.sources.push(source);
        self
    }
}

impl CrlSource for CompositeCrlSource<'_> {
    fn get(&self, certificate: &Certificate, issuer: &Certificate) -> Option<Arc<Crl>> {
        self.sources.iter().find_map(|s| s.get(certificate, issuer))
    }

    fn get_at(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> Option<Arc<Crl>> {
        self.sources
            .iter()
            .find_map(|s| s.get_at(certificate, issuer, validation_date))
    }
}

/// First answer wins across several OCSP sources.
#[derive(Default)]
pub struct CompositeOcspSource<'a> {
    sources: Vec<&'a dyn OcspSource>,
}

impl<'a> CompositeOcspSource<'a> {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source.
    pub fn with(mut self, source: &'a dyn OcspSource) -> Self {
        self.sources.push(source);
        self
    }
}

impl OcspSource for CompositeOcspSource<'_> {
    fn get(&self, certificate: &Certificate, issuer: &Certificate) -> Option<Arc<OcspResponse>> {
        self.sources.iter().find_map(|s| s.get(certificate, issuer))
    }

    fn get_at(
        &self,
        certificate: &Certificate,
        issuer: &Certificate,
        validation_date: DateTime<Utc>,
    ) -> Option<Arc<OcspResponse>> {
        self.sources
            .iter()
            .find_map(|s| s.get_at(certificate, issuer, validation_date))
    }
}
