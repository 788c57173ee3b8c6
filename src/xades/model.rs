//! Read-only XAdES property graph.
//!
//! These types are what the XML binding layer hands to validation: every element
//! the checks look at, with its `Id` attribute and its canonical bytes already
//! computed. Nothing here parses XML.

use super::refs::{CertRef, CrlRef, OcspRef};
use crate::crypto::CryptoProvider;
use crate::tokens::{Certificate, Crl, OcspResponse, TimestampToken};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// `Type` of the Reference that covers SignedProperties.
pub const SIGNED_PROPERTIES_TYPE: &str = "http://uri.etsi.org/01903#SignedProperties";

/// `Type` of the Reference a counter-signature makes to its parent SignatureValue.
pub const COUNTERSIGNED_SIGNATURE_TYPE: &str = "http://uri.etsi.org/01903#CountersignedSignature";

/// Strip the leading `#` of a same-document URI.
pub fn fragment(uri: &str) -> &str {
    uri.strip_prefix('#').unwrap_or(uri)
}

/// ds:Reference with its dereferenced, transformed bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reference {
    /// Id attribute
    pub id: Option<String>,
    /// URI attribute
    pub uri: String,
    /// Type attribute
    pub reference_type: Option<String>,
    /// DigestMethod algorithm URI
    pub digest_method: String,
    /// DigestValue
    pub digest_value: Vec<u8>,
    /// Bytes the digest is computed over
    pub data: Vec<u8>,
}

impl Reference {
    /// The referenced element id, for same-document references.
    pub fn target_id(&self) -> Option<&str> {
        self.uri.strip_prefix('#')
    }

    /// Whether this Reference covers the SignedProperties.
    pub fn is_signed_properties(&self) -> bool {
        self.reference_type.as_deref() == Some(SIGNED_PROPERTIES_TYPE)
    }
}

/// ds:SignedInfo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedInfo {
    /// Id attribute
    pub id: Option<String>,
    /// SignatureMethod algorithm URI
    pub signature_method: String,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

/// ds:SignatureValue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureValue {
    /// Id attribute
    pub id: Option<String>,
    /// Decoded signature bytes
    pub value: Vec<u8>,
    /// Canonical bytes of the element
    pub canonical: Vec<u8>,
}

/// ds:KeyInfo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyInfo {
    /// Id attribute
    pub id: Option<String>,
    /// X509Certificate entries
    pub certificates: Vec<Arc<Certificate>>,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

/// SignaturePolicyIdentifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignaturePolicy {
    /// SignaturePolicyImplied
    Implied,
    /// SignaturePolicyId
    Explicit {
        /// SigPolicyId/Identifier
        identifier: String,
        /// SigPolicyHash algorithm URI
        digest_method: String,
        /// SigPolicyHash value
        digest_value: Vec<u8>,
        /// SigPolicyId/Description
        description: Option<String>,
    },
}

/// SignerRole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerRole {
    /// ClaimedRoles
    pub claimed_roles: Vec<String>,
    /// CertifiedRoles (encoded attribute certificates)
    pub certified_roles: Vec<Vec<u8>>,
}

/// CommitmentTypeIndication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitmentTypeIndication {
    /// CommitmentTypeId/Identifier
    pub commitment_type: String,
    /// ObjectReference URIs
    pub object_references: Vec<String>,
    /// AllSignedDataObjects
    pub all_signed_data_objects: bool,
}

/// DataObjectFormat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataObjectFormat {
    /// ObjectReference URI
    pub object_reference: String,
    /// MimeType
    pub mime_type: Option<String>,
    /// Description
    pub description: Option<String>,
}

/// Any XAdES time-stamp container.
#[derive(Debug, Clone, PartialEq)]
pub struct XadesTimestamp {
    /// Id attribute
    pub id: Option<String>,
    /// Include / HashDataInfo URIs
    pub includes: Vec<String>,
    /// CanonicalizationMethod algorithm URI
    pub canonicalization: Option<String>,
    /// The decoded RFC 3161 token
    pub token: Arc<TimestampToken>,
}

impl XadesTimestamp {
    /// Create a timestamp container without includes.
    pub fn new(token: Arc<TimestampToken>) -> Self {
        Self {
            id: None,
            includes: Vec::new(),
            canonicalization: None,
            token,
        }
    }

    /// Set the Id attribute.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add an included element id.
    pub fn with_include(mut self, id: &str) -> Self {
        self.includes.push(format!("#{}", fragment(id)));
        self
    }

    /// Included element ids, without the `#`.
    pub fn included_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.includes.iter().map(|uri| fragment(uri))
    }
}

/// SignedProperties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignedProperties {
    /// Id attribute
    pub id: Option<String>,
    /// SigningTime
    pub signing_time: Option<DateTime<Utc>>,
    /// SigningCertificate
    pub signing_certificate: Vec<CertRef>,
    /// SignaturePolicyIdentifier
    pub policy: Option<SignaturePolicy>,
    /// SignerRole
    pub signer_role: Option<SignerRole>,
    /// CommitmentTypeIndication
    pub commitment_type_indications: Vec<CommitmentTypeIndication>,
    /// DataObjectFormat
    pub data_object_formats: Vec<DataObjectFormat>,
    /// AllDataObjectsTimeStamp
    pub all_data_objects_timestamps: Vec<XadesTimestamp>,
    /// IndividualDataObjectsTimeStamp
    pub individual_data_objects_timestamps: Vec<XadesTimestamp>,
}

/// CompleteCertificateRefs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteCertificateRefs {
    /// Id attribute
    pub id: Option<String>,
    /// CertRefs
    pub refs: Vec<CertRef>,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

/// CompleteRevocationRefs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompleteRevocationRefs {
    /// Id attribute
    pub id: Option<String>,
    /// CRLRefs
    pub crl_refs: Vec<CrlRef>,
    /// OCSPRefs
    pub ocsp_refs: Vec<OcspRef>,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

impl CompleteRevocationRefs {
    /// Whether no revocation reference is present.
    pub fn is_empty(&self) -> bool {
        self.crl_refs.is_empty() && self.ocsp_refs.is_empty()
    }
}

/// CertificateValues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CertificateValues {
    /// Id attribute
    pub id: Option<String>,
    /// EncapsulatedX509Certificate entries
    pub certificates: Vec<Arc<Certificate>>,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

/// RevocationValues.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RevocationValues {
    /// Id attribute
    pub id: Option<String>,
    /// EncapsulatedCRLValue entries
    pub crls: Vec<Arc<Crl>>,
    /// EncapsulatedOCSPValue entries
    pub ocsp_responses: Vec<Arc<OcspResponse>>,
    /// Canonical bytes
    pub canonical: Vec<u8>,
}

impl RevocationValues {
    /// Whether no revocation value is present.
    pub fn is_empty(&self) -> bool {
        self.crls.is_empty() && self.ocsp_responses.is_empty()
    }
}

/// CounterSignature.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSignature {
    /// The counter-signing ds:Signature
    pub signature: Box<XadesSignature>,
    /// Canonical bytes of the CounterSignature element
    pub canonical: Vec<u8>,
}

/// One child of UnsignedSignatureProperties, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum UnsignedProperty {
    /// SignatureTimeStamp
    SignatureTimestamp(XadesTimestamp),
    /// CompleteCertificateRefs
    CompleteCertificateRefs(CompleteCertificateRefs),
    /// CompleteRevocationRefs
    CompleteRevocationRefs(CompleteRevocationRefs),
    /// SigAndRefsTimeStamp (X type 1)
    SigAndRefsTimestamp(XadesTimestamp),
    /// RefsOnlyTimeStamp (X type 2)
    RefsOnlyTimestamp(XadesTimestamp),
    /// CertificateValues
    CertificateValues(CertificateValues),
    /// RevocationValues
    RevocationValues(RevocationValues),
    /// ArchiveTimeStamp
    ArchiveTimestamp(XadesTimestamp),
    /// CounterSignature
    CounterSignature(CounterSignature),
}

impl UnsignedProperty {
    /// Id attribute of the property element.
    pub fn id(&self) -> Option<&str> {
        match self {
            UnsignedProperty::SignatureTimestamp(ts)
            | UnsignedProperty::SigAndRefsTimestamp(ts)
            | UnsignedProperty::RefsOnlyTimestamp(ts)
            | UnsignedProperty::ArchiveTimestamp(ts) => ts.id.as_deref(),
            UnsignedProperty::CompleteCertificateRefs(refs) => refs.id.as_deref(),
            UnsignedProperty::CompleteRevocationRefs(refs) => refs.id.as_deref(),
            UnsignedProperty::CertificateValues(values) => values.id.as_deref(),
            UnsignedProperty::RevocationValues(values) => values.id.as_deref(),
            UnsignedProperty::CounterSignature(counter) => counter.signature.id.as_deref(),
        }
    }

    /// Bytes contributed to archive-timestamp coverage.
    ///
    /// Timestamps contribute their token encoding.
    pub fn canonical(&self) -> &[u8] {
        match self {
            UnsignedProperty::SignatureTimestamp(ts)
            | UnsignedProperty::SigAndRefsTimestamp(ts)
            | UnsignedProperty::RefsOnlyTimestamp(ts)
            | UnsignedProperty::ArchiveTimestamp(ts) => &ts.token.der,
            UnsignedProperty::CompleteCertificateRefs(refs) => &refs.canonical,
            UnsignedProperty::CompleteRevocationRefs(refs) => &refs.canonical,
            UnsignedProperty::CertificateValues(values) => &values.canonical,
            UnsignedProperty::RevocationValues(values) => &values.canonical,
            UnsignedProperty::CounterSignature(counter) => &counter.canonical,
        }
    }

    /// Element name, for messages.
    pub fn name(&self) -> &'static str {
        match self {
            UnsignedProperty::SignatureTimestamp(_) => "SignatureTimeStamp",
            UnsignedProperty::CompleteCertificateRefs(_) => "CompleteCertificateRefs",
            UnsignedProperty::CompleteRevocationRefs(_) => "CompleteRevocationRefs",
            UnsignedProperty::SigAndRefsTimestamp(_) => "SigAndRefsTimeStamp",
            UnsignedProperty::RefsOnlyTimestamp(_) => "RefsOnlyTimeStamp",
            UnsignedProperty::CertificateValues(_) => "CertificateValues",
            UnsignedProperty::RevocationValues(_) => "RevocationValues",
            UnsignedProperty::ArchiveTimestamp(_) => "ArchiveTimeStamp",
            UnsignedProperty::CounterSignature(_) => "CounterSignature",
        }
    }
}

/// UnsignedSignatureProperties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnsignedProperties {
    /// Id attribute
    pub id: Option<String>,
    /// Children in document order
    pub properties: Vec<UnsignedProperty>,
}

/// A ds:Signature with its XAdES qualifying properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XadesSignature {
    /// Id attribute
    pub id: Option<String>,
    /// SignedInfo
    pub signed_info: SignedInfo,
    /// SignedInfo references, in document order
    pub references: Vec<Reference>,
    /// SignatureValue
    pub signature_value: SignatureValue,
    /// KeyInfo
    pub key_info: Option<KeyInfo>,
    /// SignedProperties
    pub signed_properties: Option<SignedProperties>,
    /// UnsignedSignatureProperties
    pub unsigned_properties: Option<UnsignedProperties>,
}

impl XadesSignature {
    /// Unsigned properties in document order (empty when absent).
    pub fn unsigned(&self) -> &[UnsignedProperty] {
        self.unsigned_properties
            .as_ref()
            .map_or(&[], |u| u.properties.as_slice())
    }

    /// Append an unsigned property, creating the container if needed.
    pub fn push_unsigned(&mut self, property: UnsignedProperty) {
        self.unsigned_properties
            .get_or_insert_with(UnsignedProperties::default)
            .properties
            .push(property);
    }

    /// SigningCertificate references (empty when absent).
    pub fn signing_certificate_refs(&self) -> &[CertRef] {
        self.signed_properties
            .as_ref()
            .map_or(&[], |p| p.signing_certificate.as_slice())
    }

    /// SignatureTimeStamps.
    pub fn signature_timestamps(&self) -> Vec<&XadesTimestamp> {
        self.unsigned()
            .iter()
            .filter_map(|p| match p {
                UnsignedProperty::SignatureTimestamp(ts) => Some(ts),
                _ => None,
            })
            .collect()
    }

    /// SigAndRefsTimeStamps.
    pub fn sig_and_refs_timestamps(&self) -> Vec<&XadesTimestamp> {
        self.unsigned()
            .iter()
            .filter_map(|p| match p {
                UnsignedProperty::SigAndRefsTimestamp(ts) => Some(ts),
                _ => None,
            })
            .collect()
    }

    /// RefsOnlyTimeStamps.
    pub fn refs_only_timestamps(&self) -> Vec<&XadesTimestamp> {
        self.unsigned()
            .iter()
            .filter_map(|p| match p {
                UnsignedProperty::RefsOnlyTimestamp(ts) => Some(ts),
                _ => None,
            })
            .collect()
    }

    /// ArchiveTimeStamps with their position among the unsigned properties.
    pub fn archive_timestamps(&self) -> Vec<(usize, &XadesTimestamp)> {
        self.unsigned()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| match p {
                UnsignedProperty::ArchiveTimestamp(ts) => Some((i, ts)),
                _ => None,
            })
            .collect()
    }

    /// CompleteCertificateRefs.
    pub fn complete_certificate_refs(&self) -> Option<&CompleteCertificateRefs> {
        self.unsigned().iter().find_map(|p| match p {
            UnsignedProperty::CompleteCertificateRefs(refs) => Some(refs),
            _ => None,
        })
    }

    /// CompleteRevocationRefs.
    pub fn complete_revocation_refs(&self) -> Option<&CompleteRevocationRefs> {
        self.unsigned().iter().find_map(|p| match p {
            UnsignedProperty::CompleteRevocationRefs(refs) => Some(refs),
            _ => None,
        })
    }

    /// CertificateValues.
    pub fn certificate_values(&self) -> Option<&CertificateValues> {
        self.unsigned().iter().find_map(|p| match p {
            UnsignedProperty::CertificateValues(values) => Some(values),
            _ => None,
        })
    }

    /// RevocationValues.
    pub fn revocation_values(&self) -> Option<&RevocationValues> {
        self.unsigned().iter().find_map(|p| match p {
            UnsignedProperty::RevocationValues(values) => Some(values),
            _ => None,
        })
    }

    /// CounterSignatures.
    pub fn counter_signatures(&self) -> Vec<&CounterSignature> {
        self.unsigned()
            .iter()
            .filter_map(|p| match p {
                UnsignedProperty::CounterSignature(counter) => Some(counter),
                _ => None,
            })
            .collect()
    }

    /// Certificates from KeyInfo followed by CertificateValues.
    pub fn embedded_certificates(&self) -> Vec<Arc<Certificate>> {
        let mut certificates: Vec<Arc<Certificate>> = Vec::new();
        let key_info = self.key_info.iter().flat_map(|k| k.certificates.iter());
        let values = self
            .certificate_values()
            .into_iter()
            .flat_map(|v| v.certificates.iter());
        for cert in key_info.chain(values) {
            if !certificates.contains(cert) {
                certificates.push(cert.clone());
            }
        }
        certificates
    }

    /// The signing certificate: the first embedded certificate matching the first
    /// SigningCertificate reference by digest.
    pub fn signing_certificate(&self, crypto: &dyn CryptoProvider) -> Option<Arc<Certificate>> {
        let first = self.signing_certificate_refs().first()?;
        self.embedded_certificates()
            .into_iter()
            .find(|cert| first.matches(cert, crypto))
    }

    /// CompleteCertificateRefs entries matched by no embedded certificate.
    ///
    /// The signing certificate counts as a value even when only SigningCertificate
    /// designates it.
    pub fn unmatched_certificate_refs(&self, crypto: &dyn CryptoProvider) -> Vec<&CertRef> {
        let mut leftover: Vec<&CertRef> = self
            .complete_certificate_refs()
            .map(|refs| refs.refs.iter().collect())
            .unwrap_or_default();

        let mut values = self.embedded_certificates();
        if let Some(signing) = self.signing_certificate(crypto) {
            if !values.contains(&signing) {
                values.push(signing);
            }
        }
        for value in &values {
            leftover.retain(|r| !r.matches(value, crypto));
        }
        leftover
    }

    /// CRLRefs and OCSPRefs matched by no RevocationValues entry.
    pub fn unmatched_revocation_refs(
        &self,
        crypto: &dyn CryptoProvider,
    ) -> (Vec<&CrlRef>, Vec<&OcspRef>) {
        let Some(refs) = self.complete_revocation_refs() else {
            return (Vec::new(), Vec::new());
        };
        let mut crl_refs: Vec<&CrlRef> = refs.crl_refs.iter().collect();
        let mut ocsp_refs: Vec<&OcspRef> = refs.ocsp_refs.iter().collect();

        if let Some(values) = self.revocation_values() {
            for crl in &values.crls {
                crl_refs.retain(|r| !r.matches(crl, crypto));
            }
            for response in &values.ocsp_responses {
                ocsp_refs.retain(|r| !r.matches(response, crypto));
            }
        }
        (crl_refs, ocsp_refs)
    }

    /// Bytes covered by a SignatureTimeStamp.
    pub fn signature_timestamp_data(&self) -> Vec<u8> {
        self.signature_value.canonical.clone()
    }

    /// Bytes covered by a SigAndRefsTimeStamp (X type 1).
    ///
    /// SignatureValue, then every SignatureTimeStamp, then the complete
    /// certificate and revocation references.
    pub fn sig_and_refs_data(&self) -> Vec<u8> {
        let mut data = self.signature_value.canonical.clone();
        for ts in self.signature_timestamps() {
            data.extend_from_slice(&ts.token.der);
        }
        data.extend(self.refs_only_data());
        data
    }

    /// Bytes covered by a RefsOnlyTimeStamp (X type 2).
    pub fn refs_only_data(&self) -> Vec<u8> {
        let mut data = Vec::new();
        if let Some(refs) = self.complete_certificate_refs() {
            data.extend_from_slice(&refs.canonical);
        }
        if let Some(refs) = self.complete_revocation_refs() {
            data.extend_from_slice(&refs.canonical);
        }
        data
    }

    /// Bytes covered by the archive timestamp at `position` among the unsigned
    /// properties.
    ///
    /// Referenced data, SignedInfo, SignatureValue, KeyInfo, then every unsigned
    /// property that precedes the archive timestamp.
    pub fn archive_data(&self, position: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for reference in &self.references {
            data.extend_from_slice(&reference.data);
        }
        data.extend_from_slice(&self.signed_info.canonical);
        data.extend_from_slice(&self.signature_value.canonical);
        if let Some(key_info) = &self.key_info {
            data.extend_from_slice(&key_info.canonical);
        }
        for property in self.unsigned().iter().take(position) {
            data.extend_from_slice(property.canonical());
        }
        data
    }

    /// Every Id attribute in the signature, in document order.
    pub fn element_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        ids.extend(self.id.as_deref());
        ids.extend(self.signed_info.id.as_deref());
        ids.extend(self.references.iter().filter_map(|r| r.id.as_deref()));
        ids.extend(self.signature_value.id.as_deref());
        ids.extend(self.key_info.as_ref().and_then(|k| k.id.as_deref()));
        if let Some(props) = &self.signed_properties {
            ids.extend(props.id.as_deref());
            let timestamps = props
                .all_data_objects_timestamps
                .iter()
                .chain(props.individual_data_objects_timestamps.iter());
            ids.extend(timestamps.filter_map(|ts| ts.id.as_deref()));
        }
        if let Some(unsigned) = &self.unsigned_properties {
            ids.extend(unsigned.id.as_deref());
            ids.extend(unsigned.properties.iter().filter_map(|p| p.id()));
        }
        ids
    }
}
