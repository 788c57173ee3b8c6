//! Shared test PKI.
//!
//! Certificates, CRLs, OCSP responses and timestamps are built directly from
//! their decoded fields. Signatures use a toy scheme checked by [`TestCrypto`]:
//! `signature = SHA-256(signer public key || signed bytes)`.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use xades_oxide::crypto::{compute_digest, CryptoProvider, DigestAlgorithm, SignatureAlgorithm};
use xades_oxide::tokens::{
    Certificate, Crl, DistinguishedName, MessageImprint, OcspCertStatus, OcspResponse,
    ResponderId, RevokedEntry, SerialNumber, SingleResponse, TimestampToken,
};
use xades_oxide::sources::{
    CertificateSourceType, ListCertificateSource, ListCrlSource, ServiceInfo,
};
use xades_oxide::xades::{
    CertRef, CertificateValues, CompleteCertificateRefs, CompleteRevocationRefs, CrlRef, KeyInfo,
    Reference, RevocationValues, SignatureValue, SignedInfo, SignedProperties, UnsignedProperty,
    XadesSignature, XadesTimestamp, SIGNED_PROPERTIES_TYPE,
};

pub const SIGNATURE_METHOD: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";

/// Crypto provider for the toy signature scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestCrypto;

impl CryptoProvider for TestCrypto {
    fn verify_signature(
        &self,
        signer: &Certificate,
        _algorithm: &SignatureAlgorithm,
        signed_data: &[u8],
        signature: &[u8],
    ) -> bool {
        toy_sign(&signer.public_key_der, signed_data) == signature
    }
}

pub fn toy_sign(public_key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(public_key);
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Route `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

/// Default validation instant of the test PKI.
pub fn now() -> DateTime<Utc> {
    date(2024, 6, 1)
}

pub struct CertSpec<'a> {
    pub subject: &'a str,
    pub issuer: Option<&'a Certificate>,
    pub serial: u64,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub qc_statements: Vec<String>,
    pub key: Option<Vec<u8>>,
}

impl<'a> CertSpec<'a> {
    pub fn new(subject: &'a str, issuer: Option<&'a Certificate>, serial: u64) -> Self {
        Self {
            subject,
            issuer,
            serial,
            not_before: date(2020, 1, 1),
            not_after: date(2030, 1, 1),
            qc_statements: Vec::new(),
            key: None,
        }
    }

    /// Use an explicit public key, e.g. for a re-issued CA certificate.
    pub fn key(mut self, key: &[u8]) -> Self {
        self.key = Some(key.to_vec());
        self
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn qc(mut self, oid: &str) -> Self {
        self.qc_statements.push(oid.to_string());
        self
    }

    pub fn build(self) -> Arc<Certificate> {
        let public_key_der = self
            .key
            .clone()
            .unwrap_or_else(|| format!("key:{}:{}", self.subject, self.serial).into_bytes());
        let issuer_name = self.issuer.map_or(self.subject, |i| i.subject.as_str());
        let signer_key = self
            .issuer
            .map_or(public_key_der.clone(), |i| i.public_key_der.clone());
        let tbs = format!(
            "tbs:{}:{}:{}:{}",
            self.subject,
            issuer_name,
            self.serial,
            self.not_before.timestamp()
        )
        .into_bytes();
        let signature = toy_sign(&signer_key, &tbs);
        let mut der = tbs.clone();
        der.extend_from_slice(&signature);

        Arc::new(Certificate {
            der,
            subject: DistinguishedName::new(self.subject),
            issuer: DistinguishedName::new(issuer_name),
            serial: SerialNumber::from_u64(self.serial),
            not_before: self.not_before,
            not_after: self.not_after,
            public_key_der,
            tbs,
            signature_algorithm: SignatureAlgorithm::RsaSha256,
            signature,
            qc_statements: self.qc_statements,
        })
    }
}

pub fn root(subject: &str, serial: u64) -> Arc<Certificate> {
    CertSpec::new(subject, None, serial).build()
}

pub fn issued(subject: &str, issuer: &Certificate, serial: u64) -> Arc<Certificate> {
    CertSpec::new(subject, Some(issuer), serial).build()
}

pub fn crl(
    issuer: &Certificate,
    number: u64,
    this_update: DateTime<Utc>,
    revoked: &[(u64, DateTime<Utc>)],
) -> Arc<Crl> {
    let tbs = format!("crl:{}:{}:{}", issuer.subject, number, this_update.timestamp()).into_bytes();
    let signature = toy_sign(&issuer.public_key_der, &tbs);
    let mut der = tbs.clone();
    der.extend_from_slice(&signature);
    Arc::new(Crl {
        der,
        issuer: issuer.subject.clone(),
        number: Some(SerialNumber::from_u64(number)),
        this_update,
        next_update: Some(this_update + chrono::Duration::days(7)),
        revoked: revoked
            .iter()
            .map(|(serial, at)| RevokedEntry {
                serial: SerialNumber::from_u64(*serial),
                revocation_date: *at,
            })
            .collect(),
        tbs,
        signature_algorithm: SignatureAlgorithm::RsaSha256,
        signature,
    })
}

pub fn ocsp(
    responder: &Arc<Certificate>,
    produced_at: DateTime<Utc>,
    entries: &[(u64, OcspCertStatus)],
) -> Arc<OcspResponse> {
    let tbs = format!("ocsp:{}:{}:{}", responder.subject, produced_at.timestamp(), entries.len())
        .into_bytes();
    let signature = toy_sign(&responder.public_key_der, &tbs);
    let mut der = tbs.clone();
    der.extend_from_slice(&signature);
    Arc::new(OcspResponse {
        der,
        responder: ResponderId::ByName(responder.subject.clone()),
        produced_at,
        responses: entries
            .iter()
            .map(|(serial, status)| SingleResponse {
                serial: SerialNumber::from_u64(*serial),
                status: *status,
                this_update: produced_at,
                next_update: None,
            })
            .collect(),
        tbs,
        signature_algorithm: SignatureAlgorithm::RsaSha256,
        signature,
        certificates: vec![responder.clone()],
    })
}

/// A timestamp token over `covered`, signed by `tsa` and carrying it.
pub fn timestamp(tsa: &Arc<Certificate>, covered: &[u8], gen_time: DateTime<Utc>) -> Arc<TimestampToken> {
    let digest = compute_digest(DigestAlgorithm::Sha256, covered);
    timestamp_with_imprint(tsa, DigestAlgorithm::Sha256.oid(), digest, gen_time)
}

pub fn timestamp_with_imprint(
    tsa: &Arc<Certificate>,
    algorithm_oid: &str,
    digest: Vec<u8>,
    gen_time: DateTime<Utc>,
) -> Arc<TimestampToken> {
    let mut signed_attributes = b"tst:".to_vec();
    signed_attributes.extend_from_slice(&digest);
    signed_attributes.extend_from_slice(gen_time.to_rfc3339().as_bytes());
    let signature = toy_sign(&tsa.public_key_der, &signed_attributes);
    let mut der = signed_attributes.clone();
    der.extend_from_slice(&signature);
    Arc::new(TimestampToken {
        der,
        gen_time,
        imprint: MessageImprint {
            algorithm_oid: algorithm_oid.to_string(),
            digest,
        },
        signer_issuer: tsa.issuer.clone(),
        signer_serial: tsa.serial.clone(),
        signed_attributes,
        signature_algorithm: SignatureAlgorithm::RsaSha256,
        signature,
        certificates: vec![tsa.clone()],
    })
}

pub fn reference(id: &str, data: &[u8]) -> Reference {
    Reference {
        id: Some(id.to_string()),
        uri: format!("doc-{}.xml", id),
        reference_type: None,
        digest_method: DigestAlgorithm::Sha256.uri().to_string(),
        digest_value: compute_digest(DigestAlgorithm::Sha256, data),
        data: data.to_vec(),
    }
}

/// A BES signature by `signer` over one data object, with KeyInfo and
/// SigningCertificate pointing at the signer.
pub fn bes_signature(signer: &Arc<Certificate>) -> XadesSignature {
    let data_ref = reference("ref-data", b"<document>payload</document>");
    let props_bytes = b"<SignedProperties Id=\"props\"/>";
    let mut props_ref = reference("ref-props", props_bytes);
    props_ref.uri = "#props".to_string();
    props_ref.reference_type = Some(SIGNED_PROPERTIES_TYPE.to_string());

    let signed_info_bytes = format!(
        "<SignedInfo>{}{}</SignedInfo>",
        hex(&data_ref.digest_value),
        hex(&props_ref.digest_value)
    )
    .into_bytes();
    let value = toy_sign(&signer.public_key_der, &signed_info_bytes);

    XadesSignature {
        id: Some("sig".to_string()),
        signed_info: SignedInfo {
            id: Some("signed-info".to_string()),
            signature_method: SIGNATURE_METHOD.to_string(),
            canonical: signed_info_bytes,
        },
        references: vec![data_ref, props_ref],
        signature_value: SignatureValue {
            id: Some("sig-value".to_string()),
            canonical: format!("<SignatureValue>{}</SignatureValue>", hex(&value)).into_bytes(),
            value,
        },
        key_info: Some(KeyInfo {
            id: Some("key-info".to_string()),
            certificates: vec![signer.clone()],
            canonical: b"<KeyInfo/>".to_vec(),
        }),
        signed_properties: Some(SignedProperties {
            id: Some("props".to_string()),
            signing_time: Some(date(2024, 5, 1)),
            signing_certificate: vec![CertRef::for_certificate(signer, DigestAlgorithm::Sha256)],
            ..Default::default()
        }),
        unsigned_properties: None,
    }
}

pub fn signature_timestamp(signature: &XadesSignature, tsa: &Arc<Certificate>, id: &str) -> XadesTimestamp {
    let token = timestamp(tsa, &signature.signature_timestamp_data(), date(2024, 5, 2));
    XadesTimestamp::new(token).with_id(id)
}

pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Root, intermediate, leaf and TSA, with CRLs for both CA levels.
pub struct TestPki {
    pub root: Arc<Certificate>,
    pub intermediate: Arc<Certificate>,
    pub leaf: Arc<Certificate>,
    pub tsa: Arc<Certificate>,
    /// Issued by the intermediate; covers the leaf
    pub crl_intermediate: Arc<Crl>,
    /// Issued by the root; covers the intermediate and the TSA
    pub crl_root: Arc<Crl>,
}

impl TestPki {
    pub fn new() -> Self {
        Self::with_revoked(&[])
    }

    /// PKI whose intermediate CRL lists `revoked` leaf-level serials.
    pub fn with_revoked(revoked: &[(u64, DateTime<Utc>)]) -> Self {
        let root = root("CN=Test Root CA,O=Test", 1);
        let intermediate = issued("CN=Test Issuing CA,O=Test", &root, 2);
        let leaf = issued("CN=Alice,O=Test", &intermediate, 3);
        let tsa = issued("CN=Test TSA,O=Test", &root, 4);
        let crl_intermediate = crl(&intermediate, 10, date(2024, 5, 15), revoked);
        let crl_root = crl(&root, 20, date(2024, 5, 15), &[]);
        Self {
            root,
            intermediate,
            leaf,
            tsa,
            crl_intermediate,
            crl_root,
        }
    }

    pub fn service() -> ServiceInfo {
        ServiceInfo::new("Test Qualified CA Service", date(2019, 1, 1))
    }

    /// Trusted list holding the root.
    pub fn trusted_list(&self) -> ListCertificateSource {
        let mut trusted = ListCertificateSource::new(CertificateSourceType::TrustedList);
        trusted.add_trusted(self.root.clone(), Self::service());
        trusted
    }

    /// AIA-style source holding the intermediate.
    pub fn aia(&self) -> ListCertificateSource {
        ListCertificateSource::from_certificates(
            CertificateSourceType::Aia,
            [self.intermediate.clone()],
        )
    }

    pub fn crls(&self) -> ListCrlSource {
        ListCrlSource::new([self.crl_intermediate.clone(), self.crl_root.clone()])
    }

    /// Certificates needed to trust the leaf, for CompleteCertificateRefs.
    pub fn chain_certificates(&self) -> Vec<Arc<Certificate>> {
        vec![self.intermediate.clone(), self.root.clone()]
    }
}

/// Add T, C, X (both types), XL and A properties to a BES signature of the
/// test PKI leaf.
pub fn archival_signature(pki: &TestPki) -> XadesSignature {
    let mut signature = bes_signature(&pki.leaf);
    add_signature_timestamp(&mut signature, pki);
    add_complete_refs(&mut signature, pki);
    add_x_timestamps(&mut signature, pki);
    add_values(&mut signature, pki);
    add_archive_timestamp(&mut signature, pki);
    signature
}

pub fn add_signature_timestamp(signature: &mut XadesSignature, pki: &TestPki) {
    let ts = signature_timestamp(signature, &pki.tsa, "sig-ts").with_include("sig-value");
    signature.push_unsigned(UnsignedProperty::SignatureTimestamp(ts));
}

pub fn add_complete_refs(signature: &mut XadesSignature, pki: &TestPki) {
    let certificate_refs = pki
        .chain_certificates()
        .iter()
        .map(|c| CertRef::for_certificate(c, DigestAlgorithm::Sha256))
        .collect();
    signature.push_unsigned(UnsignedProperty::CompleteCertificateRefs(CompleteCertificateRefs {
        id: Some("cert-refs".to_string()),
        refs: certificate_refs,
        canonical: b"<CompleteCertificateRefs/>".to_vec(),
    }));
    signature.push_unsigned(UnsignedProperty::CompleteRevocationRefs(CompleteRevocationRefs {
        id: Some("rev-refs".to_string()),
        crl_refs: vec![
            CrlRef::for_crl(&pki.crl_intermediate, DigestAlgorithm::Sha256),
            CrlRef::for_crl(&pki.crl_root, DigestAlgorithm::Sha256),
        ],
        ocsp_refs: Vec::new(),
        canonical: b"<CompleteRevocationRefs/>".to_vec(),
    }));
}

pub fn add_x_timestamps(signature: &mut XadesSignature, pki: &TestPki) {
    let x1 = timestamp(&pki.tsa, &signature.sig_and_refs_data(), date(2024, 5, 20));
    let x1 = XadesTimestamp::new(x1)
        .with_id("x1-ts")
        .with_include("sig-value")
        .with_include("sig-ts")
        .with_include("cert-refs")
        .with_include("rev-refs");
    let x2 = timestamp(&pki.tsa, &signature.refs_only_data(), date(2024, 5, 20));
    let x2 = XadesTimestamp::new(x2)
        .with_id("x2-ts")
        .with_include("cert-refs")
        .with_include("rev-refs");
    signature.push_unsigned(UnsignedProperty::SigAndRefsTimestamp(x1));
    signature.push_unsigned(UnsignedProperty::RefsOnlyTimestamp(x2));
}

pub fn add_values(signature: &mut XadesSignature, pki: &TestPki) {
    signature.push_unsigned(UnsignedProperty::CertificateValues(CertificateValues {
        id: Some("cert-values".to_string()),
        certificates: pki.chain_certificates(),
        canonical: b"<CertificateValues/>".to_vec(),
    }));
    signature.push_unsigned(UnsignedProperty::RevocationValues(RevocationValues {
        id: Some("rev-values".to_string()),
        crls: vec![pki.crl_intermediate.clone(), pki.crl_root.clone()],
        ocsp_responses: Vec::new(),
        canonical: b"<RevocationValues/>".to_vec(),
    }));
}

pub fn add_archive_timestamp(signature: &mut XadesSignature, pki: &TestPki) {
    let position = signature.unsigned().len();
    let token = timestamp(&pki.tsa, &signature.archive_data(position), date(2024, 5, 25));
    let mut ts = XadesTimestamp::new(token).with_id("archive-ts");
    let mut ids: Vec<String> = vec![
        "ref-data".to_string(),
        "ref-props".to_string(),
        "signed-info".to_string(),
        "sig-value".to_string(),
        "key-info".to_string(),
    ];
    ids.extend(signature.unsigned().iter().filter_map(|p| p.id()).map(str::to_string));
    for id in &ids {
        ts = ts.with_include(id);
    }
    signature.push_unsigned(UnsignedProperty::ArchiveTimestamp(ts));
}
