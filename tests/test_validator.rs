//! End-to-end validation tests.

mod common;

use common::*;
use std::sync::Arc;
use xades_oxide::tokens::{OcspCertStatus, QC_COMPLIANCE};
use xades_oxide::xades::{CounterSignature, UnsignedProperty, COUNTERSIGNED_SIGNATURE_TYPE};
use xades_oxide::{
    Error, Indication, ListOcspSource, ReasonCode, SignatureLevel, SignatureValidator,
    ValidationConfig,
};

fn validator(pki: &TestPki) -> SignatureValidator {
    init_logging();
    SignatureValidator::new(pki.trusted_list()).with_crypto(TestCrypto)
}

/// Validator that can also reach the intermediate and both CRLs.
fn connected_validator(pki: &TestPki) -> SignatureValidator {
    validator(pki)
        .with_certificate_source(pki.aia())
        .with_crl_source(pki.crls())
}

#[test]
fn test_archival_signature_validates_from_embedded_values() {
    let pki = TestPki::new();
    let signature = archival_signature(&pki);
    let report = validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.integrity.is_valid(), "{}", report.integrity);
    assert!(report.chain.is_valid(), "{}", report.chain);
    assert!(report.structure.is_consistent(), "{:?}", report.structure.failures);
    assert_eq!(report.highest_level, Some(SignatureLevel::A));
    assert!(report.is_valid());

    assert_eq!(report.signature_id.as_deref(), Some("sig"));
    assert_eq!(
        report.signing_certificate.as_ref().map(|c| c.subject.as_str()),
        Some("CN=Alice,O=Test")
    );
    assert_eq!(report.evidence.chain.len(), 3);
    assert_eq!(report.evidence.certificates.len(), 2);
    assert_eq!(report.evidence.crls.len(), 2);
    assert!(report.evidence.chain[2].no_check_needed);
}

#[test]
fn test_bes_signature_with_external_sources() {
    let pki = TestPki::new();
    let signature = bes_signature(&pki.leaf);
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert_eq!(report.indication(), Indication::Valid);
    assert_eq!(report.highest_level, Some(SignatureLevel::Bes));
    assert!(report.level_consistency.c_implies_t.is_none());
}

#[test]
fn test_bes_signature_without_sources_is_undetermined() {
    let pki = TestPki::new();
    let signature = bes_signature(&pki.leaf);
    let report = validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.integrity.is_valid());
    assert!(report.chain.is_undetermined());
    assert_eq!(report.chain.reason, Some(ReasonCode::Unresolved));
    assert_eq!(report.indication(), Indication::Undetermined);
}

#[test]
fn test_revoked_signing_certificate() {
    let pki = TestPki::with_revoked(&[(3, date(2024, 3, 1))]);
    let signature = bes_signature(&pki.leaf);
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.chain.is_invalid());
    assert_eq!(report.chain.reason, Some(ReasonCode::Revoked));
    assert_eq!(report.indication(), Indication::Invalid);

    let json = report.to_json().unwrap();
    assert!(json.contains("CHAIN-001"));
}

#[test]
fn test_unsigned_ocsp_answer_cannot_hide_revocation() {
    let pki = TestPki::with_revoked(&[(3, date(2024, 3, 1))]);
    let mut forged = (*ocsp(&pki.intermediate, date(2024, 5, 30), &[(3, OcspCertStatus::Good)])).clone();
    forged.signature = vec![0; 32];
    let signature = bes_signature(&pki.leaf);
    let report = connected_validator(&pki)
        .with_ocsp_source(ListOcspSource::new([Arc::new(forged)]))
        .validate(&signature, now())
        .unwrap();

    assert!(report.chain.is_invalid(), "{}", report.chain);
    assert_eq!(report.chain.reason, Some(ReasonCode::Revoked));
    assert!(report.evidence.ocsp_responses.is_empty());
}

#[test]
fn test_status_backed_by_untrusted_evidence_is_undetermined() {
    let pki = TestPki::new();
    // The responder certificate had expired by the validation date.
    let responder = CertSpec::new("CN=Test OCSP Responder,O=Test", Some(pki.intermediate.as_ref()), 50)
        .validity(date(2020, 1, 1), date(2024, 1, 1))
        .build();
    let response = ocsp(&responder, date(2024, 5, 30), &[(3, OcspCertStatus::Good)]);
    let signature = bes_signature(&pki.leaf);
    let report = connected_validator(&pki)
        .with_ocsp_source(ListOcspSource::new([response]))
        .validate(&signature, now())
        .unwrap();

    assert!(report.chain.is_undetermined(), "{}", report.chain);
    assert_eq!(report.chain.reason, Some(ReasonCode::Unresolved));
    assert_eq!(report.indication(), Indication::Undetermined);
}

#[test]
fn test_validation_before_revocation() {
    let pki = TestPki::with_revoked(&[(3, date(2024, 3, 1))]);
    let signature = bes_signature(&pki.leaf);
    // The CRL itself is issued after this instant, so no status can be found.
    let report = connected_validator(&pki)
        .validate(&signature, date(2024, 2, 1))
        .unwrap();
    assert!(!report.chain.is_invalid());
}

#[test]
fn test_tampered_reference_data() {
    let pki = TestPki::new();
    let mut signature = bes_signature(&pki.leaf);
    signature.references[0].data = b"<document>forged</document>".to_vec();
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.integrity.is_invalid());
    assert_eq!(report.integrity.reason, Some(ReasonCode::ReferenceDigestMismatch));
    assert!(!report.is_valid());
}

#[test]
fn test_wrong_signature_value() {
    let pki = TestPki::new();
    let mut signature = bes_signature(&pki.leaf);
    signature.signature_value.value = vec![0xAB; 32];
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert_eq!(report.integrity.reason, Some(ReasonCode::SignatureValueInvalid));
}

#[test]
fn test_missing_mandatory_elements_abort() {
    let pki = TestPki::new();
    let mut without_props = bes_signature(&pki.leaf);
    without_props.signed_properties = None;
    let result = validator(&pki).validate(&without_props, now());
    assert!(matches!(result, Err(Error::Structural(_))));

    let mut empty_value = bes_signature(&pki.leaf);
    empty_value.signature_value.value.clear();
    let result = validator(&pki).validate(&empty_value, now());
    assert!(matches!(result, Err(Error::Structural(_))));
}

#[test]
fn test_unresolvable_signing_certificate() {
    let pki = TestPki::new();
    let mut signature = bes_signature(&pki.leaf);
    if let Some(props) = signature.signed_properties.as_mut() {
        props.signing_certificate[0].digest_value = vec![7u8; 32];
    }
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.signing_certificate.is_none());
    assert_eq!(report.chain.reason, Some(ReasonCode::NoValidationContext));
    assert_eq!(report.integrity.reason, Some(ReasonCode::NoSigningCertificate));
    assert_eq!(report.highest_level, None);
    assert_eq!(report.evidence.discovery_passes, 0);
}

#[test]
fn test_counter_signatures_are_validated() {
    let pki = TestPki::new();
    let bob = issued("CN=Bob,O=Test", &pki.intermediate, 30);
    let mut counter = bes_signature(&bob);
    counter.id = Some("counter-sig".to_string());
    counter.signed_info.id = Some("counter-signed-info".to_string());
    counter.signature_value.id = Some("counter-sig-value".to_string());
    counter.key_info.as_mut().unwrap().id = Some("counter-key-info".to_string());
    counter.signed_properties.as_mut().unwrap().id = Some("counter-props".to_string());
    for reference in counter.references.iter_mut() {
        reference.id = reference.id.as_ref().map(|id| format!("counter-{}", id));
    }
    let mut parent_ref = reference("counter-ref-parent", b"<SignatureValue/>");
    parent_ref.uri = "#sig-value".to_string();
    parent_ref.reference_type = Some(COUNTERSIGNED_SIGNATURE_TYPE.to_string());
    counter.references.push(parent_ref);

    let mut signature = bes_signature(&pki.leaf);
    signature.push_unsigned(UnsignedProperty::CounterSignature(CounterSignature {
        signature: Box::new(counter),
        canonical: b"<CounterSignature/>".to_vec(),
    }));

    let report = connected_validator(&pki).validate(&signature, now()).unwrap();
    assert!(report.structure.is_consistent(), "{:?}", report.structure.failures);
    assert_eq!(report.counter_signatures.len(), 1);
    let counter_report = &report.counter_signatures[0];
    assert_eq!(counter_report.signature_id.as_deref(), Some("counter-sig"));
    assert_eq!(
        counter_report.signing_certificate.as_ref().map(|c| c.subject.as_str()),
        Some("CN=Bob,O=Test")
    );
    assert!(counter_report.chain.is_valid(), "{}", counter_report.chain);

    let config = ValidationConfig::default().with_counter_signatures(false);
    let report = connected_validator(&pki)
        .with_config(config)
        .validate(&signature, now())
        .unwrap();
    assert!(report.counter_signatures.is_empty());
}

#[test]
fn test_context_is_reused_for_same_certificate_and_instant() {
    let pki = TestPki::new();
    let signature = bes_signature(&pki.leaf);
    let mut validator = connected_validator(&pki);

    assert!(validator.last_context().is_none());
    let first = validator.validate(&signature, now()).unwrap();
    let tokens = validator.last_context().map(|c| c.len());
    assert_eq!(tokens, Some(5));

    let second = validator.validate(&signature, now()).unwrap();
    assert_eq!(first.evidence, second.evidence);
    assert_eq!(validator.last_context().map(|c| c.len()), tokens);
}

#[test]
fn test_qualified_signing_certificate() {
    let pki = TestPki::new();
    let qualified = CertSpec::new("CN=Qualified Alice,O=Test", Some(pki.intermediate.as_ref()), 40)
        .qc(QC_COMPLIANCE)
        .build();
    let signature = bes_signature(&qualified);
    let report = connected_validator(&pki).validate(&signature, now()).unwrap();

    assert!(report.qualification.qc_compliance);
    assert!(!report.qualification.qc_sscd);
    assert!(report.qualification.qualified);
    assert_eq!(
        report.qualification.trusted_service.as_deref(),
        Some("Test Qualified CA Service")
    );
}

#[test]
fn test_report_json_shape() {
    let pki = TestPki::new();
    let signature = archival_signature(&pki);
    let report = validator(&pki).validate(&signature, now()).unwrap();
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["signature_id"], "sig");
    assert_eq!(value["highest_level"], "A");
    assert_eq!(value["levels"]["bes"]["indication"], "VALID");
    assert_eq!(value["levels"]["epes"]["reason"], "EPES-001");
    assert_eq!(value["structure"]["failures"].as_array().map(Vec::len), Some(0));
    assert!(value.get("counter_signatures").is_none());
}
