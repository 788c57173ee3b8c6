//! Individual structural checks.
//!
//! Each check inspects the property graph and records its failures in the report.
//! Checks are independent of each other and never look at trust or revocation.

use super::types::{StructuralCheck, StructuralFailure, StructuralReport};
use crate::crypto::{CryptoProvider, DigestAlgorithm};
use crate::xades::{fragment, SignaturePolicy, XadesSignature, XadesTimestamp, COUNTERSIGNED_SIGNATURE_TYPE};
use std::collections::{BTreeSet, HashSet};

/// What every check sees.
pub(crate) struct CheckInput<'a> {
    pub signature: &'a XadesSignature,
    pub crypto: &'a dyn CryptoProvider,
}

fn reference_ids(signature: &XadesSignature) -> HashSet<&str> {
    signature
        .references
        .iter()
        .filter_map(|r| r.id.as_deref())
        .collect()
}

fn timestamp_label(name: &str, ts: &XadesTimestamp) -> String {
    match &ts.id {
        Some(id) => format!("{} '{}'", name, id),
        None => name.to_string(),
    }
}

/// Compare the includes of `ts` with an exact expected set.
fn check_exact_includes(
    check: StructuralCheck,
    label: &str,
    ts: &XadesTimestamp,
    expected: &BTreeSet<&str>,
    report: &mut StructuralReport,
) {
    let included: BTreeSet<&str> = ts.included_ids().collect();
    let missing: Vec<&str> = expected.difference(&included).copied().collect();
    let extra: Vec<&str> = included.difference(expected).copied().collect();
    if !missing.is_empty() {
        report.add_failure(
            StructuralFailure::new(check, format!("does not include {}", missing.join(", ")))
                .with_location(label),
        );
    }
    if !extra.is_empty() {
        report.add_failure(
            StructuralFailure::new(check, format!("includes unexpected {}", extra.join(", ")))
                .with_location(label),
        );
    }
}

/// Push the id of a required element into `expected`, or record that it has none.
fn require_id<'a>(
    check: StructuralCheck,
    element: &str,
    id: Option<&'a str>,
    expected: &mut BTreeSet<&'a str>,
    report: &mut StructuralReport,
) {
    match id {
        Some(id) => {
            expected.insert(id);
        },
        None => report.add_failure(
            StructuralFailure::new(check, format!("{} has no Id and cannot be included", element))
                .with_location(element),
        ),
    }
}

pub(crate) fn check_signing_certificate_digest(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let check = StructuralCheck::SigningCertificateDigest;
    let Some(first) = input.signature.signing_certificate_refs().first() else {
        report.add_failure(StructuralFailure::new(check, "no SigningCertificate reference"));
        return;
    };
    let Some(certificate) = key_info_certificate(input.signature) else {
        report.add_failure(
            StructuralFailure::new(check, "KeyInfo carries no certificate").with_location("KeyInfo"),
        );
        return;
    };
    if !first.matches(certificate, input.crypto) {
        report.add_failure(
            StructuralFailure::new(
                check,
                format!("digest of '{}' differs from the SigningCertificate reference", certificate.subject),
            )
            .with_location("SigningCertificate"),
        );
    }
}

pub(crate) fn check_signing_certificate_issuer_serial(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::SigningCertificateIssuerSerial;
    let (Some(first), Some(certificate)) = (
        input.signature.signing_certificate_refs().first(),
        key_info_certificate(input.signature),
    ) else {
        report.add_failure(StructuralFailure::new(
            check,
            "SigningCertificate reference or KeyInfo certificate missing",
        ));
        return;
    };
    if !first.matches_issuer_serial(certificate) {
        report.add_failure(
            StructuralFailure::new(
                check,
                format!(
                    "reference names {} / {}, KeyInfo holds {} / {}",
                    first.issuer,
                    first.serial,
                    certificate.issuer,
                    certificate.serial.to_decimal()
                ),
            )
            .with_location("SigningCertificate"),
        );
    }
}

fn key_info_certificate(signature: &XadesSignature) -> Option<&crate::tokens::Certificate> {
    signature
        .key_info
        .as_ref()
        .and_then(|k| k.certificates.first())
        .map(|c| c.as_ref())
}

pub(crate) fn check_all_data_objects_timestamp(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let check = StructuralCheck::AllDataObjectsTimestamp;
    let Some(props) = &input.signature.signed_properties else {
        return;
    };
    if props.all_data_objects_timestamps.is_empty() {
        return;
    }

    let mut expected = BTreeSet::new();
    for (i, reference) in input
        .signature
        .references
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_signed_properties())
    {
        let element = format!("Reference[{}]", i);
        require_id(check, &element, reference.id.as_deref(), &mut expected, report);
    }
    for ts in &props.all_data_objects_timestamps {
        let label = timestamp_label("AllDataObjectsTimeStamp", ts);
        check_exact_includes(check, &label, ts, &expected, report);
    }
}

pub(crate) fn check_individual_data_objects_timestamp(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::IndividualDataObjectsTimestamp;
    let Some(props) = &input.signature.signed_properties else {
        return;
    };
    let references = reference_ids(input.signature);
    for ts in &props.individual_data_objects_timestamps {
        let label = timestamp_label("IndividualDataObjectsTimeStamp", ts);
        if ts.includes.is_empty() {
            report.add_failure(
                StructuralFailure::new(check, "includes no Reference").with_location(&label),
            );
        }
        for id in ts.included_ids().filter(|id| !references.contains(id)) {
            report.add_failure(
                StructuralFailure::new(check, format!("include '{}' is not a Reference", id))
                    .with_location(&label),
            );
        }
    }
}

pub(crate) fn check_commitment_object_references(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::CommitmentObjectReferences;
    let Some(props) = &input.signature.signed_properties else {
        return;
    };
    let references = reference_ids(input.signature);
    for indication in &props.commitment_type_indications {
        for uri in &indication.object_references {
            if !references.contains(fragment(uri)) {
                report.add_failure(
                    StructuralFailure::new(
                        check,
                        format!("ObjectReference '{}' does not resolve to a Reference", uri),
                    )
                    .with_location(format!("CommitmentTypeIndication {}", indication.commitment_type)),
                );
            }
        }
    }
}

pub(crate) fn check_data_object_format_references(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::DataObjectFormatReferences;
    let Some(props) = &input.signature.signed_properties else {
        return;
    };
    let references = reference_ids(input.signature);
    for format in &props.data_object_formats {
        if !references.contains(fragment(&format.object_reference)) {
            report.add_failure(
                StructuralFailure::new(
                    check,
                    format!(
                        "ObjectReference '{}' does not resolve to a Reference",
                        format.object_reference
                    ),
                )
                .with_location("DataObjectFormat"),
            );
        }
    }
}

pub(crate) fn check_signer_role(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let role = input
        .signature
        .signed_properties
        .as_ref()
        .and_then(|p| p.signer_role.as_ref());
    if let Some(role) = role {
        if role.claimed_roles.is_empty() && role.certified_roles.is_empty() {
            report.add_failure(
                StructuralFailure::new(
                    StructuralCheck::SignerRole,
                    "SignerRole has neither claimed nor certified roles",
                )
                .with_location("SignerRole"),
            );
        }
    }
}

pub(crate) fn check_signature_policy(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let check = StructuralCheck::SignaturePolicy;
    let policy = input
        .signature
        .signed_properties
        .as_ref()
        .and_then(|p| p.policy.as_ref());
    let Some(SignaturePolicy::Explicit {
        identifier,
        digest_method,
        digest_value,
        ..
    }) = policy
    else {
        return;
    };

    if identifier.trim().is_empty() {
        report.add_failure(
            StructuralFailure::new(check, "SigPolicyId is empty").with_location("SignaturePolicyId"),
        );
    }
    if DigestAlgorithm::from_uri(digest_method).is_none() {
        report.add_failure(
            StructuralFailure::new(check, format!("unsupported SigPolicyHash method {}", digest_method))
                .with_location("SigPolicyHash"),
        );
    }
    if digest_value.is_empty() {
        report.add_failure(
            StructuralFailure::new(check, "SigPolicyHash is empty").with_location("SigPolicyHash"),
        );
    }
}

pub(crate) fn check_signature_timestamp_includes(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::SignatureTimestampIncludes;
    let signature_value_id = input.signature.signature_value.id.as_deref();
    for ts in input.signature.signature_timestamps() {
        if ts.includes.is_empty() {
            continue;
        }
        let label = timestamp_label("SignatureTimeStamp", ts);
        let Some(expected) = signature_value_id else {
            report.add_failure(
                StructuralFailure::new(check, "SignatureValue has no Id").with_location(&label),
            );
            continue;
        };
        for id in ts.included_ids().filter(|id| *id != expected) {
            report.add_failure(
                StructuralFailure::new(
                    check,
                    format!("includes '{}' besides the SignatureValue", id),
                )
                .with_location(&label),
            );
        }
    }
}

pub(crate) fn check_complete_certificate_refs(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let check = StructuralCheck::CompleteCertificateRefs;
    let signature = input.signature;
    let needs_refs = signature.complete_revocation_refs().is_some()
        || !signature.sig_and_refs_timestamps().is_empty()
        || !signature.refs_only_timestamps().is_empty();

    let Some(refs) = signature.complete_certificate_refs() else {
        if needs_refs {
            report.add_failure(StructuralFailure::new(
                check,
                "C-level properties present without CompleteCertificateRefs",
            ));
        }
        return;
    };

    if let Some(signing) = signature.signing_certificate(input.crypto) {
        if refs.refs.iter().any(|r| r.matches(&signing, input.crypto)) {
            report.add_failure(
                StructuralFailure::new(
                    check,
                    format!("references the signing certificate '{}'", signing.subject),
                )
                .with_location("CompleteCertificateRefs"),
            );
        }
    }
}

pub(crate) fn check_complete_revocation_refs(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let has_certificate_refs = input.signature.complete_certificate_refs().is_some();
    let has_revocation_refs = input.signature.complete_revocation_refs().is_some();
    if has_certificate_refs != has_revocation_refs {
        let message = if has_certificate_refs {
            "CompleteCertificateRefs present without CompleteRevocationRefs"
        } else {
            "CompleteRevocationRefs present without CompleteCertificateRefs"
        };
        report.add_failure(StructuralFailure::new(
            StructuralCheck::CompleteRevocationRefs,
            message,
        ));
    }
}

pub(crate) fn check_sig_and_refs_timestamp_includes(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::SigAndRefsTimestampIncludes;
    let signature = input.signature;
    let timestamps = signature.sig_and_refs_timestamps();
    if timestamps.is_empty() {
        return;
    }

    let mut expected = BTreeSet::new();
    require_id(
        check,
        "SignatureValue",
        signature.signature_value.id.as_deref(),
        &mut expected,
        report,
    );
    for ts in signature.signature_timestamps() {
        require_id(check, "SignatureTimeStamp", ts.id.as_deref(), &mut expected, report);
    }
    collect_refs_ids(check, signature, &mut expected, report);

    for ts in timestamps {
        let label = timestamp_label("SigAndRefsTimeStamp", ts);
        check_exact_includes(check, &label, ts, &expected, report);
    }
}

pub(crate) fn check_refs_only_timestamp_includes(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::RefsOnlyTimestampIncludes;
    let signature = input.signature;
    let timestamps = signature.refs_only_timestamps();
    if timestamps.is_empty() {
        return;
    }

    let mut expected = BTreeSet::new();
    collect_refs_ids(check, signature, &mut expected, report);
    for ts in timestamps {
        let label = timestamp_label("RefsOnlyTimeStamp", ts);
        check_exact_includes(check, &label, ts, &expected, report);
    }
}

fn collect_refs_ids<'a>(
    check: StructuralCheck,
    signature: &'a XadesSignature,
    expected: &mut BTreeSet<&'a str>,
    report: &mut StructuralReport,
) {
    match signature.complete_certificate_refs() {
        Some(refs) => {
            require_id(check, "CompleteCertificateRefs", refs.id.as_deref(), expected, report)
        },
        None => report.add_failure(StructuralFailure::new(check, "CompleteCertificateRefs missing")),
    }
    match signature.complete_revocation_refs() {
        Some(refs) => {
            require_id(check, "CompleteRevocationRefs", refs.id.as_deref(), expected, report)
        },
        None => report.add_failure(StructuralFailure::new(check, "CompleteRevocationRefs missing")),
    }
}

pub(crate) fn check_archive_timestamp_includes(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    let check = StructuralCheck::ArchiveTimestampIncludes;
    let signature = input.signature;
    for (position, ts) in signature.archive_timestamps() {
        if ts.includes.is_empty() {
            continue;
        }
        let label = timestamp_label("ArchiveTimeStamp", ts);

        let mut expected: BTreeSet<&str> = reference_ids(signature).into_iter().collect();
        expected.extend(signature.signed_info.id.as_deref());
        expected.extend(signature.signature_value.id.as_deref());
        expected.extend(signature.key_info.as_ref().and_then(|k| k.id.as_deref()));
        expected.extend(
            signature
                .unsigned()
                .iter()
                .take(position)
                .filter_map(|p| p.id()),
        );

        let included: BTreeSet<&str> = ts.included_ids().collect();
        let missing: Vec<&str> = expected.difference(&included).copied().collect();
        if !missing.is_empty() {
            report.add_failure(
                StructuralFailure::new(check, format!("does not include {}", missing.join(", ")))
                    .with_location(&label),
            );
        }
    }
}

pub(crate) fn check_certificate_values_match_refs(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    if input.signature.certificate_values().is_none() {
        return;
    }
    for r in input.signature.unmatched_certificate_refs(input.crypto) {
        report.add_failure(
            StructuralFailure::new(
                StructuralCheck::CertificateValuesMatchRefs,
                format!("no certificate value for {} / {}", r.issuer, r.serial),
            )
            .with_location("CertificateValues"),
        );
    }
}

pub(crate) fn check_revocation_values_match_refs(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    if input.signature.revocation_values().is_none() {
        return;
    }
    let check = StructuralCheck::RevocationValuesMatchRefs;
    let (crl_refs, ocsp_refs) = input.signature.unmatched_revocation_refs(input.crypto);
    for r in crl_refs {
        let issuer = r
            .issuer
            .as_ref()
            .map_or_else(|| "unknown issuer".to_string(), |i| i.to_string());
        report.add_failure(
            StructuralFailure::new(check, format!("no CRL value for CRLRef of {}", issuer))
                .with_location("RevocationValues"),
        );
    }
    for r in ocsp_refs {
        report.add_failure(
            StructuralFailure::new(
                check,
                format!("no OCSP value for OCSPRef produced at {}", r.produced_at.to_rfc3339()),
            )
            .with_location("RevocationValues"),
        );
    }
}

pub(crate) fn check_counter_signature_references(
    input: &CheckInput<'_>,
    report: &mut StructuralReport,
) {
    check_counter_signatures_of(input.signature, report);
}

fn check_counter_signatures_of(parent: &XadesSignature, report: &mut StructuralReport) {
    let check = StructuralCheck::CounterSignatureReferences;
    for counter in parent.counter_signatures() {
        let counter_signature = &counter.signature;
        let label = match &counter_signature.id {
            Some(id) => format!("CounterSignature '{}'", id),
            None => "CounterSignature".to_string(),
        };
        match parent.signature_value.id.as_deref() {
            None => report.add_failure(
                StructuralFailure::new(check, "parent SignatureValue has no Id").with_location(&label),
            ),
            Some(parent_id) => {
                let references_parent = counter_signature.references.iter().any(|r| {
                    r.target_id() == Some(parent_id)
                        && r
                            .reference_type
                            .as_deref()
                            .map_or(true, |t| t == COUNTERSIGNED_SIGNATURE_TYPE)
                });
                if !references_parent {
                    report.add_failure(
                        StructuralFailure::new(
                            check,
                            format!("no Reference to parent SignatureValue '{}'", parent_id),
                        )
                        .with_location(&label),
                    );
                }
            },
        }
        check_counter_signatures_of(counter_signature, report);
    }
}

pub(crate) fn check_unique_identifiers(input: &CheckInput<'_>, report: &mut StructuralReport) {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    for id in input.signature.element_ids() {
        if !seen.insert(id) && reported.insert(id) {
            report.add_failure(StructuralFailure::new(
                StructuralCheck::UniqueIdentifiers,
                format!("Id '{}' is used more than once", id),
            ));
        }
    }
}
