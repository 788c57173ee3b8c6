//! XAdES signature object model.
//!
//! The model is produced by an XML binding layer outside this crate. It exposes
//! the references, qualifying properties, timestamps and certificate/revocation
//! collections that the level pipeline and the structural checker consume.

mod model;
mod refs;

pub use model::{
    fragment, CertificateValues, CommitmentTypeIndication, CompleteCertificateRefs,
    CompleteRevocationRefs, CounterSignature, DataObjectFormat, KeyInfo, Reference,
    RevocationValues, SignaturePolicy, SignatureValue, SignedInfo, SignedProperties, SignerRole,
    UnsignedProperties, UnsignedProperty, XadesSignature, XadesTimestamp,
    COUNTERSIGNED_SIGNATURE_TYPE, SIGNED_PROPERTIES_TYPE,
};
pub use refs::{CertRef, CrlRef, OcspRef};
