//! Digest and signature primitives.
//!
//! Validation never calls a hash function or a signature scheme directly; it goes
//! through a [`CryptoProvider`]. [`RsaCryptoProvider`] is the default implementation,
//! backed by the RustCrypto `sha1`, `sha2` and `rsa` crates.

use crate::tokens::Certificate;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Digest algorithm used by references, timestamps and revocation refs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-1 (deprecated, but still common in legacy signatures)
    Sha1,
    /// SHA-256 (recommended)
    #[default]
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl DigestAlgorithm {
    /// Get the dotted OID for this digest algorithm.
    pub fn oid(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "1.3.14.3.2.26",
            DigestAlgorithm::Sha256 => "2.16.840.1.101.3.4.2.1",
            DigestAlgorithm::Sha384 => "2.16.840.1.101.3.4.2.2",
            DigestAlgorithm::Sha512 => "2.16.840.1.101.3.4.2.3",
        }
    }

    /// Get the XML-DSig algorithm URI.
    pub fn uri(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "http://www.w3.org/2000/09/xmldsig#sha1",
            DigestAlgorithm::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            DigestAlgorithm::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            DigestAlgorithm::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Get the name of this algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Resolve an XML-DSig digest method URI.
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri.trim() {
            "http://www.w3.org/2000/09/xmldsig#sha1" => Some(DigestAlgorithm::Sha1),
            "http://www.w3.org/2001/04/xmlenc#sha256" => Some(DigestAlgorithm::Sha256),
            "http://www.w3.org/2001/04/xmldsig-more#sha384" => Some(DigestAlgorithm::Sha384),
            "http://www.w3.org/2001/04/xmlenc#sha512" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }

    /// Resolve a dotted digest algorithm OID (as found in timestamp message imprints).
    pub fn from_oid(oid: &str) -> Option<Self> {
        match oid.trim() {
            "1.3.14.3.2.26" => Some(DigestAlgorithm::Sha1),
            "2.16.840.1.101.3.4.2.1" => Some(DigestAlgorithm::Sha256),
            "2.16.840.1.101.3.4.2.2" => Some(DigestAlgorithm::Sha384),
            "2.16.840.1.101.3.4.2.3" => Some(DigestAlgorithm::Sha512),
            _ => None,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Signature algorithm of a certificate, CRL, OCSP response or timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// sha1WithRSAEncryption
    RsaSha1,
    /// sha256WithRSAEncryption
    RsaSha256,
    /// sha384WithRSAEncryption
    RsaSha384,
    /// sha512WithRSAEncryption
    RsaSha512,
    /// Any other algorithm, kept by OID or URI
    Other(String),
}

impl SignatureAlgorithm {
    /// Resolve a dotted signature algorithm OID.
    pub fn from_oid(oid: &str) -> Self {
        match oid.trim() {
            "1.2.840.113549.1.1.5" => SignatureAlgorithm::RsaSha1,
            "1.2.840.113549.1.1.11" => SignatureAlgorithm::RsaSha256,
            "1.2.840.113549.1.1.12" => SignatureAlgorithm::RsaSha384,
            "1.2.840.113549.1.1.13" => SignatureAlgorithm::RsaSha512,
            other => SignatureAlgorithm::Other(other.to_string()),
        }
    }

    /// Resolve an XML-DSig signature method URI.
    pub fn from_uri(uri: &str) -> Self {
        match uri.trim() {
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1" => SignatureAlgorithm::RsaSha1,
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => SignatureAlgorithm::RsaSha256,
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384" => SignatureAlgorithm::RsaSha384,
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512" => SignatureAlgorithm::RsaSha512,
            other => SignatureAlgorithm::Other(other.to_string()),
        }
    }

    /// Digest algorithm used by this signature scheme, if known.
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        match self {
            SignatureAlgorithm::RsaSha1 => Some(DigestAlgorithm::Sha1),
            SignatureAlgorithm::RsaSha256 => Some(DigestAlgorithm::Sha256),
            SignatureAlgorithm::RsaSha384 => Some(DigestAlgorithm::Sha384),
            SignatureAlgorithm::RsaSha512 => Some(DigestAlgorithm::Sha512),
            SignatureAlgorithm::Other(_) => None,
        }
    }
}

/// Compute a digest with the RustCrypto hash implementations.
pub fn compute_digest(algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        DigestAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

/// Cryptographic primitives consumed by the validation engine.
pub trait CryptoProvider {
    /// Digest `data` with `algorithm`.
    fn digest(&self, algorithm: DigestAlgorithm, data: &[u8]) -> Vec<u8> {
        compute_digest(algorithm, data)
    }

    /// Verify `signature` over `signed_data` with the public key of `signer`.
    fn verify_signature(
        &self,
        signer: &Certificate,
        algorithm: &SignatureAlgorithm,
        signed_data: &[u8],
        signature: &[u8],
    ) -> bool;
}

/// Default provider: SHA-1/SHA-2 digests and RSA PKCS#1 v1.5 signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct RsaCryptoProvider;

impl RsaCryptoProvider {
    /// Create a new provider.
    pub fn new() -> Self {
        Self
    }
}

impl CryptoProvider for RsaCryptoProvider {
    fn verify_signature(
        &self,
        signer: &Certificate,
        algorithm: &SignatureAlgorithm,
        signed_data: &[u8],
        signature: &[u8],
    ) -> bool {
        use rsa::pkcs1v15::{Signature, VerifyingKey};
        use rsa::pkcs8::DecodePublicKey;
        use rsa::signature::Verifier;
        use rsa::RsaPublicKey;

        let public_key = match RsaPublicKey::from_public_key_der(&signer.public_key_der) {
            Ok(key) => key,
            Err(e) => {
                log::debug!("Signer key of '{}' is not an RSA key: {}", signer.subject, e);
                return false;
            },
        };
        let signature = match Signature::try_from(signature) {
            Ok(sig) => sig,
            Err(e) => {
                log::debug!("Malformed RSA signature: {}", e);
                return false;
            },
        };

        let verified = match algorithm {
            SignatureAlgorithm::RsaSha1 => {
                VerifyingKey::<Sha1>::new(public_key).verify(signed_data, &signature)
            },
            SignatureAlgorithm::RsaSha256 => {
                VerifyingKey::<Sha256>::new(public_key).verify(signed_data, &signature)
            },
            SignatureAlgorithm::RsaSha384 => {
                VerifyingKey::<Sha384>::new(public_key).verify(signed_data, &signature)
            },
            SignatureAlgorithm::RsaSha512 => {
                VerifyingKey::<Sha512>::new(public_key).verify(signed_data, &signature)
            },
            SignatureAlgorithm::Other(oid) => {
                log::warn!("Unsupported signature algorithm: {}", oid);
                return false;
            },
        };
        verified.is_ok()
    }
}
