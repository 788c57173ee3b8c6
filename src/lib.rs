// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::enum_variant_names)]
#![allow(clippy::wrong_self_convention)]
#![allow(clippy::unnecessary_map_or)]
#![allow(clippy::match_like_matches_macro)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]
#![cfg_attr(test, allow(unused_variables))]

//! # XAdES Oxide
//!
//! Validation of XAdES advanced electronic signatures: trust-chain and
//! revocation discovery, maturity levels and structural consistency.
//!
//! ## Core Features
//!
//! - **Evidence discovery**: a fixed-point worklist finds every certificate, CRL
//!   and OCSP response needed to trust a signing certificate at a given instant
//! - **Revocation**: OCSP first, CRL as fallback, "no answer" kept distinct from
//!   "unknown"
//! - **Trusted lists**: trusted-list certificates short-circuit revocation checks,
//!   constrained by their service window
//! - **Levels**: XAdES-BES, -EPES, -T, -C, -X, -XL and -A with reasoned
//!   VALID / INVALID / UNDETERMINED results
//! - **Structural checks**: eighteen mask-selected cross-reference checks over the
//!   signature property graph, aggregated or fail-fast
//! - **Reports**: serde-serializable report tree per signature, counter-signatures
//!   included
//!
//! ## Architecture
//!
//! - XML parsing, canonicalization and network fetching stay outside the crate:
//!   the binding layer provides an [`XadesSignature`] and the fetchers implement
//!   [`CertificateSource`], [`CrlSource`] and [`OcspSource`]
//! - Cryptography goes through the [`CryptoProvider`] trait; [`RsaCryptoProvider`]
//!   is the default
//!
//! ## Quick Start
//!
//! ```ignore
//! use xades_oxide::{
//!     CertificateSourceType, ListCertificateSource, SignatureValidator, ValidationConfig,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut trusted = ListCertificateSource::new(CertificateSourceType::TrustedList);
//! trusted.add_trusted(root_certificate, service);
//!
//! let mut validator = SignatureValidator::new(trusted)
//!     .with_config(ValidationConfig::from_file("validation.json")?);
//! let report = validator.validate(&signature, chrono::Utc::now())?;
//!
//! println!("{} / {:?}", report.indication(), report.highest_level);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod crypto;
pub mod error;
pub mod levels;
pub mod report;
pub mod sources;
pub mod status;
pub mod structure;
pub mod tokens;
pub mod validator;
pub mod xades;

pub use config::{IssuerSelection, ValidationConfig};
pub use context::{RevocationData, TokenHandle, ValidationContext, ValidationSources};
pub use crypto::{CryptoProvider, DigestAlgorithm, RsaCryptoProvider, SignatureAlgorithm};
pub use error::{Error, Result};
pub use levels::{CheckResult, Indication, ReasonCode, SignatureLevel};
pub use report::ValidationReport;
pub use sources::{
    CertificateAndContext, CertificateSource, CertificateSourceType, CrlSource,
    ListCertificateSource, ListCrlSource, ListOcspSource, OcspSource, ServiceInfo,
};
pub use status::{CertificateStatus, CertificateStatusVerifier, CertificateValidity};
pub use structure::{StructuralChecker, StructuralChecks};
pub use tokens::{Certificate, Crl, OcspResponse, SignedToken, TimestampToken};
pub use validator::SignatureValidator;
pub use xades::XadesSignature;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
