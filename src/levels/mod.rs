//! Signature maturity levels.
//!
//! The pipeline evaluates XAdES-BES, -EPES, -T, -C, -X, -XL and -A over a
//! signature and the [`ValidationContext`](crate::context::ValidationContext) of
//! its signing certificate, producing one [`CheckResult`] tree per level plus the
//! cross-level consistency rules:
//!
//! - XAdES-C present implies XAdES-T present
//! - XAdES-XL present implies XAdES-X present
//!
//! Consistency rules are reported on their own and never folded into C or XL.

mod pipeline;
mod timestamps;
mod types;

pub use pipeline::{LevelPipeline, LevelReport};
pub use timestamps::TimestampVerifier;
pub use types::{
    CheckResult, Indication, LevelConsistency, LevelResults, ReasonCode, SignatureLevel,
};
