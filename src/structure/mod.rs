//! Structural consistency of the XAdES property graph.
//!
//! Eighteen independent checks cross-validate references, includes and values
//! inside one signature. A [`StructuralChecks`] mask selects which ones run.
//!
//! ## Example
//!
//! ```ignore
//! use xades_oxide::structure::{StructuralChecker, StructuralChecks};
//!
//! let checker = StructuralChecker::new(
//!     StructuralChecks::SIG_AND_REFS_TIMESTAMP_INCLUDES | StructuralChecks::UNIQUE_IDENTIFIERS,
//! );
//! let report = checker.check(&signature, &crypto);
//! for failure in &report.failures {
//!     println!("{}", failure);
//! }
//! ```

mod checker;
mod checks;
mod types;

pub use checker::StructuralChecker;
pub use types::{StructuralCheck, StructuralChecks, StructuralFailure, StructuralReport};
