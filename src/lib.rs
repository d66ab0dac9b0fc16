//! Runtime type-guard generation with a combinatorial test oracle.
//!
//! Pipeline: `lower` (batch JSON → [`ir::TypeNode`]) → `codegen` (predicate IR)
//! and `oracle` (valid / invalid samples) → `eval` (run samples through the
//! predicates). `batch` wires these together for a whole input document.
pub mod batch;
pub mod codegen;
pub mod error;
pub mod eval;
pub mod ir;
pub mod lower;
pub mod namer;
pub mod oracle;

pub use error::{ErrorClass, GenError, GenResult, RootError};
