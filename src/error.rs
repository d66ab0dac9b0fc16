//! Error taxonomy shared by lowering, codegen and the oracle.
//!
//! Every variant is fail-fast for the root type being processed; whether the
//! rest of a batch continues is the driver's call (see `batch`).
use thiserror::Error;

/// Which family an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The input batch is wrong in a way the user can fix.
    Input,
    /// The type uses a shape the generator deliberately does not support.
    Unsupported,
    /// A malformed type model or a defect in this crate.
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenError {
    // ---- input ----
    #[error("`{name}` referenced at {context} has no generated predicate; known: [{}]", known.join(", "))]
    UnknownAlias {
        name: String,
        context: String,
        known: Vec<String>,
    },
    #[error("root type at {context} has no alias name")]
    MissingRootAlias { context: String },
    #[error("alias `{name}` is already defined by an earlier root in this batch")]
    DuplicateRootAlias { name: String },
    #[error("alias cycle while expanding samples: {}", cycle.join(" -> "))]
    RecursiveAlias { cycle: Vec<String> },

    // ---- unsupported ----
    #[error("unsupported union member(s) at {context}: {}", members.join(", "))]
    UnsupportedUnionMember { context: String, members: Vec<String> },
    #[error("enum-like type at {context} has no members")]
    EmptyEnum { context: String },
    #[error("unsupported primitive kind `{kind}` at {context}")]
    UnsupportedPrimitive { kind: String, context: String },
    #[error("unsupported literal at {context}: {value}")]
    UnsupportedLiteral { context: String, value: String },

    // ---- internal ----
    #[error("attribute `{attribute}` at `{path}` was registered twice")]
    DuplicateAttribute { path: String, attribute: String },
    #[error("nested union directly inside a union at {context}")]
    NestedUnion { context: String },
    #[error("union at {context} has {count} member(s); at least two are required")]
    DegenerateUnion { context: String, count: usize },
    #[error("type nesting deeper than {limit} at {context}")]
    DepthExceeded { limit: usize, context: String },
    #[error("no free name for `{proposed}` after {attempts} attempts")]
    NamesExhausted { proposed: String, attempts: usize },
}

impl GenError {
    pub fn class(&self) -> ErrorClass {
        match self {
            GenError::UnknownAlias { .. }
            | GenError::MissingRootAlias { .. }
            | GenError::DuplicateRootAlias { .. }
            | GenError::RecursiveAlias { .. } => ErrorClass::Input,
            GenError::UnsupportedUnionMember { .. }
            | GenError::EmptyEnum { .. }
            | GenError::UnsupportedPrimitive { .. }
            | GenError::UnsupportedLiteral { .. } => ErrorClass::Unsupported,
            GenError::DuplicateAttribute { .. }
            | GenError::NestedUnion { .. }
            | GenError::DegenerateUnion { .. }
            | GenError::DepthExceeded { .. }
            | GenError::NamesExhausted { .. } => ErrorClass::Internal,
        }
    }
}

pub type GenResult<T> = Result<T, GenError>;

/// A failure attributed to one root of a batch.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("root `{root}`: {source}")]
pub struct RootError {
    pub root: String,
    #[source]
    pub source: GenError,
}
