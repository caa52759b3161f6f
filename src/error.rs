//! Error types for parsing and inference.

use std::path::PathBuf;

use thiserror::Error;

use crate::parser::Rule;
use crate::syntax::Ident;

pub type InferenceResult<T> = std::result::Result<T, InferenceError>;

/// Malformed program text, with pest's line/column report.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ParseError(#[from] Box<pest::error::Error<Rule>>);

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        ParseError(Box::new(err))
    }
}

/// Errors raised while resolving or enumerating a parsed program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    /// A `do(...)` that no `observe` encloses.
    #[error("do operator must be inside an observe statement")]
    DoOutsideObserve,

    /// A `do(...)` whose target neither flips nor assigns a variable.
    #[error("do operator must wrap a flip or an assignment, found `{0}`")]
    InvalidIntervention(String),

    #[error("unbound variable `{0}`")]
    UnboundVariable(Ident),

    #[error("flip probability {probability} for `{name}` is outside [0, 1]")]
    InvalidProbability { name: Ident, probability: f64 },

    /// Every trace was rejected, so the conditional probability is undefined.
    #[error("all execution paths were rejected by observe statements")]
    DegenerateAggregation,

    #[error("enumeration exceeded the limit of {limit} execution paths")]
    PathLimitExceeded { limit: usize },

    #[error("unsupported inference method `{0}` (expected `enumerate`)")]
    UnsupportedInferenceMethod(String),
}

/// Everything that can stop a run, from reading the file to the final division.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Parser Error:\n{0}")]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("Cannot open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
