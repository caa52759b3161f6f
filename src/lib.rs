//! Exact inference for SimPPL, a tiny probabilistic imperative language with
//! boolean variables, weighted coin flips, conditioning and `do` interventions.
//!
//! Inference runs in three steps:
//! 1. [`resolver::resolve`] applies the `do(...)` interventions,
//! 2. [`enumerator::Enumerator`] walks every path through every `flip`,
//! 3. [`aggregate::aggregate`] divides the weight of accepted paths returning
//!    `true` by the weight of all accepted paths.
//!
//! ```
//! let p = simppl::infer_source(
//!     "a ~ flip 0.5; b ~ flip 0.5; observe (|| a b); return a",
//!     &simppl::EnumerationConfig::default(),
//! )
//! .unwrap();
//! assert!((p - 2.0 / 3.0).abs() < 1e-12);
//! ```

use std::path::Path;
use std::str::FromStr;

use log::debug;
use wasm_bindgen::prelude::*;

pub mod aggregate;
pub mod enumerator;
pub mod error;
pub mod evaluator;
pub mod parser;
pub mod resolver;
pub mod syntax;
mod test;

pub use aggregate::{aggregate, Summary};
pub use enumerator::{enumerate, EnumerationConfig, Enumerator, Strategy, Trace};
pub use error::{Error, InferenceError, InferenceResult, ParseError};
pub use parser::parse;
pub use resolver::resolve;
pub use syntax::{Expr, Program, Statement};

/// The inference algorithms a caller can select by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InferenceMethod {
    Enumerate,
}

impl FromStr for InferenceMethod {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enumerate" => Ok(InferenceMethod::Enumerate),
            _ => Err(InferenceError::UnsupportedInferenceMethod(s.to_owned())),
        }
    }
}

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub traces: Vec<Trace>,
    pub summary: Summary,
}

impl Inference {
    pub fn probability(&self) -> InferenceResult<f64> {
        self.summary.probability()
    }
}

/// Resolves and enumerates `program`, keeping the traces.
pub fn run(
    method: InferenceMethod,
    program: &Program,
    config: &EnumerationConfig,
) -> InferenceResult<Inference> {
    match method {
        InferenceMethod::Enumerate => {
            let resolved = resolve(program)?;
            debug!("resolved program: {resolved}");
            let traces = Enumerator::with_config(&resolved, *config).traces()?;
            let summary = Summary::of(&traces);
            debug!(
                "{} accepted and {} rejected trace(s)",
                summary.accepted, summary.rejected
            );
            Ok(Inference { traces, summary })
        }
    }
}

/// Probability that the return expression of `program` is true, given every
/// `observe` holds.
pub fn infer(program: &Program, config: &EnumerationConfig) -> InferenceResult<f64> {
    run(InferenceMethod::Enumerate, program, config)?.probability()
}

pub fn infer_source(source: &str, config: &EnumerationConfig) -> Result<f64, Error> {
    let program = parse(source)?;
    Ok(infer(&program, config)?)
}

pub fn read_program(path: &Path) -> Result<Program, Error> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(parse(&source)?)
}

#[wasm_bindgen]
pub fn enumerate_source(source: &str) -> Result<f64, JsError> {
    infer_source(source, &EnumerationConfig::default()).map_err(|e| JsError::new(&e.to_string()))
}
