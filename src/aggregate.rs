//! Reduction of a trace set to the conditional probability of the return
//! expression.

use crate::enumerator::Trace;
use crate::error::{InferenceError, InferenceResult};

/// Weight totals over a trace set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub accepted: usize,
    pub rejected: usize,
    /// Weight of accepted traces returning `true`.
    pub numerator: f64,
    /// Weight of all accepted traces.
    pub denominator: f64,
}

impl Summary {
    pub fn of(traces: &[Trace]) -> Self {
        traces.iter().fold(Self::default(), |mut summary, trace| {
            if trace.rejected {
                summary.rejected += 1;
            } else {
                summary.accepted += 1;
                summary.denominator += trace.weight;
                if trace.value {
                    summary.numerator += trace.weight;
                }
            }
            summary
        })
    }

    /// `numerator / denominator`, or [`InferenceError::DegenerateAggregation`]
    /// when no accepted weight is left to divide by.
    pub fn probability(&self) -> InferenceResult<f64> {
        if self.accepted == 0 || self.denominator <= 0.0 {
            return Err(InferenceError::DegenerateAggregation);
        }
        // Rounding can push the ratio a hair above one
        Ok((self.numerator / self.denominator).min(1.0))
    }
}

pub fn aggregate(traces: &[Trace]) -> InferenceResult<f64> {
    Summary::of(traces).probability()
}
