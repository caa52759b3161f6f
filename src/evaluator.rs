use std::collections::BTreeMap;
use std::fmt;

use crate::error::{InferenceError::*, InferenceResult};
use crate::syntax::{Expr, Ident};

/// Variable bindings of one execution path.
///
/// Paths never share an environment: a branching `flip` clones it, so a
/// binding made on one side is invisible to the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    vars: BTreeMap<Ident, bool>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<bool> {
        self.vars.get(id).copied()
    }

    pub fn bind(&mut self, id: &Ident, value: bool) {
        self.vars.insert(id.clone(), value);
    }

    /// A copy of `self` with `id` bound to `value`.
    pub fn with(&self, id: &Ident, value: bool) -> Self {
        let mut env = self.clone();
        env.bind(id, value);
        env
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Ident, bool)> {
        self.vars.iter().map(|(id, v)| (id, *v))
    }
}

impl FromIterator<(Ident, bool)> for Environment {
    fn from_iter<I: IntoIterator<Item = (Ident, bool)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (id, v)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{id}: {v}")?;
        }
        write!(f, "}}")
    }
}

pub fn eval_expr(expr: &Expr, env: &Environment) -> InferenceResult<bool> {
    match expr {
        Expr::Name(x) => env.get(x).ok_or_else(|| UnboundVariable(x.clone())),
        Expr::Bool(b) => Ok(*b),
        // No short-circuit: an unbound operand is an error either way
        Expr::And(a, b) => {
            let a = eval_expr(a, env)?;
            let b = eval_expr(b, env)?;
            Ok(a && b)
        }
        Expr::Or(a, b) => {
            let a = eval_expr(a, env)?;
            let b = eval_expr(b, env)?;
            Ok(a || b)
        }
        Expr::Not(a) => eval_expr(a, env).map(|a| !a),
    }
}
