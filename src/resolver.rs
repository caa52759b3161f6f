//! Intervention resolution: applies every `do(...)` to the program before
//! inference and removes the `do` wrappers.
//!
//! Resolution never mutates its input. It runs in three passes:
//! 1. collect an [`InterventionTable`] from the `do` nodes inside `observe`s,
//! 2. replace every `do` node with `skip`,
//! 3. replace the first matching binding of each intervened variable.

use std::collections::HashSet;

use log::{debug, warn};

use crate::error::{InferenceError, InferenceResult};
use crate::syntax::{Expr, Ident, Program, Statement};

/// One `do(...)`: the binding of `variable` is replaced by `replacement`.
#[derive(Debug, Clone, PartialEq)]
pub struct Intervention {
    pub variable: Ident,
    pub replacement: Statement,
    /// From `do { old } with { new }`: only a binding equal to `old` matches.
    pub pattern: Option<Statement>,
}

impl Intervention {
    fn matches(&self, stmnt: &Statement) -> bool {
        stmnt.binds() == Some(&self.variable)
            && self.pattern.as_ref().map_or(true, |old| old == stmnt)
    }
}

/// Interventions in program order, at most one per variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterventionTable {
    entries: Vec<Intervention>,
}

impl InterventionTable {
    /// Collects the interventions of `body`.
    ///
    /// Fails with [`InferenceError::DoOutsideObserve`] when a `do` is not
    /// nested in an `observe`. When several `do`s name the same variable the
    /// first one in program order wins and the rest are ignored.
    pub fn collect(body: &Statement) -> InferenceResult<Self> {
        let mut table = Self::default();
        // (statement, inside an observe), popped in program order
        let mut stack = vec![(body, false)];
        while let Some((stmnt, in_observe)) = stack.pop() {
            match stmnt {
                Statement::Do { target, pattern } => {
                    if !in_observe {
                        return Err(InferenceError::DoOutsideObserve);
                    }
                    table.insert(stmnt, target, pattern.as_deref())?;
                }
                Statement::Observe(inner) => stack.push((&**inner, true)),
                Statement::Sequence(stmts) => {
                    stack.extend(stmts.iter().rev().map(|s| (s, in_observe)));
                }
                Statement::IfThenElse(_, then_s, else_s) => {
                    stack.push((&**else_s, in_observe));
                    stack.push((&**then_s, in_observe));
                }
                Statement::Assign(..)
                | Statement::Flip(..)
                | Statement::Assert(_)
                | Statement::Skip => {}
            }
        }
        Ok(table)
    }

    fn insert(
        &mut self,
        stmnt: &Statement,
        target: &Statement,
        pattern: Option<&Statement>,
    ) -> InferenceResult<()> {
        let variable = target
            .binds()
            .ok_or_else(|| InferenceError::InvalidIntervention(target.to_string()))?;
        if let Some(old) = pattern {
            if old.binds() != Some(variable) {
                return Err(InferenceError::InvalidIntervention(old.to_string()));
            }
        }
        if self.get(variable).is_some() {
            warn!("ignoring `{stmnt}`: `{variable}` already has an intervention");
            return Ok(());
        }
        self.entries.push(Intervention {
            variable: variable.clone(),
            replacement: target.clone(),
            pattern: pattern.cloned(),
        });
        Ok(())
    }

    pub fn get(&self, variable: &str) -> Option<&Intervention> {
        self.entries.iter().find(|i| i.variable == variable)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intervention> {
        self.entries.iter()
    }

    /// Rewrites the first matching binding of every intervened variable.
    /// Bindings inside `do` nodes are not candidates.
    pub fn apply(&self, stmnt: &Statement) -> Statement {
        let mut applied = HashSet::new();
        let resolved = map_leaves(stmnt, |leaf| match leaf {
            Statement::Assign(id, _) | Statement::Flip(id, _) => match self.get(id) {
                Some(i) if !applied.contains(id) && i.matches(leaf) => {
                    debug!("intervening: `{leaf}` becomes `{}`", i.replacement);
                    applied.insert(id.clone());
                    i.replacement.clone()
                }
                _ => leaf.clone(),
            },
            _ => leaf.clone(),
        });
        for intervention in self.iter() {
            if !applied.contains(&intervention.variable) {
                warn!(
                    "intervention on `{}` matches no binding, dropping it",
                    intervention.variable
                );
            }
        }
        resolved
    }
}

/// Replaces every `do` node with `skip`, keeping the rest of the tree.
pub fn strip_interventions(stmnt: &Statement) -> Statement {
    map_leaves(stmnt, |leaf| match leaf {
        Statement::Do { .. } => Statement::Skip,
        _ => leaf.clone(),
    })
}

enum Task<'a> {
    Visit(&'a Statement),
    BuildObserve,
    BuildSequence(usize),
    BuildIf(&'a Expr),
}

/// Copies `root`, passing every leaf (anything but `observe`, a block or an
/// `if`) through `f` in program order. Uses an explicit stack, so the depth
/// of the tree is not limited by the call stack.
fn map_leaves(root: &Statement, mut f: impl FnMut(&Statement) -> Statement) -> Statement {
    let mut tasks = vec![Task::Visit(root)];
    // Finished subtrees; a build task always finds its children on top
    let mut built: Vec<Statement> = Vec::new();

    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(stmnt) => match stmnt {
                Statement::Observe(inner) => {
                    tasks.push(Task::BuildObserve);
                    tasks.push(Task::Visit(inner));
                }
                Statement::Sequence(stmts) => {
                    tasks.push(Task::BuildSequence(stmts.len()));
                    tasks.extend(stmts.iter().rev().map(Task::Visit));
                }
                Statement::IfThenElse(guard, then_s, else_s) => {
                    tasks.push(Task::BuildIf(guard));
                    tasks.push(Task::Visit(else_s));
                    tasks.push(Task::Visit(then_s));
                }
                _ => built.push(f(stmnt)),
            },
            Task::BuildObserve => {
                let inner = built.pop().unwrap();
                built.push(Statement::Observe(Box::new(inner)));
            }
            Task::BuildSequence(len) => {
                let stmts = built.split_off(built.len() - len);
                built.push(Statement::Sequence(stmts));
            }
            Task::BuildIf(guard) => {
                let else_s = built.pop().unwrap();
                let then_s = built.pop().unwrap();
                built.push(Statement::IfThenElse(
                    guard.clone(),
                    Box::new(then_s),
                    Box::new(else_s),
                ));
            }
        }
    }
    built.pop().unwrap()
}

/// Applies all interventions of `program` and returns a `do`-free copy.
pub fn resolve(program: &Program) -> InferenceResult<Program> {
    let table = InterventionTable::collect(&program.body)?;
    if table.is_empty() {
        return Ok(program.clone());
    }
    debug!("resolving {} intervention(s)", table.len());

    let body = table.apply(&strip_interventions(&program.body));
    if body.contains_do() {
        return Err(InferenceError::DoOutsideObserve);
    }
    Ok(Program::new(body, program.ret.clone()))
}
