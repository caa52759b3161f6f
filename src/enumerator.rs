//! Exact enumeration of every execution path of a resolved program.
//!
//! Each `flip` splits the current path in two: `false` with weight `1 - p` and
//! `true` with weight `p`. Every path runs to the end of the program, even when
//! an `observe` has rejected it, and produces one [`Trace`].

use std::fmt;

use clap::ValueEnum;
use log::{debug, trace};

use crate::error::{InferenceError, InferenceResult};
use crate::evaluator::{eval_expr, Environment};
use crate::syntax::{Ident, Program, Statement};

/// How the path tree is walked. Both strategies produce the same traces in
/// the same order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// Recursion over the statement tree; stack depth grows with the length
    /// of the program.
    #[default]
    Recursive,
    /// An explicit stack of pending paths, for programs too deep to recurse.
    Iterative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnumerationConfig {
    pub strategy: Strategy,
    /// Upper bound on the number of execution paths.
    pub max_paths: Option<usize>,
}

/// One complete execution path.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub environment: Environment,
    pub weight: f64,
    /// Value of the return expression.
    pub value: bool,
    pub rejected: bool,
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "weight={:.6} return={} {}",
            self.weight, self.value, self.environment
        )?;
        if self.rejected {
            write!(f, " (rejected)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PathState {
    env: Environment,
    weight: f64,
    rejected: bool,
    /// Value of the last assertion, checked by the enclosing `observe`.
    verdict: Option<bool>,
}

impl PathState {
    fn initial() -> Self {
        Self {
            env: Environment::new(),
            weight: 1.0,
            rejected: false,
            verdict: None,
        }
    }

    fn choose(&self, id: &Ident, value: bool, factor: f64) -> Self {
        Self {
            env: self.env.with(id, value),
            weight: self.weight * factor,
            rejected: self.rejected,
            verdict: None,
        }
    }

    fn observed(mut self) -> Self {
        if self.verdict == Some(false) {
            self.rejected = true;
        }
        self.verdict = None;
        self
    }
}

struct PathBudget {
    paths: usize,
    limit: Option<usize>,
}

impl PathBudget {
    fn new(limit: Option<usize>) -> Self {
        Self { paths: 1, limit }
    }

    fn split(&mut self) -> InferenceResult<()> {
        self.paths += 1;
        match self.limit {
            Some(limit) if self.paths > limit => Err(InferenceError::PathLimitExceeded { limit }),
            _ => Ok(()),
        }
    }
}

/// Resolves `id ~ flip p` on `state`. The `false` side comes first; a side
/// with probability zero is dropped.
fn branch(
    state: &PathState,
    id: &Ident,
    p: f64,
    budget: &mut PathBudget,
) -> InferenceResult<(PathState, Option<PathState>)> {
    if !(0.0..=1.0).contains(&p) {
        return Err(InferenceError::InvalidProbability {
            name: id.clone(),
            probability: p,
        });
    }
    if p == 0.0 {
        return Ok((state.choose(id, false, 1.0), None));
    }
    if p == 1.0 {
        return Ok((state.choose(id, true, 1.0), None));
    }
    budget.split()?;
    Ok((
        state.choose(id, false, 1.0 - p),
        Some(state.choose(id, true, p)),
    ))
}

#[derive(Debug, Clone, Copy)]
enum Frame<'p> {
    Exec(&'p Statement),
    /// The rest of a block, run one statement at a time.
    Block(&'p [Statement]),
    EndObserve,
}

pub struct Enumerator<'p> {
    program: &'p Program,
    config: EnumerationConfig,
}

impl<'p> Enumerator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self::with_config(program, EnumerationConfig::default())
    }

    pub fn with_config(program: &'p Program, config: EnumerationConfig) -> Self {
        Self { program, config }
    }

    /// All traces of the program. The program must already be resolved; a
    /// remaining `do` fails with [`InferenceError::DoOutsideObserve`].
    pub fn traces(&self) -> InferenceResult<Vec<Trace>> {
        let mut budget = PathBudget::new(self.config.max_paths);
        let traces = match self.config.strategy {
            Strategy::Recursive => self
                .exec(&self.program.body, PathState::initial(), &mut budget)?
                .into_iter()
                .map(|state| self.finish(state))
                .collect::<InferenceResult<Vec<_>>>()?,
            Strategy::Iterative => self.run_iterative(&mut budget)?,
        };
        debug!(
            "enumerated {} trace(s) with the {:?} strategy",
            traces.len(),
            self.config.strategy
        );
        Ok(traces)
    }

    fn finish(&self, state: PathState) -> InferenceResult<Trace> {
        let value = eval_expr(&self.program.ret, &state.env)?;
        let trace = Trace {
            environment: state.env,
            weight: state.weight,
            value,
            rejected: state.rejected,
        };
        trace!("{trace}");
        Ok(trace)
    }

    fn exec(
        &self,
        stmnt: &Statement,
        mut state: PathState,
        budget: &mut PathBudget,
    ) -> InferenceResult<Vec<PathState>> {
        match stmnt {
            Statement::Assign(id, expr) => {
                let value = eval_expr(expr, &state.env)?;
                state.env.bind(id, value);
                state.verdict = None;
                Ok(vec![state])
            }
            Statement::Flip(id, p) => {
                let (first, second) = branch(&state, id, *p, budget)?;
                Ok(std::iter::once(first).chain(second).collect())
            }
            Statement::Observe(inner) => {
                state.verdict = None;
                let states = self.exec(inner, state, budget)?;
                Ok(states.into_iter().map(PathState::observed).collect())
            }
            Statement::Sequence(stmts) => self.exec_block(stmts, state, budget),
            Statement::IfThenElse(guard, then_s, else_s) => {
                if eval_expr(guard, &state.env)? {
                    self.exec(then_s, state, budget)
                } else {
                    self.exec(else_s, state, budget)
                }
            }
            Statement::Assert(expr) => {
                state.verdict = Some(eval_expr(expr, &state.env)?);
                Ok(vec![state])
            }
            Statement::Skip => Ok(vec![state]),
            Statement::Do { .. } => Err(InferenceError::DoOutsideObserve),
        }
    }

    fn exec_block(
        &self,
        stmts: &[Statement],
        state: PathState,
        budget: &mut PathBudget,
    ) -> InferenceResult<Vec<PathState>> {
        let Some((first, rest)) = stmts.split_first() else {
            return Ok(vec![state]);
        };
        let mut states = Vec::new();
        for state in self.exec(first, state, budget)? {
            states.extend(self.exec_block(rest, state, budget)?);
        }
        Ok(states)
    }

    fn run_iterative(&self, budget: &mut PathBudget) -> InferenceResult<Vec<Trace>> {
        let mut traces = Vec::new();
        // Paths still to run, each with its own continuation (innermost frame last)
        let mut pending = vec![(PathState::initial(), vec![Frame::Exec(&self.program.body)])];

        while let Some((mut state, mut frames)) = pending.pop() {
            while let Some(frame) = frames.pop() {
                let stmnt = match frame {
                    Frame::EndObserve => {
                        state = state.observed();
                        continue;
                    }
                    Frame::Block([]) => continue,
                    Frame::Block([first, rest @ ..]) => {
                        frames.push(Frame::Block(rest));
                        first
                    }
                    Frame::Exec(stmnt) => stmnt,
                };
                match stmnt {
                    Statement::Assign(id, expr) => {
                        let value = eval_expr(expr, &state.env)?;
                        state.env.bind(id, value);
                        state.verdict = None;
                    }
                    Statement::Flip(id, p) => {
                        let (first, second) = branch(&state, id, *p, budget)?;
                        if let Some(second) = second {
                            pending.push((second, frames.clone()));
                        }
                        state = first;
                    }
                    Statement::Observe(inner) => {
                        state.verdict = None;
                        frames.push(Frame::EndObserve);
                        frames.push(Frame::Exec(inner));
                    }
                    Statement::Sequence(stmts) => frames.push(Frame::Block(stmts)),
                    Statement::IfThenElse(guard, then_s, else_s) => {
                        let next = if eval_expr(guard, &state.env)? {
                            then_s
                        } else {
                            else_s
                        };
                        frames.push(Frame::Exec(next));
                    }
                    Statement::Assert(expr) => {
                        state.verdict = Some(eval_expr(expr, &state.env)?);
                    }
                    Statement::Skip => {}
                    Statement::Do { .. } => return Err(InferenceError::DoOutsideObserve),
                }
            }
            traces.push(self.finish(state)?);
        }
        Ok(traces)
    }
}

/// All traces of `program` with the default configuration.
pub fn enumerate(program: &Program) -> InferenceResult<Vec<Trace>> {
    Enumerator::new(program).traces()
}
