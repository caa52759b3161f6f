#![cfg(test)]
use std::sync::Mutex;

use crate::{
    aggregate::Summary,
    enumerator::{EnumerationConfig, Enumerator, Strategy},
    error::InferenceError,
    resolver::resolve,
    syntax::{Expr, Program, Statement},
};
use quickcheck::{Arbitrary, Gen, TestResult};

use lazy_static::lazy_static;

lazy_static! {
    // Names bound on every path reaching the statement being generated
    static ref BOUND: Mutex<Vec<String>> = Mutex::new(Vec::new());
}

const TOLERANCE: f64 = 1e-9;

// Quick Checking for the resolver and the enumerator

impl Expr {
    fn arbitrary_bool(g: &mut Gen, depth: u8) -> Self {
        let leaf = match random_bound(g) {
            Some(id) if bool::arbitrary(g) => Self::Name(id),
            _ => Self::Bool(bool::arbitrary(g)),
        };
        if depth == 0 {
            return leaf;
        }
        match u8::arbitrary(g) % 5 {
            0 => Self::And(
                Box::new(Self::arbitrary_bool(g, depth - 1)),
                Box::new(Self::arbitrary_bool(g, depth - 1)),
            ),
            1 => Self::Or(
                Box::new(Self::arbitrary_bool(g, depth - 1)),
                Box::new(Self::arbitrary_bool(g, depth - 1)),
            ),
            2 => Self::Not(Box::new(Self::arbitrary_bool(g, depth - 1))),
            _ => leaf,
        }
    }
}

impl Arbitrary for Program {
    fn arbitrary(g: &mut Gen) -> Self {
        BOUND.lock().unwrap().clear();
        let mut stmts = vec![Statement::Flip(arbitrary_ident(g), arbitrary_probability(g))];
        // Ensure we have a program of big enough size
        while stmts.iter().map(Statement::size).sum::<usize>() < g.size() {
            stmts.push(Statement::generate_stmnts(g, 2));
        }
        let ret = Expr::arbitrary_bool(g, 2);
        Program::new(Statement::sequence(stmts), ret)
    }
}

impl Statement {
    fn generate_stmnts(g: &mut Gen, depth: u8) -> Statement {
        match u8::arbitrary(g) % 100 + 1 {
            1..=30 => {
                let p = arbitrary_probability(g);
                Self::Flip(arbitrary_ident(g), p)
            }
            31..=50 => {
                let expr = Expr::arbitrary_bool(g, 2);
                Self::Assign(arbitrary_ident(g), expr)
            }
            51..=70 if depth > 0 => {
                let bound = clone_bound();
                let guard = Expr::arbitrary_bool(g, 1);
                let then_s = Self::generate_stmnts(g, depth - 1);
                restore_bound(&bound);
                let else_s = Self::generate_stmnts(g, depth - 1);
                restore_bound(&bound);
                Self::IfThenElse(guard, Box::new(then_s), Box::new(else_s))
            }
            71..=85 => Self::Observe(Box::new(Self::Assert(Expr::arbitrary_bool(g, 2)))),
            // Interventions only force constants, so moving them earlier
            // in the program never reads an unbound name
            86..=95 => match random_bound(g) {
                Some(id) => {
                    let target = if bool::arbitrary(g) {
                        Self::Flip(id, arbitrary_probability(g))
                    } else {
                        Self::Assign(id, Expr::Bool(bool::arbitrary(g)))
                    };
                    Self::Observe(Box::new(Self::intervene(target)))
                }
                None => Self::Skip,
            },
            _ => Self::Skip,
        }
    }

    // Size of a statement is the number of statements in the sequence
    fn size(&self) -> usize {
        match self {
            Self::Sequence(stmts) => stmts.iter().map(Self::size).sum(),
            Self::IfThenElse(_, then_s, else_s) => then_s.size() + else_s.size(),
            Self::Observe(inner) => inner.size(),
            _ => 1,
        }
    }
}

fn clone_bound() -> Vec<String> {
    BOUND.lock().unwrap().clone()
}

// Names bound in only one branch of an `if` must not be read afterwards
fn restore_bound(bound: &[String]) {
    *BOUND.lock().unwrap() = bound.to_vec();
}

// Reuses a bound name half of the time
fn arbitrary_ident(g: &mut Gen) -> String {
    if bool::arbitrary(g) {
        if let Some(id) = random_bound(g) {
            return id;
        }
    }
    let mut bound = BOUND.lock().unwrap();
    let id = format!("v{}", bound.len());
    if !bound.contains(&id) {
        bound.push(id.clone());
    }
    id
}

fn random_bound(g: &mut Gen) -> Option<String> {
    g.choose(&BOUND.lock().unwrap()).cloned()
}

// Strictly between zero and one, so every flip branches
fn arbitrary_probability(g: &mut Gen) -> f64 {
    f64::from(u8::arbitrary(g) % 9 + 1) / 10.0
}

fn config(strategy: Strategy) -> EnumerationConfig {
    EnumerationConfig {
        strategy,
        max_paths: None,
    }
}

/// Ensures the traces of every path together carry all of the probability mass
pub fn check_weights_sum_to_one(program: Program) -> TestResult {
    let resolved = resolve(&program).unwrap();
    let traces = match Enumerator::new(&resolved).traces() {
        Ok(traces) => traces,
        Err(e) => {
            println!("{:?} enumeration error on {}\n", e, program);
            return TestResult::failed();
        }
    };
    let total: f64 = traces.iter().map(|t| t.weight).sum();
    let in_range = traces.iter().all(|t| t.weight > 0.0 && t.weight <= 1.0);
    TestResult::from_bool(in_range && (total - 1.0).abs() < TOLERANCE)
}

/// Ensures the recursive and the stack-based walks produce the same traces
pub fn check_strategies_agree(program: Program) -> TestResult {
    let resolved = resolve(&program).unwrap();
    let recursive = Enumerator::with_config(&resolved, config(Strategy::Recursive)).traces();
    let iterative = Enumerator::with_config(&resolved, config(Strategy::Iterative)).traces();
    if recursive != iterative {
        println!("strategies disagree on {}\n", program);
        return TestResult::failed();
    }
    TestResult::passed()
}

/// Ensures the result is a probability whenever some path is accepted
pub fn check_probability_in_unit_interval(program: Program) -> TestResult {
    let resolved = resolve(&program).unwrap();
    let traces = Enumerator::new(&resolved).traces().unwrap();
    match Summary::of(&traces).probability() {
        Ok(p) => TestResult::from_bool((0.0..=1.0).contains(&p)),
        Err(InferenceError::DegenerateAggregation) => TestResult::discard(),
        Err(_) => TestResult::failed(),
    }
}

/// Ensures resolution removes every `do` and leaves resolved programs alone
pub fn check_resolve_idempotent(program: Program) -> TestResult {
    let once = resolve(&program).unwrap();
    let twice = resolve(&once).unwrap();
    TestResult::from_bool(!once.body.contains_do() && once == twice)
}

/// Ensures a `do` outside every `observe` is always rejected
pub fn check_do_outside_observe(program: Program) -> TestResult {
    let stray = Statement::intervene(Statement::Assign("stray".into(), Expr::Bool(true)));
    let program = Program::new(
        Statement::Sequence(vec![program.body, stray]),
        program.ret,
    );
    TestResult::from_bool(resolve(&program) == Err(InferenceError::DoOutsideObserve))
}

#[test]
fn quick_check() {
    quickcheck::QuickCheck::new()
        .tests(300)
        .gen(Gen::new(8))
        .quickcheck(check_weights_sum_to_one as fn(Program) -> TestResult);

    quickcheck::QuickCheck::new()
        .tests(300)
        .gen(Gen::new(8))
        .quickcheck(check_strategies_agree as fn(Program) -> TestResult);

    quickcheck::QuickCheck::new()
        .tests(300)
        .max_tests(3000)
        .gen(Gen::new(8))
        .quickcheck(check_probability_in_unit_interval as fn(Program) -> TestResult);

    quickcheck::QuickCheck::new()
        .tests(300)
        .gen(Gen::new(8))
        .quickcheck(check_resolve_idempotent as fn(Program) -> TestResult);

    quickcheck::QuickCheck::new()
        .tests(100)
        .gen(Gen::new(8))
        .quickcheck(check_do_outside_observe as fn(Program) -> TestResult);
}
