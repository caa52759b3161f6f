use pest::{error::ErrorVariant, iterators::Pair, Parser};
use pest_derive::Parser;

use crate::{
    error::ParseError,
    syntax::{Expr, Program, Statement},
};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct SimpplParser;

pub fn parse(source: &str) -> Result<Program, ParseError> {
    let program = SimpplParser::parse(Rule::program, source)?.next().unwrap();
    let mut pairs = program.into_inner();
    let body = build_stmnts(pairs.next().unwrap())?;
    let ret = build_expr(pairs.next().unwrap());
    Ok(Program::new(body, ret))
}

pub fn build_stmnts(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let stmnts = pair
        .into_inner()
        .map(build_stmnt)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Statement::sequence(stmnts))
}

pub fn build_stmnt(pair: Pair<Rule>) -> Result<Statement, ParseError> {
    let stmnt = match pair.as_rule() {
        Rule::assign => {
            let mut pairs = pair.into_inner();
            let ident = pairs.next().unwrap().as_str().to_owned();
            let rhs = build_expr(pairs.next().unwrap());
            Statement::Assign(ident, rhs)
        }
        Rule::flip => {
            let mut pairs = pair.into_inner();
            let ident = pairs.next().unwrap().as_str().to_owned();
            let number = pairs.next().unwrap();
            let p = number
                .as_str()
                .parse::<f64>()
                .map_err(|e| custom_error(&number, format!("invalid probability: {e}")))?;
            if !(0.0..=1.0).contains(&p) {
                return Err(custom_error(
                    &number,
                    format!("flip probability {p} is outside [0, 1]"),
                ));
            }
            Statement::Flip(ident, p)
        }
        Rule::observe => {
            let inner = build_stmnt(pair.into_inner().next().unwrap())?;
            Statement::Observe(Box::new(inner))
        }
        // `do(s)` has one child, `do { old } with { new }` has two
        Rule::intervention => {
            let mut stmnts = pair
                .into_inner()
                .map(build_stmnt)
                .collect::<Result<Vec<_>, _>>()?;
            let target = stmnts.pop().unwrap();
            Statement::Do {
                target: Box::new(target),
                pattern: stmnts.pop().map(Box::new),
            }
        }
        Rule::conditional => {
            let mut pairs = pair.into_inner();
            let cond_expr = build_expr(pairs.next().unwrap());
            let then_stmnt = build_stmnts(pairs.next().unwrap())?;
            let else_stmnt = build_stmnts(pairs.next().unwrap())?;
            Statement::IfThenElse(cond_expr, Box::new(then_stmnt), Box::new(else_stmnt))
        }
        Rule::assert => Statement::Assert(build_expr(pair.into_inner().next().unwrap())),
        _ => unreachable!("{:?}", pair.as_rule()),
    };
    Ok(stmnt)
}

pub fn build_expr(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::expr => build_expr(pair.into_inner().next().unwrap()),
        Rule::boolean => Expr::Bool(pair.as_str() == "true"),
        Rule::ident => Expr::Name(pair.as_str().to_owned()),
        Rule::and | Rule::or => {
            let rule = pair.as_rule();
            let mut pairs = pair.into_inner();
            let lhs = Box::new(build_expr(pairs.next().unwrap()));
            let rhs = Box::new(build_expr(pairs.next().unwrap()));
            if rule == Rule::and {
                Expr::And(lhs, rhs)
            } else {
                Expr::Or(lhs, rhs)
            }
        }
        Rule::not => Expr::Not(Box::new(build_expr(pair.into_inner().next().unwrap()))),
        _ => unreachable!("{:?}", pair.as_rule()),
    }
}

fn custom_error(pair: &Pair<Rule>, message: String) -> ParseError {
    pest::error::Error::<Rule>::new_from_span(ErrorVariant::CustomError { message }, pair.as_span())
        .into()
}
