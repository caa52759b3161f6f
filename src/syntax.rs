use std::fmt;

pub type Ident = String;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(Ident),
    Bool(bool),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assign(Ident, Expr),
    Flip(Ident, f64),
    Observe(Box<Statement>),
    /// Statements run in order. A flat block, so long programs do not nest.
    Sequence(Vec<Statement>),
    IfThenElse(Expr, Box<Statement>, Box<Statement>),
    /// Intervention on `target`'s variable. With `pattern`, only a binding
    /// equal to it is replaced.
    Do {
        target: Box<Statement>,
        pattern: Option<Box<Statement>>,
    },
    /// A bare expression; its value is what an enclosing `Observe` checks.
    Assert(Expr),
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Statement,
    pub ret: Expr,
}

impl Statement {
    /// Block of `stmts`; `Skip` when empty and the statement itself when
    /// there is only one.
    pub fn sequence(mut stmts: Vec<Statement>) -> Statement {
        match stmts.len() {
            0 => Statement::Skip,
            1 => stmts.remove(0),
            _ => Statement::Sequence(stmts),
        }
    }

    pub fn intervene(target: Statement) -> Statement {
        Statement::Do {
            target: Box::new(target),
            pattern: None,
        }
    }

    /// The variable bound by a `Flip` or `Assign`.
    pub fn binds(&self) -> Option<&Ident> {
        match self {
            Statement::Assign(id, _) | Statement::Flip(id, _) => Some(id),
            _ => None,
        }
    }

    /// Every statement of the tree in pre-order, without recursion.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    pub fn contains_do(&self) -> bool {
        self.walk().any(|s| matches!(s, Statement::Do { .. }))
    }
}

/// Pre-order iterator over a statement tree. `do` nodes are yielded but not
/// entered.
pub struct Walk<'a> {
    stack: Vec<&'a Statement>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Statement;

    fn next(&mut self) -> Option<Self::Item> {
        let stmnt = self.stack.pop()?;
        match stmnt {
            Statement::Observe(inner) => self.stack.push(inner),
            Statement::Sequence(stmts) => self.stack.extend(stmts.iter().rev()),
            Statement::IfThenElse(_, then_s, else_s) => {
                self.stack.push(else_s);
                self.stack.push(then_s);
            }
            Statement::Do { .. }
            | Statement::Assign(..)
            | Statement::Flip(..)
            | Statement::Assert(_)
            | Statement::Skip => {}
        }
        Some(stmnt)
    }
}

impl Program {
    pub fn new(body: Statement, ret: Expr) -> Self {
        Self { body, ret }
    }
}

// Display follows the surface syntax; `Skip` has none and prints as `skip`

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(x) => write!(f, "{x}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::And(a, b) => write!(f, "(&& {a} {b})"),
            Expr::Or(a, b) => write!(f, "(|| {a} {b})"),
            Expr::Not(a) => write!(f, "(! {a})"),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign(id, expr) => write!(f, "{id} = {expr}"),
            Statement::Flip(id, p) => write!(f, "{id} ~ flip {p}"),
            Statement::Observe(inner) => write!(f, "observe {inner}"),
            Statement::Sequence(stmts) => {
                for (i, stmnt) in stmts.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{stmnt}")?;
                }
                Ok(())
            }
            Statement::IfThenElse(guard, then_s, else_s) => {
                write!(f, "if {guard} {{ {then_s} }} else {{ {else_s} }}")
            }
            Statement::Do {
                target,
                pattern: None,
            } => write!(f, "do({target})"),
            Statement::Do {
                target,
                pattern: Some(old),
            } => write!(f, "do {{ {old} }} with {{ {target} }}"),
            Statement::Assert(expr) => write!(f, "{expr}"),
            Statement::Skip => write!(f, "skip"),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}; return {}", self.body, self.ret)
    }
}
