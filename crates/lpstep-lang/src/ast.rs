use lpstep_solver::{Relation, Sense};

use crate::lexer::Span;

/// A parsed problem text: one objective line and any number of constraints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn objectives(&self) -> impl Iterator<Item = &ObjectiveStmt> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Objective(o) => Some(o),
            Statement::Constraint(_) => None,
        })
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintStmt> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Constraint(c) => Some(c),
            Statement::Objective(_) => None,
        })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Objective(ObjectiveStmt),
    Constraint(ConstraintStmt),
}

/// `max 3x + 2y`, `min: x + y`, `max z = 3x + 2y`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectiveStmt {
    pub span: Span,
    pub sense: Sense,
    /// The `z` in `max z = ...`
    pub name: Option<String>,
    pub expr: Expr,
}

/// `lhs <= rhs`; either side may hold variables and constants.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintStmt {
    pub span: Span,
    pub lhs: Expr,
    pub relation: Relation,
    pub rhs: Expr,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Variable(Variable),
    Neg(Box<Expr>),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Paren(Box<Expr>),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub span: Span,
    pub name: String,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
        }
    }
}
