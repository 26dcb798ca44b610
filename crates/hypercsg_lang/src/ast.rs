//! Abstract syntax tree.

use std::fmt;

use chumsky::span::SimpleSpan;

/// Value with a byte span in the source string.
pub type Spanned<T> = (T, SimpleSpan);

/// Expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Empty set: `0`
    Empty,
    /// All of space: `1`
    Full,
    /// Variable reference.
    Var(String),
    /// Polytope imported from a file: `scan("path")`
    Scan(String),
    /// Regular polytope from a Schlafli symbol, such as `{4,3}`.
    Schlafli(String),
    /// Complement: `~a`
    Complement(Box<Spanned<Expr>>),
    /// Binary operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Spanned<Expr>>,
        /// Right operand.
        rhs: Box<Spanned<Expr>>,
    },
    /// Assignment, or removal of a variable if `value` is `None`.
    Assign {
        /// Variable name.
        name: String,
        /// New value.
        value: Option<Box<Spanned<Expr>>>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Empty => write!(f, "0"),
            Expr::Full => write!(f, "1"),
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Scan(path) => write!(f, "scan({path:?})"),
            Expr::Schlafli(symbol) => write!(f, "{symbol}"),
            Expr::Complement(inner) => write!(f, "~{}", inner.0),
            Expr::Binary { op, lhs, rhs } => write!(f, "({} {op} {})", lhs.0, rhs.0),
            Expr::Assign { name, value: None } => write!(f, "{name} ="),
            Expr::Assign {
                name,
                value: Some(value),
            } => write!(f, "{name} = {}", value.0),
        }
    }
}

/// Binary operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Union,
    Diff,
    Intersect,
    Product,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Union => write!(f, "u"),
            BinaryOp::Diff => write!(f, "-"),
            BinaryOp::Intersect => write!(f, "i"),
            BinaryOp::Product => write!(f, "x"),
        }
    }
}
