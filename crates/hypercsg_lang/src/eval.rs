use std::collections::HashMap;

use hypercsg::import::import_polytope;
use hypercsg::intersect::{complement, diff, intersect, union};
use hypercsg::product::cross;
use hypercsg::schlafli::make_regular_polytope_product_from_str;
use hypercsg::{SignedPolytope, Space};
use itertools::Itertools;

use crate::ast::{BinaryOp, Expr, Spanned};
use crate::{LangError, parse};

/// Polytope arena with named variables, in which expressions are evaluated.
#[derive(Debug)]
pub struct Env {
    space: Space,
    vars: HashMap<String, SignedPolytope>,
    /// Number of dimensions for `0` and `1`.
    ndim: u8,
}

impl Env {
    /// Constructs an environment with no variables. `ndim` is the number of
    /// dimensions of `0` and `1` until a variable is assigned.
    pub fn new(space: Space, ndim: u8) -> Self {
        Self {
            space,
            vars: HashMap::new(),
            ndim,
        }
    }

    /// Returns the polytope arena.
    pub fn space(&self) -> &Space {
        &self.space
    }
    /// Returns the polytope arena mutably, for constructing polytopes to
    /// assign to variables.
    pub fn space_mut(&mut self) -> &mut Space {
        &mut self.space
    }
    /// Returns the number of dimensions of `0` and `1`.
    pub fn ndim(&self) -> u8 {
        self.ndim
    }

    /// Returns the value of a variable.
    pub fn get(&self, name: &str) -> Option<SignedPolytope> {
        self.vars.get(name).copied()
    }
    /// Assigns a variable. `0` and `1` take on the dimension of `value`.
    pub fn set(&mut self, name: impl Into<String>, value: SignedPolytope) {
        self.ndim = self.space[value.id].ndim;
        self.vars.insert(name.into(), value);
    }
    /// Removes a variable and returns its old value.
    pub fn unset(&mut self, name: &str) -> Option<SignedPolytope> {
        self.vars.remove(name)
    }

    /// Parses and evaluates an expression or assignment.
    #[tracing::instrument(skip(self))]
    pub fn eval(&mut self, src: &str) -> Result<SignedPolytope, LangError> {
        let expr = parse(src).map_err(|errs| {
            errs.into_iter()
                .next()
                .unwrap_or_else(|| LangError::new(src, (0..0).into(), "syntax error"))
        })?;
        let ret = self.eval_expr(src, &expr)?;
        tracing::debug!(%ret, counts = ?self.space.element_counts(ret.id), "evaluated expression");
        Ok(ret)
    }

    fn eval_expr(
        &mut self,
        src: &str,
        (expr, span): &Spanned<Expr>,
    ) -> Result<SignedPolytope, LangError> {
        let err = |message: String| LangError::new(src, *span, message);
        let ndim = self.ndim;

        match expr {
            Expr::Empty => self.space.empty(ndim, ndim).map_err(|e| err(e.to_string())),
            Expr::Full => self.space.whole(ndim, ndim).map_err(|e| err(e.to_string())),
            Expr::Var(name) => self.get(name).ok_or_else(|| {
                let known = self.vars.keys().sorted().join(", ");
                err(format!("undefined variable {name:?} (defined: {known})"))
            }),
            Expr::Scan(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| err(format!("cannot read {path:?}: {e}")))?;
                import_polytope(&mut self.space, &text)
                    .map_err(|e| err(format!("cannot import {path:?}: {e}")))
            }
            Expr::Schlafli(symbol) => {
                make_regular_polytope_product_from_str(&mut self.space, symbol)
                    .map_err(|e| err(format!("{e:#}")))
            }
            Expr::Complement(inner) => Ok(complement(self.eval_expr(src, inner)?)),
            Expr::Binary { op, lhs, rhs } => {
                let a = self.eval_expr(src, lhs)?;
                let b = self.eval_expr(src, rhs)?;
                let (a_ndim, b_ndim) = (self.space[a.id].ndim, self.space[b.id].ndim);
                if *op != BinaryOp::Product && a_ndim != b_ndim {
                    return Err(err(format!("dimension mismatch: {a_ndim}D {op} {b_ndim}D")));
                }
                let space = &mut self.space;
                match op {
                    BinaryOp::Union => union(space, a, b),
                    BinaryOp::Diff => diff(space, a, b),
                    BinaryOp::Intersect => intersect(space, a, b),
                    BinaryOp::Product => cross(space, a, b),
                }
                .map_err(|e| err(format!("{e:#}")))
            }
            Expr::Assign { name, value: Some(value) } => {
                let p = self.eval_expr(src, value)?;
                self.set(name.clone(), p);
                Ok(p)
            }
            Expr::Assign { name, value: None } => {
                self.unset(name);
                self.space.empty(ndim, ndim).map_err(|e| err(e.to_string()))
            }
        }
    }
}
