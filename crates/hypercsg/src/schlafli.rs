//! Regular polytopes and their products from Schlafli symbols.
//!
//! A product string is a list of factors separated by `x` or `*`, such as
//! `{4,3}x{5}`. Every factor is scaled so that its facets are at distance 1
//! from its center.

use std::f64::consts::PI;
use std::fmt;

use eyre::{Result, bail, eyre};
use hypercsg_math::prelude::*;
use itertools::Itertools;
use nom::Parser;
use nom::branch::alt;
use nom::character::complete::{char, multispace0, u32};
use nom::combinator::{all_consuming, opt};
use nom::error::Error;
use nom::multi::{separated_list0, separated_list1};
use nom::sequence::{delimited, preceded};

use crate::primitives::{
    make_hypercube, make_regular_polygon, make_simplex, regular_simplex_vertices,
};
use crate::product::cross;
use crate::{SignedPolytope, Space};

/// Entry in a Schlafli symbol, such as `5` or `5/2`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SchlafliEntry {
    /// Numerator.
    pub p: u32,
    /// Denominator, which is 1 for non-star polytopes.
    pub q: u32,
}

impl fmt::Display for SchlafliEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.q {
            1 => write!(f, "{}", self.p),
            q => write!(f, "{}/{q}", self.p),
        }
    }
}

/// Schlafli symbol such as `{4,3}`. The empty symbol `{}` is a line segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchlafliSymbol(pub Vec<SchlafliEntry>);

impl fmt::Display for SchlafliSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0.iter().join(","))
    }
}

impl SchlafliSymbol {
    /// Returns the number of dimensions of the polytope.
    pub fn ndim(&self) -> usize {
        self.0.len() + 1
    }
}

/// Parses a product of Schlafli symbols, such as `{4,3}x{5}`. A bare number
/// `p` is shorthand for `{p}`.
pub fn parse_schlafli_product(s: &str) -> Result<Vec<SchlafliSymbol>> {
    let (_remaining_input, factors) = all_consuming(delimited(multispace0, product(), multispace0))
        .parse_complete(s)
        .map_err(|e| eyre!("invalid Schlafli product {s:?}: {e}"))?;
    Ok(factors)
}

fn product<'a>() -> impl Parser<&'a str, Output = Vec<SchlafliSymbol>, Error = Error<&'a str>> {
    let separator = delimited(multispace0, alt((char('x'), char('*'))), multispace0);
    separated_list1(separator, symbol())
}

fn symbol<'a>() -> impl Parser<&'a str, Output = SchlafliSymbol, Error = Error<&'a str>> {
    let braced = delimited(
        char('{'),
        separated_list0(char(','), delimited(multispace0, entry(), multispace0)),
        preceded(multispace0, char('}')),
    );
    let bare = entry().map(|e| vec![e]);
    alt((braced, bare)).map(SchlafliSymbol)
}

fn entry<'a>() -> impl Parser<&'a str, Output = SchlafliEntry, Error = Error<&'a str>> {
    (u32, opt(preceded(char('/'), u32))).map(|(p, q)| SchlafliEntry { p, q: q.unwrap_or(1) })
}

/// Constructs the product of regular polytopes described by a string such as
/// `{4,3}x{5}`.
///
/// Supported factors are `{}` (line segment), `{p}` (polygon), `{3,3,...}`
/// (simplex), and `{4,3,...}` (hypercube). Other symbols return an error.
#[tracing::instrument(skip(space))]
pub fn make_regular_polytope_product_from_str(
    space: &mut Space,
    s: &str,
) -> Result<SignedPolytope> {
    let factors = parse_schlafli_product(s)?;
    let mut ret: Option<SignedPolytope> = None;
    for symbol in &factors {
        let factor = make_regular_polytope(space, symbol)?;
        ret = Some(match ret {
            Some(acc) => cross(space, acc, factor)?,
            None => factor,
        });
    }
    ret.ok_or_else(|| eyre!("empty Schlafli product"))
}

/// Constructs a regular polytope from its Schlafli symbol.
pub fn make_regular_polytope(space: &mut Space, symbol: &SchlafliSymbol) -> Result<SignedPolytope> {
    let ndim = symbol.ndim();
    if ndim > MAX_NDIM as usize {
        bail!("Schlafli symbol {symbol} has too many dimensions");
    }
    let ndim = ndim as u8;
    let entries = &symbol.0;

    match entries.as_slice() {
        [] => make_hypercube(space, &vector![0.0], &vector![1.0]),
        [SchlafliEntry { p, q }] => {
            let circumradius = 1.0 / (PI * *q as Float / *p as Float).cos();
            make_regular_polygon(space, *p, *q, circumradius)
        }
        _ if entries.iter().all(|e| e.p == 3 && e.q == 1) => {
            // The inradius of a regular simplex is its circumradius divided
            // by its dimension.
            let vertices = regular_simplex_vertices(ndim)
                .into_iter()
                .map(|v| v * ndim as Float)
                .collect_vec();
            make_simplex(space, &vertices)
        }
        [first, rest @ ..]
            if first.p == 4 && first.q == 1 && rest.iter().all(|e| e.p == 3 && e.q == 1) =>
        {
            make_hypercube(space, &Vector::zero(ndim), &vector![1.0; ndim as usize])
        }
        _ => bail!("unsupported Schlafli symbol {symbol}"),
    }
}

#[cfg(test)]
mod tests {
    use hypercsg_math::assert_approx_eq;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::orient::is_oriented_deep;
    use crate::simplicial::volume;

    #[test]
    fn test_parse_schlafli_product() {
        let e = |p, q| SchlafliEntry { p, q };
        assert_eq!(
            parse_schlafli_product("{4,3} x {5/2}*{}").expect("parse"),
            vec![
                SchlafliSymbol(vec![e(4, 1), e(3, 1)]),
                SchlafliSymbol(vec![e(5, 2)]),
                SchlafliSymbol(vec![]),
            ],
        );
        assert_eq!(
            parse_schlafli_product("7").expect("parse"),
            vec![SchlafliSymbol(vec![e(7, 1)])],
        );
        assert!(parse_schlafli_product("{4,3").is_err());
        assert!(parse_schlafli_product("{4,3}x").is_err());
        assert!(parse_schlafli_product("").is_err());
    }

    #[test]
    fn test_make_regular_polytope_products() {
        let mut space = Space::new();

        let cube = make_regular_polytope_product_from_str(&mut space, "{4,3}").expect("cube");
        assert_eq!(space.element_counts(cube.id), vec![8, 12, 6, 1]);
        assert_approx_eq!(volume(&space, cube), 8.0);

        let prism = make_regular_polytope_product_from_str(&mut space, "{4}x{}").expect("prism");
        assert_eq!(space.element_counts(prism.id), vec![8, 12, 6, 1]);
        assert_approx_eq!(volume(&space, prism), 8.0);
        assert!(is_oriented_deep(&space, prism.id));

        let tetra = make_regular_polytope_product_from_str(&mut space, "{3,3}").expect("tetra");
        assert_eq!(space.element_counts(tetra.id), vec![4, 6, 4, 1]);

        let duoprism =
            make_regular_polytope_product_from_str(&mut space, "{3}x{4}").expect("duoprism");
        assert_eq!(space[duoprism.id].ndim, 4);
        assert_eq!(space.element_counts(duoprism.id), vec![12, 24, 19, 7, 1]);
    }

    #[test]
    fn test_unsupported_symbols() {
        let mut space = Space::new();
        for s in ["{5,3}", "{3,4}", "{5/2}", "{3,5,3}"] {
            let err = make_regular_polytope_product_from_str(&mut space, s).expect_err(s);
            assert!(err.to_string().contains(s.trim_matches(|c| c == '{' || c == '}')), "{err}");
        }
    }
}
