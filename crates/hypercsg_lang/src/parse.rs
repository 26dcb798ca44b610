use chumsky::pratt::{infix, left, prefix};
use chumsky::prelude::*;

use crate::LangError;
use crate::ast::{BinaryOp, Expr, Spanned};

type ParseError<'src> = Rich<'src, char>;
type ParseExtra<'src> = extra::Err<ParseError<'src>>;

/// Trait alias for parser.
trait LangParser<'src, O>: Clone + Parser<'src, &'src str, O, ParseExtra<'src>> {}
impl<'src, O, T> LangParser<'src, O> for T where
    T: Clone + Parser<'src, &'src str, O, ParseExtra<'src>>
{
}

/// Single-letter words that are operators rather than variable names.
const OPERATOR_WORDS: &[&str] = &["i", "u", "d", "m", "x"];

/// Parses an expression or assignment. On failure, returns an error for each
/// syntax error.
pub fn parse(src: &str) -> Result<Spanned<Expr>, Vec<LangError>> {
    parser()
        .parse(src)
        .into_result()
        .map_err(|errs| errs.iter().map(|e| LangError::from_rich(src, e)).collect())
}

fn parser<'src>() -> impl LangParser<'src, Spanned<Expr>> {
    let mut statement = Recursive::declare();

    let expr = {
        let string_literal = none_of('"')
            .repeated()
            .to_slice()
            .delimited_by(just('"'), just('"'))
            .map(str::to_owned);

        let scan = text::ident()
            .filter(|s: &&str| *s == "scan")
            .ignore_then(string_literal.padded().delimited_by(just('('), just(')')))
            .map(Expr::Scan)
            .labelled("scan");

        let schlafli = none_of('}')
            .repeated()
            .delimited_by(just('{'), just('}'))
            .to_slice()
            .map(|s: &str| Expr::Schlafli(s.to_owned()))
            .labelled("Schlafli symbol");

        let atom = choice((
            just('0').to(Expr::Empty),
            just('1').to(Expr::Full),
            scan,
            variable_name().map(|name| Expr::Var(name.to_owned())),
            schlafli,
        ))
        .map_with(|x, e| (x, e.span()))
        .or(statement.clone().delimited_by(just('('), just(')')))
        .padded()
        .labelled("value");

        let op = |op: BinaryOp, symbols: &'static str, words: &'static [&'static str]| {
            infix(left(op_binding_power(op)), binary_op(op, symbols, words), |lhs, op, rhs, e| {
                let lhs = Box::new(lhs);
                let rhs = Box::new(rhs);
                (Expr::Binary { op, lhs, rhs }, e.span())
            })
        };

        atom.pratt((
            prefix(60, one_of("~-").padded(), |_, rhs, e| {
                (Expr::Complement(Box::new(rhs)), e.span())
            }),
            vec![
                op(BinaryOp::Product, "*", &["x"]),
                op(BinaryOp::Intersect, "&", &["i"]),
                op(BinaryOp::Diff, "-\\", &["d", "m"]),
                op(BinaryOp::Union, "|", &["u"]),
            ],
        ))
    };

    let assignment = variable_name()
        .padded()
        .then_ignore(just('='))
        .then(statement.clone().or_not())
        .map_with(|(name, value): (&str, Option<Spanned<Expr>>), e| {
            let name = name.to_owned();
            let value = value.map(Box::new);
            (Expr::Assign { name, value }, e.span())
        });

    statement.define(choice((assignment, expr)).padded());

    statement.then_ignore(end())
}

fn op_binding_power(op: BinaryOp) -> u16 {
    match op {
        BinaryOp::Product => 50,
        BinaryOp::Intersect => 40,
        BinaryOp::Diff => 30,
        BinaryOp::Union => 20,
    }
}

fn binary_op<'src>(
    op: BinaryOp,
    symbols: &'static str,
    words: &'static [&'static str],
) -> impl LangParser<'src, BinaryOp> {
    let word = text::ident().filter(move |s: &&str| words.contains(s));
    choice((one_of(symbols).ignored(), word.ignored()))
        .padded()
        .to(op)
        .labelled("operator")
}

fn variable_name<'src>() -> impl LangParser<'src, &'src str> {
    text::ident()
        .filter(|s: &&str| !OPERATOR_WORDS.contains(s) && *s != "scan")
        .labelled("variable name")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn roundtrip(src: &str) -> String {
        match parse(src) {
            Ok((expr, _span)) => expr.to_string(),
            Err(errs) => panic!("error parsing {src:?}: {errs:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        assert_eq!(roundtrip("a u b i c"), "(a u (b i c))");
        assert_eq!(roundtrip("a | b & c \\ d"), "(a u ((b i c) - d))");
        assert_eq!(roundtrip("a - b - c"), "((a - b) - c)");
        assert_eq!(roundtrip("a d b m c"), "((a - b) - c)");
        assert_eq!(roundtrip("~a x b * c"), "((~a x b) x c)");
        assert_eq!(roundtrip("-a i -b"), "(~a i ~b)");
        assert_eq!(roundtrip("(a u b) i c"), "((a u b) i c)");
    }

    #[test]
    fn test_operator_words_inside_names() {
        assert_eq!(roundtrip("ix i xi"), "(ix i xi)");
        assert_eq!(roundtrip("mud d dim"), "(mud - dim)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(roundtrip("0 u 1"), "(0 u 1)");
        assert_eq!(roundtrip("scan( \"shapes/a.txt\" )"), "scan(\"shapes/a.txt\")");
        assert_eq!(roundtrip("{4,3} x {}"), "({4,3} x {})");
    }

    #[test]
    fn test_assignment() {
        assert_eq!(roundtrip("a = b u c"), "a = (b u c)");
        assert_eq!(roundtrip("a = b = ~c"), "a = b = ~c");
        assert_eq!(roundtrip("a ="), "a =");
        assert_eq!(roundtrip("(a = b) i c"), "(a = b i c)");
    }

    #[test]
    fn test_syntax_errors() {
        for src in ["a u", "(a u b", "a b", "x", "a = = b", "scan(a)"] {
            assert!(parse(src).is_err(), "{src:?} should not parse");
        }
        let errs = parse("a & ) b").expect_err("unbalanced parenthesis");
        assert!(errs.iter().any(|e| e.offset == 2 || e.offset == 4), "{errs:?}");
    }
}
