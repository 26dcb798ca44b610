//! Expression language for composing polytope CSG operations.
//!
//! ```text
//! cube = {4,3}
//! hole = scan("hole.txt")
//! cube - hole u ~(a i b) x {}
//! ```
//!
//! Operators, from loosest to tightest binding:
//!
//! | operator     | meaning           |
//! |--------------|-------------------|
//! | `name = ...` | assignment        |
//! | `u` `\|`     | union             |
//! | `-` `\` `d` `m` | difference     |
//! | `i` `&`      | intersection      |
//! | `x` `*`      | Cartesian product |
//! | `~` `-`      | complement        |
//!
//! `0` is the empty set and `1` is all of space. An assignment with nothing on
//! the right side removes the variable.

pub mod ast;
mod error;
mod eval;
mod parse;

pub use error::LangError;
pub use eval::Env;
pub use parse::parse;

#[cfg(test)]
mod tests;
