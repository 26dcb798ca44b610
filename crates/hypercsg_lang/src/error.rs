use chumsky::error::Rich;
use chumsky::span::SimpleSpan;

/// Error parsing or evaluating an expression.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at offset {offset} ({snippet:?})")]
pub struct LangError {
    /// Byte offset into the source string.
    pub offset: usize,
    /// Source text at the error.
    pub snippet: String,
    /// Description of the error.
    pub message: String,
}

impl LangError {
    /// Constructs an error covering `span` of `src`. An empty span covers the
    /// rest of the source string.
    pub fn new(src: &str, span: SimpleSpan, message: impl ToString) -> Self {
        let snippet = match span.start == span.end {
            true => src.get(span.start..),
            false => src.get(span.start..span.end),
        };
        Self {
            offset: span.start,
            snippet: snippet.unwrap_or_default().trim().to_owned(),
            message: message.to_string(),
        }
    }

    pub(crate) fn from_rich(src: &str, e: &Rich<'_, char>) -> Self {
        Self::new(src, *e.span(), e.reason())
    }
}
