//! Query text parsing.
//!
//! A hand-written lexer feeds a recursive-descent parser which produces the
//! operation tree of [`crate::ast`]. Variables are substituted during
//! parsing, so downstream coercion only ever sees plain values.

mod document;
mod lexer;

use std::fmt;

use derive_more::{Display, Error};

pub use self::{
    document::parse_query,
    lexer::{Lexer, LexerError, Token},
};

/// A position in the query source, starting at line 1, column 1.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourcePosition {
    index: usize,
    line: usize,
    column: usize,
}

impl SourcePosition {
    #[doc(hidden)]
    pub fn new(index: usize, line: usize, column: usize) -> Self {
        SourcePosition {
            index,
            line,
            column,
        }
    }

    pub(crate) fn start_of_query() -> Self {
        SourcePosition {
            index: 0,
            line: 1,
            column: 1,
        }
    }

    pub(crate) fn advance_col(&mut self) {
        self.index += 1;
        self.column += 1;
    }

    pub(crate) fn advance_line(&mut self) {
        self.index += 1;
        self.line += 1;
        self.column = 1;
    }

    /// The zero-based byte index into the source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The one-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// The one-based column number.
    pub fn column(&self) -> usize {
        self.column
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A value of `T` annotated with the source position it was parsed at.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Spanning<T> {
    /// The wrapped value.
    pub item: T,
    /// Where in the source the value starts.
    pub position: SourcePosition,
}

impl<T> Spanning<T> {
    /// Annotate `item` with `position`.
    pub fn new(position: SourcePosition, item: T) -> Self {
        Spanning { item, position }
    }

    /// Transform the wrapped value, keeping the position.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Spanning<U> {
        Spanning {
            item: f(self.item),
            position: self.position,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Spanning<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. At {}", self.item, self.position)
    }
}

impl<T: fmt::Display + fmt::Debug> std::error::Error for Spanning<T> {}

/// Error while parsing a GraphQL query.
#[derive(Clone, Debug, Display, Error, PartialEq)]
pub enum ParseError {
    /// An unexpected token occurred in the source.
    #[display("Unexpected \"{_0}\"")]
    UnexpectedToken(#[error(not(source))] String),

    /// The input source abruptly ended.
    #[display("Unexpected end of input")]
    UnexpectedEndOfFile,

    /// An error during tokenization occurred.
    #[display("{_0}")]
    Lexer(LexerError),

    /// The document contained no operation, or more than one. Callers pass
    /// exactly one operation per request.
    #[display("must have a single query")]
    SingleOperationRequired,

    /// A spread referenced a fragment that is not defined in the document.
    #[display("unknown fragment \"{_0}\"")]
    UnknownFragment(#[error(not(source))] String),

    /// Fragment definitions spread each other in a cycle.
    #[display("fragment cycle involving \"{_0}\"")]
    FragmentCycle(#[error(not(source))] String),

    /// A fragment was defined but never spread.
    #[display("unused fragment \"{_0}\"")]
    UnusedFragment(#[error(not(source))] String),

    /// Two fragment definitions share a name.
    #[display("duplicate fragment \"{_0}\"")]
    DuplicateFragment(#[error(not(source))] String),

    /// Two selections share an output alias but differ in field name or
    /// arguments.
    #[display("conflicting selections for alias \"{_0}\"")]
    SelectionConflict(#[error(not(source))] String),

    /// A `$variable` was used but never declared on the operation.
    #[display("undefined variable \"${_0}\"")]
    UndefinedVariable(#[error(not(source))] String),

    /// A required variable was declared but no value or default was given.
    #[display("missing required variable \"${_0}\"")]
    MissingVariable(#[error(not(source))] String),
}

impl ParseError {
    /// Creates a [`ParseError::UnexpectedToken`] out of the provided token.
    #[must_use]
    pub fn unexpected_token(token: &Token<'_>) -> Self {
        Self::UnexpectedToken(token.to_string())
    }
}

#[doc(hidden)]
pub type ParseResult<T> = Result<T, Spanning<ParseError>>;

impl From<Spanning<ParseError>> for crate::errors::Error {
    fn from(e: Spanning<ParseError>) -> Self {
        let positioned = !matches!(e.item, ParseError::SingleOperationRequired);
        let err = crate::errors::Error::new(e.item.to_string());
        if positioned {
            err.extension("line", crate::value::Value::Int(e.position.line as i64))
                .extension("column", crate::value::Value::Int(e.position.column as i64))
        } else {
            err
        }
    }
}
