use lumen_lexer::{Span, TokenKind};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("[ParseError] expected {expected} but found {:?} at line {}, column {}", found, span.line, span.column)]
    UnexpectedToken {
        expected: String,
        found: TokenKind,
        span: Span,
    },

    #[error("[ParseError] expected {expected} but reached end of file at line {}", span.line)]
    UnexpectedEof { expected: String, span: Span },

    #[error("[ParseError] no prefix parse function for {:?} at line {}, column {}", found, span.line, span.column)]
    NoPrefixParseFn { found: TokenKind, span: Span },

    #[error("[ParseError] invalid integer literal '{text}' at line {}, column {}", span.line, span.column)]
    InvalidInteger { text: String, span: Span },
}

pub type ParseResult<T> = Result<T, ParseError>;
