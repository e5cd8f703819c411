use crate::token::Span;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("[LexError] Unexpected character '{ch}' at line {}, column {}", span.line, span.column)]
    UnexpectedCharacter { ch: char, span: Span },

    #[error("[LexError] Unterminated string at line {}, column {}", span.line, span.column)]
    UnterminatedString { span: Span },

    #[error("[LexError] integer literal '{text}' does not fit in 64 bits at line {}, column {}", span.line, span.column)]
    IntegerOverflow { text: String, span: Span },
}

pub type LexResult<T> = Result<T, LexError>;
