use thiserror::Error;

/// Surface-level errors from driving the evaluator outside of a single
/// `evaluate` call (lexing/parsing a source string). Errors raised *during*
/// evaluation are represented as `Value::Error` so they compose with the
/// rest of the language the same way the original Monkey evaluator does.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("lex error(s): {0:?}")]
    Lex(Vec<lumen_lexer::LexError>),

    #[error("parse error(s): {0:?}")]
    Parse(Vec<lumen_parser::ParseError>),
}
