pub mod error;
pub mod evaluator;
pub mod modify;

pub use error::EvalError;
pub use evaluator::Evaluator;
pub use lumen_object::Environment;

/// Lexes, parses, and evaluates `source` against a fresh environment.
pub fn eval(source: &str) -> Result<lumen_object::Value, EvalError> {
    let (program, lex_errors, parse_errors) = lumen_parser::parse(source);
    if !lex_errors.is_empty() {
        return Err(EvalError::Lex(lex_errors));
    }
    if !parse_errors.is_empty() {
        return Err(EvalError::Parse(parse_errors));
    }
    let evaluator = Evaluator::new();
    let env = Environment::new();
    Ok(evaluator.eval_program(&program, &env))
}
