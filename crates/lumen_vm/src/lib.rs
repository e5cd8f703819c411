pub mod compiler;
pub mod error;
pub mod opcode;
pub mod symbol_table;
pub mod vm;

pub use compiler::{Bytecode, Compiler};
pub use lumen_object::builtins;
pub use error::{CompileError, CompileResult, VmError, VmResult};
pub use opcode::{disassemble, make, read_operands, Op};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::Vm;

/// Compiles and runs a standalone program, returning the last value left on
/// the stack. The REPL drives the compiler and VM directly instead, so it can
/// persist symbols and globals across lines.
pub fn run(source: &str) -> Result<lumen_object::Value, Error> {
    let (program, lex_errors, parse_errors) = lumen_parser::parse(source);
    if !lex_errors.is_empty() {
        return Err(Error::Lex(lex_errors));
    }
    if !parse_errors.is_empty() {
        return Err(Error::Parse(parse_errors));
    }
    let bytecode = Compiler::new().compile_program(&program).map_err(Error::Compile)?;
    let mut vm = Vm::new(bytecode);
    vm.run().map_err(Error::Vm)?;
    Ok(vm.last_popped_stack_elem())
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("lex error(s): {0:?}")]
    Lex(Vec<lumen_lexer::LexError>),

    #[error("parse error(s): {0:?}")]
    Parse(Vec<lumen_parser::ParseError>),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Vm(#[from] VmError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_object::Value;

    #[test]
    fn test_run_end_to_end() {
        assert_eq!(run("1 + 2;").unwrap(), Value::Integer(3));
    }

    #[test]
    fn test_run_surfaces_compile_errors() {
        assert!(matches!(run("foo;"), Err(Error::Compile(_))));
    }

    #[test]
    fn test_run_surfaces_parse_errors() {
        assert!(matches!(run("let ;"), Err(Error::Parse(_))));
    }
}
