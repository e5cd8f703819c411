use std::io::{self, BufRead, Write};

use lumen_object::{Value, NULL};
use lumen_vm::vm::GLOBALS_SIZE;
use lumen_vm::{Compiler, Vm};

const PROMPT: &str = ">> ";

/// Reads a line, lexes, parses, compiles with a persisted symbol table and
/// globals array carried across iterations, runs the VM, and prints the last
/// popped stack element. Exits on EOF (Ctrl-D).
pub fn run() {
    let stdin = io::stdin();
    let mut compiler = Compiler::new();
    let mut globals: Vec<Value> = vec![NULL; GLOBALS_SIZE];

    loop {
        print!("{PROMPT}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("[IoError] {e}");
                break;
            }
        }
        let line = line.trim_end_matches('\n');
        if line.is_empty() {
            continue;
        }

        let (program, lex_errors, parse_errors) = lumen_parser::parse(line);
        if !lex_errors.is_empty() || !parse_errors.is_empty() {
            for e in &lex_errors {
                eprintln!("[LexError] {e}");
            }
            for e in &parse_errors {
                eprintln!("[ParseError] {e}");
            }
            continue;
        }

        let mut next_compiler = Compiler::new_with_state(compiler.symbol_table(), compiler.constants().to_vec());
        let bytecode = match next_compiler.compile_program(&program) {
            Ok(bytecode) => bytecode,
            Err(e) => {
                eprintln!("[CompileError] {e}");
                continue;
            }
        };
        compiler = next_compiler;

        let mut vm = Vm::with_globals(bytecode, globals);
        match vm.run() {
            Ok(()) => println!("{}", vm.last_popped_stack_elem().inspect()),
            Err(e) => {
                tracing::debug!(error = %e, "repl line raised a runtime error");
                eprintln!("[RuntimeError] {e}");
            }
        }
        globals = vm.globals;
    }
}
