use std::fs;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use lumen_vm::opcode::disassemble;
use lumen_vm::{Compiler, Vm};

#[derive(Parser)]
#[command(name = "lumen", version, about = "A small dynamically-typed language")]
struct Cli {
    /// Raise log verbosity; repeat for more (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script through the compiler and VM
    Run {
        path: String,
        /// Print the compiled bytecode before executing it
        #[arg(long)]
        disassemble: bool,
    },
    /// Run a script through the tree-walking evaluator
    Eval { path: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => {
            lumen_repl::run();
            Ok(())
        }
        Some(Command::Run { path, disassemble }) => run_file(&path, disassemble),
        Some(Command::Eval { path }) => eval_file(&path),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("lumen: {message}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_file(path: &str, want_disassembly: bool) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;
    let (program, lex_errors, parse_errors) = lumen_parser::parse(&source);
    report_front_end_errors(&lex_errors, &parse_errors)?;

    let bytecode = Compiler::new().compile_program(&program).map_err(|e| format!("[CompileError] {e}"))?;
    if want_disassembly {
        print!("{}", disassemble(&bytecode.instructions));
    }
    let mut vm = Vm::new(bytecode);
    vm.run().map_err(|e| format!("[RuntimeError] {e}"))
}

fn eval_file(path: &str) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;
    let (program, lex_errors, parse_errors) = lumen_parser::parse(&source);
    report_front_end_errors(&lex_errors, &parse_errors)?;

    let evaluator = lumen_eval::Evaluator::new();
    let env = lumen_eval::Environment::new();
    let result = evaluator.eval_program(&program, &env);
    if result.is_error() {
        return Err(format!("[EvalError] {}", result.inspect()));
    }
    Ok(())
}

fn report_front_end_errors(
    lex_errors: &[lumen_lexer::LexError],
    parse_errors: &[lumen_parser::ParseError],
) -> Result<(), String> {
    for e in lex_errors {
        eprintln!("[LexError] {e}");
    }
    for e in parse_errors {
        eprintln!("[ParseError] {e}");
    }
    if lex_errors.is_empty() && parse_errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} error(s)", lex_errors.len() + parse_errors.len()))
    }
}
