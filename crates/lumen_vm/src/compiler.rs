use std::cell::RefCell;
use std::rc::Rc;

use lumen_object::builtins::BUILTIN_NAMES;
use lumen_object::{CompiledFunction, Value};
use lumen_parser::{BlockStatement, Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind};

use crate::error::{CompileError, CompileResult};
use crate::opcode::{make, Op};
use crate::symbol_table::{SymbolScope, SymbolTable};

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    op: Op,
    position: usize,
}

#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Vec<u8>,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
}

pub struct Compiler {
    constants: Vec<Value>,
    scopes: Vec<CompilationScope>,
    symbol_table: Rc<RefCell<SymbolTable>>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut root = SymbolTable::new();
        for (idx, name) in BUILTIN_NAMES.iter().enumerate() {
            root.define_builtin(idx, name);
        }
        Compiler {
            constants: Vec::new(),
            scopes: vec![CompilationScope::default()],
            symbol_table: Rc::new(RefCell::new(root)),
        }
    }

    /// Constructs a compiler that shares state (globals/symbol table) across
    /// calls, the shape the REPL needs to persist `let` bindings line to line.
    pub fn new_with_state(symbol_table: Rc<RefCell<SymbolTable>>, constants: Vec<Value>) -> Self {
        Compiler { constants, scopes: vec![CompilationScope::default()], symbol_table }
    }

    pub fn symbol_table(&self) -> Rc<RefCell<SymbolTable>> {
        self.symbol_table.clone()
    }

    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn compile_program(&mut self, program: &Program) -> CompileResult<Bytecode> {
        for stmt in &program.statements {
            self.compile_statement(stmt).inspect_err(|e| tracing::debug!(error = %e, "compilation aborted"))?;
        }
        Ok(Bytecode { instructions: self.current_instructions().clone(), constants: self.constants.clone() })
    }

    fn current_scope(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler always has at least one scope")
    }

    fn current_instructions(&self) -> &Vec<u8> {
        &self.scopes.last().expect("compiler always has at least one scope").instructions
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let bytes = make(op, operands);
        let position = self.current_instructions().len();
        let scope = self.current_scope();
        scope.instructions.extend_from_slice(&bytes);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { op, position });
        position
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        self.scopes.last().unwrap().last_instruction.map(|i| i.op == op).unwrap_or(false)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    fn replace_instruction(&mut self, position: usize, new_instruction: &[u8]) {
        let scope = self.current_scope();
        scope.instructions[position..position + new_instruction.len()].copy_from_slice(new_instruction);
    }

    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Op::from_u8(self.current_instructions()[position]).expect("position always points at an opcode");
        let new_instruction = make(op, &[operand]);
        self.replace_instruction(position, &new_instruction);
        tracing::trace!(position, operand, ?op, "patched jump operand");
    }

    fn replace_last_pop_with_return(&mut self) {
        let last_pos = self.scopes.last().unwrap().last_instruction.unwrap().position;
        let new_instruction = make(Op::ReturnValue, &[]);
        self.replace_instruction(last_pos, &new_instruction);
        self.current_scope().last_instruction.as_mut().unwrap().op = Op::ReturnValue;
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = self.symbol_table.clone();
        self.symbol_table = Rc::new(RefCell::new(SymbolTable::with_outer(outer)));
        tracing::debug!(depth = self.scopes.len(), "entering compilation scope");
    }

    fn leave_scope(&mut self) -> Vec<u8> {
        let scope = self.scopes.pop().expect("leave_scope called without a matching enter_scope");
        let outer = self.symbol_table.borrow().outer.clone().expect("leave_scope called on the root scope");
        self.symbol_table = outer;
        tracing::debug!(depth = self.scopes.len(), "leaving compilation scope");
        scope.instructions
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.inner {
            StmtKind::Expression { expr } => {
                self.compile_expression(expr)?;
                self.emit(Op::Pop, &[]);
            }
            StmtKind::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbol_table.borrow_mut().define(name);
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::SetGlobal, &[symbol.index]),
                    _ => self.emit(Op::SetLocal, &[symbol.index]),
                };
            }
            StmtKind::Return { value } => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
            }
        }
        Ok(())
    }

    fn compile_block(&mut self, block: &BlockStatement) -> CompileResult<()> {
        for stmt in &block.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.inner {
            ExprKind::IntegerLiteral(value) => {
                let idx = self.add_constant(Value::Integer(*value));
                self.emit(Op::Constant, &[idx]);
            }
            ExprKind::StringLiteral(value) => {
                let idx = self.add_constant(Value::String(Rc::from(value.as_str())));
                self.emit(Op::Constant, &[idx]);
            }
            ExprKind::Boolean(true) => {
                self.emit(Op::True, &[]);
            }
            ExprKind::Boolean(false) => {
                self.emit(Op::False, &[]);
            }
            ExprKind::Prefix { operator, right } => {
                self.compile_expression(right)?;
                match operator {
                    PrefixOp::Bang => self.emit(Op::Bang, &[]),
                    PrefixOp::Minus => self.emit(Op::Minus, &[]),
                };
            }
            ExprKind::Infix { operator: InfixOp::Lt, left, right } => {
                self.compile_expression(right)?;
                self.compile_expression(left)?;
                self.emit(Op::GreaterThan, &[]);
            }
            ExprKind::Infix { operator, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let op = match operator {
                    InfixOp::Add => Op::Add,
                    InfixOp::Sub => Op::Sub,
                    InfixOp::Mul => Op::Mul,
                    InfixOp::Div => Op::Div,
                    InfixOp::Gt => Op::GreaterThan,
                    InfixOp::Eq => Op::Equal,
                    InfixOp::NotEq => Op::NotEqual,
                    InfixOp::Lt => unreachable!("handled above"),
                };
                self.emit(op, &[]);
            }
            ExprKind::If { condition, consequence, alternative } => {
                self.compile_expression(condition)?;
                let jump_not_truthy_pos = self.emit(Op::JumpNotTruthy, &[9999]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Op::Pop) {
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(Op::Jump, &[9999]);
                let after_consequence = self.current_instructions().len();
                self.change_operand(jump_not_truthy_pos, after_consequence);

                match alternative {
                    Some(alt) => {
                        self.compile_block(alt)?;
                        if self.last_instruction_is(Op::Pop) {
                            self.remove_last_pop();
                        }
                    }
                    None => {
                        self.emit(Op::Null, &[]);
                    }
                }
                let after_alternative = self.current_instructions().len();
                self.change_operand(jump_pos, after_alternative);
            }
            ExprKind::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .borrow_mut()
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable { name: name.clone() })?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
                    SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
                    SymbolScope::Free => self.emit(Op::GetFree, &[symbol.index]),
                    SymbolScope::Function => self.emit(Op::CurrentClosure, &[]),
                };
            }
            ExprKind::ArrayLiteral(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
            }
            ExprKind::HashLiteral(pairs) => {
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| format!("{:?}", key.inner));
                for (key, value) in &sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[sorted.len() * 2]);
            }
            ExprKind::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
            }
            ExprKind::FunctionLiteral { name, parameters, body } => {
                self.enter_scope();

                if let Some(name) = name {
                    self.symbol_table.borrow_mut().define_function_name(name);
                }
                for param in parameters {
                    self.symbol_table.borrow_mut().define(param);
                }

                self.compile_block(body)?;

                if self.last_instruction_is(Op::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Op::ReturnValue) {
                    self.emit(Op::Return, &[]);
                }

                let free_symbols = self.symbol_table.borrow().free_symbols.clone();
                let num_locals = self.symbol_table.borrow().num_definitions;
                let instructions = self.leave_scope();

                for free in &free_symbols {
                    match free.scope {
                        SymbolScope::Local => self.emit(Op::GetLocal, &[free.index]),
                        SymbolScope::Free => self.emit(Op::GetFree, &[free.index]),
                        SymbolScope::Global => self.emit(Op::GetGlobal, &[free.index]),
                        SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[free.index]),
                        SymbolScope::Function => self.emit(Op::CurrentClosure, &[]),
                    };
                }

                let compiled = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: parameters.len(),
                };
                let const_idx = self.add_constant(Value::CompiledFunction(Rc::new(compiled)));
                self.emit(Op::Closure, &[const_idx, free_symbols.len()]);
            }
            ExprKind::Call { function, arguments } => {
                self.compile_expression(function)?;
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
            }
            ExprKind::Error => {
                return Err(CompileError::UnknownOperator { operator: "<parse error>".to_string() });
            }
        }
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Compiler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::make;
    use lumen_parser::parse;

    fn compile(src: &str) -> Bytecode {
        let (program, lex_errors, parse_errors) = parse(src);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);
        let mut compiler = Compiler::new();
        compiler.compile_program(&program).expect("compilation should succeed")
    }

    fn flatten(chunks: &[Vec<u8>]) -> Vec<u8> {
        chunks.iter().flat_map(|c| c.iter().copied()).collect()
    }

    #[test]
    fn test_integer_arithmetic() {
        let bytecode = compile("1 + 2;");
        let expected = flatten(&[
            make(Op::Constant, &[0]),
            make(Op::Constant, &[1]),
            make(Op::Add, &[]),
            make(Op::Pop, &[]),
        ]);
        assert_eq!(bytecode.instructions, expected);
        assert_eq!(bytecode.constants, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_instruction_stream_is_deterministic() {
        let a = compile("let x = 1; let y = 2; x + y;");
        let b = compile("let x = 1; let y = 2; x + y;");
        assert_eq!(a.instructions, b.instructions);
        assert_eq!(a.constants, b.constants);
    }

    #[test]
    fn test_less_than_compiles_as_swapped_greater_than() {
        let bytecode = compile("1 < 2;");
        let expected = flatten(&[
            make(Op::Constant, &[0]), // 2 compiled first
            make(Op::Constant, &[1]), // 1 compiled second
            make(Op::GreaterThan, &[]),
            make(Op::Pop, &[]),
        ]);
        assert_eq!(bytecode.instructions, expected);
        assert_eq!(bytecode.constants, vec![Value::Integer(2), Value::Integer(1)]);
    }

    #[test]
    fn test_if_without_alternative_emits_null_branch() {
        let bytecode = compile("if (true) { 10 }; 3333;");
        let expected = flatten(&[
            make(Op::True, &[]),               // 0000
            make(Op::JumpNotTruthy, &[10]),     // 0001
            make(Op::Constant, &[0]),           // 0004
            make(Op::Jump, &[11]),              // 0007
            make(Op::Null, &[]),                // 0010
            make(Op::Pop, &[]),                 // 0011
            make(Op::Constant, &[1]),           // 0012
            make(Op::Pop, &[]),
        ]);
        assert_eq!(bytecode.instructions, expected);
    }

    #[test]
    fn test_hash_literal_ordering_is_deterministic() {
        let a = compile("{2: 1, 1: 2};");
        let b = compile("{2: 1, 1: 2};");
        assert_eq!(a.instructions, b.instructions);
    }

    #[test]
    fn test_builtin_ordering_matches_registration() {
        let bytecode = compile("len([]); push([], 1);");
        // len -> OpGetBuiltin 0 ... push -> OpGetBuiltin 5
        assert!(bytecode.instructions.windows(2).any(|w| w == [Op::GetBuiltin as u8, 0]));
        assert!(bytecode.instructions.windows(2).any(|w| w == [Op::GetBuiltin as u8, 5]));
    }

    #[test]
    fn test_free_variable_capture_uses_outer_local_index() {
        let bytecode = compile(
            "
            fn(a) {
                fn(b) {
                    a + b;
                }
            };
            ",
        );
        // The root stream only builds the outer closure (nfree=0); the
        // GetLocal+Closure pair for capturing `a` lives in the outer
        // function's own body, held as a CompiledFunction constant.
        let outer_body = bytecode
            .constants
            .iter()
            .find_map(|c| match c {
                Value::CompiledFunction(f) => Some(&f.instructions),
                _ => None,
            })
            .expect("expected a CompiledFunction constant for the outer fn");

        let closure_pos = outer_body
            .iter()
            .position(|&b| b == Op::Closure as u8)
            .expect("expected a Closure instruction building the inner function");
        assert_eq!(outer_body[closure_pos - 2], Op::GetLocal as u8);
        assert_eq!(outer_body[closure_pos - 1], 0);
    }

    #[test]
    fn test_let_bound_recursive_function_compiles() {
        // Must not error resolving `fibonacci` inside its own body.
        let _ = compile(
            "let fibonacci = fn(x) { if (x == 0) { 0 } else { fibonacci(x - 1) } }; fibonacci(1);",
        );
    }

    #[test]
    fn test_undefined_variable_is_a_compile_error() {
        let (program, _, _) = parse("foo;");
        let mut compiler = Compiler::new();
        let err = compiler.compile_program(&program).unwrap_err();
        assert_eq!(err, CompileError::UndefinedVariable { name: "foo".to_string() });
    }

    #[test]
    fn test_let_value_compiles_before_name_is_defined() {
        // `x` on the right-hand side must still resolve to the *previous*
        // binding, so the value is compiled against the old symbol table.
        let bytecode = compile("let x = 5; let x = x + 1;");

        let get_global_pos =
            bytecode.instructions.windows(3).position(|w| w[0] == Op::GetGlobal as u8 && w[1] == 0 && w[2] == 0);
        assert!(get_global_pos.is_some(), "expected a GetGlobal 0 reading the prior `x` binding");

        let set_global_positions: Vec<usize> = bytecode
            .instructions
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == Op::SetGlobal as u8)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(set_global_positions.len(), 2, "expected two SetGlobal instructions, one per `let x`");
        assert!(
            get_global_pos.unwrap() < set_global_positions[1],
            "the GetGlobal reading `x` must precede the second SetGlobal that redefines it"
        );
    }

    #[test]
    fn test_let_self_reference_before_definition_is_undefined_variable() {
        let (program, _, _) = parse("let x = x;");
        let mut compiler = Compiler::new();
        let err = compiler.compile_program(&program).unwrap_err();
        assert_eq!(err, CompileError::UndefinedVariable { name: "x".to_string() });
    }
}
