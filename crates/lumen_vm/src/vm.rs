use std::rc::Rc;

use lumen_object::builtins::get_builtin;
use lumen_object::{native_bool, Closure, CompiledFunction, Value, FALSE, NULL, TRUE};

use crate::compiler::Bytecode;
use crate::error::{VmError, VmResult};
use crate::opcode::{read_u16, Op};
use indexmap::IndexMap;

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

struct Frame {
    closure: Rc<Closure>,
    ip: i64,
    base_pointer: usize,
}

impl Frame {
    fn instructions(&self) -> &[u8] {
        &self.closure.func.instructions
    }
}

pub struct Vm {
    constants: Vec<Value>,
    stack: Vec<Value>,
    sp: usize,
    pub globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl Vm {
    pub fn new(bytecode: Bytecode) -> Self {
        Vm::with_globals(bytecode, vec![NULL; GLOBALS_SIZE])
    }

    /// Constructs a VM that reuses an existing globals table, the shape a
    /// REPL needs so `let` bindings from one line stay visible to the next.
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_fn = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure { func: Rc::new(main_fn), free: Vec::new() };
        let main_frame = Frame { closure: Rc::new(main_closure), ip: -1, base_pointer: 0 };

        Vm {
            constants: bytecode.constants,
            stack: vec![NULL; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![main_frame],
        }
    }

    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack[self.sp].clone()
    }

    fn current_frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("vm always has at least one frame")
    }

    fn push(&mut self, value: Value) -> VmResult<()> {
        if self.sp >= STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.stack[self.sp] = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Value {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    pub fn run(&mut self) -> VmResult<()> {
        self.run_inner().inspect_err(|e| tracing::debug!(error = %e, "vm run aborted"))
    }

    fn run_inner(&mut self) -> VmResult<()> {
        while (self.current_frame().ip as isize) < (self.current_frame().instructions().len() as isize - 1) {
            let frame_ip = (self.current_frame().ip + 1) as usize;
            let instructions = self.current_frame().instructions().to_vec();
            let op = Op::from_u8(instructions[frame_ip])
                .unwrap_or_else(|| panic!("corrupted instruction stream: unknown opcode {}", instructions[frame_ip]));
            self.current_frame().ip = frame_ip as i64;

            match op {
                Op::Constant => {
                    let idx = read_u16(&instructions, frame_ip + 1) as usize;
                    self.current_frame().ip += 2;
                    self.push(self.constants[idx].clone())?;
                }
                Op::Pop => {
                    self.pop();
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }
                Op::True => self.push(TRUE)?,
                Op::False => self.push(FALSE)?,
                Op::Null => self.push(NULL)?,
                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Op::Bang => {
                    let operand = self.pop();
                    self.push(native_bool(!operand.is_truthy()))?;
                }
                Op::Minus => {
                    let operand = self.pop();
                    match operand {
                        Value::Integer(v) => self.push(Value::Integer(-v))?,
                        other => return Err(VmError::UnsupportedNegation { type_name: other.type_name().to_string() }),
                    }
                }
                Op::JumpNotTruthy => {
                    let target = read_u16(&instructions, frame_ip + 1) as i64;
                    self.current_frame().ip += 2;
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame().ip = target - 1;
                    }
                }
                Op::Jump => {
                    let target = read_u16(&instructions, frame_ip + 1) as i64;
                    self.current_frame().ip = target - 1;
                }
                Op::SetGlobal => {
                    let idx = read_u16(&instructions, frame_ip + 1) as usize;
                    self.current_frame().ip += 2;
                    let value = self.pop();
                    self.globals[idx] = value;
                }
                Op::GetGlobal => {
                    let idx = read_u16(&instructions, frame_ip + 1) as usize;
                    self.current_frame().ip += 2;
                    self.push(self.globals[idx].clone())?;
                }
                Op::SetLocal => {
                    let idx = instructions[frame_ip + 1] as usize;
                    self.current_frame().ip += 1;
                    let base_pointer = self.current_frame().base_pointer;
                    let value = self.pop();
                    self.stack[base_pointer + idx] = value;
                }
                Op::GetLocal => {
                    let idx = instructions[frame_ip + 1] as usize;
                    self.current_frame().ip += 1;
                    let base_pointer = self.current_frame().base_pointer;
                    self.push(self.stack[base_pointer + idx].clone())?;
                }
                Op::GetBuiltin => {
                    let idx = instructions[frame_ip + 1] as usize;
                    self.current_frame().ip += 1;
                    let builtin = get_builtin(idx).expect("compiler never emits an out-of-range builtin index");
                    self.push(builtin)?;
                }
                Op::GetFree => {
                    let idx = instructions[frame_ip + 1] as usize;
                    self.current_frame().ip += 1;
                    let value = self.current_frame().closure.free[idx].clone();
                    self.push(value)?;
                }
                Op::CurrentClosure => {
                    let closure = self.current_frame().closure.clone();
                    self.push(Value::Closure(closure))?;
                }
                Op::Array => {
                    let n = read_u16(&instructions, frame_ip + 1) as usize;
                    self.current_frame().ip += 2;
                    let elements = self.stack[self.sp - n..self.sp].to_vec();
                    self.sp -= n;
                    self.push(Value::Array(Rc::new(elements)))?;
                }
                Op::Hash => {
                    let n = read_u16(&instructions, frame_ip + 1) as usize;
                    self.current_frame().ip += 2;
                    let entries = self.stack[self.sp - n..self.sp].to_vec();
                    self.sp -= n;
                    let mut map = IndexMap::new();
                    for pair in entries.chunks_exact(2) {
                        let key = pair[0]
                            .hash_key()
                            .ok_or_else(|| VmError::UnusableHashKey { type_name: pair[0].type_name().to_string() })?;
                        map.insert(key, (pair[0].clone(), pair[1].clone()));
                    }
                    self.push(Value::Hash(Rc::new(map)))?;
                }
                Op::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index_expression(left, index)?;
                }
                Op::Call => {
                    let nargs = instructions[frame_ip + 1] as usize;
                    self.current_frame().ip += 1;
                    self.execute_call(nargs)?;
                }
                Op::ReturnValue => {
                    let return_value = self.pop();
                    let frame = self.frames.pop().expect("ReturnValue always has a frame to unwind");
                    tracing::trace!(remaining = self.frames.len(), "popped frame");
                    self.sp = frame.base_pointer - 1;
                    self.push(return_value)?;
                }
                Op::Return => {
                    let frame = self.frames.pop().expect("Return always has a frame to unwind");
                    tracing::trace!(remaining = self.frames.len(), "popped frame");
                    self.sp = frame.base_pointer - 1;
                    self.push(NULL)?;
                }
                Op::Closure => {
                    let const_idx = read_u16(&instructions, frame_ip + 1) as usize;
                    let nfree = instructions[frame_ip + 3] as usize;
                    self.current_frame().ip += 3;
                    let func = match &self.constants[const_idx] {
                        Value::CompiledFunction(f) => f.clone(),
                        other => panic!("OpClosure constant index must be a CompiledFunction, got {:?}", other),
                    };
                    let free = self.stack[self.sp - nfree..self.sp].to_vec();
                    self.sp -= nfree;
                    self.push(Value::Closure(Rc::new(Closure { func, free })))?;
                }
            }
        }
        Ok(())
    }

    fn execute_binary_operation(&mut self, op: Op) -> VmResult<()> {
        let right = self.pop();
        let left = self.pop();
        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => {
                let result = match op {
                    Op::Add => l + r,
                    Op::Sub => l - r,
                    Op::Mul => l * r,
                    Op::Div => l / r,
                    _ => unreachable!("execute_binary_operation only called for arithmetic ops"),
                };
                self.push(Value::Integer(result))
            }
            (Value::String(l), Value::String(r)) if op == Op::Add => {
                self.push(Value::String(Rc::from(format!("{l}{r}"))))
            }
            _ => Err(VmError::UnsupportedBinaryTypes {
                left: left.type_name().to_string(),
                operator: op.name().to_string(),
                right: right.type_name().to_string(),
            }),
        }
    }

    fn execute_comparison(&mut self, op: Op) -> VmResult<()> {
        let right = self.pop();
        let left = self.pop();
        match op {
            Op::Equal => self.push(native_bool(left == right)),
            Op::NotEqual => self.push(native_bool(left != right)),
            Op::GreaterThan => match (&left, &right) {
                (Value::Integer(l), Value::Integer(r)) => self.push(native_bool(l > r)),
                _ => Err(VmError::UnsupportedBinaryTypes {
                    left: left.type_name().to_string(),
                    operator: "OpGreaterThan".to_string(),
                    right: right.type_name().to_string(),
                }),
            },
            _ => unreachable!("execute_comparison only called for Equal/NotEqual/GreaterThan"),
        }
    }

    fn execute_index_expression(&mut self, left: Value, index: Value) -> VmResult<()> {
        match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    self.push(NULL)
                } else {
                    self.push(elements[*i as usize].clone())
                }
            }
            (Value::Hash(map), _) => {
                let key = index
                    .hash_key()
                    .ok_or_else(|| VmError::UnusableHashKey { type_name: index.type_name().to_string() })?;
                self.push(map.get(&key).map(|(_, v)| v.clone()).unwrap_or(NULL))
            }
            _ => Err(VmError::IndexNotSupported { type_name: left.type_name().to_string() }),
        }
    }

    fn execute_call(&mut self, nargs: usize) -> VmResult<()> {
        let callee = self.stack[self.sp - 1 - nargs].clone();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, nargs),
            Value::Builtin(func) => {
                let args = &self.stack[self.sp - nargs..self.sp];
                let result = func(args);
                self.sp -= nargs + 1;
                self.push(result)
            }
            _ => Err(VmError::NotCallable),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, nargs: usize) -> VmResult<()> {
        if nargs != closure.func.num_parameters {
            return Err(VmError::WrongArgumentCount { want: closure.func.num_parameters, got: nargs });
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(VmError::StackOverflow);
        }
        let base_pointer = self.sp - nargs;
        let num_locals = closure.func.num_locals;
        self.frames.push(Frame { closure, ip: -1, base_pointer });
        tracing::trace!(depth = self.frames.len(), base_pointer, "pushed frame");
        self.sp = base_pointer + num_locals;
        Ok(())
    }
}
