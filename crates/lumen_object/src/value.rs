use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use lumen_parser::{BlockStatement, Expr};

use crate::environment::Environment;

/// A compiled function body: a flat instruction stream plus the frame shape
/// it expects. Produced by the compiler, consumed by the VM.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A VM-level closure: an immutable compiled body plus the free variables it
/// captured at the point `OpClosure` built it.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Value>,
}

/// An interpreter-level function value: the defining environment is held by
/// reference so later mutations (e.g. further `let` bindings in the same
/// scope) remain visible to the closure.
#[derive(Clone)]
pub struct Function {
    pub parameters: Vec<String>,
    pub body: BlockStatement,
    pub env: Rc<RefCell<Environment>>,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("parameters", &self.parameters).finish()
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.env, &other.env) && self.parameters == other.parameters
    }
}

pub type BuiltinFn = fn(&[Value]) -> Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    String(String),
}

impl fmt::Display for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashKey::Integer(v) => write!(f, "{v}"),
            HashKey::Boolean(v) => write!(f, "{v}"),
            HashKey::String(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    String(Rc<str>),
    Null,
    Array(Rc<Vec<Value>>),
    /// Insertion-ordered so `inspect()` and REPL output match what the user wrote.
    Hash(Rc<IndexMap<HashKey, (Value, Value)>>),
    Function(Rc<Function>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(BuiltinFn),
    Quote(Expr),
    ReturnValue(Box<Value>),
    Error(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Boolean(_) => "BOOLEAN",
            Value::String(_) => "STRING",
            Value::Null => "NULL",
            Value::Array(_) => "ARRAY",
            Value::Hash(_) => "HASH",
            Value::Function(_) => "FUNCTION",
            Value::CompiledFunction(_) => "COMPILED_FUNCTION_OBJ",
            Value::Closure(_) => "CLOSURE",
            Value::Builtin(_) => "BUILTIN",
            Value::Quote(_) => "QUOTE",
            Value::ReturnValue(_) => "RETURN_VALUE",
            Value::Error(_) => "ERROR",
        }
    }

    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(v) => Some(HashKey::Integer(*v)),
            Value::Boolean(v) => Some(HashKey::Boolean(*v)),
            Value::String(v) => Some(HashKey::String(v.to_string())),
            _ => None,
        }
    }

    pub fn inspect(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::Boolean(v) => v.to_string(),
            Value::String(v) => v.to_string(),
            Value::Null => "null".to_string(),
            Value::Array(elements) => {
                let parts: Vec<String> = elements.iter().map(Value::inspect).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Hash(pairs) => {
                let parts: Vec<String> = pairs
                    .values()
                    .map(|(k, v)| format!("{}: {}", k.inspect(), v.inspect()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Function(func) => {
                format!("fn({}) {{\n...\n}}", func.parameters.join(", "))
            }
            Value::CompiledFunction(_) => "CompiledFunction[...]".to_string(),
            Value::Closure(_) => "Closure[...]".to_string(),
            Value::Builtin(_) => "builtin function".to_string(),
            Value::Quote(_) => "QUOTE(...)".to_string(),
            Value::ReturnValue(inner) => inner.inspect(),
            Value::Error(msg) => format!("ERROR: {msg}"),
        }
    }
}

pub const TRUE: Value = Value::Boolean(true);
pub const FALSE: Value = Value::Boolean(false);
pub const NULL: Value = Value::Null;

pub fn native_bool(b: bool) -> Value {
    if b {
        TRUE
    } else {
        FALSE
    }
}
