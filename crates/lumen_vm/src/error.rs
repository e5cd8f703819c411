use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Unknown operator: {operator}")]
    UnknownOperator { operator: String },
}

pub type CompileResult<T> = Result<T, CompileError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("calling non-function/non-closure")]
    NotCallable,

    #[error("wrong number of arguments: want={want}, got={got}")]
    WrongArgumentCount { want: usize, got: usize },

    #[error("unsupported types for binary operation: {left} {operator} {right}")]
    UnsupportedBinaryTypes { left: String, operator: String, right: String },

    #[error("unknown operator: {operator} {operand}")]
    UnknownOperator { operator: String, operand: String },

    #[error("index operator not supported: {type_name}")]
    IndexNotSupported { type_name: String },

    #[error("unusable as hash key: {type_name}")]
    UnusableHashKey { type_name: String },

    #[error("unsupported type for negation: {type_name}")]
    UnsupportedNegation { type_name: String },
}

pub type VmResult<T> = Result<T, VmError>;
