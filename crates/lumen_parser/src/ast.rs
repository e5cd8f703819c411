use lumen_lexer::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    pub inner: T,
    pub span: Span,
}

impl<T> Node<T> {
    pub fn new(inner: T, span: Span) -> Self {
        Node { inner, span }
    }
}

pub type Expr = Node<ExprKind>;
pub type Stmt = Node<StmtKind>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    IntegerLiteral(i64),
    Boolean(bool),
    StringLiteral(String),
    ArrayLiteral(Vec<Expr>),
    /// Pairs preserve source order; duplicate keys keep the last writer, as
    /// in ordinary map construction.
    HashLiteral(Vec<(Expr, Expr)>),
    Prefix {
        operator: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        operator: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    FunctionLiteral {
        /// Set when the literal appears on the right-hand side of `let name
        /// = fn(...) {...}`, enabling self-reference inside the body.
        name: Option<String>,
        parameters: Vec<String>,
        body: BlockStatement,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    /// Placeholder produced in place of an expression the parser could not
    /// make sense of, so parsing can recover and keep collecting errors.
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    NotEq,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let { name: String, value: Expr },
    Return { value: Expr },
    Expression { expr: Expr },
}
