use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use lumen_object::builtins::lookup_builtin;
use lumen_object::{builtins, native_bool, Environment, Function, Value, FALSE, NULL, TRUE};
use lumen_parser::{BlockStatement, Expr, ExprKind, InfixOp, Node, PrefixOp, Program, Stmt, StmtKind};

use crate::modify::modify_expr;

/// A tree-walking implementation of the same language the compiler/VM
/// pipeline runs, used as a reference semantics and as the only path that
/// understands `quote`/`unquote`.
#[derive(Debug, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Evaluator
    }

    pub fn eval_program(&self, program: &Program, env: &Rc<RefCell<Environment>>) -> Value {
        let mut result = NULL;
        for stmt in &program.statements {
            result = self.eval_statement(stmt, env);
            match &result {
                Value::ReturnValue(inner) => return (**inner).clone(),
                Value::Error(_) => return result,
                _ => {}
            }
        }
        result
    }

    fn eval_block(&self, block: &BlockStatement, env: &Rc<RefCell<Environment>>) -> Value {
        let mut result = NULL;
        for stmt in &block.statements {
            result = self.eval_statement(stmt, env);
            if matches!(result, Value::ReturnValue(_) | Value::Error(_)) {
                return result;
            }
        }
        result
    }

    fn eval_statement(&self, stmt: &Stmt, env: &Rc<RefCell<Environment>>) -> Value {
        match &stmt.inner {
            StmtKind::Expression { expr } => self.eval_expr(expr, env),
            StmtKind::Let { name, value } => {
                let evaluated = self.eval_expr(value, env);
                if evaluated.is_error() {
                    return evaluated;
                }
                env.borrow_mut().set(name.clone(), evaluated);
                NULL
            }
            StmtKind::Return { value } => {
                let evaluated = self.eval_expr(value, env);
                if evaluated.is_error() {
                    return evaluated;
                }
                Value::ReturnValue(Box::new(evaluated))
            }
        }
    }

    fn eval_expr(&self, expr: &Expr, env: &Rc<RefCell<Environment>>) -> Value {
        match &expr.inner {
            ExprKind::IntegerLiteral(value) => Value::Integer(*value),
            ExprKind::StringLiteral(value) => Value::String(Rc::from(value.as_str())),
            ExprKind::Boolean(value) => native_bool(*value),
            ExprKind::Prefix { operator, right } => {
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                self.eval_prefix(*operator, right)
            }
            ExprKind::Infix { operator, left, right } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let right = self.eval_expr(right, env);
                if right.is_error() {
                    return right;
                }
                self.eval_infix(*operator, left, right)
            }
            ExprKind::If { condition, consequence, alternative } => {
                let condition = self.eval_expr(condition, env);
                if condition.is_error() {
                    return condition;
                }
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    NULL
                }
            }
            ExprKind::Identifier(name) => self.eval_identifier(name, env),
            ExprKind::FunctionLiteral { parameters, body, .. } => {
                Value::Function(Rc::new(Function { parameters: parameters.clone(), body: body.clone(), env: env.clone() }))
            }
            ExprKind::Call { function, arguments } => {
                if let ExprKind::Identifier(name) = &function.inner {
                    if name == "quote" {
                        return match arguments {
                            [argument] => self.eval_quote(argument, env),
                            _ => Value::Error(format!(
                                "wrong number of arguments to quote. got={}, want=1",
                                arguments.len()
                            )),
                        };
                    }
                }
                let function = self.eval_expr(function, env);
                if function.is_error() {
                    return function;
                }
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let evaluated = self.eval_expr(argument, env);
                    if evaluated.is_error() {
                        return evaluated;
                    }
                    args.push(evaluated);
                }
                self.apply_function(function, args)
            }
            ExprKind::ArrayLiteral(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    let evaluated = self.eval_expr(element, env);
                    if evaluated.is_error() {
                        return evaluated;
                    }
                    values.push(evaluated);
                }
                Value::Array(Rc::new(values))
            }
            ExprKind::HashLiteral(pairs) => self.eval_hash_literal(pairs, env),
            ExprKind::Index { left, index } => {
                let left = self.eval_expr(left, env);
                if left.is_error() {
                    return left;
                }
                let index = self.eval_expr(index, env);
                if index.is_error() {
                    return index;
                }
                self.eval_index(left, index)
            }
            ExprKind::Error => Value::Error("cannot evaluate a malformed expression".to_string()),
        }
    }

    fn eval_prefix(&self, operator: PrefixOp, right: Value) -> Value {
        match operator {
            PrefixOp::Bang => native_bool(!right.is_truthy()),
            PrefixOp::Minus => match right {
                Value::Integer(v) => Value::Integer(-v),
                other => Value::Error(format!("unknown operator: -{}", other.type_name())),
            },
        }
    }

    fn eval_infix(&self, operator: InfixOp, left: Value, right: Value) -> Value {
        match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => self.eval_integer_infix(operator, *l, *r),
            (Value::String(l), Value::String(r)) => match operator {
                InfixOp::Add => Value::String(Rc::from(format!("{l}{r}"))),
                _ => Value::Error(format!("unknown operator: STRING {} STRING", infix_symbol(operator))),
            },
            _ if operator == InfixOp::Eq => native_bool(left == right),
            _ if operator == InfixOp::NotEq => native_bool(left != right),
            _ if left.type_name() != right.type_name() => Value::Error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                infix_symbol(operator),
                right.type_name()
            )),
            _ => Value::Error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                infix_symbol(operator),
                right.type_name()
            )),
        }
    }

    fn eval_integer_infix(&self, operator: InfixOp, left: i64, right: i64) -> Value {
        match operator {
            InfixOp::Add => Value::Integer(left + right),
            InfixOp::Sub => Value::Integer(left - right),
            InfixOp::Mul => Value::Integer(left * right),
            InfixOp::Div => Value::Integer(left / right),
            InfixOp::Lt => native_bool(left < right),
            InfixOp::Gt => native_bool(left > right),
            InfixOp::Eq => native_bool(left == right),
            InfixOp::NotEq => native_bool(left != right),
        }
    }

    fn eval_identifier(&self, name: &str, env: &Rc<RefCell<Environment>>) -> Value {
        if let Some(value) = env.borrow().get(name) {
            return value;
        }
        if let Some(index) = lookup_builtin(name) {
            return builtins::get_builtin(index).expect("lookup_builtin only returns valid indexes");
        }
        Value::Error(format!("identifier not found: {name}"))
    }

    fn apply_function(&self, function: Value, args: Vec<Value>) -> Value {
        match function {
            Value::Function(func) => {
                if args.len() != func.parameters.len() {
                    return Value::Error(format!(
                        "wrong number of arguments. got={}, want={}",
                        args.len(),
                        func.parameters.len()
                    ));
                }
                let extended_env = Environment::enclosed(func.env.clone());
                for (param, arg) in func.parameters.iter().zip(args) {
                    extended_env.borrow_mut().set(param.clone(), arg);
                }
                let evaluated = self.eval_block(&func.body, &extended_env);
                match evaluated {
                    Value::ReturnValue(inner) => *inner,
                    other => other,
                }
            }
            Value::Builtin(func) => func(&args),
            other => Value::Error(format!("not a function: {}", other.type_name())),
        }
    }

    fn eval_index(&self, left: Value, index: Value) -> Value {
        match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    NULL
                } else {
                    elements[*i as usize].clone()
                }
            }
            (Value::Hash(map), _) => match index.hash_key() {
                Some(key) => map.get(&key).map(|(_, v)| v.clone()).unwrap_or(NULL),
                None => Value::Error(format!("unusable as hash key: {}", index.type_name())),
            },
            _ => Value::Error(format!("index operator not supported: {}", left.type_name())),
        }
    }

    fn eval_hash_literal(&self, pairs: &[(Expr, Expr)], env: &Rc<RefCell<Environment>>) -> Value {
        let mut map = IndexMap::new();
        for (key_expr, value_expr) in pairs {
            let key = self.eval_expr(key_expr, env);
            if key.is_error() {
                return key;
            }
            let value = self.eval_expr(value_expr, env);
            if value.is_error() {
                return value;
            }
            let Some(hash_key) = key.hash_key() else {
                return Value::Error(format!("unusable as hash key: {}", key.type_name()));
            };
            map.insert(hash_key, (key, value));
        }
        Value::Hash(Rc::new(map))
    }

    fn eval_quote(&self, node: &Expr, env: &Rc<RefCell<Environment>>) -> Value {
        let quoted = modify_expr(node.clone(), &mut |candidate| self.eval_unquote_call(candidate, env));
        Value::Quote(quoted)
    }

    fn eval_unquote_call(&self, node: Expr, env: &Rc<RefCell<Environment>>) -> Expr {
        let ExprKind::Call { function, arguments } = &node.inner else { return node };
        let ExprKind::Identifier(name) = &function.inner else { return node };
        if name != "unquote" || arguments.len() != 1 {
            return node;
        }
        let evaluated = self.eval_expr(&arguments[0], env);
        self.value_to_ast_node(evaluated, &node.span)
    }

    fn value_to_ast_node(&self, value: Value, span: &lumen_lexer::Span) -> Expr {
        match value {
            Value::Integer(v) => Node::new(ExprKind::IntegerLiteral(v), span.clone()),
            Value::Boolean(v) => Node::new(ExprKind::Boolean(v), span.clone()),
            Value::Quote(quoted) => quoted,
            _ => Node::new(ExprKind::Error, span.clone()),
        }
    }
}

fn infix_symbol(operator: InfixOp) -> &'static str {
    match operator {
        InfixOp::Add => "+",
        InfixOp::Sub => "-",
        InfixOp::Mul => "*",
        InfixOp::Div => "/",
        InfixOp::Lt => "<",
        InfixOp::Gt => ">",
        InfixOp::Eq => "==",
        InfixOp::NotEq => "!=",
    }
}
