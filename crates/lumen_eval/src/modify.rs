use lumen_parser::{BlockStatement, Expr, ExprKind, Node, Stmt, StmtKind};

/// Recursively rewrites every child of `expr`, then applies `modifier` to the
/// (possibly rewritten) node itself, returning the modifier's result.
///
/// `unquote(expr)` detection only ever needs to inspect expressions, so
/// `modifier` is scoped to `Expr` rather than to every AST node type; the
/// traversal still walks statements to reach the expressions nested inside
/// them.
pub fn modify_expr(expr: Expr, modifier: &mut impl FnMut(Expr) -> Expr) -> Expr {
    let span = expr.span;
    let inner = match expr.inner {
        ExprKind::Prefix { operator, right } => {
            ExprKind::Prefix { operator, right: Box::new(modify_expr(*right, modifier)) }
        }
        ExprKind::Infix { operator, left, right } => ExprKind::Infix {
            operator,
            left: Box::new(modify_expr(*left, modifier)),
            right: Box::new(modify_expr(*right, modifier)),
        },
        ExprKind::Index { left, index } => {
            ExprKind::Index { left: Box::new(modify_expr(*left, modifier)), index: Box::new(modify_expr(*index, modifier)) }
        }
        ExprKind::If { condition, consequence, alternative } => ExprKind::If {
            condition: Box::new(modify_expr(*condition, modifier)),
            consequence: modify_block(consequence, modifier),
            alternative: alternative.map(|block| modify_block(block, modifier)),
        },
        ExprKind::FunctionLiteral { name, parameters, body } => {
            ExprKind::FunctionLiteral { name, parameters, body: modify_block(body, modifier) }
        }
        ExprKind::ArrayLiteral(elements) => {
            ExprKind::ArrayLiteral(elements.into_iter().map(|e| modify_expr(e, modifier)).collect())
        }
        ExprKind::HashLiteral(pairs) => ExprKind::HashLiteral(
            pairs.into_iter().map(|(k, v)| (modify_expr(k, modifier), modify_expr(v, modifier))).collect(),
        ),
        ExprKind::Call { function, arguments } => ExprKind::Call {
            function: Box::new(modify_expr(*function, modifier)),
            arguments: arguments.into_iter().map(|a| modify_expr(a, modifier)).collect(),
        },
        other @ (ExprKind::Identifier(_)
        | ExprKind::IntegerLiteral(_)
        | ExprKind::Boolean(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Error) => other,
    };
    modifier(Node::new(inner, span))
}

fn modify_block(block: BlockStatement, modifier: &mut impl FnMut(Expr) -> Expr) -> BlockStatement {
    BlockStatement {
        span: block.span,
        statements: block.statements.into_iter().map(|s| modify_stmt(s, modifier)).collect(),
    }
}

fn modify_stmt(stmt: Stmt, modifier: &mut impl FnMut(Expr) -> Expr) -> Stmt {
    let span = stmt.span;
    let inner = match stmt.inner {
        StmtKind::Let { name, value } => StmtKind::Let { name, value: modify_expr(value, modifier) },
        StmtKind::Return { value } => StmtKind::Return { value: modify_expr(value, modifier) },
        StmtKind::Expression { expr } => StmtKind::Expression { expr: modify_expr(expr, modifier) },
    };
    Node::new(inner, span)
}
