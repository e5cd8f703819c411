pub mod ast;
pub mod error;
pub mod parser;

pub use ast::*;
pub use error::{ParseError, ParseResult};
pub use parser::Parser;

use lumen_lexer::tokenize as lex;

pub fn parse(source: &str) -> (Program, Vec<lumen_lexer::LexError>, Vec<ParseError>) {
    let (tokens, lex_errors) = lex(source);
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, lex_errors, parser.errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let (program, lex_errors, parse_errors) = parse(src);
        assert!(lex_errors.is_empty(), "lex errors: {:?}", lex_errors);
        assert!(parse_errors.is_empty(), "parse errors: {:?}", parse_errors);
        program
    }

    fn first_stmt(src: &str) -> StmtKind {
        parse_ok(src).statements.into_iter().next().unwrap().inner
    }

    fn first_expr(src: &str) -> ExprKind {
        match first_stmt(src) {
            StmtKind::Expression { expr } => expr.inner,
            StmtKind::Let { value, .. } => value.inner,
            other => panic!("expected Expression/Let, got {:?}", other),
        }
    }

    #[test]
    fn test_int_literal() {
        assert_eq!(first_expr("42;"), ExprKind::IntegerLiteral(42));
    }

    #[test]
    fn test_bool_literals() {
        assert_eq!(first_expr("true;"), ExprKind::Boolean(true));
        assert_eq!(first_expr("false;"), ExprKind::Boolean(false));
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(first_expr(r#""hello world";"#), ExprKind::StringLiteral("hello world".to_string()));
    }

    #[test]
    fn test_identifier() {
        assert_eq!(first_expr("foobar;"), ExprKind::Identifier("foobar".to_string()));
    }

    #[test]
    fn test_let_statement() {
        match first_stmt("let x = 5;") {
            StmtKind::Let { name, value } => {
                assert_eq!(name, "x");
                assert_eq!(value.inner, ExprKind::IntegerLiteral(5));
            }
            other => panic!("expected Let, got {:?}", other),
        }
    }

    #[test]
    fn test_return_statement() {
        match first_stmt("return 10;") {
            StmtKind::Return { value } => assert_eq!(value.inner, ExprKind::IntegerLiteral(10)),
            other => panic!("expected Return, got {:?}", other),
        }
    }

    #[test]
    fn test_prefix_expressions() {
        assert!(matches!(
            first_expr("!5;"),
            ExprKind::Prefix { operator: PrefixOp::Bang, .. }
        ));
        assert!(matches!(
            first_expr("-15;"),
            ExprKind::Prefix { operator: PrefixOp::Minus, .. }
        ));
    }

    #[test]
    fn test_infix_expressions() {
        let cases = [
            ("5 + 5;", InfixOp::Add),
            ("5 - 5;", InfixOp::Sub),
            ("5 * 5;", InfixOp::Mul),
            ("5 / 5;", InfixOp::Div),
            ("5 > 5;", InfixOp::Gt),
            ("5 < 5;", InfixOp::Lt),
            ("5 == 5;", InfixOp::Eq),
            ("5 != 5;", InfixOp::NotEq),
        ];
        for (src, expected_op) in cases {
            match first_expr(src) {
                ExprKind::Infix { operator, .. } => assert_eq!(operator, expected_op, "for {}", src),
                other => panic!("expected Infix for {}, got {:?}", src, other),
            }
        }
    }

    #[test]
    fn test_operator_precedence() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        match first_expr("1 + 2 * 3;") {
            ExprKind::Infix { operator: InfixOp::Add, right, .. } => {
                assert!(matches!(right.inner, ExprKind::Infix { operator: InfixOp::Mul, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_grouped_expression() {
        match first_expr("(1 + 2) * 3;") {
            ExprKind::Infix { operator: InfixOp::Mul, left, .. } => {
                assert!(matches!(left.inner, ExprKind::Infix { operator: InfixOp::Add, .. }));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_if_expression() {
        match first_expr("if (x < y) { x }") {
            ExprKind::If { alternative, consequence, .. } => {
                assert!(alternative.is_none());
                assert_eq!(consequence.statements.len(), 1);
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_if_else_expression() {
        match first_expr("if (x < y) { x } else { y }") {
            ExprKind::If { alternative, .. } => assert!(alternative.is_some()),
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_function_literal() {
        match first_expr("fn(x, y) { x + y; }") {
            ExprKind::FunctionLiteral { parameters, body, .. } => {
                assert_eq!(parameters, vec!["x".to_string(), "y".to_string()]);
                assert_eq!(body.statements.len(), 1);
            }
            other => panic!("expected FunctionLiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_let_bound_function_literal_gets_self_reference_name() {
        match first_stmt("let counter = fn(x) { counter(x); };") {
            StmtKind::Let { value, .. } => match value.inner {
                ExprKind::FunctionLiteral { name, .. } => assert_eq!(name, Some("counter".to_string())),
                other => panic!("expected FunctionLiteral, got {:?}", other),
            },
            other => panic!("expected Let, got {:?}", other),
        }
    }

    #[test]
    fn test_call_expression() {
        match first_expr("add(1, 2 * 3, 4 + 5);") {
            ExprKind::Call { arguments, .. } => assert_eq!(arguments.len(), 3),
            other => panic!("expected Call, got {:?}", other),
        }
    }

    #[test]
    fn test_array_literal() {
        match first_expr("[1, 2 * 2, 3 + 3];") {
            ExprKind::ArrayLiteral(elements) => assert_eq!(elements.len(), 3),
            other => panic!("expected ArrayLiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_index_expression() {
        match first_expr("myArray[1 + 1];") {
            ExprKind::Index { .. } => {}
            other => panic!("expected Index, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_literal_preserves_order() {
        match first_expr(r#"{"one": 1, "two": 2, "three": 3};"#) {
            ExprKind::HashLiteral(pairs) => {
                assert_eq!(pairs.len(), 3);
                assert_eq!(pairs[0].0.inner, ExprKind::StringLiteral("one".to_string()));
                assert_eq!(pairs[2].0.inner, ExprKind::StringLiteral("three".to_string()));
            }
            other => panic!("expected HashLiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_hash_literal() {
        match first_expr("{};") {
            ExprKind::HashLiteral(pairs) => assert!(pairs.is_empty()),
            other => panic!("expected HashLiteral, got {:?}", other),
        }
    }

    #[test]
    fn test_error_recovery_continues_parsing() {
        let (program, _, parse_errors) = parse("let = 5; let y = 10;");
        assert!(!parse_errors.is_empty());
        assert_eq!(program.statements.len(), 2);
        assert!(matches!(program.statements[1].inner, StmtKind::Let { ref name, .. } if name == "y"));
    }

    #[test]
    fn test_full_program() {
        let src = r#"
            let five = 5;
            let add = fn(x, y) { x + y; };
            let result = add(five, 10);
            if (result > 10) {
                puts("big");
            } else {
                puts("small");
            }
        "#;
        let program = parse_ok(src);
        assert_eq!(program.statements.len(), 4);
    }
}
