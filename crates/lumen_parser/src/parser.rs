use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use lumen_lexer::{Span, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Lowest = 0,
    Equals = 1,
    LessGreater = 2,
    Sum = 3,
    Product = 4,
    Prefix = 5,
    Call = 6,
    Index = 7,
}

fn precedence_of(kind: &TokenKind) -> Prec {
    match kind {
        TokenKind::EqualEqual | TokenKind::BangEqual => Prec::Equals,
        TokenKind::Less | TokenKind::Greater => Prec::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Prec::Sum,
        TokenKind::Star | TokenKind::Slash => Prec::Product,
        TokenKind::LParen => Prec::Call,
        TokenKind::LBracket => Prec::Index,
        _ => Prec::Lowest,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, errors: Vec::new() }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn current_span(&self) -> Span {
        self.peek().span.clone()
    }

    fn at(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind, label: &str) -> ParseResult<Token> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken {
                expected: label.to_string(),
                found: self.peek_kind().clone(),
                span: self.current_span(),
            })
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::Eof) {
            statements.push(self.parse_statement());
            if matches!(self.peek_kind(), TokenKind::Semicolon) {
                self.advance();
            }
        }
        Program { statements }
    }

    fn recover_to_semicolon(&mut self) {
        while !matches!(self.peek_kind(), TokenKind::Semicolon | TokenKind::Eof | TokenKind::RBrace) {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Stmt {
        let span = self.current_span();
        match self.peek_kind() {
            TokenKind::Let => self.parse_let_statement(span),
            TokenKind::Return => self.parse_return_statement(span),
            _ => self.parse_expression_statement(span),
        }
    }

    fn parse_let_statement(&mut self, span: Span) -> Stmt {
        self.advance(); // `let`
        let name = match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                name
            }
            found => {
                self.errors.push(ParseError::UnexpectedToken {
                    expected: "identifier".to_string(),
                    found,
                    span: self.current_span(),
                });
                self.recover_to_semicolon();
                return Node::new(
                    StmtKind::Expression { expr: Node::new(ExprKind::Error, span.clone()) },
                    span,
                );
            }
        };

        if let Err(e) = self.expect(&TokenKind::Equal, "'='") {
            self.errors.push(e);
            self.recover_to_semicolon();
            return Node::new(
                StmtKind::Let { name, value: Node::new(ExprKind::Error, span.clone()) },
                span,
            );
        }

        let mut value = self.parse_expression(Prec::Lowest);
        // A function literal bound directly by `let` can refer to itself by name.
        if let ExprKind::FunctionLiteral { name: fn_name, .. } = &mut value.inner {
            *fn_name = Some(name.clone());
        }

        Node::new(StmtKind::Let { name, value }, span)
    }

    fn parse_return_statement(&mut self, span: Span) -> Stmt {
        self.advance(); // `return`
        let value = self.parse_expression(Prec::Lowest);
        Node::new(StmtKind::Return { value }, span)
    }

    fn parse_expression_statement(&mut self, span: Span) -> Stmt {
        let expr = self.parse_expression(Prec::Lowest);
        Node::new(StmtKind::Expression { expr }, span)
    }

    /// Parses the body of a `{ ... }` block. The caller must already have
    /// consumed the opening brace.
    fn parse_block_statement(&mut self, span: Span) -> BlockStatement {
        let mut statements = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Eof) {
            statements.push(self.parse_statement());
            if matches!(self.peek_kind(), TokenKind::Semicolon) {
                self.advance();
            }
        }
        if self.at(&TokenKind::RBrace) {
            self.advance();
        } else {
            self.errors.push(ParseError::UnexpectedEof {
                expected: "'}'".to_string(),
                span: self.current_span(),
            });
        }
        BlockStatement { statements, span }
    }

    fn parse_expression(&mut self, precedence: Prec) -> Expr {
        let span = self.current_span();
        let mut left = match self.parse_prefix() {
            Ok(expr) => expr,
            Err(e) => {
                self.errors.push(e);
                self.advance();
                Node::new(ExprKind::Error, span)
            }
        };

        while !matches!(self.peek_kind(), TokenKind::Semicolon) && precedence < precedence_of(self.peek_kind()) {
            left = match self.peek_kind() {
                TokenKind::LParen => self.parse_call_expression(left),
                TokenKind::LBracket => self.parse_index_expression(left),
                _ => self.parse_infix_expression(left),
            };
        }

        left
    }

    fn parse_prefix(&mut self) -> ParseResult<Expr> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Node::new(ExprKind::Identifier(name), span))
            }
            TokenKind::IntLiteral(value) => {
                self.advance();
                Ok(Node::new(ExprKind::IntegerLiteral(value), span))
            }
            TokenKind::BoolLiteral(value) => {
                self.advance();
                Ok(Node::new(ExprKind::Boolean(value), span))
            }
            TokenKind::StringLiteral(value) => {
                self.advance();
                Ok(Node::new(ExprKind::StringLiteral(value), span))
            }
            TokenKind::Bang => {
                self.advance();
                let right = self.parse_expression(Prec::Prefix);
                Ok(Node::new(
                    ExprKind::Prefix { operator: PrefixOp::Bang, right: Box::new(right) },
                    span,
                ))
            }
            TokenKind::Minus => {
                self.advance();
                let right = self.parse_expression(Prec::Prefix);
                Ok(Node::new(
                    ExprKind::Prefix { operator: PrefixOp::Minus, right: Box::new(right) },
                    span,
                ))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expression(Prec::Lowest);
                self.expect(&TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_expression_list(&TokenKind::RBracket)?;
                Ok(Node::new(ExprKind::ArrayLiteral(elements), span))
            }
            TokenKind::LBrace => self.parse_hash_literal(span),
            TokenKind::If => self.parse_if_expression(span),
            TokenKind::Function => self.parse_function_literal(span),
            found => Err(ParseError::NoPrefixParseFn { found, span }),
        }
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Expr {
        let span = left.span.clone();
        let operator = match self.peek_kind() {
            TokenKind::Plus => InfixOp::Add,
            TokenKind::Minus => InfixOp::Sub,
            TokenKind::Star => InfixOp::Mul,
            TokenKind::Slash => InfixOp::Div,
            TokenKind::Less => InfixOp::Lt,
            TokenKind::Greater => InfixOp::Gt,
            TokenKind::EqualEqual => InfixOp::Eq,
            TokenKind::BangEqual => InfixOp::NotEq,
            _ => unreachable!("precedence_of only admits infix-capable tokens here"),
        };
        let precedence = precedence_of(self.peek_kind());
        self.advance();
        let right = self.parse_expression(precedence);
        Node::new(
            ExprKind::Infix { operator, left: Box::new(left), right: Box::new(right) },
            span,
        )
    }

    fn parse_call_expression(&mut self, function: Expr) -> Expr {
        let span = function.span.clone();
        self.advance(); // `(`
        let arguments = match self.parse_expression_list(&TokenKind::RParen) {
            Ok(args) => args,
            Err(e) => {
                self.errors.push(e);
                Vec::new()
            }
        };
        Node::new(ExprKind::Call { function: Box::new(function), arguments }, span)
    }

    fn parse_index_expression(&mut self, left: Expr) -> Expr {
        let span = left.span.clone();
        self.advance(); // `[`
        let index = self.parse_expression(Prec::Lowest);
        if let Err(e) = self.expect(&TokenKind::RBracket, "']'") {
            self.errors.push(e);
        }
        Node::new(ExprKind::Index { left: Box::new(left), index: Box::new(index) }, span)
    }

    fn parse_expression_list(&mut self, end: &TokenKind) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();
        if self.at(end) {
            self.advance();
            return Ok(list);
        }
        list.push(self.parse_expression(Prec::Lowest));
        while self.at(&TokenKind::Comma) {
            self.advance();
            list.push(self.parse_expression(Prec::Lowest));
        }
        self.expect(end, "closing delimiter")?;
        Ok(list)
    }

    fn parse_if_expression(&mut self, span: Span) -> ParseResult<Expr> {
        self.advance(); // `if`
        self.expect(&TokenKind::LParen, "'('")?;
        let condition = self.parse_expression(Prec::Lowest);
        self.expect(&TokenKind::RParen, "')'")?;
        let brace_span = self.expect(&TokenKind::LBrace, "'{'")?.span;
        let consequence = self.parse_block_statement(brace_span);

        let alternative = if self.at(&TokenKind::Else) {
            self.advance();
            let brace_span = self.expect(&TokenKind::LBrace, "'{'")?.span;
            Some(self.parse_block_statement(brace_span))
        } else {
            None
        };

        Ok(Node::new(
            ExprKind::If { condition: Box::new(condition), consequence, alternative },
            span,
        ))
    }

    fn parse_function_literal(&mut self, span: Span) -> ParseResult<Expr> {
        self.advance(); // `fn`
        self.expect(&TokenKind::LParen, "'('")?;
        let parameters = self.parse_function_parameters()?;
        let brace_span = self.expect(&TokenKind::LBrace, "'{'")?.span;
        let body = self.parse_block_statement(brace_span);
        Ok(Node::new(ExprKind::FunctionLiteral { name: None, parameters, body }, span))
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<String>> {
        let mut params = Vec::new();
        if self.at(&TokenKind::RParen) {
            self.advance();
            return Ok(params);
        }

        loop {
            match self.peek_kind().clone() {
                TokenKind::Identifier(name) => {
                    self.advance();
                    params.push(name);
                }
                found => {
                    return Err(ParseError::UnexpectedToken {
                        expected: "identifier".to_string(),
                        found,
                        span: self.current_span(),
                    })
                }
            }
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen, "')'")?;
        Ok(params)
    }

    fn parse_hash_literal(&mut self, span: Span) -> ParseResult<Expr> {
        self.advance(); // `{`
        let mut pairs = Vec::new();
        while !self.at(&TokenKind::RBrace) {
            let key = self.parse_expression(Prec::Lowest);
            self.expect(&TokenKind::Colon, "':'")?;
            let value = self.parse_expression(Prec::Lowest);
            pairs.push((key, value));
            if self.at(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBrace, "'}'")?;
        Ok(Node::new(ExprKind::HashLiteral(pairs), span))
    }
}
