use crate::error::{LexError, LexResult};
use crate::token::{lookup_keyword, Span, Token, TokenKind};

pub struct Lexer {
    source: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    pub errors: Vec<LexError>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.source.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn make_token(&self, kind: TokenKind, start: usize, start_col: usize, lexeme: &str) -> Token {
        Token::new(kind, Span::new(self.line, start_col, start, self.pos), lexeme)
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            if self.pos >= self.source.len() {
                tokens.push(Token::new(
                    TokenKind::Eof,
                    Span::new(self.line, self.column, self.pos, self.pos),
                    "",
                ));
                break;
            }
            let before = self.pos;
            match self.next_token() {
                Ok(tok) => tokens.push(tok),
                Err(e) => {
                    self.errors.push(e);
                    // `next_token` always consumes at least one character before
                    // failing, so the cursor has already moved past the bad input.
                    let lexeme: String = self.source[before..self.pos].iter().collect();
                    let ch = lexeme.chars().next().unwrap_or('\0');
                    tokens.push(self.make_token(TokenKind::Unknown(ch), before, self.column, &lexeme));
                }
            }
        }
        tokens
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> LexResult<Token> {
        let start = self.pos;
        let start_col = self.column;
        let ch = self.advance().expect("caller already checked for EOF");

        let kind = match ch {
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '!' => {
                if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Less,
            '>' => TokenKind::Greater,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '"' => return self.lex_string(start, start_col),
            c if c.is_ascii_digit() => return self.lex_number(c, start, start_col),
            c if is_letter(c) => return Ok(self.lex_identifier(c, start, start_col)),
            other => {
                return Err(LexError::UnexpectedCharacter {
                    ch: other,
                    span: Span::new(self.line, start_col, start, self.pos),
                })
            }
        };

        let lexeme: String = self.source[start..self.pos].iter().collect();
        Ok(self.make_token(kind, start, start_col, &lexeme))
    }

    fn lex_string(&mut self, start: usize, start_col: usize) -> LexResult<Token> {
        let mut content = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(LexError::UnterminatedString {
                        span: Span::new(self.line, start_col, start, self.pos),
                    })
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    content.push(c);
                    self.advance();
                }
            }
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        Ok(Token::new(
            TokenKind::StringLiteral(content),
            Span::new(self.line, start_col, start, self.pos),
            lexeme,
        ))
    }

    fn lex_number(&mut self, first: char, start: usize, start_col: usize) -> LexResult<Token> {
        let mut raw = String::new();
        raw.push(first);
        while self.peek().map_or(false, |c| c.is_ascii_digit()) {
            raw.push(self.advance().unwrap());
        }
        let lexeme: String = self.source[start..self.pos].iter().collect();
        let span = Span::new(self.line, start_col, start, self.pos);
        let val: i64 = raw.parse().map_err(|_| LexError::IntegerOverflow {
            text: raw.clone(),
            span: span.clone(),
        })?;
        Ok(Token::new(TokenKind::IntLiteral(val), span, lexeme))
    }

    fn lex_identifier(&mut self, first: char, start: usize, start_col: usize) -> Token {
        let mut name = String::new();
        name.push(first);
        while self.peek().map_or(false, is_letter) {
            name.push(self.advance().unwrap());
        }
        let kind = lookup_keyword(&name).unwrap_or(TokenKind::Identifier(name.clone()));
        Token::new(kind, Span::new(self.line, start_col, start, self.pos), name)
    }
}

/// Identifiers are `[A-Za-z_]+` — digits are deliberately excluded, matching
/// the language's `is_letter` contract.
fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}
