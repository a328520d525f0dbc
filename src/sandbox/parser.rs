//! Recursive-descent / Pratt parser producing the [`super::ast::Expr`] tree.

use super::ast::{BinaryOp, Expr, LogicalOp, MemberKey, Stmt, UnaryOp};
use super::error::ExprError;
use super::lexer::{Lexer, Token};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

pub fn parse_expr(src: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_assignment()?;
    parser.expect_eof()?;
    Ok(expr)
}

pub fn parse_script(src: &str) -> Result<Vec<Stmt>, ExprError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let mut stmts = Vec::new();
    while !parser.check_eof() {
        stmts.push(parser.parse_stmt()?);
        parser.eat(&Token::Semicolon);
    }
    Ok(stmts)
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn check_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn eat(&mut self, tok: &Token) -> bool {
        if self.peek() == tok {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Token) -> Result<(), ExprError> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(ExprError::syntax(format!("expected {tok:?}, found {:?}", self.peek())))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ExprError> {
        if self.check_eof() {
            Ok(())
        } else {
            Err(ExprError::syntax(format!("unexpected trailing token {:?}", self.peek())))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ExprError> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(ExprError::syntax(format!("expected identifier, found {other:?}"))),
        }
    }

    // ---- script statements ----

    fn parse_stmt(&mut self) -> Result<Stmt, ExprError> {
        match self.peek() {
            Token::Keyword("const") | Token::Keyword("let") => {
                self.advance();
                let name = self.expect_ident()?;
                self.expect(&Token::Assign)?;
                let value = self.parse_assignment()?;
                Ok(Stmt::Let { name, value })
            }
            Token::Keyword("return") => {
                self.advance();
                if matches!(self.peek(), Token::Semicolon | Token::Eof) {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.parse_assignment()?)))
                }
            }
            _ => Ok(Stmt::Expr(self.parse_assignment()?)),
        }
    }

    // ---- expression grammar, lowest to highest precedence ----

    /// Tries an arrow-function head (`ident =>` or `(a, b) =>`) before
    /// falling back to the ordinary conditional-expression grammar. Arrow
    /// bodies are only ever reached as HOF call arguments (see
    /// `sandbox::evaluator`), but parsing them here keeps the grammar
    /// uniform instead of threading an "in-call-argument" parser mode.
    fn parse_assignment(&mut self) -> Result<Expr, ExprError> {
        if let Some(expr) = self.try_parse_arrow()? {
            return Ok(expr);
        }
        self.parse_conditional()
    }

    fn try_parse_arrow(&mut self) -> Result<Option<Expr>, ExprError> {
        let checkpoint = self.pos;
        let params = match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                vec![name]
            }
            Token::LParen => {
                self.advance();
                let mut names = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        names.push(self.expect_ident()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    if self.expect(&Token::RParen).is_err() {
                        self.pos = checkpoint;
                        return Ok(None);
                    }
                }
                names
            }
            _ => return Ok(None),
        };
        if !self.eat(&Token::Arrow) {
            self.pos = checkpoint;
            return Ok(None);
        }
        let body = self.parse_assignment()?;
        Ok(Some(Expr::Arrow {
            params,
            body: Box::new(body),
        }))
    }

    fn parse_conditional(&mut self) -> Result<Expr, ExprError> {
        let test = self.parse_logical_or()?;
        if self.eat(&Token::Question) {
            let consequent = self.parse_assignment()?;
            self.expect(&Token::Colon)?;
            let alternate = self.parse_assignment()?;
            Ok(Expr::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            })
        } else {
            Ok(test)
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_logical_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                op: LogicalOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_equality()?;
        while self.eat(&Token::And) {
            let right = self.parse_equality()?;
            left = Expr::Logical {
                op: LogicalOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                Token::StrictEq => BinaryOp::StrictEq,
                Token::StrictNotEq => BinaryOp::StrictNotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Lte => BinaryOp::Lte,
                Token::Gt => BinaryOp::Gt,
                Token::Gte => BinaryOp::Gte,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            Token::Not => {
                self.advance();
                Ok(Expr::Unary {
                    op: UnaryOp::Not,
                    expr: Box::new(self.parse_unary()?),
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ExprError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let name = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(MemberKey::Static(name)),
                    };
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.parse_assignment()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: Box::new(MemberKey::Computed(index)),
                    };
                }
                Token::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.eat(&Token::RParen) {
                        loop {
                            args.push(self.parse_assignment()?);
                            if !self.eat(&Token::Comma) {
                                break;
                            }
                        }
                        self.expect(&Token::RParen)?;
                    }
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.advance() {
            Token::Number(n) => Ok(Expr::Number(n)),
            Token::Str(s) => Ok(Expr::Str(s)),
            Token::True => Ok(Expr::Bool(true)),
            Token::False => Ok(Expr::Bool(false)),
            Token::Null => Ok(Expr::Null),
            Token::Ident(name) => Ok(Expr::Ident(name)),
            Token::LParen => {
                let expr = self.parse_assignment()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBracket => {
                let mut items = Vec::new();
                if !self.eat(&Token::RBracket) {
                    loop {
                        items.push(self.parse_assignment()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RBracket)?;
                }
                Ok(Expr::Array(items))
            }
            Token::LBrace => {
                let mut fields = Vec::new();
                if !self.eat(&Token::RBrace) {
                    loop {
                        let key = match self.advance() {
                            Token::Ident(name) => name,
                            Token::Str(s) => s,
                            other => return Err(ExprError::syntax(format!("expected object key, found {other:?}"))),
                        };
                        self.expect(&Token::Colon)?;
                        let value = self.parse_assignment()?;
                        fields.push((key, value));
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RBrace)?;
                }
                Ok(Expr::Object(fields))
            }
            other => Err(ExprError::syntax(format!("unexpected token {other:?}"))),
        }
    }
}
