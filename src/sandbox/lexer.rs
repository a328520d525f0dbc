//! Tokenizer for the restricted expression language (§4.1).

use super::error::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    Ident(String),
    Keyword(&'static str), // const, let, return, log (log is actually a call but kept as ident)
    // punctuation / operators
    Dot,
    Comma,
    Colon,
    Question,
    Semicolon,
    Arrow, // =>
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Not,
    Eof,
}

pub struct Lexer<'a> {
    chars: std::str::CharIndices<'a>,
    src: &'a str,
    peeked: Option<(usize, char)>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.char_indices(),
            src,
            peeked: None,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        if let Some(p) = self.peeked.take() {
            return Some(p);
        }
        self.chars.next()
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        if self.peeked.is_none() {
            self.peeked = self.chars.next();
        }
        self.peeked
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, ExprError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some((start, c)) = self.bump() else {
                tokens.push(Token::Eof);
                break;
            };
            let tok = match c {
                '.' => Token::Dot,
                ',' => Token::Comma,
                ':' => Token::Colon,
                ';' => Token::Semicolon,
                '?' => Token::Question,
                '(' => Token::LParen,
                ')' => Token::RParen,
                '[' => Token::LBracket,
                ']' => Token::RBracket,
                '{' => Token::LBrace,
                '}' => Token::RBrace,
                '+' => Token::Plus,
                '-' => Token::Minus,
                '*' => Token::Star,
                '%' => Token::Percent,
                '/' => Token::Slash,
                '=' => {
                    if self.eat('=') {
                        if self.eat('=') {
                            Token::StrictEq
                        } else {
                            Token::Eq
                        }
                    } else if self.eat('>') {
                        Token::Arrow
                    } else {
                        Token::Assign
                    }
                }
                '!' => {
                    if self.eat('=') {
                        if self.eat('=') {
                            Token::StrictNotEq
                        } else {
                            Token::NotEq
                        }
                    } else {
                        Token::Not
                    }
                }
                '<' => {
                    if self.eat('=') {
                        Token::Lte
                    } else {
                        Token::Lt
                    }
                }
                '>' => {
                    if self.eat('=') {
                        Token::Gte
                    } else {
                        Token::Gt
                    }
                }
                '&' => {
                    if self.eat('&') {
                        Token::And
                    } else {
                        return Err(ExprError::syntax("unexpected '&'"));
                    }
                }
                '|' => {
                    if self.eat('|') {
                        Token::Or
                    } else {
                        return Err(ExprError::syntax("unexpected '|'"));
                    }
                }
                '\'' | '"' => Token::Str(self.read_string(c)?),
                '0'..='9' => self.read_number(start)?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.read_ident(start),
                other => return Err(ExprError::syntax(format!("unexpected character '{other}'"))),
            };
            tokens.push(tok);
        }
        Ok(tokens)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek().map(|(_, c)| c) == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some((_, c)) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn read_string(&mut self, quote: char) -> Result<String, ExprError> {
        let mut s = String::new();
        loop {
            match self.bump() {
                Some((_, c)) if c == quote => break,
                Some((_, '\\')) => match self.bump() {
                    Some((_, 'n')) => s.push('\n'),
                    Some((_, 't')) => s.push('\t'),
                    Some((_, c)) => s.push(c),
                    None => return Err(ExprError::syntax("unterminated string escape")),
                },
                Some((_, c)) => s.push(c),
                None => return Err(ExprError::syntax("unterminated string literal")),
            }
        }
        Ok(s)
    }

    fn read_number(&mut self, start: usize) -> Result<Token, ExprError> {
        let mut end = start + 1;
        while let Some((i, c)) = self.peek() {
            if c.is_ascii_digit() || c == '.' {
                end = i + c.len_utf8();
                self.bump();
            } else {
                break;
            }
        }
        self.src[start..end]
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| ExprError::syntax("invalid number literal"))
    }

    fn read_ident(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        while let Some((i, c)) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '$' {
                end = i + c.len_utf8();
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..end];
        match word {
            "true" => Token::True,
            "false" => Token::False,
            "null" | "undefined" => Token::Null,
            "const" => Token::Keyword("const"),
            "let" => Token::Keyword("let"),
            "return" => Token::Keyword("return"),
            other => Token::Ident(other.to_string()),
        }
    }
}
