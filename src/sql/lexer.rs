//! # SQL Lexer
//!
//! A zero-copy tokenizer for the rookdb dialect. Identifier and string
//! tokens borrow directly from the input; keywords are matched through a
//! compile-time perfect hash map, so lookup is O(1) with no collisions.
//!
//! Keywords are case-insensitive. String literals use single or double
//! quotes with no escape sequences, matching the quoting accepted by the
//! load-file format.

use eyre::{bail, ensure, Result};
use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    Where,
    And,
    Load,
    With,
    Index,
    Count,
    Key,
    Value,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "SELECT" => Keyword::Select,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "AND" => Keyword::And,
    "LOAD" => Keyword::Load,
    "WITH" => Keyword::With,
    "INDEX" => Keyword::Index,
    "COUNT" => Keyword::Count,
    "KEY" => Keyword::Key,
    "VALUE" => Keyword::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    Int(i32),
    Str(&'a str),
    Star,
    Comma,
    Semicolon,
    LParen,
    RParen,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Eof,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the whole input, ending with `Token::Eof`.
    pub fn tokenize(input: &'a str) -> Result<Vec<Token<'a>>> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<u8> {
        self.rest().bytes().next()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.rest().as_bytes().get(offset).copied()
    }

    pub fn next_token(&mut self) -> Result<Token<'a>> {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }

        let Some(b) = self.peek() else {
            return Ok(Token::Eof);
        };

        match b {
            b'*' => self.single(Token::Star),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b'=' => self.single(Token::Eq),
            b'<' => match self.peek_at(1) {
                Some(b'=') => self.double(Token::Le),
                Some(b'>') => self.double(Token::Ne),
                _ => self.single(Token::Lt),
            },
            b'>' => match self.peek_at(1) {
                Some(b'=') => self.double(Token::Ge),
                _ => self.single(Token::Gt),
            },
            b'!' => match self.peek_at(1) {
                Some(b'=') => self.double(Token::Ne),
                _ => bail!("unexpected character '!' at byte {}", self.pos),
            },
            b'\'' | b'"' => self.string_literal(b),
            b'-' => {
                ensure!(
                    matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()),
                    "unexpected character '-' at byte {}",
                    self.pos
                );
                self.number()
            }
            b if b.is_ascii_digit() => self.number(),
            b if b.is_ascii_alphabetic() || b == b'_' => Ok(self.ident()),
            other => bail!(
                "unexpected character '{}' at byte {}",
                other as char,
                self.pos
            ),
        }
    }

    fn single(&mut self, token: Token<'a>) -> Result<Token<'a>> {
        self.pos += 1;
        Ok(token)
    }

    fn double(&mut self, token: Token<'a>) -> Result<Token<'a>> {
        self.pos += 2;
        Ok(token)
    }

    fn ident(&mut self) -> Token<'a> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];
        match KEYWORDS.get(word.to_ascii_uppercase().as_str()) {
            Some(&keyword) => Token::Keyword(keyword),
            None => Token::Ident(word),
        }
    }

    fn number(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        let value = text
            .parse::<i32>()
            .map_err(|_| eyre::eyre!("integer literal '{}' out of range", text))?;
        Ok(Token::Int(value))
    }

    fn string_literal(&mut self, quote: u8) -> Result<Token<'a>> {
        let start = self.pos + 1;
        let mut end = start;
        while let Some(b) = self.input.as_bytes().get(end) {
            if *b == quote {
                self.pos = end + 1;
                return Ok(Token::Str(&self.input[start..end]));
            }
            end += 1;
        }
        bail!("unterminated string literal at byte {}", self.pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_select_statement() {
        let tokens = Lexer::tokenize("SELECT key FROM movies WHERE key >= 10;").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                Token::Keyword(Keyword::Key),
                Token::Keyword(Keyword::From),
                Token::Ident("movies"),
                Token::Keyword(Keyword::Where),
                Token::Keyword(Keyword::Key),
                Token::Ge,
                Token::Int(10),
                Token::Semicolon,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let tokens = Lexer::tokenize("select COUNT from").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Select),
                Token::Keyword(Keyword::Count),
                Token::Keyword(Keyword::From),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn string_literals_borrow_without_quotes() {
        let tokens = Lexer::tokenize("'hello world' \"double\"").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Str("hello world"), Token::Str("double"), Token::Eof]
        );
    }

    #[test]
    fn comparison_operators() {
        let tokens = Lexer::tokenize("= <> != < > <= >=").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Eq,
                Token::Ne,
                Token::Ne,
                Token::Lt,
                Token::Gt,
                Token::Le,
                Token::Ge,
                Token::Eof,
            ]
        );
    }

    #[test]
    fn negative_integers() {
        let tokens = Lexer::tokenize("-42 17").unwrap();
        assert_eq!(tokens, vec![Token::Int(-42), Token::Int(17), Token::Eof]);
    }

    #[test]
    fn out_of_range_integer_fails() {
        assert!(Lexer::tokenize("99999999999").is_err());
    }

    #[test]
    fn unterminated_string_fails() {
        assert!(Lexer::tokenize("'oops").is_err());
    }

    #[test]
    fn count_star_projection() {
        let tokens = Lexer::tokenize("count(*)").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Keyword(Keyword::Count),
                Token::LParen,
                Token::Star,
                Token::RParen,
                Token::Eof,
            ]
        );
    }
}
