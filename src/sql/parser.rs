//! # SQL Parser
//!
//! Recursive descent over the token stream. The grammar is small enough
//! to fit in one screen:
//!
//! ```text
//! statement   := select | load
//! select      := SELECT projection FROM ident [WHERE cond (AND cond)*]
//! projection  := KEY | VALUE | '*' | COUNT '(' '*' ')'
//! cond        := (KEY | VALUE) op literal
//! op          := '=' | '<>' | '!=' | '<' | '>' | '<=' | '>='
//! load        := LOAD ident FROM string [WITH INDEX]
//! ```
//!
//! A trailing semicolon is accepted and ignored.

use eyre::{bail, ensure, Result};

use super::ast::{
    Attr, CompareOp, Condition, Literal, LoadStatement, Projection, SelectStatement, Statement,
};
use super::lexer::{Keyword, Lexer, Token};

pub fn parse(input: &str) -> Result<Statement> {
    let tokens = Lexer::tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let statement = parser.statement()?;
    parser.expect_end()?;
    Ok(statement)
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token<'a> {
        self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.tokens[self.pos];
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: Token<'a>) -> bool {
        if self.peek() == token {
            self.advance();
            return true;
        }
        false
    }

    fn expect(&mut self, token: Token<'a>, what: &str) -> Result<()> {
        let found = self.advance();
        ensure!(found == token, "expected {}, found {:?}", what, found);
        Ok(())
    }

    fn statement(&mut self) -> Result<Statement> {
        match self.advance() {
            Token::Keyword(Keyword::Select) => self.select().map(Statement::Select),
            Token::Keyword(Keyword::Load) => self.load().map(Statement::Load),
            other => bail!("expected SELECT or LOAD, found {:?}", other),
        }
    }

    fn select(&mut self) -> Result<SelectStatement> {
        let projection = self.projection()?;
        self.expect(Token::Keyword(Keyword::From), "FROM")?;
        let table = self.table_name()?;

        let mut conditions = Vec::new();
        if self.eat(Token::Keyword(Keyword::Where)) {
            loop {
                conditions.push(self.condition()?);
                if !self.eat(Token::Keyword(Keyword::And)) {
                    break;
                }
            }
        }

        Ok(SelectStatement {
            projection,
            table,
            conditions,
        })
    }

    fn projection(&mut self) -> Result<Projection> {
        match self.advance() {
            Token::Keyword(Keyword::Key) => Ok(Projection::Key),
            Token::Keyword(Keyword::Value) => Ok(Projection::Value),
            Token::Star => Ok(Projection::All),
            Token::Keyword(Keyword::Count) => {
                self.expect(Token::LParen, "'('")?;
                self.expect(Token::Star, "'*'")?;
                self.expect(Token::RParen, "')'")?;
                Ok(Projection::Count)
            }
            other => bail!(
                "expected key, value, * or count(*) projection, found {:?}",
                other
            ),
        }
    }

    fn table_name(&mut self) -> Result<String> {
        match self.advance() {
            Token::Ident(name) => Ok(name.to_string()),
            other => bail!("expected table name, found {:?}", other),
        }
    }

    fn condition(&mut self) -> Result<Condition> {
        let attr = match self.advance() {
            Token::Keyword(Keyword::Key) => Attr::Key,
            Token::Keyword(Keyword::Value) => Attr::Value,
            other => bail!("expected key or value in condition, found {:?}", other),
        };

        let op = match self.advance() {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Gt => CompareOp::Gt,
            Token::Le => CompareOp::Le,
            Token::Ge => CompareOp::Ge,
            other => bail!("expected comparison operator, found {:?}", other),
        };

        let value = match self.advance() {
            Token::Int(n) => Literal::Int(n),
            Token::Str(s) => Literal::Str(s.to_string()),
            other => bail!("expected literal, found {:?}", other),
        };

        Ok(Condition { attr, op, value })
    }

    fn load(&mut self) -> Result<LoadStatement> {
        let table = self.table_name()?;
        self.expect(Token::Keyword(Keyword::From), "FROM")?;

        let file = match self.advance() {
            Token::Str(path) => path.to_string(),
            other => bail!("expected quoted file name, found {:?}", other),
        };

        let with_index = if self.eat(Token::Keyword(Keyword::With)) {
            self.expect(Token::Keyword(Keyword::Index), "INDEX")?;
            true
        } else {
            false
        };

        Ok(LoadStatement {
            table,
            file,
            with_index,
        })
    }

    fn expect_end(&mut self) -> Result<()> {
        self.eat(Token::Semicolon);
        let found = self.peek();
        ensure!(
            found == Token::Eof,
            "unexpected trailing input: {:?}",
            found
        );
        Ok(())
    }
}
