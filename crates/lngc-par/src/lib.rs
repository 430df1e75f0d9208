//! lngc-par - Recursive-descent parser for the lng language.
//!
//! The parser consumes the token list produced by `lngc-lex` and builds a
//! flat list of top-level declarations (`fn` and `let`). There is no
//! error recovery: the first token mismatch is returned as a
//! [`ParseError`] and compilation stops.
//!
//! Grammar summary:
//!
//! ```text
//! program     = { declaration } EOF
//! declaration = let_stmt | fn_stmt
//! fn_stmt     = 'fn' IDENT '(' [ IDENT {',' IDENT} ] ')' statement
//! let_stmt    = 'let' IDENT ['=' expression] ';'
//! statement   = block | let_stmt | if_stmt | while_stmt | do_while
//!             | return_stmt | assign_stmt | call ';'
//! ```
//!
//! Expression precedence, lowest binding first: bitwise or/xor, bitwise
//! and, shifts, logical and/or, comparisons, additive, multiplicative,
//! unary, primary.

pub mod ast;
mod expr;
pub mod pretty;
mod stmt;

pub use ast::{Ast, BinaryOp, Node, NodeKind, Param, UnaryOp};
pub use pretty::pretty_print;

use thiserror::Error;

use lngc_lex::{Token, TokenKind};
use lngc_util::Position;

/// Syntax errors. All are fatal; the parser stops at the first one.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A specific token was required but something else was found.
    #[error("\"{expected}\" expected")]
    Expected {
        /// Description of the expected token.
        expected: String,
        /// Where the mismatch occurred.
        position: Position,
    },

    /// A token that cannot start an expression.
    #[error("invalid syntax: \"{token}\"")]
    InvalidSyntax {
        /// The offending token's source value.
        token: String,
        /// Where it occurred.
        position: Position,
    },

    /// A token that cannot start a statement or declaration.
    #[error("unexpected \"{token}\"")]
    Unexpected {
        /// The offending token's source value.
        token: String,
        /// Where it occurred.
        position: Position,
    },

    /// A statement that follows `return` inside the same block.
    #[error("unreachable statement")]
    UnreachableStatement {
        /// Where the dead statement starts.
        position: Position,
    },
}

impl ParseError {
    /// The source position the error points at.
    pub fn position(&self) -> &Position {
        match self {
            ParseError::Expected { position, .. }
            | ParseError::InvalidSyntax { position, .. }
            | ParseError::Unexpected { position, .. }
            | ParseError::UnreachableStatement { position } => position,
        }
    }
}

/// Recursive-descent parser over a token list.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a parser for `tokens`.
    ///
    /// The lexer guarantees the list ends with an EOF token; an empty
    /// list is treated as immediate EOF.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(Position::dummy(), TokenKind::Eof));
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parse the whole program into an AST.
    pub fn parse(mut self) -> Result<Ast, ParseError> {
        let mut ast = Vec::new();
        while !self.check(&TokenKind::Eof) {
            ast.push(self.declaration()?);
        }
        Ok(ast)
    }

    /// Parse a top-level declaration: `fn` or `let`.
    fn declaration(&mut self) -> Result<Node, ParseError> {
        match self.current().kind {
            TokenKind::Let => self.let_statement(),
            TokenKind::Fn => self.fn_statement(),
            _ => Err(self.unexpected()),
        }
    }

    /// The token under the cursor. Never advances past EOF.
    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    /// One token of lookahead.
    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[(self.position + 1).min(self.tokens.len() - 1)]
    }

    /// Move to the next token, clamping at EOF.
    pub(crate) fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    /// Whether the current token is of the same kind as `kind`.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.current().kind.same_kind(kind)
    }

    /// Consume the current token if it matches `kind`, otherwise fail
    /// with a `"<kind>" expected` error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected: kind.to_string(),
                position: self.current().position.clone(),
            })
        }
    }

    /// Consume an identifier token and return its name and position.
    pub(crate) fn expect_ident(&mut self) -> Result<(String, Position), ParseError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let position = self.current().position.clone();
                self.advance();
                Ok((name, position))
            },
            _ => Err(ParseError::Expected {
                expected: "identifier".to_string(),
                position: self.current().position.clone(),
            }),
        }
    }

    /// An `unexpected "<token>"` error at the current token.
    pub(crate) fn unexpected(&self) -> ParseError {
        ParseError::Unexpected {
            token: self.current().kind.value_string(),
            position: self.current().position.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn parse_source(source: &str) -> Result<Ast, ParseError> {
    let tokens = lngc_lex::Lexer::new("test.lng", source)
        .lex()
        .expect("lexing failed");
    Parser::new(tokens).parse()
}
