//! Core lexer implementation.
//!
//! The dispatch loop lives here; literal and operator scanning are split
//! into the sibling modules, each an `impl` block on [`Lexer`].

mod identifier;
mod number;
mod operator;
mod string;

use std::sync::Arc;

use thiserror::Error;

use lngc_util::Position;

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

/// Errors the lexer can produce. Both are fatal.
#[derive(Debug, Error)]
pub enum LexError {
    /// A character that starts no token.
    #[error("illegal character \"{character}\"")]
    IllegalCharacter {
        /// The offending character.
        character: char,
        /// Where it was found.
        position: Position,
    },

    /// A string literal interrupted by a newline or end of input.
    #[error("unclosed string")]
    UnclosedString {
        /// Position of the opening quote's line.
        position: Position,
    },
}

impl LexError {
    /// The source position the error points at.
    pub fn position(&self) -> &Position {
        match self {
            LexError::IllegalCharacter { position, .. } => position,
            LexError::UnclosedString { position } => position,
        }
    }
}

/// Lexer for lng source text.
pub struct Lexer<'a> {
    /// Character cursor over the source.
    pub(crate) cursor: Cursor<'a>,

    /// Name of the file being lexed, shared into every token position.
    file: Arc<str>,

    /// Line where the current token starts (1-based).
    token_line: u32,

    /// Column where the current token starts (1-based).
    token_column: u32,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for `source`, naming positions after `file_name`.
    pub fn new(file_name: &str, source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
            file: Arc::from(file_name),
            token_line: 1,
            token_column: 1,
        }
    }

    /// Lex the whole input into a token list ending with EOF.
    pub fn lex(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let at_end = token.kind == TokenKind::Eof;
            tokens.push(token);
            if at_end {
                return Ok(tokens);
            }
        }
    }

    /// Scan the next token.
    ///
    /// Skips whitespace and `//` comments, then dispatches on the first
    /// character of the token.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();

        self.token_line = self.cursor.line();
        self.token_column = self.cursor.column();

        if self.cursor.is_at_end() {
            return Ok(self.token(TokenKind::Eof));
        }

        match self.cursor.current_char() {
            '0' if matches!(self.cursor.peek_char(1), 'b' | 'o' | 'x') => self.lex_radix_integer(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.lex_identifier()),
            '"' => self.lex_string(),
            _ => self.lex_operator(),
        }
    }

    /// Skip whitespace and line comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current_char() {
                ' ' | '\t' | '\r' | '\n' => self.cursor.advance(),
                '/' if self.cursor.peek_char(1) == '/' => {
                    while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                        self.cursor.advance();
                    }
                },
                _ => return,
            }
        }
    }

    /// Build a token at the recorded start position.
    pub(crate) fn token(&self, kind: TokenKind) -> Token {
        Token::new(self.token_position(), kind)
    }

    /// The position where the current token starts.
    pub(crate) fn token_position(&self) -> Position {
        Position::new(self.file.clone(), self.token_line, self.token_column)
    }

    /// The current cursor position (not the token start).
    pub(crate) fn cursor_position(&self) -> Position {
        Position::new(self.file.clone(), self.cursor.line(), self.cursor.column())
    }
}
