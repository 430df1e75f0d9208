//! Operator and punctuation lexing.
//!
//! Two-character lexemes are preferred over their one-character prefixes.

use crate::lexer::{LexError, Lexer};
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex an operator or punctuation token.
    ///
    /// Anything that starts no operator is an illegal character.
    pub(crate) fn lex_operator(&mut self) -> Result<Token, LexError> {
        let c = self.cursor.current_char();
        self.cursor.advance();

        let kind = match c {
            '+' => {
                if self.cursor.match_char('=') {
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            },
            '-' => {
                if self.cursor.match_char('=') {
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            },
            '*' => {
                if self.cursor.match_char('=') {
                    TokenKind::StarEq
                } else {
                    TokenKind::Star
                }
            },
            '/' => {
                // `//` comments are consumed before dispatch.
                if self.cursor.match_char('=') {
                    TokenKind::SlashEq
                } else {
                    TokenKind::Slash
                }
            },
            '=' => {
                if self.cursor.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            },
            '!' => {
                if self.cursor.match_char('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            },
            '<' => {
                if self.cursor.match_char('=') {
                    TokenKind::LtEq
                } else if self.cursor.match_char('<') {
                    TokenKind::Shl
                } else {
                    TokenKind::Lt
                }
            },
            '>' => {
                if self.cursor.match_char('=') {
                    TokenKind::GtEq
                } else if self.cursor.match_char('>') {
                    TokenKind::Shr
                } else {
                    TokenKind::Gt
                }
            },
            '&' => {
                if self.cursor.match_char('&') {
                    TokenKind::AndAnd
                } else {
                    TokenKind::Ampersand
                }
            },
            '|' => {
                if self.cursor.match_char('|') {
                    TokenKind::OrOr
                } else {
                    TokenKind::Pipe
                }
            },
            '~' => TokenKind::Tilde,
            '^' => TokenKind::Caret,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            _ => {
                return Err(LexError::IllegalCharacter {
                    character: c,
                    position: self.token_position(),
                });
            },
        };

        Ok(self.token(kind))
    }
}
