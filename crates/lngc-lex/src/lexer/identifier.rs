//! Identifier and keyword lexing.

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex an identifier, reclassifying reserved words as keywords.
    ///
    /// Identifiers match `[A-Za-z_][A-Za-z0-9_]*`.
    pub(crate) fn lex_identifier(&mut self) -> Token {
        let start = self.cursor.position();

        loop {
            let c = self.cursor.current_char();
            if !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            self.cursor.advance();
        }

        let text = self.cursor.slice_from(start);

        match TokenKind::keyword(text) {
            Some(keyword) => self.token(keyword),
            None => self.token(TokenKind::Ident(text.to_string())),
        }
    }
}
