//! Number literal lexing.

use crate::lexer::{LexError, Lexer};
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex a decimal integer or float literal.
    ///
    /// Digits with no `.` form an integer; digits containing exactly one
    /// `.` form a float. A second `.` ends the literal, so `1.2.3` lexes
    /// as the float `1.2` followed by whatever `.3` turns into.
    pub(crate) fn lex_number(&mut self) -> Result<Token, LexError> {
        let start = self.cursor.position();
        let mut seen_dot = false;

        loop {
            let c = self.cursor.current_char();
            if c.is_ascii_digit() {
                self.cursor.advance();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.cursor.advance();
            } else {
                break;
            }
        }

        let text = self.cursor.slice_from(start);

        if seen_dot {
            let value = text.parse::<f64>().unwrap_or(0.0);
            Ok(self.token(TokenKind::Float(value)))
        } else {
            let value = text.parse::<i64>().unwrap_or(i64::MAX);
            Ok(self.token(TokenKind::Int(value)))
        }
    }

    /// Lex a `0b`/`0o`/`0x` prefixed integer literal.
    pub(crate) fn lex_radix_integer(&mut self) -> Result<Token, LexError> {
        self.cursor.advance(); // 0
        let base = match self.cursor.current_char() {
            'b' => 2,
            'o' => 8,
            _ => 16,
        };
        self.cursor.advance(); // b, o, x

        let start = self.cursor.position();
        while self.cursor.current_char().is_digit(base) {
            self.cursor.advance();
        }

        let digits = self.cursor.slice_from(start);
        if digits.is_empty() {
            return Err(LexError::IllegalCharacter {
                character: self.cursor.current_char(),
                position: self.cursor_position(),
            });
        }

        let value = i64::from_str_radix(digits, base).unwrap_or(i64::MAX);
        Ok(self.token(TokenKind::Int(value)))
    }
}
