//! String literal lexing.

use crate::lexer::{LexError, Lexer};
use crate::token::{Token, TokenKind};

impl<'a> Lexer<'a> {
    /// Lex a string literal.
    ///
    /// Strings open and close with `"` on the same line. Supported escape
    /// sequences are `\a \b \f \n \r \t \v \\ \"` plus an escaped line
    /// break; any other escape passes through unchanged as `\x`. An
    /// unescaped line break before the closing quote is an unclosed
    /// string, as is end of input.
    pub(crate) fn lex_string(&mut self) -> Result<Token, LexError> {
        let open_position = self.token_position();
        self.cursor.advance(); // opening "

        let mut content = String::new();

        loop {
            if self.cursor.is_at_end() {
                return Err(LexError::UnclosedString {
                    position: open_position,
                });
            }

            match self.cursor.current_char() {
                '"' => {
                    self.cursor.advance();
                    return Ok(self.token(TokenKind::Str(content)));
                },
                '\n' => {
                    return Err(LexError::UnclosedString {
                        position: open_position,
                    });
                },
                '\\' => {
                    self.cursor.advance();
                    if self.cursor.is_at_end() {
                        return Err(LexError::UnclosedString {
                            position: open_position,
                        });
                    }
                    let escaped = self.cursor.current_char();
                    self.cursor.advance();
                    match escaped {
                        'a' => content.push('\x07'),
                        'b' => content.push('\x08'),
                        'f' => content.push('\x0C'),
                        'n' => content.push('\n'),
                        'r' => content.push('\r'),
                        't' => content.push('\t'),
                        'v' => content.push('\x0B'),
                        '\\' => content.push('\\'),
                        '"' => content.push('"'),
                        '\n' => content.push('\n'),
                        // Unknown escapes pass through untouched.
                        other => {
                            content.push('\\');
                            content.push(other);
                        },
                    }
                },
                c => {
                    content.push(c);
                    self.cursor.advance();
                },
            }
        }
    }
}
