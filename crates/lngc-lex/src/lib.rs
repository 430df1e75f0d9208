//! lngc-lex - Lexical analyzer for the lng language.
//!
//! The lexer transforms source text into a token list ending with an EOF
//! token. Classification is greedy, longest-match first: two-character
//! operators (`==`, `<=`, `<<`, `+=`, ...) are preferred over their
//! one-character prefixes, identifiers that match a reserved word are
//! reclassified as keywords, and `0b`/`0o`/`0x` prefixes select the
//! integer base.
//!
//! Lexing fails fast: the first illegal character or unclosed string is
//! returned as a [`LexError`] and the caller aborts compilation.

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::Cursor;
pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};
