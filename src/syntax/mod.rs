//! Lexical layer: token types, the host-language lexer, and the shared token
//! stream cursor macro parsers are written against.

pub mod lexer;
pub mod stream;
pub mod token;

pub use lexer::{tokenize, LineTable};
pub use stream::{TokenMatcher, TokenStream};
pub use token::{Position, Span, Token, TokenKind};
