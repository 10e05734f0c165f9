/*!
# Language Module

Lexical analysis for the calculator: raw text in, tokens out.

*/

#[macro_use]
mod error;
mod lex;
mod token;

pub use error::Error;
pub use error::ErrorCode;
pub use lex::lex;
pub use lex::Lexer;
pub use token::is_builtin_name;
pub use token::Operator;
pub use token::Token;
pub use token::BUILTIN_NAMES;
pub use token::MAX_TOKEN_LEN;
