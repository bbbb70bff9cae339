// Command parser for interactive sessions

pub mod ast;
pub mod command;
pub mod lexer;

// Public API re-exports
pub use ast::SessionCommand;
pub use command::{parse_command, parse_line};
