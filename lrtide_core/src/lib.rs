mod error;
mod lalr;
mod reader;

pub use crate::error::{GrammarError, GrammarErrors};
pub use crate::lalr::grammar::{EOF, NEWLINE};
pub use crate::lalr::*;
