mod parser;
mod state;
mod traits;

pub use crate::parser::{parse, Parser};
pub use crate::state::{Goto, State};
pub use crate::traits::{Actions, TokenSource};

pub use lrtide_scan as scan;
pub use lrtide_scan::{Token, TokenConfig, TokenKind, Tokenizer};
