//! Literate sources and layout-aware tokens
//!
//! `sections` pulls named code sections out of a Markdown-like document and links them into
//! compilable text; `token` turns that text into a stream of classified tokens, synthesizing
//! `IN`, `OUT` and `NEWLINE` tokens from the indentation of each line.

mod sections;
mod token;
mod tokenizer;

pub use crate::sections::{code_text, code_text_with_lines, extract, CodeNode, Section, SectionError};
pub use crate::token::{Ignored, Token, TokenConfig, TokenKind, RESERVED_BASE};
pub use crate::tokenizer::{Tokenizer, MAX_INDENT_DEPTH};
