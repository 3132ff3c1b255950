use std::fmt;

use bitflags::bitflags;

/// Symbol number of the first known word or mark
pub const RESERVED_BASE: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Error,
    Number,
    Ident,
    Mark,
    String,
    MultiString,
    LineComment,
    BlockComment,
    In,
    Out,
    Newline,
    Eof,
    /// Index into the sorted table of known words and marks
    Reserved(usize),
}

impl TokenKind {
    pub const PREDEFINED: [TokenKind; RESERVED_BASE] = [
        TokenKind::Error,
        TokenKind::Number,
        TokenKind::Ident,
        TokenKind::Mark,
        TokenKind::String,
        TokenKind::MultiString,
        TokenKind::LineComment,
        TokenKind::BlockComment,
        TokenKind::In,
        TokenKind::Out,
        TokenKind::Newline,
        TokenKind::Eof,
    ];

    /// Stable symbol number shared by the tokenizer, the grammar analyzer and the runtime
    pub fn num(self) -> usize {
        match self {
            TokenKind::Error => 0,
            TokenKind::Number => 1,
            TokenKind::Ident => 2,
            TokenKind::Mark => 3,
            TokenKind::String => 4,
            TokenKind::MultiString => 5,
            TokenKind::LineComment => 6,
            TokenKind::BlockComment => 7,
            TokenKind::In => 8,
            TokenKind::Out => 9,
            TokenKind::Newline => 10,
            TokenKind::Eof => 11,
            TokenKind::Reserved(idx) => RESERVED_BASE + idx,
        }
    }

    pub fn from_num(num: usize) -> TokenKind {
        if num >= RESERVED_BASE {
            TokenKind::Reserved(num - RESERVED_BASE)
        } else {
            TokenKind::PREDEFINED[num]
        }
    }

    /// Grammar name of a predefined kind; reserved kinds have no fixed name
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            TokenKind::Error => "ERROR",
            TokenKind::Number => "NUMBER",
            TokenKind::Ident => "IDENTIFIER",
            TokenKind::Mark => "MARK",
            TokenKind::String => "STRING",
            TokenKind::MultiString => "MULTI_STRING",
            TokenKind::LineComment => "LINE_COMMENT",
            TokenKind::BlockComment => "BLOCK_COMMENT",
            TokenKind::In => "IN",
            TokenKind::Out => "OUT",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Eof => "$eof",
            TokenKind::Reserved(_) => return None,
        };
        Some(name)
    }

    /// True for the tokens synthesized from indentation
    pub fn is_layout(self) -> bool {
        match self {
            TokenKind::In | TokenKind::Out | TokenKind::Newline => true,
            _ => false,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "RESERVED({})", self.num() - RESERVED_BASE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Index of the code node the token was read from
    pub node: usize,
    /// Byte offset into that node's text
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl<'a> Token<'a> {
    /// Synthetic token that carries no text
    pub fn synthetic(kind: TokenKind, line: usize, col: usize) -> Token<'a> {
        Token {
            kind,
            text: "",
            node: 0,
            offset: 0,
            line,
            col,
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}:{} {}", self.line, self.col, self.kind)?;
        if !self.text.is_empty() {
            write!(f, " {:?}", self.text)?;
        }
        Ok(())
    }
}

bitflags! {
    /// Token categories that are dropped before they reach the caller
    pub struct Ignored: u32 {
        const NUMBER = 1 << 0;
        const IDENT = 1 << 1;
        /// Unknown marks are reported as `Error` tokens instead
        const MARK = 1 << 2;
        const STRING = 1 << 3;
        const MULTI_STRING = 1 << 4;
        const LINE_COMMENT = 1 << 5;
        const BLOCK_COMMENT = 1 << 6;
        const IN = 1 << 7;
        const OUT = 1 << 8;
        const NEWLINE = 1 << 9;
        const LAYOUT = Self::IN.bits | Self::OUT.bits | Self::NEWLINE.bits;
        const COMMENTS = Self::LINE_COMMENT.bits | Self::BLOCK_COMMENT.bits;
    }
}

impl Ignored {
    pub fn covers(self, kind: TokenKind) -> bool {
        let flag = match kind {
            TokenKind::Number => Ignored::NUMBER,
            TokenKind::Ident => Ignored::IDENT,
            TokenKind::Mark => Ignored::MARK,
            TokenKind::String => Ignored::STRING,
            TokenKind::MultiString => Ignored::MULTI_STRING,
            TokenKind::LineComment => Ignored::LINE_COMMENT,
            TokenKind::BlockComment => Ignored::BLOCK_COMMENT,
            TokenKind::In => Ignored::IN,
            TokenKind::Out => Ignored::OUT,
            TokenKind::Newline => Ignored::NEWLINE,
            TokenKind::Error | TokenKind::Eof | TokenKind::Reserved(_) => return false,
        };
        self.contains(flag)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenConfig<'a> {
    pub ignored: Ignored,
    /// Extra characters that may start a word
    pub word_start: &'a str,
    /// Extra characters that may continue a word
    pub word_cont: &'a str,
    /// Known words and marks, sorted by byte order
    pub known: &'a [&'a str],
    /// Non-alphanumeric characters allowed inside numbers
    pub number_chars: &'a str,
}

impl<'a> Default for TokenConfig<'a> {
    fn default() -> Self {
        TokenConfig {
            ignored: Ignored::empty(),
            word_start: "",
            word_cont: "",
            known: &[],
            number_chars: "._+-",
        }
    }
}

impl<'a> TokenConfig<'a> {
    pub(crate) fn lookup(&self, text: &str) -> Option<usize> {
        self.known.binary_search(&text).ok()
    }

    pub(crate) fn is_word_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || self.word_start.contains(c)
    }

    pub(crate) fn is_word_cont(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || self.word_start.contains(c) || self.word_cont.contains(c)
    }

    pub(crate) fn is_mark(&self, c: char) -> bool {
        !c.is_whitespace()
            && !c.is_control()
            && !c.is_alphanumeric()
            && c != '_'
            && !self.word_start.contains(c)
            && !"'\"`".contains(c)
    }

    /// `#` only starts a comment when no known mark begins with it
    pub(crate) fn hash_comments(&self) -> bool {
        !self.known.iter().any(|known| known.starts_with('#'))
    }
}
