use std::fmt;

use crate::lalr::Precedence;

pub type SymbolId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolKind {
    /// Mentioned in a production body but not yet seen as a head
    Unknown,
    /// Only carries a precedence for `$$name` markers
    Virtual,
    Terminal,
    Nonterminal,
}

/// Semantic value type of a nonterminal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// `$ Type`: stored behind a `Box`
    Boxed(String),
    /// `$* Type`: stored by value
    Plain(String),
}

impl ValueType {
    pub fn name(&self) -> &str {
        match self {
            ValueType::Boxed(name) | ValueType::Plain(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub num: SymbolId,
    pub precedence: Option<Precedence>,
    pub nullable: bool,
    /// Spans can only be closed by a layout boundary
    pub line_like: bool,
    pub first_production: Option<usize>,
    pub value_type: Option<ValueType>,
    /// Line of the first mention in the grammar
    pub line: usize,
}

impl Symbol {
    pub fn new(name: &str, kind: SymbolKind, num: SymbolId, line: usize) -> Self {
        Symbol {
            name: name.to_owned(),
            kind,
            num,
            precedence: None,
            nullable: false,
            line_like: false,
            first_production: None,
            value_type: None,
            line,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SymbolKind::Nonterminal
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}", self.name)
    }
}
