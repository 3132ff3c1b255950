use thiserror::Error;

/// Problem in a single grammar statement
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("line {line}: {name} is a terminal and cannot have productions")]
    TerminalHead { line: usize, name: String },
    #[error("line {line}: {name} is used both as a terminal and as a nonterminal")]
    ConflictingKind { line: usize, name: String },
    #[error("line {line}: {name} already has a precedence")]
    PrecedenceRedeclared { line: usize, name: String },
    #[error("line {line}: {name} is a nonterminal and cannot have a precedence")]
    PrecedenceOnNonterminal { line: usize, name: String },
    #[error("line {line}: virtual symbol {name} cannot appear in a production")]
    VirtualInBody { line: usize, name: String },
    #[error("line {line}: action code is not closed with `}}$`")]
    UnterminatedAction { line: usize },
    #[error("line {line}: {name} is used but has no productions")]
    Undefined { line: usize, name: String },
    #[error("grammar has no productions")]
    Empty,
}

impl GrammarError {
    pub fn line(&self) -> usize {
        match self {
            GrammarError::Syntax { line, .. }
            | GrammarError::TerminalHead { line, .. }
            | GrammarError::ConflictingKind { line, .. }
            | GrammarError::PrecedenceRedeclared { line, .. }
            | GrammarError::PrecedenceOnNonterminal { line, .. }
            | GrammarError::VirtualInBody { line, .. }
            | GrammarError::UnterminatedAction { line }
            | GrammarError::Undefined { line, .. } => *line,
            GrammarError::Empty => 0,
        }
    }
}

/// All problems found while reading a grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct GrammarErrors(pub Vec<GrammarError>);

fn join(errors: &[GrammarError]) -> String {
    errors
        .iter()
        .map(|err| err.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

impl GrammarErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
