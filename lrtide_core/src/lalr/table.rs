use lrtide_scan::Ignored;

use crate::lalr::{Automaton, LineLike, SymbolId};

/// Parse actions of a single state, in the shape the runtime consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableState {
    /// Transitions sorted by symbol
    pub go_to: Vec<(SymbolId, usize)>,
    pub reduce_prod: Option<usize>,
    pub reduce_size: usize,
    pub reduce_sym: SymbolId,
    pub starts_line: bool,
    /// The reduction may only happen at a line boundary
    pub newline_only: bool,
    pub min_prefix: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub states: Vec<TableState>,
    /// Literal terminals in the order the tokenizer has to know them
    pub known: Vec<String>,
    /// Symbol names indexed by symbol id
    pub names: Vec<String>,
    /// Token categories the tokenizer should drop
    pub ignored: Ignored,
}

impl<'g> Automaton<'g> {
    pub fn table(&self) -> Table {
        let grammar = self.grammar;
        let states = self
            .states
            .iter()
            .map(|state| {
                let production = state.reduce.map(|prod| &grammar.productions[prod]);
                TableState {
                    go_to: state.go_to.iter().map(|(sym, target)| (*sym, *target)).collect(),
                    reduce_prod: state.reduce,
                    reduce_size: production.map_or(0, |p| p.body.len()),
                    reduce_sym: production.map_or(0, |p| p.head),
                    starts_line: state.starts_line,
                    newline_only: production.map_or(false, |p| p.line_like != LineLike::None),
                    min_prefix: state.min_prefix,
                }
            })
            .collect();

        Table {
            states,
            known: grammar.known.clone(),
            names: grammar.symbols.iter().map(|s| s.name.clone()).collect(),
            ignored: grammar.ignored_tokens(),
        }
    }
}
