use crate::lalr::{Item, Precedence, SetHandle, SortedSet, SymbolId};

/// A state of the LR automaton
#[derive(Debug, Clone)]
pub struct ItemSet {
    /// Items the state was created from, each with its lookahead set
    pub kernel: SortedSet<Item, SetHandle>,
    /// Kernel plus every item added by closure
    pub closure: SortedSet<Item, SetHandle>,
    pub go_to: SortedSet<SymbolId, usize>,
    /// Closure and transitions are up to date with the kernel lookaheads
    pub completed: bool,
    /// Precedence of the best reducible production
    pub precedence: Option<Precedence>,
    /// Some item expects a line-like symbol next
    pub starts_line: bool,
    /// Smallest non-zero dot among the kernel items
    pub min_prefix: usize,
    pub reduce: Option<usize>,
}

impl ItemSet {
    pub fn new(kernel: SortedSet<Item, SetHandle>) -> Self {
        ItemSet {
            kernel,
            closure: SortedSet::new(),
            go_to: SortedSet::new(),
            completed: false,
            precedence: None,
            starts_line: false,
            min_prefix: 0,
            reduce: None,
        }
    }

    pub fn goto(&self, sym: SymbolId) -> Option<usize> {
        self.go_to.get(&sym).cloned()
    }
}
