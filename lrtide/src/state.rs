/// Transition on a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Goto {
    pub sym: usize,
    pub state: usize,
}

/// One row of a generated parse table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State<'t> {
    /// Transitions, sorted by symbol
    pub go_to: &'t [Goto],
    pub reduce_prod: Option<usize>,
    pub reduce_size: usize,
    pub reduce_sym: usize,
    /// Some item expects a line-like symbol next
    pub starts_line: bool,
    /// The reduction must end at a line boundary
    pub newline_only: bool,
    /// Smallest non-zero dot among the kernel items
    pub min_prefix: usize,
}

impl<'t> State<'t> {
    pub fn goto(&self, sym: usize) -> Option<usize> {
        self.go_to
            .binary_search_by(|goto| goto.sym.cmp(&sym))
            .ok()
            .map(|idx| self.go_to[idx].state)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_goto_lookup() {
        let go_to = [
            Goto { sym: 1, state: 4 },
            Goto { sym: 12, state: 2 },
            Goto { sym: 15, state: 7 },
        ];
        let state = State {
            go_to: &go_to,
            reduce_prod: None,
            reduce_size: 0,
            reduce_sym: 0,
            starts_line: false,
            newline_only: false,
            min_prefix: 0,
        };
        assert_eq!(state.goto(12), Some(2));
        assert_eq!(state.goto(15), Some(7));
        assert_eq!(state.goto(3), None);
    }
}
