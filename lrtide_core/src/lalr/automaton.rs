use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;

use crate::lalr::grammar::NEWLINE;
use crate::lalr::{Grammar, Item, ItemSet, SetHandle, SetTable, SortedSet, SymSet};

/// How much lookahead information the automaton is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strength {
    Lr0,
    /// LR(0) states, but only reduce/reduce conflicts are reported
    Lr05,
    Slr,
    Lalr,
    Lr1,
}

impl Strength {
    fn uses_lookahead(self) -> bool {
        self >= Strength::Lalr
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strength `{0}`, expected one of LR0, LR05, SLR, LALR, LR1")]
pub struct UnknownStrength(pub String);

impl FromStr for Strength {
    type Err = UnknownStrength;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lr0" => Ok(Strength::Lr0),
            "lr05" | "lr0.5" => Ok(Strength::Lr05),
            "slr" => Ok(Strength::Slr),
            "lalr" => Ok(Strength::Lalr),
            "lr1" => Ok(Strength::Lr1),
            _ => Err(UnknownStrength(s.to_owned())),
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let name = match self {
            Strength::Lr0 => "LR0",
            Strength::Lr05 => "LR05",
            Strength::Slr => "SLR",
            Strength::Lalr => "LALR",
            Strength::Lr1 => "LR1",
        };
        write!(f, "{}", name)
    }
}

/// Canonical collection of item sets for a grammar
#[derive(Debug)]
pub struct Automaton<'g> {
    pub grammar: &'g Grammar,
    pub strength: Strength,
    pub states: Vec<ItemSet>,
    pub sets: SetTable,
    /// FIRST sets, empty below SLR
    pub first: Vec<SymSet>,
    /// FOLLOW sets, only computed for SLR
    pub follow: Vec<SymSet>,
    by_kernel: HashMap<Vec<Item>, Vec<usize>>,
}

impl<'g> Automaton<'g> {
    /// Build all states reachable from the augmented start item
    ///
    /// States are processed until none is left incomplete. For LALR a transition into an
    /// existing kernel merges the lookaheads into it, which makes it incomplete again if anything
    /// was added; for LR1 the lookaheads are part of a state's identity.
    pub fn build(grammar: &'g Grammar, strength: Strength) -> Self {
        let first = if strength >= Strength::Slr {
            grammar.first_sets()
        } else {
            vec![SymSet::new(); grammar.symbols.len()]
        };
        let follow = if strength == Strength::Slr {
            grammar.follow_sets(&first)
        } else {
            Vec::new()
        };

        let mut automaton = Automaton {
            grammar,
            strength,
            states: Vec::new(),
            sets: SetTable::new(),
            first,
            follow,
            by_kernel: HashMap::new(),
        };

        let mut kernel = SortedSet::new();
        kernel.insert(Item::new(0, 0), SetTable::EMPTY);
        automaton.add_state(kernel);

        while let Some(idx) = automaton.states.iter().position(|state| !state.completed) {
            automaton.process(idx);
        }

        log::debug!(
            "built {} states with {} lookahead sets at {}",
            automaton.states.len(),
            automaton.sets.len(),
            strength
        );
        automaton
    }

    fn add_state(&mut self, kernel: SortedSet<Item, SetHandle>) -> usize {
        let key = kernel.keys().to_vec();
        let candidates = self.by_kernel.get(&key).cloned().unwrap_or_default();
        for idx in candidates {
            match self.strength {
                Strength::Lr1 => {
                    if self.states[idx].kernel.data() == kernel.data() {
                        return idx;
                    }
                }
                Strength::Lalr => {
                    self.merge_lookaheads(idx, &kernel);
                    return idx;
                }
                _ => return idx,
            }
        }

        let idx = self.states.len();
        self.states.push(ItemSet::new(kernel));
        self.by_kernel.entry(key).or_insert_with(Vec::new).push(idx);
        idx
    }

    fn merge_lookaheads(&mut self, idx: usize, kernel: &SortedSet<Item, SetHandle>) {
        let mut changed = false;
        for (pos, handle) in kernel.data().iter().enumerate() {
            let existing = self.states[idx].kernel.data()[pos];
            if existing == *handle {
                continue;
            }
            let mut merged = self.sets.get(existing).clone();
            if merged.union(self.sets.get(*handle)) {
                let merged = self.sets.intern(merged);
                self.states[idx].kernel.data_mut()[pos] = merged;
                changed = true;
            }
        }
        if changed {
            log::trace!("lookaheads merged into state {}", idx);
            self.states[idx].completed = false;
        }
    }

    fn process(&mut self, idx: usize) {
        let grammar = self.grammar;
        self.states[idx].completed = true;
        let kernel = self.states[idx].kernel.clone();
        let closure = self.closure(&kernel);

        let mut reduce: Option<usize> = None;
        let mut starts_line = false;
        let mut next_symbols = SymSet::new();
        for (item, _) in closure.iter() {
            match item.next_symbol(grammar) {
                Some(sym) => {
                    next_symbols.add(sym);
                    starts_line |= grammar.symbols[sym].line_like;
                }
                None => {
                    let size = grammar.productions[item.prod].body.len();
                    reduce = match reduce {
                        Some(prev) if grammar.productions[prev].body.len() >= size => Some(prev),
                        _ => Some(item.prod),
                    };
                }
            }
        }
        let precedence = reduce.and_then(|prod| grammar.productions[prod].precedence);
        let min_prefix = kernel
            .keys()
            .iter()
            .map(|item| item.dot)
            .filter(|dot| *dot > 0)
            .min()
            .unwrap_or(0);

        let mut go_to = SortedSet::new();
        for sym in next_symbols.keys().iter().cloned() {
            if let (Some(reduce_prec), Some(shift_prec)) =
                (precedence, grammar.symbols[sym].precedence)
            {
                if grammar.is_terminal(sym) && !shift_prec.allows_shift_over(reduce_prec) {
                    log::debug!(
                        "state {}: precedence prefers reducing over shifting {}",
                        idx,
                        grammar.name(sym)
                    );
                    continue;
                }
            }
            let mut target = SortedSet::new();
            for (item, lookahead) in closure.iter() {
                if item.next_symbol(grammar) == Some(sym) {
                    target.insert(item.advance(), *lookahead);
                }
            }
            let target = self.add_state(target);
            go_to.insert(sym, target);
        }

        let state = &mut self.states[idx];
        state.closure = closure;
        state.go_to = go_to;
        state.precedence = precedence;
        state.starts_line = starts_line;
        state.min_prefix = min_prefix;
        state.reduce = reduce;
    }

    /// Add the initial items of every nonterminal that follows a dot
    fn closure(&mut self, kernel: &SortedSet<Item, SetHandle>) -> SortedSet<Item, SetHandle> {
        let grammar = self.grammar;
        let with_lookahead = self.strength.uses_lookahead();

        let mut items: Vec<(Item, SymSet)> = kernel
            .iter()
            .map(|(item, handle)| (*item, self.sets.get(*handle).clone()))
            .collect();
        let mut index: HashMap<Item, usize> = items
            .iter()
            .enumerate()
            .map(|(pos, (item, _))| (*item, pos))
            .collect();
        let mut work: VecDeque<usize> = (0..items.len()).collect();

        while let Some(pos) = work.pop_front() {
            let item = items[pos].0;
            let sym = match item.next_symbol(grammar) {
                Some(sym) if grammar.symbols[sym].is_nonterminal() => sym,
                _ => continue,
            };
            let lookahead = if with_lookahead {
                let body = &grammar.productions[item.prod].body;
                let (mut lookahead, to_end) =
                    grammar.first_of_seq(&self.first, &body[item.dot + 1..]);
                if to_end {
                    lookahead.union(&items[pos].1);
                }
                if grammar.symbols[sym].line_like {
                    lookahead.remove(&NEWLINE);
                }
                lookahead
            } else {
                SymSet::new()
            };

            for prod in grammar.productions_of(sym) {
                let new_item = Item::new(*prod, 0);
                match index.get(&new_item) {
                    Some(other) => {
                        if items[*other].1.union(&lookahead) {
                            work.push_back(*other);
                        }
                    }
                    None => {
                        index.insert(new_item, items.len());
                        items.push((new_item, lookahead.clone()));
                        work.push_back(items.len() - 1);
                    }
                }
            }
        }

        let mut closure = SortedSet::new();
        for (item, lookahead) in items {
            let handle = self.sets.intern(lookahead);
            closure.insert(item, handle);
        }
        closure
    }

    /// Lookahead set under which a completed item of `state` reduces
    pub fn reduce_lookahead(&self, item: Item, handle: SetHandle) -> &SymSet {
        if self.strength == Strength::Slr {
            &self.follow[self.grammar.productions[item.prod].head]
        } else {
            self.sets.get(handle)
        }
    }

    pub fn write_states(&self, out: &mut dyn Write) -> io::Result<()> {
        let grammar = self.grammar;
        writeln!(out, "{} states at {}:", self.states.len(), self.strength)?;
        for (idx, state) in self.states.iter().enumerate() {
            write!(out, "State {}:", idx)?;
            if state.starts_line {
                write!(out, " starts line")?;
            }
            writeln!(out, " min prefix {}", state.min_prefix)?;
            for (item, handle) in state.closure.iter() {
                let marker = if state.kernel.contains(item) { '*' } else { ' ' };
                write!(out, "  {} {}", marker, item.describe(grammar))?;
                if let Some(precedence) = grammar.productions[item.prod].precedence {
                    write!(out, " [{}]", precedence)?;
                }
                if self.strength.uses_lookahead() && item.is_complete(grammar) {
                    let names: Vec<&str> = self
                        .sets
                        .get(*handle)
                        .keys()
                        .iter()
                        .map(|sym| grammar.name(*sym))
                        .collect();
                    write!(out, " LA {{{}}}", names.join(", "))?;
                }
                writeln!(out)?;
            }
            for (sym, target) in state.go_to.iter() {
                writeln!(out, "    {} -> {}", grammar.name(*sym), target)?;
            }
            if let Some(prod) = state.reduce {
                writeln!(
                    out,
                    "    reduce {}: {}",
                    prod,
                    grammar.production_string(prod, None)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lalr::ConflictKind;
    use matches::assert_matches;

    const SUM: &str = "
$ LEFT +
E -> E + E
    | NUMBER
";

    // LR(1) but not LALR(1)
    const SPLIT: &str = "
S -> 'a' A 'd' | 'b' B 'd' | 'a' B 'e' | 'b' A 'e'
A -> 'c'
B -> 'c'
";

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn find_state(automaton: &Automaton, kernel: &str) -> usize {
        automaton
            .states
            .iter()
            .position(|state| {
                let items: Vec<String> = state
                    .kernel
                    .keys()
                    .iter()
                    .map(|item| item.describe(automaton.grammar))
                    .collect();
                items.join("; ") == kernel
            })
            .unwrap()
    }

    #[test]
    fn test_strength_from_str() {
        assert_eq!("lalr".parse::<Strength>(), Ok(Strength::Lalr));
        assert_eq!("LR05".parse::<Strength>(), Ok(Strength::Lr05));
        assert_matches!("LL1".parse::<Strength>(), Err(UnknownStrength(_)));
        assert!(Strength::Lr0 < Strength::Lr05 && Strength::Lalr < Strength::Lr1);
    }

    #[test]
    fn test_precedence_makes_sum_left_associative() {
        init();
        let grammar = Grammar::read_str(SUM).unwrap();
        let automaton = Automaton::build(&grammar, Strength::Slr);
        assert_eq!(automaton.states.len(), 6);
        assert!(automaton.conflicts().is_empty());

        let plus = grammar.lookup("+").unwrap();
        let sum = find_state(&automaton, "E -> E + E .; E -> E . + E");
        assert_eq!(automaton.states[sum].goto(plus), None);
        assert_eq!(automaton.states[sum].reduce, Some(1));

        let after_e = find_state(&automaton, "$start -> E . $eof; E -> E . + E");
        assert!(automaton.states[after_e].goto(plus).is_some());
        assert_eq!(automaton.states[after_e].min_prefix, 1);
        assert_eq!(automaton.states[0].min_prefix, 0);
    }

    #[test]
    fn test_ambiguity_without_precedence() {
        init();
        let grammar = Grammar::read_str("E -> E + E | NUMBER\n").unwrap();
        let plus = grammar.lookup("+").unwrap();
        for strength in [Strength::Slr, Strength::Lalr, Strength::Lr1].iter() {
            let automaton = Automaton::build(&grammar, *strength);
            let conflicts = automaton.conflicts();
            assert_eq!(conflicts.len(), 1, "{}", strength);
            assert_eq!(conflicts[0].kind, ConflictKind::ShiftReduce);
            assert_eq!(conflicts[0].lookahead, Some(plus));
            assert_eq!(conflicts[0].productions, vec![1]);
        }

        let automaton = Automaton::build(&grammar, Strength::Lr0);
        assert_eq!(automaton.conflicts().len(), 1);
        // no reduce/reduce, so LR0.5 is satisfied
        let automaton = Automaton::build(&grammar, Strength::Lr05);
        assert!(automaton.conflicts().is_empty());
    }

    #[test]
    fn test_lalr_lookaheads() {
        let grammar = Grammar::read_str(SUM).unwrap();
        let automaton = Automaton::build(&grammar, Strength::Lalr);
        let number = find_state(&automaton, "E -> NUMBER .");
        let handle = automaton.states[number].kernel.data()[0];
        let names: Vec<&str> = automaton
            .sets
            .get(handle)
            .keys()
            .iter()
            .map(|sym| grammar.name(*sym))
            .collect();
        assert_eq!(names, vec!["$eof", "+"]);
    }

    #[test]
    fn test_state_counts_grow_with_strength() {
        init();
        let grammar = Grammar::read_str(SPLIT).unwrap();
        let lr0 = Automaton::build(&grammar, Strength::Lr0);
        let slr = Automaton::build(&grammar, Strength::Slr);
        let lalr = Automaton::build(&grammar, Strength::Lalr);
        let lr1 = Automaton::build(&grammar, Strength::Lr1);
        assert_eq!(lr0.states.len(), slr.states.len());
        assert_eq!(lr0.states.len(), lalr.states.len());
        assert_eq!(lr1.states.len(), lalr.states.len() + 1);

        assert!(lr1.conflicts().is_empty());
        let conflicts = lalr.conflicts();
        assert_eq!(conflicts.len(), 2);
        assert!(conflicts
            .iter()
            .all(|c| c.kind == ConflictKind::ReduceReduce && c.productions == vec![5, 6]));
        assert_eq!(slr.conflicts().len(), 2);
        assert_eq!(lr0.conflicts().len(), 1);
        assert_eq!(lr0.conflicts()[0].lookahead, None);
    }

    #[test]
    fn test_line_like_states() {
        let text = "
Block -> Stmts
Stmts -> Stmt | Stmts Stmt
Stmt -> IDENTIFIER NEWLINE $$NEWLINE
";
        let grammar = Grammar::read_str(text).unwrap();
        let automaton = Automaton::build(&grammar, Strength::Lalr);
        assert!(automaton.states[0].starts_line);
        assert!(automaton.conflicts().is_empty());

        let table = automaton.table();
        let stmt = find_state(&automaton, "Stmt -> IDENTIFIER NEWLINE .");
        assert!(table.states[stmt].newline_only);
        assert_eq!(table.states[stmt].reduce_size, 2);
        assert_eq!(table.states[stmt].reduce_sym, grammar.lookup("Stmt").unwrap());
        assert!(table.states[stmt].go_to.is_empty());
        assert!(!table.states[0].newline_only);
        assert_eq!(table.names[NEWLINE], "NEWLINE");
    }

    #[test]
    fn test_write_states() {
        let grammar = Grammar::read_str(SUM).unwrap();
        let automaton = Automaton::build(&grammar, Strength::Lalr);
        let mut out = Vec::new();
        automaton.write_states(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("6 states at LALR:\n"));
        assert!(text.contains("  * E -> NUMBER . LA {$eof, +}\n"));
    }
}
