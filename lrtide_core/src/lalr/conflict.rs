use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use crate::lalr::grammar::NEWLINE;
use crate::lalr::{Automaton, Item, SetHandle, Strength, SymbolId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift/reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce/reduce"),
        }
    }
}

/// An ambiguity in the parse table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub state: usize,
    /// Terminal the conflict occurs on, `None` for conflicts found without lookahead
    pub lookahead: Option<SymbolId>,
    /// Reducible productions involved
    pub productions: Vec<usize>,
}

impl<'g> Automaton<'g> {
    /// Every shift/reduce and reduce/reduce conflict at the automaton's strength
    pub fn conflicts(&self) -> Vec<Conflict> {
        let grammar = self.grammar;
        let mut conflicts = Vec::new();

        for (idx, state) in self.states.iter().enumerate() {
            let completed: Vec<(Item, SetHandle)> = state
                .closure
                .iter()
                .filter(|(item, _)| item.is_complete(grammar))
                .map(|(item, handle)| (*item, *handle))
                .collect();
            if completed.is_empty() {
                continue;
            }

            match self.strength {
                Strength::Lr0 | Strength::Lr05 => {
                    let productions: Vec<usize> =
                        completed.iter().map(|(item, _)| item.prod).collect();
                    let shifts = state.go_to.keys().iter().any(|sym| {
                        grammar.is_terminal(*sym)
                            && !productions.iter().all(|prod| self.resolved(*prod, *sym))
                    });
                    if self.strength == Strength::Lr0 && shifts {
                        conflicts.push(Conflict {
                            kind: ConflictKind::ShiftReduce,
                            state: idx,
                            lookahead: None,
                            productions: productions.clone(),
                        });
                    }
                    if productions.len() > 1 {
                        conflicts.push(Conflict {
                            kind: ConflictKind::ReduceReduce,
                            state: idx,
                            lookahead: None,
                            productions,
                        });
                    }
                }
                _ => {
                    let mut claimed: BTreeMap<SymbolId, usize> = BTreeMap::new();
                    for (item, handle) in completed {
                        for sym in self.reduce_lookahead(item, handle).keys().iter().cloned() {
                            if sym != NEWLINE
                                && state.go_to.contains(&sym)
                                && !self.resolved(item.prod, sym)
                            {
                                conflicts.push(Conflict {
                                    kind: ConflictKind::ShiftReduce,
                                    state: idx,
                                    lookahead: Some(sym),
                                    productions: vec![item.prod],
                                });
                            }
                            match claimed.get(&sym) {
                                Some(other) => conflicts.push(Conflict {
                                    kind: ConflictKind::ReduceReduce,
                                    state: idx,
                                    lookahead: Some(sym),
                                    productions: vec![*other, item.prod],
                                }),
                                None => {
                                    claimed.insert(sym, item.prod);
                                }
                            }
                        }
                    }
                }
            }
        }
        conflicts
    }

    /// Shifting `sym` against reducing `prod` was settled by precedence
    fn resolved(&self, prod: usize, sym: SymbolId) -> bool {
        let grammar = self.grammar;
        grammar.productions[prod].precedence.is_some() && grammar.symbols[sym].precedence.is_some()
    }

    /// One line naming the conflict, then the items of the state involved in it
    ///
    /// Completed items show their lookahead set at LALR and LR1.
    pub fn describe_conflict(&self, conflict: &Conflict) -> String {
        let grammar = self.grammar;
        let mut result = format!("{} conflict in state {}", conflict.kind, conflict.state);
        if let Some(sym) = conflict.lookahead {
            result.push_str(&format!(" on {}", grammar.name(sym)));
        }

        let state = &self.states[conflict.state];
        for (item, handle) in state.closure.iter() {
            let involved = match item.next_symbol(grammar) {
                None => conflict.productions.contains(&item.prod),
                Some(sym) if conflict.kind == ConflictKind::ShiftReduce => match conflict.lookahead {
                    Some(lookahead) => sym == lookahead,
                    None => grammar.is_terminal(sym),
                },
                Some(_) => false,
            };
            if !involved {
                continue;
            }
            result.push_str(&format!("\n    {}", item.describe(grammar)));
            if item.is_complete(grammar) && self.strength >= Strength::Lalr {
                let names: Vec<&str> = self
                    .sets
                    .get(*handle)
                    .keys()
                    .iter()
                    .map(|sym| grammar.name(*sym))
                    .collect();
                result.push_str(&format!(" LA {{{}}}", names.join(", ")));
            }
        }
        result
    }

    /// Log each conflict as a warning and return how many there are
    pub fn report_conflicts(&self) -> usize {
        let conflicts = self.conflicts();
        for conflict in conflicts.iter() {
            log::warn!("{}", self.describe_conflict(conflict));
        }
        conflicts.len()
    }

    pub fn write_conflicts(&self, out: &mut dyn Write) -> io::Result<()> {
        let conflicts = self.conflicts();
        writeln!(out, "{} conflicts", conflicts.len())?;
        for conflict in conflicts.iter() {
            writeln!(out, "  {}", self.describe_conflict(conflict))?;
        }
        Ok(())
    }
}
