use lrtide::scan::Ignored;
use lrtide::{Goto, State};
use lrtide_core::{Table, TableState};

/// Analyzer output converted for the runtime without going through generated source
///
/// ```ignore
/// let runtime = RuntimeTable::new(&automaton.table());
/// let (states, names, known) = (runtime.states(), runtime.names(), runtime.known());
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeTable {
    gotos: Vec<Vec<Goto>>,
    rows: Vec<TableState>,
    names: Vec<String>,
    known: Vec<String>,
    ignored: Ignored,
}

impl RuntimeTable {
    pub fn new(table: &Table) -> Self {
        let gotos = table
            .states
            .iter()
            .map(|state| {
                state
                    .go_to
                    .iter()
                    .map(|(sym, target)| Goto {
                        sym: *sym,
                        state: *target,
                    })
                    .collect()
            })
            .collect();
        RuntimeTable {
            gotos,
            rows: table.states.clone(),
            names: table.names.clone(),
            known: table.known.clone(),
            ignored: table.ignored,
        }
    }

    pub fn states(&self) -> Vec<State<'_>> {
        self.rows
            .iter()
            .zip(self.gotos.iter())
            .map(|(row, go_to)| State {
                go_to,
                reduce_prod: row.reduce_prod,
                reduce_size: row.reduce_size,
                reduce_sym: row.reduce_sym,
                starts_line: row.starts_line,
                newline_only: row.newline_only,
                min_prefix: row.min_prefix,
            })
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.names.iter().map(String::as_str).collect()
    }

    /// Literal terminals, for `TokenConfig::known`
    pub fn known(&self) -> Vec<&str> {
        self.known.iter().map(String::as_str).collect()
    }

    pub fn ignored(&self) -> Ignored {
        self.ignored
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use lrtide::{Actions, Parser, Token, TokenConfig, Tokenizer};
    use lrtide_core::{Automaton, Grammar, Strength};

    struct Prefix;

    impl<'a> Actions<'a> for Prefix {
        type Value = String;

        fn token(&mut self, token: &Token<'a>) -> String {
            token.text.to_owned()
        }

        fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
            match prod {
                1 | 2 => format!("({} {} {})", body[1], body[0], body[2]),
                _ => body.join(""),
            }
        }

        fn error(&mut self, _token: &Token<'a>) -> String {
            "?".to_owned()
        }
    }

    #[test]
    fn test_parse_with_runtime_table() {
        let grammar = Grammar::read_str(
            "$ LEFT +\n$ LEFT *\nE -> E + E | E * E | NUMBER | ( E )\n",
        )
        .unwrap();
        let automaton = Automaton::build(&grammar, Strength::Lalr);
        assert_eq!(automaton.report_conflicts(), 0);

        let runtime = RuntimeTable::new(&automaton.table());
        let states = runtime.states();
        let names = runtime.names();
        let known = runtime.known();
        assert_eq!(runtime.ignored(), Ignored::COMMENTS | Ignored::LAYOUT);

        let config = TokenConfig {
            ignored: runtime.ignored(),
            known: &known,
            ..TokenConfig::default()
        };
        let mut tokens = Tokenizer::from_text("1 + 2 * (3 + 4) + 5", config);
        let value = Parser::new(&states, &names).parse(&mut tokens, &mut Prefix);
        assert_eq!(value.as_deref(), Some("(+ (+ 1 (* 2 ((+ 3 4)))) 5)"));
    }
}
