use std::error::Error;
use std::fs;
use std::io;

use lrtide::{Actions, Parser, Token, TokenConfig, Tokenizer};
use lrtide_codegen::RuntimeTable;
use lrtide_core::{Automaton, Grammar};

/// Builds an s-expression of the parse tree
struct TreeBuilder {
    heads: Vec<String>,
    errors: usize,
}

impl<'a> Actions<'a> for TreeBuilder {
    type Value = String;

    fn token(&mut self, token: &Token<'a>) -> String {
        if token.text.is_empty() {
            token.kind.to_string()
        } else {
            token.text.to_owned()
        }
    }

    fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
        let head = &self.heads[prod];
        if body.is_empty() {
            format!("({})", head)
        } else {
            format!("({} {})", head, body.join(" "))
        }
    }

    fn error(&mut self, token: &Token<'a>) -> String {
        self.errors += 1;
        log::warn!("syntax error at {}", token);
        "ERROR".to_owned()
    }
}

/// Parse `input_filename` with the tables of `automaton` and print the tree
pub fn parse_file(
    grammar: &Grammar,
    automaton: &Automaton,
    input_filename: &str,
    trace: bool,
) -> Result<(), Box<dyn Error>> {
    let input = fs::read_to_string(input_filename)?;
    let runtime = RuntimeTable::new(&automaton.table());
    let states = runtime.states();
    let names = runtime.names();
    let known = runtime.known();
    let config = TokenConfig {
        ignored: runtime.ignored(),
        known: &known,
        ..TokenConfig::default()
    };

    let mut actions = TreeBuilder {
        heads: grammar
            .productions
            .iter()
            .map(|production| grammar.name(production.head).to_owned())
            .collect(),
        errors: 0,
    };
    let mut tokens = Tokenizer::from_text(&input, config);
    let mut stderr = io::stderr();
    let mut parser = Parser::new(&states, &names);
    if trace {
        parser = parser.trace(&mut stderr);
    }

    match parser.parse(&mut tokens, &mut actions) {
        Some(tree) => println!("{}", tree),
        None => println!("no parse"),
    }
    if actions.errors > 0 {
        eprintln!("{} syntax errors", actions.errors);
    }
    Ok(())
}
