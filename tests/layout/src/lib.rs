#![cfg(test)]

use lrtide::{parse, Actions, Parser, Token, TokenConfig, TokenKind, Tokenizer};
use lrtide_codegen::RuntimeTable;
use lrtide_core::{Automaton, Grammar, Strength};
use matches::assert_matches;
use test_utils::TokenList;

const ASSIGNMENTS: &str = "
Stmts -> Stmt | Stmts Stmt
Stmt -> IDENTIFIER = NUMBER NEWLINE
    | ERROR NEWLINE
";

const BLOCKS: &str = "
Block -> Stmts
Stmts -> Stmt | Stmts NEWLINE Stmt
Stmt -> IDENTIFIER
    | IDENTIFIER : NEWLINE Block
";

const LINE_ONLY: &str = "
Stmts -> Stmt | Stmts Stmt
Stmt -> IDENTIFIER = IDENTIFIER NEWLINE $$NEWLINE
    | ERROR $$NEWLINE
";

const SUMS: &str = "
Stmts -> Stmt | Stmts NEWLINE Stmt
Stmt -> IDENTIFIER = Sum
Sum -> NUMBER | Sum + NUMBER
";

const LISTS: &str = "
Stmts -> Stmt | Stmts NEWLINE Stmt
Stmt -> IDENTIFIER | IDENTIFIER : NEWLINE List
List -> NUMBER | List NUMBER
";

#[derive(Default)]
struct Assignments {
    errors: usize,
    disposed: usize,
}

impl<'a> Actions<'a> for Assignments {
    type Value = String;

    fn token(&mut self, token: &Token<'a>) -> String {
        token.text.to_owned()
    }

    fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
        match prod {
            2 => format!("{} {}", body[0], body[1]),
            3 => format!("{}={}", body[0], body[2]),
            4 => "error".to_owned(),
            _ => body[0].clone(),
        }
    }

    fn error(&mut self, _token: &Token<'a>) -> String {
        self.errors += 1;
        "?".to_owned()
    }

    fn dispose(&mut self, _value: String) {
        self.disposed += 1;
    }
}

struct Blocks;

impl<'a> Actions<'a> for Blocks {
    type Value = String;

    fn token(&mut self, token: &Token<'a>) -> String {
        token.text.to_owned()
    }

    fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
        match prod {
            1 => format!("[{}]", body[0]),
            3 => format!("{} {}", body[0], body[2]),
            5 => format!("{}:{}", body[0], body[3]),
            _ => body[0].clone(),
        }
    }

    fn error(&mut self, _token: &Token<'a>) -> String {
        "?".to_owned()
    }
}

/// Joins statements with `;` and shows each list or sum in parentheses
struct Lines;

impl<'a> Actions<'a> for Lines {
    type Value = String;

    fn token(&mut self, token: &Token<'a>) -> String {
        token.text.to_owned()
    }

    fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
        match (prod, body.len()) {
            (2, _) => format!("{}; {}", body[0], body[2]),
            (3, 3) => format!("{}={}", body[0], body[2]),
            (4, 4) => format!("{}:{}", body[0], body[3]),
            (5, 3) => format!("({}+{})", body[0], body[2]),
            (6, 2) => format!("({} {})", body[0], body[1]),
            _ => body[0].clone(),
        }
    }

    fn error(&mut self, _token: &Token<'a>) -> String {
        "?".to_owned()
    }
}

fn trace_actions(trace: &str) -> Vec<&str> {
    trace
        .lines()
        .filter_map(|line| line.rsplit("] ").next())
        .collect()
}

/// Parse `input` with the tokenizer and return the value and the trace
fn parse_text(runtime: &RuntimeTable, input: &str) -> (Option<String>, String) {
    let (states, names, known) = (runtime.states(), runtime.names(), runtime.known());
    let config = TokenConfig {
        ignored: runtime.ignored(),
        known: &known,
        ..TokenConfig::default()
    };
    let mut tokens = Tokenizer::from_text(input, config);
    let mut trace = Vec::new();
    let value = parse(&mut tokens, &states, &mut Lines, Some(&mut trace), &names);
    (value, String::from_utf8(trace).unwrap())
}

fn runtime(text: &str) -> RuntimeTable {
    let grammar = Grammar::read_str(text).unwrap();
    let automaton = Automaton::build(&grammar, Strength::Lalr);
    assert!(automaton.conflicts().is_empty());
    RuntimeTable::new(&automaton.table())
}

#[test]
fn test_error_recovery_resumes_at_next_line() {
    let _ = env_logger::builder().is_test(true).try_init();
    use TokenKind::{Ident, Newline, Number, Reserved};

    let runtime = runtime(ASSIGNMENTS);
    let (states, names) = (runtime.states(), runtime.names());
    let eq = Reserved(0);
    let mut tokens = TokenList::new(&[
        (Ident, "a"), (eq, "="), (Number, "1"), (Newline, ""),
        (Ident, "b"), (eq, "="), (eq, "="), (Number, "2"), (Newline, ""),
        (Ident, "c"), (eq, "="), (Number, "3"), (Newline, ""),
    ]);
    let mut actions = Assignments::default();
    let value = Parser::new(&states, &names).parse(&mut tokens, &mut actions);

    assert_eq!(value.as_deref(), Some("a=1 error c=3"));
    assert_eq!(actions.errors, 1);
    // `b` and the first `=` are popped by recovery, `$eof` is left over at accept
    assert_eq!(actions.disposed, 3);
    assert_eq!(tokens.consumed(), 13);
}

#[test]
fn test_unrecoverable_input() {
    let _ = env_logger::builder().is_test(true).try_init();

    let runtime = runtime(ASSIGNMENTS);
    let (states, names) = (runtime.states(), runtime.names());
    let mut tokens = TokenList::new(&[(TokenKind::Number, "7")]);
    let mut actions = Assignments::default();
    let value = Parser::new(&states, &names).parse(&mut tokens, &mut actions);

    assert_matches!(value, None);
    assert_eq!(actions.errors, 1);
    assert_eq!(actions.disposed, 1);
}

#[test]
fn test_indented_block() {
    let _ = env_logger::builder().is_test(true).try_init();

    let runtime = runtime(BLOCKS);
    let (states, names, known) = (runtime.states(), runtime.names(), runtime.known());
    assert!(!runtime.ignored().contains(lrtide::scan::Ignored::IN));
    let config = TokenConfig {
        ignored: runtime.ignored(),
        known: &known,
        ..TokenConfig::default()
    };

    let mut tokens = Tokenizer::from_text("x:\n    y\n    z\nw\n", config);
    let mut trace = Vec::new();
    let value = parse(&mut tokens, &states, &mut Blocks, Some(&mut trace), &names);
    assert_eq!(value.as_deref(), Some("[x:[y z] w]"));

    let trace = String::from_utf8(trace).unwrap();
    assert!(trace.lines().any(|line| line.ends_with("[IN] Record")));
    assert!(trace.lines().any(|line| line.ends_with("[OUT] Cancel")));
    assert!(trace.lines().any(|line| line.ends_with("[OUT] Force")));
    assert!(trace.lines().last().unwrap().ends_with("[$eof] Accept"));
}

#[test]
fn test_layout_reduction_waits_for_line_end() {
    let _ = env_logger::builder().is_test(true).try_init();
    use TokenKind::{Ident, Newline, Reserved};

    let runtime = runtime(LINE_ONLY);
    let (states, names) = (runtime.states(), runtime.names());
    let eq = Reserved(0);
    let mut tokens = TokenList::new(&[
        (Ident, "a"), (Ident, "b"), (Newline, ""),
        (Ident, "c"), (eq, "="), (Ident, "d"), (Newline, ""),
    ]);
    let mut actions = Assignments::default();
    let mut trace = Vec::new();
    let value = parse(&mut tokens, &states, &mut actions, Some(&mut trace), &names);

    // `Stmt -> ERROR` may not reduce in front of `c`, so recovery has to skip to the end
    assert_eq!(value.as_deref(), Some("error"));
    assert_eq!(actions.errors, 1);
    assert_eq!(tokens.consumed(), 7);
    let trace = String::from_utf8(trace).unwrap();
    assert_eq!(trace_actions(&trace).iter().filter(|a| **a == "ERROR").count(), 1);
    assert!(trace
        .lines()
        .any(|line| line.contains(" ERROR (") && line.ends_with("[$eof] Reduce")));
}

#[test]
fn test_newline_forces_reduction() {
    let _ = env_logger::builder().is_test(true).try_init();

    let runtime = runtime(SUMS);
    let (value, trace) = parse_text(&runtime, "a = 1 + 2\nb = 3\n");
    assert_eq!(value.as_deref(), Some("a=(1+2); b=3"));

    let lines: Vec<&str> = trace.lines().collect();
    let forced: Vec<&&str> = lines
        .iter()
        .filter(|line| line.ends_with("[NEWLINE] Force"))
        .collect();
    assert_eq!(forced.len(), 2);
    assert!(lines.iter().any(|line| line.ends_with("[NEWLINE] Shift")));
    assert!(!trace_actions(&trace).contains(&"ERROR"));
}

#[test]
fn test_newline_in_indented_list_is_discarded() {
    let _ = env_logger::builder().is_test(true).try_init();

    let runtime = runtime(LISTS);
    let (value, trace) = parse_text(&runtime, "x:\n    1\n    2\ny\n");
    assert_eq!(value.as_deref(), Some("x:(1 2); y"));

    assert_eq!(
        trace_actions(&trace),
        vec![
            "Shift", "Shift", "Shift", "Record", "Shift", "Discard", "Reduce", "Shift", "Force",
            "Cancel", "Reduce", "Reduce", "Shift", "Shift", "Reduce", "Reduce", "Shift", "Accept",
        ]
    );
}
