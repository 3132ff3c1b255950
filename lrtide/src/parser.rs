use std::io::Write;

use lrtide_scan::{Token, TokenKind};

use crate::{Actions, State, TokenSource};

const ERROR: usize = 0;

#[derive(Debug)]
struct Frame<V> {
    state: usize,
    sym: usize,
    /// Empty only for the bottom frame
    value: Option<V>,
    /// Indents recorded while this frame was on top
    indents: usize,
    since_newline: usize,
    since_indent: usize,
    newline_permitted: bool,
}

enum Step<V> {
    Continue,
    Accept(V),
    Error,
}

/// Table-driven shift/reduce parser
///
/// ```ignore
/// let mut parser = Parser::new(&STATES, &NAMES);
/// let value = parser.parse(&mut tokenizer, &mut actions);
/// ```
pub struct Parser<'t, 'w> {
    states: &'t [State<'t>],
    names: &'t [&'t str],
    trace: Option<&'w mut dyn Write>,
}

/// Parse with a one-off `Parser`, optionally writing a trace of every step
pub fn parse<'a, 't, S, A>(
    tokens: &mut S,
    states: &'t [State<'t>],
    actions: &mut A,
    trace: Option<&mut dyn Write>,
    names: &'t [&'t str],
) -> Option<A::Value>
where
    S: TokenSource<'a>,
    A: Actions<'a>,
{
    let mut parser = Parser::new(states, names);
    parser.trace = trace;
    parser.parse(tokens, actions)
}

impl<'t, 'w> Parser<'t, 'w> {
    pub fn new(states: &'t [State<'t>], names: &'t [&'t str]) -> Self {
        Parser {
            states,
            names,
            trace: None,
        }
    }

    pub fn trace(mut self, out: &'w mut dyn Write) -> Self {
        self.trace = Some(out);
        self
    }

    /// Parse all tokens and return the value of the start symbol
    ///
    /// Returns `None` if the input could not be recovered from an error. Values still on the
    /// stack at that point are disposed.
    pub fn parse<'a, S, A>(&mut self, tokens: &mut S, actions: &mut A) -> Option<A::Value>
    where
        S: TokenSource<'a>,
        A: Actions<'a>,
    {
        let states = self.states;
        let mut run: Run<A::Value> = Run {
            states,
            frames: Vec::new(),
            recovered_at: None,
        };
        run.frames.push(Frame {
            state: 0,
            sym: ERROR,
            value: None,
            indents: 0,
            since_newline: 0,
            since_indent: 0,
            newline_permitted: states.first().map_or(false, |s| s.starts_line),
        });

        let mut tk = tokens.next_token();
        let mut errors = 0;
        let mut eof_error = false;

        let result = loop {
            let top = run.top();
            let state = &states[top.state];

            match tk.kind {
                TokenKind::In => {
                    self.step(&run, &tk, "Record");
                    let top = run.top_mut();
                    top.indents += 1;
                    top.since_newline = 0;
                    top.since_indent = 0;
                    if !state.starts_line {
                        top.newline_permitted = false;
                    }
                    tk = tokens.next_token();
                    continue;
                }
                TokenKind::Out => {
                    if state.reduce_prod.is_none() || state.reduce_size > top.since_indent {
                        if state.min_prefix >= top.since_indent && run.can_cancel_indent() {
                            self.step(&run, &tk, "Cancel");
                            run.cancel_indent();
                            tk = tokens.next_token();
                            continue;
                        }
                        if let Some(value) = self.recover(&mut run, &mut tk, tokens, actions) {
                            break value;
                        }
                        errors += 1;
                        continue;
                    }
                }
                TokenKind::Newline => {
                    if !top.newline_permitted {
                        self.step(&run, &tk, "Discard");
                        tk = tokens.next_token();
                        continue;
                    }
                }
                _ => {}
            }

            let forced = match tk.kind {
                TokenKind::Out => true,
                TokenKind::Newline => {
                    top.since_newline > 1
                        && state.reduce_prod.is_some()
                        && state.reduce_size <= top.since_newline
                }
                _ => false,
            };

            if !forced {
                if let Some(next) = state.goto(tk.kind.num()) {
                    self.step(&run, &tk, "Shift");
                    let value = actions.token(&tk);
                    let start_of_line = tk.kind == TokenKind::Newline;
                    run.push(next, tk.kind.num(), 0, start_of_line, Some(value));
                    run.recovered_at = None;
                    eof_error = false;
                    tk = tokens.next_token();
                    continue;
                }
            }

            if let Some(prod) = run.reducible(&tk) {
                let action = match (prod, forced) {
                    (0, _) => "Accept",
                    (_, true) => "Force",
                    _ => "Reduce",
                };
                self.step(&run, &tk, action);
                match run.reduce(actions) {
                    Step::Continue => continue,
                    Step::Accept(value) => {
                        run.dispose(actions);
                        break Some(value);
                    }
                    Step::Error => {}
                }
            }

            if tk.kind == TokenKind::Eof {
                if eof_error {
                    log::debug!("no progress after an error at end of input");
                    run.dispose(actions);
                    break None;
                }
                eof_error = true;
            }
            if let Some(value) = self.recover(&mut run, &mut tk, tokens, actions) {
                break value;
            }
            errors += 1;
        };

        if errors > 0 {
            log::debug!("parse finished after {} errors", errors);
        }
        result
    }

    /// Push `ERROR` and skip tokens until parsing can continue
    ///
    /// Returns `Some(None)` when there is no way to continue.
    fn recover<'a, S, A>(
        &mut self,
        run: &mut Run<'t, A::Value>,
        tk: &mut Token<'a>,
        tokens: &mut S,
        actions: &mut A,
    ) -> Option<Option<A::Value>>
    where
        S: TokenSource<'a>,
        A: Actions<'a>,
    {
        self.step(run, tk, "ERROR");
        log::debug!("syntax error at {}", tk);

        let mut indents = 0;
        let error_value = actions.error(tk);
        loop {
            let top = run.top();
            if let Some(next) = self.states[top.state].goto(ERROR) {
                run.push(next, ERROR, 0, false, Some(error_value));
                break;
            }
            if run.frames.len() == 1 {
                actions.dispose(error_value);
                run.dispose(actions);
                return Some(None);
            }
            if let Some(frame) = run.frames.pop() {
                indents += frame.indents;
                if let Some(value) = frame.value {
                    actions.dispose(value);
                }
            }
        }

        // Back at the same depth without a shift: the lookahead has to go
        let depth = run.frames.len();
        let mut skip = run.recovered_at == Some(depth);
        run.recovered_at = Some(depth);

        while tk.kind != TokenKind::Eof && (skip || !run.in_lookahead(tk)) {
            skip = false;
            *tk = tokens.next_token();
            match tk.kind {
                TokenKind::In => indents += 1,
                TokenKind::Out => {
                    if indents == 0 {
                        break;
                    }
                    indents -= 1;
                }
                _ => {}
            }
            log::trace!("skipping {}", tk);
        }

        if tk.kind == TokenKind::Eof && !run.in_lookahead(tk) {
            run.dispose(actions);
            return Some(None);
        }

        let top = run.top_mut();
        top.indents += indents;
        if top.indents > 0 {
            top.since_indent = 0;
        }
        None
    }

    fn step(&mut self, run: &Run<'t, impl Sized>, tk: &Token, action: &str) {
        let names = self.names;
        let name = |sym: usize| -> String {
            match names.get(sym) {
                Some(name) => (*name).to_owned(),
                None => TokenKind::from_num(sym).to_string(),
            }
        };

        let mut line = String::new();
        for (idx, frame) in run.frames.iter().enumerate() {
            if idx > 0 {
                line.push_str(&name(frame.sym));
                line.push(' ');
            }
            line.push('(');
            line.push_str(&frame.state.to_string());
            if frame.newline_permitted {
                line.push('^');
            }
            for _ in 0..frame.indents {
                line.push('>');
            }
            line.push_str(") ");
        }
        line.push_str(&format!("[{}", name(tk.kind.num())));
        if !tk.text.is_empty() && !tk.kind.is_layout() {
            line.push_str(&format!(" {:?}", tk.text));
        }
        line.push_str(&format!("] {}", action));

        log::trace!("{}", line);
        if let Some(out) = self.trace.as_mut() {
            if let Err(err) = writeln!(out, "{}", line) {
                log::warn!("disabling parse trace: {}", err);
                self.trace = None;
            }
        }
    }
}

struct Run<'t, V> {
    states: &'t [State<'t>],
    frames: Vec<Frame<V>>,
    /// Stack depth after the last `ERROR` push, cleared by a shift
    recovered_at: Option<usize>,
}

impl<'t, V> Run<'t, V> {
    fn top(&self) -> &Frame<V> {
        &self.frames[self.frames.len() - 1]
    }

    fn top_mut(&mut self) -> &mut Frame<V> {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Push a frame for the transition from the top state on `sym`
    fn push(&mut self, state: usize, sym: usize, indents: usize, start_of_line: bool, value: Option<V>) {
        let starts_line = self.states[state].starts_line;
        let prev = self.top();
        let frame = Frame {
            state,
            sym,
            value,
            indents,
            since_newline: if start_of_line { 0 } else { prev.since_newline + 1 },
            since_indent: if indents > 0 { 0 } else { prev.since_indent + 1 },
            newline_permitted: if starts_line {
                true
            } else if indents > 0 {
                false
            } else {
                prev.newline_permitted
            },
        };
        self.frames.push(frame);
    }

    /// Frame holding the most recent indent
    fn indent_frame(&self) -> Option<usize> {
        let top = self.frames.len() - 1;
        let since_indent = self.top().since_indent;
        if since_indent > top || self.frames[top - since_indent].indents == 0 {
            return None;
        }
        Some(top - since_indent)
    }

    fn can_cancel_indent(&self) -> bool {
        self.indent_frame().is_some()
    }

    /// Take back the most recent indent for an `OUT`
    fn cancel_indent(&mut self) {
        let idx = match self.indent_frame() {
            Some(idx) => idx,
            None => return,
        };
        self.frames[idx].indents -= 1;
        if self.frames[idx].indents > 0 {
            return;
        }

        for pos in idx..self.frames.len() {
            let (since_indent, newline_permitted) = match pos {
                0 => (0, false),
                _ => {
                    let prev = &self.frames[pos - 1];
                    (prev.since_indent + 1, prev.newline_permitted)
                }
            };
            let starts_line = self.states[self.frames[pos].state].starts_line;
            let frame = &mut self.frames[pos];
            frame.since_indent = since_indent;
            frame.newline_permitted = starts_line || newline_permitted;
        }
    }

    /// Production the top state may reduce by before `tk`
    fn reducible(&self, tk: &Token) -> Option<usize> {
        let top = self.top();
        let state = &self.states[top.state];
        let prod = state.reduce_prod?;
        if state.newline_only {
            if !self.at_line_boundary(tk, true) {
                return None;
            }
        }
        if state.reduce_size >= self.frames.len() {
            log::error!("state {} reduces more frames than are on the stack", top.state);
            return None;
        }
        Some(prod)
    }

    fn reduce<'a, A>(&mut self, actions: &mut A) -> Step<V>
    where
        A: Actions<'a, Value = V>,
    {
        let state = &self.states[self.top().state];
        let prod = match state.reduce_prod {
            Some(prod) => prod,
            None => return Step::Error,
        };
        let size = state.reduce_size;
        let sym = state.reduce_sym;
        let mut indents = 0;
        let mut start_of_line = false;
        let split = self.frames.len() - size;
        let body: Vec<V> = self
            .frames
            .drain(split..)
            .filter_map(|frame| {
                indents += frame.indents;
                start_of_line |= frame.since_newline == 0;
                frame.value
            })
            .collect();

        if prod == 0 {
            let mut body = body.into_iter();
            return match body.next() {
                Some(value) => {
                    for rest in body {
                        actions.dispose(rest);
                    }
                    Step::Accept(value)
                }
                None => Step::Error,
            };
        }

        let value = actions.reduce(prod, body);
        match self.states[self.top().state].goto(sym) {
            Some(next) => {
                self.push(next, sym, indents, start_of_line, Some(value));
                Step::Continue
            }
            None => {
                log::error!("no transition on symbol {} after reducing {}", sym, prod);
                actions.dispose(value);
                Step::Error
            }
        }
    }

    /// Whether a layout-only reduction may happen before `tk`
    ///
    /// Frames other than the real top are only simulated, so only the token itself counts there.
    fn at_line_boundary(&self, tk: &Token, on_top: bool) -> bool {
        match tk.kind {
            TokenKind::Newline | TokenKind::Eof | TokenKind::Out => true,
            _ => on_top && self.top().indents == 0 && self.top().since_newline == 0,
        }
    }

    /// Whether `tk` can be shifted, possibly after reductions `reducible` would allow
    fn in_lookahead(&self, tk: &Token) -> bool {
        let sym = tk.kind.num();
        let mut stack: Vec<usize> = self.frames.iter().map(|frame| frame.state).collect();
        let mut on_top = true;
        for _ in 0..self.states.len() + stack.len() {
            let state = match stack.last() {
                Some(top) => &self.states[*top],
                None => return false,
            };
            if state.goto(sym).is_some() {
                return true;
            }
            if state.reduce_prod.is_none() || state.reduce_size >= stack.len() {
                return false;
            }
            if state.newline_only && !self.at_line_boundary(tk, on_top) {
                return false;
            }
            on_top = false;
            let reduce_sym = state.reduce_sym;
            stack.truncate(stack.len() - state.reduce_size);
            match stack.last().and_then(|top| self.states[*top].goto(reduce_sym)) {
                Some(next) => stack.push(next),
                None => return false,
            }
        }
        false
    }

    fn dispose<'a, A>(&mut self, actions: &mut A)
    where
        A: Actions<'a, Value = V>,
    {
        for frame in self.frames.drain(..) {
            if let Some(value) = frame.value {
                actions.dispose(value);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Goto;
    use lrtide_scan::{Ignored, TokenConfig, Tokenizer};
    use matches::assert_matches;

    // $start -> E $eof, E -> E + E (left associative), E -> NUMBER
    const GOTO_0: [Goto; 2] = [Goto { sym: 1, state: 2 }, Goto { sym: 14, state: 1 }];
    const GOTO_1: [Goto; 2] = [Goto { sym: 11, state: 3 }, Goto { sym: 12, state: 4 }];
    const GOTO_4: [Goto; 2] = [Goto { sym: 1, state: 2 }, Goto { sym: 14, state: 5 }];

    const fn state(go_to: &'static [Goto], reduce: Option<(usize, usize, usize)>, min_prefix: usize) -> State<'static> {
        let (reduce_prod, reduce_size, reduce_sym) = match reduce {
            Some((prod, size, sym)) => (Some(prod), size, sym),
            None => (None, 0, 0),
        };
        State {
            go_to,
            reduce_prod,
            reduce_size,
            reduce_sym,
            starts_line: false,
            newline_only: false,
            min_prefix,
        }
    }

    const STATES: [State<'static>; 6] = [
        state(&GOTO_0, None, 0),
        state(&GOTO_1, None, 1),
        state(&[], Some((2, 1, 14)), 1),
        state(&[], Some((0, 2, 13)), 2),
        state(&GOTO_4, None, 2),
        state(&[], Some((1, 3, 14)), 1),
    ];

    const NAMES: [&str; 15] = [
        "ERROR", "NUMBER", "IDENTIFIER", "MARK", "STRING", "MULTI_STRING", "LINE_COMMENT",
        "BLOCK_COMMENT", "IN", "OUT", "NEWLINE", "$eof", "+", "$start", "E",
    ];
    const KNOWN: [&str; 1] = ["+"];

    #[derive(Default)]
    struct Infix {
        disposed: usize,
    }

    impl<'a> Actions<'a> for Infix {
        type Value = String;

        fn token(&mut self, token: &Token<'a>) -> String {
            token.text.to_owned()
        }

        fn reduce(&mut self, prod: usize, body: Vec<String>) -> String {
            match prod {
                1 => format!("({}+{})", body[0], body[2]),
                _ => body.into_iter().next().unwrap_or_default(),
            }
        }

        fn error(&mut self, _token: &Token<'a>) -> String {
            "?".to_owned()
        }

        fn dispose(&mut self, _value: String) {
            self.disposed += 1;
        }
    }

    fn tokenizer(text: &str) -> Tokenizer {
        let config = TokenConfig {
            ignored: Ignored::COMMENTS,
            known: &KNOWN,
            ..TokenConfig::default()
        };
        Tokenizer::from_text(text, config)
    }

    #[test]
    fn test_left_associative_sum() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut actions = Infix::default();
        let mut parser = Parser::new(&STATES, &NAMES);
        let value = parser.parse(&mut tokenizer("1 + 2 + 3"), &mut actions);
        assert_eq!(value, Some("((1+2)+3)".to_owned()));
        // the `$eof` value left over at accept
        assert_eq!(actions.disposed, 1);
    }

    #[test]
    fn test_trace() {
        let mut out = Vec::new();
        let value = parse(
            &mut tokenizer("4 + 5"),
            &STATES,
            &mut Infix::default(),
            Some(&mut out),
            &NAMES,
        );
        assert_eq!(value, Some("(4+5)".to_owned()));

        let trace = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(lines[0], "(0) [NUMBER \"4\"] Shift");
        assert_eq!(lines[1], "(0) NUMBER (2) [+ \"+\"] Reduce");
        assert!(lines.last().unwrap().ends_with("[$eof] Accept"));
    }

    #[test]
    fn test_same_input_same_result() {
        let first = Parser::new(&STATES, &NAMES).parse(&mut tokenizer("7+8+9"), &mut Infix::default());
        let second = Parser::new(&STATES, &NAMES).parse(&mut tokenizer("7+8+9"), &mut Infix::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_abort_without_error_transitions() {
        let mut actions = Infix::default();
        let value = Parser::new(&STATES, &NAMES).parse(&mut tokenizer("1 + + 2"), &mut actions);
        assert_matches!(value, None);
        // `1` reduced to E, `+`, and the ERROR value itself
        assert_eq!(actions.disposed, 3);
    }

    // $start -> ERROR $eof, with a stray `OUT` transition after ERROR
    const STUCK_0: [Goto; 1] = [Goto { sym: 0, state: 1 }];
    const STUCK_1: [Goto; 2] = [Goto { sym: 9, state: 2 }, Goto { sym: 11, state: 3 }];

    const STUCK: [State<'static>; 4] = [
        state(&STUCK_0, None, 0),
        state(&STUCK_1, None, 1),
        state(&[], None, 2),
        state(&[], Some((0, 2, 13)), 2),
    ];

    struct Tokens<'a>(Vec<Token<'a>>);

    impl<'a> TokenSource<'a> for Tokens<'a> {
        fn next_token(&mut self) -> Token<'a> {
            if self.0.is_empty() {
                Token::synthetic(TokenKind::Eof, 2, 0)
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn test_repeated_recovery_skips_the_lookahead() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut tokens = Tokens(vec![Token::synthetic(TokenKind::Out, 1, 0)]);
        let mut actions = Infix::default();
        let mut out = Vec::new();
        let value = parse(&mut tokens, &STUCK, &mut actions, Some(&mut out), &NAMES);

        // `OUT` can neither be shifted nor cancelled, so the second attempt drops it
        assert_eq!(value, Some("?".to_owned()));
        assert_eq!(actions.disposed, 2);
        let trace = String::from_utf8(out).unwrap();
        let errors = trace.lines().filter(|line| line.ends_with("[OUT] ERROR")).count();
        assert_eq!(errors, 2);
        assert!(trace.lines().last().unwrap().ends_with("[$eof] Accept"));
    }
}
