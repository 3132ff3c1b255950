use crate::sections::{block_indent, CodeNode};
use crate::token::{Ignored, Token, TokenConfig, TokenKind};

/// Number of nested indentation levels that are tracked
pub const MAX_INDENT_DEPTH: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    pos: usize,
    line: usize,
    col: usize,
}

/// Reads tokens from linearized code
///
/// Whitespace at the start of a line is turned into layout tokens: a deeper line produces
/// `Newline` followed by `In`, a line at the same column produces `Newline` and a shallower
/// line produces one `Out` per closed level followed by `Newline`. The first line of input has
/// no `Newline` in front of it and the end of input closes every open level before `Eof`.
pub struct Tokenizer<'a> {
    config: TokenConfig<'a>,
    nodes: Vec<CodeNode<'a>>,
    node: usize,
    cur: Cursor,
    undo: [Cursor; 2],

    indents: [usize; MAX_INDENT_DEPTH],
    depth: usize,
    started: bool,
    at_line_start: bool,
    line_first: bool,
    pending_out: usize,
    pending_newline: bool,
    pending_in: bool,
    layout_at: (usize, usize),

    done: bool,
    eof_returned: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(nodes: Vec<CodeNode<'a>>, config: TokenConfig<'a>) -> Self {
        let line = nodes.first().map(|node| node.line_no).unwrap_or(1);
        let cur = Cursor { pos: 0, line, col: 0 };
        Tokenizer {
            config,
            nodes,
            node: 0,
            cur,
            undo: [cur; 2],
            indents: [0; MAX_INDENT_DEPTH],
            depth: 0,
            started: false,
            at_line_start: true,
            line_first: false,
            pending_out: 0,
            pending_newline: false,
            pending_in: false,
            layout_at: (line, 0),
            done: false,
            eof_returned: false,
        }
    }

    /// Tokenize plain text as a single code node starting at line 1
    pub fn from_text(text: &'a str, config: TokenConfig<'a>) -> Self {
        let node = CodeNode {
            text,
            line_no: 1,
            indent: 0,
            needs_strip: false,
        };
        Tokenizer::new(vec![node], config)
    }

    /// Read the next token that is not ignored by the configuration
    ///
    /// Once the input is exhausted, every call returns `Eof`.
    pub fn next_token(&mut self) -> Token<'a> {
        loop {
            let token = self.scan();
            if !self.config.ignored.covers(token.kind) {
                return token;
            }
        }
    }

    /// Return the raw text up to `marker` and continue after it
    ///
    /// The text must lie within the current code node. Returns `None` and leaves the position
    /// unchanged if the marker does not occur.
    pub fn take_until(&mut self, marker: &str) -> Option<&'a str> {
        let text = self.text();
        let start = self.cur.pos;
        let len = text[start..].find(marker)?;
        while self.cur.pos < start + len + marker.len() {
            if self.get().is_none() {
                break;
            }
        }
        Some(&text[start..start + len])
    }

    fn text(&self) -> &'a str {
        self.nodes.get(self.node).map(|node| node.text).unwrap_or("")
    }

    fn rest(&self) -> &'a str {
        &self.text()[self.cur.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn get(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.undo[1] = self.undo[0];
        self.undo[0] = self.cur;
        self.cur.pos += c.len_utf8();
        match c {
            '\n' => {
                self.cur.line += 1;
                self.cur.col = 0;
            }
            '\t' => self.cur.col = (self.cur.col / 8 + 1) * 8,
            _ => self.cur.col += 1,
        }
        Some(c)
    }

    fn unget(&mut self) {
        self.cur = self.undo[0];
        self.undo[0] = self.undo[1];
    }

    fn token(&self, kind: TokenKind, start: Cursor) -> Token<'a> {
        Token {
            kind,
            text: &self.text()[start.pos..self.cur.pos],
            node: self.node,
            offset: start.pos,
            line: start.line,
            col: start.col,
        }
    }

    fn skip_spaces(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' || !c.is_whitespace() {
                break;
            }
            self.get();
        }
    }

    fn next_node(&mut self) {
        self.node += 1;
        let line = self
            .nodes
            .get(self.node)
            .map(|node| node.line_no)
            .unwrap_or(self.cur.line);
        self.cur = Cursor { pos: 0, line, col: 0 };
    }

    fn scan(&mut self) -> Token<'a> {
        loop {
            let (line, col) = self.layout_at;
            if self.pending_out > 0 {
                self.pending_out -= 1;
                return Token::synthetic(TokenKind::Out, line, col);
            }
            if self.pending_newline {
                self.pending_newline = false;
                return Token::synthetic(TokenKind::Newline, line, col);
            }
            if self.pending_in {
                self.pending_in = false;
                return Token::synthetic(TokenKind::In, line, col);
            }
            if self.done {
                return Token::synthetic(TokenKind::Eof, line, col);
            }

            if self.at_line_start {
                self.at_line_start = false;
                match self.begin_line() {
                    Some(indent) => {
                        self.layout_at = (self.cur.line, self.cur.col);
                        self.layout(indent);
                        self.line_first = true;
                    }
                    None => {
                        self.layout_at = (self.cur.line, self.cur.col);
                        self.pending_out = self.depth;
                        self.depth = 0;
                        self.done = true;
                    }
                }
                continue;
            }

            self.skip_spaces();
            match self.peek() {
                None => self.at_line_start = true,
                Some('\n') => {
                    self.get();
                    self.at_line_start = true;
                }
                Some(c) => {
                    let token = self.scan_token(c);
                    self.line_first = false;
                    return token;
                }
            }
        }
    }

    /// Skip to the first token of the next visible line and return its indent column
    fn begin_line(&mut self) -> Option<usize> {
        loop {
            let node = *self.nodes.get(self.node)?;
            if self.cur.pos >= node.text.len() {
                self.next_node();
                continue;
            }
            if node.needs_strip {
                self.cur.pos += block_indent(self.rest());
            }
            self.cur.col = node.indent;
            self.skip_spaces();
            let indent = self.cur.col;

            while self.skip_ignored_comment() {
                self.skip_spaces();
            }
            match self.peek() {
                None => continue,
                Some('\n') => {
                    self.get();
                    continue;
                }
                Some(_) => return Some(indent),
            }
        }
    }

    fn skip_ignored_comment(&mut self) -> bool {
        let saved = self.cur;
        match self.comment(saved) {
            Some(token) if self.config.ignored.covers(token.kind) => true,
            Some(_) => {
                self.cur = saved;
                false
            }
            None => false,
        }
    }

    fn layout(&mut self, indent: usize) {
        if !self.started {
            self.started = true;
            self.indents[0] = indent;
            return;
        }
        self.pending_newline = true;
        if indent > self.indents[self.depth] {
            self.push_indent(indent);
            return;
        }
        while self.depth > 0 && self.indents[self.depth] > indent {
            self.depth -= 1;
            self.pending_out += 1;
        }
        if self.indents[self.depth] > indent {
            self.indents[self.depth] = indent;
        } else if self.indents[self.depth] < indent {
            self.push_indent(indent);
        }
    }

    fn push_indent(&mut self, indent: usize) {
        if self.depth + 1 == MAX_INDENT_DEPTH {
            log::warn!(
                "line {}: indentation nested deeper than {} levels",
                self.cur.line,
                MAX_INDENT_DEPTH
            );
            return;
        }
        self.depth += 1;
        self.indents[self.depth] = indent;
        self.pending_in = true;
    }

    fn scan_token(&mut self, c: char) -> Token<'a> {
        let start = self.cur;
        if c.is_ascii_digit() {
            return self.number(start);
        }
        if self.config.is_word_start(c) {
            return self.word(start);
        }
        if c == '\'' || c == '"' || c == '`' {
            return self.string(start, c);
        }
        if let Some(token) = self.comment(start) {
            return token;
        }
        if self.config.is_mark(c) {
            return self.mark(start);
        }
        self.get();
        self.token(TokenKind::Error, start)
    }

    fn number(&mut self, start: Cursor) -> Token<'a> {
        let mut exponents = "eE";
        if self.get() == Some('0') {
            if let Some('x') | Some('X') = self.peek() {
                self.get();
                exponents = "pP";
            }
        }

        let mut seen_decimal = false;
        let mut after_exponent = false;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() {
                self.get();
                after_exponent = exponents.contains(c);
                continue;
            }
            if !self.config.number_chars.contains(c) {
                break;
            }
            match c {
                '.' | ',' => {
                    if seen_decimal {
                        break;
                    }
                    self.get();
                    match self.peek() {
                        Some(d) if d.is_ascii_digit() => seen_decimal = true,
                        _ => {
                            self.unget();
                            break;
                        }
                    }
                }
                '+' | '-' => {
                    if !after_exponent {
                        break;
                    }
                    self.get();
                }
                _ => {
                    self.get();
                }
            }
            after_exponent = false;
        }
        self.token(TokenKind::Number, start)
    }

    fn word(&mut self, start: Cursor) -> Token<'a> {
        self.get();
        while let Some(c) = self.peek() {
            if !self.config.is_word_cont(c) {
                break;
            }
            self.get();
        }
        let text = &self.text()[start.pos..self.cur.pos];
        match self.config.lookup(text) {
            Some(idx) => self.token(TokenKind::Reserved(idx), start),
            None => self.token(TokenKind::Ident, start),
        }
    }

    fn comment_ahead(&self) -> bool {
        let rest = self.rest();
        rest.starts_with("//")
            || rest.starts_with("/*")
            || (rest.starts_with('#') && self.config.hash_comments())
    }

    fn comment(&mut self, start: Cursor) -> Option<Token<'a>> {
        let rest = self.rest();
        if rest.starts_with("//") || (rest.starts_with('#') && self.config.hash_comments()) {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.get();
            }
            return Some(self.token(TokenKind::LineComment, start));
        }
        if !rest.starts_with("/*") {
            return None;
        }
        self.get();
        self.get();
        loop {
            match self.get() {
                None => return Some(self.token(TokenKind::Error, start)),
                Some('*') if self.peek() == Some('/') => {
                    self.get();
                    return Some(self.token(TokenKind::BlockComment, start));
                }
                Some(_) => {}
            }
        }
    }

    fn mark(&mut self, start: Cursor) -> Token<'a> {
        let mut stops = Vec::new();
        while let Some(c) = self.peek() {
            if !self.config.is_mark(c) || (!stops.is_empty() && self.comment_ahead()) {
                break;
            }
            self.get();
            stops.push(self.cur);
        }
        let text = self.text();

        for stop in stops.iter().rev() {
            if let Some(idx) = self.config.lookup(&text[start.pos..stop.pos]) {
                self.cur = *stop;
                return self.token(TokenKind::Reserved(idx), start);
            }
        }

        let first = match stops.first() {
            Some(first) => *first,
            None => {
                self.get();
                return self.token(TokenKind::Error, start);
            }
        };
        if self.config.ignored.contains(Ignored::MARK) {
            self.cur = first;
            return self.token(TokenKind::Error, start);
        }

        // An unknown mark ends where a known one begins
        let mut end = self.cur;
        for (idx, stop) in stops.iter().enumerate() {
            let known_follows = stops[idx + 1..]
                .iter()
                .any(|next| self.config.lookup(&text[stop.pos..next.pos]).is_some());
            if known_follows {
                end = *stop;
                break;
            }
        }
        self.cur = end;
        self.token(TokenKind::Mark, start)
    }

    fn string(&mut self, start: Cursor, quote: char) -> Token<'a> {
        let triple: String = [quote; 3].iter().collect();
        let rest = self.rest();
        if self.line_first && rest.starts_with(&triple) && rest[3..].starts_with('\n') {
            return self.multi_string(start, &triple);
        }

        self.get();
        loop {
            match self.peek() {
                None | Some('\n') => return self.token(TokenKind::Error, start),
                Some('\\') => {
                    self.get();
                    if let Some(c) = self.peek() {
                        if c != '\n' {
                            self.get();
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.get();
                    return self.token(TokenKind::String, start);
                }
                Some(_) => {
                    self.get();
                }
            }
        }
    }

    fn multi_string(&mut self, start: Cursor, triple: &str) -> Token<'a> {
        // Opening quotes and the line break after them
        for _ in 0..4 {
            self.get();
        }
        loop {
            let rest = self.rest();
            if rest.is_empty() {
                return self.token(TokenKind::Error, start);
            }
            let trimmed = rest.trim_start_matches(|c: char| c == ' ' || c == '\t');
            if trimmed.starts_with(triple) {
                self.skip_spaces();
                for _ in 0..3 {
                    self.get();
                }
                return self.token(TokenKind::MultiString, start);
            }
            while let Some(c) = self.get() {
                if c == '\n' {
                    break;
                }
            }
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    /// Yields every token up to and including `Eof`
    fn next(&mut self) -> Option<Token<'a>> {
        if self.eof_returned {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.eof_returned = true;
        }
        Some(token)
    }
}
