use std::collections::HashMap;

use lrtide_scan::{CodeNode, Ignored, Token, TokenConfig, TokenKind, Tokenizer, RESERVED_BASE};

use crate::error::{GrammarError, GrammarErrors};
use crate::lalr::{
    Assoc, Grammar, LineLike, Precedence, Production, Symbol, SymbolId, SymbolKind, ValueType,
};

const KNOWN: [&str; 6] = ["$", "$$", "$*", "${", "->", "|"];
const DOLLAR: TokenKind = TokenKind::Reserved(0);
const PREC: TokenKind = TokenKind::Reserved(1);
const STAR: TokenKind = TokenKind::Reserved(2);
const ACTION: TokenKind = TokenKind::Reserved(3);
const ARROW: TokenKind = TokenKind::Reserved(4);
const BAR: TokenKind = TokenKind::Reserved(5);

fn config() -> TokenConfig<'static> {
    TokenConfig {
        ignored: Ignored::COMMENTS | Ignored::IN | Ignored::OUT,
        known: &KNOWN,
        ..TokenConfig::default()
    }
}

impl Grammar {
    /// Read a grammar from linearized code
    ///
    /// A statement that fails is skipped up to the end of its line; reading continues with the
    /// next line and every problem is returned.
    pub fn read(code: Vec<CodeNode>) -> Result<Grammar, GrammarErrors> {
        let mut reader = Reader::new(Tokenizer::new(code, config()));
        reader.read_all();
        reader.finish()
    }

    pub fn read_str(text: &str) -> Result<Grammar, GrammarErrors> {
        let mut reader = Reader::new(Tokenizer::from_text(text, config()));
        reader.read_all();
        reader.finish()
    }
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::Newline => "end of line".to_owned(),
        TokenKind::Eof => "end of input".to_owned(),
        _ => format!("`{}`", token.text),
    }
}

fn unquote(text: &str) -> &str {
    if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    }
}

/// Where a body ended
enum BodyEnd {
    Line,
    Bar,
}

struct Reader<'a> {
    tokens: Tokenizer<'a>,
    pending: Option<Token<'a>>,
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    productions: Vec<Production>,
    errors: Vec<GrammarError>,
    value_type: Option<ValueType>,
    precedence_level: usize,
    head: Option<SymbolId>,
    first_head: Option<SymbolId>,
}

impl<'a> Reader<'a> {
    fn new(tokens: Tokenizer<'a>) -> Self {
        let mut reader = Reader {
            tokens,
            pending: None,
            symbols: Vec::new(),
            by_name: HashMap::new(),
            productions: Vec::new(),
            errors: Vec::new(),
            value_type: None,
            precedence_level: 0,
            head: None,
            first_head: None,
        };
        for kind in TokenKind::PREDEFINED.iter() {
            if let Some(name) = kind.name() {
                reader.add_symbol(name, SymbolKind::Terminal, 0);
            }
        }
        reader
    }

    fn next(&mut self) -> Token<'a> {
        match self.pending.take() {
            Some(token) => token,
            None => self.tokens.next_token(),
        }
    }

    fn unread(&mut self, token: Token<'a>) {
        self.pending = Some(token);
    }

    fn syntax(&mut self, token: Token<'a>, expected: &str) -> GrammarError {
        let message = format!("expected {}, found {}", expected, describe(&token));
        let line = token.line;
        self.unread(token);
        GrammarError::Syntax { line, message }
    }

    fn skip_line(&mut self) {
        loop {
            let token = self.next();
            match token.kind {
                TokenKind::Newline => return,
                TokenKind::Eof => {
                    self.unread(token);
                    return;
                }
                _ => {}
            }
        }
    }

    fn add_symbol(&mut self, name: &str, kind: SymbolKind, line: usize) -> SymbolId {
        let id = self.symbols.len();
        self.symbols.push(Symbol::new(name, kind, id, line));
        self.by_name.insert(name.to_owned(), id);
        id
    }

    fn read_all(&mut self) {
        loop {
            let token = self.next();
            let result = match token.kind {
                TokenKind::Eof => break,
                TokenKind::Newline => continue,
                DOLLAR => self.directive(false),
                STAR => self.directive(true),
                BAR => match self.head {
                    Some(head) => self.alternatives(head),
                    None => Err(GrammarError::Syntax {
                        line: token.line,
                        message: "`|` without a production to continue".to_owned(),
                    }),
                },
                TokenKind::Ident => self.production_line(token),
                _ => Err(self.syntax(token, "a production or a `$` directive")),
            };
            if let Err(err) = result {
                log::debug!("skipping rest of line after error: {}", err);
                self.errors.push(err);
                self.skip_line();
            }
        }
    }

    fn production_line(&mut self, head_token: Token<'a>) -> Result<(), GrammarError> {
        let head = self.define_head(&head_token)?;
        let arrow = self.next();
        if arrow.kind != ARROW {
            return Err(self.syntax(arrow, "`->`"));
        }
        self.head = Some(head);
        if self.first_head.is_none() {
            self.first_head = Some(head);
        }
        self.alternatives(head)
    }

    fn define_head(&mut self, token: &Token<'a>) -> Result<SymbolId, GrammarError> {
        let name = token.text;
        let id = match self.by_name.get(name) {
            Some(id) => *id,
            None => self.add_symbol(name, SymbolKind::Unknown, token.line),
        };
        let symbol = &mut self.symbols[id];
        match symbol.kind {
            SymbolKind::Unknown => {
                symbol.kind = SymbolKind::Nonterminal;
                symbol.value_type = self.value_type.clone();
                Ok(id)
            }
            SymbolKind::Nonterminal => Ok(id),
            SymbolKind::Terminal | SymbolKind::Virtual => Err(GrammarError::TerminalHead {
                line: token.line,
                name: name.to_owned(),
            }),
        }
    }

    fn alternatives(&mut self, head: SymbolId) -> Result<(), GrammarError> {
        loop {
            match self.body(head)? {
                BodyEnd::Bar => continue,
                BodyEnd::Line => return Ok(()),
            }
        }
    }

    fn body(&mut self, head: SymbolId) -> Result<BodyEnd, GrammarError> {
        let line = self.tokens_line();
        let mut body = Vec::new();
        let mut precedence = None;
        let mut line_like = LineLike::None;
        let mut action = None;
        let mut action_line = 0;

        let end = loop {
            let token = self.next();
            match token.kind {
                TokenKind::Newline | TokenKind::Eof => {
                    self.unread(token);
                    break BodyEnd::Line;
                }
                BAR => break BodyEnd::Bar,
                TokenKind::Ident => body.push(self.body_symbol(&token)?),
                TokenKind::String => {
                    body.push(self.literal(unquote(token.text), token.line)?);
                }
                TokenKind::Mark => body.push(self.literal(token.text, token.line)?),
                PREC => {
                    let name_token = self.next();
                    let name = match name_token.kind {
                        TokenKind::Ident | TokenKind::Mark => name_token.text,
                        TokenKind::String => unquote(name_token.text),
                        _ => return Err(self.syntax(name_token, "a symbol name after `$$`")),
                    };
                    match name {
                        "NEWLINE" => line_like = LineLike::Newline,
                        "OUT" => line_like = LineLike::Outdent,
                        _ => precedence = self.precedence_of(name, name_token.line),
                    }
                }
                ACTION => {
                    action_line = token.line;
                    let code = self
                        .tokens
                        .take_until("}$")
                        .ok_or(GrammarError::UnterminatedAction { line: token.line })?;
                    action = Some(code.to_owned());
                    let after = self.next();
                    match after.kind {
                        TokenKind::Newline | TokenKind::Eof => {
                            self.unread(after);
                            break BodyEnd::Line;
                        }
                        BAR => break BodyEnd::Bar,
                        _ => return Err(self.syntax(after, "end of line after action code")),
                    }
                }
                _ => return Err(self.syntax(token, "a symbol")),
            }
        };

        if precedence.is_none() {
            precedence = body
                .iter()
                .rev()
                .filter_map(|sym| self.symbols[*sym].precedence)
                .next();
        }
        self.productions.push(Production {
            head,
            body,
            precedence,
            action,
            action_line,
            line_like,
            line,
        });
        Ok(end)
    }

    /// Line of the token that will be read next
    fn tokens_line(&mut self) -> usize {
        let token = self.next();
        let line = token.line;
        self.unread(token);
        line
    }

    fn precedence_of(&self, name: &str, line: usize) -> Option<Precedence> {
        let precedence = self
            .by_name
            .get(name)
            .and_then(|id| self.symbols[*id].precedence);
        if precedence.is_none() {
            log::warn!(
                "line {}: `$${}` does not name a symbol with a precedence, ignored",
                line,
                name
            );
        }
        precedence
    }

    fn body_symbol(&mut self, token: &Token<'a>) -> Result<SymbolId, GrammarError> {
        match self.by_name.get(token.text) {
            Some(id) => {
                let symbol = &self.symbols[*id];
                if symbol.kind == SymbolKind::Virtual {
                    return Err(GrammarError::VirtualInBody {
                        line: token.line,
                        name: symbol.name.clone(),
                    });
                }
                Ok(*id)
            }
            None => Ok(self.add_symbol(token.text, SymbolKind::Unknown, token.line)),
        }
    }

    fn literal(&mut self, name: &str, line: usize) -> Result<SymbolId, GrammarError> {
        let id = match self.by_name.get(name) {
            Some(id) => *id,
            None => return Ok(self.add_symbol(name, SymbolKind::Terminal, line)),
        };
        let symbol = &mut self.symbols[id];
        match symbol.kind {
            SymbolKind::Terminal => Ok(id),
            SymbolKind::Virtual => {
                symbol.kind = SymbolKind::Terminal;
                Ok(id)
            }
            SymbolKind::Unknown | SymbolKind::Nonterminal => Err(GrammarError::ConflictingKind {
                line,
                name: name.to_owned(),
            }),
        }
    }

    /// `$ Type`, `$* Type`, `$void` or `$ LEFT|RIGHT|NON symbols...`
    fn directive(&mut self, plain: bool) -> Result<(), GrammarError> {
        let mut words = Vec::new();
        loop {
            let token = self.next();
            match token.kind {
                TokenKind::Newline | TokenKind::Eof => {
                    self.unread(token);
                    break;
                }
                TokenKind::Ident
                | TokenKind::Mark
                | TokenKind::String
                | TokenKind::Reserved(_) => words.push(token),
                _ => return Err(self.syntax(token, "a type name or a symbol")),
            }
        }

        let first = match words.first() {
            Some(first) => *first,
            None => {
                let token = self.next();
                return Err(self.syntax(token, "a type name or an associativity"));
            }
        };
        if !plain && first.kind == TokenKind::Ident {
            if let Some(assoc) = Assoc::from_keyword(first.text) {
                return self.precedence_line(assoc, &words[1..], first.line);
            }
            if first.text == "void" && words.len() == 1 {
                self.value_type = None;
                return Ok(());
            }
        }

        let mut type_name = String::new();
        let mut prev_word = false;
        for word in words.iter() {
            let is_word = word.kind == TokenKind::Ident;
            if is_word && prev_word {
                type_name.push(' ');
            }
            type_name.push_str(word.text);
            prev_word = is_word;
        }
        self.value_type = Some(if plain {
            ValueType::Plain(type_name)
        } else {
            ValueType::Boxed(type_name)
        });
        Ok(())
    }

    fn precedence_line(
        &mut self,
        assoc: Assoc,
        words: &[Token<'a>],
        line: usize,
    ) -> Result<(), GrammarError> {
        if words.is_empty() {
            return Err(GrammarError::Syntax {
                line,
                message: format!("`$ {}` names no symbols", assoc),
            });
        }
        self.precedence_level += 1;
        let precedence = Precedence {
            level: self.precedence_level,
            assoc,
        };

        for word in words {
            let (name, kind) = match word.kind {
                TokenKind::Ident => (word.text, SymbolKind::Virtual),
                TokenKind::String => (unquote(word.text), SymbolKind::Terminal),
                _ => (word.text, SymbolKind::Terminal),
            };
            let id = match self.by_name.get(name) {
                Some(id) => *id,
                None => self.add_symbol(name, kind, word.line),
            };
            let symbol = &mut self.symbols[id];
            if let SymbolKind::Unknown | SymbolKind::Nonterminal = symbol.kind {
                return Err(GrammarError::PrecedenceOnNonterminal {
                    line: word.line,
                    name: name.to_owned(),
                });
            }
            if symbol.precedence.is_some() {
                return Err(GrammarError::PrecedenceRedeclared {
                    line: word.line,
                    name: name.to_owned(),
                });
            }
            symbol.precedence = Some(precedence);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Grammar, GrammarErrors> {
        let first_head = match self.first_head {
            Some(head) => head,
            None => {
                self.errors.push(GrammarError::Empty);
                return Err(GrammarErrors(self.errors));
            }
        };
        for symbol in self.symbols.iter() {
            if symbol.kind == SymbolKind::Unknown {
                self.errors.push(GrammarError::Undefined {
                    line: symbol.line,
                    name: symbol.name.clone(),
                });
            }
        }
        if !self.errors.is_empty() {
            return Err(GrammarErrors(self.errors));
        }

        let start = self.add_symbol("$start", SymbolKind::Nonterminal, 0);
        let eof = TokenKind::Eof.num();
        self.productions.insert(
            0,
            Production {
                head: start,
                body: vec![first_head, eof],
                precedence: None,
                action: None,
                action_line: 0,
                line_like: LineLike::None,
                line: 0,
            },
        );

        let order = self.numbering(start);
        let mut renumbered = vec![None; self.symbols.len()];
        for (new, old) in order.iter().enumerate() {
            let mut symbol = self.symbols[*old].clone();
            symbol.num = new;
            renumbered[new] = Some(symbol);
        }
        let mut map = vec![0; self.symbols.len()];
        for (new, old) in order.iter().enumerate() {
            map[*old] = new;
        }
        let symbols = renumbered.into_iter().flatten().collect();
        let productions = self
            .productions
            .into_iter()
            .map(|mut production| {
                production.head = map[production.head];
                for sym in production.body.iter_mut() {
                    *sym = map[*sym];
                }
                production
            })
            .collect();

        let grammar = Grammar::assemble(symbols, productions);
        log::debug!(
            "read grammar with {} symbols and {} productions",
            grammar.symbols.len(),
            grammar.productions.len()
        );
        Ok(grammar)
    }

    /// Old ids in their final order
    fn numbering(&self, start: SymbolId) -> Vec<SymbolId> {
        let mut order: Vec<SymbolId> = (0..RESERVED_BASE).collect();

        let mut literals: Vec<&Symbol> = self.symbols[RESERVED_BASE..]
            .iter()
            .filter(|symbol| symbol.kind == SymbolKind::Terminal)
            .collect();
        literals.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        order.extend(literals.iter().map(|symbol| symbol.num));

        order.push(start);
        order.extend(
            self.symbols
                .iter()
                .filter(|symbol| symbol.kind == SymbolKind::Nonterminal && symbol.num != start)
                .map(|symbol| symbol.num),
        );
        order.extend(
            self.symbols
                .iter()
                .filter(|symbol| symbol.kind == SymbolKind::Virtual)
                .map(|symbol| symbol.num),
        );
        order
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use matches::assert_matches;

    const CALC: &str = "
$ LEFT + -
$ LEFT * /
$* i64
Expr -> Expr + Expr ${ $0 = $1 + $3; }$
    | Expr - Expr
    | Expr * Expr
    | Expr / Expr
    | ( Expr ) $$+
    | NUMBER
";

    #[test]
    fn test_read_calculator() {
        let grammar = Grammar::read_str(CALC).unwrap();
        // 12 predefined, 6 literals, $start, Expr
        assert_eq!(grammar.symbols.len(), 20);
        assert_eq!(grammar.known, vec!["(", ")", "*", "+", "-", "/"]);
        assert_eq!(grammar.lookup("+"), Some(RESERVED_BASE + 3));
        assert_eq!(grammar.lookup("$start"), Some(18));
        assert_eq!(grammar.start, 18);

        let expr = grammar.lookup("Expr").unwrap();
        assert_eq!(
            grammar.symbols[expr].value_type,
            Some(ValueType::Plain("i64".to_owned()))
        );
        assert_eq!(grammar.productions.len(), 7);
        assert_eq!(grammar.productions[0].body, vec![expr, TokenKind::Eof.num()]);
        assert_eq!(grammar.productions_of(expr), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(grammar.symbols[expr].first_production, Some(1));
        assert_eq!(
            grammar.productions[1].action.as_ref().map(|a| a.trim()),
            Some("$0 = $1 + $3;")
        );
        assert_eq!(grammar.productions[1].line, 5);

        let plus = Precedence {
            level: 1,
            assoc: Assoc::Left,
        };
        let times = Precedence {
            level: 2,
            assoc: Assoc::Left,
        };
        assert_eq!(grammar.productions[1].precedence, Some(plus));
        assert_eq!(grammar.productions[3].precedence, Some(times));
        assert_eq!(grammar.productions[5].precedence, Some(plus));
        assert_eq!(grammar.productions[6].precedence, None);
    }

    #[test]
    fn test_alternatives_on_one_line_and_strings() {
        let grammar = Grammar::read_str("S -> 'if' S | 'x'\n").unwrap();
        assert_eq!(grammar.known, vec!["if", "x"]);
        assert_eq!(grammar.productions.len(), 3);
        assert_eq!(grammar.production_string(1, Some(1)), "S -> if . S");
    }

    #[test]
    fn test_layout_markers_and_virtual_symbols() {
        let text = "
$ NON UMINUS
Block -> Stmts OUT $$OUT
Stmts -> Stmt | Stmts Stmt
Stmt -> IDENTIFIER NEWLINE $$NEWLINE
    | - IDENTIFIER $$UMINUS
    | IDENTIFIER $$unknown
";
        let grammar = Grammar::read_str(text).unwrap();
        let uminus = grammar.symbol("UMINUS").unwrap();
        assert_eq!(uminus.kind, SymbolKind::Virtual);
        assert_eq!(uminus.num, grammar.symbols.len() - 1);
        assert_eq!(grammar.productions[1].line_like, LineLike::Outdent);
        assert_eq!(grammar.productions[4].line_like, LineLike::Newline);
        assert_eq!(grammar.productions[5].precedence, uminus.precedence);
        assert_eq!(grammar.productions[6].precedence, None);
        assert!(grammar.symbol("unknown").is_none());

        let stmt = grammar.symbol("Stmt").unwrap();
        assert!(stmt.line_like);
        assert!(grammar.symbol("Stmts").unwrap().line_like);
    }

    #[test]
    fn test_errors_are_collected_per_line() {
        let text = "
$ LEFT +
$ RIGHT +
S -> A +
S A
S -> 12
A -> 'a'
";
        let errors = Grammar::read_str(text).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_matches!(
            &errors.0[0],
            GrammarError::PrecedenceRedeclared { line: 3, .. }
        );
        assert_matches!(&errors.0[1], GrammarError::Syntax { line: 5, .. });
        assert_matches!(&errors.0[2], GrammarError::Syntax { line: 6, .. });
    }

    #[test]
    fn test_undefined_and_terminal_heads() {
        let errors = Grammar::read_str("S -> A\nNUMBER -> S\n").unwrap_err();
        assert_eq!(
            errors.0,
            vec![
                GrammarError::TerminalHead {
                    line: 2,
                    name: "NUMBER".to_owned()
                },
                GrammarError::Undefined {
                    line: 1,
                    name: "A".to_owned()
                },
            ]
        );
        assert_eq!(
            Grammar::read_str("// nothing\n").unwrap_err().0,
            vec![GrammarError::Empty]
        );
    }

    #[test]
    fn test_unterminated_action() {
        let errors = Grammar::read_str("S -> 'x' ${ never closed\nT -> 'y'\n").unwrap_err();
        assert_eq!(errors.0, vec![GrammarError::UnterminatedAction { line: 1 }]);
    }
}
