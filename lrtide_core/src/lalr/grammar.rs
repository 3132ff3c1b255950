use std::collections::BTreeMap;
use std::io::{self, Write};

use lrtide_scan::{Ignored, TokenKind, RESERVED_BASE};

use crate::lalr::{Precedence, SymSet, Symbol, SymbolId, SymbolKind, ValueType};

/// Layout boundary a production has to end at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineLike {
    None,
    Newline,
    Outdent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    pub head: SymbolId,
    pub body: Vec<SymbolId>,
    pub precedence: Option<Precedence>,
    pub action: Option<String>,
    pub action_line: usize,
    pub line_like: LineLike,
    pub line: usize,
}

/// Symbol table and productions of a grammar
///
/// Symbols are numbered so that the predefined token kinds come first, followed by the literal
/// terminals in byte order, the nonterminals (starting with `$start`) and finally the virtual
/// symbols. Production 0 is the augmented start production `$start -> S $eof`.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    pub productions: Vec<Production>,
    /// Literal terminals in byte order; entry `i` is read as `TokenKind::Reserved(i)`
    pub known: Vec<String>,
    pub start: SymbolId,
    by_name: BTreeMap<String, SymbolId>,
    by_head: Vec<Vec<usize>>,
}

pub const NEWLINE: SymbolId = 10;
pub const EOF: SymbolId = 11;

impl Grammar {
    /// Build a grammar from renumbered symbols and productions
    pub(crate) fn assemble(mut symbols: Vec<Symbol>, productions: Vec<Production>) -> Grammar {
        debug_assert_eq!(TokenKind::Newline.num(), NEWLINE);
        debug_assert_eq!(TokenKind::Eof.num(), EOF);

        let mut by_head = vec![Vec::new(); symbols.len()];
        for (idx, production) in productions.iter().enumerate() {
            by_head[production.head].push(idx);
            let head = &mut symbols[production.head];
            if head.first_production.is_none() {
                head.first_production = Some(idx);
            }
        }
        let by_name = symbols
            .iter()
            .map(|symbol| (symbol.name.clone(), symbol.num))
            .collect();
        let known = symbols
            .iter()
            .filter(|symbol| symbol.is_terminal() && symbol.num >= RESERVED_BASE)
            .map(|symbol| symbol.name.clone())
            .collect();
        let start = productions.first().map(|p| p.head).unwrap_or(0);

        let mut grammar = Grammar {
            symbols,
            productions,
            known,
            start,
            by_name,
            by_head,
        };
        grammar.set_nullable();
        grammar.set_line_like();
        grammar
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).cloned()
    }

    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.lookup(name).map(|id| &self.symbols[id])
    }

    pub fn name(&self, sym: SymbolId) -> &str {
        &self.symbols[sym].name
    }

    pub fn productions_of(&self, head: SymbolId) -> &[usize] {
        &self.by_head[head]
    }

    pub fn is_terminal(&self, sym: SymbolId) -> bool {
        self.symbols[sym].is_terminal()
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|symbol| symbol.is_nonterminal())
    }

    /// Token categories a tokenizer feeding this grammar should drop
    ///
    /// Comments are always dropped. Layout tokens are kept only when a body refers to them or a
    /// production has to end at one. Indents stay whenever newlines do, since they decide where
    /// a newline may end a line.
    pub fn ignored_tokens(&self) -> Ignored {
        let used = |kind: TokenKind| {
            self.productions
                .iter()
                .any(|production| production.body.contains(&kind.num()))
        };
        let ends_at = |line_like: LineLike| {
            self.productions
                .iter()
                .any(|production| production.line_like == line_like)
        };
        let newlines = used(TokenKind::Newline) || ends_at(LineLike::Newline);
        let mut ignored = Ignored::COMMENTS;
        if !newlines && !used(TokenKind::In) && !used(TokenKind::Out) && !ends_at(LineLike::Outdent)
        {
            ignored |= Ignored::IN | Ignored::OUT;
        }
        if !newlines {
            ignored |= Ignored::NEWLINE;
        }
        ignored
    }

    /// Type of the value a nonterminal produces, if one was declared
    pub fn value_type(&self, sym: SymbolId) -> Option<&ValueType> {
        self.symbols[sym].value_type.as_ref()
    }

    /// Mark every symbol that can derive the empty string
    pub fn set_nullable(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions.iter() {
                if self.symbols[production.head].nullable {
                    continue;
                }
                if production.body.iter().all(|sym| self.symbols[*sym].nullable) {
                    self.symbols[production.head].nullable = true;
                    changed = true;
                }
            }
        }
    }

    /// Mark `NEWLINE` and every head with a line-like symbol in one of its bodies
    pub fn set_line_like(&mut self) {
        if let Some(newline) = self.symbols.get_mut(NEWLINE) {
            newline.line_like = true;
        }
        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions.iter() {
                if self.symbols[production.head].line_like {
                    continue;
                }
                if production.body.iter().any(|sym| self.symbols[*sym].line_like) {
                    self.symbols[production.head].line_like = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST set of every symbol, indexed by symbol id
    pub fn first_sets(&self) -> Vec<SymSet> {
        let mut first = vec![SymSet::new(); self.symbols.len()];
        for symbol in self.symbols.iter().filter(|s| s.is_terminal()) {
            first[symbol.num].add(symbol.num);
        }

        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions.iter() {
                for sym in production.body.iter() {
                    if *sym != production.head {
                        let first_sym = first[*sym].clone();
                        changed |= first[production.head].union(&first_sym);
                    }
                    if !self.symbols[*sym].nullable {
                        break;
                    }
                }
            }
        }
        first
    }

    /// FIRST set of a symbol sequence and whether the whole sequence is nullable
    pub fn first_of_seq(&self, first: &[SymSet], seq: &[SymbolId]) -> (SymSet, bool) {
        let mut set = SymSet::new();
        for sym in seq {
            set.union(&first[*sym]);
            if !self.symbols[*sym].nullable {
                return (set, false);
            }
        }
        (set, true)
    }

    /// FOLLOW set of every symbol, indexed by symbol id
    ///
    /// The first phase adds what can follow a symbol inside a single body, the second phase
    /// propagates the FOLLOW set of heads into trailing nullable-suffixed body symbols until
    /// nothing changes.
    pub fn follow_sets(&self, first: &[SymSet]) -> Vec<SymSet> {
        let mut follow = vec![SymSet::new(); self.symbols.len()];

        for production in self.productions.iter() {
            for (pos, sym) in production.body.iter().enumerate() {
                let (rest, _) = self.first_of_seq(first, &production.body[pos + 1..]);
                follow[*sym].union(&rest);
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for production in self.productions.iter() {
                for sym in production.body.iter().rev() {
                    if *sym != production.head {
                        let follow_head = follow[production.head].clone();
                        changed |= follow[*sym].union(&follow_head);
                    }
                    if !self.symbols[*sym].nullable {
                        break;
                    }
                }
            }
        }
        follow
    }

    /// `head -> body` with an optional dot before body position `dot`
    pub fn production_string(&self, prod: usize, dot: Option<usize>) -> String {
        let production = &self.productions[prod];
        let mut result = format!("{} ->", self.name(production.head));
        for (pos, sym) in production.body.iter().enumerate() {
            if dot == Some(pos) {
                result.push_str(" .");
            }
            result.push(' ');
            result.push_str(self.name(*sym));
        }
        if dot == Some(production.body.len()) {
            result.push_str(" .");
        }
        result
    }

    pub fn write_symbols(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Symbols:")?;
        for symbol in self.symbols.iter() {
            let kind = match symbol.kind {
                SymbolKind::Terminal => "terminal",
                SymbolKind::Nonterminal => "nonterminal",
                SymbolKind::Virtual => "virtual",
                SymbolKind::Unknown => "unknown",
            };
            write!(out, " {:>3}: {} {}", symbol.num, symbol.name, kind)?;
            if let Some(precedence) = symbol.precedence {
                write!(out, " ({})", precedence)?;
            }
            if symbol.nullable {
                write!(out, " nullable")?;
            }
            if symbol.line_like {
                write!(out, " line-like")?;
            }
            if let Some(value_type) = &symbol.value_type {
                write!(out, " <{}>", value_type.name())?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn write_productions(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "Productions:")?;
        for (idx, production) in self.productions.iter().enumerate() {
            write!(out, " {:>3}: {}", idx, self.production_string(idx, None))?;
            if let Some(precedence) = production.precedence {
                write!(out, " $${}", precedence)?;
            }
            match production.line_like {
                LineLike::None => {}
                LineLike::Newline => write!(out, " [ends at NEWLINE]")?,
                LineLike::Outdent => write!(out, " [ends at OUT]")?,
            }
            if production.action.is_some() {
                write!(out, " ${{...}}$")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    /// Dump FIRST sets (with nullable marks) and, if given, FOLLOW sets of all nonterminals
    pub fn write_first_follow(
        &self,
        out: &mut dyn Write,
        first: &[SymSet],
        follow: Option<&[SymSet]>,
    ) -> io::Result<()> {
        for symbol in self.nonterminals() {
            write!(out, "FIRST({}) = {{", symbol.name)?;
            if symbol.nullable {
                write!(out, " `empty'")?;
            }
            for sym in first[symbol.num].keys() {
                write!(out, " {}", self.name(*sym))?;
            }
            writeln!(out, " }}")?;
        }
        if let Some(follow) = follow {
            for symbol in self.nonterminals() {
                write!(out, "FOLLOW({}) = {{", symbol.name)?;
                for sym in follow[symbol.num].keys() {
                    write!(out, " {}", self.name(*sym))?;
                }
                writeln!(out, " }}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const OPTIONAL: &str = "
S -> A B 'x'
A -> 'a' |
B -> 'b' | A
";

    #[test]
    fn test_nullable() {
        let mut grammar = Grammar::read_str(OPTIONAL).unwrap();
        assert!(!grammar.symbol("S").unwrap().nullable);
        assert!(grammar.symbol("A").unwrap().nullable);
        assert!(grammar.symbol("B").unwrap().nullable);

        let before: Vec<bool> = grammar.symbols.iter().map(|s| s.nullable).collect();
        grammar.set_nullable();
        let after: Vec<bool> = grammar.symbols.iter().map(|s| s.nullable).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_first_and_follow() {
        let grammar = Grammar::read_str(OPTIONAL).unwrap();
        let first = grammar.first_sets();
        let id = |name: &str| grammar.lookup(name).unwrap();
        let names = |set: &SymSet| -> Vec<String> {
            set.keys().iter().map(|sym| grammar.name(*sym).to_owned()).collect()
        };

        assert_eq!(names(&first[id("S")]), vec!["a", "b", "x"]);
        assert_eq!(names(&first[id("B")]), vec!["a", "b"]);
        assert_eq!(names(&first[id("x")]), vec!["x"]);

        let (seq, nullable) = grammar.first_of_seq(&first, &[id("A"), id("B")]);
        assert_eq!(names(&seq), vec!["a", "b"]);
        assert!(nullable);

        let follow = grammar.follow_sets(&first);
        assert_eq!(names(&follow[id("A")]), vec!["a", "b", "x"]);
        assert_eq!(names(&follow[id("B")]), vec!["x"]);
        assert_eq!(names(&follow[id("S")]), vec!["$eof"]);
    }

    #[test]
    fn test_first_sets_are_sound() {
        let grammar = Grammar::read_str(OPTIONAL).unwrap();
        let first = grammar.first_sets();
        for production in grammar.productions.iter() {
            let (body_first, _) = grammar.first_of_seq(&first, &production.body);
            for sym in body_first.keys() {
                assert!(first[production.head].contains(sym));
            }
        }
    }

    #[test]
    fn test_ignored_tokens() {
        let grammar = Grammar::read_str(OPTIONAL).unwrap();
        assert_eq!(grammar.ignored_tokens(), Ignored::COMMENTS | Ignored::LAYOUT);

        let grammar = Grammar::read_str("Lines -> Line | Lines Line\nLine -> IDENTIFIER NEWLINE\n")
            .unwrap();
        assert_eq!(grammar.ignored_tokens(), Ignored::COMMENTS);

        let grammar = Grammar::read_str("Block -> IN IDENTIFIER OUT\n").unwrap();
        assert_eq!(grammar.ignored_tokens(), Ignored::COMMENTS | Ignored::NEWLINE);
    }

    #[test]
    fn test_write_productions() {
        let grammar = Grammar::read_str("$ LEFT +\nE -> E + E | NUMBER\n").unwrap();
        let mut out = Vec::new();
        grammar.write_productions(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  0: $start -> E $eof\n"));
        assert!(text.contains("  1: E -> E + E $$1:LEFT\n"));
        assert!(text.contains("  2: E -> NUMBER\n"));
    }
}
