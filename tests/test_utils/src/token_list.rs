use lrtide::{Token, TokenKind, TokenSource};

/// Hands out a fixed list of tokens, then `Eof` forever
pub struct TokenList<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> TokenList<'a> {
    /// One token per entry, each on its own line
    pub fn new(input: &[(TokenKind, &'a str)]) -> Self {
        let tokens = input
            .iter()
            .enumerate()
            .map(|(line, (kind, text))| Token {
                text: *text,
                ..Token::synthetic(*kind, line + 1, 0)
            })
            .collect();
        TokenList { tokens, pos: 0 }
    }

    /// How many tokens the parser has taken so far
    pub fn consumed(&self) -> usize {
        self.pos
    }
}

impl<'a> TokenSource<'a> for TokenList<'a> {
    fn next_token(&mut self) -> Token<'a> {
        match self.tokens.get(self.pos) {
            Some(token) => {
                self.pos += 1;
                *token
            }
            None => Token::synthetic(TokenKind::Eof, self.tokens.len() + 1, 0),
        }
    }
}
