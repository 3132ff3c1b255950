use lrtide_scan::{Token, Tokenizer};

/// Anything that hands out tokens to the parser
///
/// After the end of input the source has to keep returning `Eof` tokens.
pub trait TokenSource<'a> {
    fn next_token(&mut self) -> Token<'a>;
}

impl<'a> TokenSource<'a> for Tokenizer<'a> {
    fn next_token(&mut self) -> Token<'a> {
        Tokenizer::next_token(self)
    }
}

/// Semantic actions run by the parser
///
/// Every shifted token and every reduction produces a value. Values that are dropped by error
/// recovery, or that are left over when the input is accepted, go through `dispose`.
pub trait Actions<'a> {
    type Value;

    /// Value for a shifted token
    fn token(&mut self, token: &Token<'a>) -> Self::Value;

    /// Value for the head of production `prod`, given the values of its body
    fn reduce(&mut self, prod: usize, body: Vec<Self::Value>) -> Self::Value;

    /// Value for the `ERROR` symbol pushed when `token` could not be parsed
    fn error(&mut self, token: &Token<'a>) -> Self::Value;

    fn dispose(&mut self, value: Self::Value) {
        drop(value);
    }
}
