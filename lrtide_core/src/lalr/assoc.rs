use std::fmt;

#[derive(Debug, Ord, PartialOrd, Eq, PartialEq, Clone, Copy, Hash)]
pub enum Assoc {
    Left,
    Right,
    Non,
}

impl Default for Assoc {
    fn default() -> Self {
        Assoc::Left
    }
}

impl Assoc {
    pub fn from_keyword(word: &str) -> Option<Assoc> {
        match word {
            "LEFT" => Some(Assoc::Left),
            "RIGHT" => Some(Assoc::Right),
            "NON" => Some(Assoc::Non),
            _ => None,
        }
    }
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Assoc::Left => write!(f, "LEFT"),
            Assoc::Right => write!(f, "RIGHT"),
            Assoc::Non => write!(f, "NON"),
        }
    }
}

/// Precedence level (starting at 1) together with its associativity
#[derive(Debug, Eq, PartialEq, Clone, Copy, Hash)]
pub struct Precedence {
    pub level: usize,
    pub assoc: Assoc,
}

impl Precedence {
    /// Whether a terminal with precedence `self` may be shifted in a state whose best reducible
    /// production has precedence `reduce`
    pub fn allows_shift_over(self, reduce: Precedence) -> bool {
        self.level > reduce.level || (self.level == reduce.level && self.assoc == Assoc::Right)
    }
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "{}:{}", self.level, self.assoc)
    }
}
