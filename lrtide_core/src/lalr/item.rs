use std::cmp::Ordering;

use crate::lalr::{Grammar, SymbolId};

/// Production with a dot marking how much of its body has been recognized
///
/// Items sort by production, and within a production by decreasing dot position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Item {
    pub prod: usize,
    pub dot: usize,
}

impl Ord for Item {
    fn cmp(&self, other: &Item) -> Ordering {
        self.prod
            .cmp(&other.prod)
            .then_with(|| other.dot.cmp(&self.dot))
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Item) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Item {
    pub fn new(prod: usize, dot: usize) -> Self {
        Item { prod, dot }
    }

    pub fn next_symbol(self, grammar: &Grammar) -> Option<SymbolId> {
        grammar.productions[self.prod].body.get(self.dot).cloned()
    }

    pub fn is_complete(self, grammar: &Grammar) -> bool {
        self.dot == grammar.productions[self.prod].body.len()
    }

    pub fn advance(self) -> Item {
        Item {
            prod: self.prod,
            dot: self.dot + 1,
        }
    }

    pub fn describe(self, grammar: &Grammar) -> String {
        grammar.production_string(self.prod, Some(self.dot))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_item_order() {
        let mut items = vec![
            Item::new(2, 0),
            Item::new(1, 0),
            Item::new(1, 2),
            Item::new(2, 1),
        ];
        items.sort();
        assert_eq!(
            items,
            vec![
                Item::new(1, 2),
                Item::new(1, 0),
                Item::new(2, 1),
                Item::new(2, 0)
            ]
        );
    }
}
