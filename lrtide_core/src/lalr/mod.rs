mod assoc;
pub use self::assoc::{Assoc, Precedence};

mod symbol;
pub use self::symbol::{Symbol, SymbolId, SymbolKind, ValueType};

mod sets;
pub use self::sets::{SetHandle, SetTable, SortedSet, SymSet};

pub mod grammar;
pub use self::grammar::{Grammar, LineLike, Production};

mod item;
pub use self::item::Item;

mod state;
pub use self::state::ItemSet;

mod automaton;
pub use self::automaton::{Automaton, Strength, UnknownStrength};

mod conflict;
pub use self::conflict::{Conflict, ConflictKind};

mod table;
pub use self::table::{Table, TableState};
