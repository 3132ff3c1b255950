mod token_list;

pub use crate::token_list::TokenList;
