// Required due to codegen using quote macro
#![recursion_limit = "256"]

mod codegen;
mod error;
mod runtime;

pub use crate::codegen::generate;
pub use crate::error::CodegenError;
pub use crate::runtime::RuntimeTable;
