use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    #[error("line {line}: action of production {prod} is not valid Rust: {message}")]
    Action {
        prod: usize,
        line: usize,
        message: String,
    },
    #[error("value type `{name}` is not a valid Rust type: {message}")]
    ValueType { name: String, message: String },
    #[error("header code is not valid Rust: {message}")]
    Header { message: String },
    #[error(transparent)]
    Pattern(#[from] regex::Error),
}
