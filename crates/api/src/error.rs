#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Malformed symbol table line {line_no}: {line}")]
    MalformedLine { line_no: usize, line: String },
    #[error("Unsupported value type `{0}`, expected `int` or `int[]`")]
    UnsupportedValueType(String),
    #[error("Malformed resource value: {0}")]
    MalformedValue(String),
    #[error("Invalid split specification: {0:?}")]
    InvalidSplit(String),
    #[error("Invalid library descriptor: {0}")]
    InvalidLibrary(String),
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;
