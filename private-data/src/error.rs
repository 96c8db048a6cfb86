use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("cannot build a merkle tree with zero leaves")]
    EmptyTree,

    #[error("invalid index {index}: document has {len} fields")]
    InvalidIndex { index: usize, len: usize },

    #[error("index {0} requested more than once")]
    DuplicateIndex(usize),

    #[error("invalid multi-proof: {0}")]
    InvalidMultiProof(String),

    #[error("field `{name}` declared as {expected} but holds a {got} value")]
    TypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    #[error("field name must not be empty")]
    EmptyName,

    #[error("unsupported field type `{0}`")]
    UnsupportedType(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("data does not match schema: {0}")]
    SchemaMismatch(String),

    #[error("invalid hex: {0}")]
    Hex(String),

    #[error("abi error: {0}")]
    Abi(String),
}
