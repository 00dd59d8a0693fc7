use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListError {
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Index {index} out of range for collection of {len} element(s)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, ListError>;

impl<T> From<std::sync::PoisonError<T>> for ListError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Lock(err.to_string())
    }
}
