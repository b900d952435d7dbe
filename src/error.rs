use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not open map {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed datafile header: {0}")]
    MalformedHeader(&'static str),

    #[error("truncated datafile: expected {expected} bytes, got {actual}")]
    TruncatedFile { expected: usize, actual: usize },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("item directory entry {index} is out of bounds")]
    CorruptItem { index: usize },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
