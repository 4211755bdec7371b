use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = SeqfeatError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SeqfeatError {
    /// A non-blank corpus line is not a `label<TAB>token` pair.
    #[error("malformed sentence row at line {line}: {content:?}")]
    MalformedSentenceRow { line: usize, content: String },

    /// The input file of a configured split does not exist.
    #[error("missing input for split {split:?}: {path}")]
    MissingSplitSource { split: String, path: PathBuf },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("interrupted while converting split {0:?}")]
    Interrupted(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SeqfeatError {
    pub(crate) fn invalid_config<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidConfig(msg.into())
    }
}
