use std::io;
use std::time::Duration;
use thiserror::Error;

/// Failures of an optional probe. None of these reach the sampling loop;
/// callers collapse them into an "unavailable" record.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("helper did not answer within {0:?}")]
    Timeout(Duration),

    #[error("helper produced no output")]
    NoOutput,

    #[error("malformed helper output: {0}")]
    Malformed(String),

    #[error("native GPU library error: {0}")]
    Native(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ProbeError>;

impl ProbeError {
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        ProbeError::Malformed(msg.into())
    }

    pub fn native<S: Into<String>>(msg: S) -> Self {
        ProbeError::Native(msg.into())
    }
}
