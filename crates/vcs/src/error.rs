use thiserror::Error;

pub type Result<T> = std::result::Result<T, VcsError>;

#[derive(Error, Debug)]
pub enum VcsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git {command} failed with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        /// Already scrubbed of secrets.
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}
