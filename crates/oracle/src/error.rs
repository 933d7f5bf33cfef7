use thiserror::Error;

pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle rate limited: {0}")]
    RateLimited(String),

    #[error("transient oracle error: {0}")]
    Transient(String),

    #[error("oracle returned an empty response")]
    Empty,

    #[error("malformed oracle response: {0}")]
    Malformed(String),

    #[error("oracle request failed: {0}")]
    Fatal(String),
}

impl OracleError {
    /// Whether the caller should retry after a backoff.
    ///
    /// Empty and malformed responses count as retryable: the service
    /// occasionally drops output or wraps it in prose, and a second attempt
    /// usually succeeds.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::RateLimited(_)
                | OracleError::Transient(_)
                | OracleError::Empty
                | OracleError::Malformed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_malformed_are_transient() {
        assert!(OracleError::RateLimited("429".into()).is_transient());
        assert!(OracleError::Transient("timeout".into()).is_transient());
        assert!(OracleError::Empty.is_transient());
        assert!(OracleError::Malformed("not json".into()).is_transient());
    }

    #[test]
    fn fatal_is_not_transient() {
        assert!(!OracleError::Fatal("bad request".into()).is_transient());
    }
}
