use crate::client::Oracle;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Offline oracle for dry runs and tests.
///
/// Returns scripted responses in order, then falls back to an empty JSON
/// array (a legitimate "nothing relevant" answer) once the script runs out.
#[derive(Default)]
pub struct StubOracle {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl StubOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn push_response(&self, response: Result<String>) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(response);
    }

    /// Number of `generate` calls observed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        match next {
            Some(response) => response,
            None => Ok("[]".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn scripted_responses_in_order_then_empty_array() {
        let oracle = StubOracle::scripted(["first", "second"]);
        assert_eq!(oracle.generate("a").await.unwrap(), "first");
        assert_eq!(oracle.generate("b").await.unwrap(), "second");
        assert_eq!(oracle.generate("c").await.unwrap(), "[]");
        assert_eq!(oracle.calls(), 3);
    }
}
