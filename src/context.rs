//! Explicit run identity and cancellation passed through every pipeline call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::PlanError;

/// Cooperative cancellation signal with an optional deadline.
///
/// Cloning shares the underlying flag, so a token handed to the planner can be
/// cancelled from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that only fires when [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that also fires once `timeout` has elapsed from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fails with [`PlanError::Cancelled`] naming the step about to start.
    ///
    /// # Errors
    ///
    /// Returns `PlanError::Cancelled` if the token has fired.
    pub fn check(&self, step: &str) -> Result<(), PlanError> {
        if self.is_cancelled() {
            return Err(PlanError::Cancelled(step.to_string()));
        }
        Ok(())
    }
}

/// Identity of one planning run.
///
/// Carried explicitly instead of living in process-wide state, so concurrent
/// runs never observe each other's identifiers.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Output directory name and log correlation id.
    pub run_id: String,
    /// Identifier of the analysis request that triggered the run.
    pub analysis_id: Option<u64>,
    /// Identifier of the user that created the request.
    pub created_by: Option<u64>,
    /// Cancellation checked between stages and inside clustering.
    pub cancel: CancelToken,
}

impl RunContext {
    /// Creates a context with no request metadata and a fresh token.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            analysis_id: None,
            created_by: None,
            cancel: CancelToken::new(),
        }
    }

    /// Replaces the cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_passes_check() {
        let token = CancelToken::new();
        assert!(token.check("initial evaluation").is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let observer = token.clone();
        token.cancel();
        assert!(observer.is_cancelled());
        let err = observer.check("clustering").unwrap_err();
        assert!(matches!(err, PlanError::Cancelled(ref step) if step == "clustering"));
    }

    #[test]
    fn elapsed_deadline_cancels() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
    }
}
