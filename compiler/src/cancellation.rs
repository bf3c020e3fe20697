//! Cancellation (spec.md §5): "cancellable at well-defined checkpoints
//! (start of each phase, per top-level statement inside a script)."
//! Checking a flag is the entire contract — a compilation never awaits
//! or blocks, so there is nothing else to interrupt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use diagnostics::{CompileError, Error};

/// A cooperative cancellation flag shared between the caller and one
/// in-flight compilation. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// A checkpoint call: returns `CompileError::Cancelled` if the token
    /// was cancelled since the last check, otherwise `Ok(())`.
    pub fn check(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Compile(CompileError::Cancelled))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn cancelling_trips_the_checkpoint() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.check().is_err());
    }

    #[test]
    fn clones_share_the_same_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
