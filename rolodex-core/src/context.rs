//! Per-operation cancellation and deadline handle.
//!
//! Callers own the request deadline. The engine checks the context before it
//! opens a transaction and between statements; an open transaction is rolled
//! back when the check fails.

use crate::{RolodexResult, StorageError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shareable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Context passed to every engine operation.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    cancel: CancelFlag,
}

impl OpContext {
    /// A context that never expires and is never cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context expiring `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            cancel: CancelFlag::new(),
        }
    }

    /// Attach a cancellation flag shared with the caller.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Fail if the operation has been cancelled or its deadline has passed.
    pub fn check(&self) -> RolodexResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StorageError::Cancelled.into());
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(StorageError::DeadlineExceeded.into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RolodexError;

    #[test]
    fn test_background_never_fails() {
        assert!(OpContext::background().check().is_ok());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let ctx = OpContext::background().with_cancel(flag.clone());
        assert!(ctx.check().is_ok());
        flag.cancel();
        assert_eq!(
            ctx.check(),
            Err(RolodexError::Storage(StorageError::Cancelled))
        );
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = OpContext::with_timeout(Duration::ZERO);
        assert_eq!(
            ctx.check(),
            Err(RolodexError::Storage(StorageError::DeadlineExceeded))
        );
    }
}
