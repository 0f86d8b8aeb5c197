//! A cooperative cancellation signal checked before every suspension point
//! (rate-limit wait, HTTP send, retry sleep).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheaply cloneable; every clone observes the same cancellation flag.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
