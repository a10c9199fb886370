//! Re-entrancy guards for the submission flow.
//!
//! Both guards are explicit state passed through the orchestrator, not
//! ambient flags. `OnceLatch` fires at most once for the lifetime of
//! its owner; the in-flight token blocks concurrent submissions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot latch. `acquire` returns true exactly once.
#[derive(Clone, Default)]
pub struct OnceLatch {
    fired: Arc<AtomicBool>,
}

impl OnceLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

/// Single in-flight-submission token. Holding the returned guard keeps
/// further submissions blocked until it is dropped.
#[derive(Clone, Default)]
pub(crate) struct InFlightToken {
    busy: Arc<AtomicBool>,
}

impl InFlightToken {
    pub(crate) fn try_acquire(&self) -> Option<InFlightGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

pub(crate) struct InFlightGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
