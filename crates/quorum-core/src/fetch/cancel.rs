use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use super::FetchError;

#[derive(Default)]
struct CancelInner {
    cancelled: bool,
    wakers: Vec<Waker>,
}

/// Per-cycle supersession flag handed to the producer.
///
/// Cancellation is cooperative: a producer may poll `is_cancelled`, await
/// `cancelled()`, or ignore the handle entirely. The orchestrator discards a
/// cancelled cycle's result either way.
#[derive(Clone, Default)]
pub struct CancelHandle(Rc<RefCell<CancelInner>>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent. Wakes every task awaiting `cancelled()`.
    pub fn cancel(&self) {
        let wakers = {
            let mut inner = self.0.borrow_mut();
            if inner.cancelled {
                return;
            }
            inner.cancelled = true;
            std::mem::take(&mut inner.wakers)
        };
        for w in wakers {
            w.wake();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.borrow().cancelled
    }

    /// `Err(FetchError::Cancelled)` once cancelled, for use with `?`.
    pub fn check(&self) -> Result<(), FetchError> {
        if self.is_cancelled() {
            Err(FetchError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves when the handle is cancelled.
    pub fn cancelled(&self) -> Cancelled {
        Cancelled {
            handle: self.clone(),
        }
    }
}

pub struct Cancelled {
    handle: CancelHandle,
}

impl Future for Cancelled {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut inner = self.handle.0.borrow_mut();
        if inner.cancelled {
            return Poll::Ready(());
        }
        if !inner.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
