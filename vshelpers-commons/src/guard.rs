//! Single-settlement completion primitive.
//!
//! Every asynchronous operation in this workspace listens to several event
//! sources at once (stream `data`/`end`/`error`, process exit, deferred value
//! chains). A [`CompletionGuard`] makes "deliver the outcome once" structural:
//! the first call to [`CompletionGuard::complete`] invokes exactly one of the
//! two callbacks and every later call is inert.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
type FailureFn<E> = Box<dyn FnOnce(E) + Send>;

struct Callbacks<T, E> {
    on_success: SuccessFn<T>,
    on_failure: Option<FailureFn<E>>,
}

/// Wraps a success/failure callback pair so only the first completion has
/// any effect.
pub struct CompletionGuard<T, E> {
    callbacks: Mutex<Option<Callbacks<T, E>>>,
}

impl<T, E> fmt::Debug for CompletionGuard<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionGuard")
            .field("has_fired", &self.has_fired())
            .finish()
    }
}

impl<T, E> CompletionGuard<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create a guard from a success callback and an optional failure
    /// callback. Without a failure callback a failure is still consumed, it
    /// simply has no observer.
    pub fn new<S>(on_success: S, on_failure: Option<Box<dyn FnOnce(E) + Send>>) -> Self
    where
        S: FnOnce(T) + Send + 'static,
    {
        Self {
            callbacks: Mutex::new(Some(Callbacks {
                on_success: Box::new(on_success),
                on_failure,
            })),
        }
    }

    /// Create a guard whose outcome is delivered through a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<Result<T, E>>) {
        let (tx, rx) = oneshot::channel();
        let failure_tx = Arc::new(Mutex::new(Some(tx)));
        let success_tx = Arc::clone(&failure_tx);

        let guard = Self::new(
            move |value| {
                if let Some(tx) = success_tx.lock().take() {
                    let _ = tx.send(Ok(value));
                }
            },
            Some(Box::new(move |error: E| {
                if let Some(tx) = failure_tx.lock().take() {
                    let _ = tx.send(Err(error));
                }
            })),
        );
        (guard, rx)
    }
}

impl<T, E> CompletionGuard<T, E> {
    /// Deliver the outcome. Returns `true` when this call fired the guard and
    /// `false` when an earlier call already had.
    pub fn complete(&self, outcome: Result<T, E>) -> bool {
        // Callbacks run outside the lock so they may call back into the guard.
        let Some(callbacks) = self.callbacks.lock().take() else {
            return false;
        };

        match outcome {
            Ok(value) => (callbacks.on_success)(value),
            Err(error) => {
                if let Some(on_failure) = callbacks.on_failure {
                    on_failure(error);
                }
            }
        }
        true
    }

    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    pub fn fail(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    pub fn has_fired(&self) -> bool {
        self.callbacks.lock().is_none()
    }
}
