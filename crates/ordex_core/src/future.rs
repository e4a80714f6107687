//! Completion futures for non-blocking mutations.
//!
//! Index mutations never block a worker thread: conflict and lock-contention
//! outcomes are delivered through an [`OpFuture`], whose tri-state is
//! pending, success, or failure. The only suspension point behind a pending
//! future is the map's lock wait; resolution may therefore happen on the
//! lock holder's commit thread, and registered callbacks run there.

use crate::error::{IndexError, IndexResult};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

type Callback<T> = Box<dyn FnOnce(&IndexResult<T>) + Send>;

enum State<T> {
    Pending(Vec<Callback<T>>),
    Done(IndexResult<T>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    resolved: Condvar,
}

/// The resolving side of a completion pair.
///
/// Dropping a promise without resolving it fails the future with an
/// internal-inconsistency error, so a lost wait can never hang a caller.
pub struct OpPromise<T: Clone> {
    shared: Arc<Shared<T>>,
    resolved: bool,
}

/// An asynchronously completed operation result.
///
/// Callers must treat "not yet resolved" as a distinct third outcome
/// alongside success and failure: [`OpFuture::poll`] reports it without
/// blocking, [`OpFuture::wait`] parks until resolution.
pub struct OpFuture<T: Clone> {
    shared: Arc<Shared<T>>,
}

/// Creates a connected promise/future pair.
pub fn completion<T: Clone>() -> (OpPromise<T>, OpFuture<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending(Vec::new())),
        resolved: Condvar::new(),
    });
    (
        OpPromise {
            shared: Arc::clone(&shared),
            resolved: false,
        },
        OpFuture { shared },
    )
}

impl<T: Clone> OpPromise<T> {
    /// Resolves the future with a success value.
    pub fn succeed(self, value: T) {
        self.complete(Ok(value));
    }

    /// Resolves the future with a failure.
    pub fn fail(self, error: IndexError) {
        self.complete(Err(error));
    }

    /// Resolves the future with the given result.
    pub fn complete(mut self, result: IndexResult<T>) {
        self.resolved = true;
        self.shared.resolve(result);
    }
}

impl<T: Clone> Drop for OpPromise<T> {
    fn drop(&mut self) {
        if !self.resolved {
            self.shared.resolve(Err(IndexError::internal(
                "operation promise dropped without resolution",
            )));
        }
    }
}

impl<T: Clone> Shared<T> {
    fn resolve(&self, result: IndexResult<T>) {
        let callbacks = {
            let mut state = self.state.lock();
            match &mut *state {
                State::Pending(callbacks) => {
                    let callbacks = std::mem::take(callbacks);
                    *state = State::Done(result.clone());
                    callbacks
                }
                // Double resolution is a defect in the map layer; keep the
                // first outcome.
                State::Done(_) => return,
            }
        };
        self.resolved.notify_all();
        // Callbacks run outside the state lock so they may touch this
        // future again without deadlocking.
        for cb in callbacks {
            cb(&result);
        }
    }
}

impl<T: Clone> OpFuture<T> {
    /// Creates an already-resolved future.
    #[must_use]
    pub fn ready(result: IndexResult<T>) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::Done(result)),
            resolved: Condvar::new(),
        });
        Self { shared }
    }

    /// Creates an already-succeeded future.
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        Self::ready(Ok(value))
    }

    /// Creates an already-failed future.
    #[must_use]
    pub fn failed(error: IndexError) -> Self {
        Self::ready(Err(error))
    }

    /// Returns the outcome if resolved, `None` while pending. Never blocks.
    #[must_use]
    pub fn poll(&self) -> Option<IndexResult<T>> {
        match &*self.shared.state.lock() {
            State::Pending(_) => None,
            State::Done(result) => Some(result.clone()),
        }
    }

    /// Returns true once the operation has resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(&*self.shared.state.lock(), State::Done(_))
    }

    /// Blocks the calling thread until the operation resolves.
    pub fn wait(&self) -> IndexResult<T> {
        let mut state = self.shared.state.lock();
        loop {
            if let State::Done(result) = &*state {
                return result.clone();
            }
            self.shared.resolved.wait(&mut state);
        }
    }

    /// Registers a callback to run at resolution.
    ///
    /// Runs immediately on the current thread if already resolved, otherwise
    /// on whichever thread resolves the promise.
    pub fn on_complete(&self, callback: impl FnOnce(&IndexResult<T>) + Send + 'static) {
        let mut state = self.shared.state.lock();
        match &mut *state {
            State::Pending(callbacks) => callbacks.push(Box::new(callback)),
            State::Done(result) => {
                let result = result.clone();
                drop(state);
                callback(&result);
            }
        }
    }

    /// Forwards this future's outcome into a promise, mapping the result.
    pub fn forward_into<U: Clone + Send + 'static>(
        &self,
        promise: OpPromise<U>,
        map: impl FnOnce(IndexResult<T>) -> IndexResult<U> + Send + 'static,
    ) where
        T: Send + 'static,
        U: Send,
    {
        self.on_complete(move |result| promise.complete(map(result.clone())));
    }
}
