use parking_lot::{Condvar, Mutex};

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Promise<T, D = (), E = Error> {
    Deferred(D),
    Resolved(T),
    Rejected(E),
}

impl<T, D, E> Promise<T, D, E> {
    pub fn is_deferred(&self) -> bool {
        matches!(self, Self::Deferred(_))
    }

    pub fn deferred(&self) -> Option<&D> {
        match self {
            Self::Deferred(def) => Some(def),
            _ => None,
        }
    }

    pub fn resolve_or_reject(&mut self, res: Result<T, E>) {
        *self = match res {
            Ok(ok) => Self::Resolved(ok),
            Err(err) => Self::Rejected(err),
        };
    }
}

/// A promise that several threads can wait on.  Settles exactly once; later
/// settle calls are ignored.
pub struct SharedPromise<T, D = ()> {
    state: Mutex<Promise<T, D>>,
    settled: Condvar,
}

impl<T: Clone, D: Clone> SharedPromise<T, D> {
    pub fn deferred(def: D) -> Self {
        Self {
            state: Mutex::new(Promise::Deferred(def)),
            settled: Condvar::new(),
        }
    }

    /// The value the promise was deferred with, while it is still pending.
    pub fn deferred_value(&self) -> Option<D> {
        self.state.lock().deferred().cloned()
    }

    pub fn is_settled(&self) -> bool {
        !self.state.lock().is_deferred()
    }

    pub fn settle(&self, res: Result<T, Error>) {
        let mut state = self.state.lock();
        if state.is_deferred() {
            state.resolve_or_reject(res);
            self.settled.notify_all();
        }
    }

    pub fn wait(&self) -> Result<T, Error> {
        let mut state = self.state.lock();
        while state.is_deferred() {
            self.settled.wait(&mut state);
        }
        match &*state {
            Promise::Resolved(val) => Ok(val.clone()),
            Promise::Rejected(err) => Err(err.clone()),
            Promise::Deferred(_) => Err(Error::FetchAborted),
        }
    }
}
