use crate::error::Error;
use std::sync::OnceLock;
use tracing::{error, warn};

/// Holds the first worker failure of a batch.
///
/// The first writer wins; later failures are only logged. The slot is read
/// after every worker has been joined.
#[derive(Debug, Default)]
pub struct FirstFailure {
    slot: OnceLock<Error>,
}

impl FirstFailure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `err` for `worker`; returns whether it was the first failure
    pub fn record(&self, worker: usize, err: Error) -> bool {
        let message = err.to_string();
        let wrapped = match err {
            err @ (Error::WorkerFailed { .. } | Error::WorkerPanicked { .. }) => err,
            other => Error::WorkerFailed {
                worker,
                source: Box::new(other),
            },
        };

        match self.slot.set(wrapped) {
            Ok(()) => {
                error!("Worker {} failed: {}", worker, message);
                true
            }
            Err(_) => {
                warn!("Worker {} also failed: {}", worker, message);
                false
            }
        }
    }

    pub fn is_set(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn into_inner(self) -> Option<Error> {
        self.slot.into_inner()
    }
}
