//! A backend together with the handle its `prepare` returned.

use tracing::debug;

use crate::backend::{Backend, BackendError};

use super::WorkItem;

/// Owns a backend and, once prepared, its handle.
pub struct Session<B: Backend> {
    backend: B,
    handle: Option<B::Handle>,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            handle: None,
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.handle.is_some()
    }

    /// Prepare the backend once. Later calls are no-ops.
    pub fn prepare(&mut self) -> Result<(), BackendError> {
        if self.handle.is_some() {
            debug!("backend already prepared");
            return Ok(());
        }

        self.handle = Some(self.backend.prepare()?);
        Ok(())
    }

    /// Run the backend on one item.
    pub fn process(&self, item: &WorkItem) -> Result<Vec<u8>, BackendError> {
        let handle = self.handle.as_ref().ok_or(BackendError::NotPrepared)?;
        self.backend.process(handle, item)
    }
}
