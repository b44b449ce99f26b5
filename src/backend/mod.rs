//! Backend adapters for the external synthesis and fetch services.
//!
//! Each adapter wraps exactly one capability behind the [`Backend`] trait:
//! speech synthesis (Coqui, Bark), voice cloning (XTTS v2) or page fetching
//! through a reader proxy.

pub mod audio;
mod client;
mod clone;
mod fetch;
mod speech;
mod types;

pub use client::{HttpClient, status_error};
pub use clone::{CloneBackend, CloneSession};
pub use fetch::{DEFAULT_READER_URL, FetchBackend, FetchOptions, FetchSession, USER_AGENTS};
pub use speech::{SpeechBackend, SpeechOptions, SpeechSession};
pub use types::{BackendError, HealthResponse, SynthesizeRequest};

use crate::pipeline::WorkItem;

/// Trait for one external generation/fetch capability.
///
/// `prepare` does the expensive one-time setup and returns a handle that the
/// caller owns and passes back into every `process` call. The trait is
/// mocked in tests.
#[cfg_attr(test, mockall::automock(type Handle = ();))]
pub trait Backend: Send + Sync {
    /// State produced by `prepare` and shared by every item of a run.
    type Handle;

    /// Initialize the backend.
    ///
    /// Fails if the external service or one of its inputs is missing; the
    /// caller treats every error from here as fatal.
    fn prepare(&self) -> Result<Self::Handle, BackendError>;

    /// Produce the raw output for one item.
    ///
    /// # Arguments
    /// * `handle` - State returned by `prepare`
    /// * `item` - The work item; no other item's state is visible
    ///
    /// # Returns
    /// Raw bytes to be written to the item's output file
    fn process(&self, handle: &Self::Handle, item: &WorkItem) -> Result<Vec<u8>, BackendError>;
}
