//! Event callbacks for session activity.
//!
//! Inject an [`Arc<dyn SessionObserver>`] via [`crate::session::Session::with_observer`]
//! to drive spinners, status lines or logs as uploads are parsed and searches
//! run. Events are emitted only for the operation that is current; a result
//! discarded as stale produces `on_*_superseded` instead of complete/error.
//!
//! # Example
//!
//! ```rust
//! use docusearch::SessionObserver;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingObserver {
//!     answers: AtomicUsize,
//! }
//!
//! impl SessionObserver for CountingObserver {
//!     fn on_search_complete(&self, answer_len: usize) {
//!         self.answers.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("answer: {answer_len} chars");
//!     }
//! }
//! ```

use crate::error::ErrorState;
use std::sync::Arc;

/// Receives session events. All methods default to no-ops.
///
/// Implementations must be `Send + Sync`: events for an upload and a search
/// can arrive from different tasks.
pub trait SessionObserver: Send + Sync {
    /// A file was selected and parsing started.
    fn on_ingest_start(&self, file_name: &str) {
        let _ = file_name;
    }

    /// The current upload was parsed and committed.
    ///
    /// # Arguments
    /// * `char_count`: characters in the normalised text (0 for an empty document)
    fn on_ingest_complete(&self, file_name: &str, char_count: usize) {
        let _ = (file_name, char_count);
    }

    /// The current upload failed to parse.
    fn on_ingest_error(&self, file_name: &str, error: &ErrorState) {
        let _ = (file_name, error);
    }

    /// A parse finished after a newer upload or a removal; its result was dropped.
    fn on_ingest_superseded(&self, file_name: &str) {
        let _ = file_name;
    }

    /// A search passed validation and the request is being sent.
    fn on_search_start(&self, question: &str) {
        let _ = question;
    }

    fn on_search_complete(&self, answer_len: usize) {
        let _ = answer_len;
    }

    /// The search failed, locally or remotely.
    fn on_search_error(&self, error: &ErrorState) {
        let _ = error;
    }

    /// A search finished after being superseded; its result was dropped.
    fn on_search_superseded(&self) {}
}

/// Observer that ignores every event. Used when none is configured.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Shared observer handle as stored by the session.
pub type Observer = Arc<dyn SessionObserver>;
