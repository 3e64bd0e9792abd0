//! Upload session state and cancellation.
//!
//! A [`Session`] is everything known about one upload: how it was routed, the
//! original decoded batch, and (once padding has been applied) the crop
//! outcome. A new upload replaces the session wholesale; there is no ambient
//! "current batch" to patch up.
//!
//! [`SessionSlot`] owns the current session and hands out a [`CancelToken`]
//! per upload. Starting a new upload cancels the previous token, and results
//! are only installed while their token is still live, so work finished for
//! a stale upload is discarded instead of overwriting newer state.

use crate::config::Padding;
use crate::process::{BatchOutcome, LoadedUpload, ProcessEvent, process_batch};
use crate::types::{Batch, UploadContext};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use tracing::debug;

/// Shared cancellation flag for one upload's in-flight work.
#[derive(Debug, Clone, Default)]
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

    fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One upload and what has been computed from it.
#[derive(Debug)]
pub struct Session {
    pub upload: UploadContext,
    /// Decoded originals, sorted by name.
    pub original: Batch,
    /// Crop outcome for the most recent padding, if any.
    pub cropped: Option<BatchOutcome>,
    /// Padding that produced `cropped`.
    pub padding: Option<Padding>,
}

impl Session {
    pub fn new(upload: UploadContext, original: Batch) -> Self {
        Self {
            upload,
            original,
            cropped: None,
            padding: None,
        }
    }

    /// Crop every original with `padding`, replacing any earlier crop outcome.
    pub fn crop(&mut self, padding: Padding, events: Option<Sender<ProcessEvent>>) -> &BatchOutcome {
        let outcome = process_batch(&self.original, padding, events);
        self.padding = Some(padding);
        self.cropped.insert(outcome)
    }
}

impl From<LoadedUpload> for Session {
    fn from(loaded: LoadedUpload) -> Self {
        Self::new(loaded.upload, loaded.images)
    }
}

/// Holder of the current session.
#[derive(Debug, Default)]
pub struct SessionSlot {
    current: Option<Session>,
    token: CancelToken,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new upload: cancel whatever the previous upload still has in
    /// flight and return the token for the new one.
    ///
    /// The current session stays visible until the new one is published.
    pub fn begin_upload(&mut self) -> CancelToken {
        self.token.cancel();
        self.token = CancelToken::new();
        self.token.clone()
    }

    /// Install a freshly loaded session if `token` is still the live one.
    ///
    /// Returns `false` (and drops `session`) for stale uploads.
    pub fn publish(&mut self, token: &CancelToken, session: Session) -> bool {
        if !self.is_live(token) {
            debug!(upload = %session.upload.name, "discarding stale upload");
            return false;
        }
        self.current = Some(session);
        true
    }

    /// Install a crop outcome computed for the current session.
    ///
    /// Returns `false` when the upload has been superseded since `token` was
    /// issued, leaving the current state as it was.
    pub fn publish_crop(&mut self, token: &CancelToken, padding: Padding, outcome: BatchOutcome) -> bool {
        if !self.is_live(token) {
            debug!("discarding stale crop outcome");
            return false;
        }
        match self.current.as_mut() {
            Some(session) => {
                session.cropped = Some(outcome);
                session.padding = Some(padding);
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.current.as_mut()
    }

    fn is_live(&self, token: &CancelToken) -> bool {
        token.same_as(&self.token) && !token.is_cancelled()
    }
}
