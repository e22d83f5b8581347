//! Upload bookkeeping.
//!
//! An [`UploadTask`] lives for exactly one HTTP exchange.  [`TransferStatus`]
//! is the aggregate the UI observes: how many uploads are running, the
//! coarse progress of the latest one, the last file that made it, and the
//! last failure.
//!
//! Uploads are not single-flight, so `TransferStatus` counts in-flight tasks
//! instead of holding a boolean.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    Pending,
    InFlight,
    Succeeded,
    Failed,
}

/// A single upload request.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    /// Correlates log lines of concurrent uploads.
    pub id: Uuid,
    pub filename: String,
    /// Payload size in bytes.
    pub size: usize,
    /// Fraction in `[0, 1]`.
    pub progress: f64,
    pub state: UploadState,
}

impl UploadTask {
    /// Creates a `Pending` task for `size` bytes named `filename`.
    pub fn new(filename: impl Into<String>, size: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            size,
            progress: 0.0,
            state: UploadState::Pending,
        }
    }

    /// Marks the request as sent.
    pub fn start(&mut self) {
        self.state = UploadState::InFlight;
        self.progress = 0.0;
    }

    /// Marks the request as accepted by the host.
    pub fn succeed(&mut self) {
        self.state = UploadState::Succeeded;
        self.progress = 1.0;
    }

    /// Marks the request as failed.  Progress is left where it was.
    pub fn fail(&mut self) {
        self.state = UploadState::Failed;
    }

    /// `true` once the task reached `Succeeded` or `Failed`.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, UploadState::Succeeded | UploadState::Failed)
    }
}

/// Observer-facing summary of all uploads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransferStatus {
    /// Number of uploads currently in flight.
    pub in_flight: usize,
    /// Progress of the most recently started or finished upload.
    pub upload_progress: f64,
    /// Filename of the last upload the host accepted.
    pub last_uploaded_file: Option<String>,
    /// Message of the last failed transfer operation.
    pub error: Option<String>,
}

impl TransferStatus {
    pub fn is_uploading(&self) -> bool {
        self.in_flight > 0
    }

    /// Records that `task` has started.
    pub fn task_started(&mut self, task: &UploadTask) {
        self.in_flight += 1;
        self.upload_progress = task.progress;
        self.error = None;
    }

    /// Records the outcome of a finished `task`.
    ///
    /// `error` is only consulted for failed tasks.
    pub fn task_finished(&mut self, task: &UploadTask, error: Option<String>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.upload_progress = task.progress;
        match task.state {
            UploadState::Succeeded => {
                self.last_uploaded_file = Some(task.filename.clone());
            }
            UploadState::Failed => {
                self.error = Some(error.unwrap_or_else(|| "Upload failed".to_string()));
            }
            UploadState::Pending | UploadState::InFlight => {}
        }
    }

    /// Records a failed clipboard operation.
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
