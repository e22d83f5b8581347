//! TransferFilesUseCase: file uploads and host clipboard access.
//!
//! These operations are plain request/response exchanges over HTTP and do
//! not depend on the event channel being open; they only need a paired
//! host address.  Uploads are not serialized, so several may be in flight
//! at once.
//!
//! The use case keeps a [`TransferStatus`] behind a `watch` channel so the UI
//! can show an "uploading..." indicator, the last file that made it, and the
//! last failure.

use std::sync::Arc;

use async_trait::async_trait;
use remote_core::{TransferStatus, UploadTask};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Reason given when the host rejects an upload without saying why.
pub const DEFAULT_UPLOAD_REJECTION: &str = "Upload failed";
/// Reason given when the host reports `success: false` for a clipboard read.
pub const CLIPBOARD_READ_REJECTION: &str = "Clipboard read failed";
/// Reason given when the host reports `success: false` for a clipboard write.
pub const CLIPBOARD_WRITE_REJECTION: &str = "Clipboard write failed";

/// Error type for uploads and clipboard operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransferError {
    /// Network failure, timeout, non-2xx status, or malformed body.
    #[error("transfer transport error: {0}")]
    Transport(String),
    /// The host answered with `success: false`.
    #[error("{0}")]
    Rejected(String),
}

/// HTTP operations against the host's file and clipboard endpoints.
#[async_trait]
pub trait TransferService: Send + Sync {
    /// Uploads `payload` as a single multipart part named `file`.
    async fn upload(&self, payload: Vec<u8>, filename: &str, host: &str)
        -> Result<(), TransferError>;

    /// Reads the host clipboard.
    async fn get_clipboard(&self, host: &str) -> Result<String, TransferError>;

    /// Replaces the host clipboard with `content`.
    async fn set_clipboard(&self, content: &str, host: &str) -> Result<bool, TransferError>;
}

/// The Transfer Files use case.
pub struct TransferFilesUseCase {
    service: Arc<dyn TransferService>,
    status: watch::Sender<TransferStatus>,
}

impl TransferFilesUseCase {
    pub fn new(service: Arc<dyn TransferService>) -> Self {
        let (status, _) = watch::channel(TransferStatus::default());
        Self { service, status }
    }

    /// Returns a receiver that observes every change to the transfer status.
    pub fn subscribe(&self) -> watch::Receiver<TransferStatus> {
        self.status.subscribe()
    }

    /// Returns a copy of the current transfer status.
    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    /// Uploads `payload` to `host` under `filename`.
    ///
    /// Progress is coarse: the status shows 0 while the request runs and 1
    /// once the host accepted it.
    ///
    /// # Errors
    ///
    /// Returns the [`TransferError`] reported by the service.  The same
    /// message is stored in [`TransferStatus::error`].
    pub async fn upload(
        &self,
        payload: Vec<u8>,
        filename: &str,
        host: &str,
    ) -> Result<(), TransferError> {
        let mut task = UploadTask::new(filename, payload.len());
        task.start();
        self.status.send_modify(|s| s.task_started(&task));
        debug!(task_id = %task.id, filename, size = task.size, "upload started");

        let result = self.service.upload(payload, filename, host).await;

        match &result {
            Ok(()) => {
                task.succeed();
                info!(task_id = %task.id, filename, "upload finished");
                self.status.send_modify(|s| s.task_finished(&task, None));
            }
            Err(e) => {
                task.fail();
                warn!(task_id = %task.id, filename, "upload failed: {e}");
                let message = e.to_string();
                self.status
                    .send_modify(|s| s.task_finished(&task, Some(message)));
            }
        }
        result
    }

    /// Reads the host clipboard.  The value is never cached.
    ///
    /// # Errors
    ///
    /// Returns the [`TransferError`] reported by the service.
    pub async fn get_clipboard(&self, host: &str) -> Result<String, TransferError> {
        match self.service.get_clipboard(host).await {
            Ok(content) => {
                debug!(len = content.len(), "read host clipboard");
                Ok(content)
            }
            Err(e) => {
                warn!("clipboard read failed: {e}");
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Writes `content` to the host clipboard.
    ///
    /// # Errors
    ///
    /// Returns the [`TransferError`] reported by the service.
    pub async fn set_clipboard(&self, content: &str, host: &str) -> Result<bool, TransferError> {
        match self.service.set_clipboard(content, host).await {
            Ok(accepted) => {
                debug!(len = content.len(), accepted, "wrote host clipboard");
                Ok(accepted)
            }
            Err(e) => {
                warn!("clipboard write failed: {e}");
                self.record_error(&e);
                Err(e)
            }
        }
    }

    fn record_error(&self, e: &TransferError) {
        let message = e.to_string();
        self.status.send_modify(|s| s.record_error(message));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    // ── Fake service ──────────────────────────────────────────────────────────

    /// In-memory host: stores the clipboard and records uploads.
    #[derive(Default)]
    struct FakeTransferService {
        clipboard: Mutex<String>,
        uploads: Mutex<Vec<(String, usize)>>,
        fail_with: Option<TransferError>,
        /// When set, uploads wait for a notification before completing.
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl TransferService for FakeTransferService {
        async fn upload(
            &self,
            payload: Vec<u8>,
            filename: &str,
            _host: &str,
        ) -> Result<(), TransferError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.uploads
                .lock()
                .unwrap()
                .push((filename.to_string(), payload.len()));
            Ok(())
        }

        async fn get_clipboard(&self, _host: &str) -> Result<String, TransferError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            Ok(self.clipboard.lock().unwrap().clone())
        }

        async fn set_clipboard(&self, content: &str, _host: &str) -> Result<bool, TransferError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            *self.clipboard.lock().unwrap() = content.to_string();
            Ok(true)
        }
    }

    fn failing(e: TransferError) -> FakeTransferService {
        FakeTransferService {
            fail_with: Some(e),
            ..Default::default()
        }
    }

    // ── Upload ────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_upload_success_records_last_uploaded_file() {
        // Arrange
        let service = Arc::new(FakeTransferService::default());
        let uc = TransferFilesUseCase::new(service.clone());

        // Act
        uc.upload(vec![1, 2, 3], "a.jpg", "h").await.unwrap();

        // Assert
        let status = uc.status();
        assert_eq!(status.last_uploaded_file.as_deref(), Some("a.jpg"));
        assert!(!status.is_uploading());
        assert_eq!(status.upload_progress, 1.0);
        assert!(status.error.is_none());
        assert_eq!(*service.uploads.lock().unwrap(), vec![("a.jpg".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_upload_transport_failure_sets_error_and_keeps_last_file() {
        // Arrange: one earlier success through a working service
        let ok = TransferFilesUseCase::new(Arc::new(FakeTransferService::default()));
        ok.upload(vec![0], "old.png", "h").await.unwrap();
        let uc = TransferFilesUseCase {
            service: Arc::new(failing(TransferError::Transport("connection refused".into()))),
            status: {
                let (tx, _) = watch::channel(ok.status());
                tx
            },
        };

        // Act
        let result = uc.upload(vec![1], "new.png", "h").await;

        // Assert
        assert!(matches!(result, Err(TransferError::Transport(_))));
        let status = uc.status();
        assert_eq!(status.last_uploaded_file.as_deref(), Some("old.png"));
        assert!(!status.error.as_deref().unwrap_or_default().is_empty());
        assert!(!status.is_uploading());
    }

    #[tokio::test]
    async fn test_upload_rejection_message_is_published() {
        let uc = TransferFilesUseCase::new(Arc::new(failing(TransferError::Rejected(
            "disk full".into(),
        ))));

        let _ = uc.upload(vec![1], "x.bin", "h").await;

        assert_eq!(uc.status().error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_upload_is_observable_while_in_flight() {
        // Arrange: uploads block until the gate opens
        let gate = Arc::new(Notify::new());
        let service = Arc::new(FakeTransferService {
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let uc = Arc::new(TransferFilesUseCase::new(service));
        let mut rx = uc.subscribe();

        // Act
        let task = {
            let uc = uc.clone();
            tokio::spawn(async move { uc.upload(vec![9; 16], "big.mov", "h").await })
        };
        rx.wait_for(|s| s.is_uploading()).await.unwrap();
        assert_eq!(rx.borrow().upload_progress, 0.0);
        gate.notify_one();
        task.await.unwrap().unwrap();

        // Assert
        assert!(!uc.status().is_uploading());
    }

    #[tokio::test]
    async fn test_concurrent_uploads_both_complete() {
        let service = Arc::new(FakeTransferService::default());
        let uc = TransferFilesUseCase::new(service.clone());

        let (a, b) = tokio::join!(
            uc.upload(vec![1], "a", "h"),
            uc.upload(vec![2, 2], "b", "h")
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(service.uploads.lock().unwrap().len(), 2);
        assert_eq!(uc.status().in_flight, 0);
    }

    // ── Clipboard ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_clipboard_round_trip() {
        let uc = TransferFilesUseCase::new(Arc::new(FakeTransferService::default()));

        assert_eq!(uc.set_clipboard("hello", "h").await, Ok(true));
        assert_eq!(uc.get_clipboard("h").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_clipboard_failure_is_recorded() {
        let uc = TransferFilesUseCase::new(Arc::new(failing(TransferError::Rejected(
            CLIPBOARD_READ_REJECTION.into(),
        ))));

        let result = uc.get_clipboard("h").await;

        assert!(matches!(result, Err(TransferError::Rejected(_))));
        assert_eq!(uc.status().error.as_deref(), Some(CLIPBOARD_READ_REJECTION));
    }
}
