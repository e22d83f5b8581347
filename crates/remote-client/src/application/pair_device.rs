//! PairDeviceUseCase: trades a pairing code for a device id.
//!
//! The host shows a short code on its screen.  The user types it on the
//! device (or scans the QR invite), and the device sends it to
//! `POST /pair?code=...`.  The host answers with the id the device must use
//! to open its event channel.
//!
//! This use case does not touch the session; the
//! [`SessionController`](super::session_controller::SessionController) decides
//! what a success or failure means for the state the UI sees.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Reason given when the host rejects a code without saying why.
pub const DEFAULT_PAIR_REJECTION: &str = "Pairing failed";

/// Error type for pairing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PairError {
    /// The code was empty; no request was sent.
    #[error("pairing code must not be empty")]
    EmptyCode,
    /// The host could not be reached, answered with a non-2xx status, or
    /// sent a body that is not a valid pairing response.
    #[error("pairing transport error: {0}")]
    Transport(String),
    /// The host understood the request and said no.
    #[error("{0}")]
    Rejected(String),
}

/// Performs the pairing exchange with a host.
///
/// Implemented over HTTP by
/// [`HostApi`](crate::infrastructure::host_api::HostApi); tests use the
/// generated `MockPairingService`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PairingService: Send + Sync {
    /// Sends `code` to `host` and returns the issued device id.
    async fn pair(&self, code: &str, host: &str) -> Result<String, PairError>;
}

/// The Pair Device use case.
pub struct PairDeviceUseCase {
    service: Arc<dyn PairingService>,
}

impl PairDeviceUseCase {
    pub fn new(service: Arc<dyn PairingService>) -> Self {
        Self { service }
    }

    /// Pairs with `host` using `code`.
    ///
    /// Any non-empty code is forwarded byte-for-byte, whitespace included;
    /// the host decides whether it is valid.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::EmptyCode`] without contacting the host when the
    /// code is empty, otherwise whatever the [`PairingService`] reports.
    pub async fn execute(&self, code: &str, host: &str) -> Result<String, PairError> {
        if code.is_empty() {
            debug!("refusing to pair with an empty code");
            return Err(PairError::EmptyCode);
        }

        // Only the length of the code is logged.
        debug!(host, code_len = code.len(), "sending pairing request");
        match self.service.pair(code, host).await {
            Ok(device_id) => {
                info!(host, device_id = %device_id, "paired with host");
                Ok(device_id)
            }
            Err(e) => {
                warn!(host, "pairing failed: {e}");
                Err(e)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_returns_device_id_from_service() {
        // Arrange
        let mut service = MockPairingService::new();
        service
            .expect_pair()
            .withf(|code: &str, host: &str| code == "123456" && host == "192.168.1.50")
            .times(1)
            .returning(|_, _| Ok("dev-9".to_string()));
        let uc = PairDeviceUseCase::new(Arc::new(service));

        // Act
        let result = uc.execute("123456", "192.168.1.50").await;

        // Assert
        assert_eq!(result, Ok("dev-9".to_string()));
    }

    #[tokio::test]
    async fn test_execute_rejects_empty_code_without_calling_service() {
        let mut service = MockPairingService::new();
        service.expect_pair().times(0);
        let uc = PairDeviceUseCase::new(Arc::new(service));

        assert_eq!(uc.execute("", "h").await, Err(PairError::EmptyCode));
    }

    #[tokio::test]
    async fn test_execute_forwards_padded_and_blank_codes_unchanged() {
        // Arrange: the host rejects both; only what it receives matters
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut service = MockPairingService::new();
        service
            .expect_pair()
            .times(2)
            .returning(move |code, _| {
                recorder.lock().unwrap().push(code.to_string());
                Err(PairError::Rejected("Invalid code".to_string()))
            });
        let uc = PairDeviceUseCase::new(Arc::new(service));

        // Act
        let blank = uc.execute("   ", "h").await;
        let padded = uc.execute(" 12 ", "h").await;

        // Assert
        assert_eq!(blank, Err(PairError::Rejected("Invalid code".to_string())));
        assert_eq!(padded, Err(PairError::Rejected("Invalid code".to_string())));
        assert_eq!(*seen.lock().unwrap(), vec!["   ".to_string(), " 12 ".to_string()]);
    }

    #[tokio::test]
    async fn test_execute_passes_rejection_through() {
        let mut service = MockPairingService::new();
        service
            .expect_pair()
            .returning(|_, _| Err(PairError::Rejected("Invalid code".to_string())));
        let uc = PairDeviceUseCase::new(Arc::new(service));

        let err = uc.execute("000000", "h").await.unwrap_err();

        assert_eq!(err, PairError::Rejected("Invalid code".to_string()));
        assert_eq!(err.to_string(), "Invalid code");
    }
}
