//! Pairing invites.
//!
//! The host shows a QR code that encodes a URI such as
//! `remotebridge://pair?code=123456&host=192.168.1.50`.  Only the `code` and
//! `host` query parameters matter; the scheme and path are ignored so the
//! host can change its branding without breaking older devices.

use thiserror::Error;
use url::Url;

/// Why a scanned string is not a usable invite.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InviteError {
    /// The text is not an absolute URI.
    #[error("not a valid URI: {0}")]
    InvalidUri(String),
    /// A required query parameter is missing or empty.
    #[error("invite is missing the \"{0}\" parameter")]
    MissingParameter(&'static str),
}

/// A pairing code bound to the host that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingInvite {
    pub code: String,
    pub host: String,
}

impl PairingInvite {
    /// Parses an invite URI.
    ///
    /// # Errors
    ///
    /// Returns [`InviteError::InvalidUri`] for unparseable text and
    /// [`InviteError::MissingParameter`] when `code` or `host` is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use remote_core::PairingInvite;
    ///
    /// let invite = PairingInvite::parse("remotebridge://pair?host=10.0.0.4&code=424242").unwrap();
    /// assert_eq!(invite.code, "424242");
    /// assert_eq!(invite.host, "10.0.0.4");
    /// ```
    pub fn parse(text: &str) -> Result<Self, InviteError> {
        let url = Url::parse(text.trim()).map_err(|e| InviteError::InvalidUri(e.to_string()))?;

        let mut code = None;
        let mut host = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" if !value.is_empty() => code = Some(value.into_owned()),
                "host" if !value.is_empty() => host = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            code: code.ok_or(InviteError::MissingParameter("code"))?,
            host: host.ok_or(InviteError::MissingParameter("host"))?,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
