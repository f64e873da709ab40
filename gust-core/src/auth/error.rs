//! Login error definitions.

use std::{io, time::Duration};

/// Why a login attempt ended without a credential.
///
/// Every variant is terminal for the attempt; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("could not listen for the login callback on port {port}: {source}")]
    ListenFailed {
        port: u16,
        #[source]
        source: io::Error,
    },

    #[error("failed to get auth URL: {0}")]
    AuthUrlRequestFailed(String),

    #[error("no auth code received")]
    MissingCode,

    #[error("failed to exchange code for an API key: {0}")]
    CodeExchangeFailed(String),

    #[error("authentication timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),
}
