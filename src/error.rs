//! Errors returned by the identity, node and message checks.
//!
//! Every variant is a local validation failure. Nothing here is fatal: the caller decides whether a rejected message is dropped, logged, or held against the peer that sent it.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessengerError {
    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid secret key")]
    InvalidSecretKey,

    #[error("empty origin public key")]
    EmptyOrigin,

    #[error("message content too short")]
    ContentTooShort,

    #[error("invalid signature")]
    SignatureInvalid,

    #[error("invalid content reference")]
    InvalidReference,

    #[error("failed to decode object: {0}")]
    DecodeError(String),

    #[error("failed to encode object: {0}")]
    EncodeError(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MessengerError>;
