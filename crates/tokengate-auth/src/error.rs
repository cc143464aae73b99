//! Authentication error types.
//!
//! This module defines every error that token issuance, validation, and
//! revocation can produce. Malformed input is kept distinct from ordinary
//! rejections (expired, revoked, wrong type) so the transport layer can map
//! them to different responses.

use std::fmt;

use crate::token::TokenType;

/// Errors that can occur while issuing, validating, or revoking tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The token is structurally invalid (segments, encoding, or claim shape).
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// Description of the structural failure.
        message: String,
    },

    /// The token signature does not match its contents or the configured key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The token's `exp` claim is not in the future.
    #[error("Token expired")]
    TokenExpired,

    /// The token has a different `type` claim than the caller required.
    #[error("Wrong token type: expected {expected}, got {actual}")]
    WrongTokenType {
        /// The type the validator was asked for.
        expected: TokenType,
        /// The type carried by the token.
        actual: TokenType,
    },

    /// The token, or every token of its subject, has been revoked.
    #[error("Token revoked")]
    TokenRevoked,

    /// A caller-supplied claim tried to use a reserved claim name.
    #[error("Reserved claim conflict: '{claim}' cannot be set by the caller")]
    ReservedClaimConflict {
        /// The reserved claim name.
        claim: String,
    },

    /// The revocation store could not be consulted.
    #[error("Revocation check unavailable: {message}")]
    RevocationCheckUnavailable {
        /// Description of the store failure.
        message: String,
    },

    /// No usable bearer credential was presented.
    #[error("Missing credential: {message}")]
    MissingCredential {
        /// Description of what was missing or malformed.
        message: String,
    },

    /// The request to issue or revoke is invalid.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// Producing a signature failed.
    #[error("Signing error: {message}")]
    Signing {
        /// Description of the signing failure.
        message: String,
    },

    /// An error occurred while storing or retrieving revocation data.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// The auth configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedToken {
            message: message.into(),
        }
    }

    /// Creates a new `ReservedClaimConflict` error.
    #[must_use]
    pub fn reserved_claim(claim: impl Into<String>) -> Self {
        Self::ReservedClaimConflict {
            claim: claim.into(),
        }
    }

    /// Creates a new `RevocationCheckUnavailable` error.
    #[must_use]
    pub fn revocation_unavailable(message: impl Into<String>) -> Self {
        Self::RevocationCheckUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `MissingCredential` error.
    #[must_use]
    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::MissingCredential {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Signing` error.
    #[must_use]
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::InvalidSignature
                | Self::TokenExpired
                | Self::WrongTokenType { .. }
                | Self::TokenRevoked
                | Self::MissingCredential { .. }
                | Self::InvalidRequest { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::ReservedClaimConflict { .. }
                | Self::RevocationCheckUnavailable { .. }
                | Self::Signing { .. }
                | Self::Storage { .. }
                | Self::Configuration { .. }
        )
    }

    /// Returns `true` if this error rejects a presented token.
    #[must_use]
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedToken { .. }
                | Self::InvalidSignature
                | Self::TokenExpired
                | Self::WrongTokenType { .. }
                | Self::TokenRevoked
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedToken { .. } => ErrorCategory::Validation,
            Self::InvalidSignature => ErrorCategory::Token,
            Self::TokenExpired => ErrorCategory::Token,
            Self::WrongTokenType { .. } => ErrorCategory::Token,
            Self::TokenRevoked => ErrorCategory::Token,
            Self::ReservedClaimConflict { .. } => ErrorCategory::Issuance,
            Self::RevocationCheckUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::MissingCredential { .. } => ErrorCategory::Authentication,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::Signing { .. } => ErrorCategory::Issuance,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the HTTP status code the transport layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedToken { .. } | Self::InvalidRequest { .. } => 400,
            Self::InvalidSignature
            | Self::TokenExpired
            | Self::WrongTokenType { .. }
            | Self::TokenRevoked
            | Self::MissingCredential { .. } => 401,
            Self::RevocationCheckUnavailable { .. } => 503,
            Self::ReservedClaimConflict { .. }
            | Self::Signing { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. } => 500,
        }
    }

    /// Returns the OAuth 2.0 style error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::MalformedToken { .. } => "invalid_request",
            Self::InvalidSignature => "invalid_token",
            Self::TokenExpired => "invalid_token",
            Self::WrongTokenType { .. } => "invalid_token",
            Self::TokenRevoked => "invalid_token",
            Self::MissingCredential { .. } => "unauthorized",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::RevocationCheckUnavailable { .. } => "temporarily_unavailable",
            Self::ReservedClaimConflict { .. }
            | Self::Signing { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. } => "server_error",
        }
    }

    /// Returns a message that is safe to show to the presenting client.
    ///
    /// Signature failures never say more than "Invalid credentials", and
    /// server-side failures never expose internal details.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::InvalidSignature => "Invalid credentials".to_string(),
            Self::TokenExpired => "Token has expired".to_string(),
            Self::TokenRevoked => "Token has been revoked".to_string(),
            Self::WrongTokenType { expected, .. } => format!("A {expected} token is required"),
            Self::MalformedToken { .. } => "Malformed token".to_string(),
            Self::MissingCredential { message } | Self::InvalidRequest { message } => {
                message.clone()
            }
            Self::RevocationCheckUnavailable { .. } => {
                "Token status cannot be verified right now".to_string()
            }
            Self::ReservedClaimConflict { .. }
            | Self::Signing { .. }
            | Self::Storage { .. }
            | Self::Configuration { .. } => "Internal error".to_string(),
        }
    }
}

/// Categories of authentication errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No usable credential was presented.
    Authentication,
    /// A presented token was rejected.
    Token,
    /// Structurally invalid input.
    Validation,
    /// Token issuance failed (programmer or key error).
    Issuance,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Issuance => write!(f, "issuance"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
