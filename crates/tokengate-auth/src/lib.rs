//! # tokengate-auth
//!
//! Stateless bearer token authentication with server-side revocation.
//!
//! This crate provides:
//! - Signed access and refresh tokens carrying caller-supplied claims
//! - Ordered validation: structure, signature, expiry, type, revocation
//! - Per-token revocation and per-subject "log out everywhere" cutoffs
//! - Guards that authenticate an `Authorization: Bearer` header
//! - A login / refresh / logout service and axum extractors on top
//!
//! ## Overview
//!
//! Tokens are `header.claims.signature`, base64url without padding. The
//! claim set always carries `sub`, `type`, `exp`, `iat`, and `jti`; any
//! other claim is passed through verbatim. Validation is local apart from
//! one revocation lookup, which fails closed unless configured otherwise.
//!
//! ## Modules
//!
//! - [`config`] - Signing keys, lifetimes, and revocation settings
//! - [`token`] - Claims, wire format, signing, issuance, and validation
//! - [`storage`] - Revocation store trait and in-memory implementation
//! - [`guard`] - Bearer header guards for access and refresh tokens
//! - [`service`] - Login, refresh, logout, and revoke operations
//! - [`middleware`] - Axum extractors and error responses

pub mod config;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod service;
pub mod storage;
pub mod token;

pub use config::{AuthConfig, ConfigError, RefreshRotation};
pub use error::{AuthError, ErrorCategory};
pub use guard::{AuthGuard, CredentialGuard, Identity, RefreshGrant, RefreshGuard, extract_bearer};
pub use middleware::{AuthState, BearerAuth, OptionalBearerAuth, RefreshBearer};
pub use service::{TokenResponse, TokenService};
pub use storage::{InMemoryRevocationStore, RevocationStore};
pub use token::{
    ClaimSet, ClaimValue, ExtraClaims, HmacSigner, SigningAlgorithm, SigningKeyPair, Token,
    TokenIssuer, TokenSigner, TokenType, TokenValidator,
};

/// Type alias for authentication results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tokengate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{AuthConfig, ConfigError, RefreshRotation};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::guard::{AuthGuard, CredentialGuard, Identity, RefreshGrant, RefreshGuard};
    pub use crate::middleware::{AuthState, BearerAuth, OptionalBearerAuth, RefreshBearer};
    pub use crate::service::{TokenResponse, TokenService};
    pub use crate::storage::{InMemoryRevocationStore, RevocationStore};
    pub use crate::token::{
        ClaimSet, ClaimValue, ExtraClaims, Token, TokenIssuer, TokenType, TokenValidator,
    };
}
