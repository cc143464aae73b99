//! Bearer token extractors.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::error::AuthError;
use crate::guard::{Identity, RefreshGrant};
use crate::service::TokenService;

// =============================================================================
// Auth State
// =============================================================================

/// State required by the bearer extractors.
///
/// Include it in your application state and expose it via `FromRef`:
///
/// ```ignore
/// #[derive(Clone)]
/// struct AppState {
///     auth: AuthState,
/// }
///
/// impl FromRef<AppState> for AuthState {
///     fn from_ref(state: &AppState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone)]
pub struct AuthState {
    /// Token service used to authenticate requests.
    pub service: Arc<TokenService>,
}

impl AuthState {
    /// Creates a new auth state.
    pub fn new(service: Arc<TokenService>) -> Self {
        Self { service }
    }
}

fn authorization_header(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

// =============================================================================
// Extractors
// =============================================================================

/// Extracts the identity behind a valid access token.
///
/// Rejects with [`AuthError`], which renders as a JSON error response.
pub struct BearerAuth(pub Identity);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let identity = auth_state
            .service
            .authenticate(authorization_header(parts))
            .await?;

        tracing::debug!(
            subject = %identity.subject,
            endpoint = %parts.uri.path(),
            method = %parts.method,
            "Request authenticated"
        );

        Ok(BearerAuth(identity))
    }
}

/// Like [`BearerAuth`], but yields `None` when no `Authorization` header
/// is present. A header that is present must still be valid.
pub struct OptionalBearerAuth(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalBearerAuth
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalBearerAuth(None));
        }

        let BearerAuth(identity) = BearerAuth::from_request_parts(parts, state).await?;
        Ok(OptionalBearerAuth(Some(identity)))
    }
}

/// Extracts a valid refresh token, for the refresh endpoint.
///
/// Pass the grant to [`TokenService::exchange`] to obtain new tokens.
pub struct RefreshBearer(pub RefreshGrant);

impl<S> FromRequestParts<S> for RefreshBearer
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);

        let grant = auth_state
            .service
            .authenticate_refresh(authorization_header(parts))
            .await?;

        Ok(RefreshBearer(grant))
    }
}
