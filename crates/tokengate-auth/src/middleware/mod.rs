//! Axum integration.
//!
//! This module provides:
//!
//! - Extractors that authenticate the `Authorization: Bearer` header
//! - JSON error responses for [`AuthError`](crate::AuthError)
//!
//! Routing stays with the application.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, routing::get};
//! use tokengate_auth::middleware::{AuthState, BearerAuth};
//!
//! async fn protected_handler(BearerAuth(identity): BearerAuth) -> String {
//!     format!("Hello, {}!", identity.subject())
//! }
//!
//! let auth_state = AuthState::new(Arc::new(token_service));
//!
//! let app = Router::new()
//!     .route("/protected", get(protected_handler))
//!     .with_state(auth_state);
//! ```

pub mod auth;
pub mod error;

pub use auth::{AuthState, BearerAuth, OptionalBearerAuth, RefreshBearer};
pub use error::ErrorBody;
