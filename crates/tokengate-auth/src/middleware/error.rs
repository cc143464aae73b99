//! Error responses for the axum extractors.
//!
//! Every [`AuthError`] renders as a JSON `{error, error_description}` body.
//! 401 responses also carry a `WWW-Authenticate: Bearer` challenge.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "tokengate";

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// OAuth 2.0 style error code.
    pub error: String,
    /// Message safe to show to the client.
    pub error_description: String,
}

impl From<&AuthError> for ErrorBody {
    fn from(error: &AuthError) -> Self {
        Self {
            error: error.oauth_error_code().to_string(),
            error_description: error.public_message(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, category = %self.category(), "Auth request failed");
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Auth request rejected");
        }

        let body = ErrorBody::from(&self);
        let mut response = (status, Json(&body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            let www_auth = build_www_authenticate_header(&body.error, &body.error_description);
            if let Ok(value) = HeaderValue::from_str(&www_auth) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

/// Builds the WWW-Authenticate header value for 401 responses.
///
/// Format: `Bearer realm="tokengate", error="invalid_token", error_description="..."`
fn build_www_authenticate_header(error: &str, description: &str) -> String {
    let escaped_desc = description.replace('\"', "\\\"");
    format!(
        "Bearer realm=\"{}\", error=\"{}\", error_description=\"{}\"",
        REALM, error, escaped_desc
    )
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::token::TokenType;

    async fn body(response: Response) -> ErrorBody {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_response() {
        let response = AuthError::TokenExpired.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let www_auth = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(www_auth.starts_with("Bearer"));
        assert!(www_auth.contains("realm=\"tokengate\""));
        assert!(www_auth.contains("error=\"invalid_token\""));

        let body = body(response).await;
        assert_eq!(body.error, "invalid_token");
        assert_eq!(body.error_description, "Token has expired");
    }

    #[tokio::test]
    async fn test_invalid_signature_is_generic() {
        let body = body(AuthError::InvalidSignature.into_response()).await;
        assert_eq!(body.error_description, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_wrong_type_response() {
        let response = AuthError::WrongTokenType {
            expected: TokenType::Refresh,
            actual: TokenType::Access,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body(response).await.error_description,
            "A refresh token is required"
        );
    }

    #[tokio::test]
    async fn test_malformed_is_bad_request_without_challenge() {
        let response = AuthError::malformed("Expected 3 segments, got 1").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(body(response).await.error, "invalid_request");
    }

    #[tokio::test]
    async fn test_revocation_unavailable_response() {
        let response = AuthError::revocation_unavailable("redis timeout").into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body(response).await;
        assert_eq!(body.error, "temporarily_unavailable");
        assert!(!body.error_description.contains("redis"));
    }

    #[tokio::test]
    async fn test_server_error_hides_details() {
        let response = AuthError::storage("connection refused at 10.0.0.3").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(response).await.error_description, "Internal error");
    }

    #[test]
    fn test_www_authenticate_escapes_quotes() {
        let value = build_www_authenticate_header("invalid_token", "say \"hi\"");
        assert!(value.contains("error_description=\"say \\\"hi\\\"\""));
    }
}
