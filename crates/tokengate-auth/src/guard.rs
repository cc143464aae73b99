//! Bearer credential guards.
//!
//! A guard turns the raw `Authorization` header value into an authenticated
//! identity, or a rejection. [`AuthGuard`] accepts access tokens only,
//! [`RefreshGuard`] accepts refresh tokens only. Guards read revocation
//! state but never change it.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::token::{ClaimSet, TokenType, TokenValidator};

/// Authentication scheme accepted by the guards.
pub const BEARER_SCHEME: &str = "Bearer";

/// Extracts the token from a `Bearer <token>` header value.
///
/// The scheme is matched case-insensitively and must be followed by exactly
/// one space and a single token.
///
/// # Errors
///
/// Returns `MissingCredential` if the header is absent, empty, uses another
/// scheme, or does not carry exactly one token.
pub fn extract_bearer(header: Option<&str>) -> AuthResult<&str> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AuthError::missing_credential("Missing Authorization header"))?;

    let (scheme, token) = header.split_once(' ').ok_or_else(|| {
        AuthError::missing_credential("Authorization header must use the Bearer scheme")
    })?;

    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) {
        return Err(AuthError::missing_credential(
            "Authorization header must use the Bearer scheme",
        ));
    }

    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::missing_credential(
            "Bearer credential must be a single token",
        ));
    }

    Ok(token)
}

/// Authenticates a presented `Authorization` header.
#[async_trait]
pub trait CredentialGuard: Send + Sync {
    /// What a successful authentication yields.
    type Output: Send;

    /// Authenticates `header` as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` for an unusable header, or the validation
    /// error for the presented token.
    async fn authenticate_at(
        &self,
        header: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<Self::Output>;

    /// Authenticates `header` against the current time.
    ///
    /// # Errors
    ///
    /// See [`CredentialGuard::authenticate_at`].
    async fn authenticate(&self, header: Option<&str>) -> AuthResult<Self::Output> {
        self.authenticate_at(header, OffsetDateTime::now_utc()).await
    }
}

/// Identity established from a valid access token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Authenticated subject.
    pub subject: String,

    /// Every claim the access token carried, reserved and extra.
    pub claims: ClaimSet,
}

impl Identity {
    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Looks up a caller-supplied claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&crate::token::ClaimValue> {
        self.claims.get(name)
    }
}

/// Result of presenting a valid refresh token.
///
/// Carries what the caller needs to apply its rotation policy. Only
/// [`RefreshGuard`] creates one, so holding a grant means the refresh token
/// passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshGrant {
    subject: String,
    jti: String,
    issued_at: OffsetDateTime,
    expires_at: OffsetDateTime,
}

impl RefreshGrant {
    /// Subject the refresh token was issued to.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Identifier of the presented refresh token.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.jti
    }

    /// When the presented refresh token was issued.
    #[must_use]
    pub fn issued_at(&self) -> OffsetDateTime {
        self.issued_at
    }

    /// When the presented refresh token expires.
    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }
}

/// Guard for protected operations; accepts access tokens only.
#[derive(Clone)]
pub struct AuthGuard {
    validator: TokenValidator,
}

impl AuthGuard {
    /// Creates a new guard.
    #[must_use]
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl CredentialGuard for AuthGuard {
    type Output = Identity;

    async fn authenticate_at(
        &self,
        header: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<Identity> {
        let token = extract_bearer(header)?;
        let claims = self
            .validator
            .validate_at(token, TokenType::Access, now)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "Access token rejected"))?;

        Ok(Identity {
            subject: claims.sub.clone(),
            claims,
        })
    }
}

/// Guard for the refresh operation; accepts refresh tokens only.
#[derive(Clone)]
pub struct RefreshGuard {
    validator: TokenValidator,
}

impl RefreshGuard {
    /// Creates a new guard.
    #[must_use]
    pub fn new(validator: TokenValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl CredentialGuard for RefreshGuard {
    type Output = RefreshGrant;

    async fn authenticate_at(
        &self,
        header: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<RefreshGrant> {
        let token = extract_bearer(header)?;
        let claims = self
            .validator
            .validate_at(token, TokenType::Refresh, now)
            .await
            .inspect_err(|e| tracing::debug!(error = %e, "Refresh token rejected"))?;

        Ok(RefreshGrant {
            issued_at: claims.issued_at()?,
            expires_at: claims.expires_at()?,
            subject: claims.sub,
            jti: claims.jti,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::AuthConfig;
    use crate::storage::{InMemoryRevocationStore, RevocationStore};
    use crate::token::{ExtraClaims, TokenIssuer};

    const SECRET: &str = "guard-test-secret-with-at-least-32-bytes!";

    fn setup() -> (TokenIssuer, AuthGuard, RefreshGuard, Arc<InMemoryRevocationStore>) {
        let config = AuthConfig::hmac(SECRET);
        let signer = config.build_signer().unwrap();
        let store = Arc::new(InMemoryRevocationStore::new());
        let validator = TokenValidator::new(signer.clone(), store.clone());
        (
            TokenIssuer::new(Arc::new(config), signer),
            AuthGuard::new(validator.clone()),
            RefreshGuard::new(validator),
            store,
        )
    }

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc.def.ghi")).unwrap(), "abc.def.ghi");
        assert_eq!(extract_bearer(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(extract_bearer(Some("BEARER abc")).unwrap(), "abc");
    }

    #[test]
    fn test_extract_bearer_rejections() {
        for header in [
            None,
            Some(""),
            Some("   "),
            Some("Bearer"),
            Some("Bearer "),
            Some("Basic dXNlcjpwYXNz"),
            Some("Bearer a b"),
            Some("Bearer  abc"),
            Some("Token abc"),
        ] {
            let err = extract_bearer(header).unwrap_err();
            assert!(
                matches!(err, AuthError::MissingCredential { .. }),
                "{header:?}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_auth_guard_returns_identity() {
        let (issuer, guard, _, _) = setup();
        let mut extra = ExtraClaims::new();
        extra.insert("role".to_string(), "admin".into());
        let token = issuer.issue_access_at("user1", extra, t0()).unwrap();

        let identity = guard
            .authenticate_at(Some(format!("Bearer {token}").as_str()), t0())
            .await
            .unwrap();

        assert_eq!(identity.subject(), "user1");
        assert_eq!(identity.claim("role").and_then(|v| v.as_str()), Some("admin"));
        assert_eq!(&identity.claims, token.claims());
    }

    #[tokio::test]
    async fn test_auth_guard_rejects_refresh_token() {
        let (issuer, guard, _, _) = setup();
        let token = issuer.issue_refresh_at("user1", t0()).unwrap();

        let err = guard
            .authenticate_at(Some(format!("Bearer {token}").as_str()), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { .. }));
    }

    #[tokio::test]
    async fn test_refresh_guard_returns_grant() {
        let (issuer, _, guard, _) = setup();
        let token = issuer.issue_refresh_at("user1", t0()).unwrap();

        let grant = guard
            .authenticate_at(Some(format!("Bearer {token}").as_str()), t0())
            .await
            .unwrap();

        assert_eq!(grant.subject(), "user1");
        assert_eq!(grant.jti(), token.jti());
        assert_eq!(grant.issued_at(), t0());
        assert_eq!(grant.expires_at(), token.claims().expires_at().unwrap());
    }

    #[tokio::test]
    async fn test_refresh_guard_rejects_access_token() {
        let (issuer, _, guard, _) = setup();
        let token = issuer
            .issue_access_at("user1", ExtraClaims::new(), t0())
            .unwrap();

        let err = guard
            .authenticate_at(Some(format!("Bearer {token}").as_str()), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { .. }));
    }

    #[tokio::test]
    async fn test_guards_do_not_mutate_store() {
        let (issuer, guard, refresh_guard, store) = setup();
        let access = issuer
            .issue_access_at("user1", ExtraClaims::new(), t0())
            .unwrap();
        let refresh = issuer.issue_refresh_at("user1", t0()).unwrap();

        guard
            .authenticate_at(Some(format!("Bearer {access}").as_str()), t0())
            .await
            .unwrap();
        refresh_guard
            .authenticate_at(Some(format!("Bearer {refresh}").as_str()), t0())
            .await
            .unwrap();
        refresh_guard
            .authenticate_at(Some(format!("Bearer {refresh}").as_str()), t0())
            .await
            .unwrap();

        assert_eq!(store.revoked_token_count(), 0);
        assert_eq!(store.subject_cutoff_count(), 0);
        assert!(!store.is_revoked(refresh.jti(), "user1", t0()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_header_is_missing_credential() {
        let (_, guard, _, _) = setup();
        let err = guard.authenticate(None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredential { .. }));
    }
}
