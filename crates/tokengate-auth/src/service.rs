//! Login, refresh, and logout flow.
//!
//! [`TokenService`] wires the issuer, validator, guards, and revocation
//! store into the operations an application exposes on its auth endpoints.
//! It does not verify passwords: callers authenticate the user their own
//! way and then ask for a token pair.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::config::{AuthConfig, RefreshRotation};
use crate::error::AuthError;
use crate::guard::{AuthGuard, CredentialGuard, Identity, RefreshGrant, RefreshGuard};
use crate::storage::RevocationStore;
use crate::token::{ExtraClaims, TokenIssuer, TokenSigner, TokenType, TokenValidator};

/// Token type advertised in [`TokenResponse`].
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Token pair handed back after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Newly issued access token.
    pub access_token: String,

    /// Refresh token. Empty after a refresh when rotation is disabled.
    pub refresh_token: String,

    /// Always `"bearer"`.
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Token issuance and session operations.
#[derive(Clone)]
pub struct TokenService {
    config: Arc<AuthConfig>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    auth_guard: AuthGuard,
    refresh_guard: RefreshGuard,
    store: Arc<dyn RevocationStore>,
}

impl TokenService {
    /// Creates a service from a configuration and an already-built signer.
    ///
    /// `config` is taken as is; [`TokenService::from_config`] validates it.
    #[must_use]
    pub fn new(
        config: AuthConfig,
        signer: Arc<dyn TokenSigner>,
        store: Arc<dyn RevocationStore>,
    ) -> Self {
        let fail_open = config.revocation.fail_open;
        let config = Arc::new(config);

        let issuer = TokenIssuer::new(config.clone(), signer.clone());
        let validator = TokenValidator::new(signer, store.clone()).with_fail_open(fail_open);

        if fail_open {
            tracing::warn!("Revocation fail-open is enabled; store outages will accept tokens");
        }

        Self {
            auth_guard: AuthGuard::new(validator.clone()),
            refresh_guard: RefreshGuard::new(validator.clone()),
            config,
            issuer,
            validator,
            store,
        }
    }

    /// Creates a service, building the signer from `config`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid.
    pub fn from_config(config: AuthConfig, store: Arc<dyn RevocationStore>) -> AuthResult<Self> {
        let signer = config.build_signer()?;
        Ok(Self::new(config, signer, store))
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Returns the token issuer.
    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Returns the token validator.
    #[must_use]
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// Returns the revocation store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RevocationStore> {
        &self.store
    }

    /// Issues an access and refresh token for an already-authenticated
    /// subject.
    ///
    /// # Errors
    ///
    /// Returns `ReservedClaimConflict`, `InvalidRequest`, or a signing error.
    pub fn issue_pair(&self, subject: &str, extra_claims: ExtraClaims) -> AuthResult<TokenResponse> {
        self.issue_pair_at(subject, extra_claims, OffsetDateTime::now_utc())
    }

    /// Issues a token pair as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::issue_pair`].
    pub fn issue_pair_at(
        &self,
        subject: &str,
        extra_claims: ExtraClaims,
        now: OffsetDateTime,
    ) -> AuthResult<TokenResponse> {
        let access = self.issuer.issue_access_at(subject, extra_claims, now)?;
        let refresh = self.issuer.issue_refresh_at(subject, now)?;

        tracing::info!(subject = %subject, "Token pair issued");

        Ok(self.response(access.into_string(), refresh.into_string()))
    }

    /// Exchanges the refresh token in `authorization_header` for a new access
    /// token.
    ///
    /// With [`RefreshRotation::RevokeConsumed`] the presented refresh token
    /// is revoked and a new one is returned.
    ///
    /// # Errors
    ///
    /// Returns the guard's rejection, or an issuance or storage error.
    pub async fn refresh(
        &self,
        authorization_header: Option<&str>,
        extra_claims: ExtraClaims,
    ) -> AuthResult<TokenResponse> {
        self.refresh_at(authorization_header, extra_claims, OffsetDateTime::now_utc())
            .await
    }

    /// Refreshes as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::refresh`].
    pub async fn refresh_at(
        &self,
        authorization_header: Option<&str>,
        extra_claims: ExtraClaims,
        now: OffsetDateTime,
    ) -> AuthResult<TokenResponse> {
        let grant = self
            .refresh_guard
            .authenticate_at(authorization_header, now)
            .await?;

        self.exchange_at(grant, extra_claims, now).await
    }

    /// Validates the refresh token in `authorization_header` without
    /// exchanging it.
    ///
    /// # Errors
    ///
    /// Returns the guard's rejection.
    pub async fn authenticate_refresh(
        &self,
        authorization_header: Option<&str>,
    ) -> AuthResult<RefreshGrant> {
        self.refresh_guard.authenticate(authorization_header).await
    }

    /// Exchanges an already-validated refresh grant for new tokens.
    ///
    /// # Errors
    ///
    /// Returns an issuance or storage error.
    pub async fn exchange(
        &self,
        grant: RefreshGrant,
        extra_claims: ExtraClaims,
    ) -> AuthResult<TokenResponse> {
        self.exchange_at(grant, extra_claims, OffsetDateTime::now_utc())
            .await
    }

    /// Exchanges a refresh grant as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::exchange`].
    pub async fn exchange_at(
        &self,
        grant: RefreshGrant,
        extra_claims: ExtraClaims,
        now: OffsetDateTime,
    ) -> AuthResult<TokenResponse> {
        let access = self
            .issuer
            .issue_access_at(grant.subject(), extra_claims, now)?;

        let refresh_token = match self.config.refresh.rotation {
            RefreshRotation::Disabled => String::new(),
            RefreshRotation::RevokeConsumed => {
                self.store
                    .revoke_token(grant.jti(), grant.expires_at())
                    .await?;
                let refresh = self.issuer.issue_refresh_at(grant.subject(), now)?;
                tracing::debug!(
                    subject = %grant.subject(),
                    consumed = %grant.jti(),
                    issued = %refresh.jti(),
                    "Refresh token rotated"
                );
                refresh.into_string()
            }
        };

        tracing::info!(subject = %grant.subject(), "Access token refreshed");

        Ok(self.response(access.into_string(), refresh_token))
    }

    /// Authenticates the access token in `authorization_header`.
    ///
    /// # Errors
    ///
    /// Returns the guard's rejection.
    pub async fn authenticate(&self, authorization_header: Option<&str>) -> AuthResult<Identity> {
        self.auth_guard.authenticate(authorization_header).await
    }

    /// Authenticates as of `now`.
    ///
    /// # Errors
    ///
    /// Returns the guard's rejection.
    pub async fn authenticate_at(
        &self,
        authorization_header: Option<&str>,
        now: OffsetDateTime,
    ) -> AuthResult<Identity> {
        self.auth_guard
            .authenticate_at(authorization_header, now)
            .await
    }

    /// Revokes every token issued to `subject` so far.
    ///
    /// Tokens issued in the same second as the logout are revoked too.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the cutoff cannot be recorded.
    pub async fn logout(&self, subject: &str) -> AuthResult<()> {
        self.logout_at(subject, OffsetDateTime::now_utc()).await
    }

    /// Logs `subject` out as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenService::logout`].
    pub async fn logout_at(&self, subject: &str, now: OffsetDateTime) -> AuthResult<()> {
        if subject.is_empty() {
            return Err(AuthError::invalid_request("Subject cannot be empty"));
        }

        self.store.revoke_all_for_subject(subject, now).await?;
        tracing::info!(subject = %subject, "All tokens revoked for subject");
        Ok(())
    }

    /// Revokes a single token, access or refresh.
    ///
    /// The token must carry a valid signature; expired and already-revoked
    /// tokens are accepted.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken`, `InvalidSignature`, or a storage error.
    pub async fn revoke(&self, token: &str) -> AuthResult<()> {
        let claims = self.validator.verify_signature(token)?;
        self.store
            .revoke_token(&claims.jti, claims.expires_at()?)
            .await?;

        tracing::info!(
            subject = %claims.sub,
            jti = %claims.jti,
            token_type = %claims.token_type,
            "Token revoked"
        );
        Ok(())
    }

    /// Drops revocation entries that can no longer match a live token.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn prune_expired(&self) -> AuthResult<u64> {
        self.prune_expired_at(OffsetDateTime::now_utc()).await
    }

    /// Prunes as of `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn prune_expired_at(&self, now: OffsetDateTime) -> AuthResult<u64> {
        let max_lifetime = time::Duration::try_from(self.config.max_token_lifetime())
            .map_err(|e| AuthError::configuration(e.to_string()))?;
        self.store.prune_expired(now, max_lifetime).await
    }

    fn response(&self, access_token: String, refresh_token: String) -> TokenResponse {
        TokenResponse {
            access_token,
            refresh_token,
            token_type: BEARER_TOKEN_TYPE.to_string(),
            expires_in: self.issuer.lifetime_secs(TokenType::Access).unsigned_abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::storage::InMemoryRevocationStore;

    const SECRET: &str = "service-test-secret-with-at-least-32-bytes";

    fn service(rotation: RefreshRotation) -> TokenService {
        let config = AuthConfig::hmac(SECRET)
            .with_access_token_ttl(Duration::from_secs(3600))
            .with_refresh_token_ttl(Duration::from_secs(30 * 24 * 3600))
            .with_refresh_rotation(rotation);
        TokenService::from_config(config, Arc::new(InMemoryRevocationStore::new())).unwrap()
    }

    fn t0() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap()
    }

    fn bearer(token: &str) -> String {
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn test_issue_pair() {
        let service = service(RefreshRotation::Disabled);
        let response = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();

        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.expires_in, 3600);
        assert!(!response.refresh_token.is_empty());
        assert_ne!(response.access_token, response.refresh_token);

        let identity = service
            .authenticate_at(Some(bearer(&response.access_token).as_str()), t0())
            .await
            .unwrap();
        assert_eq!(identity.subject, "user1");
    }

    #[tokio::test]
    async fn test_refresh_without_rotation() {
        let service = service(RefreshRotation::Disabled);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        let header = bearer(&pair.refresh_token);

        let first = service
            .refresh_at(Some(header.as_str()), ExtraClaims::new(), t0())
            .await
            .unwrap();
        assert!(first.refresh_token.is_empty());

        let second = service
            .refresh_at(Some(header.as_str()), ExtraClaims::new(), t0())
            .await
            .unwrap();
        assert_ne!(first.access_token, second.access_token);
    }

    #[tokio::test]
    async fn test_refresh_with_rotation_revokes_consumed() {
        let service = service(RefreshRotation::RevokeConsumed);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        let old = bearer(&pair.refresh_token);

        let rotated = service
            .refresh_at(Some(old.as_str()), ExtraClaims::new(), t0())
            .await
            .unwrap();
        let new = bearer(&rotated.refresh_token);

        let err = service
            .refresh_at(Some(old.as_str()), ExtraClaims::new(), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));

        assert!(
            service
                .refresh_at(Some(new.as_str()), ExtraClaims::new(), t0())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = service(RefreshRotation::Disabled);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();

        let err = service
            .refresh_at(
                Some(bearer(&pair.access_token).as_str()),
                ExtraClaims::new(),
                t0(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WrongTokenType { .. }));
    }

    #[tokio::test]
    async fn test_refresh_carries_new_claims() {
        let service = service(RefreshRotation::Disabled);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        let mut extra = ExtraClaims::new();
        extra.insert("role".to_string(), "editor".into());

        let refreshed = service
            .refresh_at(
                Some(bearer(&pair.refresh_token).as_str()),
                extra,
                t0(),
            )
            .await
            .unwrap();

        let identity = service
            .authenticate_at(Some(bearer(&refreshed.access_token).as_str()), t0())
            .await
            .unwrap();
        assert_eq!(
            identity.claim("role").and_then(|v| v.as_str()),
            Some("editor")
        );
    }

    #[tokio::test]
    async fn test_logout_revokes_prior_tokens() {
        let service = service(RefreshRotation::Disabled);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        let other = service.issue_pair_at("user2", ExtraClaims::new(), t0()).unwrap();

        service.logout_at("user1", t0()).await.unwrap();
        let later = t0() + time::Duration::seconds(1);

        let err = service
            .authenticate_at(Some(bearer(&pair.access_token).as_str()), later)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));

        let err = service
            .refresh_at(
                Some(bearer(&pair.refresh_token).as_str()),
                ExtraClaims::new(),
                later,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));

        assert!(
            service
                .authenticate_at(Some(bearer(&other.access_token).as_str()), later)
                .await
                .is_ok()
        );

        let fresh = service.issue_pair_at("user1", ExtraClaims::new(), later).unwrap();
        assert!(
            service
                .authenticate_at(Some(bearer(&fresh.access_token).as_str()), later)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_revoke_single_token() {
        let service = service(RefreshRotation::Disabled);
        let first = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        let second = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();

        service.revoke(&first.access_token).await.unwrap();

        let err = service
            .authenticate_at(Some(bearer(&first.access_token).as_str()), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenRevoked));
        assert!(
            service
                .authenticate_at(Some(bearer(&second.access_token).as_str()), t0())
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_revoke_requires_valid_signature() {
        let service = service(RefreshRotation::Disabled);
        let err = service.revoke("not.a.token").await.unwrap_err();
        assert!(matches!(err, AuthError::MalformedToken { .. }));
    }

    #[tokio::test]
    async fn test_prune_expired() {
        let service = service(RefreshRotation::Disabled);
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();
        service.revoke(&pair.access_token).await.unwrap();

        assert_eq!(service.prune_expired_at(t0()).await.unwrap(), 0);

        let after_expiry = t0() + time::Duration::seconds(3600);
        assert_eq!(service.prune_expired_at(after_expiry).await.unwrap(), 1);
    }

    #[test]
    fn test_token_response_serialization() {
        let response = TokenResponse {
            access_token: "a".to_string(),
            refresh_token: String::new(),
            token_type: BEARER_TOKEN_TYPE.to_string(),
            expires_in: 3600,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "access_token": "a",
                "refresh_token": "",
                "token_type": "bearer",
                "expires_in": 3600
            })
        );
    }

    #[tokio::test]
    async fn test_longest_refresh_ttl_round_trips() {
        let config = AuthConfig::hmac(SECRET).with_refresh_token_ttl(crate::config::MAX_TOKEN_TTL);
        let service =
            TokenService::from_config(config, Arc::new(InMemoryRevocationStore::new())).unwrap();
        let pair = service.issue_pair_at("user1", ExtraClaims::new(), t0()).unwrap();

        let refreshed = service
            .refresh_at(
                Some(bearer(&pair.refresh_token).as_str()),
                ExtraClaims::new(),
                t0(),
            )
            .await;
        assert!(refreshed.is_ok(), "{refreshed:?}");

        service.logout_at("user1", t0()).await.unwrap();
        assert_eq!(service.prune_expired_at(t0()).await.unwrap(), 0);
    }

    #[test]
    fn test_excessive_ttl_rejected() {
        let config = AuthConfig::hmac(SECRET)
            .with_refresh_token_ttl(Duration::from_secs(9000 * 365 * 24 * 3600));
        let err = TokenService::from_config(config, Arc::new(InMemoryRevocationStore::new()))
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = TokenService::from_config(
            AuthConfig::hmac("too-short"),
            Arc::new(InMemoryRevocationStore::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
