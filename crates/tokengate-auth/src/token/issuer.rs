//! Access and refresh token issuance.

use std::sync::Arc;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::error::AuthError;

use super::claims::{ClaimSet, ExtraClaims, TokenType};
use super::codec;
use super::signing::TokenSigner;
use super::Token;

/// Builds and signs access and refresh tokens.
///
/// Holds only shared immutable state, so one issuer can serve any number of
/// concurrent callers. Issuance never consults or mutates revocation state.
#[derive(Clone)]
pub struct TokenIssuer {
    config: Arc<AuthConfig>,
    signer: Arc<dyn TokenSigner>,
}

impl TokenIssuer {
    /// Creates a new issuer.
    #[must_use]
    pub fn new(config: Arc<AuthConfig>, signer: Arc<dyn TokenSigner>) -> Self {
        Self { config, signer }
    }

    /// Issues an access token for `subject` carrying `extra_claims`.
    ///
    /// # Errors
    /// Returns `ReservedClaimConflict` if an extra claim uses a reserved name,
    /// `InvalidRequest` for an empty subject or a NaN/infinite float claim,
    /// or a signing error.
    pub fn issue_access(&self, subject: &str, extra_claims: ExtraClaims) -> AuthResult<Token> {
        self.issue_access_at(subject, extra_claims, OffsetDateTime::now_utc())
    }

    /// Issues an access token as of `now`.
    ///
    /// # Errors
    /// See [`TokenIssuer::issue_access`].
    pub fn issue_access_at(
        &self,
        subject: &str,
        extra_claims: ExtraClaims,
        now: OffsetDateTime,
    ) -> AuthResult<Token> {
        if let Some(name) = extra_claims.keys().find(|name| ClaimSet::is_reserved(name)) {
            tracing::error!(claim = %name, subject = %subject, "Extra claim uses a reserved name");
            return Err(AuthError::reserved_claim(name.as_str()));
        }

        if let Some(name) = extra_claims
            .iter()
            .find_map(|(name, value)| (!value.is_finite()).then_some(name))
        {
            return Err(AuthError::invalid_request(format!(
                "Claim '{name}' holds a non-finite number"
            )));
        }

        self.issue(subject, TokenType::Access, extra_claims, now)
    }

    /// Issues a refresh token for `subject`.
    ///
    /// Refresh tokens carry no caller claims.
    ///
    /// # Errors
    /// Returns `InvalidRequest` for an empty subject, or a signing error.
    pub fn issue_refresh(&self, subject: &str) -> AuthResult<Token> {
        self.issue_refresh_at(subject, OffsetDateTime::now_utc())
    }

    /// Issues a refresh token as of `now`.
    ///
    /// # Errors
    /// See [`TokenIssuer::issue_refresh`].
    pub fn issue_refresh_at(&self, subject: &str, now: OffsetDateTime) -> AuthResult<Token> {
        self.issue(subject, TokenType::Refresh, ExtraClaims::new(), now)
    }

    /// Returns the lifetime configured for `token_type`, in seconds.
    #[must_use]
    pub fn lifetime_secs(&self, token_type: TokenType) -> i64 {
        let ttl = match token_type {
            TokenType::Access => self.config.access_token_ttl,
            TokenType::Refresh => self.config.refresh_token_ttl,
        };
        i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)
    }

    fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        extra: ExtraClaims,
        now: OffsetDateTime,
    ) -> AuthResult<Token> {
        if subject.is_empty() {
            return Err(AuthError::invalid_request("Subject cannot be empty"));
        }

        let iat = now.unix_timestamp();
        let exp = iat
            .checked_add(self.lifetime_secs(token_type))
            .ok_or_else(|| AuthError::configuration("Token lifetime overflows exp"))?;

        let claims = ClaimSet {
            sub: subject.to_string(),
            token_type,
            exp,
            iat,
            jti: Uuid::new_v4().to_string(),
            extra,
        };

        let token = codec::encode(claims, self.signer.as_ref())?;

        tracing::debug!(
            subject = %subject,
            jti = %token.jti(),
            token_type = %token_type,
            exp = exp,
            "Token issued"
        );

        Ok(token)
    }
}
