//! Token validation.
//!
//! Checks run in a fixed order and stop at the first failure: structure,
//! signature, expiry, type, revocation. Revocation is only consulted for
//! tokens that already passed every local check.

use std::sync::Arc;

use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::RevocationStore;

use super::claims::{ClaimSet, TokenType};
use super::codec;
use super::signing::TokenSigner;

/// Validates tokens produced by a [`TokenIssuer`](super::TokenIssuer) sharing
/// the same signer.
#[derive(Clone)]
pub struct TokenValidator {
    signer: Arc<dyn TokenSigner>,
    revocation: Arc<dyn RevocationStore>,
    fail_open: bool,
}

impl TokenValidator {
    /// Creates a validator that rejects tokens when the revocation store
    /// cannot be consulted.
    #[must_use]
    pub fn new(signer: Arc<dyn TokenSigner>, revocation: Arc<dyn RevocationStore>) -> Self {
        Self {
            signer,
            revocation,
            fail_open: false,
        }
    }

    /// Sets whether a failing revocation lookup lets the token through.
    #[must_use]
    pub fn with_fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Returns the revocation store this validator consults.
    #[must_use]
    pub fn revocation_store(&self) -> &Arc<dyn RevocationStore> {
        &self.revocation
    }

    /// Validates `token` as a token of `expected` type.
    ///
    /// # Errors
    ///
    /// Returns the first failing check: `MalformedToken`, `InvalidSignature`,
    /// `TokenExpired`, `WrongTokenType`, `TokenRevoked`, or
    /// `RevocationCheckUnavailable`.
    pub async fn validate(&self, token: &str, expected: TokenType) -> AuthResult<ClaimSet> {
        self.validate_at(token, expected, OffsetDateTime::now_utc())
            .await
    }

    /// Validates `token` as of `now`.
    ///
    /// # Errors
    ///
    /// See [`TokenValidator::validate`].
    pub async fn validate_at(
        &self,
        token: &str,
        expected: TokenType,
        now: OffsetDateTime,
    ) -> AuthResult<ClaimSet> {
        let claims = self.verify_signature(token)?;

        if claims.is_expired_at(now) {
            tracing::debug!(jti = %claims.jti, exp = claims.exp, "Token expired");
            return Err(AuthError::TokenExpired);
        }

        if claims.token_type != expected {
            tracing::debug!(
                jti = %claims.jti,
                expected = %expected,
                actual = %claims.token_type,
                "Wrong token type"
            );
            return Err(AuthError::WrongTokenType {
                expected,
                actual: claims.token_type,
            });
        }

        let issued_at = claims.issued_at()?;
        match self
            .revocation
            .is_revoked(&claims.jti, &claims.sub, issued_at)
            .await
        {
            Ok(true) => {
                tracing::debug!(jti = %claims.jti, subject = %claims.sub, "Token revoked");
                return Err(AuthError::TokenRevoked);
            }
            Ok(false) => {}
            Err(e) if self.fail_open => {
                tracing::warn!(
                    error = %e,
                    jti = %claims.jti,
                    "Revocation check failed, accepting token because fail-open is configured"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, jti = %claims.jti, "Revocation check failed");
                return Err(AuthError::revocation_unavailable(e.to_string()));
            }
        }

        Ok(claims)
    }

    /// Checks structure and signature only, returning the claims.
    ///
    /// Expired and revoked tokens pass. Used where the caller needs a
    /// token's identity even after it stopped being usable, such as revoking it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedToken` or `InvalidSignature`.
    pub fn verify_signature(&self, token: &str) -> AuthResult<ClaimSet> {
        let decoded = codec::decode(token)?;

        let expected_alg = self.signer.algorithm();
        if decoded.header.alg != expected_alg {
            tracing::debug!(
                alg = %decoded.header.alg,
                expected = %expected_alg,
                "Token algorithm does not match configured algorithm"
            );
            return Err(AuthError::InvalidSignature);
        }

        let valid = self
            .signer
            .verify(decoded.signing_input.as_bytes(), &decoded.signature)
            .unwrap_or_else(|e| {
                tracing::debug!(error = %e, "Signature verification errored");
                false
            });

        if !valid {
            return Err(AuthError::InvalidSignature);
        }

        Ok(decoded.claims)
    }
}
