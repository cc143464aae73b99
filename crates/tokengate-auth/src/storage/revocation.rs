//! Revocation storage trait.
//!
//! Tracks two kinds of entries:
//!
//! - **Token revocations**: a single `jti`, stored with the token's own
//!   expiration so the entry can be dropped once the token would have
//!   expired anyway.
//! - **Subject cutoffs**: one timestamp per subject. Every token of that
//!   subject issued at or before the cutoff is revoked. This is the
//!   logout / "end all sessions" primitive; it costs one entry no matter how
//!   many tokens the subject holds, and needs no registry of issued tokens.
//!
//! # Security Considerations
//!
//! - Lookups run on every validation and must be fast
//! - A failing lookup must surface as an error, never as "not revoked"
//! - Readers must never observe a half-written entry

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;

/// Storage trait for revoked tokens and subject cutoffs.
///
/// # Implementations
///
/// - [`InMemoryRevocationStore`](super::InMemoryRevocationStore) - single-process map
///
/// Remote backends implement the same trait; their failures are reported as
/// `AuthError::Storage` and turned into `RevocationCheckUnavailable` by the
/// validator.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Revokes a single token by its `jti`.
    ///
    /// `expires_at` is the token's own expiration; the entry may be pruned
    /// after it. Revoking an already-revoked `jti` succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_token(&self, jti: &str, expires_at: OffsetDateTime) -> AuthResult<()>;

    /// Revokes every token of `subject` issued at or before `cutoff`.
    ///
    /// If a cutoff already exists, the later of the two is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn revoke_all_for_subject(&self, subject: &str, cutoff: OffsetDateTime)
    -> AuthResult<()>;

    /// Checks whether a token is revoked, either by `jti` or by a subject
    /// cutoff at or after `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_revoked(
        &self,
        jti: &str,
        subject: &str,
        issued_at: OffsetDateTime,
    ) -> AuthResult<bool>;

    /// Removes a single token revocation.
    ///
    /// Returns `true` if an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn remove_token(&self, jti: &str) -> AuthResult<bool>;

    /// Removes the cutoff recorded for `subject`.
    ///
    /// Returns `true` if an entry was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn clear_subject(&self, subject: &str) -> AuthResult<bool>;

    /// Deletes entries that can no longer affect validation.
    ///
    /// Token entries go once their `expires_at` is at or before `now`. A
    /// subject cutoff goes once `cutoff + max_token_lifetime` is at or before
    /// `now`, since every token it covered has expired by then.
    ///
    /// # Returns
    ///
    /// Returns the number of entries deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn prune_expired(
        &self,
        now: OffsetDateTime,
        max_token_lifetime: Duration,
    ) -> AuthResult<u64>;
}
