//! In-memory revocation store.
//!
//! Uses `DashMap` so concurrent revokers and readers contend only on the
//! shard holding the key they touch. Each entry is written as a whole, so a
//! reader sees either the old or the new value.

use async_trait::async_trait;
use dashmap::DashMap;
use time::{Duration, OffsetDateTime};

use crate::AuthResult;

use super::revocation::RevocationStore;

/// Single-process revocation store.
#[derive(Debug, Default)]
pub struct InMemoryRevocationStore {
    /// Revoked `jti` -> token expiration.
    tokens: DashMap<String, OffsetDateTime>,
    /// Subject -> revocation cutoff.
    subject_cutoffs: DashMap<String, OffsetDateTime>,
}

impl InMemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revoked token entries.
    #[must_use]
    pub fn revoked_token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Number of subject cutoff entries.
    #[must_use]
    pub fn subject_cutoff_count(&self) -> usize {
        self.subject_cutoffs.len()
    }

    /// Returns the cutoff recorded for `subject`, if any.
    #[must_use]
    pub fn subject_cutoff(&self, subject: &str) -> Option<OffsetDateTime> {
        self.subject_cutoffs.get(subject).map(|entry| *entry)
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn revoke_token(&self, jti: &str, expires_at: OffsetDateTime) -> AuthResult<()> {
        self.tokens.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn revoke_all_for_subject(
        &self,
        subject: &str,
        cutoff: OffsetDateTime,
    ) -> AuthResult<()> {
        self.subject_cutoffs
            .entry(subject.to_string())
            .and_modify(|existing| {
                if cutoff > *existing {
                    *existing = cutoff;
                }
            })
            .or_insert(cutoff);
        Ok(())
    }

    async fn is_revoked(
        &self,
        jti: &str,
        subject: &str,
        issued_at: OffsetDateTime,
    ) -> AuthResult<bool> {
        if self.tokens.contains_key(jti) {
            return Ok(true);
        }

        Ok(self
            .subject_cutoffs
            .get(subject)
            .is_some_and(|cutoff| issued_at <= *cutoff))
    }

    async fn remove_token(&self, jti: &str) -> AuthResult<bool> {
        Ok(self.tokens.remove(jti).is_some())
    }

    async fn clear_subject(&self, subject: &str) -> AuthResult<bool> {
        Ok(self.subject_cutoffs.remove(subject).is_some())
    }

    async fn prune_expired(
        &self,
        now: OffsetDateTime,
        max_token_lifetime: Duration,
    ) -> AuthResult<u64> {
        let before = self.tokens.len() + self.subject_cutoffs.len();

        self.tokens.retain(|_, expires_at| *expires_at > now);
        // a horizon past the representable range never expires
        self.subject_cutoffs.retain(|_, cutoff| {
            cutoff
                .checked_add(max_token_lifetime)
                .is_none_or(|horizon| horizon > now)
        });

        let after = self.tokens.len() + self.subject_cutoffs.len();
        let removed = before.saturating_sub(after) as u64;

        if removed > 0 {
            tracing::debug!(removed = removed, "Pruned expired revocation entries");
        }

        Ok(removed)
    }
}
