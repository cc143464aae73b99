//! Claim set carried inside every token.
//!
//! Reserved claims (`sub`, `type`, `exp`, `iat`, `jti`) are typed fields;
//! everything else is an opaque pass-through [`ClaimValue`] keyed by name.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::AuthResult;
use crate::error::AuthError;

/// Claim names owned by the token format itself.
pub const RESERVED_CLAIMS: [&str; 5] = ["sub", "type", "exp", "iat", "jti"];

/// Caller-supplied claims merged into an access token.
pub type ExtraClaims = BTreeMap<String, ClaimValue>;

/// Kind of token, carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Authorizes requests on behalf of the subject.
    Access,
    /// Authorizes only minting a new access token for the subject.
    Refresh,
}

impl TokenType {
    /// Returns the claim value for this type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a caller-supplied claim.
///
/// Objects and `null` are not representable; a token carrying them is
/// rejected as malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<ClaimValue>),
}

impl ClaimValue {
    /// Returns the string value, if this is a string claim.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value, if this is an integer claim.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean claim.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the elements, if this is a sequence claim.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[ClaimValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Returns `false` if this value, or any element nested in it, is a NaN
    /// or infinite float. JSON has no encoding for those.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::Sequence(items) => items.iter().all(Self::is_finite),
            Self::Bool(_) | Self::Integer(_) | Self::String(_) => true,
        }
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<ClaimValue>> From<Vec<T>> for ClaimValue {
    fn from(values: Vec<T>) -> Self {
        Self::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Full claim set of a token: reserved claims plus pass-through extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    /// Subject (user identifier).
    pub sub: String,

    /// Token type.
    #[serde(rename = "type")]
    pub token_type: TokenType,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Unique token identifier, used for revocation lookups.
    pub jti: String,

    /// Caller-supplied claims, returned verbatim on validation.
    #[serde(flatten)]
    pub extra: ExtraClaims,
}

impl ClaimSet {
    /// Returns `true` if `name` is one of the reserved claim names.
    #[must_use]
    pub fn is_reserved(name: &str) -> bool {
        RESERVED_CLAIMS.contains(&name)
    }

    /// Looks up a caller-supplied claim.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.extra.get(name)
    }

    /// Returns the `iat` claim as an instant.
    ///
    /// # Errors
    /// Returns `MalformedToken` if the timestamp is out of range.
    pub fn issued_at(&self) -> AuthResult<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.iat)
            .map_err(|_| AuthError::malformed("iat is out of range"))
    }

    /// Returns the `exp` claim as an instant.
    ///
    /// # Errors
    /// Returns `MalformedToken` if the timestamp is out of range.
    pub fn expires_at(&self) -> AuthResult<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(self.exp)
            .map_err(|_| AuthError::malformed("exp is out of range"))
    }

    /// Returns `true` if the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.exp <= now.unix_timestamp()
    }
}
