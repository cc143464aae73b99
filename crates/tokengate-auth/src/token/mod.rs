//! Token generation, validation, and encoding.
//!
//! This module provides:
//!
//! - Claim set types ([`ClaimSet`], [`ClaimValue`], [`TokenType`])
//! - The signed wire format ([`codec`])
//! - Pluggable signing ([`TokenSigner`], HMAC and asymmetric keys)
//! - Access and refresh token issuance ([`TokenIssuer`])
//! - Token validation including revocation ([`TokenValidator`])

pub mod claims;
pub mod codec;
pub mod issuer;
pub mod signing;
pub mod validator;

use std::fmt;

pub use claims::{ClaimSet, ClaimValue, ExtraClaims, RESERVED_CLAIMS, TokenType};
pub use codec::TokenHeader;
pub use issuer::TokenIssuer;
pub use signing::{
    HmacSigner, MIN_HMAC_SECRET_LEN, SigningAlgorithm, SigningError, SigningKeyPair, TokenSigner,
};
pub use validator::TokenValidator;

/// An issued, signed token.
///
/// Immutable once built; the encoded text is what travels in the
/// `Authorization: Bearer` header.
#[derive(Clone, PartialEq)]
pub struct Token {
    header: TokenHeader,
    claims: ClaimSet,
    encoded: String,
}

impl Token {
    pub(crate) fn new(header: TokenHeader, claims: ClaimSet, encoded: String) -> Self {
        Self {
            header,
            claims,
            encoded,
        }
    }

    /// Returns the encoded `header.claims.signature` text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    /// Consumes the token, returning its encoded text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.encoded
    }

    /// Returns the token header.
    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Returns the claim set.
    #[must_use]
    pub fn claims(&self) -> &ClaimSet {
        &self.claims
    }

    /// Returns the subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.claims.sub
    }

    /// Returns the unique token identifier.
    #[must_use]
    pub fn jti(&self) -> &str {
        &self.claims.jti
    }

    /// Returns the token type.
    #[must_use]
    pub fn token_type(&self) -> TokenType {
        self.claims.token_type
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

// Token text is a live credential; keep it out of debug output.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .finish_non_exhaustive()
    }
}
