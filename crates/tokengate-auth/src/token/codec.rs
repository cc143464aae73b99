//! Wire format for signed tokens.
//!
//! A token is `header.claims.signature`, each segment base64url-encoded
//! without padding. Claims are serialized as JSON with keys in sorted order,
//! so the same claim set always produces the same signing input.

use std::collections::BTreeMap;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;

use super::Token;
use super::claims::{ClaimSet, ClaimValue};
use super::signing::{SigningAlgorithm, TokenSigner};

/// Value of the header's `typ` field.
pub const TOKEN_TYP: &str = "JWT";

/// Token header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm.
    pub alg: SigningAlgorithm,

    /// Media type, always `JWT` for tokens produced here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

impl TokenHeader {
    /// Creates a header for the given algorithm.
    #[must_use]
    pub fn new(alg: SigningAlgorithm) -> Self {
        Self {
            alg,
            typ: Some(TOKEN_TYP.to_string()),
        }
    }
}

/// A token split into its parts, before any semantic checks.
#[derive(Debug)]
pub struct DecodedToken<'a> {
    /// Decoded header.
    pub header: TokenHeader,

    /// Decoded claim set.
    pub claims: ClaimSet,

    /// The `header.claims` text the signature covers.
    pub signing_input: &'a str,

    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

/// Serializes a claim set to canonical JSON bytes.
///
/// # Errors
/// Returns `MalformedToken` if a claim value cannot be represented in JSON
/// (non-finite floats).
pub fn encode_claims(claims: &ClaimSet) -> AuthResult<Vec<u8>> {
    // serde_json writes NaN and infinities as null, which would not decode
    if !claims.extra.values().all(ClaimValue::is_finite) {
        return Err(AuthError::malformed("Claims contain a non-finite number"));
    }

    let value = serde_json::to_value(claims)
        .map_err(|e| AuthError::malformed(format!("Cannot serialize claims: {e}")))?;

    let serde_json::Value::Object(map) = value else {
        return Err(AuthError::malformed("Claims did not serialize to an object"));
    };

    let canonical: BTreeMap<String, serde_json::Value> = map.into_iter().collect();
    serde_json::to_vec(&canonical)
        .map_err(|e| AuthError::malformed(format!("Cannot serialize claims: {e}")))
}

/// Parses canonical JSON bytes back into a claim set.
///
/// # Errors
/// Returns `MalformedToken` on invalid JSON, a missing reserved claim, a
/// reserved claim of the wrong type, or an unrepresentable extra claim.
pub fn decode_claims(bytes: &[u8]) -> AuthResult<ClaimSet> {
    serde_json::from_slice(bytes).map_err(|e| AuthError::malformed(format!("Invalid claims: {e}")))
}

/// Signs a claim set and assembles the token text.
///
/// # Errors
/// Returns an error if serialization or signing fails.
pub fn encode(claims: ClaimSet, signer: &dyn TokenSigner) -> AuthResult<Token> {
    let header = TokenHeader::new(signer.algorithm());
    let header_json = serde_json::to_vec(&header)
        .map_err(|e| AuthError::signing(format!("Cannot serialize header: {e}")))?;
    let claims_json = encode_claims(&claims)?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header_json),
        URL_SAFE_NO_PAD.encode(claims_json)
    );
    let signature = signer.sign(signing_input.as_bytes())?;
    let encoded = format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature));

    Ok(Token::new(header, claims, encoded))
}

/// Splits token text into its three segments and decodes each.
///
/// No signature or semantic check happens here.
///
/// # Errors
/// Returns `MalformedToken` for a wrong segment count, invalid base64url,
/// or an undecodable header or claim set.
pub fn decode(token: &str) -> AuthResult<DecodedToken<'_>> {
    let mut segments = token.split('.');
    let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(AuthError::malformed(format!(
            "Expected 3 segments, got {}",
            token.split('.').count()
        )));
    };

    if header_b64.is_empty() || claims_b64.is_empty() || signature_b64.is_empty() {
        return Err(AuthError::malformed("Empty token segment"));
    }

    let header_json = decode_segment(header_b64, "header")?;
    let header: TokenHeader = serde_json::from_slice(&header_json)
        .map_err(|e| AuthError::malformed(format!("Invalid header: {e}")))?;

    let claims = decode_claims(&decode_segment(claims_b64, "claims")?)?;
    let signature = decode_segment(signature_b64, "signature")?;

    // header and claims are ASCII base64, so this index is a char boundary
    let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];

    Ok(DecodedToken {
        header,
        claims,
        signing_input,
        signature,
    })
}

fn decode_segment(segment: &str, name: &str) -> AuthResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| AuthError::malformed(format!("Invalid base64url in {name}: {e}")))
}
