//! Signature capability used by the issuer and validator.
//!
//! Tokens are signed through the [`TokenSigner`] trait so the key type and
//! algorithm can be swapped without touching issuance or validation. Two
//! implementations are provided:
//!
//! - [`HmacSigner`]: HS256, HS384, HS512 with a shared secret. Verification
//!   recomputes the MAC and compares in constant time.
//! - [`SigningKeyPair`]: RS256, RS384 (RSA) and ES384 (ECDSA P-384), backed
//!   by the `jsonwebtoken` crypto primitives.
//!
//! ## Example
//!
//! ```ignore
//! use tokengate_auth::token::signing::{HmacSigner, SigningAlgorithm, TokenSigner};
//!
//! let signer = HmacSigner::new(SigningAlgorithm::HS256, secret_bytes)?;
//! let signature = signer.sign(b"header.claims")?;
//! assert!(signer.verify(b"header.claims", &signature)?);
//! ```

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, crypto};
use p384::SecretKey as EcSecretKey;
use p384::pkcs8::{EncodePrivateKey as _, EncodePublicKey as _};
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};

use crate::error::AuthError;

/// Minimum HMAC secret length in bytes.
pub const MIN_HMAC_SECRET_LEN: usize = 32;

const RSA_KEY_BITS: usize = 2048;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while producing or checking signatures.
#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    /// Failed to produce a signature.
    #[error("Failed to sign token: {message}")]
    SigningFailed {
        /// Description of the signing failure.
        message: String,
    },

    /// Failed to generate a cryptographic key.
    #[error("Key generation error: {message}")]
    KeyGenerationError {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl SigningError {
    /// Creates a new `SigningFailed` error.
    #[must_use]
    pub fn signing_failed(message: impl Into<String>) -> Self {
        Self::SigningFailed {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGenerationError`.
    #[must_use]
    pub fn key_generation_error(message: impl Into<String>) -> Self {
        Self::KeyGenerationError {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

fn key_generation_error(err: impl fmt::Display) -> SigningError {
    SigningError::key_generation_error(err.to_string())
}

impl From<SigningError> for AuthError {
    fn from(err: SigningError) -> Self {
        match err {
            SigningError::SigningFailed { message } => AuthError::signing(message),
            SigningError::KeyGenerationError { .. } | SigningError::InvalidKey { .. } => {
                AuthError::configuration(err.to_string())
            }
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms, named as in the token header's `alg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    HS256,
    /// HMAC with SHA-384.
    HS384,
    /// HMAC with SHA-512.
    HS512,
    /// RSA PKCS#1 v1.5 with SHA-256.
    RS256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    RS384,
    /// ECDSA with P-384 curve.
    ES384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::HS256 => Algorithm::HS256,
            Self::HS384 => Algorithm::HS384,
            Self::HS512 => Algorithm::HS512,
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
            Self::ES384 => Algorithm::ES384,
        }
    }

    /// Returns the algorithm name as used in token headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::ES384 => "ES384",
        }
    }

    /// Returns `true` if this is a shared-secret (HMAC) algorithm.
    #[must_use]
    pub fn is_hmac(&self) -> bool {
        matches!(self, Self::HS256 | Self::HS384 | Self::HS512)
    }

    /// Returns `true` if this is an RSA-based algorithm.
    #[must_use]
    pub fn is_rsa(&self) -> bool {
        matches!(self, Self::RS256 | Self::RS384)
    }

    /// Returns `true` if this is an EC-based algorithm.
    #[must_use]
    pub fn is_ec(&self) -> bool {
        matches!(self, Self::ES384)
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Signer Capability
// ============================================================================

/// Produces and checks signatures over a token's signing input.
///
/// Implementations must be thread-safe; a single signer is shared by every
/// issuer and validator built from the same configuration.
pub trait TokenSigner: Send + Sync {
    /// The algorithm written to and expected in the token header.
    fn algorithm(&self) -> SigningAlgorithm;

    /// Signs `message` and returns the raw signature bytes.
    ///
    /// # Errors
    /// Returns an error if the key cannot produce a signature.
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError>;

    /// Checks `signature` against `message`.
    ///
    /// Returns `Ok(false)` for a mismatching signature; errors are reserved
    /// for key problems.
    ///
    /// # Errors
    /// Returns an error if the key cannot be used for verification.
    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, SigningError>;
}

// ============================================================================
// HMAC
// ============================================================================

/// Shared-secret signer for HS256/HS384/HS512.
pub struct HmacSigner {
    algorithm: SigningAlgorithm,
    secret: Vec<u8>,
}

impl HmacSigner {
    /// Creates an HMAC signer.
    ///
    /// # Errors
    /// Returns an error if `algorithm` is not an HMAC algorithm or the secret
    /// is shorter than [`MIN_HMAC_SECRET_LEN`] bytes.
    pub fn new(algorithm: SigningAlgorithm, secret: impl Into<Vec<u8>>) -> Result<Self, SigningError> {
        if !algorithm.is_hmac() {
            return Err(SigningError::invalid_key(format!(
                "Algorithm {} is not HMAC-based",
                algorithm
            )));
        }

        let secret = secret.into();
        if secret.len() < MIN_HMAC_SECRET_LEN {
            return Err(SigningError::invalid_key(format!(
                "HMAC secret must be at least {} bytes, got {}",
                MIN_HMAC_SECRET_LEN,
                secret.len()
            )));
        }

        Ok(Self { algorithm, secret })
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn hmac_sign<M: Mac + KeyInit>(secret: &[u8], message: &[u8]) -> Result<Vec<u8>, SigningError> {
    let mut mac =
        <M as Mac>::new_from_slice(secret).map_err(|e| SigningError::invalid_key(e.to_string()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hmac_verify<M: Mac + KeyInit>(
    secret: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, SigningError> {
    let mut mac =
        <M as Mac>::new_from_slice(secret).map_err(|e| SigningError::invalid_key(e.to_string()))?;
    mac.update(message);
    // verify_slice compares in constant time
    Ok(mac.verify_slice(signature).is_ok())
}

impl TokenSigner for HmacSigner {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        match self.algorithm {
            SigningAlgorithm::HS256 => hmac_sign::<Hmac<Sha256>>(&self.secret, message),
            SigningAlgorithm::HS384 => hmac_sign::<Hmac<Sha384>>(&self.secret, message),
            SigningAlgorithm::HS512 => hmac_sign::<Hmac<Sha512>>(&self.secret, message),
            other => Err(SigningError::invalid_key(format!(
                "Algorithm {} is not HMAC-based",
                other
            ))),
        }
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, SigningError> {
        match self.algorithm {
            SigningAlgorithm::HS256 => hmac_verify::<Hmac<Sha256>>(&self.secret, message, signature),
            SigningAlgorithm::HS384 => hmac_verify::<Hmac<Sha384>>(&self.secret, message, signature),
            SigningAlgorithm::HS512 => hmac_verify::<Hmac<Sha512>>(&self.secret, message, signature),
            other => Err(SigningError::invalid_key(format!(
                "Algorithm {} is not HMAC-based",
                other
            ))),
        }
    }
}

// ============================================================================
// Signing Key Pair
// ============================================================================

/// An asymmetric key pair for RS256, RS384, or ES384.
pub struct SigningKeyPair {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (public key) for verification.
    decoding_key: DecodingKey,
}

impl SigningKeyPair {
    /// Generates a fresh key pair for `algorithm`: 2048-bit RSA for RS256
    /// and RS384, a P-384 key for ES384.
    ///
    /// # Errors
    /// Returns an error for an HMAC algorithm or if key generation fails.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, SigningError> {
        let (private_pem, public_pem) = match algorithm {
            SigningAlgorithm::RS256 | SigningAlgorithm::RS384 => {
                let key =
                    RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(key_generation_error)?;
                let public_pem = key
                    .to_public_key()
                    .to_public_key_pem(LineEnding::LF)
                    .map_err(key_generation_error)?;
                (
                    key.to_pkcs8_pem(LineEnding::LF)
                        .map_err(key_generation_error)?,
                    public_pem,
                )
            }
            SigningAlgorithm::ES384 => {
                let key = EcSecretKey::random(&mut OsRng);
                let public_pem = key
                    .public_key()
                    .to_public_key_pem(LineEnding::LF)
                    .map_err(key_generation_error)?;
                (
                    key.to_pkcs8_pem(LineEnding::LF)
                        .map_err(key_generation_error)?,
                    public_pem,
                )
            }
            hmac => {
                return Err(SigningError::invalid_key(format!(
                    "{hmac} signs with a shared secret, not a key pair"
                )));
            }
        };

        Self::from_pem(algorithm, &private_pem, &public_pem)
    }

    /// Loads a key pair from a PEM private key (PKCS#8, or PKCS#1 for RSA)
    /// and a PEM public key.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid or the algorithm is HMAC.
    pub fn from_pem(
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, SigningError> {
        let (encoding_key, decoding_key) = if algorithm.is_rsa() {
            let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
                .map_err(|e| SigningError::invalid_key(e.to_string()))?;
            let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
                .map_err(|e| SigningError::invalid_key(e.to_string()))?;
            (encoding_key, decoding_key)
        } else if algorithm.is_ec() {
            let encoding_key = EncodingKey::from_ec_pem(private_pem.as_bytes())
                .map_err(|e| SigningError::invalid_key(e.to_string()))?;
            let decoding_key = DecodingKey::from_ec_pem(public_pem.as_bytes())
                .map_err(|e| SigningError::invalid_key(e.to_string()))?;
            (encoding_key, decoding_key)
        } else {
            return Err(SigningError::invalid_key(format!(
                "Algorithm {} is not asymmetric",
                algorithm
            )));
        };

        Ok(Self {
            algorithm,
            encoding_key,
            decoding_key,
        })
    }
}

impl TokenSigner for SigningKeyPair {
    fn algorithm(&self) -> SigningAlgorithm {
        self.algorithm
    }

    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let encoded = crypto::sign(message, &self.encoding_key, self.algorithm.to_jwt_algorithm())
            .map_err(|e| SigningError::signing_failed(e.to_string()))?;
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|e| SigningError::signing_failed(e.to_string()))
    }

    fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, SigningError> {
        let encoded = URL_SAFE_NO_PAD.encode(signature);
        // A signature that does not parse is a mismatch, not a key error.
        Ok(crypto::verify(
            &encoded,
            message,
            &self.decoding_key,
            self.algorithm.to_jwt_algorithm(),
        )
        .unwrap_or(false))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"an-hmac-secret-that-is-at-least-32-bytes";

    #[test]
    fn test_hmac_sign_verify() {
        for alg in [
            SigningAlgorithm::HS256,
            SigningAlgorithm::HS384,
            SigningAlgorithm::HS512,
        ] {
            let signer = HmacSigner::new(alg, SECRET).unwrap();
            let signature = signer.sign(b"header.claims").unwrap();
            assert!(signer.verify(b"header.claims", &signature).unwrap());
            assert!(!signer.verify(b"header.claimz", &signature).unwrap());
        }
    }

    #[test]
    fn test_hmac_signature_lengths() {
        let sig = |alg| HmacSigner::new(alg, SECRET).unwrap().sign(b"m").unwrap();
        assert_eq!(sig(SigningAlgorithm::HS256).len(), 32);
        assert_eq!(sig(SigningAlgorithm::HS384).len(), 48);
        assert_eq!(sig(SigningAlgorithm::HS512).len(), 64);
    }

    #[test]
    fn test_hmac_rejects_truncated_signature() {
        let signer = HmacSigner::new(SigningAlgorithm::HS256, SECRET).unwrap();
        let signature = signer.sign(b"payload").unwrap();
        assert!(!signer.verify(b"payload", &signature[..16]).unwrap());
        assert!(!signer.verify(b"payload", &[]).unwrap());
    }

    #[test]
    fn test_hmac_different_secret_fails() {
        let a = HmacSigner::new(SigningAlgorithm::HS256, SECRET).unwrap();
        let b = HmacSigner::new(
            SigningAlgorithm::HS256,
            b"another-hmac-secret-that-is-32-bytes-long".to_vec(),
        )
        .unwrap();
        let signature = a.sign(b"payload").unwrap();
        assert!(!b.verify(b"payload", &signature).unwrap());
    }

    #[test]
    fn test_hmac_short_secret_rejected() {
        let err = HmacSigner::new(SigningAlgorithm::HS256, b"short".to_vec()).unwrap_err();
        assert!(matches!(err, SigningError::InvalidKey { .. }));
        assert!(err.to_string().contains("at least 32 bytes"));
    }

    #[test]
    fn test_hmac_rejects_asymmetric_algorithm() {
        assert!(HmacSigner::new(SigningAlgorithm::RS256, SECRET).is_err());
    }

    #[test]
    fn test_hmac_debug_redacts_secret() {
        let signer = HmacSigner::new(SigningAlgorithm::HS256, SECRET).unwrap();
        let debug = format!("{:?}", signer);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("at-least-32-bytes"));
    }

    #[test]
    fn test_rs256_sign_verify() {
        let key_pair = SigningKeyPair::generate(SigningAlgorithm::RS256).unwrap();
        assert_eq!(key_pair.algorithm(), SigningAlgorithm::RS256);

        let signature = key_pair.sign(b"header.claims").unwrap();
        assert!(key_pair.verify(b"header.claims", &signature).unwrap());
        assert!(!key_pair.verify(b"header.claims!", &signature).unwrap());
    }

    #[test]
    fn test_es384_sign_verify() {
        let key_pair = SigningKeyPair::generate(SigningAlgorithm::ES384).unwrap();
        assert_eq!(key_pair.algorithm(), SigningAlgorithm::ES384);

        let signature = key_pair.sign(b"header.claims").unwrap();
        assert!(key_pair.verify(b"header.claims", &signature).unwrap());

        let mut tampered = signature.clone();
        tampered[0] ^= 0x01;
        assert!(!key_pair.verify(b"header.claims", &tampered).unwrap());
    }

    #[test]
    fn test_generate_rejects_hmac_algorithm() {
        let result = SigningKeyPair::generate(SigningAlgorithm::HS384);
        assert!(matches!(result, Err(SigningError::InvalidKey { .. })));
    }

    #[test]
    fn test_from_pem_rejects_hmac_algorithm() {
        let result = SigningKeyPair::from_pem(SigningAlgorithm::HS256, "", "");
        assert!(matches!(result, Err(SigningError::InvalidKey { .. })));
    }

    #[test]
    fn test_signing_algorithm_properties() {
        assert!(SigningAlgorithm::HS256.is_hmac());
        assert!(!SigningAlgorithm::HS256.is_rsa());
        assert!(SigningAlgorithm::RS384.is_rsa());
        assert!(SigningAlgorithm::ES384.is_ec());
        assert!(!SigningAlgorithm::ES384.is_hmac());

        assert_eq!(SigningAlgorithm::HS512.as_str(), "HS512");
        assert_eq!(SigningAlgorithm::ES384.to_string(), "ES384");
    }

    #[test]
    fn test_signing_error_into_auth_error() {
        let err: AuthError = SigningError::signing_failed("boom").into();
        assert!(matches!(err, AuthError::Signing { .. }));

        let err: AuthError = SigningError::invalid_key("bad pem").into();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }
}
