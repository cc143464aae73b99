//! Token authentication configuration.
//!
//! Covers the signing key, token lifetimes, revocation behavior, and refresh
//! token rotation. Durations are written in humantime form (`"15m"`, `"30d"`).

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::token::{HmacSigner, MIN_HMAC_SECRET_LEN, SigningAlgorithm, SigningKeyPair, TokenSigner};

/// Longest accepted token lifetime (100 years). Keeps `iat + ttl` well
/// inside the range a timestamp can represent.
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Root token authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// access_token_ttl = "15m"
/// refresh_token_ttl = "30d"
///
/// [signing]
/// algorithm = "HS256"
/// secret = "change-me-to-at-least-32-bytes-of-entropy"
///
/// [revocation]
/// fail_open = false
///
/// [refresh]
/// rotation = "revoke_consumed"
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Signing key configuration.
    pub signing: SigningConfig,

    /// Access token lifetime.
    #[serde(with = "humantime_serde")]
    pub access_token_ttl: Duration,

    /// Refresh token lifetime. Must not be shorter than the access lifetime.
    #[serde(with = "humantime_serde")]
    pub refresh_token_ttl: Duration,

    /// Revocation lookup behavior.
    pub revocation: RevocationConfig,

    /// Refresh token handling.
    pub refresh: RefreshConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signing: SigningConfig::default(),
            access_token_ttl: Duration::from_secs(3600),
            refresh_token_ttl: Duration::from_secs(30 * 24 * 3600),
            revocation: RevocationConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Creates a default configuration signing with HS256 and `secret`.
    #[must_use]
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            signing: SigningConfig {
                algorithm: SigningAlgorithm::HS256,
                secret: Some(secret.into()),
                ..SigningConfig::default()
            },
            ..Self::default()
        }
    }

    /// Creates a default configuration signing with an asymmetric key pair.
    #[must_use]
    pub fn asymmetric(
        algorithm: SigningAlgorithm,
        private_key_pem: impl Into<String>,
        public_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            signing: SigningConfig {
                algorithm,
                secret: None,
                private_key_pem: Some(private_key_pem.into()),
                public_key_pem: Some(public_key_pem.into()),
            },
            ..Self::default()
        }
    }

    /// Sets the signing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: SigningAlgorithm) -> Self {
        self.signing.algorithm = algorithm;
        self
    }

    /// Sets the access token lifetime.
    #[must_use]
    pub fn with_access_token_ttl(mut self, ttl: Duration) -> Self {
        self.access_token_ttl = ttl;
        self
    }

    /// Sets the refresh token lifetime.
    #[must_use]
    pub fn with_refresh_token_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_token_ttl = ttl;
        self
    }

    /// Sets whether tokens are accepted when the revocation store fails.
    #[must_use]
    pub fn with_revocation_fail_open(mut self, fail_open: bool) -> Self {
        self.revocation.fail_open = fail_open;
        self
    }

    /// Sets the refresh token rotation policy.
    #[must_use]
    pub fn with_refresh_rotation(mut self, rotation: RefreshRotation) -> Self {
        self.refresh.rotation = rotation;
        self
    }

    /// Longest lifetime any issued token can have.
    #[must_use]
    pub fn max_token_lifetime(&self) -> Duration {
        self.access_token_ttl.max(self.refresh_token_ttl)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the key material for the configured
    /// algorithm is absent, and `ConfigError::InvalidValue` if:
    /// - The HMAC secret is shorter than 32 bytes
    /// - A token lifetime is zero or longer than [`MAX_TOKEN_TTL`]
    /// - The refresh lifetime is shorter than the access lifetime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing.algorithm.is_hmac() {
            let secret = self
                .signing
                .secret
                .as_deref()
                .ok_or_else(|| ConfigError::Missing("signing.secret".to_string()))?;

            if secret.len() < MIN_HMAC_SECRET_LEN {
                return Err(ConfigError::InvalidValue(format!(
                    "signing.secret must be at least {MIN_HMAC_SECRET_LEN} bytes for {}",
                    self.signing.algorithm
                )));
            }
        } else {
            if self.signing.private_key_pem.is_none() {
                return Err(ConfigError::Missing("signing.private_key_pem".to_string()));
            }
            if self.signing.public_key_pem.is_none() {
                return Err(ConfigError::Missing("signing.public_key_pem".to_string()));
            }
        }

        if self.access_token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_ttl must be > 0".to_string(),
            ));
        }

        if self.refresh_token_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "refresh_token_ttl must be > 0".to_string(),
            ));
        }

        for (name, ttl) in [
            ("access_token_ttl", self.access_token_ttl),
            ("refresh_token_ttl", self.refresh_token_ttl),
        ] {
            if ttl > MAX_TOKEN_TTL {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must not exceed 100 years"
                )));
            }
        }

        if self.refresh_token_ttl < self.access_token_ttl {
            return Err(ConfigError::InvalidValue(
                "refresh_token_ttl must not be shorter than access_token_ttl".to_string(),
            ));
        }

        Ok(())
    }

    /// Builds the signer described by [`SigningConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails or the key material is unusable.
    pub fn build_signer(&self) -> Result<Arc<dyn TokenSigner>, ConfigError> {
        self.validate()?;

        let algorithm = self.signing.algorithm;
        let signer: Arc<dyn TokenSigner> = match (
            self.signing.secret.as_deref(),
            self.signing.private_key_pem.as_deref(),
            self.signing.public_key_pem.as_deref(),
        ) {
            (Some(secret), _, _) if algorithm.is_hmac() => Arc::new(
                HmacSigner::new(algorithm, secret.as_bytes().to_vec())
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
            ),
            (_, Some(private_pem), Some(public_pem)) => Arc::new(
                SigningKeyPair::from_pem(algorithm, private_pem, public_pem)
                    .map_err(|e| ConfigError::InvalidValue(e.to_string()))?,
            ),
            _ => {
                return Err(ConfigError::Missing(format!(
                    "key material for {algorithm}"
                )));
            }
        };

        tracing::info!(algorithm = %algorithm, "Token signer configured");
        Ok(signer)
    }
}

/// Signing key configuration.
///
/// HMAC algorithms read `secret`; RSA and EC algorithms read the PEM pair.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SigningConfig {
    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Shared secret for HS256, HS384, and HS512.
    /// Prefer `TOKENGATE__SIGNING__SECRET` over a config file.
    pub secret: Option<String>,

    /// PEM-encoded private key for RS256, RS384, and ES384.
    pub private_key_pem: Option<String>,

    /// PEM-encoded public key for RS256, RS384, and ES384.
    pub public_key_pem: Option<String>,
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::HS256,
            secret: None,
            private_key_pem: None,
            public_key_pem: None,
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningConfig")
            .field("algorithm", &self.algorithm)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field(
                "private_key_pem",
                &self.private_key_pem.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_key_pem", &self.public_key_pem.is_some())
            .finish()
    }
}

/// Revocation lookup behavior.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RevocationConfig {
    /// Accept tokens when the revocation store cannot be reached.
    /// Off by default: a store outage rejects every token.
    pub fail_open: bool,
}

/// Refresh token handling.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// What happens to a refresh token once it has been exchanged.
    pub rotation: RefreshRotation,
}

/// Refresh token rotation policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshRotation {
    /// The refresh token stays usable until it expires; refresh returns only
    /// a new access token.
    #[default]
    #[serde(rename = "none")]
    Disabled,

    /// The consumed refresh token is revoked and a new one is issued.
    RevokeConsumed,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl From<ConfigError> for AuthError {
    fn from(err: ConfigError) -> Self {
        AuthError::configuration(err.to_string())
    }
}

pub mod loader {
    //! Loads [`AuthConfig`] from a TOML file plus environment overrides.

    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::{AuthConfig, ConfigError};

    /// Default config file looked up when no path is given.
    pub const DEFAULT_CONFIG_FILE: &str = "tokengate.toml";

    /// Environment variable prefix, e.g. `TOKENGATE__SIGNING__SECRET`.
    pub const ENV_PREFIX: &str = "TOKENGATE";

    /// Merges the config file (if present) with `TOKENGATE__*` variables and
    /// validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Load` if a source cannot be read or
    /// deserialized, or the validation error.
    pub fn load_config(path: Option<&str>) -> Result<AuthConfig, ConfigError> {
        let mut builder = Config::builder();

        let file = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if file.exists() {
            builder = builder.add_source(File::from(file));
        } else if path.is_some() {
            tracing::warn!(path = %file.display(), "Config file not found, using defaults");
        }

        // Environment variable overrides, e.g., TOKENGATE__ACCESS_TOKEN_TTL=15m
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );

        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: AuthConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;

        merged.validate()?;
        Ok(merged)
    }
}
