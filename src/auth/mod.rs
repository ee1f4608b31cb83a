//! Authorization for GitHub API requests.
//!
//! The client only attaches the header an [`AuthorizationProvider`] hands
//! back. Token refresh and JWT signing live outside this crate.

use crate::errors::GitHubResult;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// Authentication method for GitHub API.
#[derive(Debug, Clone, Default)]
pub enum AuthMethod {
    /// No credentials; requests are sent anonymously.
    #[default]
    Anonymous,
    /// OAuth token, optionally paired with the login it belongs to.
    OAuth {
        /// Access token.
        token: SecretString,
        /// Login of the token owner.
        login: Option<String>,
    },
    /// Personal Access Token (classic or fine-grained).
    Pat(SecretString),
    /// Pre-signed GitHub App JWT.
    Jwt(SecretString),
    /// GitHub App installation token.
    AppInstallation(SecretString),
}

impl AuthMethod {
    /// Creates an OAuth authentication method.
    pub fn oauth(token: impl Into<String>, login: Option<String>) -> Self {
        Self::OAuth {
            token: SecretString::new(token.into()),
            login,
        }
    }

    /// Creates a PAT authentication method.
    pub fn pat(token: impl Into<String>) -> Self {
        Self::Pat(SecretString::new(token.into()))
    }

    /// Creates a JWT authentication method.
    pub fn jwt(token: impl Into<String>) -> Self {
        Self::Jwt(SecretString::new(token.into()))
    }

    /// Creates an installation token authentication method.
    pub fn app_installation(token: impl Into<String>) -> Self {
        Self::AppInstallation(SecretString::new(token.into()))
    }

    /// Returns true when no credentials are configured.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Encodes the `Authorization` header value.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::Anonymous => None,
            Self::OAuth { token, .. } => Some(format!("token {}", token.expose_secret())),
            Self::AppInstallation(token) => Some(format!("token {}", token.expose_secret())),
            Self::Pat(token) | Self::Jwt(token) => {
                Some(format!("Bearer {}", token.expose_secret()))
            }
        }
    }

    /// Gets the token prefix for logging.
    pub fn token_prefix(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Pat(t) => {
                let exposed = t.expose_secret();
                if exposed.starts_with("ghp_") {
                    "ghp_***"
                } else if exposed.starts_with("github_pat_") {
                    "github_pat_***"
                } else {
                    "***"
                }
            }
            Self::OAuth { .. } => "gho_***",
            Self::AppInstallation(_) => "ghs_***",
            Self::Jwt(_) => "jwt",
        }
    }
}

/// Supplies the `Authorization` header for each dispatch.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    /// Returns the encoded header value, or `None` for anonymous access.
    async fn authorization(&self) -> GitHubResult<Option<String>>;
}

/// Provider backed by a fixed [`AuthMethod`].
#[derive(Debug, Clone)]
pub struct StaticAuthorizationProvider {
    method: AuthMethod,
}

impl StaticAuthorizationProvider {
    /// Creates a new static provider.
    pub fn new(method: AuthMethod) -> Self {
        Self { method }
    }

    /// Gets the authentication method.
    pub fn method(&self) -> &AuthMethod {
        &self.method
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorizationProvider {
    async fn authorization(&self) -> GitHubResult<Option<String>> {
        Ok(self.method.header_value())
    }
}
