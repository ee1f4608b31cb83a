//! Configuration types for the GitHub client.

use crate::auth::AuthMethod;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default GitHub API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default GitHub API version (date-based).
pub const DEFAULT_API_VERSION: &str = "2022-11-28";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "integrations-github-rest/0.1.0";

/// Prefix of environment variables understood by [`GitHubConfig::from_env`].
pub const ENV_PREFIX: &str = "GITHUB_";

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum retry attempts.
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub initial_backoff: Duration,
    /// Maximum backoff delay.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0).
    pub jitter: f64,
    /// Enable retries.
    pub enabled: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.1,
            enabled: true,
        }
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Buffer percentage to keep before throttling (0.0 to 1.0).
    pub buffer_percentage: f64,
    /// Wait for the reset time once the remaining quota is exhausted.
    pub wait_on_exhaustion: bool,
    /// Upper bound for a single rate-limit wait.
    pub max_wait: Duration,
    /// Enable rate limit tracking.
    pub enabled: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            buffer_percentage: 0.1,
            wait_on_exhaustion: true,
            max_wait: Duration::from_secs(60 * 60),
            enabled: true,
        }
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// GitHub client configuration.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
    /// Authentication method.
    pub auth: AuthMethod,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// Rate limit configuration.
    pub rate_limit: RateLimitConfig,
    /// Connection pool configuration.
    pub pool: PoolConfig,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth: AuthMethod::Anonymous,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pool: PoolConfig::default(),
        }
    }
}

impl GitHubConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GitHubConfigBuilder {
        GitHubConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), GitHubError> {
        if self.base_url.is_empty() {
            return Err(GitHubError::new(
                GitHubErrorKind::InvalidBaseUrl,
                "Base URL cannot be empty",
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(GitHubError::new(
                GitHubErrorKind::InvalidBaseUrl,
                "Base URL must start with http:// or https://",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(GitHubError::configuration("User-Agent is required by GitHub API"));
        }

        Ok(())
    }

    /// Builds a configuration from a property map.
    ///
    /// Recognized keys are `oauth`, `login`, `jwt` and `endpoint`. An
    /// `oauth` token wins over a `jwt`; without either the client is
    /// anonymous.
    pub fn from_properties(props: &HashMap<String, String>) -> GitHubResult<Self> {
        let mut builder = GitHubConfigBuilder::new();

        if let Some(endpoint) = props.get("endpoint") {
            builder = builder.base_url(endpoint.clone());
        }

        let login = props.get("login").cloned();
        if let Some(token) = props.get("oauth") {
            builder = builder.auth(AuthMethod::oauth(token.clone(), login));
        } else if let Some(jwt) = props.get("jwt") {
            builder = builder.auth(AuthMethod::jwt(jwt.clone()));
        }

        builder.build()
    }

    /// Builds a configuration from `GITHUB_*` environment variables.
    pub fn from_env() -> GitHubResult<Self> {
        Self::from_properties(&env_properties(std::env::vars()))
    }

    /// Builds a configuration from a `key=value` property file.
    pub fn from_property_file(path: impl AsRef<Path>) -> GitHubResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GitHubError::configuration(format!(
                "Failed to read property file {}: {}",
                path.display(),
                e
            ))
            .with_cause(e)
        })?;
        Self::from_properties(&parse_properties(&contents))
    }

    /// Resolves credentials from the environment, then from `~/.github`.
    ///
    /// Fails with [`GitHubErrorKind::MissingAuth`] when neither source yields
    /// credentials.
    pub fn from_credentials() -> GitHubResult<Self> {
        let config = Self::from_env()?;
        if !config.auth.is_anonymous() {
            return Ok(config);
        }

        if let Some(path) = home_property_file() {
            if path.is_file() {
                let config = Self::from_property_file(&path)?;
                if !config.auth.is_anonymous() {
                    return Ok(config);
                }
            }
        }

        Err(GitHubError::new(
            GitHubErrorKind::MissingAuth,
            "No GitHub credentials found in the environment or ~/.github",
        ))
    }
}

/// Collects `GITHUB_*` variables, prefix stripped and lower-cased.
pub(crate) fn env_properties(
    vars: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    vars.into_iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(ENV_PREFIX)
                .map(|name| (name.to_ascii_lowercase(), value))
        })
        .collect()
}

/// Parses `key=value` lines; `#` and `!` start comment lines.
pub(crate) fn parse_properties(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=').or_else(|| line.split_once(':'))?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn home_property_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".github"))
}

/// Builder for GitHubConfig.
#[derive(Debug, Default)]
pub struct GitHubConfigBuilder {
    base_url: Option<String>,
    api_version: Option<String>,
    auth: Option<AuthMethod>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    retry: Option<RetryConfig>,
    rate_limit: Option<RateLimitConfig>,
    pool: Option<PoolConfig>,
}

impl GitHubConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the API version.
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the retry configuration.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.retry = Some(RetryConfig {
            enabled: false,
            ..Default::default()
        });
        self
    }

    /// Sets the rate limit configuration.
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, config: PoolConfig) -> Self {
        self.pool = Some(config);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> Result<GitHubConfig, GitHubError> {
        let config = GitHubConfig {
            base_url: self
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_version: self.api_version.unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            auth: self.auth.unwrap_or_default(),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            retry: self.retry.unwrap_or_default(),
            rate_limit: self.rate_limit.unwrap_or_default(),
            pool: self.pool.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCategory;

    #[test]
    fn test_default_config() {
        let config = GitHubConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(config.auth.is_anonymous());
    }

    #[test]
    fn test_config_builder() {
        let config = GitHubConfig::builder()
            .base_url("https://github.example.com/api/v3/")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://github.example.com/api/v3");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_base_url() {
        let err = GitHubConfig::builder().base_url("invalid-url").build().unwrap_err();
        assert_eq!(*err.kind(), GitHubErrorKind::InvalidBaseUrl);
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        assert!(GitHubConfig::builder().user_agent("").build().is_err());
    }

    #[test]
    fn test_from_properties_prefers_oauth() {
        let props: HashMap<String, String> = [
            ("oauth", "gho_abc"),
            ("jwt", "eyJ"),
            ("login", "octocat"),
            ("endpoint", "https://ghe.example.com/api/v3"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = GitHubConfig::from_properties(&props).unwrap();
        assert_eq!(config.base_url, "https://ghe.example.com/api/v3");
        assert!(matches!(config.auth, AuthMethod::OAuth { ref login, .. } if login.as_deref() == Some("octocat")));
    }

    #[test]
    fn test_from_properties_jwt() {
        let props: HashMap<String, String> =
            [("jwt".to_string(), "eyJ".to_string())].into_iter().collect();
        let config = GitHubConfig::from_properties(&props).unwrap();
        assert!(matches!(config.auth, AuthMethod::Jwt(_)));
    }

    #[test]
    fn test_env_properties_strip_prefix() {
        let vars = vec![
            ("GITHUB_OAUTH".to_string(), "gho_abc".to_string()),
            ("GITHUB_ENDPOINT".to_string(), "https://x.test".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let props = env_properties(vars);
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("oauth").map(String::as_str), Some("gho_abc"));
        assert_eq!(props.get("endpoint").map(String::as_str), Some("https://x.test"));
    }

    #[test]
    fn test_parse_properties_skips_comments() {
        let props = parse_properties("# comment\n! other\n\noauth = gho_abc\nlogin=octocat\n");
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("oauth").map(String::as_str), Some("gho_abc"));
        assert_eq!(props.get("login").map(String::as_str), Some("octocat"));
    }

    #[test]
    fn test_missing_property_file() {
        let err = GitHubConfig::from_property_file("/nonexistent/.github").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }
}
