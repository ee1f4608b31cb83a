//! GitHub API client implementation.

use crate::auth::{AuthMethod, AuthorizationProvider, StaticAuthorizationProvider};
use crate::config::{GitHubConfig, GitHubConfigBuilder};
use crate::errors::{GitHubError, GitHubResult, RateLimitInfo};
use crate::observability::TracingHooks;
use crate::pagination::{ListResponse, PagedIterable};
use crate::request::GitHubRequest;
use crate::requester::Requester;
use crate::resilience::{
    extract_rate_limit, NoopRateLimitHandler, RateLimitHandler, RateLimitTracker, RetryExecutor,
    RetryingTransport,
};
use crate::resources::{
    CreateRepositoryBuilder, CreateTokenBuilder, GistHandle, PullRequestHandle, RepositoryHandle,
    Resource, TeamBuilder, TeamHandle,
};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::types::{Gist, PullRequest, Repository, Team};
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Instant;

/// Media type GitHub recommends for REST calls.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Header carrying the requested API version.
pub const API_VERSION_HEADER: &str = "x-github-api-version";

/// GitHub error response format.
#[derive(Debug, serde::Deserialize)]
struct GitHubErrorResponse {
    message: Option<String>,
    documentation_url: Option<String>,
}

struct ClientInner {
    config: GitHubConfig,
    transport: Arc<dyn HttpTransport>,
    authorization: Arc<dyn AuthorizationProvider>,
    rate_limit: Arc<dyn RateLimitHandler>,
}

/// GitHub API client.
///
/// Cloning is cheap; every clone shares the same transport and
/// collaborators.
#[derive(Clone)]
pub struct GitHubClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.inner.config.base_url)
            .field("auth", &self.inner.config.auth.token_prefix())
            .finish()
    }
}

impl GitHubClient {
    /// Creates a new GitHub client with the default transport.
    pub fn new(config: GitHubConfig) -> GitHubResult<Self> {
        GitHubClientBuilder::new().config(config).build()
    }

    /// Creates a new client builder.
    pub fn builder() -> GitHubClientBuilder {
        GitHubClientBuilder::new()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &GitHubConfig {
        &self.inner.config
    }

    /// Gets the API root URL.
    pub fn api_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Starts a new request against this client.
    pub fn create_request(&self) -> Requester {
        Requester::new(self.clone())
    }

    /// Starts a GraphQL request carrying `query`.
    pub fn create_graphql_request(&self, query: impl Into<String>) -> Requester {
        self.create_request()
            .method(Method::POST)
            .with_url_path("/graphql")
            .with("query", query.into())
    }

    /// Sends `request` once and fails on any non-2xx answer.
    pub async fn dispatch(&self, request: &GitHubRequest) -> GitHubResult<HttpResponse> {
        let response = self.execute(request).await?;
        if response.status.is_success() {
            Ok(response)
        } else {
            let error = error_from_response(&response);
            TracingHooks::on_request_error(
                request.method().as_str(),
                request.url_path().unwrap_or_default(),
                &error,
            );
            Err(error)
        }
    }

    /// Sends `request` once and hands back whatever status the server chose.
    pub(crate) async fn execute(&self, request: &GitHubRequest) -> GitHubResult<HttpResponse> {
        let http_request = self.to_http_request(request).await?;
        let method = http_request.method.clone();
        let url = http_request.url.to_string();

        self.inner.rate_limit.before_request().await;

        TracingHooks::on_request_start(method.as_str(), &url, &http_request.headers);
        let start = Instant::now();

        let response = match self.inner.transport.send(http_request).await {
            Ok(response) => response,
            Err(e) => {
                let error = GitHubError::from(e);
                TracingHooks::on_request_error(method.as_str(), &url, &error);
                return Err(error);
            }
        };

        TracingHooks::on_request_complete(
            method.as_str(),
            &url,
            response.status.as_u16(),
            start.elapsed(),
        );

        if let Some(info) = extract_rate_limit(&response.headers) {
            TracingHooks::on_rate_limit_update(&info);
            self.inner.rate_limit.on_response(&info).await;
        }

        Ok(response)
    }

    async fn to_http_request(&self, request: &GitHubRequest) -> GitHubResult<HttpRequest> {
        let url = request.url()?;
        let body = request.body()?;
        let config = &self.inner.config;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_MEDIA_TYPE));
        headers.insert(USER_AGENT, header_value(&config.user_agent)?);
        headers.insert(
            HeaderName::from_static(API_VERSION_HEADER),
            header_value(&config.api_version)?,
        );

        if let Some(auth) = self.inner.authorization.authorization().await? {
            let mut value = header_value(&auth)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        if let Some(ref body) = body {
            headers.insert(CONTENT_TYPE, header_value(&body.content_type)?);
        }

        for (name, value) in request.headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                GitHubError::invalid_parameter(format!("Invalid header name {}: {}", name, e))
            })?;
            headers.insert(name, header_value(value)?);
        }

        Ok(HttpRequest {
            method: request.method().clone(),
            url,
            headers,
            body: body.map(|b| b.bytes),
        })
    }

    // Entry points

    /// Fetches a repository.
    pub async fn repository(&self, owner: &str, name: &str) -> GitHubResult<RepositoryHandle> {
        let record: Repository = self
            .create_request()
            .with_url_path_segments("/repos", [owner, name])
            .fetch()
            .await?;
        Ok(RepositoryHandle::attach(record, self))
    }

    /// Starts creating a repository owned by the authenticated user.
    pub fn create_repository(&self, name: &str) -> CreateRepositoryBuilder {
        CreateRepositoryBuilder::new(self, "/user/repos", name)
    }

    /// Starts creating a repository owned by `org`.
    pub fn create_organization_repository(&self, org: &str, name: &str) -> CreateRepositoryBuilder {
        let path = format!("/orgs/{}/repos", crate::request::encode_path_segment(org));
        CreateRepositoryBuilder::new(self, &path, name)
    }

    /// Fetches a team by organization and slug.
    pub async fn team(&self, org: &str, slug: &str) -> GitHubResult<TeamHandle> {
        let record: Team = self
            .create_request()
            .with_url_path_segments("/orgs", [org, "teams", slug])
            .fetch()
            .await?;
        Ok(TeamHandle::attach(record, self))
    }

    /// Starts creating a team in `org`.
    pub fn create_team(&self, org: &str, name: &str) -> TeamBuilder {
        TeamBuilder::new(self, org, name)
    }

    /// Fetches a gist.
    pub async fn gist(&self, id: &str) -> GitHubResult<GistHandle> {
        let record: Gist = self
            .create_request()
            .with_url_path_segments("/gists", [id])
            .fetch()
            .await?;
        Ok(GistHandle::attach(record, self))
    }

    /// Starts creating an access token for an app installation.
    pub fn create_installation_token(&self, installation_id: u64) -> CreateTokenBuilder {
        CreateTokenBuilder::new(self, installation_id)
    }

    /// Searches pull requests; `is:pr` is appended to the query.
    ///
    /// Search results carry a partial payload, so the merge details of each
    /// handle are fetched on first use.
    pub fn search_pull_requests(
        &self,
        query: &str,
    ) -> PagedIterable<ListResponse<PullRequest>, PullRequestHandle> {
        let client = self.clone();
        self.create_request()
            .with_url_path("/search/issues")
            .with("q", format!("{} is:pr", query.trim()))
            .to_search_iterable(move |record| PullRequestHandle::from_search(record, &client))
    }
}

fn header_value(value: &str) -> GitHubResult<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| {
        GitHubError::invalid_parameter(format!("Invalid header value: {}", e))
    })
}

/// Maps a non-2xx response onto a [`GitHubError`].
pub(crate) fn error_from_response(response: &HttpResponse) -> GitHubError {
    let status = response.status;
    let request_id = response
        .headers
        .get("x-github-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let rate_limit: Option<RateLimitInfo> = extract_rate_limit(&response.headers);
    let raw_body = String::from_utf8_lossy(&response.body).into_owned();

    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        if let Some(info) = rate_limit.as_ref().filter(|info| info.remaining == 0) {
            TracingHooks::on_rate_limit_exceeded(info);
            let mut error = GitHubError::rate_limit_exceeded(status.as_u16(), info.clone())
                .with_response_body(raw_body);
            if let Some(id) = request_id {
                error = error.with_request_id(id);
            }
            return error;
        }
    }

    let parsed = serde_json::from_slice::<GitHubErrorResponse>(&response.body).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {} error", status.as_u16()));
    let documentation_url = parsed.and_then(|e| e.documentation_url);

    let mut error =
        GitHubError::from_response(status.as_u16(), message, documentation_url, request_id)
            .with_response_body(raw_body);

    if let Some(info) = rate_limit {
        error = error.with_rate_limit(info);
    }

    error
}

/// Builder for GitHubClient.
pub struct GitHubClientBuilder {
    config: Option<GitHubConfig>,
    config_builder: GitHubConfigBuilder,
    transport: Option<Arc<dyn HttpTransport>>,
    authorization: Option<Arc<dyn AuthorizationProvider>>,
    rate_limit: Option<Arc<dyn RateLimitHandler>>,
}

impl GitHubClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            config_builder: GitHubConfig::builder(),
            transport: None,
            authorization: None,
            rate_limit: None,
        }
    }

    /// Uses a complete configuration, ignoring individual settings.
    pub fn config(mut self, config: GitHubConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the authentication method.
    pub fn auth(mut self, auth: AuthMethod) -> Self {
        self.config_builder = self.config_builder.auth(auth);
        self
    }

    /// Sets a personal access token.
    pub fn pat(self, token: impl Into<String>) -> Self {
        self.auth(AuthMethod::pat(token))
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Disables retries.
    pub fn no_retry(mut self) -> Self {
        self.config_builder = self.config_builder.no_retry();
        self
    }

    /// Replaces the HTTP transport.
    pub fn transport(mut self, transport: impl HttpTransport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replaces the authorization provider.
    pub fn authorization_provider(mut self, provider: impl AuthorizationProvider + 'static) -> Self {
        self.authorization = Some(Arc::new(provider));
        self
    }

    /// Replaces the rate-limit handler.
    pub fn rate_limit_handler(mut self, handler: impl RateLimitHandler + 'static) -> Self {
        self.rate_limit = Some(Arc::new(handler));
        self
    }

    /// Builds the client.
    pub fn build(self) -> GitHubResult<GitHubClient> {
        let config = match self.config {
            Some(config) => {
                config.validate()?;
                config
            }
            None => self.config_builder.build()?,
        };

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => {
                let reqwest = ReqwestTransport::from_config(&config)?;
                if config.retry.enabled {
                    Arc::new(RetryingTransport::new(
                        reqwest,
                        RetryExecutor::from_config(&config.retry),
                    ))
                } else {
                    Arc::new(reqwest)
                }
            }
        };

        let authorization = self
            .authorization
            .unwrap_or_else(|| Arc::new(StaticAuthorizationProvider::new(config.auth.clone())));

        let rate_limit: Arc<dyn RateLimitHandler> = match self.rate_limit {
            Some(handler) => handler,
            None if config.rate_limit.enabled => Arc::new(RateLimitTracker::new(&config.rate_limit)),
            None => Arc::new(NoopRateLimitHandler),
        };

        Ok(GitHubClient {
            inner: Arc::new(ClientInner {
                config,
                transport,
                authorization,
                rate_limit,
            }),
        })
    }
}

impl Default for GitHubClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
