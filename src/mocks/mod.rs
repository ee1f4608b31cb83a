//! Mock transport for testing code built on the GitHub client.
//!
//! [`MockTransport`] answers requests from canned [`MockResponse`]s keyed by
//! method and path, and records everything it was sent.

use crate::errors::RateLimitInfo;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
    /// Headers.
    pub headers: HashMap<String, String>,
    /// Delay before responding.
    pub delay: Option<std::time::Duration>,
}

impl MockResponse {
    fn json<T: Serialize>(status: u16, body: T) -> Self {
        Self {
            status,
            body: serde_json::to_string(&body).unwrap_or_default(),
            headers: HashMap::new(),
            delay: None,
        }
    }

    /// Creates a 200 response with the given body.
    pub fn ok<T: Serialize>(body: T) -> Self {
        Self::json(200, body)
    }

    /// Creates a 201 Created response.
    pub fn created<T: Serialize>(body: T) -> Self {
        Self::json(201, body)
    }

    /// Creates a 204 No Content response.
    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: String::new(),
            headers: HashMap::new(),
            delay: None,
        }
    }

    /// Creates a response with an arbitrary status and GitHub error body.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(
            status,
            serde_json::json!({
                "message": message,
                "documentation_url": "https://docs.github.com/rest"
            }),
        )
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    /// Creates a 401 Unauthorized response.
    pub fn unauthorized() -> Self {
        Self::error(401, "Bad credentials")
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden(message: &str) -> Self {
        Self::error(403, message)
    }

    /// Creates a 422 Validation Failed response.
    pub fn validation_failed(message: &str) -> Self {
        Self::error(422, message)
    }

    /// Creates a 403 response with an exhausted primary rate limit.
    pub fn rate_limited(reset_at: i64) -> Self {
        Self::error(403, "API rate limit exceeded")
            .with_header("x-ratelimit-limit", "5000")
            .with_header("x-ratelimit-remaining", "0")
            .with_header("x-ratelimit-reset", &reset_at.to_string())
    }

    /// Creates a 500 response.
    pub fn server_error(message: &str) -> Self {
        Self::error(500, message)
    }

    /// Adds a delay to the response.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Adds a header to the response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    /// Adds rate limit headers.
    pub fn with_rate_limit(self, info: &RateLimitInfo) -> Self {
        let mut response = self
            .with_header("x-ratelimit-limit", &info.limit.to_string())
            .with_header("x-ratelimit-remaining", &info.remaining.to_string())
            .with_header("x-ratelimit-reset", &info.reset_at.timestamp().to_string());
        if let Some(ref resource) = info.resource {
            response = response.with_header("x-ratelimit-resource", resource);
        }
        response
    }

    /// Adds a `Link` header pointing at the next page.
    pub fn with_next_link(self, url: &str) -> Self {
        self.with_header("link", &format!("<{}>; rel=\"next\"", url))
    }

    fn to_http_response(&self) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        HttpResponse::new(status, headers, Bytes::from(self.body.clone()))
    }
}

/// A request the mock transport received.
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Request body.
    pub body: Option<Bytes>,
}

impl MockRequest {
    /// Gets the URL path.
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Gets a header value as text.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    /// Gets the first query parameter called `name`.
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    /// Parses the body as JSON.
    pub fn json_body(&self) -> Option<Value> {
        self.body
            .as_ref()
            .and_then(|b| serde_json::from_slice(b).ok())
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<String, Vec<MockResponse>>,
    requests: Vec<MockRequest>,
}

/// In-memory [`HttpTransport`].
///
/// Responses registered for the same route are served in order; the last
/// one keeps being served once the others are used up. Routes registered
/// with a query string only match requests carrying exactly that query.
/// Unmatched requests get a 404.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Creates an empty mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test must not hide the recorded requests from others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registers a response for `method` and `path`.
    pub fn on(&self, method: Method, path: &str, response: MockResponse) {
        let key = format!("{} {}", method, path);
        self.state().responses.entry(key).or_default().push(response);
    }

    /// Gets all recorded requests.
    pub fn requests(&self) -> Vec<MockRequest> {
        self.state().requests.clone()
    }

    /// Gets the most recent request.
    pub fn last_request(&self) -> Option<MockRequest> {
        self.state().requests.last().cloned()
    }

    /// Gets the number of requests sent.
    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Returns true if a request with `method` and `path` was sent.
    pub fn verify_request(&self, method: Method, path: &str) -> bool {
        self.state()
            .requests
            .iter()
            .any(|r| r.method == method && r.path() == path)
    }

    /// Clears recorded requests and registered responses.
    pub fn reset(&self) {
        let mut state = self.state();
        state.requests.clear();
        state.responses.clear();
    }

    fn next_response(&self, request: &HttpRequest) -> Option<MockResponse> {
        let mut state = self.state();
        let path = request.url.path();
        let mut keys = Vec::with_capacity(2);
        if let Some(query) = request.url.query() {
            keys.push(format!("{} {}?{}", request.method, path, query));
        }
        keys.push(format!("{} {}", request.method, path));

        for key in keys {
            if let Some(queue) = state.responses.get_mut(&key) {
                if queue.len() > 1 {
                    return Some(queue.remove(0));
                }
                if let Some(last) = queue.first() {
                    return Some(last.clone());
                }
            }
        }
        None
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self.next_response(&request).unwrap_or_else(|| {
            MockResponse::not_found(&format!(
                "No mock response for {} {}",
                request.method,
                request.url.path()
            ))
        });

        self.state().requests.push(MockRequest {
            method: request.method,
            url: request.url,
            headers: request.headers,
            body: request.body,
        });

        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(response.to_http_response())
    }
}

/// JSON payloads shaped like GitHub responses.
pub mod fixtures {
    use serde_json::{json, Value};

    const API: &str = "https://api.github.com";

    /// A user.
    pub fn user(login: &str) -> Value {
        json!({
            "id": 1,
            "login": login,
            "node_id": "MDQ6VXNlcjE=",
            "type": "User",
            "url": format!("{}/users/{}", API, login),
            "html_url": format!("https://github.com/{}", login)
        })
    }

    /// A repository.
    pub fn repository(owner: &str, name: &str) -> Value {
        json!({
            "id": 1296269,
            "node_id": "MDEwOlJlcG9zaXRvcnkxMjk2MjY5",
            "name": name,
            "full_name": format!("{}/{}", owner, name),
            "owner": user(owner),
            "private": false,
            "description": "A test repository",
            "fork": false,
            "archived": false,
            "is_template": false,
            "default_branch": "main",
            "visibility": "public",
            "has_issues": true,
            "has_wiki": true,
            "url": format!("{}/repos/{}/{}", API, owner, name),
            "html_url": format!("https://github.com/{}/{}", owner, name)
        })
    }

    /// A pull request as returned by the pulls endpoints.
    pub fn pull_request(owner: &str, repo: &str, number: u64) -> Value {
        json!({
            "id": number,
            "node_id": format!("PR_kwDO{}", number),
            "number": number,
            "title": format!("Test PR #{}", number),
            "body": "This is a test pull request",
            "state": "open",
            "draft": false,
            "merged": false,
            "mergeable": true,
            "mergeable_state": "clean",
            "merge_commit_sha": "e5bd3914e2e596debea16f433f57875b5b90bcd6",
            "changed_files": 2,
            "user": user("testuser"),
            "head": { "ref": format!("feature-{}", number), "sha": "abc123", "label": "testuser:feature" },
            "base": { "ref": "main", "sha": "def456", "label": format!("{}:main", owner) },
            "url": format!("{}/repos/{}/{}/pulls/{}", API, owner, repo, number),
            "html_url": format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
            "issue_url": format!("{}/repos/{}/{}/issues/{}", API, owner, repo, number)
        })
    }

    /// A pull request as returned by issue search.
    pub fn search_pull_request(owner: &str, repo: &str, number: u64) -> Value {
        json!({
            "id": number,
            "node_id": format!("PR_kwDO{}", number),
            "number": number,
            "title": format!("Test PR #{}", number),
            "state": "open",
            "user": user("testuser"),
            "repository_url": format!("{}/repos/{}/{}", API, owner, repo),
            "url": format!("{}/repos/{}/{}/issues/{}", API, owner, repo, number),
            "html_url": format!("https://github.com/{}/{}/pull/{}", owner, repo, number),
            "pull_request": {
                "url": format!("{}/repos/{}/{}/pulls/{}", API, owner, repo, number)
            }
        })
    }

    /// A search envelope around `items`.
    pub fn search_results(items: Vec<Value>, total_count: u64) -> Value {
        json!({
            "total_count": total_count,
            "incomplete_results": false,
            "items": items
        })
    }

    /// An issue.
    pub fn issue(owner: &str, repo: &str, number: u64) -> Value {
        json!({
            "id": number,
            "number": number,
            "title": format!("Test issue #{}", number),
            "body": "This is a test issue",
            "state": "open",
            "user": user("testuser"),
            "url": format!("{}/repos/{}/{}/issues/{}", API, owner, repo, number),
            "html_url": format!("https://github.com/{}/{}/issues/{}", owner, repo, number)
        })
    }

    /// An issue comment.
    pub fn issue_comment(owner: &str, repo: &str, id: u64, body: &str) -> Value {
        json!({
            "id": id,
            "body": body,
            "user": user("testuser"),
            "url": format!("{}/repos/{}/{}/issues/comments/{}", API, owner, repo, id),
            "html_url": format!("https://github.com/{}/{}/issues/1#issuecomment-{}", owner, repo, id)
        })
    }

    /// A pull request review.
    pub fn review(owner: &str, repo: &str, number: u64, id: u64, state: &str) -> Value {
        json!({
            "id": id,
            "node_id": format!("PRR_kwDO{}", id),
            "body": "Looks good",
            "state": state,
            "commit_id": "abc123",
            "user": user("reviewer"),
            "pull_request_url": format!("{}/repos/{}/{}/pulls/{}", API, owner, repo, number),
            "html_url": format!("https://github.com/{}/{}/pull/{}#pullrequestreview-{}", owner, repo, number, id)
        })
    }

    /// A team.
    pub fn team(org: &str, slug: &str) -> Value {
        json!({
            "id": 42,
            "node_id": "MDQ6VGVhbTQy",
            "name": slug,
            "slug": slug,
            "description": "A test team",
            "privacy": "closed",
            "permission": "pull",
            "url": format!("{}/organizations/1/team/42", API),
            "html_url": format!("https://github.com/orgs/{}/teams/{}", org, slug)
        })
    }

    /// A team discussion.
    pub fn discussion(team_url: &str, number: u64, title: &str) -> Value {
        json!({
            "number": number,
            "node_id": format!("D_kwDO{}", number),
            "title": title,
            "body": "Discussion body",
            "private": false,
            "pinned": false,
            "author": user("testuser"),
            "url": format!("{}/discussions/{}", team_url, number),
            "html_url": format!("https://github.com/orgs/o/teams/t/discussions/{}", number)
        })
    }

    /// A gist with one file.
    pub fn gist(id: &str) -> Value {
        json!({
            "id": id,
            "description": "Test gist",
            "public": true,
            "files": {
                "hello.rs": {
                    "filename": "hello.rs",
                    "language": "Rust",
                    "size": 42,
                    "content": "fn main() {}"
                }
            },
            "owner": user("testuser"),
            "url": format!("{}/gists/{}", API, id),
            "html_url": format!("https://gist.github.com/{}", id)
        })
    }

    /// An installation access token.
    pub fn installation_token(token: &str) -> Value {
        json!({
            "token": token,
            "expires_at": "2030-01-01T00:00:00Z",
            "permissions": { "contents": "read", "issues": "write" },
            "repository_selection": "selected"
        })
    }
}
