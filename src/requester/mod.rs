//! Per-operation request accumulator.
//!
//! A [`Requester`] gathers method, path and parameters, then performs
//! exactly one dispatch through its terminal call. Every terminal consumes
//! the requester.

use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use crate::pagination::{ListResponse, PagedIterable};
use crate::request::{GitHubRequest, GitHubRequestBuilder};
use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Builds and dispatches one request.
#[derive(Debug, Clone)]
pub struct Requester {
    client: GitHubClient,
    builder: GitHubRequestBuilder,
}

impl Requester {
    pub(crate) fn new(client: GitHubClient) -> Self {
        let builder = GitHubRequest::builder(client.api_url());
        Self { client, builder }
    }

    /// Gets the client this requester dispatches through.
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    fn map(mut self, f: impl FnOnce(GitHubRequestBuilder) -> GitHubRequestBuilder) -> Self {
        self.builder = f(self.builder);
        self
    }

    /// Sets the HTTP method (GET when never called).
    pub fn method(self, method: Method) -> Self {
        self.map(|b| b.method(method))
    }

    /// Appends a parameter; `None` and null values are omitted.
    pub fn with<V: Serialize>(self, name: impl Into<String>, value: V) -> Self {
        self.map(|b| b.with(name, value))
    }

    /// Appends a parameter, sending an explicit null for `None`.
    pub fn with_nullable<V: Serialize>(self, name: impl Into<String>, value: V) -> Self {
        self.map(|b| b.with_nullable(name, value))
    }

    /// Replaces any parameter with the same name.
    pub fn set<V: Serialize>(self, name: impl Into<String>, value: V) -> Self {
        self.map(|b| b.set(name, value))
    }

    /// Sets the path relative to the API root.
    pub fn with_url_path(self, path: impl Into<String>) -> Self {
        self.map(|b| b.with_url_path(path))
    }

    /// Sets the path from a base and percent-encoded segments.
    pub fn with_url_path_segments<I, S>(self, base: &str, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.map(|b| b.with_url_path_segments(base, segments))
    }

    /// Sets a URL the server already handed out.
    pub fn set_raw_url_path(self, url: impl Into<String>) -> Self {
        self.map(|b| b.set_raw_url_path(url))
    }

    /// Sets a request header.
    pub fn with_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|b| b.with_header(name, value))
    }

    /// Sets the `Accept` header.
    pub fn with_accept(self, media_type: impl Into<String>) -> Self {
        self.map(|b| b.with_accept(media_type))
    }

    /// Forces parameters into a JSON body.
    pub fn in_body(self) -> Self {
        self.map(GitHubRequestBuilder::in_body)
    }

    /// Sets a raw request body.
    pub fn with_body(self, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.map(|b| b.with_body(bytes, content_type))
    }

    /// Freezes the accumulated request without dispatching it.
    pub fn build(self) -> GitHubRequest {
        self.builder.build()
    }

    /// Dispatches and deserializes the response into a new `T`.
    pub async fn fetch<T: DeserializeOwned>(self) -> GitHubResult<T> {
        let request = self.builder.build();
        let response = self.client.dispatch(&request).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// Dispatches and merges the response over `target`.
    ///
    /// Fields the response carries replace the current values; fields it
    /// omits keep theirs. The returned reference is `target` itself.
    pub async fn fetch_into<T>(self, target: &mut T) -> GitHubResult<&mut T>
    where
        T: Serialize + DeserializeOwned,
    {
        let request = self.builder.build();
        let response = self.client.dispatch(&request).await?;
        let update: Value = serde_json::from_slice(&response.body)?;
        merge_into(target, update)?;
        Ok(target)
    }

    /// Dispatches, ignoring any response body.
    pub async fn send(self) -> GitHubResult<()> {
        let request = self.builder.build();
        self.client.dispatch(&request).await?;
        Ok(())
    }

    /// Dispatches and returns the status code, whatever it is.
    ///
    /// Only transport failures and malformed requests are errors here.
    pub async fn fetch_http_status_code(self) -> GitHubResult<u16> {
        let request = self.builder.build();
        let response = self.client.execute(&request).await?;
        Ok(response.status.as_u16())
    }

    /// Dispatches a GraphQL request and returns its `data` member.
    ///
    /// A response carrying an `errors` array fails with
    /// [`GitHubErrorKind::QueryError`].
    pub async fn send_graphql(self) -> GitHubResult<Value> {
        let mut response: Value = self.fetch().await?;

        if let Some(errors) = response.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(GitHubError::new(
                    GitHubErrorKind::QueryError,
                    format!("GraphQL request failed: {}", messages.join("; ")),
                )
                .with_response_body(response.to_string()));
            }
        }

        Ok(response
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Turns this requester into a lazy paginator over array pages.
    ///
    /// Nothing is sent until the first page is pulled.
    pub fn to_iterable<T, U, F>(self, transform: F) -> PagedIterable<Vec<T>, U>
    where
        T: DeserializeOwned + Send + 'static,
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        PagedIterable::new(self.client, self.builder.build(), transform)
    }

    /// Turns this requester into a lazy paginator over search envelopes.
    pub fn to_search_iterable<T, U, F>(self, transform: F) -> PagedIterable<ListResponse<T>, U>
    where
        T: DeserializeOwned + Send + 'static,
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        PagedIterable::new(self.client, self.builder.build(), transform)
    }
}

/// Overlays the members of `update` onto `target`.
fn merge_into<T>(target: &mut T, update: Value) -> GitHubResult<()>
where
    T: Serialize + DeserializeOwned,
{
    let mut current = serde_json::to_value(&*target)?;
    match (&mut current, update) {
        (Value::Object(existing), Value::Object(fields)) => {
            for (name, value) in fields {
                existing.insert(name, value);
            }
        }
        (slot, other) => *slot = other,
    }
    *target = serde_json::from_value(current)?;
    Ok(())
}
