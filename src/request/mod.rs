//! Immutable description of a single GitHub API call.
//!
//! A [`GitHubRequest`] is assembled through a [`GitHubRequestBuilder`] and
//! never changes afterwards. Pagination keeps one around as a template and
//! derives every page request from it.

use crate::errors::{GitHubError, GitHubErrorKind, GitHubResult};
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// Characters left untouched when encoding a single path segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Content type used for parameter bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encodes one URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

/// Raw request body together with its content type.
#[derive(Debug, Clone)]
pub struct RawBody {
    /// Body bytes.
    pub bytes: Bytes,
    /// Content type header value.
    pub content_type: String,
}

/// Immutable HTTP call description.
#[derive(Debug, Clone)]
pub struct GitHubRequest {
    method: Method,
    api_url: String,
    url_path: Option<String>,
    params: Vec<(String, Value)>,
    headers: Vec<(String, String)>,
    raw_body: Option<RawBody>,
    force_body: bool,
    invalid_parameter: Option<String>,
}

impl GitHubRequest {
    /// Starts a request rooted at `api_url`.
    pub fn builder(api_url: impl Into<String>) -> GitHubRequestBuilder {
        GitHubRequestBuilder::new(api_url)
    }

    /// Gets the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Gets the API root the path is resolved against.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Gets the URL path, if one was set.
    pub fn url_path(&self) -> Option<&str> {
        self.url_path.as_deref()
    }

    /// Gets the parameters in insertion order.
    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    /// Gets the first parameter with the given name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Gets caller-supplied headers.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns true when parameters travel in a JSON body.
    ///
    /// GET never carries a body and a raw body pushes parameters into the
    /// query. Otherwise every method but DELETE uses a body, and DELETE does
    /// when asked to.
    pub fn params_in_body(&self) -> bool {
        if self.method == Method::GET || self.raw_body.is_some() {
            return false;
        }
        self.force_body || self.method != Method::DELETE
    }

    /// Resolves the absolute URL, including query parameters.
    pub fn url(&self) -> GitHubResult<Url> {
        if let Some(ref message) = self.invalid_parameter {
            return Err(GitHubError::invalid_parameter(message.clone()));
        }

        let path = self
            .url_path
            .as_deref()
            .ok_or_else(|| GitHubError::configuration("Request URL path was never set"))?;

        let raw = if is_absolute(path) {
            path.to_string()
        } else {
            format!(
                "{}/{}",
                self.api_url.trim_end_matches('/'),
                path.trim_start_matches('/')
            )
        };

        let mut url = Url::parse(&raw).map_err(|e| {
            GitHubError::new(
                GitHubErrorKind::InvalidBaseUrl,
                format!("Invalid request URL {}: {}", raw, e),
            )
        })?;

        if !self.params_in_body() {
            let query: Vec<(&str, String)> = self
                .params
                .iter()
                .filter_map(|(name, value)| query_value(value).map(|v| (name.as_str(), v)))
                .collect();
            if !query.is_empty() {
                let mut pairs = url.query_pairs_mut();
                for (name, value) in query {
                    pairs.append_pair(name, &value);
                }
            }
        }

        Ok(url)
    }

    /// Encodes the request body, if the request has one.
    pub fn body(&self) -> GitHubResult<Option<RawBody>> {
        if let Some(ref raw) = self.raw_body {
            return Ok(Some(raw.clone()));
        }
        if !self.params_in_body() || self.params.is_empty() {
            return Ok(None);
        }

        let mut object = Map::new();
        for (name, value) in &self.params {
            object.insert(name.clone(), value.clone());
        }
        let bytes = serde_json::to_vec(&Value::Object(object)).map_err(|e| {
            GitHubError::invalid_parameter(format!("Failed to encode request body: {}", e))
        })?;

        Ok(Some(RawBody {
            bytes: Bytes::from(bytes),
            content_type: JSON_CONTENT_TYPE.to_string(),
        }))
    }

    /// Produces an editable copy of this request.
    pub fn to_builder(&self) -> GitHubRequestBuilder {
        GitHubRequestBuilder {
            method: self.method.clone(),
            api_url: self.api_url.clone(),
            url_path: self.url_path.clone(),
            params: self.params.clone(),
            headers: self.headers.clone(),
            raw_body: self.raw_body.clone(),
            force_body: self.force_body,
            invalid_parameter: self.invalid_parameter.clone(),
        }
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// Renders a parameter for the query string; `None` drops it.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(query_value)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Mutable accumulator for a [`GitHubRequest`].
#[derive(Debug, Clone)]
pub struct GitHubRequestBuilder {
    method: Method,
    api_url: String,
    url_path: Option<String>,
    params: Vec<(String, Value)>,
    headers: Vec<(String, String)>,
    raw_body: Option<RawBody>,
    force_body: bool,
    invalid_parameter: Option<String>,
}

impl GitHubRequestBuilder {
    /// Creates a GET builder rooted at `api_url`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            api_url: api_url.into(),
            url_path: None,
            params: Vec::new(),
            headers: Vec::new(),
            raw_body: None,
            force_body: false,
            invalid_parameter: None,
        }
    }

    /// Sets the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Appends a parameter; `None` and null values are omitted.
    pub fn with<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        if let Some(value) = self.encode(value) {
            if !value.is_null() {
                self.params.push((name.into(), value));
            }
        }
        self
    }

    /// Appends a parameter, sending an explicit JSON null for `None`.
    pub fn with_nullable<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        if let Some(value) = self.encode(value) {
            self.params.push((name.into(), value));
        }
        self
    }

    /// Replaces every parameter named `name`; a null value just removes them.
    pub fn set<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        let name = name.into();
        let Some(value) = self.encode(value) else {
            return self;
        };
        match self.params.iter().position(|(n, _)| *n == name) {
            Some(index) => {
                self.params.retain(|(n, _)| *n != name);
                if !value.is_null() {
                    self.params.insert(index, (name, value));
                }
            }
            None if !value.is_null() => self.params.push((name, value)),
            None => {}
        }
        self
    }

    /// Drops every parameter.
    pub fn clear_params(mut self) -> Self {
        self.params.clear();
        self
    }

    /// Sets the path relative to the API root.
    pub fn with_url_path(mut self, path: impl Into<String>) -> Self {
        self.url_path = Some(path.into());
        self
    }

    /// Sets the path from a base and percent-encoded trailing segments.
    pub fn with_url_path_segments<I, S>(mut self, base: &str, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = base.trim_end_matches('/').to_string();
        for segment in segments {
            path.push('/');
            path.push_str(&encode_path_segment(segment.as_ref()));
        }
        self.url_path = Some(path);
        self
    }

    /// Sets a path the server already supplied, used without rewriting.
    pub fn set_raw_url_path(mut self, url: impl Into<String>) -> Self {
        self.url_path = Some(url.into());
        self
    }

    /// Sets a header, replacing any previous value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Sets the `Accept` header.
    pub fn with_accept(self, media_type: impl Into<String>) -> Self {
        self.with_header("Accept", media_type)
    }

    /// Forces parameters into a JSON body for methods that default to the
    /// query string.
    pub fn in_body(mut self) -> Self {
        self.force_body = true;
        self
    }

    /// Sets a raw body; parameters then go to the query string.
    pub fn with_body(mut self, bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.raw_body = Some(RawBody {
            bytes: bytes.into(),
            content_type: content_type.into(),
        });
        self
    }

    /// Freezes the accumulated state.
    pub fn build(self) -> GitHubRequest {
        GitHubRequest {
            method: self.method,
            api_url: self.api_url,
            url_path: self.url_path,
            params: self.params,
            headers: self.headers,
            raw_body: self.raw_body,
            force_body: self.force_body,
            invalid_parameter: self.invalid_parameter,
        }
    }

    /// Serializes a value, remembering the first failure for dispatch time.
    fn encode<V: Serialize>(&mut self, value: V) -> Option<Value> {
        match serde_json::to_value(value) {
            Ok(value) => Some(value),
            Err(e) => {
                if self.invalid_parameter.is_none() {
                    self.invalid_parameter = Some(format!("Failed to encode parameter: {}", e));
                }
                None
            }
        }
    }
}
