//! Pagination handling for GitHub API.
//!
//! A [`PagedIterable`] keeps the first-page request as an immutable
//! template. Each traversal starts from that template and follows the
//! `next` entries of the `Link` header, so traversals never share state
//! and can be restarted at will.

use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::observability::TracingHooks;
use crate::request::GitHubRequest;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

/// Largest page size GitHub accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination links parsed from Link header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// URL for the next page.
    pub next: Option<String>,
    /// URL for the previous page.
    pub prev: Option<String>,
    /// URL for the first page.
    pub first: Option<String>,
    /// URL for the last page.
    pub last: Option<String>,
}

impl PaginationLinks {
    /// Parses pagination links from the Link header (RFC 8288).
    pub fn from_header(header_value: &str) -> Self {
        let mut links = Self::default();

        for part in header_value.split(',') {
            let mut url = None;
            let mut rel = None;

            for segment in part.split(';') {
                let segment = segment.trim();
                if let Some(inner) = segment.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                    url = Some(inner.to_string());
                } else if let Some(value) = segment.strip_prefix("rel=") {
                    rel = Some(value.trim_matches('"').to_string());
                }
            }

            if let (Some(url), Some(rel)) = (url, rel) {
                match rel.as_str() {
                    "next" => links.next = Some(url),
                    "prev" => links.prev = Some(url),
                    "first" => links.first = Some(url),
                    "last" => links.last = Some(url),
                    _ => {}
                }
            }
        }

        links
    }

    /// Parses pagination links from response headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get("link")
            .and_then(|v| v.to_str().ok())
            .map(Self::from_header)
            .unwrap_or_default()
    }

    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Gets the total page count from the last link.
    pub fn total_pages(&self) -> Option<u32> {
        self.last.as_deref().and_then(extract_page_number)
    }
}

/// Extracts page number from a URL.
pub fn extract_page_number(url: &str) -> Option<u32> {
    url::Url::parse(url).ok().and_then(|u| {
        u.query_pairs()
            .find(|(k, _)| k == "page")
            .and_then(|(_, v)| v.parse().ok())
    })
}

/// A single page of results.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page.
    pub items: Vec<T>,
    /// Pagination links.
    pub links: PaginationLinks,
    /// Page number within the traversal, starting at one.
    pub page: u32,
    /// Total count (if provided by API).
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Returns true if there is a next page.
    pub fn has_next(&self) -> bool {
        self.links.has_next()
    }

    /// Returns the number of items in this page.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Response wrapper for paginated lists with total count.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListResponse<T> {
    /// Total count of items.
    #[serde(default)]
    pub total_count: u64,
    /// Whether results are incomplete (for search).
    #[serde(default)]
    pub incomplete_results: bool,
    /// The items.
    pub items: Vec<T>,
}

/// Payload shape of one page.
pub trait PageContents: DeserializeOwned + Send + 'static {
    /// Raw item type.
    type Item: Send + 'static;

    /// Unwraps the items in server order.
    fn into_items(self) -> Vec<Self::Item>;

    /// Total result count, for envelopes that report one.
    fn total_count(&self) -> Option<u64> {
        None
    }
}

impl<T: DeserializeOwned + Send + 'static> PageContents for Vec<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self
    }
}

impl<T: DeserializeOwned + Send + 'static> PageContents for ListResponse<T> {
    type Item = T;

    fn into_items(self) -> Vec<T> {
        self.items
    }

    fn total_count(&self) -> Option<u64> {
        Some(self.total_count)
    }
}

type Transform<I, U> = Arc<dyn Fn(I) -> U + Send + Sync>;

/// Lazy, restartable sequence of items spread over pages.
///
/// `P` is the page payload shape and `U` the item type after the per-item
/// transform ran.
pub struct PagedIterable<P: PageContents, U> {
    client: GitHubClient,
    page_source: GitHubRequest,
    transform: Transform<P::Item, U>,
    page_size: Option<u32>,
    _payload: PhantomData<fn() -> P>,
}

impl<P: PageContents, U> Clone for PagedIterable<P, U> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            page_source: self.page_source.clone(),
            transform: Arc::clone(&self.transform),
            page_size: self.page_size,
            _payload: PhantomData,
        }
    }
}

impl<P: PageContents, U> std::fmt::Debug for PagedIterable<P, U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagedIterable")
            .field("page_source", &self.page_source)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl<P: PageContents, U: Send + 'static> PagedIterable<P, U> {
    /// Binds a page source to a client and per-item transform.
    pub fn new<F>(client: GitHubClient, page_source: GitHubRequest, transform: F) -> Self
    where
        F: Fn(P::Item) -> U + Send + Sync + 'static,
    {
        Self {
            client,
            page_source,
            transform: Arc::new(transform),
            page_size: None,
            _payload: PhantomData,
        }
    }

    /// Sets `per_page` for every traversal, capped at [`MAX_PAGE_SIZE`].
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size.clamp(1, MAX_PAGE_SIZE));
        self
    }

    /// Gets the request template every traversal starts from.
    pub fn page_source(&self) -> &GitHubRequest {
        &self.page_source
    }

    /// Starts a fresh traversal at page one.
    pub fn iter(&self) -> PageIterator<P, U> {
        let first = match self.page_size {
            Some(size) => self.page_source.to_builder().set("per_page", size).build(),
            None => self.page_source.clone(),
        };
        PageIterator {
            client: self.client.clone(),
            next: Some(first),
            transform: Arc::clone(&self.transform),
            page: 0,
            _payload: PhantomData,
        }
    }

    /// Starts a fresh traversal yielding items one by one.
    pub fn items(&self) -> BoxStream<'static, GitHubResult<U>> {
        self.iter().into_stream()
    }

    /// Fetches only the first page.
    pub async fn first_page(&self) -> GitHubResult<Page<U>> {
        let page = self.iter().next_page().await?;
        Ok(page.unwrap_or_else(|| Page {
            items: Vec::new(),
            links: PaginationLinks::default(),
            page: 1,
            total_count: None,
        }))
    }

    /// Pulls every page and returns all items in server order.
    pub async fn to_list(&self) -> GitHubResult<Vec<U>> {
        self.iter().collect_all().await
    }

    /// Same contents as [`to_list`](Self::to_list), as a boxed slice.
    pub async fn to_array(&self) -> GitHubResult<Box<[U]>> {
        Ok(self.to_list().await?.into_boxed_slice())
    }
}

/// Cursor over the pages of one traversal.
pub struct PageIterator<P: PageContents, U> {
    client: GitHubClient,
    next: Option<GitHubRequest>,
    transform: Transform<P::Item, U>,
    page: u32,
    _payload: PhantomData<fn() -> P>,
}

impl<P: PageContents, U: Send + 'static> PageIterator<P, U> {
    /// Fetches the next page, or `None` once the last page was seen.
    ///
    /// A failed fetch ends the traversal: later calls return `None`.
    pub async fn next_page(&mut self) -> GitHubResult<Option<Page<U>>> {
        let Some(request) = self.next.take() else {
            return Ok(None);
        };

        let response = self.client.dispatch(&request).await?;
        let payload: P = serde_json::from_slice(&response.body)?;
        let links = PaginationLinks::from_headers(&response.headers);

        self.page += 1;
        let total_count = payload.total_count();
        let items: Vec<U> = payload
            .into_items()
            .into_iter()
            .map(|item| (self.transform)(item))
            .collect();

        TracingHooks::on_page_fetched(
            request.url_path().unwrap_or_default(),
            self.page,
            items.len(),
            links.has_next(),
        );

        if let Some(ref next_url) = links.next {
            self.next = Some(
                request
                    .to_builder()
                    .clear_params()
                    .set_raw_url_path(next_url.clone())
                    .build(),
            );
        }

        Ok(Some(Page {
            items,
            links,
            page: self.page,
            total_count,
        }))
    }

    /// Returns true if more pages may follow.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    /// Collects all items from the remaining pages.
    pub async fn collect_all(mut self) -> GitHubResult<Vec<U>> {
        let mut all_items = Vec::new();

        while let Some(page) = self.next_page().await? {
            all_items.extend(page.items);
        }

        Ok(all_items)
    }

    /// Flattens the remaining pages into a stream of items.
    ///
    /// Pages are fetched only when the buffered items run out. The stream
    /// ends after yielding the first error.
    pub fn into_stream(self) -> BoxStream<'static, GitHubResult<U>> {
        stream::try_unfold((self, VecDeque::new()), |(mut cursor, mut buffer)| async move {
            loop {
                if let Some(item) = buffer.pop_front() {
                    return Ok(Some((item, (cursor, buffer))));
                }
                match cursor.next_page().await? {
                    Some(page) => buffer.extend(page.items),
                    None => return Ok(None),
                }
            }
        })
        .boxed()
    }
}
