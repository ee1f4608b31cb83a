//! Pull request reviews.

use super::ParentRef;
use crate::builder::Resource;
use crate::errors::GitHubResult;
use crate::pagination::PagedIterable;
use crate::types::{Review, ReviewComment, ReviewEvent, ReviewState};
use reqwest::Method;

/// A review attached to its pull request.
#[derive(Debug, Clone)]
pub struct ReviewHandle {
    pull_request: ParentRef,
    record: Review,
}

impl Resource for ReviewHandle {
    type Record = Review;
    type Context = ParentRef;

    fn attach(record: Review, pull_request: &ParentRef) -> Self {
        Self {
            pull_request: pull_request.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Review {
        &mut self.record
    }
}

impl ReviewHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Review {
        &self.record
    }

    /// Gets the review ID.
    pub fn id(&self) -> u64 {
        self.record.id
    }

    /// Gets the review state.
    pub fn state(&self) -> Option<ReviewState> {
        self.record.state
    }

    /// Gets the pull request this review belongs to.
    pub fn pull_request(&self) -> &ParentRef {
        &self.pull_request
    }

    fn route(&self, tail: &str) -> String {
        self.pull_request
            .join(&format!("/reviews/{}{}", self.record.id, tail))
    }

    /// Submits a pending review and refreshes this handle with the result.
    pub async fn submit(&mut self, body: &str, event: ReviewEvent) -> GitHubResult<()> {
        let route = self.route("/events");
        self.pull_request
            .client()
            .create_request()
            .method(Method::POST)
            .with("body", body)
            .with("event", event.action())
            .with_url_path(route)
            .fetch_into(&mut self.record)
            .await?;
        Ok(())
    }

    /// Dismisses the review.
    pub async fn dismiss(&mut self, message: &str) -> GitHubResult<()> {
        let route = self.route("/dismissals");
        self.pull_request
            .client()
            .create_request()
            .method(Method::PUT)
            .with("message", message)
            .with_url_path(route)
            .fetch_into(&mut self.record)
            .await?;
        Ok(())
    }

    /// Deletes a pending review.
    pub async fn delete(self) -> GitHubResult<()> {
        self.pull_request
            .client()
            .create_request()
            .method(Method::DELETE)
            .with_url_path(self.route(""))
            .send()
            .await
    }

    /// Lists the line comments of this review.
    pub fn list_review_comments(&self) -> PagedIterable<Vec<ReviewComment>, ReviewComment> {
        self.pull_request
            .client()
            .create_request()
            .with_url_path(self.route("/comments"))
            .to_iterable(|comment: ReviewComment| comment)
    }
}
