//! Pull requests.

use super::{IssueCommentHandle, ParentRef, ReviewHandle};
use crate::builder::Resource;
use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubResult};
use crate::pagination::PagedIterable;
use crate::types::{
    Commit, IssueComment, MergeMethod, PullRequest, PullRequestFile, Review, ReviewComment,
    ReviewEvent,
};
use reqwest::Method;

/// A pull request.
///
/// Handles built from list or search results may lack the merge details
/// GitHub computes lazily. The getters for those fields fetch the full
/// record once, on first use.
#[derive(Debug, Clone)]
pub struct PullRequestHandle {
    client: GitHubClient,
    repository: Option<ParentRef>,
    record: PullRequest,
}

impl Resource for PullRequestHandle {
    type Record = PullRequest;
    type Context = ParentRef;

    fn attach(record: PullRequest, repository: &ParentRef) -> Self {
        Self {
            client: repository.client().clone(),
            repository: Some(repository.clone()),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut PullRequest {
        &mut self.record
    }
}

/// Optional inputs of [`PullRequestHandle::enable_auto_merge`].
#[derive(Debug, Clone, Default)]
pub struct AutoMergeOptions {
    /// Email of the merge commit author.
    pub author_email: Option<String>,
    /// Client mutation identifier.
    pub client_mutation_id: Option<String>,
    /// Merge commit body.
    pub commit_body: Option<String>,
    /// Merge commit headline.
    pub commit_headline: Option<String>,
    /// Head SHA the pull request must still point at.
    pub expected_head_oid: Option<String>,
    /// Merge method; GitHub defaults to a merge commit.
    pub merge_method: Option<MergeMethod>,
}

impl PullRequestHandle {
    /// Wraps a search hit, which carries no repository back-reference.
    pub fn from_search(record: PullRequest, client: &GitHubClient) -> Self {
        Self {
            client: client.clone(),
            repository: None,
            record,
        }
    }

    /// Gets the wire record as currently known.
    pub fn record(&self) -> &PullRequest {
        &self.record
    }

    /// Gets the pull request number.
    pub fn number(&self) -> u64 {
        self.record.number
    }

    /// Gets the title.
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// Gets the head SHA, if known.
    pub fn head_sha(&self) -> Option<&str> {
        self.record.head.as_ref().map(|h| h.sha.as_str())
    }

    /// API route of this pull request.
    ///
    /// Search hits point at the issue endpoint, so their URL is rewritten to
    /// the pulls endpoint.
    pub fn api_route(&self) -> GitHubResult<String> {
        if let Some(ref repository) = self.repository {
            return Ok(repository.join(&format!("/pulls/{}", self.record.number)));
        }

        let url = self
            .record
            .url
            .as_deref()
            .ok_or_else(|| GitHubError::configuration("Pull request has no URL"))?;
        let relative = url.strip_prefix(self.client.api_url()).unwrap_or(url);
        let route = if relative.starts_with('/') || relative.contains("://") {
            relative.to_string()
        } else {
            format!("/{}", relative)
        };
        Ok(route.replace("/issues/", "/pulls/"))
    }

    fn repository_route(&self) -> GitHubResult<ParentRef> {
        if let Some(ref repository) = self.repository {
            return Ok(repository.clone());
        }
        let route = self.api_route()?;
        let (repository, _) = route
            .rsplit_once("/pulls/")
            .ok_or_else(|| GitHubError::configuration(format!("Unexpected pull request route {}", route)))?;
        Ok(ParentRef::new(self.client.clone(), repository))
    }

    /// Re-fetches the full record over the current one.
    pub async fn refresh(&mut self) -> GitHubResult<()> {
        let route = self.api_route()?;
        let url = if route.contains("://") {
            route
        } else {
            format!("{}{}", self.client.api_url().trim_end_matches('/'), route)
        };
        self.client
            .create_request()
            .set_raw_url_path(url)
            .fetch_into(&mut self.record)
            .await?;
        Ok(())
    }

    async fn populate(&mut self) -> GitHubResult<()> {
        if self.record.mergeable_state.is_some() {
            return Ok(());
        }
        self.refresh().await
    }

    /// Whether the pull request can be merged. `None` while GitHub is still
    /// computing it.
    pub async fn mergeable(&mut self) -> GitHubResult<Option<bool>> {
        self.populate().await?;
        Ok(self.record.mergeable)
    }

    /// Gets the mergeable state (clean, dirty, blocked, ...).
    pub async fn mergeable_state(&mut self) -> GitHubResult<Option<String>> {
        self.populate().await?;
        Ok(self.record.mergeable_state.clone())
    }

    /// Gets the SHA of the test merge commit.
    pub async fn merge_commit_sha(&mut self) -> GitHubResult<Option<String>> {
        self.populate().await?;
        Ok(self.record.merge_commit_sha.clone())
    }

    /// Gets the number of changed files.
    pub async fn changed_files(&mut self) -> GitHubResult<Option<u32>> {
        self.populate().await?;
        Ok(self.record.changed_files)
    }

    /// Merges the pull request.
    pub async fn merge(
        &self,
        message: Option<&str>,
        sha: Option<&str>,
        method: Option<MergeMethod>,
    ) -> GitHubResult<()> {
        self.client
            .create_request()
            .method(Method::PUT)
            .with("commit_message", message)
            .with("sha", sha)
            .with("merge_method", method)
            .with_url_path(format!("{}/merge", self.api_route()?))
            .send()
            .await
    }

    /// Requests reviews from users.
    pub async fn request_reviewers(&self, logins: &[&str]) -> GitHubResult<()> {
        self.client
            .create_request()
            .method(Method::POST)
            .with("reviewers", logins)
            .with_url_path(format!("{}/requested_reviewers", self.api_route()?))
            .send()
            .await
    }

    /// Requests reviews from teams, by slug.
    pub async fn request_team_reviewers(&self, slugs: &[&str]) -> GitHubResult<()> {
        self.client
            .create_request()
            .method(Method::POST)
            .with("team_reviewers", slugs)
            .with_url_path(format!("{}/requested_reviewers", self.api_route()?))
            .send()
            .await
    }

    /// Retargets the pull request; returns the updated pull request.
    pub async fn set_base_branch(&self, base: &str) -> GitHubResult<PullRequestHandle> {
        let record: PullRequest = self
            .client
            .create_request()
            .method(Method::PATCH)
            .with("base", base)
            .with_url_path(self.api_route()?)
            .fetch()
            .await?;
        Ok(PullRequestHandle::attach(record, &self.repository_route()?))
    }

    /// Merges the base branch into the head branch.
    pub async fn update_branch(&self) -> GitHubResult<()> {
        self.client
            .create_request()
            .method(Method::PUT)
            .with("expected_head_sha", self.head_sha())
            .with_url_path(format!("{}/update-branch", self.api_route()?))
            .send()
            .await
    }

    /// Enables auto-merge through GraphQL, then refreshes this handle.
    pub async fn enable_auto_merge(&mut self, options: AutoMergeOptions) -> GitHubResult<()> {
        let node_id = self
            .record
            .node_id
            .as_deref()
            .ok_or_else(|| GitHubError::configuration("Pull request has no node id"))?;

        let mut input = vec![format!("pullRequestId: {}", graphql_string(node_id))];
        let strings = [
            ("authorEmail", &options.author_email),
            ("clientMutationId", &options.client_mutation_id),
            ("commitBody", &options.commit_body),
            ("commitHeadline", &options.commit_headline),
            ("expectedHeadOid", &options.expected_head_oid),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                input.push(format!("{}: {}", name, graphql_string(value)));
            }
        }
        if let Some(method) = options.merge_method {
            input.push(format!("mergeMethod: {}", method.graphql_name()));
        }

        let query = format!(
            "mutation EnableAutoMerge {{ enablePullRequestAutoMerge(input: {{{}}}) {{ pullRequest {{ id }} }} }}",
            input.join(", ")
        );
        self.client.create_graphql_request(query).send_graphql().await?;
        self.refresh().await
    }

    /// Lists the commits of the pull request.
    pub fn list_commits(&self) -> GitHubResult<PagedIterable<Vec<Commit>, Commit>> {
        Ok(self
            .client
            .create_request()
            .with_url_path(format!("{}/commits", self.api_route()?))
            .to_iterable(|commit: Commit| commit))
    }

    /// Lists the files the pull request changes.
    pub fn list_files(&self) -> GitHubResult<PagedIterable<Vec<PullRequestFile>, PullRequestFile>> {
        Ok(self
            .client
            .create_request()
            .with_url_path(format!("{}/files", self.api_route()?))
            .to_iterable(|file: PullRequestFile| file))
    }

    /// Lists the reviews of the pull request.
    pub fn list_reviews(&self) -> GitHubResult<PagedIterable<Vec<Review>, ReviewHandle>> {
        let route = self.api_route()?;
        let parent = ParentRef::new(self.client.clone(), route.clone());
        Ok(self
            .client
            .create_request()
            .with_url_path(format!("{}/reviews", route))
            .to_iterable(move |record| ReviewHandle::attach(record, &parent)))
    }

    /// Lists the line comments of the pull request.
    pub fn list_review_comments(
        &self,
    ) -> GitHubResult<PagedIterable<Vec<ReviewComment>, ReviewComment>> {
        Ok(self
            .client
            .create_request()
            .with_url_path(format!("{}/comments", self.api_route()?))
            .to_iterable(|comment: ReviewComment| comment))
    }

    /// Submits a review on the current head commit. A pending review is
    /// created without an event and can be submitted later.
    pub async fn create_review(
        &self,
        body: Option<&str>,
        event: ReviewEvent,
    ) -> GitHubResult<ReviewHandle> {
        let route = self.api_route()?;
        let record: Review = self
            .client
            .create_request()
            .method(Method::POST)
            .with("body", body)
            .with("event", event.action())
            .with("commit_id", self.head_sha())
            .with_url_path(format!("{}/reviews", route))
            .fetch()
            .await?;
        Ok(ReviewHandle::attach(
            record,
            &ParentRef::new(self.client.clone(), route),
        ))
    }

    /// Adds a conversation comment.
    pub async fn comment(&self, body: &str) -> GitHubResult<IssueCommentHandle> {
        let repository = self.repository_route()?;
        let record: IssueComment = self
            .client
            .create_request()
            .method(Method::POST)
            .with("body", body)
            .with_url_path(repository.join(&format!("/issues/{}/comments", self.record.number)))
            .fetch()
            .await?;
        Ok(IssueCommentHandle::attach(record, &repository))
    }
}

/// Quotes `value` as a GraphQL string literal.
fn graphql_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}
