//! Issues, issue comments and reactions.

use super::ParentRef;
use crate::builder::{AbstractBuilder, Batch, Resource};
use crate::errors::GitHubResult;
use crate::pagination::PagedIterable;
use crate::types::{Issue, IssueComment, Reaction, ReactionContent};
use reqwest::Method;

/// An issue attached to its repository.
#[derive(Debug, Clone)]
pub struct IssueHandle {
    repository: ParentRef,
    record: Issue,
}

impl Resource for IssueHandle {
    type Record = Issue;
    type Context = ParentRef;

    fn attach(record: Issue, repository: &ParentRef) -> Self {
        Self {
            repository: repository.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Issue {
        &mut self.record
    }
}

impl IssueHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Issue {
        &self.record
    }

    /// Gets the issue number.
    pub fn number(&self) -> u64 {
        self.record.number
    }

    /// Gets the repository this issue belongs to.
    pub fn repository(&self) -> &ParentRef {
        &self.repository
    }

    fn route(&self, tail: &str) -> String {
        self.repository
            .join(&format!("/issues/{}{}", self.record.number, tail))
    }

    /// Adds a comment.
    pub async fn comment(&self, body: &str) -> GitHubResult<IssueCommentHandle> {
        let record: IssueComment = self
            .repository
            .client()
            .create_request()
            .method(Method::POST)
            .with("body", body)
            .with_url_path(self.route("/comments"))
            .fetch()
            .await?;
        Ok(IssueCommentHandle::attach(record, &self.repository))
    }

    /// Lists the comments, oldest first.
    pub fn list_comments(&self) -> PagedIterable<Vec<IssueComment>, IssueCommentHandle> {
        let repository = self.repository.clone();
        self.repository
            .client()
            .create_request()
            .with_url_path(self.route("/comments"))
            .to_iterable(move |record| IssueCommentHandle::attach(record, &repository))
    }
}

/// Opens an issue once `create()` is called.
#[derive(Debug)]
pub struct IssueBuilder {
    inner: AbstractBuilder<IssueHandle, Batch>,
    labels: Vec<String>,
    assignees: Vec<String>,
}

impl IssueBuilder {
    pub(crate) fn new(repository: ParentRef, title: &str) -> Self {
        let requester = repository
            .client()
            .create_request()
            .method(Method::POST)
            .with("title", title)
            .with_url_path(repository.join("/issues"));
        Self {
            inner: AbstractBuilder::new(requester, repository, None),
            labels: Vec::new(),
            assignees: Vec::new(),
        }
    }

    /// Sets the body.
    pub fn body(mut self, body: &str) -> Self {
        self.inner = self.inner.with("body", body);
        self
    }

    /// Adds an assignee by login.
    pub fn assignee(mut self, login: &str) -> Self {
        self.assignees.push(login.to_string());
        self
    }

    /// Adds a label.
    pub fn label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    /// Sets the milestone by number.
    pub fn milestone(mut self, number: u64) -> Self {
        self.inner = self.inner.with("milestone", number);
        self
    }

    /// Opens the issue.
    pub async fn create(self) -> GitHubResult<IssueHandle> {
        self.inner
            .with("labels", self.labels)
            .with("assignees", self.assignees)
            .done()
            .await
    }
}

/// A comment on an issue or pull request conversation.
#[derive(Debug, Clone)]
pub struct IssueCommentHandle {
    repository: ParentRef,
    record: IssueComment,
}

impl Resource for IssueCommentHandle {
    type Record = IssueComment;
    type Context = ParentRef;

    fn attach(record: IssueComment, repository: &ParentRef) -> Self {
        Self {
            repository: repository.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut IssueComment {
        &mut self.record
    }
}

impl IssueCommentHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &IssueComment {
        &self.record
    }

    /// Gets the body.
    pub fn body(&self) -> &str {
        &self.record.body
    }

    /// Gets the repository the comment lives in.
    pub fn parent(&self) -> &ParentRef {
        &self.repository
    }

    fn route(&self, tail: &str) -> String {
        self.repository
            .join(&format!("/issues/comments/{}{}", self.record.id, tail))
    }

    /// Replaces the body.
    pub async fn update(&mut self, body: &str) -> GitHubResult<()> {
        let route = self.route("");
        self.repository
            .client()
            .create_request()
            .method(Method::PATCH)
            .with("body", body)
            .with_url_path(route)
            .fetch_into(&mut self.record)
            .await?;
        Ok(())
    }

    /// Deletes the comment.
    pub async fn delete(self) -> GitHubResult<()> {
        self.repository
            .client()
            .create_request()
            .method(Method::DELETE)
            .with_url_path(self.route(""))
            .send()
            .await
    }

    /// Reacts to the comment.
    pub async fn create_reaction(&self, content: ReactionContent) -> GitHubResult<Reaction> {
        self.repository
            .client()
            .create_request()
            .method(Method::POST)
            .with("content", content)
            .with_url_path(self.route("/reactions"))
            .fetch()
            .await
    }

    /// Removes a reaction.
    pub async fn delete_reaction(&self, reaction: &Reaction) -> GitHubResult<()> {
        self.repository
            .client()
            .create_request()
            .method(Method::DELETE)
            .with_url_path(self.route(&format!("/reactions/{}", reaction.id)))
            .send()
            .await
    }

    /// Lists the reactions.
    pub fn list_reactions(&self) -> PagedIterable<Vec<Reaction>, Reaction> {
        self.repository
            .client()
            .create_request()
            .with_url_path(self.route("/reactions"))
            .to_iterable(|reaction: Reaction| reaction)
    }
}
