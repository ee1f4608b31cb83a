//! Domain handles and builders.
//!
//! Each handle pairs a wire record from [`crate::types`] with the
//! back-reference its operations need. Handles are produced by attaching a
//! freshly deserialized record, never handed out half-built.

mod app;
mod gist;
mod issue;
mod pull_request;
mod repository;
mod review;
mod team;

pub use crate::builder::Resource;
pub use app::CreateTokenBuilder;
pub use gist::{GistHandle, GistUpdater};
pub use issue::{IssueBuilder, IssueCommentHandle, IssueHandle};
pub use pull_request::{AutoMergeOptions, PullRequestHandle};
pub use repository::{
    CommitHandle, CommitQueryBuilder, CreateRepositoryBuilder, RepositoryBuilder,
    RepositoryHandle, RepositorySetter, RepositoryUpdater, TreeHandle,
};
pub use review::ReviewHandle;
pub use team::{
    DiscussionBuilder, DiscussionCreator, DiscussionHandle, DiscussionSetter, DiscussionUpdater,
    TeamBuilder, TeamHandle,
};

use crate::client::GitHubClient;
use crate::request::encode_path_segment;

/// Back-reference from a child handle to the resource it lives under.
///
/// `route` is either relative to the API root (`/repos/octocat/hello`) or an
/// absolute URL the server handed out.
#[derive(Debug, Clone)]
pub struct ParentRef {
    client: GitHubClient,
    route: String,
}

impl ParentRef {
    pub(crate) fn new(client: GitHubClient, route: impl Into<String>) -> Self {
        Self {
            client,
            route: route.into(),
        }
    }

    /// Points at the repository `owner/name`.
    pub(crate) fn repository(client: GitHubClient, owner: &str, name: &str) -> Self {
        let route = format!(
            "/repos/{}/{}",
            encode_path_segment(owner),
            encode_path_segment(name)
        );
        Self::new(client, route)
    }

    /// Gets the client.
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Gets the parent route.
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Appends `tail` to the parent route.
    pub(crate) fn join(&self, tail: &str) -> String {
        format!("{}{}", self.route.trim_end_matches('/'), tail)
    }
}
