//! Core data types for GitHub API.
//!
//! These are plain wire records. Every field is optional or defaulted so
//! partial payloads, such as search results, still deserialize. Records are
//! wrapped in handles from [`crate::resources`] before callers see them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// GitHub user (minimal representation).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// User ID.
    pub id: u64,
    /// Username (login).
    pub login: String,
    /// User node ID.
    pub node_id: Option<String>,
    /// User type (User, Organization, Bot).
    #[serde(rename = "type")]
    pub user_type: Option<String>,
    /// API URL.
    pub url: Option<String>,
    /// Profile URL.
    pub html_url: Option<String>,
}

/// GitHub repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    /// Repository ID.
    pub id: u64,
    /// Node ID.
    pub node_id: Option<String>,
    /// Repository name.
    pub name: String,
    /// Full name (owner/repo).
    pub full_name: String,
    /// Owner information.
    pub owner: Option<User>,
    /// Whether the repository is private.
    pub private: bool,
    /// Repository description.
    pub description: Option<String>,
    /// Homepage.
    pub homepage: Option<String>,
    /// Whether the repository is a fork.
    pub fork: bool,
    /// Whether the repository is archived.
    pub archived: bool,
    /// Whether the repository can be used as a template.
    pub is_template: bool,
    /// Default branch.
    pub default_branch: Option<String>,
    /// Visibility.
    pub visibility: Option<Visibility>,
    /// Whether issues are enabled.
    pub has_issues: Option<bool>,
    /// Whether projects are enabled.
    pub has_projects: Option<bool>,
    /// Whether the wiki is enabled.
    pub has_wiki: Option<bool>,
    /// Whether downloads are enabled.
    pub has_downloads: Option<bool>,
    /// Whether forking is allowed.
    pub allow_forking: Option<bool>,
    /// Whether merge commits are allowed.
    pub allow_merge_commit: Option<bool>,
    /// Whether rebase merges are allowed.
    pub allow_rebase_merge: Option<bool>,
    /// Whether squash merges are allowed.
    pub allow_squash_merge: Option<bool>,
    /// Whether head branches are deleted after merging.
    pub delete_branch_on_merge: Option<bool>,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Repository {
    /// Gets the owner login, falling back to the `full_name` prefix.
    pub fn owner_name(&self) -> &str {
        match self.owner {
            Some(ref owner) if !owner.login.is_empty() => &owner.login,
            _ => self.full_name.split('/').next().unwrap_or_default(),
        }
    }
}

/// Repository visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Public.
    Public,
    /// Private.
    Private,
    /// Internal (enterprise only).
    Internal,
    /// Value this client does not know.
    #[serde(other)]
    Unknown,
}

/// Head or base of a pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitPointer {
    /// Label (user:branch).
    pub label: Option<String>,
    /// Branch name.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Commit SHA.
    pub sha: String,
}

/// Pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequest {
    /// Pull request ID.
    pub id: u64,
    /// Node ID, used by GraphQL mutations.
    pub node_id: Option<String>,
    /// Pull request number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// Body.
    pub body: Option<String>,
    /// State (open, closed).
    pub state: Option<String>,
    /// Author.
    pub user: Option<User>,
    /// Head branch.
    pub head: Option<CommitPointer>,
    /// Base branch.
    pub base: Option<CommitPointer>,
    /// Whether this is a draft.
    pub draft: Option<bool>,
    /// Whether the pull request was merged.
    pub merged: Option<bool>,
    /// Whether the pull request can be merged; unknown until GitHub computed it.
    pub mergeable: Option<bool>,
    /// Mergeable state (clean, dirty, blocked, ...).
    pub mergeable_state: Option<String>,
    /// SHA of the test merge commit.
    pub merge_commit_sha: Option<String>,
    /// Number of changed files.
    pub changed_files: Option<u32>,
    /// API URL. Search results carry the issue URL here.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
    /// Repository API URL, present on search results.
    pub repository_url: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Commit listed for a pull request or repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Commit {
    /// Commit SHA.
    pub sha: String,
    /// Node ID.
    pub node_id: Option<String>,
    /// Git commit details.
    pub commit: Option<GitCommit>,
    /// Author account.
    pub author: Option<User>,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// Git-level commit details.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitCommit {
    /// Commit message.
    pub message: String,
    /// Author signature.
    pub author: Option<GitSignature>,
    /// Committer signature.
    pub committer: Option<GitSignature>,
}

/// Git author or committer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSignature {
    /// Name.
    pub name: String,
    /// Email.
    pub email: String,
    /// Date.
    pub date: Option<DateTime<Utc>>,
}

/// File changed by a pull request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestFile {
    /// Blob SHA.
    pub sha: Option<String>,
    /// File name.
    pub filename: String,
    /// Status (added, modified, removed, renamed).
    pub status: Option<String>,
    /// Lines added.
    pub additions: u32,
    /// Lines removed.
    pub deletions: u32,
    /// Lines changed.
    pub changes: u32,
    /// Patch text.
    pub patch: Option<String>,
}

/// Pull request review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    /// Review ID.
    pub id: u64,
    /// Node ID.
    pub node_id: Option<String>,
    /// Reviewer.
    pub user: Option<User>,
    /// Review body.
    pub body: Option<String>,
    /// Review state.
    pub state: Option<ReviewState>,
    /// Commit the review applies to.
    pub commit_id: Option<String>,
    /// Submission time.
    pub submitted_at: Option<DateTime<Utc>>,
    /// HTML URL.
    pub html_url: Option<String>,
    /// Parent pull request API URL.
    pub pull_request_url: Option<String>,
}

/// Review state as reported by GitHub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    /// Not submitted yet.
    Pending,
    /// Approved.
    Approved,
    /// Changes requested.
    ChangesRequested,
    /// Commented.
    Commented,
    /// Dismissed.
    Dismissed,
}

/// Action taken when submitting a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewEvent {
    /// Approve the changes.
    Approve,
    /// Comment without verdict.
    Comment,
    /// Leave the review pending.
    Pending,
    /// Request changes.
    RequestChanges,
}

impl ReviewEvent {
    /// Wire value of the `event` parameter; a pending review sends none.
    pub fn action(self) -> Option<&'static str> {
        match self {
            ReviewEvent::Approve => Some("APPROVE"),
            ReviewEvent::Comment => Some("COMMENT"),
            ReviewEvent::Pending => None,
            ReviewEvent::RequestChanges => Some("REQUEST_CHANGES"),
        }
    }

    /// State a review ends up in after being submitted with this event.
    pub fn to_state(self) -> ReviewState {
        match self {
            ReviewEvent::Approve => ReviewState::Approved,
            ReviewEvent::Comment => ReviewState::Commented,
            ReviewEvent::Pending => ReviewState::Pending,
            ReviewEvent::RequestChanges => ReviewState::ChangesRequested,
        }
    }
}

/// Line comment attached to a review.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewComment {
    /// Comment ID.
    pub id: u64,
    /// Review ID.
    pub pull_request_review_id: Option<u64>,
    /// Body.
    pub body: String,
    /// File path.
    pub path: Option<String>,
    /// Commit SHA.
    pub commit_id: Option<String>,
    /// Author.
    pub user: Option<User>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// Pull request merge method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    /// Merge commit.
    Merge,
    /// Squash.
    Squash,
    /// Rebase.
    Rebase,
}

impl MergeMethod {
    /// Name of the value in the GraphQL `PullRequestMergeMethod` enum.
    pub fn graphql_name(self) -> &'static str {
        match self {
            MergeMethod::Merge => "MERGE",
            MergeMethod::Squash => "SQUASH",
            MergeMethod::Rebase => "REBASE",
        }
    }
}

/// GitHub issue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Issue {
    /// Issue ID.
    pub id: u64,
    /// Issue number.
    pub number: u64,
    /// Title.
    pub title: String,
    /// Body.
    pub body: Option<String>,
    /// State (open, closed).
    pub state: Option<String>,
    /// Author.
    pub user: Option<User>,
    /// Assignees.
    pub assignees: Vec<User>,
    /// Labels.
    pub labels: Vec<Label>,
    /// Comment count.
    pub comments: u32,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// Issue label.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Color (hex without #).
    pub color: Option<String>,
    /// Description.
    pub description: Option<String>,
}

/// Issue comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueComment {
    /// Comment ID.
    pub id: u64,
    /// Body.
    pub body: String,
    /// Author.
    pub user: Option<User>,
    /// Author association (OWNER, MEMBER, ...).
    pub author_association: Option<String>,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
}

/// Reaction on a comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Reaction {
    /// Reaction ID.
    pub id: u64,
    /// Reacting user.
    pub user: Option<User>,
    /// Reaction content.
    pub content: Option<ReactionContent>,
}

/// Reaction emoji.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReactionContent {
    /// 👍
    #[serde(rename = "+1")]
    PlusOne,
    /// 👎
    #[serde(rename = "-1")]
    MinusOne,
    /// 😄
    #[serde(rename = "laugh")]
    Laugh,
    /// 😕
    #[serde(rename = "confused")]
    Confused,
    /// ❤️
    #[serde(rename = "heart")]
    Heart,
    /// 🎉
    #[serde(rename = "hooray")]
    Hooray,
    /// 🚀
    #[serde(rename = "rocket")]
    Rocket,
    /// 👀
    #[serde(rename = "eyes")]
    Eyes,
}

/// GitHub team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Team {
    /// Team ID.
    pub id: u64,
    /// Node ID.
    pub node_id: Option<String>,
    /// Team name.
    pub name: String,
    /// Team slug.
    pub slug: String,
    /// Description.
    pub description: Option<String>,
    /// Privacy level.
    pub privacy: Option<Privacy>,
    /// Default permission.
    pub permission: Option<String>,
    /// API URL; discussions live below it.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// Team privacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Visible only to members.
    Secret,
    /// Visible to every organization member.
    Closed,
}

/// Default permission a team gets on its repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Full control.
    Admin,
    /// Manage without destructive access.
    Maintain,
    /// Read and write.
    Push,
    /// Manage issues and pull requests.
    Triage,
    /// Read only.
    Pull,
}

/// Team discussion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Discussion {
    /// Discussion number within the team.
    pub number: u64,
    /// Node ID.
    pub node_id: Option<String>,
    /// Title.
    pub title: String,
    /// Body.
    pub body: Option<String>,
    /// Whether only team members can see it.
    pub private: bool,
    /// Whether it is pinned.
    pub pinned: bool,
    /// Author.
    pub author: Option<User>,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// GitHub gist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Gist {
    /// Gist ID.
    pub id: String,
    /// Description.
    pub description: Option<String>,
    /// Whether the gist is public.
    pub public: bool,
    /// Files keyed by name.
    pub files: BTreeMap<String, GistFile>,
    /// Owner.
    pub owner: Option<User>,
    /// API URL.
    pub url: Option<String>,
    /// HTML URL.
    pub html_url: Option<String>,
}

/// Gist file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GistFile {
    /// File name.
    pub filename: String,
    /// Language.
    pub language: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Content, when not truncated.
    pub content: Option<String>,
    /// Raw URL.
    pub raw_url: Option<String>,
}

/// Installation access token.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallationToken {
    /// Token value.
    pub token: String,
    /// Expiry time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted permissions.
    pub permissions: BTreeMap<String, PermissionType>,
    /// Repository selection (all, selected).
    pub repository_selection: Option<String>,
}

/// Permission level granted to an installation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// Admin.
    Admin,
    /// Write.
    Write,
    /// Read.
    Read,
    /// No access.
    None,
}

/// Git tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tree {
    /// Tree SHA.
    pub sha: String,
    /// API URL.
    pub url: Option<String>,
    /// Entries.
    pub tree: Vec<TreeEntry>,
    /// Whether GitHub truncated the listing.
    pub truncated: bool,
}

/// Git tree entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeEntry {
    /// Path relative to the tree.
    pub path: String,
    /// File mode.
    pub mode: String,
    /// Entry type (blob, tree, commit).
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Object SHA.
    pub sha: String,
    /// Size of blobs.
    pub size: Option<u64>,
    /// API URL.
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ReviewEvent::Approve, Some("APPROVE"), ReviewState::Approved)]
    #[test_case(ReviewEvent::Comment, Some("COMMENT"), ReviewState::Commented)]
    #[test_case(ReviewEvent::Pending, None, ReviewState::Pending)]
    #[test_case(ReviewEvent::RequestChanges, Some("REQUEST_CHANGES"), ReviewState::ChangesRequested)]
    fn test_review_event_mapping(event: ReviewEvent, action: Option<&str>, state: ReviewState) {
        assert_eq!(event.action(), action);
        assert_eq!(event.to_state(), state);
    }

    #[test]
    fn test_partial_pull_request_deserializes() {
        let pr: PullRequest = serde_json::from_str(r#"{"number": 7, "title": "Fix"}"#).unwrap();
        assert_eq!(pr.number, 7);
        assert!(pr.mergeable.is_none());
        assert!(pr.mergeable_state.is_none());
    }

    #[test]
    fn test_unknown_visibility_is_tolerated() {
        let repo: Repository =
            serde_json::from_str(r#"{"full_name": "o/r", "visibility": "secretive"}"#).unwrap();
        assert_eq!(repo.visibility, Some(Visibility::Unknown));
        assert_eq!(repo.owner_name(), "o");
    }

    #[test]
    fn test_reaction_content_wire_names() {
        assert_eq!(serde_json::to_string(&ReactionContent::PlusOne).unwrap(), "\"+1\"");
        assert_eq!(serde_json::to_string(&ReactionContent::Eyes).unwrap(), "\"eyes\"");
    }
}
