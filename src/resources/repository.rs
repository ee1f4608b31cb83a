//! Repositories, their create/update builders, commit queries and trees.

use super::{IssueBuilder, ParentRef, PullRequestHandle, TeamHandle};
use crate::builder::{AbstractBuilder, Batch, CommitMode, Creating, Done, Immediate, Resource, Updating};
use crate::client::GitHubClient;
use crate::errors::{GitHubError, GitHubResult};
use crate::pagination::PagedIterable;
use crate::requester::Requester;
use crate::types::{Commit, PullRequest, Repository, Tree, TreeEntry, Visibility};
use chrono::{DateTime, SecondsFormat, Utc};
use futures::future::BoxFuture;
use reqwest::Method;
use serde::Serialize;
use std::marker::PhantomData;

/// A repository bound to the client that fetched it.
#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    client: GitHubClient,
    record: Repository,
}

impl Resource for RepositoryHandle {
    type Record = Repository;
    type Context = GitHubClient;

    fn attach(record: Repository, client: &GitHubClient) -> Self {
        Self {
            client: client.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Repository {
        &mut self.record
    }
}

impl RepositoryHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Repository {
        &self.record
    }

    /// Gets the owner login.
    pub fn owner_name(&self) -> &str {
        self.record.owner_name()
    }

    /// Gets the repository name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Gets `owner/name`.
    pub fn full_name(&self) -> &str {
        &self.record.full_name
    }

    /// Gets the description.
    pub fn description(&self) -> Option<&str> {
        self.record.description.as_deref()
    }

    /// Returns true if the repository can seed new repositories.
    pub fn is_template(&self) -> bool {
        self.record.is_template
    }

    /// Returns true if the repository is archived.
    pub fn is_archived(&self) -> bool {
        self.record.archived
    }

    /// Back-reference handed to child resources.
    pub fn parent(&self) -> ParentRef {
        ParentRef::repository(self.client.clone(), self.owner_name(), self.name())
    }

    fn route(&self, tail: &str) -> String {
        self.parent().join(tail)
    }

    /// Starts a batch of changes applied to this handle on `update()`.
    pub fn update(self) -> RepositoryUpdater {
        let route = self.route("");
        let client = self.client.clone();
        RepositoryUpdater::editing(&client, route, Some(self)).update_in_place()
    }

    /// Starts a single change; awaiting the setter sends it and yields a
    /// fresh handle.
    pub fn set(&self) -> RepositorySetter {
        RepositorySetter::editing(&self.client, self.route(""), None)
    }

    /// Renames the repository.
    pub async fn rename_to(&self, name: &str) -> GitHubResult<RepositoryHandle> {
        self.set().name(name).await
    }

    /// Archives the repository. Archived repositories are read-only.
    pub async fn archive(&mut self) -> GitHubResult<()> {
        let route = self.route("");
        self.client
            .create_request()
            .method(Method::PATCH)
            .with("archived", true)
            .with_url_path(route)
            .fetch_into(&mut self.record)
            .await?;
        Ok(())
    }

    /// Deletes the repository.
    pub async fn delete(self) -> GitHubResult<()> {
        self.client
            .create_request()
            .method(Method::DELETE)
            .with_url_path(self.route(""))
            .send()
            .await
    }

    /// Starts an issue.
    pub fn create_issue(&self, title: &str) -> IssueBuilder {
        IssueBuilder::new(self.parent(), title)
    }

    /// Starts a commit listing.
    pub fn query_commits(&self) -> CommitQueryBuilder {
        CommitQueryBuilder::new(self.parent())
    }

    /// Lists pull requests, optionally filtered by state.
    pub fn list_pull_requests(
        &self,
        state: Option<&str>,
    ) -> PagedIterable<Vec<PullRequest>, PullRequestHandle> {
        let parent = self.parent();
        self.client
            .create_request()
            .with("state", state)
            .with_url_path(self.route("/pulls"))
            .to_iterable(move |record| PullRequestHandle::attach(record, &parent))
    }

    /// Fetches one pull request.
    pub async fn pull_request(&self, number: u64) -> GitHubResult<PullRequestHandle> {
        let record: PullRequest = self
            .client
            .create_request()
            .with_url_path(self.route(&format!("/pulls/{}", number)))
            .fetch()
            .await?;
        Ok(PullRequestHandle::attach(record, &self.parent()))
    }

    /// Opens a pull request merging `head` into `base`.
    pub async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: Option<&str>,
    ) -> GitHubResult<PullRequestHandle> {
        let record: PullRequest = self
            .client
            .create_request()
            .method(Method::POST)
            .with("title", title)
            .with("head", head)
            .with("base", base)
            .with("body", body)
            .with_url_path(self.route("/pulls"))
            .fetch()
            .await?;
        Ok(PullRequestHandle::attach(record, &self.parent()))
    }

    /// Fetches a git tree, descending into subtrees when `recursive`.
    pub async fn tree(&self, sha: &str, recursive: bool) -> GitHubResult<TreeHandle> {
        let record: Tree = self
            .client
            .create_request()
            .with("recursive", recursive.then_some(1))
            .with_url_path_segments(&self.route("/git/trees"), [sha])
            .fetch()
            .await?;
        Ok(TreeHandle { record })
    }
}

/// Repository create/update builder.
///
/// `M` picks batch or immediate commits, `K` whether a repository is being
/// created or edited. Use the aliases below rather than naming it directly.
pub struct RepositoryBuilder<M: CommitMode, K> {
    inner: AbstractBuilder<RepositoryHandle, M>,
    _kind: PhantomData<fn() -> K>,
}

/// Creates a repository once `create()` is called.
pub type CreateRepositoryBuilder = RepositoryBuilder<Batch, Creating>;

/// Applies several changes to a repository once `update()` is called.
pub type RepositoryUpdater = RepositoryBuilder<Batch, Updating>;

/// Applies each change to a repository as soon as it is awaited.
pub type RepositorySetter = RepositoryBuilder<Immediate, Updating>;

impl<M: CommitMode, K: 'static> Done for RepositoryBuilder<M, K> {
    type Output = RepositoryHandle;

    fn done(self) -> BoxFuture<'static, GitHubResult<RepositoryHandle>> {
        Box::pin(self.inner.done())
    }
}

impl<M: CommitMode, K: 'static> std::fmt::Debug for RepositoryBuilder<M, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<M: CommitMode, K: 'static> RepositoryBuilder<M, K> {
    fn wrap(inner: AbstractBuilder<RepositoryHandle, M>) -> Self {
        Self {
            inner,
            _kind: PhantomData,
        }
    }

    fn with<V: Serialize>(self, name: &str, value: V) -> M::Step<Self> {
        M::continue_or_done(Self::wrap(self.inner.with(name, value)))
    }

    /// Allows forking.
    pub fn allow_forking(self, enabled: bool) -> M::Step<Self> {
        self.with("allow_forking", enabled)
    }

    /// Allows merge commits.
    pub fn allow_merge_commit(self, enabled: bool) -> M::Step<Self> {
        self.with("allow_merge_commit", enabled)
    }

    /// Allows rebase merges.
    pub fn allow_rebase_merge(self, enabled: bool) -> M::Step<Self> {
        self.with("allow_rebase_merge", enabled)
    }

    /// Allows squash merges.
    pub fn allow_squash_merge(self, enabled: bool) -> M::Step<Self> {
        self.with("allow_squash_merge", enabled)
    }

    /// Sets the default branch.
    pub fn default_branch(self, branch: &str) -> M::Step<Self> {
        self.with("default_branch", branch)
    }

    /// Deletes head branches once their pull request is merged.
    pub fn delete_branch_on_merge(self, enabled: bool) -> M::Step<Self> {
        self.with("delete_branch_on_merge", enabled)
    }

    /// Sets the description.
    pub fn description(self, description: &str) -> M::Step<Self> {
        self.with("description", description)
    }

    /// Enables downloads.
    pub fn downloads(self, enabled: bool) -> M::Step<Self> {
        self.with("has_downloads", enabled)
    }

    /// Sets the homepage.
    pub fn homepage(self, homepage: &str) -> M::Step<Self> {
        self.with("homepage", homepage)
    }

    /// Marks the repository as a template.
    pub fn is_template(self, enabled: bool) -> M::Step<Self> {
        self.with("is_template", enabled)
    }

    /// Enables issues.
    pub fn issues(self, enabled: bool) -> M::Step<Self> {
        self.with("has_issues", enabled)
    }

    /// Makes the repository private.
    pub fn private(self, enabled: bool) -> M::Step<Self> {
        self.with("private", enabled)
    }

    /// Enables projects.
    pub fn projects(self, enabled: bool) -> M::Step<Self> {
        self.with("has_projects", enabled)
    }

    /// Sets the visibility.
    pub fn visibility(self, visibility: Visibility) -> M::Step<Self> {
        self.with("visibility", visibility)
    }

    /// Enables the wiki.
    pub fn wiki(self, enabled: bool) -> M::Step<Self> {
        self.with("has_wiki", enabled)
    }
}

impl CreateRepositoryBuilder {
    pub(crate) fn new(client: &GitHubClient, path: &str, name: &str) -> Self {
        let requester = client
            .create_request()
            .method(Method::POST)
            .with_url_path(path)
            .with("name", name);
        Self::wrap(AbstractBuilder::new(requester, client.clone(), None))
    }

    /// Creates an initial commit with an empty README.
    pub fn auto_init(self, enabled: bool) -> Self {
        self.with("auto_init", enabled)
    }

    /// Applies a `.gitignore` template, e.g. `Rust`.
    pub fn gitignore_template(self, language: &str) -> Self {
        self.with("gitignore_template", language)
    }

    /// Applies a license template, e.g. `mit`.
    pub fn license_template(self, license: &str) -> Self {
        self.with("license_template", license)
    }

    /// Sets the owner when generating from a template.
    pub fn owner(self, owner: &str) -> Self {
        self.with("owner", owner)
    }

    /// Grants a team access to the new organization repository.
    pub fn team_id(self, team_id: u64) -> Self {
        self.with("team_id", team_id)
    }

    /// Grants `team` access to the new organization repository.
    pub fn team(self, team: &TeamHandle) -> Self {
        self.team_id(team.record().id)
    }

    /// Generates the repository from the template `owner/repo`.
    pub fn from_template_repository(self, owner: &str, repo: &str) -> Self {
        Self::wrap(
            self.inner
                .configure(|r| r.with_url_path_segments("/repos", [owner, repo, "generate"])),
        )
    }

    /// Generates the repository from `template`, which must be a template.
    pub fn from_template(self, template: &RepositoryHandle) -> GitHubResult<Self> {
        if !template.is_template() {
            return Err(GitHubError::invalid_parameter(format!(
                "Repository {} is not a template",
                template.full_name()
            )));
        }
        Ok(self.from_template_repository(template.owner_name(), template.name()))
    }

    /// Creates the repository.
    pub async fn create(self) -> GitHubResult<RepositoryHandle> {
        self.inner.done().await
    }
}

impl<M: CommitMode> RepositoryBuilder<M, Updating> {
    fn editing(client: &GitHubClient, route: String, base: Option<RepositoryHandle>) -> Self {
        let requester = client
            .create_request()
            .method(Method::PATCH)
            .with_url_path(route);
        Self::wrap(AbstractBuilder::new(requester, client.clone(), base))
    }

    /// Renames the repository.
    pub fn name(self, name: &str) -> M::Step<Self> {
        self.with("name", name)
    }
}

impl RepositoryUpdater {
    fn update_in_place(self) -> Self {
        Self::wrap(self.inner.update_in_place(true))
    }

    /// Sends the accumulated changes and refreshes the original handle.
    pub async fn update(self) -> GitHubResult<RepositoryHandle> {
        self.inner.done().await
    }
}

/// A commit listed from a repository.
#[derive(Debug, Clone)]
pub struct CommitHandle {
    parent: ParentRef,
    record: Commit,
}

impl Resource for CommitHandle {
    type Record = Commit;
    type Context = ParentRef;

    fn attach(record: Commit, parent: &ParentRef) -> Self {
        Self {
            parent: parent.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Commit {
        &mut self.record
    }
}

impl CommitHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Commit {
        &self.record
    }

    /// Gets the commit SHA.
    pub fn sha(&self) -> &str {
        &self.record.sha
    }

    /// Gets the commit message.
    pub fn message(&self) -> Option<&str> {
        self.record.commit.as_ref().map(|c| c.message.as_str())
    }

    /// Gets the repository this commit belongs to.
    pub fn repository(&self) -> &ParentRef {
        &self.parent
    }
}

/// Filters for listing commits.
#[derive(Debug)]
pub struct CommitQueryBuilder {
    parent: ParentRef,
    requester: Requester,
}

impl CommitQueryBuilder {
    fn new(parent: ParentRef) -> Self {
        let requester = parent.client().create_request();
        Self { parent, requester }
    }

    fn with<V: Serialize>(mut self, name: &str, value: V) -> Self {
        self.requester = self.requester.with(name, value);
        self
    }

    /// Only commits by this GitHub login or email address.
    pub fn author(self, author: &str) -> Self {
        self.with("author", author)
    }

    /// Starts listing from this SHA or branch.
    pub fn from(self, git_ref: &str) -> Self {
        self.with("sha", git_ref)
    }

    /// Only commits touching this path.
    pub fn path(self, path: &str) -> Self {
        self.with("path", path)
    }

    /// Only commits after this instant.
    pub fn since(self, instant: DateTime<Utc>) -> Self {
        self.with("since", instant.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Only commits before this instant.
    pub fn until(self, instant: DateTime<Utc>) -> Self {
        self.with("until", instant.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Sets the page size.
    pub fn page_size(mut self, size: u32) -> Self {
        self.requester = self.requester.set("per_page", size);
        self
    }

    /// Lists the matching commits, newest first.
    pub fn list(self) -> PagedIterable<Vec<Commit>, CommitHandle> {
        let parent = self.parent;
        self.requester
            .with_url_path(parent.join("/commits"))
            .to_iterable(move |record| CommitHandle::attach(record, &parent))
    }
}

/// A git tree.
#[derive(Debug, Clone)]
pub struct TreeHandle {
    record: Tree,
}

impl TreeHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Tree {
        &self.record
    }

    /// Gets the tree SHA.
    pub fn sha(&self) -> &str {
        &self.record.sha
    }

    /// Gets all entries.
    pub fn entries(&self) -> &[TreeEntry] {
        &self.record.tree
    }

    /// Finds the entry at `path`.
    pub fn entry(&self, path: &str) -> Option<&TreeEntry> {
        self.record.tree.iter().find(|e| e.path == path)
    }

    /// Returns true if GitHub cut the listing short.
    pub fn is_truncated(&self) -> bool {
        self.record.truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{fixtures, MockResponse, MockTransport};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client(mock: &MockTransport) -> GitHubClient {
        GitHubClient::builder().transport(mock.clone()).build().unwrap()
    }

    fn handle(client: &GitHubClient) -> RepositoryHandle {
        let record: Repository =
            serde_json::from_value(fixtures::repository("octocat", "hello")).unwrap();
        RepositoryHandle::attach(record, client)
    }

    #[tokio::test]
    async fn test_create_sends_one_post_with_all_fields() {
        let mock = MockTransport::new();
        mock.on(
            Method::POST,
            "/user/repos",
            MockResponse::created(fixtures::repository("octocat", "hello")),
        );
        let client = client(&mock);

        let repo = client
            .create_repository("hello")
            .description("Hello")
            .private(true)
            .auto_init(true)
            .create()
            .await
            .unwrap();

        assert_eq!(repo.full_name(), "octocat/hello");
        assert_eq!(mock.request_count(), 1);
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({ "name": "hello", "description": "Hello", "private": true, "auto_init": true })
        );
    }

    #[tokio::test]
    async fn test_from_template_rejects_plain_repository() {
        let mock = MockTransport::new();
        let client = client(&mock);
        let template = handle(&client);

        let err = client.create_repository("copy").from_template(&template).unwrap_err();
        assert_eq!(err.category(), crate::errors::ErrorCategory::Configuration);
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_from_template_repository_posts_to_generate() {
        let mock = MockTransport::new();
        mock.on(
            Method::POST,
            "/repos/octocat/template/generate",
            MockResponse::created(fixtures::repository("octocat", "copy")),
        );
        let client = client(&mock);

        client
            .create_repository("copy")
            .from_template_repository("octocat", "template")
            .owner("octocat")
            .create()
            .await
            .unwrap();

        assert!(mock.verify_request(Method::POST, "/repos/octocat/template/generate"));
    }

    #[tokio::test]
    async fn test_setter_dispatches_per_call() {
        let mock = MockTransport::new();
        let mut renamed = fixtures::repository("octocat", "hello");
        renamed["description"] = json!("changed");
        mock.on(Method::PATCH, "/repos/octocat/hello", MockResponse::ok(renamed));
        let client = client(&mock);
        let repo = handle(&client);

        let updated = repo.set().description("changed").await.unwrap();

        assert_eq!(mock.request_count(), 1);
        assert_eq!(updated.description(), Some("changed"));
        assert_eq!(repo.description(), Some("A test repository"));
    }

    #[tokio::test]
    async fn test_updater_refreshes_same_handle() {
        let mock = MockTransport::new();
        mock.on(
            Method::PATCH,
            "/repos/octocat/hello",
            MockResponse::ok(json!({ "description": "batched", "has_wiki": false })),
        );
        let client = client(&mock);

        let repo = handle(&client)
            .update()
            .description("batched")
            .wiki(false)
            .update()
            .await
            .unwrap();

        assert_eq!(repo.description(), Some("batched"));
        assert_eq!(repo.record().has_wiki, Some(false));
        assert_eq!(repo.full_name(), "octocat/hello");
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({ "description": "batched", "has_wiki": false })
        );
    }

    #[tokio::test]
    async fn test_commit_query_parameters() {
        let mock = MockTransport::new();
        mock.on(
            Method::GET,
            "/repos/octocat/hello/commits",
            MockResponse::ok(json!([{ "sha": "abc", "commit": { "message": "Initial" } }])),
        );
        let client = client(&mock);
        let since = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let commits = handle(&client)
            .query_commits()
            .author("octocat")
            .path("src/lib.rs")
            .since(since)
            .page_size(10)
            .list()
            .to_list()
            .await
            .unwrap();

        assert_eq!(commits.len(), 1);
        assert_eq!(commits[0].sha(), "abc");
        assert_eq!(commits[0].message(), Some("Initial"));
        assert_eq!(commits[0].repository().route(), "/repos/octocat/hello");

        let sent = mock.last_request().unwrap();
        assert_eq!(sent.query_param("author").as_deref(), Some("octocat"));
        assert_eq!(sent.query_param("since").as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(sent.query_param("per_page").as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn test_tree_entry_lookup() {
        let mock = MockTransport::new();
        mock.on(
            Method::GET,
            "/repos/octocat/hello/git/trees/main",
            MockResponse::ok(json!({
                "sha": "t1",
                "truncated": false,
                "tree": [
                    { "path": "README.md", "mode": "100644", "type": "blob", "sha": "b1", "size": 12 },
                    { "path": "src", "mode": "040000", "type": "tree", "sha": "t2" }
                ]
            })),
        );
        let client = client(&mock);

        let tree = handle(&client).tree("main", true).await.unwrap();

        assert_eq!(tree.entry("src").unwrap().entry_type, "tree");
        assert!(tree.entry("missing").is_none());
        assert_eq!(mock.last_request().unwrap().query_param("recursive").as_deref(), Some("1"));
    }
}
