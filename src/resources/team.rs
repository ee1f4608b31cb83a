//! Teams and team discussions.

use super::ParentRef;
use crate::builder::{AbstractBuilder, Batch, CommitMode, Creating, Done, Immediate, Resource, Updating};
use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::pagination::PagedIterable;
use crate::request::encode_path_segment;
use crate::types::{Discussion, Permission, Privacy, Team};
use futures::future::BoxFuture;
use reqwest::Method;
use serde::Serialize;
use std::marker::PhantomData;

/// A team bound to the client that fetched it.
#[derive(Debug, Clone)]
pub struct TeamHandle {
    client: GitHubClient,
    record: Team,
}

impl Resource for TeamHandle {
    type Record = Team;
    type Context = GitHubClient;

    fn attach(record: Team, client: &GitHubClient) -> Self {
        Self {
            client: client.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Team {
        &mut self.record
    }
}

impl TeamHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Team {
        &self.record
    }

    /// Gets the slug.
    pub fn slug(&self) -> &str {
        &self.record.slug
    }

    /// Back-reference handed to discussions: the team's API URL.
    pub fn parent(&self) -> ParentRef {
        let route = match self.record.url {
            Some(ref url) => url.clone(),
            None => format!("/teams/{}", self.record.id),
        };
        ParentRef::new(self.client.clone(), route)
    }

    /// Starts a discussion.
    pub fn create_discussion(&self, title: &str) -> DiscussionCreator {
        DiscussionCreator::new(self.parent(), title)
    }

    /// Fetches one discussion.
    pub async fn discussion(&self, number: u64) -> GitHubResult<DiscussionHandle> {
        let parent = self.parent();
        let record: Discussion = self
            .client
            .create_request()
            .set_raw_url_path(parent.join(&format!("/discussions/{}", number)))
            .fetch()
            .await?;
        Ok(DiscussionHandle::attach(record, &parent))
    }

    /// Lists the discussions, newest first.
    pub fn list_discussions(&self) -> PagedIterable<Vec<Discussion>, DiscussionHandle> {
        let parent = self.parent();
        self.client
            .create_request()
            .set_raw_url_path(parent.join("/discussions"))
            .to_iterable(move |record| DiscussionHandle::attach(record, &parent))
    }
}

/// Creates a team once `create()` is called.
#[derive(Debug)]
pub struct TeamBuilder {
    inner: AbstractBuilder<TeamHandle, Batch>,
}

impl TeamBuilder {
    pub(crate) fn new(client: &GitHubClient, org: &str, name: &str) -> Self {
        let requester = client
            .create_request()
            .method(Method::POST)
            .with("name", name)
            .with_url_path(format!("/orgs/{}/teams", encode_path_segment(org)));
        Self {
            inner: AbstractBuilder::new(requester, client.clone(), None),
        }
    }

    fn with<V: Serialize>(self, name: &str, value: V) -> Self {
        Self {
            inner: self.inner.with(name, value),
        }
    }

    /// Sets the description.
    pub fn description(self, description: &str) -> Self {
        self.with("description", description)
    }

    /// Sets the initial maintainers by login.
    pub fn maintainers(self, logins: &[&str]) -> Self {
        self.with("maintainers", logins)
    }

    /// Nests the team under another team.
    pub fn parent_team_id(self, id: u64) -> Self {
        self.with("parent_team_id", id)
    }

    /// Sets the default permission on added repositories.
    pub fn permission(self, permission: Permission) -> Self {
        self.with("permission", permission)
    }

    /// Sets the privacy level.
    pub fn privacy(self, privacy: Privacy) -> Self {
        self.with("privacy", privacy)
    }

    /// Adds repositories, as `org/repo` names.
    pub fn repositories(self, names: &[&str]) -> Self {
        self.with("repo_names", names)
    }

    /// Creates the team.
    pub async fn create(self) -> GitHubResult<TeamHandle> {
        self.inner.done().await
    }
}

/// A discussion attached to its team.
#[derive(Debug, Clone)]
pub struct DiscussionHandle {
    team: ParentRef,
    record: Discussion,
}

impl Resource for DiscussionHandle {
    type Record = Discussion;
    type Context = ParentRef;

    fn attach(record: Discussion, team: &ParentRef) -> Self {
        Self {
            team: team.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Discussion {
        &mut self.record
    }
}

impl DiscussionHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Discussion {
        &self.record
    }

    /// Gets the discussion number.
    pub fn number(&self) -> u64 {
        self.record.number
    }

    /// Gets the title.
    pub fn title(&self) -> &str {
        &self.record.title
    }

    /// Gets the body.
    pub fn body(&self) -> Option<&str> {
        self.record.body.as_deref()
    }

    /// Returns true if only team members can see the discussion.
    pub fn is_private(&self) -> bool {
        self.record.private
    }

    /// Gets the team this discussion belongs to.
    pub fn team(&self) -> &ParentRef {
        &self.team
    }

    fn url(&self) -> String {
        match self.record.url {
            Some(ref url) => url.clone(),
            None => self.team.join(&format!("/discussions/{}", self.record.number)),
        }
    }

    /// Starts a batch of changes applied to this handle on `update()`.
    pub fn update(self) -> DiscussionUpdater {
        let url = self.url();
        let team = self.team.clone();
        DiscussionUpdater::editing(team, url, Some(self)).update_in_place()
    }

    /// Starts a single change; awaiting the setter sends it and yields a
    /// fresh handle.
    pub fn set(&self) -> DiscussionSetter {
        DiscussionSetter::editing(self.team.clone(), self.url(), None)
    }

    /// Deletes the discussion.
    pub async fn delete(self) -> GitHubResult<()> {
        self.team
            .client()
            .create_request()
            .method(Method::DELETE)
            .set_raw_url_path(self.team.join(&format!("/discussions/{}", self.record.number)))
            .send()
            .await
    }
}

/// Discussion create/update builder. Use the aliases below.
pub struct DiscussionBuilder<M: CommitMode, K> {
    inner: AbstractBuilder<DiscussionHandle, M>,
    _kind: PhantomData<fn() -> K>,
}

/// Creates a discussion once `create()` is called.
pub type DiscussionCreator = DiscussionBuilder<Batch, Creating>;

/// Applies several changes to a discussion once `update()` is called.
pub type DiscussionUpdater = DiscussionBuilder<Batch, Updating>;

/// Applies each change to a discussion as soon as it is awaited.
pub type DiscussionSetter = DiscussionBuilder<Immediate, Updating>;

impl<M: CommitMode, K: 'static> Done for DiscussionBuilder<M, K> {
    type Output = DiscussionHandle;

    fn done(self) -> BoxFuture<'static, GitHubResult<DiscussionHandle>> {
        Box::pin(self.inner.done())
    }
}

impl<M: CommitMode, K: 'static> std::fmt::Debug for DiscussionBuilder<M, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscussionBuilder")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<M: CommitMode, K: 'static> DiscussionBuilder<M, K> {
    fn wrap(inner: AbstractBuilder<DiscussionHandle, M>) -> Self {
        Self {
            inner,
            _kind: PhantomData,
        }
    }

    /// Sets the title.
    pub fn title(self, title: &str) -> M::Step<Self> {
        M::continue_or_done(Self::wrap(self.inner.with("title", title)))
    }

    /// Sets the body.
    pub fn body(self, body: &str) -> M::Step<Self> {
        M::continue_or_done(Self::wrap(self.inner.with("body", body)))
    }
}

impl DiscussionCreator {
    fn new(team: ParentRef, title: &str) -> Self {
        let requester = team
            .client()
            .create_request()
            .method(Method::POST)
            .set_raw_url_path(team.join("/discussions"))
            .with("title", title);
        Self::wrap(AbstractBuilder::new(requester, team, None))
    }

    /// Restricts the discussion to team members.
    pub fn private(self, private: bool) -> Self {
        Self::wrap(self.inner.with("private", private))
    }

    /// Creates the discussion.
    pub async fn create(self) -> GitHubResult<DiscussionHandle> {
        self.inner.done().await
    }
}

impl<M: CommitMode> DiscussionBuilder<M, Updating> {
    fn editing(team: ParentRef, url: String, base: Option<DiscussionHandle>) -> Self {
        let requester = team
            .client()
            .create_request()
            .method(Method::PATCH)
            .set_raw_url_path(url);
        Self::wrap(AbstractBuilder::new(requester, team, base))
    }
}

impl DiscussionUpdater {
    fn update_in_place(self) -> Self {
        Self::wrap(self.inner.update_in_place(true))
    }

    /// Sends the accumulated changes and refreshes the original handle.
    pub async fn update(self) -> GitHubResult<DiscussionHandle> {
        self.inner.done().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{fixtures, MockResponse, MockTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TEAM_URL: &str = "https://api.github.com/organizations/1/team/42";

    fn team(mock: &MockTransport) -> TeamHandle {
        let client = GitHubClient::builder().transport(mock.clone()).build().unwrap();
        let record: Team = serde_json::from_value(fixtures::team("acme", "core")).unwrap();
        TeamHandle::attach(record, &client)
    }

    fn discussion(mock: &MockTransport) -> DiscussionHandle {
        let team = team(mock);
        let record: Discussion =
            serde_json::from_value(fixtures::discussion(TEAM_URL, 3, "Roadmap")).unwrap();
        DiscussionHandle::attach(record, &team.parent())
    }

    #[tokio::test]
    async fn test_team_builder_posts_to_org() {
        let mock = MockTransport::new();
        mock.on(
            Method::POST,
            "/orgs/acme/teams",
            MockResponse::created(fixtures::team("acme", "core")),
        );
        let client = GitHubClient::builder().transport(mock.clone()).build().unwrap();

        let team = TeamBuilder::new(&client, "acme", "core")
            .privacy(Privacy::Closed)
            .maintainers(&["octocat"])
            .create()
            .await
            .unwrap();

        assert_eq!(team.slug(), "core");
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({ "name": "core", "privacy": "closed", "maintainers": ["octocat"] })
        );
    }

    #[tokio::test]
    async fn test_creator_uses_team_url() {
        let mock = MockTransport::new();
        mock.on(
            Method::POST,
            "/organizations/1/team/42/discussions",
            MockResponse::created(fixtures::discussion(TEAM_URL, 3, "Roadmap")),
        );

        let created = team(&mock)
            .create_discussion("Roadmap")
            .body("Q3 plans")
            .private(true)
            .create()
            .await
            .unwrap();

        assert_eq!(created.number(), 3);
        assert_eq!(created.team().route(), TEAM_URL);
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({ "title": "Roadmap", "body": "Q3 plans", "private": true })
        );
    }

    #[tokio::test]
    async fn test_setter_returns_new_handle() {
        let mock = MockTransport::new();
        mock.on(
            Method::PATCH,
            "/organizations/1/team/42/discussions/3",
            MockResponse::ok(fixtures::discussion(TEAM_URL, 3, "Renamed")),
        );
        let original = discussion(&mock);

        let renamed = original.set().title("Renamed").await.unwrap();

        assert_eq!(renamed.title(), "Renamed");
        assert_eq!(original.title(), "Roadmap");
    }

    #[tokio::test]
    async fn test_updater_keeps_fields_missing_from_response() {
        let mock = MockTransport::new();
        mock.on(
            Method::PATCH,
            "/organizations/1/team/42/discussions/3",
            MockResponse::ok(json!({ "number": 3, "body": "New body" })),
        );

        let updated = discussion(&mock)
            .update()
            .body("New body")
            .update()
            .await
            .unwrap();

        assert_eq!(updated.body(), Some("New body"));
        assert_eq!(updated.title(), "Roadmap");
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_list_discussions_attaches_team() {
        let mock = MockTransport::new();
        mock.on(
            Method::GET,
            "/organizations/1/team/42/discussions",
            MockResponse::ok(json!([fixtures::discussion(TEAM_URL, 2, "b"), fixtures::discussion(TEAM_URL, 1, "a")])),
        );

        let discussions = team(&mock).list_discussions().to_list().await.unwrap();

        let numbers: Vec<u64> = discussions.iter().map(DiscussionHandle::number).collect();
        assert_eq!(numbers, vec![2, 1]);
        assert!(discussions.iter().all(|d| d.team().route() == TEAM_URL));
    }
}
