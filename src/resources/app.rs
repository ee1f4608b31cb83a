//! GitHub App installation tokens.

use crate::builder::{AbstractBuilder, Batch, Resource};
use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::types::{InstallationToken, PermissionType};
use reqwest::Method;
use std::collections::BTreeMap;

impl Resource for InstallationToken {
    type Record = Self;
    type Context = ();

    fn attach(record: Self, _: &()) -> Self {
        record
    }

    fn record_mut(&mut self) -> &mut Self {
        self
    }
}

/// Requests an installation access token, optionally narrowed to a subset
/// of repositories and permissions.
#[derive(Debug)]
pub struct CreateTokenBuilder {
    inner: AbstractBuilder<InstallationToken, Batch>,
}

impl CreateTokenBuilder {
    pub(crate) fn new(client: &GitHubClient, installation_id: u64) -> Self {
        let requester = client
            .create_request()
            .method(Method::POST)
            .with_url_path(format!("/app/installations/{}/access_tokens", installation_id));
        Self {
            inner: AbstractBuilder::new(requester, (), None),
        }
    }

    /// Restricts the token to the given permissions.
    pub fn permissions<I, K>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = (K, PermissionType)>,
        K: Into<String>,
    {
        let permissions: BTreeMap<String, PermissionType> = permissions
            .into_iter()
            .map(|(name, level)| (name.into(), level))
            .collect();
        self.inner = self.inner.with("permissions", permissions);
        self
    }

    /// Restricts the token to repositories by name.
    pub fn repositories(mut self, names: &[&str]) -> Self {
        self.inner = self.inner.with("repositories", names);
        self
    }

    /// Restricts the token to repositories by ID.
    pub fn repository_ids(mut self, ids: &[u64]) -> Self {
        self.inner = self.inner.with("repository_ids", ids);
        self
    }

    /// Requests the token.
    pub async fn create(self) -> GitHubResult<InstallationToken> {
        self.inner.done().await
    }
}
