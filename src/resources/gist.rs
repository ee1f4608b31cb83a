//! Gists.

use crate::builder::{AbstractBuilder, Batch, Resource};
use crate::client::GitHubClient;
use crate::errors::GitHubResult;
use crate::request::encode_path_segment;
use crate::types::{Gist, GistFile};
use reqwest::Method;
use std::collections::BTreeMap;

/// A gist bound to the client that fetched it.
#[derive(Debug, Clone)]
pub struct GistHandle {
    client: GitHubClient,
    record: Gist,
}

impl Resource for GistHandle {
    type Record = Gist;
    type Context = GitHubClient;

    fn attach(record: Gist, client: &GitHubClient) -> Self {
        Self {
            client: client.clone(),
            record,
        }
    }

    fn record_mut(&mut self) -> &mut Gist {
        &mut self.record
    }
}

impl GistHandle {
    /// Gets the wire record.
    pub fn record(&self) -> &Gist {
        &self.record
    }

    /// Gets the gist ID.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Gets the description.
    pub fn description(&self) -> Option<&str> {
        self.record.description.as_deref()
    }

    /// Gets a file by name.
    pub fn file(&self, name: &str) -> Option<&GistFile> {
        self.record.files.get(name)
    }

    /// Starts a batch of changes applied to this handle on `update()`.
    pub fn update(self) -> GistUpdater {
        GistUpdater::new(self)
    }
}

/// Pending change to one gist file; `None` deletes it.
type FileChange = Option<BTreeMap<&'static str, String>>;

/// Edits a gist's files and description.
#[derive(Debug)]
pub struct GistUpdater {
    inner: AbstractBuilder<GistHandle, Batch>,
    files: BTreeMap<String, FileChange>,
}

impl GistUpdater {
    fn new(base: GistHandle) -> Self {
        let client = base.client.clone();
        let requester = client
            .create_request()
            .method(Method::PATCH)
            .with_url_path(format!("/gists/{}", encode_path_segment(base.id())));
        Self {
            inner: AbstractBuilder::new(requester, client, Some(base)).update_in_place(true),
            files: BTreeMap::new(),
        }
    }

    fn file_entry(&mut self, name: &str) -> &mut BTreeMap<&'static str, String> {
        self.files
            .entry(name.to_string())
            .or_insert(None)
            .get_or_insert_with(BTreeMap::new)
    }

    /// Adds a file.
    pub fn add_file(self, name: &str, content: &str) -> Self {
        self.update_file(name, content)
    }

    /// Replaces the content of a file.
    pub fn update_file(mut self, name: &str, content: &str) -> Self {
        self.file_entry(name).insert("content", content.to_string());
        self
    }

    /// Renames a file.
    pub fn rename_file(mut self, name: &str, new_name: &str) -> Self {
        self.file_entry(name).insert("filename", new_name.to_string());
        self
    }

    /// Deletes a file. GitHub expects an explicit null for it.
    pub fn delete_file(mut self, name: &str) -> Self {
        self.files.insert(name.to_string(), None);
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.inner = self.inner.with("description", description);
        self
    }

    /// Sends the accumulated changes and refreshes the original handle.
    pub async fn update(self) -> GitHubResult<GistHandle> {
        self.inner.with("files", self.files).done().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{fixtures, MockResponse, MockTransport};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_update_sends_file_changes() {
        let mock = MockTransport::new();
        mock.on(Method::GET, "/gists/aa5a315d", MockResponse::ok(fixtures::gist("aa5a315d")));
        mock.on(
            Method::PATCH,
            "/gists/aa5a315d",
            MockResponse::ok(json!({ "description": "Renamed files" })),
        );
        let client = GitHubClient::builder().transport(mock.clone()).build().unwrap();

        let gist = client
            .gist("aa5a315d")
            .await
            .unwrap()
            .update()
            .description("Renamed files")
            .add_file("new.txt", "hello")
            .rename_file("hello.rs", "main.rs")
            .delete_file("old.txt")
            .update()
            .await
            .unwrap();

        assert_eq!(gist.description(), Some("Renamed files"));
        assert!(gist.file("hello.rs").is_some());
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({
                "description": "Renamed files",
                "files": {
                    "hello.rs": { "filename": "main.rs" },
                    "new.txt": { "content": "hello" },
                    "old.txt": null
                }
            })
        );
    }

    #[test]
    fn test_update_after_delete_revives_file() {
        let client = GitHubClient::builder().transport(MockTransport::new()).build().unwrap();
        let record: Gist = serde_json::from_value(fixtures::gist("g")).unwrap();
        let updater = GistHandle::attach(record, &client)
            .update()
            .delete_file("a.txt")
            .update_file("a.txt", "back");

        assert_eq!(
            updater.files.get("a.txt").cloned().flatten().and_then(|f| f.get("content").cloned()),
            Some("back".to_string())
        );
    }
}
