//! Generic create/update builder.
//!
//! Builders accumulate named parameters on a [`Requester`] and dispatch once.
//! Whether a setter defers or commits is chosen by the `M` type parameter:
//!
//! - [`Batch`]: setters hand the builder back; nothing is sent until
//!   `done()` (or a domain alias such as `create()` / `update()`).
//! - [`Immediate`]: setters return a future that sends the request with the
//!   accumulated parameters when awaited.
//!
//! Domain builders are thin wrappers around [`AbstractBuilder`] that implement
//! [`Done`] and expose typed setters returning `M::Step<Self>`.

use crate::errors::GitHubResult;
use crate::requester::Requester;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// A domain value built in two phases: a plain record is deserialized, then
/// attached to the context its methods need.
pub trait Resource: Sized + Send + 'static {
    /// Wire record.
    type Record: Serialize + DeserializeOwned + Send + 'static;
    /// Back-reference attached after deserialization.
    type Context: Clone + Send + Sync + 'static;

    /// Wraps a freshly deserialized record.
    fn attach(record: Self::Record, context: &Self::Context) -> Self;

    /// Gives mutable access to the record for in-place refreshes.
    fn record_mut(&mut self) -> &mut Self::Record;
}

/// The terminal step of a builder.
pub trait Done: Sized + Send + 'static {
    /// Value produced by the dispatch.
    type Output: Send + 'static;

    /// Dispatches the accumulated request.
    fn done(self) -> BoxFuture<'static, GitHubResult<Self::Output>>;
}

/// Selects what a setter returns.
pub trait CommitMode: Send + 'static {
    /// Setter return type for builder `B`.
    type Step<B: Done>;

    /// Hands `builder` back or commits it.
    fn continue_or_done<B: Done>(builder: B) -> Self::Step<B>;
}

/// Setters hand the builder back; dispatch waits for `done()`.
#[derive(Debug)]
pub enum Batch {}

/// Every setter commits the accumulated parameters.
#[derive(Debug)]
pub enum Immediate {}

impl CommitMode for Batch {
    type Step<B: Done> = B;

    fn continue_or_done<B: Done>(builder: B) -> B {
        builder
    }
}

impl CommitMode for Immediate {
    type Step<B: Done> = BoxFuture<'static, GitHubResult<B::Output>>;

    fn continue_or_done<B: Done>(builder: B) -> Self::Step<B> {
        builder.done()
    }
}

/// Marks builders that create a new resource.
#[derive(Debug)]
pub enum Creating {}

/// Marks builders that edit an existing resource.
#[derive(Debug)]
pub enum Updating {}

/// Shared state of every create/update builder.
pub struct AbstractBuilder<R: Resource, M> {
    requester: Requester,
    context: R::Context,
    base_instance: Option<R>,
    update_in_place: bool,
    _mode: PhantomData<fn() -> M>,
}

impl<R: Resource, M: CommitMode> AbstractBuilder<R, M> {
    /// Wraps `requester`; `base_instance` is the value being edited, if any.
    pub fn new(requester: Requester, context: R::Context, base_instance: Option<R>) -> Self {
        Self {
            requester,
            context,
            base_instance,
            update_in_place: false,
            _mode: PhantomData,
        }
    }

    /// Refreshes the base instance instead of producing a new value.
    pub fn update_in_place(mut self, enabled: bool) -> Self {
        self.update_in_place = enabled;
        self
    }

    /// Adjusts the underlying requester.
    pub fn configure(mut self, f: impl FnOnce(Requester) -> Requester) -> Self {
        self.requester = f(self.requester);
        self
    }

    /// Appends one parameter.
    pub fn with<V: Serialize>(self, name: &str, value: V) -> Self {
        self.configure(|r| r.with(name, value))
    }

    /// Appends one parameter, keeping explicit nulls.
    pub fn with_nullable<V: Serialize>(self, name: &str, value: V) -> Self {
        self.configure(|r| r.with_nullable(name, value))
    }

    /// Gets the attach context.
    pub fn context(&self) -> &R::Context {
        &self.context
    }

    /// Sends the request once.
    ///
    /// With a base instance and `update_in_place`, the response is merged
    /// into that instance, which is handed back. Otherwise a new value is
    /// deserialized and attached.
    pub async fn done(self) -> GitHubResult<R> {
        match self.base_instance {
            Some(mut base) if self.update_in_place => {
                self.requester.fetch_into(base.record_mut()).await?;
                Ok(base)
            }
            _ => {
                let record: R::Record = self.requester.fetch().await?;
                Ok(R::attach(record, &self.context))
            }
        }
    }
}

impl<R: Resource, M> std::fmt::Debug for AbstractBuilder<R, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractBuilder")
            .field("requester", &self.requester)
            .field("has_base_instance", &self.base_instance.is_some())
            .field("update_in_place", &self.update_in_place)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::GitHubClient;
    use crate::mocks::{MockResponse, MockTransport};
    use reqwest::Method;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    struct Label {
        #[serde(default)]
        name: String,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        description: Option<String>,
    }

    struct LabelHandle {
        record: Label,
        origin: &'static str,
    }

    impl Resource for LabelHandle {
        type Record = Label;
        type Context = &'static str;

        fn attach(record: Label, context: &&'static str) -> Self {
            Self {
                record,
                origin: *context,
            }
        }

        fn record_mut(&mut self) -> &mut Label {
            &mut self.record
        }
    }

    struct LabelBuilder<M: CommitMode> {
        inner: AbstractBuilder<LabelHandle, M>,
    }

    impl<M: CommitMode> Done for LabelBuilder<M> {
        type Output = LabelHandle;

        fn done(self) -> BoxFuture<'static, GitHubResult<LabelHandle>> {
            Box::pin(self.inner.done())
        }
    }

    impl<M: CommitMode> LabelBuilder<M> {
        fn new(client: &GitHubClient, base: Option<LabelHandle>) -> Self {
            let requester = client
                .create_request()
                .method(Method::PATCH)
                .with_url_path("/repos/o/r/labels/bug");
            Self {
                inner: AbstractBuilder::new(requester, "repo o/r", base),
            }
        }

        fn color(self, color: &str) -> M::Step<Self> {
            M::continue_or_done(Self {
                inner: self.inner.with("color", color),
            })
        }

        fn description(self, description: Option<&str>) -> M::Step<Self> {
            M::continue_or_done(Self {
                inner: self.inner.with("description", description),
            })
        }
    }

    fn setup() -> (MockTransport, GitHubClient) {
        let mock = MockTransport::new();
        mock.on(
            Method::PATCH,
            "/repos/o/r/labels/bug",
            MockResponse::ok(json!({ "name": "bug", "color": "ff0000" })),
        );
        let client = GitHubClient::builder().transport(mock.clone()).build().unwrap();
        (mock, client)
    }

    #[tokio::test]
    async fn test_batch_defers_until_done() {
        let (mock, client) = setup();

        let builder = LabelBuilder::<Batch>::new(&client, None)
            .color("ff0000")
            .description(Some("Something is broken"));
        assert_eq!(mock.request_count(), 0);

        let label = builder.done().await.unwrap();
        assert_eq!(mock.request_count(), 1);
        assert_eq!(label.record.color.as_deref(), Some("ff0000"));
        assert_eq!(label.origin, "repo o/r");

        let body = mock.last_request().unwrap().json_body().unwrap();
        assert_eq!(
            body,
            json!({ "color": "ff0000", "description": "Something is broken" })
        );
    }

    #[tokio::test]
    async fn test_dropped_batch_builder_never_dispatches() {
        let (mock, client) = setup();
        drop(LabelBuilder::<Batch>::new(&client, None).color("00ff00"));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_immediate_commits_on_await() {
        let (mock, client) = setup();

        let pending = LabelBuilder::<Immediate>::new(&client, None).color("ff0000");
        assert_eq!(mock.request_count(), 0);

        let label = pending.await.unwrap();
        assert_eq!(mock.request_count(), 1);
        assert_eq!(label.record.name, "bug");
    }

    #[tokio::test]
    async fn test_update_in_place_keeps_base_fields() {
        let (mock, client) = setup();
        let base = LabelHandle {
            record: Label {
                name: "bug".into(),
                color: Some("000000".into()),
                description: Some("kept".into()),
            },
            origin: "original",
        };

        let mut builder = LabelBuilder::<Batch>::new(&client, Some(base)).color("ff0000");
        builder.inner = builder.inner.update_in_place(true);
        let label = builder.done().await.unwrap();

        assert_eq!(mock.request_count(), 1);
        assert_eq!(label.origin, "original");
        assert_eq!(label.record.color.as_deref(), Some("ff0000"));
        assert_eq!(label.record.description.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn test_null_parameters_are_omitted() {
        let (mock, client) = setup();

        LabelBuilder::<Batch>::new(&client, None)
            .description(None)
            .color("ff0000")
            .done()
            .await
            .unwrap();

        let body = mock.last_request().unwrap().json_body().unwrap();
        assert!(body.get("description").is_none());
    }
}
