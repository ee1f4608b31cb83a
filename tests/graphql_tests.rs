//! Integration tests for GraphQL dispatch.

#[cfg(test)]
mod graphql_tests {
    use integrations_github_rest::mocks::{MockResponse, MockTransport};
    use integrations_github_rest::{GitHubClient, GitHubErrorKind};
    use pretty_assertions::assert_eq;
    use reqwest::Method;
    use serde_json::json;

    fn setup() -> (MockTransport, GitHubClient) {
        let mock = MockTransport::new();
        let client = GitHubClient::builder()
            .transport(mock.clone())
            .build()
            .expect("client");
        (mock, client)
    }

    #[tokio::test]
    async fn test_data_member_is_returned() {
        let (mock, client) = setup();
        mock.on(
            Method::POST,
            "/graphql",
            MockResponse::ok(json!({ "data": { "viewer": { "login": "octocat" } } })),
        );

        let data = client
            .create_graphql_request("query { viewer { login } }")
            .send_graphql()
            .await
            .unwrap();

        assert_eq!(data["viewer"]["login"], "octocat");
        assert_eq!(
            mock.last_request().unwrap().json_body().unwrap(),
            json!({ "query": "query { viewer { login } }" })
        );
    }

    #[tokio::test]
    async fn test_variables_travel_with_query() {
        let (mock, client) = setup();
        mock.on(
            Method::POST,
            "/graphql",
            MockResponse::ok(json!({ "data": { "repository": { "name": "hello" } } })),
        );

        client
            .create_graphql_request("query($owner: String!) { repository(owner: $owner, name: \"hello\") { name } }")
            .with("variables", json!({ "owner": "octocat" }))
            .send_graphql()
            .await
            .unwrap();

        let body = mock.last_request().unwrap().json_body().unwrap();
        assert_eq!(body["variables"], json!({ "owner": "octocat" }));
    }

    #[tokio::test]
    async fn test_errors_array_is_query_error() {
        let (mock, client) = setup();
        mock.on(
            Method::POST,
            "/graphql",
            MockResponse::ok(json!({
                "data": null,
                "errors": [
                    { "message": "Field 'nope' doesn't exist on type 'Query'" },
                    { "message": "Second problem" }
                ]
            })),
        );

        let err = client
            .create_graphql_request("query { nope }")
            .send_graphql()
            .await
            .unwrap_err();

        assert_eq!(*err.kind(), GitHubErrorKind::QueryError);
        assert!(err.message().contains("Field 'nope' doesn't exist"));
        assert!(err.message().contains("Second problem"));
    }

    #[tokio::test]
    async fn test_empty_errors_array_is_success() {
        let (mock, client) = setup();
        mock.on(
            Method::POST,
            "/graphql",
            MockResponse::ok(json!({ "data": { "ok": true }, "errors": [] })),
        );

        let data = client
            .create_graphql_request("query { ok }")
            .send_graphql()
            .await
            .unwrap();

        assert_eq!(data, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_http_failure_is_not_query_error() {
        let (mock, client) = setup();
        mock.on(Method::POST, "/graphql", MockResponse::unauthorized());

        let err = client
            .create_graphql_request("query { viewer { login } }")
            .send_graphql()
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), Some(401));
        assert_ne!(*err.kind(), GitHubErrorKind::QueryError);
    }
}
