//! Integration tests for lazy pagination.

#[cfg(test)]
mod pagination_tests {
    use futures::StreamExt;
    use integrations_github_rest::mocks::{fixtures, MockResponse, MockTransport};
    use integrations_github_rest::{GitHubClient, GitHubErrorKind, PagedIterable};
    use pretty_assertions::assert_eq;
    use reqwest::Method;
    use serde_json::json;

    const PAGE_2: &str = "https://api.github.com/items?page=2";
    const PAGE_3: &str = "https://api.github.com/items?page=3";

    fn setup() -> (MockTransport, GitHubClient) {
        let mock = MockTransport::new();
        let client = GitHubClient::builder()
            .transport(mock.clone())
            .build()
            .expect("client");
        (mock, client)
    }

    fn three_pages(mock: &MockTransport) {
        mock.on(
            Method::GET,
            "/items",
            MockResponse::ok(json!([1, 2])).with_next_link(PAGE_2),
        );
        mock.on(
            Method::GET,
            "/items?page=2",
            MockResponse::ok(json!([3, 4])).with_next_link(PAGE_3),
        );
        mock.on(Method::GET, "/items?page=3", MockResponse::ok(json!([5, 6])));
    }

    fn numbers(client: &GitHubClient) -> PagedIterable<Vec<u32>, u32> {
        client
            .create_request()
            .with_url_path("/items")
            .to_iterable(|n: u32| n)
    }

    #[tokio::test]
    async fn test_to_list_follows_next_links() {
        let (mock, client) = setup();
        three_pages(&mock);

        let items = numbers(&client).to_list().await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_transformed_items_collect_on_spawned_task() {
        let (mock, client) = setup();
        three_pages(&mock);
        let labels = client
            .create_request()
            .with_url_path("/items")
            .to_iterable(|n: u32| format!("#{}", n));

        let items = tokio::spawn(async move { labels.to_list().await })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(items, vec!["#1", "#2", "#3", "#4", "#5", "#6"]);
        assert_eq!(mock.request_count(), 3);
    }

    #[tokio::test]
    async fn test_nothing_is_sent_before_first_pull() {
        let (mock, client) = setup();
        three_pages(&mock);

        let iterable = numbers(&client);
        let mut items = iterable.items();
        assert_eq!(mock.request_count(), 0);

        assert_eq!(items.next().await.unwrap().unwrap(), 1);
        assert_eq!(items.next().await.unwrap().unwrap(), 2);
        assert_eq!(mock.request_count(), 1);

        assert_eq!(items.next().await.unwrap().unwrap(), 3);
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_each_traversal_starts_over() {
        let (mock, client) = setup();
        three_pages(&mock);
        let iterable = numbers(&client);

        let first = iterable.to_list().await.unwrap();
        let second = iterable.to_array().await.unwrap();

        assert_eq!(first, second.to_vec());
        assert_eq!(mock.request_count(), 6);
        assert_eq!(mock.requests()[3].url.as_str(), "https://api.github.com/items");
    }

    #[tokio::test]
    async fn test_empty_last_page_ends_traversal() {
        let (mock, client) = setup();
        mock.on(
            Method::GET,
            "/items",
            MockResponse::ok(json!([1, 2])).with_next_link(PAGE_2),
        );
        mock.on(Method::GET, "/items?page=2", MockResponse::ok(json!([])));

        let items = numbers(&client).to_list().await.unwrap();

        assert_eq!(items, vec![1, 2]);
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_failure_mid_traversal_keeps_earlier_items() {
        let (mock, client) = setup();
        mock.on(
            Method::GET,
            "/items",
            MockResponse::ok(json!([1, 2])).with_next_link(PAGE_2),
        );
        mock.on(Method::GET, "/items?page=2", MockResponse::server_error("boom"));

        let iterable = numbers(&client);
        let mut items = iterable.items();
        let mut seen = Vec::new();
        let mut failure = None;
        while let Some(item) = items.next().await {
            match item {
                Ok(n) => seen.push(n),
                Err(e) => failure = Some(e),
            }
        }

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(failure.unwrap().status_code(), Some(500));
        assert!(numbers(&client).to_list().await.is_err());
    }

    #[tokio::test]
    async fn test_search_envelope_reports_total_count() {
        let (mock, client) = setup();
        mock.on(
            Method::GET,
            "/search/issues",
            MockResponse::ok(fixtures::search_results(
                vec![
                    fixtures::search_pull_request("octocat", "hello", 1),
                    fixtures::search_pull_request("octocat", "hello", 2),
                ],
                2,
            )),
        );

        let page = client
            .search_pull_requests("repo:octocat/hello ")
            .first_page()
            .await
            .unwrap();

        assert_eq!(page.total_count, Some(2));
        assert_eq!(page.items[1].number(), 2);
        assert_eq!(
            mock.last_request().unwrap().query_param("q").as_deref(),
            Some("repo:octocat/hello is:pr")
        );
    }

    #[tokio::test]
    async fn test_malformed_page_is_deserialization_error() {
        let (mock, client) = setup();
        mock.on(Method::GET, "/items", MockResponse::ok(json!({ "not": "a list" })));

        let err = numbers(&client).to_list().await.unwrap_err();

        assert_eq!(*err.kind(), GitHubErrorKind::DeserializationError);
    }
}
