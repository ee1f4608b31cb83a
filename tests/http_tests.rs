//! End-to-end tests over real HTTP against a local mock server.

#[cfg(test)]
mod http_tests {
    use integrations_github_rest::config::RetryConfig;
    use integrations_github_rest::types::Repository;
    use integrations_github_rest::{AuthMethod, GitHubClient, GitHubConfig, GitHubErrorKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GitHubClient {
        GitHubClient::builder()
            .base_url(server.uri())
            .pat("ghp_test")
            .no_retry()
            .build()
            .expect("Failed to build client")
    }

    fn repository(owner: &str, name: &str) -> serde_json::Value {
        json!({
            "id": 1,
            "name": name,
            "full_name": format!("{}/{}", owner, name),
            "owner": { "login": owner, "id": 1 },
            "private": false,
            "is_template": false
        })
    }

    #[tokio::test]
    async fn test_fetch_repository_sends_github_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(header("accept", "application/vnd.github+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repository("octocat", "hello")))
            .expect(1)
            .mount(&server)
            .await;

        let repo = client(&server).repository("octocat", "hello").await.unwrap();

        assert_eq!(repo.full_name(), "octocat/hello");
        assert_eq!(repo.owner_name(), "octocat");
    }

    #[tokio::test]
    async fn test_create_repository_posts_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .and(body_json(json!({ "name": "hello", "description": "Hi", "private": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(repository("octocat", "hello")))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .create_repository("hello")
            .description("Hi")
            .private(true)
            .create()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pages_follow_link_header() {
        let server = MockServer::start().await;
        let next = format!("{}/user/repos?page=2", server.uri());
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([repository("octocat", "c")])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/user/repos"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("link", format!("<{}>; rel=\"next\"", next).as_str())
                    .set_body_json(json!([repository("octocat", "a"), repository("octocat", "b")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let names: Vec<String> = client(&server)
            .create_request()
            .with_url_path("/user/repos")
            .to_iterable(|repo: Repository| repo.name)
            .to_list()
            .await
            .unwrap();

        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_not_found_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Not Found",
                "documentation_url": "https://docs.github.com/rest"
            })))
            .mount(&server)
            .await;

        let err = client(&server).repository("octocat", "missing").await.unwrap_err();

        assert_eq!(*err.kind(), GitHubErrorKind::NotFound);
        assert_eq!(err.documentation_url(), Some("https://docs.github.com/rest"));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/hello"))
            .respond_with(ResponseTemplate::new(200).set_body_json(repository("octocat", "hello")))
            .expect(1)
            .mount(&server)
            .await;

        let config = GitHubConfig::builder()
            .base_url(server.uri())
            .auth(AuthMethod::pat("ghp_test"))
            .retry(RetryConfig {
                initial_backoff: Duration::from_millis(10),
                ..Default::default()
            })
            .build()
            .unwrap();
        let client = GitHubClient::new(config).unwrap();

        let repo = client.repository("octocat", "hello").await.unwrap();
        assert_eq!(repo.name(), "hello");
    }

    #[tokio::test]
    async fn test_create_is_not_retried_on_bad_gateway() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/user/repos"))
            .respond_with(ResponseTemplate::new(201).set_body_json(repository("octocat", "hello")))
            .expect(0)
            .mount(&server)
            .await;

        let config = GitHubConfig::builder()
            .base_url(server.uri())
            .auth(AuthMethod::pat("ghp_test"))
            .retry(RetryConfig {
                initial_backoff: Duration::from_millis(10),
                ..Default::default()
            })
            .build()
            .unwrap();
        let client = GitHubClient::new(config).unwrap();

        let result = client
            .create_repository("hello")
            .description("d")
            .create()
            .await;

        assert!(result.is_err());
        let posts = server.received_requests().await.unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_status_probe_does_not_fail_on_404() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user/starred/octocat/hello"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let status = client(&server)
            .create_request()
            .with_url_path("/user/starred/octocat/hello")
            .fetch_http_status_code()
            .await
            .unwrap();

        assert_eq!(status, 404);
    }
}
