//! # GitHub REST Client
//!
//! An object-style GitHub API client:
//! - One [`Requester`] per operation, dispatched exactly once
//! - Lazy, restartable pagination over list and search endpoints
//! - Typed builders that either batch changes or commit each setter
//! - Domain handles (repositories, pull requests, reviews, issues, teams,
//!   gists) bound to the client and parent that produced them
//! - Retry, rate limit tracking and tracing around every call
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use integrations_github_rest::{AuthMethod, GitHubClient, GitHubConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GitHubConfig::builder()
//!         .auth(AuthMethod::pat("ghp_xxxxxxxxxxxx"))
//!         .build()?;
//!     let client = GitHubClient::new(config)?;
//!
//!     // Batch mode: nothing is sent until `create()`.
//!     let repo = client
//!         .create_repository("hello-world")
//!         .description("My first repository")
//!         .private(true)
//!         .auto_init(true)
//!         .create()
//!         .await?;
//!
//!     // Immediate mode: each setter sends its own PATCH.
//!     let repo = repo.set().homepage("https://example.com").await?;
//!
//!     for pr in repo.list_pull_requests(Some("open")).to_list().await? {
//!         println!("#{} {}", pr.number(), pr.title());
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod types;

// Authentication
pub mod auth;

// Request pipeline
pub mod client;
pub mod request;
pub mod requester;
pub mod transport;

// Pagination handling
pub mod pagination;

// Builders and domain handles
pub mod builder;
pub mod resources;

// Resilience patterns
pub mod resilience;

// Observability
pub mod observability;

// Mocks for testing
pub mod mocks;

// Re-exports for convenience
pub use auth::{AuthMethod, AuthorizationProvider, StaticAuthorizationProvider};
pub use builder::{AbstractBuilder, Batch, CommitMode, Creating, Done, Immediate, Resource, Updating};
pub use client::{GitHubClient, GitHubClientBuilder};
pub use config::{GitHubConfig, GitHubConfigBuilder};
pub use errors::{ErrorCategory, GitHubError, GitHubErrorKind, GitHubResult, RateLimitInfo};
pub use pagination::{ListResponse, Page, PageIterator, PagedIterable, PaginationLinks};
pub use request::{GitHubRequest, GitHubRequestBuilder};
pub use requester::Requester;
pub use resources::*;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
