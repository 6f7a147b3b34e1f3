use serde_json::json;
use std::time::{Duration, Instant};
use strata_cli::core::StrataError;
use strata_cli::upgrade::UpgradeConfig;
use strata_cli::upgrade::release::{GithubReleaseResolver, ReleaseResolver};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LATEST: &str = "/repos/strata-labs/strata-cli/releases/latest";

fn resolver_for(server: &MockServer) -> GithubReleaseResolver {
    let config = UpgradeConfig {
        api_base_url: server.uri(),
        ..UpgradeConfig::default()
    };
    GithubReleaseResolver::new(&config).unwrap().with_token(None)
}

fn release_json() -> serde_json::Value {
    json!({
        "tag_name": "v2.0.0",
        "body": "## Changes\n- faster",
        "assets": [
            {"name": "strata-linux-amd64.tar.gz", "browser_download_url": "https://dl.example.com/a.tar.gz"},
            {"name": "checksums.txt", "browser_download_url": "https://dl.example.com/checksums.txt"}
        ]
    })
}

#[tokio::test]
async fn test_latest_release_is_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .and(header("accept", "application/vnd.github+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json()))
        .expect(1)
        .mount(&server)
        .await;

    let release = resolver_for(&server).latest_release().await.unwrap();
    assert_eq!(release.tag, "v2.0.0");
    assert_eq!(release.changelog_body, "## Changes\n- faster");
    assert_eq!(release.assets.len(), 2);
    assert_eq!(release.assets[1].name, "checksums.txt");
}

#[tokio::test]
async fn test_token_is_sent_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json()))
        .expect(1)
        .mount(&server)
        .await;

    let resolver = resolver_for(&server).with_token(Some("s3cret".to_string()));
    assert!(resolver.latest_release().await.is_ok());
}

#[tokio::test]
async fn test_rate_limit_is_retried_after_delay() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(403).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_json(release_json()))
        .expect(1)
        .mount(&server)
        .await;

    let started = Instant::now();
    let release = resolver_for(&server).latest_release().await.unwrap();
    assert_eq!(release.tag, "v2.0.0");
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn test_long_retry_after_is_not_honored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(403).insert_header("Retry-After", "120"))
        .expect(1)
        .mount(&server)
        .await;

    let err = resolver_for(&server).latest_release().await.unwrap_err();
    match err.downcast_ref::<StrataError>() {
        Some(StrataError::HttpStatus { status, .. }) => assert!(status.starts_with("403")),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_persistent_rate_limit_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(403).insert_header("Retry-After", "1"))
        .mount(&server)
        .await;

    let err = resolver_for(&server).latest_release().await.unwrap_err();
    assert!(matches!(err.downcast_ref::<StrataError>(), Some(StrataError::RateLimited { .. })));
}

#[tokio::test]
async fn test_non_200_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = resolver_for(&server).latest_release().await.unwrap_err();
    match err.downcast_ref::<StrataError>() {
        Some(StrataError::HttpStatus { status, .. }) => assert!(status.starts_with("404")),
        other => panic!("expected HttpStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = resolver_for(&server).latest_release().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StrataError>(),
        Some(StrataError::InvalidReleaseResponse { .. })
    ));
}

#[tokio::test]
async fn test_rate_limit_waits_share_the_api_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LATEST))
        .respond_with(ResponseTemplate::new(403).insert_header("Retry-After", "2"))
        .mount(&server)
        .await;

    let config = UpgradeConfig {
        api_base_url: server.uri(),
        api_timeout_secs: 1,
        ..UpgradeConfig::default()
    };
    let resolver = GithubReleaseResolver::new(&config).unwrap().with_token(None);

    let started = Instant::now();
    let err = resolver.latest_release().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(2));
    match err.downcast_ref::<StrataError>() {
        Some(StrataError::Timeout { seconds, .. }) => assert_eq!(*seconds, 1),
        other => panic!("expected Timeout, got {other:?}"),
    }
}
