//! Release discovery against the GitHub releases API.
//!
//! [`ReleaseResolver`] is the seam the orchestrator depends on;
//! [`GithubReleaseResolver`] is the production implementation. Tests either
//! point the production resolver at a mock server through
//! [`UpgradeConfig::api_base_url`] or substitute their own resolver.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{
    FALLBACK_TOKEN_ENV, MAX_RATE_LIMIT_RETRIES, MAX_RETRY_AFTER_SECS, TOKEN_ENV, USER_AGENT,
};
use crate::core::StrataError;
use crate::upgrade::config::UpgradeConfig;

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// File name as published, e.g. `strata-linux-amd64.tar.gz`.
    pub name: String,
    /// Direct download URL.
    #[serde(rename = "browser_download_url")]
    pub download_url: String,
}

/// The latest published release.
///
/// Decoded from the API's `tag_name`, `body` and `assets` fields. The tag is
/// the authoritative identity of the release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDescriptor {
    /// Release tag, e.g. `v1.4.0`.
    #[serde(rename = "tag_name")]
    pub tag: String,
    /// Free-text changelog. GitHub sends `null` for releases without notes.
    #[serde(rename = "body", default, deserialize_with = "null_as_empty")]
    pub changelog_body: String,
    /// Attached files, in API order.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Source of the latest release descriptor.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Fetch the latest published release.
    async fn latest_release(&self) -> Result<ReleaseDescriptor>;
}

/// [`ReleaseResolver`] backed by `GET /repos/{owner}/{repo}/releases/latest`.
///
/// # Rate limiting
///
/// A `403` carrying a `Retry-After` of 1..60 seconds is retried after that
/// delay, at most [`MAX_RATE_LIMIT_RETRIES`] times. Every other non-200
/// status is fatal.
///
/// # Authentication
///
/// A bearer token is sent when `STRATA_GITHUB_TOKEN` (or `GITHUB_TOKEN`) is
/// set. It only raises the rate limit; anonymous access works.
pub struct GithubReleaseResolver {
    client: reqwest::Client,
    api_base_url: String,
    repo_owner: String,
    repo_name: String,
    token: Option<String>,
    timeout: Duration,
}

impl GithubReleaseResolver {
    /// Create a resolver from upgrade settings, reading the token from the environment.
    pub fn new(config: &UpgradeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.api_timeout())
            .build()
            .map_err(|e| StrataError::NetworkError {
                operation: "HTTP client setup".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            repo_owner: config.repo_owner.clone(),
            repo_name: config.repo_name.clone(),
            token: token_from_env(),
            timeout: config.api_timeout(),
        })
    }

    /// Override the API token.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// URL of the "latest release" endpoint.
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base_url, self.repo_owner, self.repo_name
        )
    }

    async fn send_once(&self, url: &str) -> Result<reqwest::Response> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        request.send().await.map_err(|e| self.transport_error(&e).into())
    }

    fn transport_error(&self, error: &reqwest::Error) -> StrataError {
        if error.is_timeout() {
            StrataError::Timeout {
                operation: "release lookup".to_string(),
                seconds: self.timeout.as_secs(),
            }
        } else {
            StrataError::NetworkError {
                operation: "release lookup".to_string(),
                reason: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl ReleaseResolver for GithubReleaseResolver {
    /// The whole lookup, rate-limit waits included, shares one deadline.
    async fn latest_release(&self) -> Result<ReleaseDescriptor> {
        tokio::time::timeout(self.timeout, self.lookup()).await.map_err(|_| {
            StrataError::Timeout {
                operation: "release lookup".to_string(),
                seconds: self.timeout.as_secs(),
            }
        })?
    }
}

impl GithubReleaseResolver {
    async fn lookup(&self) -> Result<ReleaseDescriptor> {
        let url = self.latest_release_url();
        debug!("Fetching latest release from {url}");

        let mut attempts = 0;
        let response = loop {
            attempts += 1;
            let response = self.send_once(&url).await?;
            if response.status() != StatusCode::FORBIDDEN {
                break response;
            }

            match rate_limit_delay(response.headers()) {
                Some(delay) if attempts <= MAX_RATE_LIMIT_RETRIES => {
                    warn!("Release API rate limited, retrying in {}s", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
                Some(_) => return Err(StrataError::RateLimited { attempts }.into()),
                None => break response,
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StrataError::HttpStatus {
                operation: "release lookup".to_string(),
                status: status.to_string(),
            }
            .into());
        }

        let body = response.bytes().await.map_err(|e| self.transport_error(&e))?;
        let release: ReleaseDescriptor = serde_json::from_slice(&body).map_err(|e| {
            StrataError::InvalidReleaseResponse {
                reason: e.to_string(),
            }
        })?;

        info!("Latest release is {} with {} assets", release.tag, release.assets.len());
        Ok(release)
    }
}

/// Delay requested by a rate-limited response, if it is one we honor.
///
/// Only a positive integer number of seconds below [`MAX_RETRY_AFTER_SECS`]
/// qualifies; HTTP-date values and longer waits do not.
fn rate_limit_delay(headers: &HeaderMap) -> Option<Duration> {
    let seconds: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    (seconds > 0 && seconds < MAX_RETRY_AFTER_SECS).then(|| Duration::from_secs(seconds))
}

fn token_from_env() -> Option<String> {
    [TOKEN_ENV, FALLBACK_TOKEN_ENV]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}
