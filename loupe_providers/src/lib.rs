mod github;
mod gitlab;
mod http;
mod upsource;

use std::time::Duration;

pub use github::GithubClient;
pub use gitlab::GitlabClient;
pub use upsource::UpsourceClient;

use loupe_api::{ProviderModule, Review, ReviewDiscussion, ReviewFileChanges, ReviewFileSummary};
use loupe_provider_api::{ProviderKind, ProviderResult, ReviewProvider};

/// Default GitHub REST endpoint; GitHub Enterprise installs override it.
pub const GITHUB_API_URL: &str = "https://api.github.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Transport settings shared by every provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// Base URL of the GitHub REST API.
    pub github_api: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            github_api: GITHUB_API_URL.to_owned(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            user_agent: format!("loupe/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Closed set of provider clients, one variant per backend kind.
#[derive(Debug)]
pub enum ProviderClient {
    /// Upsource JSON-RPC client.
    Upsource(UpsourceClient),
    /// GitHub REST client.
    Github(GithubClient),
    /// GitLab REST client.
    Gitlab(GitlabClient),
}

impl ProviderClient {
    /// Build the client matching `module`, binding its credentials.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidConfiguration` for unusable URLs or tokens.
    pub fn connect(module: &ProviderModule, endpoints: &ProviderEndpoints) -> ProviderResult<Self> {
        let client = match module {
            ProviderModule::Upsource { url, token } => {
                Self::Upsource(UpsourceClient::new(url, token, endpoints)?)
            }
            ProviderModule::Github { token, query } => {
                Self::Github(GithubClient::new(token, query, endpoints)?)
            }
            ProviderModule::Gitlab { url, token } => {
                Self::Gitlab(GitlabClient::new(url, token, endpoints)?)
            }
        };
        Ok(client)
    }
}

macro_rules! dispatch {
    ($client:expr, $inner:ident => $call:expr) => {
        match $client {
            ProviderClient::Upsource($inner) => $call,
            ProviderClient::Github($inner) => $call,
            ProviderClient::Gitlab($inner) => $call,
        }
    };
}

impl ReviewProvider for ProviderClient {
    fn kind(&self) -> ProviderKind {
        dispatch!(self, client => client.kind())
    }

    fn list_reviews(&self) -> ProviderResult<Vec<Review>> {
        dispatch!(self, client => client.list_reviews())
    }

    fn list_discussions(&self, review_id: &str) -> ProviderResult<Vec<ReviewDiscussion>> {
        dispatch!(self, client => client.list_discussions(review_id))
    }

    fn list_file_summaries(&self, review_id: &str) -> ProviderResult<Vec<ReviewFileSummary>> {
        dispatch!(self, client => client.list_file_summaries(review_id))
    }

    fn fetch_file(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> ProviderResult<ReviewFileChanges> {
        dispatch!(self, client => client.fetch_file(review_id, file_path, revision))
    }

    fn supports_remote_read_state(&self) -> bool {
        dispatch!(self, client => client.supports_remote_read_state())
    }

    fn set_remote_read_state(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
        read: bool,
    ) -> ProviderResult<()> {
        dispatch!(self, client => client.set_remote_read_state(review_id, file_path, revision, read))
    }
}

/// Check that `raw` can serve as a backend base URL.
///
/// # Errors
///
/// Returns `ProviderError::InvalidConfiguration` unless `raw` is an absolute
/// `http` or `https` URL.
pub fn check_base_url(raw: &str) -> ProviderResult<()> {
    http::base_url(raw).map(drop)
}

/// Split a slash-separated review id into exactly `N` non-empty parts.
pub(crate) fn review_id_parts<const N: usize>(review_id: &str) -> ProviderResult<[&str; N]> {
    let parts: Vec<&str> = review_id.split('/').collect();
    if parts.len() != N || parts.iter().any(|part| part.is_empty()) {
        return Err(loupe_provider_api::ProviderError::not_found(format!(
            "malformed review id '{review_id}'"
        )));
    }
    let mut out = [""; N];
    out.copy_from_slice(&parts);
    Ok(out)
}

/// Milliseconds since the Unix epoch, clamping pre-epoch times to zero.
pub(crate) fn epoch_millis(time: chrono::DateTime<chrono::Utc>) -> u64 {
    u64::try_from(time.timestamp_millis()).unwrap_or_default()
}
