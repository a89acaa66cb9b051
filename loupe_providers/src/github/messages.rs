//! GitHub REST v3 payloads, trimmed to the fields Loupe reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub(super) struct Account {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchResults {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchItem {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub user: Option<Account>,
    pub repository_url: String,
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Profile {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PullRequest {
    /// GraphQL id, needed for the viewed-file mutations.
    #[serde(default)]
    pub node_id: Option<String>,
    pub head: BranchRef,
    #[serde(default)]
    pub user: Option<Account>,
    #[serde(default)]
    pub requested_reviewers: Vec<Account>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BranchRef {
    #[serde(rename = "ref")]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PullReview {
    #[serde(default)]
    pub user: Option<Account>,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct PullComment {
    pub id: u64,
    #[serde(default)]
    pub in_reply_to_id: Option<u64>,
    pub path: String,
    pub commit_id: String,
    pub body: String,
    #[serde(default)]
    pub user: Option<Account>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub original_line: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(super) struct PullFile {
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub contents_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct GraphqlRequest<'a> {
    pub query: &'a str,
    pub variables: ViewedFile<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ViewedFile<'a> {
    pub pull_request_id: &'a str,
    pub path: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct GraphqlResponse {
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct GraphqlError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}
