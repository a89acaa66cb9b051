//! Upsource JSON-RPC payloads, trimmed to the fields Loupe reads.

use std::fmt;

use loupe_provider_api::ProviderResult;
use serde::{Deserialize, Serialize};

use crate::review_id_parts;

pub(super) const ROLE_AUTHOR: u8 = 1;
pub(super) const ROLE_REVIEWER: u8 = 2;
pub(super) const PARTICIPANT_ACCEPTED: u8 = 3;
pub(super) const PARTICIPANT_REJECTED: u8 = 4;
pub(super) const REVIEW_OPEN: u8 = 1;
pub(super) const DIFF_ADDED: u8 = 1;
pub(super) const DIFF_REMOVED: u8 = 2;

#[derive(Debug, Deserialize)]
pub(super) struct ApiResult<T> {
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub(super) struct VoidMessage {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewIdDto {
    pub project_id: String,
    pub review_id: String,
}

impl ReviewIdDto {
    pub(super) fn parse(raw: &str) -> ProviderResult<Self> {
        let [project_id, review_id] = review_id_parts::<2>(raw)?;
        Ok(Self {
            project_id: project_id.to_owned(),
            review_id: review_id.to_owned(),
        })
    }
}

impl fmt::Display for ReviewIdDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_id, self.review_id)
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewsRequest {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewList {
    #[serde(default)]
    pub reviews: Vec<ReviewDescriptor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewDescriptor {
    pub review_id: ReviewIdDto,
    pub title: String,
    #[serde(default)]
    pub participants: Vec<Participant>,
    pub state: u8,
    #[serde(default)]
    pub branch: Vec<String>,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(default)]
    pub updated_at: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Participant {
    pub user_id: String,
    pub role: u8,
    #[serde(default)]
    pub state: Option<u8>,
}

#[derive(Debug, Serialize)]
pub(super) struct UserInfoRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct UserInfoResponse {
    #[serde(default)]
    pub infos: Vec<FullUserInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FullUserInfo {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RevisionsSet {
    pub revisions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_all: Option<bool>,
}

impl RevisionsSet {
    pub(super) const fn all() -> Self {
        Self {
            revisions: Vec::new(),
            select_all: Some(true),
        }
    }

    pub(super) fn single(revision: &str) -> Self {
        Self {
            revisions: vec![revision.to_owned()],
            select_all: None,
        }
    }
}

/// Body shared by `getReviewSummaryDiscussions` and `getReviewSummaryChanges`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewRevisionsRequest {
    pub review_id: ReviewIdDto,
    pub revisions: RevisionsSet,
}

#[derive(Debug, Deserialize)]
pub(super) struct DiscussionsInFiles {
    #[serde(default)]
    pub discussions: Vec<DiscussionInFileWithFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DiscussionInFileWithFile {
    #[serde(default)]
    pub revision_id: Option<String>,
    pub file_name: String,
    pub discussion_in_file: DiscussionInFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DiscussionInFile {
    pub discussion_id: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_resolved: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Comment {
    pub comment_id: String,
    pub text: String,
    pub author_id: String,
    pub date: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ReviewSummaryChanges {
    #[serde(default)]
    pub diff: Option<RevisionsDiff>,
    #[serde(default)]
    pub file_diff_summary: Vec<FileDiffSummary>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RevisionsDiff {
    #[serde(default)]
    pub diff: Vec<RevisionDiffItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RevisionDiffItem {
    pub diff_type: u8,
    pub new_file: FileInRevision,
    #[serde(default)]
    pub is_read: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileDiffSummary {
    pub file: FileInRevision,
    #[serde(default)]
    pub added_lines: u32,
    #[serde(default)]
    pub removed_lines: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileInRevision {
    pub project_id: String,
    pub revision_id: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileInReview {
    pub review_id: ReviewIdDto,
    pub file: FileInRevision,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileInReviewDiffRequest {
    pub file: FileInReview,
    pub ignore_whitespace: bool,
    pub revisions: RevisionsSet,
}

#[derive(Debug, Deserialize)]
pub(super) struct FileInlineDiffResponse {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct FileInReviewReadStatusRequest {
    pub review_id: ReviewIdDto,
    pub file: String,
    pub revisions: RevisionsSet,
    pub mark_as_unread: bool,
}
