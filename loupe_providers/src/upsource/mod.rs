//! JetBrains Upsource client speaking the `~rpc` JSON-RPC protocol.

mod messages;

use std::collections::{BTreeSet, HashMap};

use loupe_api::{
    ChangeType, Review, ReviewComment, ReviewDiscussion, ReviewFileChanges, ReviewFileDiscussion,
    ReviewFileSummary, ReviewState, User,
};
use loupe_provider_api::{ProviderKind, ProviderResult, ReviewProvider};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;

use self::messages::*;
use crate::http::{self, HttpClient};
use crate::ProviderEndpoints;

const REVIEW_PAGE_SIZE: u32 = 20;

/// Client for a single Upsource server.
#[derive(Debug)]
pub struct UpsourceClient {
    http: HttpClient,
    base: Url,
}

impl UpsourceClient {
    /// Bind a client to `url` authenticating with a bearer `token`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidConfiguration` for unusable URLs or tokens.
    pub fn new(url: &str, token: &str, endpoints: &ProviderEndpoints) -> ProviderResult<Self> {
        let base = http::base_url(url)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, http::secret_header(&format!("Bearer {token}"))?);
        let http = HttpClient::new(ProviderKind::Upsource, endpoints, headers)?;

        Ok(Self { http, base })
    }

    fn rpc<T: DeserializeOwned>(&self, method: &str, body: &impl Serialize) -> ProviderResult<T> {
        let url = http::join(&self.base, &format!("~rpc/{method}"))?;
        let response: ApiResult<T> = self.http.send_json(self.http.post(url).json(body))?;
        Ok(response.result)
    }

    fn user_directory<'a>(
        &self,
        user_ids: impl Iterator<Item = &'a str>,
    ) -> ProviderResult<UserDirectory> {
        let ids: BTreeSet<&str> = user_ids.collect();
        if ids.is_empty() {
            return Ok(UserDirectory::default());
        }

        let request = UserInfoRequest {
            ids: ids.into_iter().map(str::to_owned).collect(),
        };
        let response: UserInfoResponse = self.rpc("getUserInfo", &request)?;
        Ok(UserDirectory::from(response))
    }
}

impl ReviewProvider for UpsourceClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Upsource
    }

    fn list_reviews(&self) -> ProviderResult<Vec<Review>> {
        let request = ReviewsRequest {
            limit: REVIEW_PAGE_SIZE,
            ..ReviewsRequest::default()
        };
        let list: ReviewList = self.rpc("getReviews", &request)?;
        let users = self.user_directory(
            list.reviews
                .iter()
                .flat_map(|review| review.participants.iter())
                .map(|participant| participant.user_id.as_str()),
        )?;

        Ok(list
            .reviews
            .into_iter()
            .map(|review| map_review(review, &users))
            .collect())
    }

    fn list_discussions(&self, review_id: &str) -> ProviderResult<Vec<ReviewDiscussion>> {
        let request = ReviewRevisionsRequest {
            review_id: ReviewIdDto::parse(review_id)?,
            revisions: RevisionsSet::all(),
        };
        let response: DiscussionsInFiles = self.rpc("getReviewSummaryDiscussions", &request)?;
        let users = self.user_directory(
            response
                .discussions
                .iter()
                .flat_map(|discussion| discussion.discussion_in_file.comments.iter())
                .map(|comment| comment.author_id.as_str()),
        )?;

        Ok(response
            .discussions
            .into_iter()
            .map(|discussion| map_discussion(discussion, &users))
            .collect())
    }

    fn list_file_summaries(&self, review_id: &str) -> ProviderResult<Vec<ReviewFileSummary>> {
        let request = ReviewRevisionsRequest {
            review_id: ReviewIdDto::parse(review_id)?,
            revisions: RevisionsSet::all(),
        };
        let changes: ReviewSummaryChanges = self.rpc("getReviewSummaryChanges", &request)?;
        Ok(map_file_summaries(changes))
    }

    fn fetch_file(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> ProviderResult<ReviewFileChanges> {
        let review_id = ReviewIdDto::parse(review_id)?;
        let request = FileInReviewDiffRequest {
            file: FileInReview {
                file: FileInRevision {
                    project_id: review_id.project_id.clone(),
                    revision_id: revision.to_owned(),
                    file_name: file_path.to_owned(),
                },
                review_id,
            },
            ignore_whitespace: false,
            revisions: RevisionsSet::all(),
        };
        let response: FileInlineDiffResponse =
            self.rpc("getFileInReviewSummaryInlineChanges", &request)?;
        Ok(ReviewFileChanges::new(response.text))
    }

    fn supports_remote_read_state(&self) -> bool {
        true
    }

    fn set_remote_read_state(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
        read: bool,
    ) -> ProviderResult<()> {
        let request = FileInReviewReadStatusRequest {
            review_id: ReviewIdDto::parse(review_id)?,
            file: file_path.to_owned(),
            revisions: RevisionsSet::single(revision),
            mark_as_unread: !read,
        };
        let _: VoidMessage = self.rpc("setFileInReviewReadStatus", &request)?;
        Ok(())
    }
}

/// Resolved Upsource user profiles keyed by user id.
#[derive(Debug, Default)]
struct UserDirectory(HashMap<String, User>);

impl UserDirectory {
    fn user(&self, id: &str) -> User {
        self.0
            .get(id)
            .cloned()
            .unwrap_or_else(|| User::new(id, None))
    }
}

impl From<UserInfoResponse> for UserDirectory {
    fn from(response: UserInfoResponse) -> Self {
        Self(
            response
                .infos
                .into_iter()
                .map(|info| (info.user_id, User::new(info.name, info.avatar_url)))
                .collect(),
        )
    }
}

fn map_review(review: ReviewDescriptor, users: &UserDirectory) -> Review {
    let (authors, others): (Vec<_>, Vec<_>) = review
        .participants
        .into_iter()
        .partition(|participant| participant.role == ROLE_AUTHOR);
    let reviewers: Vec<_> = others
        .into_iter()
        .filter(|participant| participant.role == ROLE_REVIEWER)
        .collect();

    let state = ReviewState::aggregate(reviewers.iter().map(|reviewer| match reviewer.state {
        Some(PARTICIPANT_ACCEPTED) => ReviewState::Approved,
        Some(PARTICIPANT_REJECTED) => ReviewState::Rejected,
        _ => ReviewState::Pending,
    }));

    Review {
        id: review.review_id.to_string(),
        title: review.title,
        branch_name: review.branch.into_iter().next().unwrap_or_default(),
        authors: authors
            .iter()
            .map(|author| users.user(&author.user_id))
            .collect(),
        reviewers: reviewers
            .iter()
            .map(|reviewer| users.user(&reviewer.user_id))
            .collect(),
        open: review.state == REVIEW_OPEN,
        state,
        created_at: review.created_at,
        updated_at: review.updated_at,
    }
}

fn map_discussion(discussion: DiscussionInFileWithFile, users: &UserDirectory) -> ReviewDiscussion {
    let thread = discussion.discussion_in_file;
    let comments = thread
        .comments
        .into_iter()
        .map(|comment| ReviewComment {
            user: users.user(&comment.author_id),
            id: comment.comment_id,
            text: comment.text,
            timestamp: comment.date,
        })
        .collect();
    let anchor = ReviewFileDiscussion::new(discussion.file_name, discussion.revision_id, None);

    ReviewDiscussion::new(
        thread.discussion_id,
        comments,
        thread.is_resolved.unwrap_or_default(),
        Some(anchor),
    )
}

fn map_file_summaries(changes: ReviewSummaryChanges) -> Vec<ReviewFileSummary> {
    let diff_items = changes.diff.map(|diff| diff.diff).unwrap_or_default();

    changes
        .file_diff_summary
        .into_iter()
        .map(|summary| {
            let item = diff_items
                .iter()
                .find(|item| item.new_file.file_name == summary.file.file_name);
            let change_type = match item.map(|item| item.diff_type) {
                Some(DIFF_ADDED) => ChangeType::Added,
                Some(DIFF_REMOVED) => ChangeType::Removed,
                _ => ChangeType::Modified,
            };

            let mut file = ReviewFileSummary::new(
                summary.file.file_name,
                summary.file.revision_id,
                change_type,
                summary.added_lines,
                summary.removed_lines,
            );
            file.is_read = item.is_some_and(|item| item.is_read);
            file
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        let response: UserInfoResponse = serde_json::from_str(
            r#"{"infos": [
                {"userId": "u1", "name": "Alice", "avatarUrl": "https://img/alice"},
                {"userId": "u2", "name": "Bob"}
            ]}"#,
        )
        .expect("user info");
        UserDirectory::from(response)
    }

    #[test]
    fn review_splits_participants_and_aggregates_state() {
        let review: ReviewDescriptor = serde_json::from_str(
            r#"{
                "reviewId": {"projectId": "app", "reviewId": "APP-CR-12"},
                "title": "Login screen",
                "participants": [
                    {"userId": "u1", "role": 1},
                    {"userId": "u2", "role": 2, "state": 4},
                    {"userId": "u3", "role": 3}
                ],
                "state": 1,
                "branch": ["feature/login"],
                "createdAt": 1700000000000,
                "updatedAt": 1700000500000
            }"#,
        )
        .expect("review descriptor");

        let review = map_review(review, &directory());
        assert_eq!(review.id, "app/APP-CR-12");
        assert_eq!(review.branch_name, "feature/login");
        assert!(review.open);
        assert_eq!(review.state, ReviewState::Rejected);
        assert_eq!(review.authors, [User::new("Alice", Some("https://img/alice".into()))]);
        assert_eq!(review.reviewers, [User::new("Bob", None)]);
        assert_eq!(review.updated_at, Some(1_700_000_500_000));
    }

    #[test]
    fn unknown_users_fall_back_to_id() {
        assert_eq!(directory().user("ghost").name, "ghost");
    }

    #[test]
    fn discussion_is_anchored_to_file() {
        let discussion: DiscussionInFileWithFile = serde_json::from_str(
            r#"{
                "revisionId": "r2",
                "fileName": "/lib/main.dart",
                "discussionInFile": {
                    "discussionId": "d1",
                    "isResolved": true,
                    "comments": [
                        {"commentId": "c2", "text": "done", "authorId": "u1", "date": 20},
                        {"commentId": "c1", "text": "why?", "authorId": "u2", "date": 10}
                    ]
                }
            }"#,
        )
        .expect("discussion");

        let discussion = map_discussion(discussion, &directory());
        assert!(discussion.resolved);
        assert_eq!(discussion.comments[0].id, "c1");
        assert_eq!(discussion.participants[0].name, "Bob");
        let anchor = discussion.file.expect("anchor");
        assert_eq!(anchor.file_name, "main.dart");
        assert_eq!(anchor.file_path_segments, ["lib"]);
        assert_eq!(anchor.revision.as_deref(), Some("r2"));
    }

    #[test]
    fn file_summaries_use_matching_diff_item() {
        let changes: ReviewSummaryChanges = serde_json::from_str(
            r#"{
                "diff": {"diff": [
                    {"projectId": "app", "diffType": 1, "isRead": true,
                     "newFile": {"projectId": "app", "revisionId": "r2", "fileName": "/lib/a.dart"}}
                ]},
                "fileDiffSummary": [
                    {"file": {"projectId": "app", "revisionId": "r2", "fileName": "/lib/a.dart"},
                     "addedLines": 12, "removedLines": 0},
                    {"file": {"projectId": "app", "revisionId": "r2", "fileName": "/lib/b.dart"},
                     "addedLines": 1, "removedLines": 3}
                ]
            }"#,
        )
        .expect("summary changes");

        let files = map_file_summaries(changes);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].change_type, ChangeType::Added);
        assert!(files[0].is_read);
        assert_eq!(files[1].change_type, ChangeType::Modified);
        assert!(!files[1].is_read);
        assert_eq!(files[1].removed_lines, 3);
    }

    #[test]
    fn review_id_round_trips() {
        let id = ReviewIdDto::parse("app/APP-CR-1").expect("valid id");
        assert_eq!(id.to_string(), "app/APP-CR-1");
        assert!(ReviewIdDto::parse("APP-CR-1").is_err());
    }

    #[test]
    fn read_status_request_shape() {
        let request = FileInReviewReadStatusRequest {
            review_id: ReviewIdDto::parse("app/APP-CR-1").expect("valid id"),
            file: "/lib/a.dart".into(),
            revisions: RevisionsSet::single("r2"),
            mark_as_unread: true,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json["markAsUnread"], true);
        assert_eq!(json["revisions"]["revisions"][0], "r2");
        assert!(json["revisions"].get("selectAll").is_none());
    }
}
