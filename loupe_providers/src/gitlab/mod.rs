//! GitLab merge request client over REST v4.

mod messages;

use std::fmt;

use loupe_api::{
    ChangeType, Review, ReviewComment, ReviewDiscussion, ReviewFileChanges, ReviewFileDiscussion,
    ReviewFileSummary, ReviewState, User,
};
use loupe_provider_api::{ProviderError, ProviderKind, ProviderResult, ReviewProvider};
use reqwest::header::HeaderMap;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use self::messages::*;
use crate::http::{self, HttpClient};
use crate::{epoch_millis, review_id_parts, ProviderEndpoints};

const TOKEN_HEADER: &str = "private-token";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PAGE_SIZE: &str = "100";

/// Client for one GitLab instance.
#[derive(Debug)]
pub struct GitlabClient {
    http: HttpClient,
    api: Url,
}

impl GitlabClient {
    /// Bind a client to the instance at `url` using a personal access `token`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidConfiguration` for unusable URLs or tokens.
    pub fn new(url: &str, token: &str, endpoints: &ProviderEndpoints) -> ProviderResult<Self> {
        let api = http::join(&http::base_url(url)?, "api/v4/")?;
        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, http::secret_header(token)?);
        let http = HttpClient::new(ProviderKind::Gitlab, endpoints, headers)?;

        Ok(Self { http, api })
    }

    fn url(&self, segments: &[&str]) -> ProviderResult<Url> {
        http::with_segments(&self.api, segments)
    }

    /// Collect every page of a list endpoint by following `X-Next-Page`.
    fn get_paged<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ProviderResult<Vec<T>> {
        let mut items = Vec::new();
        let mut page = String::from("1");
        loop {
            let mut url = self.url(segments)?;
            url.query_pairs_mut()
                .extend_pairs(query)
                .append_pair("per_page", PAGE_SIZE)
                .append_pair("page", &page);
            let response = self.http.send(self.http.get(url))?;
            let next = next_page(response.headers());
            let mut batch: Vec<T> = http::decode_json(response)?;
            items.append(&mut batch);

            match next {
                Some(next) => page = next,
                None => return Ok(items),
            }
        }
    }
}

impl ReviewProvider for GitlabClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gitlab
    }

    fn list_reviews(&self) -> ProviderResult<Vec<Review>> {
        let projects: Vec<Project> = self.get_paged(
            &["projects"],
            &[
                ("membership", "true"),
                ("with_merge_requests_enabled", "true"),
                ("simple", "true"),
            ],
        )?;
        debug!(projects = projects.len(), "listing merge requests");

        let mut reviews = Vec::new();
        for project in projects {
            let project_id = project.id.to_string();
            let merge_requests: Vec<MergeRequest> = self.get_paged(
                &["projects", &project_id, "merge_requests"],
                &[("state", "opened")],
            )?;
            reviews.extend(merge_requests.into_iter().map(map_review));
        }
        Ok(reviews)
    }

    fn list_discussions(&self, review_id: &str) -> ProviderResult<Vec<ReviewDiscussion>> {
        let id = ReviewId::parse(review_id)?;
        let (project, iid) = (id.project.to_string(), id.iid.to_string());
        let discussions: Vec<Discussion> = self.get_paged(
            &["projects", &project, "merge_requests", &iid, "discussions"],
            &[],
        )?;

        Ok(discussions.into_iter().filter_map(map_discussion).collect())
    }

    fn list_file_summaries(&self, review_id: &str) -> ProviderResult<Vec<ReviewFileSummary>> {
        let id = ReviewId::parse(review_id)?;
        let (project, iid) = (id.project.to_string(), id.iid.to_string());
        let url = self.url(&["projects", &project, "merge_requests", &iid, "changes"])?;
        let changes: MergeRequestChanges = self.http.send_json(self.http.get(url))?;

        Ok(map_changes(changes))
    }

    fn fetch_file(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> ProviderResult<ReviewFileChanges> {
        let id = ReviewId::parse(review_id)?;
        let project = id.project.to_string();
        let mut url = self.url(&["projects", &project, "repository", "files", file_path, "raw"])?;
        url.query_pairs_mut().append_pair("ref", revision);

        let response = self.http.send(self.http.get(url))?;
        let bytes = response.bytes().map_err(http::transport_error)?;
        let text = String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| {
            warn!(file_path, revision, "file is not valid UTF-8, returning empty text");
            String::new()
        });
        Ok(ReviewFileChanges::new(text))
    }
}

/// `project/iid` handle of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReviewId {
    project: u64,
    iid: u64,
}

impl ReviewId {
    fn parse(raw: &str) -> ProviderResult<Self> {
        let [project, iid] = review_id_parts::<2>(raw)?;
        let malformed = || ProviderError::not_found(format!("malformed review id '{raw}'"));
        Ok(Self {
            project: project.parse().map_err(|_| malformed())?,
            iid: iid.parse().map_err(|_| malformed())?,
        })
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.iid)
    }
}

fn next_page(headers: &HeaderMap) -> Option<String> {
    headers
        .get(NEXT_PAGE_HEADER)?
        .to_str()
        .ok()
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .map(str::to_owned)
}

fn user(account: Option<Account>) -> User {
    match account {
        Some(account) => User::new(
            account.name.filter(|name| !name.is_empty()).unwrap_or(account.username),
            account.avatar_url,
        ),
        None => User::new("unknown", None),
    }
}

// Approval rules are not read, so merge requests stay pending.
fn map_review(merge_request: MergeRequest) -> Review {
    let id = ReviewId {
        project: merge_request.project_id,
        iid: merge_request.iid,
    };
    Review {
        id: id.to_string(),
        title: merge_request.title,
        branch_name: merge_request.source_branch,
        authors: vec![user(merge_request.author)],
        reviewers: merge_request
            .reviewers
            .into_iter()
            .map(|account| user(Some(account)))
            .collect(),
        open: merge_request.state == "opened",
        state: ReviewState::Pending,
        created_at: merge_request.created_at.map(epoch_millis),
        updated_at: merge_request.updated_at.map(epoch_millis),
    }
}

/// Threads made only of system notes are dropped.
fn map_discussion(discussion: Discussion) -> Option<ReviewDiscussion> {
    let notes: Vec<Note> = discussion
        .notes
        .into_iter()
        .filter(|note| !note.system)
        .collect();
    let first = notes.first()?;

    let resolved = first.resolved.unwrap_or_default();
    let anchor = first.position.as_ref().and_then(|position| {
        let path = position.new_path.clone().or_else(|| position.old_path.clone())?;
        Some(ReviewFileDiscussion::new(
            path,
            position.head_sha.clone(),
            position.new_line.or(position.old_line),
        ))
    });
    let comments = notes
        .into_iter()
        .map(|note| ReviewComment {
            id: note.id.to_string(),
            user: user(note.author),
            text: note.body,
            timestamp: epoch_millis(note.created_at),
        })
        .collect();

    Some(ReviewDiscussion::new(discussion.id, comments, resolved, anchor))
}

fn map_changes(changes: MergeRequestChanges) -> Vec<ReviewFileSummary> {
    let revision = changes
        .diff_refs
        .and_then(|refs| refs.head_sha)
        .unwrap_or_default();

    changes
        .changes
        .into_iter()
        .map(|file| {
            let change_type = match (file.deleted_file, file.new_file) {
                (true, _) => ChangeType::Removed,
                (_, true) => ChangeType::Added,
                _ => ChangeType::Modified,
            };
            let (added, removed) = count_diff_lines(&file.diff);
            ReviewFileSummary::new(file.new_path, revision.clone(), change_type, added, removed)
        })
        .collect()
}

/// Added and removed line counts of a unified diff body without file headers.
fn count_diff_lines(diff: &str) -> (u32, u32) {
    diff.lines().fold((0, 0), |(added, removed), line| {
        if line.starts_with('+') {
            (added.saturating_add(1), removed)
        } else if line.starts_with('-') {
            (added, removed.saturating_add(1))
        } else {
            (added, removed)
        }
    })
}
