//! GitHub pull request client over the REST v3 API.
//!
//! Viewed-file markers are only exposed through GraphQL, so
//! [`ReviewProvider::set_remote_read_state`] posts a mutation there.

mod messages;

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::thread;

use loupe_api::{
    ChangeType, Review, ReviewComment, ReviewDiscussion, ReviewFileChanges, ReviewFileDiscussion,
    ReviewFileSummary, ReviewState, User,
};
use loupe_provider_api::{ProviderError, ProviderKind, ProviderResult, ReviewProvider};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use self::messages::*;
use crate::http::{self, HttpClient};
use crate::{epoch_millis, review_id_parts, ProviderEndpoints};

const SEARCH_PAGE_SIZE: &str = "20";
const LIST_PAGE_SIZE: &str = "100";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";
const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const DELETED_USER: &str = "ghost";

const MARK_VIEWED: &str = "mutation($pullRequestId: ID!, $path: String!) { \
    markFileAsViewed(input: {pullRequestId: $pullRequestId, path: $path}) { clientMutationId } }";
const UNMARK_VIEWED: &str = "mutation($pullRequestId: ID!, $path: String!) { \
    unmarkFileAsViewed(input: {pullRequestId: $pullRequestId, path: $path}) { clientMutationId } }";

/// Client for pull requests matched by a GitHub search query.
#[derive(Debug)]
pub struct GithubClient {
    http: HttpClient,
    api: Url,
    graphql: Url,
    query: String,
}

impl GithubClient {
    /// Bind a client to `token`, listing pull requests matched by `query`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::InvalidConfiguration` for unusable tokens or API URLs.
    pub fn new(token: &str, query: &str, endpoints: &ProviderEndpoints) -> ProviderResult<Self> {
        let api = http::base_url(&endpoints.github_api)?;
        let graphql = graphql_url(&api)?;
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, http::secret_header(&format!("Bearer {token}"))?);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_MEDIA_TYPE));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(API_VERSION));
        let http = HttpClient::new(ProviderKind::Github, endpoints, headers)?;

        Ok(Self {
            http,
            api,
            graphql,
            query: query.to_owned(),
        })
    }

    fn repo_url(&self, id: &ReviewId, tail: &[&str]) -> ProviderResult<Url> {
        let mut segments = vec!["repos", id.owner.as_str(), id.repo.as_str()];
        segments.extend_from_slice(tail);
        http::with_segments(&self.api, &segments)
    }

    fn pull_url(&self, id: &ReviewId, tail: &[&str]) -> ProviderResult<Url> {
        let number = id.number.to_string();
        let mut segments = vec!["pulls", number.as_str()];
        segments.extend_from_slice(tail);
        self.repo_url(id, &segments)
    }

    /// Collect every page of a list endpoint by following `Link: rel="next"`.
    fn get_paged<T: DeserializeOwned>(&self, mut url: Url) -> ProviderResult<Vec<T>> {
        url.query_pairs_mut().append_pair("per_page", LIST_PAGE_SIZE);

        let mut items = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next {
            let response = self.http.send(self.http.get(url))?;
            next = http::next_link(response.headers());
            let mut page: Vec<T> = http::decode_json(response)?;
            items.append(&mut page);
        }
        Ok(items)
    }

    fn pull(&self, id: &ReviewId) -> ProviderResult<PullRequest> {
        self.http.send_json(self.http.get(self.pull_url(id, &[])?))
    }

    fn pull_details(&self, item: SearchItem) -> ProviderResult<PullDetails> {
        let (owner, repo) = repository_from_url(&item.repository_url)?;
        let id = ReviewId {
            owner,
            repo,
            number: item.number,
        };
        let pull = self.pull(&id)?;
        let reviews: Vec<PullReview> = self.get_paged(self.pull_url(&id, &["reviews"])?)?;

        Ok(PullDetails {
            id,
            item,
            pull,
            reviews,
        })
    }

    /// Look up the profile of every distinct login among `accounts`.
    fn profiles<'a>(&self, accounts: impl IntoIterator<Item = &'a Account>) -> ProviderResult<Profiles> {
        let logins: BTreeSet<&str> = accounts
            .into_iter()
            .map(|account| account.login.as_str())
            .collect();
        debug!(count = logins.len(), "resolving github profiles");

        let resolved = parallel(logins.into_iter().collect(), |login| self.profile(login))?;
        Ok(Profiles(resolved.into_iter().flatten().collect()))
    }

    fn profile(&self, login: &str) -> ProviderResult<Option<(String, User)>> {
        let url = http::with_segments(&self.api, &["users", login])?;
        match self.http.send_json::<Profile>(self.http.get(url)) {
            Ok(profile) => {
                let name = profile
                    .name
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(profile.login);
                Ok(Some((login.to_owned(), User::new(name, profile.avatar_url))))
            }
            Err(ProviderError::NotFound { .. }) => {
                warn!(login, "github profile not found, showing login");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

impl ReviewProvider for GithubClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Github
    }

    fn list_reviews(&self) -> ProviderResult<Vec<Review>> {
        let mut url = http::with_segments(&self.api, &["search", "issues"])?;
        url.query_pairs_mut()
            .append_pair("q", &self.query)
            .append_pair("sort", "created")
            .append_pair("order", "desc")
            .append_pair("per_page", SEARCH_PAGE_SIZE);
        let results: SearchResults = self.http.send_json(self.http.get(url))?;

        let items: Vec<SearchItem> = results
            .items
            .into_iter()
            .filter(|item| item.pull_request.is_some())
            .collect();
        let pulls = parallel(items, |item| self.pull_details(item))?;
        let profiles = self.profiles(pulls.iter().flat_map(PullDetails::accounts))?;

        Ok(pulls
            .into_iter()
            .map(|details| map_review(details, &profiles))
            .collect())
    }

    fn list_discussions(&self, review_id: &str) -> ProviderResult<Vec<ReviewDiscussion>> {
        let id = ReviewId::parse(review_id)?;
        let mut url = self.pull_url(&id, &["comments"])?;
        url.query_pairs_mut()
            .append_pair("sort", "created")
            .append_pair("direction", "asc");
        let comments: Vec<PullComment> = self.get_paged(url)?;
        let profiles = self.profiles(comments.iter().filter_map(|comment| comment.user.as_ref()))?;

        Ok(group_threads(comments, &profiles))
    }

    fn list_file_summaries(&self, review_id: &str) -> ProviderResult<Vec<ReviewFileSummary>> {
        let id = ReviewId::parse(review_id)?;
        let files: Vec<PullFile> = self.get_paged(self.pull_url(&id, &["files"])?)?;

        Ok(files.into_iter().map(map_file).collect())
    }

    fn fetch_file(
        &self,
        review_id: &str,
        file_path: &str,
        revision: &str,
    ) -> ProviderResult<ReviewFileChanges> {
        let id = ReviewId::parse(review_id)?;
        let mut segments = vec!["contents"];
        segments.extend(file_path.split('/').filter(|segment| !segment.is_empty()));
        let mut url = self.repo_url(&id, &segments)?;
        url.query_pairs_mut().append_pair("ref", revision);

        let response = self.http.send(
            self.http
                .get(url)
                .header(ACCEPT, HeaderValue::from_static(RAW_MEDIA_TYPE)),
        )?;
        let bytes = response.bytes().map_err(http::transport_error)?;

        let text = String::from_utf8(bytes.to_vec()).unwrap_or_else(|_| {
            warn!(file_path, revision, "file is not valid UTF-8, returning empty text");
            String::new()
        });
        Ok(ReviewFileChanges::new(text))
    }

    fn supports_remote_read_state(&self) -> bool {
        true
    }

    /// GitHub tracks viewed files per pull request head, so `revision` is not sent.
    fn set_remote_read_state(
        &self,
        review_id: &str,
        file_path: &str,
        _revision: &str,
        read: bool,
    ) -> ProviderResult<()> {
        let id = ReviewId::parse(review_id)?;
        let node_id = self
            .pull(&id)?
            .node_id
            .ok_or_else(|| ProviderError::serialization(format!("pull request {id} has no node id")))?;

        let request = GraphqlRequest {
            query: if read { MARK_VIEWED } else { UNMARK_VIEWED },
            variables: ViewedFile {
                pull_request_id: &node_id,
                path: file_path,
            },
        };
        let response: GraphqlResponse = self
            .http
            .send_json(self.http.post(self.graphql.clone()).json(&request))?;
        graphql_failure(response.errors).map_or(Ok(()), Err)
    }
}

/// `owner/repo/number` handle of a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ReviewId {
    owner: String,
    repo: String,
    number: u64,
}

impl ReviewId {
    fn parse(raw: &str) -> ProviderResult<Self> {
        let [owner, repo, number] = review_id_parts::<3>(raw)?;
        let number = number
            .parse()
            .map_err(|_| ProviderError::not_found(format!("malformed review id '{raw}'")))?;
        Ok(Self {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            number,
        })
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.owner, self.repo, self.number)
    }
}

/// Everything fetched for one search hit before users are resolved.
#[derive(Debug)]
struct PullDetails {
    id: ReviewId,
    item: SearchItem,
    pull: PullRequest,
    reviews: Vec<PullReview>,
}

impl PullDetails {
    fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.pull
            .user
            .iter()
            .chain(self.item.user.iter())
            .chain(self.pull.requested_reviewers.iter())
            .chain(self.reviews.iter().filter_map(|review| review.user.as_ref()))
    }
}

/// Resolved profiles keyed by login.
#[derive(Debug, Default)]
struct Profiles(HashMap<String, User>);

impl Profiles {
    /// Profile of `account`, its bare login when unresolved, or the deleted-user placeholder.
    fn user(&self, account: Option<&Account>) -> User {
        let Some(account) = account else {
            return User::new(DELETED_USER, None);
        };
        self.0.get(&account.login).cloned().unwrap_or_else(|| {
            User::new(account.login.clone(), account.avatar_url.clone())
        })
    }
}

/// Run `task` for every item on scoped threads, keeping input order.
fn parallel<T, R>(items: Vec<T>, task: impl Fn(T) -> ProviderResult<R> + Sync) -> ProviderResult<Vec<R>>
where
    T: Send,
    R: Send,
{
    thread::scope(|scope| {
        let task = &task;
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| scope.spawn(move || task(item)))
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(ProviderError::unavailable("github worker panicked")))
            })
            .collect()
    })
}

/// GraphQL endpoint next to the REST base; Enterprise serves REST under `api/v3`.
fn graphql_url(api: &Url) -> ProviderResult<Url> {
    let path = if api.path().ends_with("/v3/") {
        "../graphql"
    } else {
        "graphql"
    };
    http::join(api, path)
}

fn graphql_failure(errors: Vec<GraphqlError>) -> Option<ProviderError> {
    let kind = errors.first()?.kind.clone();
    let message = errors
        .into_iter()
        .map(|error| error.message)
        .collect::<Vec<_>>()
        .join("; ");
    Some(match kind.as_deref() {
        Some("NOT_FOUND") => ProviderError::not_found(message),
        Some("FORBIDDEN") => ProviderError::AuthFailure { message },
        Some("RATE_LIMITED") => ProviderError::RateLimited { retry_after: None },
        _ => ProviderError::unavailable(message),
    })
}

/// Owner and repository name from a `…/repos/{owner}/{repo}` API URL.
fn repository_from_url(raw: &str) -> ProviderResult<(String, String)> {
    let url = Url::parse(raw)
        .map_err(|err| ProviderError::serialization(format!("bad repository url '{raw}': {err}")))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [.., owner, repo] => Ok(((*owner).to_owned(), (*repo).to_owned())),
        _ => Err(ProviderError::serialization(format!(
            "bad repository url '{raw}'"
        ))),
    }
}

fn map_review(details: PullDetails, profiles: &Profiles) -> Review {
    let PullDetails {
        id,
        item,
        pull,
        reviews,
    } = details;
    let author = pull.user.as_ref().or(item.user.as_ref());
    let author_login = author.map(|account| account.login.as_str());

    let mut reviewers: Vec<&Account> = Vec::new();
    let mut verdicts: HashMap<&str, ReviewState> = HashMap::new();
    for review in &reviews {
        let Some(account) = review.user.as_ref() else {
            continue;
        };
        if Some(account.login.as_str()) == author_login {
            continue;
        }
        if !reviewers.iter().any(|known| known.login == account.login) {
            reviewers.push(account);
        }
        let verdict = match review.state.as_str() {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::Rejected,
            "DISMISSED" => ReviewState::Pending,
            _ => continue,
        };
        verdicts.insert(account.login.as_str(), verdict);
    }
    for account in &pull.requested_reviewers {
        if !reviewers.iter().any(|known| known.login == account.login) {
            reviewers.push(account);
        }
    }

    Review {
        id: id.to_string(),
        title: item.title,
        branch_name: pull.head.name.clone(),
        authors: vec![profiles.user(author)],
        reviewers: reviewers
            .into_iter()
            .map(|account| profiles.user(Some(account)))
            .collect(),
        open: item.closed_at.is_none(),
        state: ReviewState::aggregate(verdicts.into_values()),
        created_at: item.created_at.map(epoch_millis),
        updated_at: item.updated_at.map(epoch_millis),
    }
}

/// Group flat review comments into threads rooted at comments without a parent.
fn group_threads(mut comments: Vec<PullComment>, profiles: &Profiles) -> Vec<ReviewDiscussion> {
    comments.sort_by_key(|comment| (comment.created_at, comment.id));

    let mut threads: Vec<(u64, ReviewFileDiscussion, Vec<ReviewComment>)> = Vec::new();
    let mut thread_of: HashMap<u64, usize> = HashMap::new();
    for comment in comments {
        let index = match comment.in_reply_to_id {
            None => {
                let anchor = ReviewFileDiscussion::new(
                    comment.path.clone(),
                    Some(comment.commit_id.clone()),
                    comment.line.or(comment.original_line),
                );
                threads.push((comment.id, anchor, Vec::new()));
                threads.len() - 1
            }
            Some(parent) => {
                if let Some(&index) = thread_of.get(&parent) {
                    index
                } else {
                    warn!(comment = comment.id, parent, "dropping reply to unknown review comment");
                    continue;
                }
            }
        };
        thread_of.insert(comment.id, index);
        threads[index].2.push(ReviewComment {
            id: comment.id.to_string(),
            user: profiles.user(comment.user.as_ref()),
            text: comment.body,
            timestamp: epoch_millis(comment.created_at),
        });
    }

    threads
        .into_iter()
        .map(|(root, anchor, comments)| {
            ReviewDiscussion::new(root.to_string(), comments, false, Some(anchor))
        })
        .collect()
}

fn map_file(file: PullFile) -> ReviewFileSummary {
    let change_type = match file.status.as_str() {
        "added" => ChangeType::Added,
        "removed" => ChangeType::Removed,
        _ => ChangeType::Modified,
    };
    let revision = file
        .contents_url
        .as_deref()
        .and_then(|raw| Url::parse(raw).ok())
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == "ref")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default();

    ReviewFileSummary::new(
        file.filename,
        revision,
        change_type,
        file.additions,
        file.deletions,
    )
}
