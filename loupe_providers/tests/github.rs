use loupe_api::{ChangeType, ReviewState};
use loupe_provider_api::{ProviderError, ReviewProvider};
use loupe_providers::{GithubClient, ProviderEndpoints};
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

fn client(server: &ServerGuard, query: &str) -> GithubClient {
    let endpoints = ProviderEndpoints {
        github_api: server.url(),
        ..ProviderEndpoints::default()
    };
    GithubClient::new("gh-token", query, &endpoints).expect("github client")
}

fn profile(server: &mut ServerGuard, login: &str, name: Option<&str>) -> Mock {
    server
        .mock("GET", format!("/users/{login}").as_str())
        .expect(1)
        .with_body(
            json!({
                "login": login,
                "name": name,
                "avatar_url": format!("https://avatars/{login}")
            })
            .to_string(),
        )
        .create()
}

#[test]
fn lists_pull_requests_with_paged_reviews_and_profiles() {
    let mut server = Server::new();
    let next_page = format!(
        "<{}/repos/acme/app/pulls/7/reviews?per_page=100&page=2>; rel=\"next\"",
        server.url()
    );

    let search = server
        .mock("GET", "/search/issues")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "is:open is:pr".into()),
            Matcher::UrlEncoded("sort".into(), "created".into()),
            Matcher::UrlEncoded("per_page".into(), "20".into()),
        ]))
        .match_header("authorization", "Bearer gh-token")
        .match_header("accept", "application/vnd.github+json")
        .expect(1)
        .with_body(
            json!({
                "total_count": 2,
                "items": [
                    {
                        "number": 7,
                        "title": "Fix crash on launch",
                        "user": {"login": "octocat"},
                        "repository_url": "https://api.github.com/repos/acme/app",
                        "pull_request": {"url": "https://api.github.com/repos/acme/app/pulls/7"},
                        "closed_at": null,
                        "created_at": "2024-05-01T09:00:00Z",
                        "updated_at": "2024-05-01T10:00:00Z"
                    },
                    {
                        "number": 8,
                        "title": "An ordinary issue",
                        "user": {"login": "octocat"},
                        "repository_url": "https://api.github.com/repos/acme/app",
                        "closed_at": null
                    }
                ]
            })
            .to_string(),
        )
        .create();
    let _pull = server
        .mock("GET", "/repos/acme/app/pulls/7")
        .with_body(
            json!({
                "node_id": "PR_7",
                "head": {"ref": "fix/launch"},
                "user": {"login": "octocat", "avatar_url": "https://avatars/octocat"},
                "requested_reviewers": []
            })
            .to_string(),
        )
        .create();
    let first_page = server
        .mock("GET", "/repos/acme/app/pulls/7/reviews")
        .match_query(Matcher::Regex("^per_page=100$".into()))
        .with_header("link", &next_page)
        .with_body(json!([{"user": {"login": "alice"}, "state": "APPROVED"}]).to_string())
        .create();
    let second_page = server
        .mock("GET", "/repos/acme/app/pulls/7/reviews")
        .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
        .with_body(json!([{"user": {"login": "bob"}, "state": "CHANGES_REQUESTED"}]).to_string())
        .create();
    let alice = profile(&mut server, "alice", Some("Alice Liddell"));
    let bob = profile(&mut server, "bob", None);
    let octocat = server
        .mock("GET", "/users/octocat")
        .expect(1)
        .with_status(404)
        .with_body(json!({"message": "Not Found"}).to_string())
        .create();

    let reviews = client(&server, "is:open is:pr").list_reviews().expect("reviews");

    assert_eq!(reviews.len(), 1);
    let review = &reviews[0];
    assert_eq!(review.id, "acme/app/7");
    assert_eq!(review.branch_name, "fix/launch");
    assert_eq!(review.state, ReviewState::Rejected);
    assert_eq!(review.authors[0].name, "octocat");
    assert_eq!(
        review.authors[0].avatar_url.as_deref(),
        Some("https://avatars/octocat")
    );
    let reviewers: Vec<_> = review.reviewers.iter().map(|user| user.name.as_str()).collect();
    assert_eq!(reviewers, ["Alice Liddell", "bob"]);
    assert_eq!(
        review.reviewers[1].avatar_url.as_deref(),
        Some("https://avatars/bob")
    );

    for mock in [&search, &first_page, &second_page, &alice, &bob, &octocat] {
        mock.assert();
    }
}

#[test]
fn discussions_show_profile_names() {
    let mut server = Server::new();
    let _comments = server
        .mock("GET", "/repos/acme/app/pulls/7/comments")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("sort".into(), "created".into()),
            Matcher::UrlEncoded("direction".into(), "asc".into()),
        ]))
        .with_body(
            json!([
                {"id": 1, "path": "src/app.rs", "commit_id": "c1", "line": 3,
                 "body": "nit", "user": {"login": "bob"}, "created_at": "2024-05-01T11:00:00Z"},
                {"id": 2, "in_reply_to_id": 1, "path": "src/app.rs", "commit_id": "c1",
                 "body": "done", "user": {"login": "alice"}, "created_at": "2024-05-01T12:00:00Z"},
                {"id": 3, "in_reply_to_id": 1, "path": "src/app.rs", "commit_id": "c1",
                 "body": "thanks", "user": {"login": "bob"}, "created_at": "2024-05-01T13:00:00Z"}
            ])
            .to_string(),
        )
        .create();
    let alice = profile(&mut server, "alice", Some("Alice Liddell"));
    let bob = profile(&mut server, "bob", Some("Bob Builder"));

    let threads = client(&server, "is:open")
        .list_discussions("acme/app/7")
        .expect("discussions");

    assert_eq!(threads.len(), 1);
    let authors: Vec<_> = threads[0]
        .comments
        .iter()
        .map(|comment| comment.user.name.as_str())
        .collect();
    assert_eq!(authors, ["Bob Builder", "Alice Liddell", "Bob Builder"]);
    let participants: Vec<_> = threads[0]
        .participants
        .iter()
        .map(|user| user.name.as_str())
        .collect();
    assert_eq!(participants, ["Bob Builder", "Alice Liddell"]);
    alice.assert();
    bob.assert();
}

#[test]
fn files_and_contents_are_fetched() {
    let mut server = Server::new();
    let _files = server
        .mock("GET", "/repos/acme/app/pulls/7/files")
        .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
        .with_body(
            json!([
                {
                    "filename": "src/main.rs",
                    "status": "modified",
                    "additions": 3,
                    "deletions": 1,
                    "contents_url": "https://api.github.com/repos/acme/app/contents/src/main.rs?ref=deadbeef"
                },
                {"filename": "docs/old.md", "status": "removed", "additions": 0, "deletions": 9}
            ])
            .to_string(),
        )
        .create();
    let contents = server
        .mock("GET", "/repos/acme/app/contents/src/main.rs")
        .match_query(Matcher::UrlEncoded("ref".into(), "deadbeef".into()))
        .match_header("accept", "application/vnd.github.raw")
        .expect(1)
        .with_body("fn main() {}\n")
        .create();
    let github = client(&server, "is:open");

    let files = github.list_file_summaries("acme/app/7").expect("files");
    assert_eq!(files[0].revision_id, "deadbeef");
    assert_eq!((files[0].added_lines, files[0].removed_lines), (3, 1));
    assert_eq!(files[1].change_type, ChangeType::Removed);
    assert_eq!(files[1].revision_id, "");

    let file = github
        .fetch_file("acme/app/7", "src/main.rs", "deadbeef")
        .expect("file");
    assert_eq!(file.text, "fn main() {}\n");
    assert!(!file.is_read);
    contents.assert();
}

#[test]
fn viewed_markers_are_set_through_graphql() {
    let mut server = Server::new();
    let _pull = server
        .mock("GET", "/repos/acme/app/pulls/7")
        .with_body(
            json!({"node_id": "PR_kwDOAbc", "head": {"ref": "fix/launch"}}).to_string(),
        )
        .create();
    let viewed = server
        .mock("POST", "/graphql")
        .match_header("authorization", "Bearer gh-token")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r"\{ markFileAsViewed\(".into()),
            Matcher::PartialJson(json!({
                "variables": {"pullRequestId": "PR_kwDOAbc", "path": "src/main.rs"}
            })),
        ]))
        .expect(1)
        .with_body(json!({"data": {"markFileAsViewed": {"clientMutationId": null}}}).to_string())
        .create();
    let unviewed = server
        .mock("POST", "/graphql")
        .match_body(Matcher::Regex("unmarkFileAsViewed".into()))
        .expect(1)
        .with_body(json!({"data": {"unmarkFileAsViewed": {"clientMutationId": null}}}).to_string())
        .create();
    let github = client(&server, "is:open");
    assert!(github.supports_remote_read_state());

    github
        .set_remote_read_state("acme/app/7", "src/main.rs", "deadbeef", true)
        .expect("mark viewed");
    github
        .set_remote_read_state("acme/app/7", "src/main.rs", "deadbeef", false)
        .expect("mark unviewed");

    viewed.assert();
    unviewed.assert();
}

#[test]
fn graphql_errors_are_reported() {
    let mut server = Server::new();
    let _pull = server
        .mock("GET", "/repos/acme/app/pulls/7")
        .with_body(json!({"node_id": "PR_kwDOAbc", "head": {"ref": "main"}}).to_string())
        .create();
    let _graphql = server
        .mock("POST", "/graphql")
        .with_body(
            json!({
                "data": null,
                "errors": [{"type": "NOT_FOUND", "message": "Could not resolve file"}]
            })
            .to_string(),
        )
        .create();

    assert!(matches!(
        client(&server, "is:open").set_remote_read_state("acme/app/7", "gone.rs", "r", true),
        Err(ProviderError::NotFound { .. })
    ));
}

#[test]
fn backend_failures_are_classified() {
    let mut server = Server::new();
    let _unauthorized = server
        .mock("GET", "/search/issues")
        .match_query(Matcher::UrlEncoded("q".into(), "is:open".into()))
        .with_status(401)
        .with_body(json!({"message": "Bad credentials"}).to_string())
        .create();
    let _invalid_query = server
        .mock("GET", "/search/issues")
        .match_query(Matcher::UrlEncoded("q".into(), "is:open author:".into()))
        .with_status(422)
        .with_body(json!({"message": "Validation Failed"}).to_string())
        .create();
    let _rate_limited = server
        .mock("GET", "/repos/acme/app/pulls/7/comments")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("x-ratelimit-remaining", "0")
        .with_body(json!({"message": "API rate limit exceeded"}).to_string())
        .create();
    let _missing = server
        .mock("GET", "/repos/acme/app/pulls/404/files")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(json!({"message": "Not Found"}).to_string())
        .create();

    assert!(matches!(
        client(&server, "is:open").list_reviews(),
        Err(ProviderError::AuthFailure { .. })
    ));
    match client(&server, "is:open author:").list_reviews() {
        Err(ProviderError::InvalidConfiguration { message }) => {
            assert!(message.contains("Validation Failed"), "{message}");
        }
        other => panic!("expected InvalidConfiguration, got {other:?}"),
    }

    let github = client(&server, "is:open");
    assert!(matches!(
        github.list_discussions("acme/app/7"),
        Err(ProviderError::RateLimited { .. })
    ));
    assert!(matches!(
        github.list_file_summaries("acme/app/404"),
        Err(ProviderError::NotFound { .. })
    ));
    assert!(matches!(
        github.list_discussions("not-a-review"),
        Err(ProviderError::NotFound { .. })
    ));
}
