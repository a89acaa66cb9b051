use std::sync::Arc;

use loupe_core::{
    Error, ErrorKind, ProviderModule, ProviderRegistry, ProviderSettings, ReadStateKey,
    ReadStateStore, ReviewGateway,
};
use loupe_providers::ProviderEndpoints;
use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::json;

fn github_settings(id: &str) -> ProviderSettings {
    ProviderSettings {
        id: id.into(),
        name: "GitHub".into(),
        module: ProviderModule::Github {
            token: "t".into(),
            query: "is:open".into(),
        },
    }
}

fn upsource_settings(server: &ServerGuard) -> ProviderSettings {
    ProviderSettings {
        id: "up1".into(),
        name: "Upsource".into(),
        module: ProviderModule::Upsource {
            url: server.url(),
            token: "t".into(),
        },
    }
}

fn gateway_for(server: &ServerGuard) -> ReviewGateway {
    let endpoints = ProviderEndpoints {
        github_api: server.url(),
        ..ProviderEndpoints::default()
    };
    ReviewGateway::new(
        Arc::new(ProviderRegistry::new(endpoints)),
        Arc::new(ReadStateStore::in_memory().expect("store")),
    )
}

fn file_mocks(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        server
            .mock("GET", "/repos/acme/app/pulls/7/files")
            .match_query(Matcher::Any)
            .with_body(
                json!([
                    {
                        "filename": "src/main.rs",
                        "status": "modified",
                        "additions": 2,
                        "deletions": 0,
                        "contents_url": "https://api.github.com/repos/acme/app/contents/src/main.rs?ref=c0ffee"
                    },
                    {
                        "filename": "README.md",
                        "status": "added",
                        "additions": 5,
                        "deletions": 0,
                        "contents_url": "https://api.github.com/repos/acme/app/contents/README.md?ref=c0ffee"
                    }
                ])
                .to_string(),
            )
            .create(),
        server
            .mock("GET", "/repos/acme/app/contents/src/main.rs")
            .match_query(Matcher::UrlEncoded("ref".into(), "c0ffee".into()))
            .with_body("fn main() {}\n")
            .create(),
    ]
}

fn upsource_changes(server: &mut ServerGuard) -> Mock {
    server
        .mock("POST", "/~rpc/getReviewSummaryChanges")
        .with_body(
            json!({"result": {
                "diff": {"diff": [
                    {"diffType": 3, "isRead": true,
                     "newFile": {"projectId": "app", "revisionId": "r2", "fileName": "/lib/a.dart"}}
                ]},
                "fileDiffSummary": [
                    {"file": {"projectId": "app", "revisionId": "r2", "fileName": "/lib/a.dart"},
                     "addedLines": 1, "removedLines": 1}
                ]
            }})
            .to_string(),
        )
        .create()
}

fn read_flags(gateway: &ReviewGateway, provider_id: &str, review_id: &str) -> Vec<(String, bool)> {
    gateway
        .get_review_file_summaries(provider_id, review_id)
        .expect("summaries")
        .into_iter()
        .map(|file| (file.file_path, file.is_read))
        .collect()
}

#[test]
fn marking_a_file_read_is_reflected_and_reversible() {
    let mut server = Server::new();
    let _files = file_mocks(&mut server);
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");

    assert_eq!(
        read_flags(&gateway, "gh1", "acme/app/7"),
        [("src/main.rs".to_owned(), false), ("README.md".to_owned(), false)]
    );

    gateway
        .mark_file_read("gh1", "acme/app/7", "src/main.rs", "c0ffee", true)
        .expect("mark read");
    assert_eq!(
        read_flags(&gateway, "gh1", "acme/app/7"),
        [("src/main.rs".to_owned(), true), ("README.md".to_owned(), false)]
    );
    let file = gateway
        .get_review_file("gh1", "acme/app/7", "src/main.rs", "c0ffee")
        .expect("file");
    assert!(file.is_read);

    gateway
        .mark_file_read("gh1", "acme/app/7", "src/main.rs", "c0ffee", false)
        .expect("mark unread");
    assert_eq!(
        read_flags(&gateway, "gh1", "acme/app/7")[0],
        ("src/main.rs".to_owned(), false)
    );
}

#[test]
fn marking_twice_equals_marking_once() {
    let mut server = Server::new();
    let _files = file_mocks(&mut server);
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");

    gateway
        .mark_file_read("gh1", "acme/app/7", "README.md", "c0ffee", true)
        .expect("first mark");
    let once = read_flags(&gateway, "gh1", "acme/app/7");
    gateway
        .mark_file_read("gh1", "acme/app/7", "README.md", "c0ffee", true)
        .expect("second mark");
    assert_eq!(read_flags(&gateway, "gh1", "acme/app/7"), once);
}

#[test]
fn read_state_is_local_by_default() {
    let mut server = Server::new();
    let pull = server
        .mock("GET", "/repos/acme/app/pulls/7")
        .expect(0)
        .create();
    let graphql = server.mock("POST", "/graphql").expect(0).create();
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");

    gateway
        .mark_file_read("gh1", "acme/app/7", "src/main.rs", "c0ffee", true)
        .expect("mark read");
    pull.assert();
    graphql.assert();
}

#[test]
fn read_markers_survive_reconfiguration() {
    let mut server = Server::new();
    let _files = file_mocks(&mut server);
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");
    gateway
        .mark_file_read("gh1", "acme/app/7", "src/main.rs", "c0ffee", true)
        .expect("mark read");

    gateway.configure_modules(Vec::new()).expect("remove all");
    assert!(matches!(
        gateway.get_review_file_summaries("gh1", "acme/app/7"),
        Err(Error::ProviderNotFound { .. })
    ));

    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("restore");
    assert!(read_flags(&gateway, "gh1", "acme/app/7")[0].1);
}

#[test]
fn provider_failures_keep_their_kind() {
    let mut server = Server::new();
    let _comments = server
        .mock("GET", "/repos/acme/app/pulls/7/comments")
        .match_query(Matcher::Any)
        .with_status(401)
        .create();
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");

    let err = gateway
        .get_review_discussions("gh1", "acme/app/7")
        .expect_err("bad credentials");
    assert_eq!(err.kind(), ErrorKind::AuthFailure);
    match err {
        Error::Provider { provider, .. } => assert_eq!(provider, "gh1"),
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[test]
fn backend_read_flag_is_ignored_without_sync() {
    let mut server = Server::new();
    let _changes = upsource_changes(&mut server);
    let gateway = gateway_for(&server);
    gateway
        .configure_modules(vec![upsource_settings(&server)])
        .expect("configure");

    assert_eq!(
        read_flags(&gateway, "up1", "app/APP-CR-1"),
        [("/lib/a.dart".to_owned(), false)]
    );
}

#[test]
fn remote_sync_pushes_to_upsource() {
    let mut server = Server::new();
    let _changes = upsource_changes(&mut server);
    let push = server
        .mock("POST", "/~rpc/setFileInReviewReadStatus")
        .match_body(Matcher::PartialJson(json!({"markAsUnread": true})))
        .expect(1)
        .with_body(json!({"result": {}}).to_string())
        .create();
    let gateway = gateway_for(&server).with_remote_read_state(true);
    gateway
        .configure_modules(vec![upsource_settings(&server)])
        .expect("configure");

    assert!(
        read_flags(&gateway, "up1", "app/APP-CR-1")[0].1,
        "backend flag is kept without a local marker"
    );

    gateway
        .mark_file_read("up1", "app/APP-CR-1", "/lib/a.dart", "r2", false)
        .expect("mark unread");
    push.assert();

    assert!(
        !read_flags(&gateway, "up1", "app/APP-CR-1")[0].1,
        "local marker wins over the backend flag"
    );

    let key = ReadStateKey::new("up1", "app/APP-CR-1", "/lib/a.dart", "r2");
    let store = ReadStateStore::in_memory().expect("store");
    assert!(!store.get(&key).expect("fresh store"));
}

#[test]
fn remote_sync_marks_github_files_viewed() {
    let mut server = Server::new();
    let _files = file_mocks(&mut server);
    let _pull = server
        .mock("GET", "/repos/acme/app/pulls/7")
        .with_body(json!({"node_id": "PR_node7", "head": {"ref": "main"}}).to_string())
        .create();
    let viewed = server
        .mock("POST", "/graphql")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r"\{ markFileAsViewed\(".into()),
            Matcher::PartialJson(json!({
                "variables": {"pullRequestId": "PR_node7", "path": "src/main.rs"}
            })),
        ]))
        .expect(1)
        .with_body(json!({"data": {"markFileAsViewed": {"clientMutationId": null}}}).to_string())
        .create();
    let gateway = gateway_for(&server).with_remote_read_state(true);
    gateway
        .configure_modules(vec![github_settings("gh1")])
        .expect("configure");

    gateway
        .mark_file_read("gh1", "acme/app/7", "src/main.rs", "c0ffee", true)
        .expect("mark read");
    viewed.assert();
    assert!(read_flags(&gateway, "gh1", "acme/app/7")[0].1);
}
