//! Repository client behavior: index caching and the bulk refresh.

mod common;

use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use packport_repo::{
    find_pack_in_repo_url, refresh_all, Entry, GetterOptions, Home, PackRepository, Providers,
    RepoError, RepoFile,
};

fn entry(name: &str, url: &str) -> Entry {
    Entry {
        name: name.to_string(),
        cache: format!("{name}-index.yaml"),
        url: url.to_string(),
        ..Default::default()
    }
}

fn index_yaml(server_uri: &str) -> String {
    let index = common::index_of(vec![common::pack_version(
        "alpine",
        "0.2.0",
        &format!("{server_uri}/alpine-0.2.0.tgz"),
    )]);
    serde_yaml::to_string(&index).unwrap()
}

#[tokio::test]
async fn download_index_file_writes_the_raw_bytes() {
    let server = MockServer::start().await;
    let body = index_yaml(&server.uri());
    Mock::given(method("GET"))
        .and(path("/index.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.clone()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = Home::new(temp.path());
    home.ensure_directories().unwrap();

    let repo = PackRepository::new(entry("testing", &server.uri()), &Providers::all()).unwrap();
    let written = repo.download_index_file(&home.cache()).await.unwrap();

    assert_eq!(written, home.cache_index("testing"));
    // Raw bytes land verbatim, not a re-serialization.
    assert_eq!(std::fs::read_to_string(&written).unwrap(), body);
}

#[tokio::test]
async fn download_index_file_rejects_a_malformed_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("entries: {}\n"))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = Home::new(temp.path());
    home.ensure_directories().unwrap();

    let repo = PackRepository::new(entry("testing", &server.uri()), &Providers::all()).unwrap();
    let err = repo.download_index_file(&home.cache()).await.unwrap_err();
    assert!(matches!(err, RepoError::NoApiVersion));
    // Nothing is written when validation fails.
    assert!(!home.cache_index("testing").exists());
}

#[tokio::test]
async fn download_index_file_honors_absolute_cache_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_yaml(&server.uri())))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let absolute = temp.path().join("elsewhere").join("testing-index.yaml");
    let mut e = entry("testing", &server.uri());
    e.cache = absolute.to_str().unwrap().to_string();

    let repo = PackRepository::new(e, &Providers::all()).unwrap();
    let written = repo
        .download_index_file(&temp.path().join("unused-cache-root"))
        .await
        .unwrap();
    assert_eq!(written, absolute);
    assert!(absolute.exists());
}

#[tokio::test]
async fn refresh_all_isolates_per_repository_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/good/index.yaml"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(index_yaml(&server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bad/index.yaml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let home = Home::new(temp.path());
    home.ensure_directories().unwrap();

    let mut registry = RepoFile::new();
    registry.add([
        entry("good", &format!("{}/good", server.uri())),
        entry("bad", &format!("{}/bad", server.uri())),
    ]);

    let outcomes = refresh_all(&registry, &home, &Providers::all()).await;
    assert_eq!(outcomes.len(), 2);

    let good = outcomes.iter().find(|o| o.name == "good").unwrap();
    assert!(good.result.is_ok());
    assert!(home.cache_index("good").exists());

    let bad = outcomes.iter().find(|o| o.name == "bad").unwrap();
    assert!(matches!(
        bad.result.as_ref().unwrap_err(),
        RepoError::Http { status: 500, .. }
    ));
    assert!(!home.cache_index("bad").exists());
}

#[tokio::test]
async fn find_pack_in_repo_url_matches_without_persisting() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.yaml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_yaml(&server.uri())))
        .mount(&server)
        .await;

    let found = find_pack_in_repo_url(
        &server.uri(),
        "alpine",
        "0.2.0",
        &GetterOptions::default(),
        &Providers::all(),
    )
    .await
    .unwrap();
    assert_eq!(found, format!("{}/alpine-0.2.0.tgz", server.uri()));

    let err = find_pack_in_repo_url(
        &server.uri(),
        "nginx",
        "",
        &GetterOptions::default(),
        &Providers::all(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RepoError::NotFoundInRepo { .. }));
}

#[tokio::test]
async fn find_pack_in_unreachable_repo_reports_the_url() {
    let err = find_pack_in_repo_url(
        "http://127.0.0.1:1/packs",
        "alpine",
        "",
        &GetterOptions::default(),
        &Providers::all(),
    )
    .await
    .unwrap_err();
    match err {
        RepoError::InvalidRepo { repo_url, .. } => {
            assert_eq!(repo_url, "http://127.0.0.1:1/packs")
        }
        other => panic!("unexpected error: {other}"),
    }
}
