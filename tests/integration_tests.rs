//! Integration tests for drivewalk
//!
//! These tests drive the public API end to end: YAML config, the HTTP
//! binding against a mock Drive server, and the CLI runner in fixture mode.

use clap::Parser;
use drivewalk::cli::{Cli, Runner};
use drivewalk::engine::{Addressing, ListReader};
use drivewalk::http::HttpClient;
use drivewalk::loader::{build_auth_config, load_config_from_str, render_config, template_context};
use drivewalk::ops::DriveOperations;
use drivewalk::remote::{DriveClient, RemoteService};
use drivewalk::resolve::PathResolver;
use drivewalk::template::TemplateContext;
use drivewalk::{Error, ReaderConfig, FOLDER_MIME_TYPE};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

/// Matches when query parameter `0` contains `1`
struct QueryContains(&'static str, &'static str);

impl Match for QueryContains {
    fn matches(&self, request: &Request) -> bool {
        request
            .url
            .query_pairs()
            .any(|(key, value)| key == self.0 && value.contains(self.1))
    }
}

fn reader_yaml(server: &MockServer, extra: &str) -> String {
    format!(
        r#"
name: drive_files
api:
  api_url: {uri}/drive/v3
  upload_url: {uri}/upload/drive/v3
auth:
  type: bearer
  token: "{{{{ vars.token }}}}"
http:
  max_retries: 0
  rate_limit:
    enabled: false
resolver:
  max_retries: 0
vars:
  token: test-token
{extra}
"#,
        uri = server.uri()
    )
}

fn drive_config(server: &MockServer, extra: &str) -> ReaderConfig {
    let config = load_config_from_str(&reader_yaml(server, extra)).unwrap();
    let ctx = template_context(&config).unwrap();
    render_config(&config, &ctx).unwrap()
}

fn drive_service(config: &ReaderConfig) -> Arc<dyn RemoteService> {
    let auth = build_auth_config(&config.auth, &TemplateContext::new()).unwrap();
    let http = HttpClient::with_auth(config.http_client_config(), auth).unwrap();
    Arc::new(DriveClient::with_urls(http, &config.api.api_url, &config.api.upload_url).unwrap())
}

fn file_json(id: &str, name: &str, parent: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": "text/plain",
        "size": "10",
        "parents": [parent],
        "trashed": false
    })
}

fn folder_json(id: &str, name: &str, parent: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
        "parents": [parent],
        "trashed": false
    })
}

const FIXTURE: &str = r"
resources:
  - id: a1
    name: A
    folder: true
    parents: [root]
  - id: f1
    name: one.txt
    parents: [a1]
    content: one
  - id: b1
    name: B
    folder: true
    parents: [a1]
  - id: f2
    name: two.txt
    parents: [b1]
    content: two
  - id: f3
    name: old.txt
    parents: [a1]
    trashed: true
  - id: f4
    name: top.txt
    parents: [root]
";

fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("store.yaml"), FIXTURE).unwrap();
    dir
}

async fn run_cli(args: &[&str]) -> (drivewalk::Result<()>, Vec<Value>) {
    let cli = Cli::try_parse_from(args).unwrap();
    let runner = Runner::new(cli);
    let mut out = Vec::new();
    let result = runner.run_to(&mut out).await;
    let messages = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (result, messages)
}

fn records(messages: &[Value]) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m["type"] == "RECORD")
        .map(|m| m["record"]["data"]["name"].as_str().unwrap().to_string())
        .collect()
}

fn message_of_type<'a>(messages: &'a [Value], kind: &str) -> &'a Value {
    messages
        .iter()
        .find(|m| m["type"] == kind)
        .unwrap_or_else(|| panic!("no {kind} message in {messages:?}"))
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// HTTP Binding Tests
// ============================================================================

#[tokio::test]
async fn test_paginated_listing_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("Authorization", "Bearer test-token"))
        .and(query_param("q", "'root' in parents and trashed = false"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file_json("f3", "c.txt", "root")]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'root' in parents and trashed = false"))
        .and(query_param("pageSize", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file_json("f1", "a.txt", "root"), file_json("f2", "b.txt", "root")],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = drive_config(&server, "read:\n  page_size: 2\n");
    let service = drive_service(&config);
    let resolver = PathResolver::new(service.clone(), config.resolver_options());
    let mut reader = ListReader::new(service, resolver, config.traversal.clone())
        .with_config(config.read_config());

    let mut names = Vec::new();
    let mut has_item = reader.start(config.addressing()).await.unwrap();
    while has_item {
        names.push(reader.current().unwrap().name);
        has_item = reader.advance().await.unwrap();
    }

    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    let metrics = reader.metrics();
    assert_eq!(metrics.total_seen, 3);
    assert_eq!(metrics.yielded_count, 3);
}

#[tokio::test]
async fn test_listing_by_path_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(QueryContains("q", "name = 'Reports' and 'root' in parents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [folder_json("r1", "Reports", "root")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'r1' in parents and trashed = false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                file_json("x1", "q1.csv", "r1"),
                folder_json("s1", "Archive", "r1")
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = drive_config(
        &server,
        "source:\n  folder_name: /Reports\ntraversal:\n  list_mode: FILES\n",
    );
    let service = drive_service(&config);
    let resolver = PathResolver::new(service.clone(), config.resolver_options());
    let mut reader = ListReader::new(service, resolver, config.traversal.clone());

    assert_eq!(
        config.addressing(),
        Addressing::ByName("/Reports".to_string())
    );
    assert!(reader.start(config.addressing()).await.unwrap());
    assert_eq!(reader.current().unwrap().id, "x1");
    assert!(!reader.advance().await.unwrap());
}

#[tokio::test]
async fn test_server_error_is_fatal_to_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend error"))
        .mount(&server)
        .await;

    let config = drive_config(&server, "");
    let service = drive_service(&config);
    let resolver = PathResolver::new(service.clone(), config.resolver_options());
    let mut reader = ListReader::new(service, resolver, config.traversal.clone());

    let err = reader.start(config.addressing()).await.unwrap_err();
    assert!(matches!(err, Error::FatalIo { ref message } if message.contains("503")));
    assert!(matches!(
        reader.advance().await,
        Ok(false) | Err(Error::IllegalState { .. })
    ));
}

#[tokio::test]
async fn test_create_folder_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(folder_json("new1", "Exports", "root")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = drive_config(&server, "");
    let service = drive_service(&config);
    let resolver = PathResolver::new(service.clone(), config.resolver_options());
    let ops = DriveOperations::new(service, resolver);

    let id = ops.create_folder("root", "Exports").await.unwrap();
    assert_eq!(id, "new1");
}

#[tokio::test]
async fn test_runner_lists_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'root' in parents and trashed = false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file_json("f1", "a.txt", "root")]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("reader.yaml");
    std::fs::write(&config_path, reader_yaml(&server, "")).unwrap();

    let (result, messages) = run_cli(&["drivewalk", "--config", arg(&config_path), "list"]).await;
    result.unwrap();

    assert_eq!(records(&messages), vec!["a.txt"]);
    let record = message_of_type(&messages, "RECORD");
    assert_eq!(record["record"]["stream"], "drive_files");
    assert_eq!(record["record"]["data"]["size"], 10);
}

// ============================================================================
// CLI Runner Tests (fixture mode)
// ============================================================================

#[tokio::test]
async fn test_cli_recursive_listing() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "list",
        "--folder-name",
        "/A",
        "--recursive",
        "--mode",
        "files",
    ])
    .await;
    result.unwrap();

    assert_eq!(records(&messages), vec!["one.txt", "two.txt"]);

    let summary = &message_of_type(&messages, "SUMMARY")["summary"];
    assert_eq!(summary["status"], "SUCCEEDED");
    assert_eq!(summary["records"], 2);
    assert_eq!(summary["metrics"]["yieldedCount"], 2);
    assert_eq!(summary["total_seen"], 3);
}

#[tokio::test]
async fn test_cli_custom_query() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "list",
        "--query",
        "name contains 'o' and trashed = false",
        "--mode",
        "files",
    ])
    .await;
    result.unwrap();

    assert_eq!(records(&messages), vec!["one.txt", "two.txt", "top.txt"]);
}

#[tokio::test]
async fn test_cli_missing_folder_yields_nothing() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "list",
        "--folder-name",
        "/A/Nope",
    ])
    .await;
    result.unwrap();

    assert!(records(&messages).is_empty());
    assert!(messages
        .iter()
        .any(|m| m["type"] == "LOG" && m["log"]["level"] == "WARN"));
}

#[tokio::test]
async fn test_cli_parquet_output() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");
    let output = dir.path().join("listing.parquet");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "--format",
        "parquet",
        "list",
        "--folder-id",
        "a1",
        "--output",
        arg(&output),
    ])
    .await;
    result.unwrap();

    assert!(records(&messages).is_empty());
    let file = std::fs::File::open(&output).unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .build()
        .unwrap();
    let rows: usize = reader.map(|batch| batch.unwrap().num_rows()).sum();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_cli_parquet_requires_output() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, _) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "--format",
        "parquet",
        "list",
    ])
    .await;
    assert!(result.unwrap_err().to_string().contains("--output"));
}

#[tokio::test]
async fn test_cli_resolve() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "resolve",
        "/A/B/two.txt",
        "--kind",
        "file",
    ])
    .await;
    result.unwrap();

    let result = message_of_type(&messages, "RESULT");
    assert_eq!(result["operation"], "resolve");
    assert_eq!(result["result"]["id"], "f2");
}

#[tokio::test]
async fn test_cli_resolve_missing_file() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, _) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "resolve",
        "/A/missing.txt",
        "--kind",
        "file",
    ])
    .await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_cli_copy_folder_tree() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "copy",
        "/A",
        "/",
        "--recursive",
        "--name",
        "A copy",
    ])
    .await;
    result.unwrap();

    let result = message_of_type(&messages, "RESULT");
    assert_eq!(result["operation"], "copy");
    assert_eq!(result["result"]["source"], "a1");
    assert_eq!(result["result"]["dest"], "root");
}

#[tokio::test]
async fn test_cli_put_and_overwrite() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");
    let local = dir.path().join("one.txt");
    std::fs::write(&local, b"fresh").unwrap();

    let (result, _) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "put",
        arg(&local),
        "--parent",
        "/A",
    ])
    .await;
    assert!(matches!(result, Err(Error::AlreadyExists { .. })));

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "put",
        arg(&local),
        "--parent",
        "/A",
        "--overwrite",
    ])
    .await;
    result.unwrap();

    let result = message_of_type(&messages, "RESULT");
    assert_eq!(result["result"]["name"], "one.txt");
    assert_eq!(result["result"]["size"], 5);
    assert_eq!(result["result"]["parents"], "[a1]");
}

#[tokio::test]
async fn test_cli_get_prints_content() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "get",
        "/A/B/two.txt",
    ])
    .await;
    result.unwrap();

    let result = &message_of_type(&messages, "RESULT")["result"];
    assert_eq!(result["id"], "f2");
    assert_eq!(result["content"], "two");
    assert_eq!(result["size"], 3);
    assert_eq!(result["file"], Value::Null);
}

#[tokio::test]
async fn test_cli_get_exports_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("docs.yaml");
    std::fs::write(
        &fixture,
        r"
resources:
  - id: d1
    name: Plan
    mime_type: application/vnd.google-apps.document
    parents: [root]
    content: plan text
",
    )
    .unwrap();
    let target = dir.path().join("plan");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "get",
        "/Plan",
        "--output",
        arg(&target),
        "--add-ext",
        "--export",
        "application/vnd.google-apps.document=text/plain:txt",
    ])
    .await;
    result.unwrap();

    let written = dir.path().join("plan.txt");
    assert_eq!(std::fs::read_to_string(&written).unwrap(), "plan text");
    let result = &message_of_type(&messages, "RESULT")["result"];
    assert_eq!(result["mime_type"], "text/plain");
    assert_eq!(result["file"], arg(&written));
    assert!(result.get("content").is_none());
}

#[tokio::test]
async fn test_cli_delete_trashes_by_default() {
    let dir = fixture_dir();
    let fixture = dir.path().join("store.yaml");

    let (result, messages) = run_cli(&[
        "drivewalk",
        "--fixture",
        arg(&fixture),
        "delete",
        "/A/one.txt",
    ])
    .await;
    result.unwrap();

    let result = message_of_type(&messages, "RESULT");
    assert_eq!(result["result"]["id"], "f1");
    assert_eq!(result["result"]["trashed"], true);
}

#[tokio::test]
async fn test_cli_validate() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("reader.yaml");
    std::fs::write(&config_path, "name: reports\nsource:\n  folder_name: /Reports\n").unwrap();

    let (result, messages) =
        run_cli(&["drivewalk", "--config", arg(&config_path), "validate"]).await;
    result.unwrap();

    let log = message_of_type(&messages, "LOG");
    assert!(log["log"]["message"]
        .as_str()
        .unwrap()
        .contains("'reports' is valid"));
}

#[tokio::test]
async fn test_cli_validate_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("reader.yaml");
    std::fs::write(
        &config_path,
        "source:\n  folder_id: x\n  folder_name: /Reports\n",
    )
    .unwrap();

    let (result, _) = run_cli(&["drivewalk", "--config", arg(&config_path), "validate"]).await;
    assert!(result.is_err());
}
