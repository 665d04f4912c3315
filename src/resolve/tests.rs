//! Tests for the path resolver module

use super::*;
use crate::error::Error;
use crate::remote::{MemoryStore, RemoteResource};
use crate::types::{BackoffType, LookupKind, ROOT_FOLDER};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;
use tokio::time::Instant;

/// root
/// ├── A (a1)
/// │   ├── B (b1)
/// │   │   └── report.csv (r1)
/// │   └── notes.txt (n1)
/// ├── Dup (d1)
/// │   └── Leaf (l1)
/// ├── Dup (d2)
/// │   └── Leaf (l2)
/// └── Twin (t1), Twin (t2)
fn tree() -> Arc<MemoryStore> {
    Arc::new(
        MemoryStore::new()
            .with_resource(RemoteResource::folder("a1", "A").with_parent(ROOT_FOLDER))
            .with_resource(RemoteResource::folder("b1", "B").with_parent("a1"))
            .with_resource(RemoteResource::file("r1", "report.csv").with_parent("b1"))
            .with_resource(RemoteResource::file("n1", "notes.txt").with_parent("a1"))
            .with_resource(RemoteResource::folder("d1", "Dup").with_parent(ROOT_FOLDER))
            .with_resource(RemoteResource::folder("d2", "Dup").with_parent(ROOT_FOLDER))
            .with_resource(RemoteResource::folder("l1", "Leaf").with_parent("d1"))
            .with_resource(RemoteResource::folder("l2", "Leaf").with_parent("d2"))
            .with_resource(RemoteResource::folder("t1", "Twin").with_parent(ROOT_FOLDER))
            .with_resource(RemoteResource::folder("t2", "Twin").with_parent(ROOT_FOLDER)),
    )
}

fn resolver(store: &Arc<MemoryStore>) -> PathResolver {
    PathResolver::new(store.clone(), ResolverOptions::default())
}

// ============================================================================
// Path splitting
// ============================================================================

#[test_case("/A/B", &["A", "B"])]
#[test_case("A/B/", &["A", "B"])]
#[test_case("  /A/B/  ", &["A", "B"])]
#[test_case("A", &["A"])]
fn test_path_segments(path: &str, expected: &[&str]) {
    assert_eq!(path_segments(path), expected);
}

#[test_case("", true)]
#[test_case("/", true)]
#[test_case("root", true)]
#[test_case("/A", false)]
fn test_is_root_path(path: &str, expected: bool) {
    assert_eq!(is_root_path(path), expected);
}

// ============================================================================
// Folder ids
// ============================================================================

#[tokio::test]
async fn test_root_equivalents_skip_listing() {
    let store = tree();
    let resolver = resolver(&store);

    for path in ["", "/", "root"] {
        let ids = resolver.folder_ids(path, false, false).await.unwrap();
        assert_eq!(ids, vec![ROOT_FOLDER.to_string()]);
    }
    assert_eq!(store.list_count(), 0);
}

#[tokio::test]
async fn test_path_round_trip() {
    let store = tree();
    let ids = resolver(&store).folder_ids("/A/B", false, false).await.unwrap();
    assert_eq!(ids, vec!["b1".to_string()]);
}

#[tokio::test]
async fn test_fan_out_keeps_depth_first_order() {
    let store = tree();
    let ids = resolver(&store)
        .folder_ids("/Dup/Leaf", false, false)
        .await
        .unwrap();
    assert_eq!(ids, vec!["l1".to_string(), "l2".to_string()]);
}

#[tokio::test]
async fn test_missing_branch_is_not_an_error() {
    let store = tree();
    let ids = resolver(&store)
        .folder_ids("/A/Missing", false, false)
        .await
        .unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn test_bare_name_falls_back_to_global_search() {
    let store = tree();
    // B is not at the root, so the walk finds nothing
    let ids = resolver(&store).folder_ids("B", false, false).await.unwrap();
    assert_eq!(ids, vec!["b1".to_string()]);

    let last = store.list_requests().pop().unwrap();
    assert_eq!(
        last.query,
        "name = 'B' and mimeType = 'application/vnd.google-apps.folder' and 'me' in owners"
    );
}

#[tokio::test]
async fn test_bare_name_global_search_not_found() {
    let store = tree();
    let err = resolver(&store)
        .folder_ids("Nowhere", false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: LookupKind::Folder, .. }));
}

// ============================================================================
// Single resolution
// ============================================================================

#[tokio::test]
async fn test_ambiguous_folder() {
    let store = tree();
    let err = resolver(&store)
        .resolve("/Twin", LookupKind::Folder, false, false)
        .await
        .unwrap_err();

    match err {
        Error::Ambiguous { count, name, .. } => {
            assert_eq!(count, 2);
            assert_eq!(name, "/Twin");
        }
        other => panic!("expected Ambiguous, got {other:?}"),
    }
}

#[tokio::test]
async fn test_resolve_file_by_path() {
    let store = tree();
    let resolver = resolver(&store);

    let id = resolver
        .resolve("/A/B/report.csv", LookupKind::File, false, false)
        .await
        .unwrap();
    assert_eq!(id, "r1");

    let last = store.list_requests().pop().unwrap();
    assert_eq!(
        last.query,
        "name = 'report.csv' and 'b1' in parents and mimeType != 'application/vnd.google-apps.folder' and trashed = false"
    );
}

#[tokio::test]
async fn test_resolve_either_prefers_folder() {
    let store = tree();
    let resolver = resolver(&store);

    assert_eq!(
        resolver.file_or_folder_id("/A/B", false, false).await.unwrap(),
        "b1"
    );
    assert_eq!(
        resolver.file_or_folder_id("/A/notes.txt", false, false).await.unwrap(),
        "n1"
    );
}

#[tokio::test]
async fn test_resolve_file_missing() {
    let store = tree();
    let err = resolver(&store)
        .file_id("/A/B/absent.csv", false, false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: LookupKind::File, .. }));
}

#[tokio::test]
async fn test_resolve_trashed_file_only_when_searching_trash() {
    let store = tree();
    store.insert(
        RemoteResource::file("old1", "old.csv")
            .with_parent("b1")
            .trashed(),
    );
    let resolver = resolver(&store);

    let err = resolver.file_id("/A/B/old.csv", false, false).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        resolver.file_id("/A/B/old.csv", true, false).await.unwrap(),
        "old1"
    );
    assert_eq!(
        resolver
            .file_or_folder_id("/A/B/old.csv", true, false)
            .await
            .unwrap(),
        "old1"
    );
}

#[tokio::test]
async fn test_global_file_search_respects_ownership() {
    let store = tree();
    store.insert_shared(RemoteResource::file("s1", "shared.txt"));
    let resolver = resolver(&store);

    assert!(resolver.file_id("shared.txt", false, false).await.unwrap_err().is_not_found());
    assert_eq!(resolver.file_id("shared.txt", false, true).await.unwrap(), "s1");
}

#[tokio::test]
async fn test_folder_id_root() {
    let store = tree();
    assert_eq!(
        resolver(&store).folder_id("/", false, false).await.unwrap(),
        ROOT_FOLDER
    );
}

// ============================================================================
// Level queries
// ============================================================================

#[test]
fn test_level_query_variants() {
    let store = tree();

    let plain = resolver(&store);
    assert_eq!(
        plain.level_query("A", ROOT_FOLDER, false, false),
        "name = 'A' and 'root' in parents and mimeType = 'application/vnd.google-apps.folder' and trashed = false"
    );
    assert_eq!(
        plain.level_query("A", ROOT_FOLDER, true, true),
        "name = 'A' and ('root' in parents or sharedWithMe) and mimeType = 'application/vnd.google-apps.folder'"
    );
    assert_eq!(
        plain.level_query("B", "a1", true, true),
        "name = 'B' and 'a1' in parents and mimeType = 'application/vnd.google-apps.folder'"
    );

    let drives = PathResolver::new(
        store.clone(),
        ResolverOptions::default().with_shared_drives(true),
    );
    assert_eq!(
        drives.level_query("Team", ROOT_FOLDER, false, true),
        "name = 'Team' and mimeType = 'application/vnd.google-apps.folder' and trashed = false"
    );
    assert!(drives.options().scope.supports_all_drives);
}

#[tokio::test]
async fn test_shared_with_me_at_root() {
    let store = tree();
    store.insert_shared(RemoteResource::folder("x1", "External"));
    store.insert(RemoteResource::folder("x2", "Inner").with_parent("x1"));
    let resolver = resolver(&store);

    assert!(resolver
        .folder_ids("/External/Inner", false, false)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        resolver
            .folder_ids("/External/Inner", false, true)
            .await
            .unwrap(),
        vec!["x2".to_string()]
    );
}

// ============================================================================
// Retry
// ============================================================================

#[test]
fn test_retry_delays() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(0), Duration::from_secs(1));
    assert_eq!(policy.delay(1), Duration::from_secs(2));
    assert_eq!(policy.delay(2), Duration::from_secs(4));
}

#[test]
fn test_retry_delay_saturates_at_max_backoff() {
    let policy = RetryPolicy {
        max_retries: 40,
        initial_backoff: Duration::from_secs(u64::MAX / 2),
        max_backoff: Duration::from_secs(60),
        backoff_type: BackoffType::Exponential,
    };
    assert_eq!(policy.delay(0), Duration::from_secs(60));
    assert_eq!(policy.delay(3), Duration::from_secs(60));
    assert_eq!(policy.delay(39), Duration::from_secs(60));

    let linear = RetryPolicy {
        backoff_type: BackoffType::Linear,
        ..policy
    };
    assert_eq!(linear.delay(5), Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_retry_exhaustion() {
    let store = tree();
    store.fail_next_lists(4);
    let resolver = resolver(&store);

    let started = Instant::now();
    let err = resolver
        .resolve("/A/B", LookupKind::Folder, false, false)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::TransientIo { .. }));
    assert_eq!(store.list_count(), 4);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(7), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(8), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_retry_recovers() {
    let store = tree();
    store.fail_next_lists(2);
    let resolver = resolver(&store);

    let started = Instant::now();
    let id = resolver
        .resolve("/A/B", LookupKind::Folder, false, false)
        .await
        .unwrap();

    assert_eq!(id, "b1");
    // Two failures, then one call per level
    assert_eq!(store.list_count(), 4);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_ambiguity_is_never_retried() {
    let store = tree();
    let resolver = resolver(&store);

    let started = Instant::now();
    let err = resolver.folder_id("/Twin", false, false).await.unwrap_err();

    assert!(matches!(err, Error::Ambiguous { .. }));
    assert_eq!(store.list_count(), 1);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_metadata() {
    let store = tree();
    let resource = resolver(&store).metadata("r1", "id,name").await.unwrap();
    assert_eq!(resource.name, "report.csv");
}
