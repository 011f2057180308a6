mod common;

use assert2::{check, let_assert};
use common::{ScriptedSource, browser_over, docs_tree};
use docshelf::error::{DirectorySource, DocumentSource, TransportError};
use docshelf::structure::LoadState;
use docshelf::{BrowserEvent, ContentSource, DocumentStore, EventBus, StructureStore};
use futures::future::join_all;
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(300);

fn structure_store(source: &Arc<ScriptedSource>) -> StructureStore {
    StructureStore::new(
        Arc::clone(source) as Arc<dyn ContentSource>,
        50,
        TTL,
        EventBus::default(),
    )
}

fn document_store(source: &Arc<ScriptedSource>, events: EventBus) -> DocumentStore {
    DocumentStore::new(Arc::clone(source) as Arc<dyn ContentSource>, 50, TTL, events)
}

// --- StructureStore ---

#[rstest]
#[tokio::test(start_paused = true)]
async fn directory_is_cached_until_ttl_expires(docs_tree: Arc<ScriptedSource>) {
    let store = structure_store(&docs_tree);

    let first = store.get_directory("docs", false).await.unwrap();
    let second = store.get_directory("/docs/", false).await.unwrap();
    check!(Arc::ptr_eq(&first, &second));
    check!(docs_tree.directory_fetches("docs") == 1);

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    store.get_directory("docs", false).await.unwrap();
    check!(docs_tree.directory_fetches("docs") == 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn skip_cache_refetches_and_replaces_listing(docs_tree: Arc<ScriptedSource>) {
    let store = structure_store(&docs_tree);

    let first = store.get_directory("docs", false).await.unwrap();
    let refreshed = store.get_directory("docs", true).await.unwrap();
    check!(docs_tree.directory_fetches("docs") == 2);
    check!(!Arc::ptr_eq(&first, &refreshed));
    check!(first.len() == 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_directory_requests_share_one_fetch() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_dir("docs", &["docs/a.md"])
            .with_delay(Duration::from_millis(100)),
    );
    let store = structure_store(&source);

    let results = join_all((0..5).map(|_| store.get_directory("docs", false))).await;
    check!(results.iter().all(Result::is_ok));
    check!(source.directory_fetches("docs") == 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_fetch_still_populates_cache() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_dir("docs", &["docs/a.md"])
            .with_delay(Duration::from_millis(100)),
    );
    let store = structure_store(&source);

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), store.get_directory("docs", false)).await;
    check!(abandoned.is_err());
    check!(store.load_state("docs") == LoadState::Loading);

    tokio::time::sleep(Duration::from_secs(1)).await;
    check!(store.load_state("docs") == LoadState::Loaded);
    check!(store.cache_stats().size == 1);

    store.get_directory("docs", false).await.unwrap();
    check!(source.directory_fetches("docs") == 1);
}

#[tokio::test(start_paused = true)]
async fn load_state_tracks_fetch_progress() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_dir("docs", &["docs/a.md"])
            .with_delay(Duration::from_millis(100)),
    );
    let store = Arc::new(structure_store(&source));
    check!(store.load_state("docs") == LoadState::NotLoaded);

    let handle = store.preload("docs");
    tokio::time::sleep(Duration::from_millis(10)).await;
    check!(store.load_state("docs") == LoadState::Loading);

    handle.await.unwrap();
    check!(store.load_state("docs") == LoadState::Loaded);
}

#[rstest]
#[tokio::test]
async fn expand_fills_children_without_mutating_original(docs_tree: Arc<ScriptedSource>) {
    let store = structure_store(&docs_tree);
    let root = store.get_directory("", false).await.unwrap();

    let docs = &root[0];
    let expanded = store.expand(docs).await.unwrap();
    check!(docs.children.is_none());
    let_assert!(Some(children) = &expanded.children);
    check!(children.len() == 2);
}

#[tokio::test]
async fn directory_failure_is_not_cached() {
    let source = Arc::new(ScriptedSource::new().with_dir("docs", &["docs/a.md"]));
    let store = structure_store(&source);
    source.fail("docs", TransportError::new(Some(503), "unavailable"));

    let_assert!(Err(e) = store.get_directory("docs", false).await);
    let_assert!(DirectorySource::Transport(inner) = &e.source);
    check!(inner.status == Some(503));
    check!(!e.is_not_found());

    source.heal("docs");
    check!(store.get_directory("docs", false).await.is_ok());
    check!(source.directory_fetches("docs") == 2);
}

#[rstest]
#[tokio::test]
async fn invalid_directory_path_fails_before_fetching(docs_tree: Arc<ScriptedSource>) {
    let store = structure_store(&docs_tree);

    let_assert!(Err(e) = store.get_directory("docs/../secrets", false).await);
    check!(matches!(e.source, DirectorySource::Path(_)));
    check!(docs_tree.total_fetches() == 0);
}

// --- DocumentStore ---

#[rstest]
#[tokio::test]
async fn document_cache_ignores_extension(docs_tree: Arc<ScriptedSource>) {
    let store = document_store(&docs_tree, EventBus::default());

    let with_ext = store.get_document("docs/a.md", false).await.unwrap();
    let without_ext = store.get_document("docs/a", false).await.unwrap();
    check!(Arc::ptr_eq(&with_ext, &without_ext));
    check!(docs_tree.document_fetches("docs/a.md") == 1);
    check!(store.is_cached("/docs/a/"));
}

#[tokio::test(start_paused = true)]
async fn concurrent_document_requests_share_one_fetch() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_doc("a.md", "A", &[], "body")
            .with_delay(Duration::from_millis(50)),
    );
    let store = document_store(&source, EventBus::default());

    let paths = ["a", "a.md", "/a.md", "a", "a.md"];
    let results = join_all(paths.iter().map(|p| store.get_document(p, false))).await;
    check!(results.iter().all(Result::is_ok));
    check!(source.document_fetches("a.md") == 1);
}

#[rstest]
#[tokio::test]
async fn missing_document_reports_404(docs_tree: Arc<ScriptedSource>) {
    let store = document_store(&docs_tree, EventBus::default());

    let_assert!(Err(e) = store.get_document("docs/missing", false).await);
    check!(e.status == Some(404));
    check!(e.is_not_found());
    check!(matches!(e.source, DocumentSource::Transport(_)));
}

#[rstest]
#[tokio::test]
async fn force_refresh_bypasses_cache(docs_tree: Arc<ScriptedSource>) {
    let store = document_store(&docs_tree, EventBus::default());

    store.get_document("docs/a", false).await.unwrap();
    store.get_document("docs/a", true).await.unwrap();
    check!(docs_tree.document_fetches("docs/a.md") == 2);
}

#[rstest]
#[tokio::test]
async fn tags_come_from_cached_document_when_present(docs_tree: Arc<ScriptedSource>) {
    let store = document_store(&docs_tree, EventBus::default());

    let tags = store.get_tags("docs/b").await.unwrap();
    check!(tags == ["x"]);
    check!(docs_tree.tag_fetches("docs/b.md") == 1);
    check!(!store.is_cached("docs/b"));

    store.get_document("docs/a", false).await.unwrap();
    let tags = store.get_tags("docs/a.md").await.unwrap();
    check!(tags == ["x", "y"]);
    check!(docs_tree.tag_fetches("docs/a.md") == 0);
}

#[rstest]
#[tokio::test]
async fn document_load_publishes_event(docs_tree: Arc<ScriptedSource>) {
    let events = EventBus::default();
    let mut receiver = events.subscribe();
    let store = document_store(&docs_tree, events);

    store.get_document("docs/a", false).await.unwrap();
    let_assert!(Ok(BrowserEvent::DocumentLoaded { path, tags, .. }) = receiver.try_recv());
    check!(path == "docs/a.md");
    check!(tags == ["x", "y"]);

    // Cache hits are silent
    store.get_document("docs/a", false).await.unwrap();
    check!(receiver.try_recv().is_err());
}

// --- Clearing ---

#[rstest]
#[tokio::test]
async fn clear_is_idempotent(docs_tree: Arc<ScriptedSource>) {
    let browser = browser_over(&docs_tree);
    browser.documents().get_document("docs/a", false).await.unwrap();
    browser.structure().get_directory("docs", false).await.unwrap();

    browser.clear_all_caches();
    browser.clear_all_caches();
    check!(browser.documents().cache_stats().size == 0);
    check!(browser.structure().cache_stats().size == 0);

    browser.documents().get_document("docs/a", false).await.unwrap();
    check!(docs_tree.document_fetches("docs/a.md") == 2);
}

#[rstest]
#[tokio::test]
async fn clearing_one_path_keeps_the_rest(docs_tree: Arc<ScriptedSource>) {
    let browser = browser_over(&docs_tree);
    let documents = browser.documents();
    documents.get_document("docs/a", false).await.unwrap();
    documents.get_document("docs/b", false).await.unwrap();

    documents.clear_cache(Some("docs/a.md"));
    documents.clear_cache(Some("docs/a.md"));
    check!(!documents.is_cached("docs/a"));
    check!(documents.is_cached("docs/b"));
}

#[tokio::test(start_paused = true)]
async fn refetch_after_clear_is_not_blocked_by_old_request() {
    let source = Arc::new(
        ScriptedSource::new()
            .with_doc("a.md", "A", &[], "body")
            .with_delay(Duration::from_millis(50)),
    );
    let store = Arc::new(document_store(&source, EventBus::default()));

    let in_flight = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.get_document("a", false).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.clear_cache(None);

    // In-flight fetches are not cancelled: the clear does not start a second one
    let joined = store.get_document("a", false).await.unwrap();
    let original = in_flight.await.unwrap().unwrap();
    check!(Arc::ptr_eq(&joined, &original));
    check!(source.document_fetches("a.md") == 1);
}
