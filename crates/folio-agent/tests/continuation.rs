//! End-to-end behavior of the continuation protocol.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use folio_agent::{
    ContinuationDriver, ContinuationError, ContinuationService, ContinueResultsTool, Page,
    PageSource, SessionState, StoreConfig, Tool, ToolContext, ToolRegistry,
};
use serde_json::json;

fn config(max_entries: usize, ttl_secs: u64) -> StoreConfig {
    StoreConfig::new()
        .with_max_entries(max_entries)
        .with_ttl(Duration::from_secs(ttl_secs))
        .with_default_page_size(3)
        .with_cleanup_task(false)
}

fn service(max_entries: usize, ttl_secs: u64) -> ContinuationService<u32> {
    ContinuationService::open(config(max_entries, ttl_secs)).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_least_recently_touched_session_is_evicted() {
    let service = service(2, 60);

    service.start("q1", vec![1, 2, 3]).await.unwrap();
    service.start("q2", vec![4, 5]).await.unwrap();

    let page = service.next("q1", Some(2)).await.unwrap();
    assert_eq!(page.items, vec![1, 2]);
    assert!(!page.exhausted);

    service.start("q3", vec![6]).await.unwrap();

    let err = service.next("q2", Some(1)).await.unwrap_err();
    assert!(matches!(err, ContinuationError::UnknownSession(ref k) if k == "q2"));

    let page = service.next("q1", Some(2)).await.unwrap();
    assert_eq!(page.items, vec![3]);
    assert!(page.exhausted);
}

#[tokio::test(start_paused = true)]
async fn test_two_sessions_with_eviction_and_expiry() {
    let service = service(2, 60);

    service.start("q1", (1..=7).collect()).await.unwrap();

    let page = service.next("q1", Some(3)).await.unwrap();
    assert_eq!(page.items, vec![1, 2, 3]);
    assert!(!page.exhausted);
    let page = service.next("q1", Some(3)).await.unwrap();
    assert_eq!(page.items, vec![4, 5, 6]);
    assert!(!page.exhausted);

    service.start("q2", vec![10, 20]).await.unwrap();
    let page = service.next("q2", Some(5)).await.unwrap();
    assert_eq!(page.items, vec![10, 20]);
    assert!(page.exhausted);

    // q2 was used more recently, so q1 is the one pushed out.
    service.start("q3", vec![99]).await.unwrap();
    let err = service.next("q1", Some(3)).await.unwrap_err();
    assert!(matches!(err, ContinuationError::UnknownSession(_)));

    tokio::time::advance(Duration::from_secs(61)).await;
    let err = service.has_more("q2").await.unwrap_err();
    assert!(matches!(err, ContinuationError::UnknownSession(_)));
}

#[tokio::test]
async fn test_every_item_delivered_exactly_once_in_order() {
    for page_size in 1..=8 {
        let service = service(4, 60);
        let items: Vec<u32> = (0..20).collect();
        service.start("q", items.clone()).await.unwrap();

        let mut seen = Vec::new();
        loop {
            let page = service.next("q", Some(page_size)).await.unwrap();
            seen.extend(page.items);
            if page.exhausted {
                break;
            }
        }
        assert_eq!(seen, items, "page_size {page_size}");
    }
}

#[tokio::test]
async fn test_offset_never_decreases() {
    let service = service(4, 60);
    service.start("q", (0..10).collect()).await.unwrap();

    let mut last = 0;
    for size in [4, 1, 3, 5, 2] {
        let page = service.next("q", Some(size)).await.unwrap();
        assert!(page.offset >= last);
        assert!(page.offset <= page.total);
        last = page.offset;
    }
    assert_eq!(last, 10);
}

#[tokio::test]
async fn test_restart_replaces_cursor() {
    let service = service(4, 60);
    service.start("q", vec![1, 2, 3, 4]).await.unwrap();
    service.next("q", Some(3)).await.unwrap();

    let first = service.start("q", vec![7, 8]).await.unwrap();
    let page = service.next("q", Some(3)).await.unwrap();
    assert_eq!(page.items, vec![7, 8]);
    assert_eq!(page.total, 2);

    let second = service.start("q", vec![9]).await.unwrap();
    assert!(second.generation > first.generation);
}

#[tokio::test]
async fn test_over_drain_is_stable() {
    let service = service(4, 60);
    service.start("q", vec![1, 2]).await.unwrap();
    service.next("q", Some(10)).await.unwrap();

    for _ in 0..3 {
        let page = service.next("q", Some(10)).await.unwrap();
        assert!(page.items.is_empty());
        assert!(page.exhausted);
        assert_eq!(page.offset, 2);
    }
    assert!(!service.has_more("q").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_access_refreshes_ttl() {
    let service = service(4, 60);
    service.start("q", (0..10).collect()).await.unwrap();

    for _ in 0..3 {
        tokio::time::advance(Duration::from_secs(45)).await;
        service.next("q", Some(1)).await.unwrap();
    }
    assert!(service.has_more("q").await.unwrap());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_has_more_refreshes_ttl() {
    let service = service(4, 60);
    service.start("q", vec![1, 2]).await.unwrap();

    tokio::time::advance(Duration::from_secs(40)).await;
    assert!(service.has_more("q").await.unwrap());

    // 80s after start, 40s after has_more.
    tokio::time::advance(Duration::from_secs(40)).await;
    assert_eq!(
        service.state("q").await.unwrap(),
        SessionState::Active { offset: 0, total: 2 }
    );

    // state does not refresh, so the TTL still runs from has_more.
    tokio::time::advance(Duration::from_secs(21)).await;
    assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);
}

#[tokio::test(start_paused = true)]
async fn test_expired_session_preferred_over_lru_at_capacity() {
    let service = service(2, 60);
    service.start("long", vec![1]).await.unwrap();
    service
        .start_with_ttl("short", vec![2], Some(Duration::from_secs(5)))
        .await
        .unwrap();

    // "long" is least recently used, but "short" has expired.
    tokio::time::advance(Duration::from_secs(10)).await;
    service.start("new", vec![3]).await.unwrap();

    assert!(service.has_more("long").await.unwrap());
    assert!(service.has_more("new").await.unwrap());
    assert_eq!(service.state("short").await.unwrap(), SessionState::Empty);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_next_calls_get_disjoint_pages() {
    let service = Arc::new(service(4, 60));
    service.start("q", (0..200).collect()).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            let mut got = Vec::new();
            loop {
                let page = service.next("q", Some(7)).await.unwrap();
                got.extend(page.items);
                if page.exhausted {
                    break;
                }
            }
            got
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    assert_eq!(all.len(), 200);
    let unique: HashSet<u32> = all.into_iter().collect();
    assert_eq!(unique.len(), 200);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let service = service(4, 60);
    service.start("a", vec![1, 2, 3]).await.unwrap();
    service.start("b", vec![4, 5, 6]).await.unwrap();

    service.next("a", Some(2)).await.unwrap();
    service.reset("a").await.unwrap();

    let page = service.next("b", Some(2)).await.unwrap();
    assert_eq!(page.items, vec![4, 5]);
}

#[tokio::test]
async fn test_driver_drains_remaining_and_releases() {
    let service = Arc::new(service(4, 60));
    service.start("q", (0..10).collect()).await.unwrap();
    service.next("q", Some(3)).await.unwrap();

    let driver = ContinuationDriver::new(Arc::clone(&service));
    let rest = driver.drain_all("q", 4).await.unwrap();
    assert_eq!(rest, (3..10).collect::<Vec<u32>>());
    assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);
}

#[tokio::test]
async fn test_driver_can_keep_session() {
    let service = Arc::new(service(4, 60));
    service.start("q", vec![1, 2]).await.unwrap();

    let driver = ContinuationDriver::new(Arc::clone(&service)).with_release_on_completion(false);
    assert_eq!(driver.drain_all("q", 1).await.unwrap(), vec![1, 2]);
    assert_eq!(
        service.state("q").await.unwrap(),
        SessionState::Exhausted { total: 2 }
    );
}

#[tokio::test]
async fn test_driver_unknown_session() {
    let service = Arc::new(service(4, 60));
    let driver = ContinuationDriver::new(Arc::clone(&service));
    let err = driver.drain_all::<u32>("missing", 5).await.unwrap_err();
    assert!(err.is_retryable());
}

/// Restarts its session with new items once `restart_after` pages are served.
struct RestartingSource {
    service: Arc<ContinuationService<u32>>,
    restart_after: usize,
    served: AtomicUsize,
}

impl RestartingSource {
    fn new(service: Arc<ContinuationService<u32>>, restart_after: usize) -> Self {
        Self {
            service,
            restart_after,
            served: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PageSource<u32> for RestartingSource {
    async fn next_page(
        &self,
        session_key: &str,
        page_size: usize,
    ) -> folio_agent::Result<Page<u32>> {
        let page = self.service.next_page(session_key, page_size).await?;
        if self.served.fetch_add(1, Ordering::SeqCst) + 1 == self.restart_after {
            self.service.start(session_key, vec![100, 200]).await?;
        }
        Ok(page)
    }

    async fn remaining(&self, session_key: &str) -> folio_agent::Result<usize> {
        self.service.peek_remaining(session_key).await
    }

    async fn release(&self, session_key: &str, generation: u64) -> folio_agent::Result<()> {
        self.service.release(session_key, generation).await
    }
}

#[tokio::test]
async fn test_driver_release_spares_restarted_session() {
    let service = Arc::new(service(4, 60));
    service.start("q", (0..4).collect()).await.unwrap();

    // Restarted right after the last page, before the driver releases.
    let source = Arc::new(RestartingSource::new(Arc::clone(&service), 2));
    let driver = ContinuationDriver::new(source);
    assert_eq!(driver.drain_all::<u32>("q", 2).await.unwrap(), vec![0, 1, 2, 3]);

    assert_eq!(
        service.state("q").await.unwrap(),
        SessionState::Active { offset: 0, total: 2 }
    );
    assert_eq!(service.next("q", None).await.unwrap().items, vec![100, 200]);
}

#[tokio::test]
async fn test_driver_refuses_to_splice_restarted_session() {
    let service = Arc::new(service(4, 60));
    service.start("q", (0..6).collect()).await.unwrap();

    let source = Arc::new(RestartingSource::new(Arc::clone(&service), 1));
    let driver = ContinuationDriver::new(source);
    let err = driver.drain_all::<u32>("q", 2).await.unwrap_err();
    assert!(matches!(err, ContinuationError::UnknownSession(ref k) if k == "q"));

    // The newer session is left in place.
    assert_ne!(service.state("q").await.unwrap(), SessionState::Empty);
}

#[tokio::test]
async fn test_tool_through_registry() {
    let service = Arc::new(service(4, 60));
    service.start("q", (0..5).collect()).await.unwrap();

    let mut registry = ToolRegistry::new();
    registry.register(ContinueResultsTool::new(Arc::clone(&service)));
    let ctx = ToolContext::new();

    let result = registry
        .execute("continue_results", json!({"session_key": "q"}), &ctx)
        .await
        .unwrap();
    let body = result.as_json().unwrap();
    assert_eq!(body["items"], json!([0, 1, 2]));
    assert_eq!(body["has_more"], true);

    let tool = registry.get("continue_results").unwrap();
    assert_eq!(tool.name(), "continue_results");
}
