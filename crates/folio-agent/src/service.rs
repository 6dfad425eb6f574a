//! The continuation service: `start`, `next`, `has_more`, `reset`.

use std::time::Duration;

use folio_session::{NoPersistence, PersistenceHook, SessionStore, StoreConfig, validate_key};
use folio_types::PageItem;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ContinuationError, Result};
use crate::types::{Page, SessionState, StartReceipt};

/// Serves a stored result set page by page to repeated callers.
///
/// One service instance is shared (behind an `Arc`) by every agent turn in
/// the process. Sessions are independent: work on one key never waits on
/// another. Calls on the same key are serialized, so concurrent `next`
/// calls receive disjoint pages.
///
/// Dropping the service stops its cleanup task; [`close`](Self::close)
/// additionally waits for the task and empties the store.
pub struct ContinuationService<T, P = NoPersistence> {
    store: SessionStore<T, P>,
    shutdown: CancellationToken,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl<T: PageItem> ContinuationService<T, NoPersistence> {
    /// Open an in-memory service.
    ///
    /// When the configuration enables the cleanup task, this must be called
    /// from within a Tokio runtime; outside one, expiry stays lazy.
    pub fn open(config: StoreConfig) -> Result<Self> {
        Self::open_with_persistence(config, NoPersistence)
    }
}

impl<T, P> ContinuationService<T, P>
where
    T: PageItem,
    P: PersistenceHook<T> + 'static,
{
    /// Open a service whose sessions are mirrored into `persistence`.
    pub fn open_with_persistence(config: StoreConfig, persistence: P) -> Result<Self> {
        let store = SessionStore::with_persistence(config, persistence)?;
        Ok(Self::from_store(store))
    }

    /// Wrap an existing store.
    pub fn from_store(store: SessionStore<T, P>) -> Self {
        let shutdown = CancellationToken::new();
        let cleanup = if tokio::runtime::Handle::try_current().is_ok() {
            store.spawn_cleanup_task(shutdown.child_token())
        } else {
            if store.config().enable_cleanup_task {
                warn!("No Tokio runtime available; expired sessions are only removed on access");
            }
            None
        };

        info!(
            max_entries = store.config().max_entries,
            default_page_size = store.config().default_page_size,
            ttl_secs = store.config().default_ttl.map(|d| d.as_secs()),
            cleanup = cleanup.is_some(),
            "Continuation service opened"
        );

        Self {
            store,
            shutdown,
            cleanup: Mutex::new(cleanup),
        }
    }

    /// Store `items` under `session_key` with the default TTL.
    ///
    /// Any existing session under the key is replaced: its cursor is gone
    /// and the next page starts from the first of the new items.
    pub async fn start(&self, session_key: &str, items: Vec<T>) -> Result<StartReceipt> {
        self.start_inner(session_key, items, self.store.config().default_ttl)
            .await
    }

    /// Like [`start`](Self::start) with a per-session TTL.
    ///
    /// `None` keeps the session until it is reset or pushed out by capacity.
    pub async fn start_with_ttl(
        &self,
        session_key: &str,
        items: Vec<T>,
        ttl: Option<Duration>,
    ) -> Result<StartReceipt> {
        self.start_inner(session_key, items, ttl).await
    }

    async fn start_inner(
        &self,
        session_key: &str,
        items: Vec<T>,
        ttl: Option<Duration>,
    ) -> Result<StartReceipt> {
        validate_key(session_key)?;
        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|source| ContinuationError::InvalidItem { index, source })?;
        }

        let result_set = self.store.put_with_ttl(session_key, items, ttl).await?;
        debug!(
            session_key = %session_key,
            total = result_set.len(),
            generation = result_set.generation(),
            "Session started"
        );

        Ok(StartReceipt {
            session_key: session_key.to_string(),
            generation: result_set.generation(),
            total: result_set.len(),
        })
    }

    /// Deliver the next page and advance the cursor past it.
    ///
    /// `page_size` defaults to the configured page size. Past the end the
    /// page is empty and `exhausted` is set; that is not an error.
    pub async fn next(&self, session_key: &str, page_size: Option<usize>) -> Result<Page<T>> {
        let page_size = match page_size {
            Some(0) => return Err(ContinuationError::InvalidPageSize(0)),
            Some(size) => size,
            None => self.store.config().default_page_size,
        };

        let outcome = self.store.advance(session_key, page_size).await?;
        Ok(outcome.into())
    }

    /// Whether undelivered items remain. Refreshes the session's TTL.
    pub async fn has_more(&self, session_key: &str) -> Result<bool> {
        Ok(self.store.remaining(session_key).await? > 0)
    }

    /// Discard a session. Resetting an unknown key succeeds.
    pub async fn reset(&self, session_key: &str) -> Result<()> {
        let existed = self.store.remove(session_key).await?;
        debug!(session_key = %session_key, existed, "Session reset");
        Ok(())
    }

    /// Discard a session only if it still holds result set `generation`.
    ///
    /// Returns whether it was discarded. A session restarted since that
    /// generation was handed out is kept.
    pub async fn reset_generation(&self, session_key: &str, generation: u64) -> Result<bool> {
        let removed = self.store.remove_generation(session_key, generation).await?;
        debug!(session_key = %session_key, generation, removed, "Session reset");
        Ok(removed)
    }

    /// Report where a session is without touching it.
    pub async fn state(&self, session_key: &str) -> Result<SessionState> {
        match self.store.get(session_key).await {
            Ok(entry) => {
                let total = entry.result_set.len();
                if entry.is_exhausted() {
                    Ok(SessionState::Exhausted { total })
                } else {
                    Ok(SessionState::Active {
                        offset: entry.cursor.offset(),
                        total,
                    })
                }
            }
            Err(e) if e.is_not_found() => Ok(SessionState::Empty),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of undelivered items, without touching the session.
    pub async fn peek_remaining(&self, session_key: &str) -> Result<usize> {
        Ok(self.store.get(session_key).await?.remaining())
    }

    /// Page size used when `next` is called without one.
    pub fn default_page_size(&self) -> usize {
        self.store.config().default_page_size
    }

    pub fn config(&self) -> &StoreConfig {
        self.store.config()
    }

    /// The underlying store.
    pub fn store(&self) -> &SessionStore<T, P> {
        &self.store
    }

    /// Stop the cleanup task, wait for it, and drop every session.
    pub async fn close(&self) {
        self.shutdown.cancel();
        let handle = self.cleanup.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "Cleanup task ended abnormally");
        }
        self.store.clear();
        info!("Continuation service closed");
    }
}

impl<T, P> Drop for ContinuationService<T, P> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::ResultItem;

    fn service(max_entries: usize) -> ContinuationService<u32> {
        let config = StoreConfig::new()
            .with_max_entries(max_entries)
            .with_ttl(Duration::from_secs(60))
            .with_default_page_size(2);
        ContinuationService::open(config).unwrap()
    }

    #[tokio::test]
    async fn test_start_then_pages() {
        let service = service(4);
        let receipt = service.start("q", vec![1, 2, 3]).await.unwrap();
        assert_eq!(receipt.total, 3);

        let page = service.next("q", None).await.unwrap();
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.has_more());

        let page = service.next("q", None).await.unwrap();
        assert_eq!(page.items, vec![3]);
        assert!(page.exhausted);

        let page = service.next("q", None).await.unwrap();
        assert!(page.is_empty());
        assert!(page.exhausted);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let service = service(4);
        service.start("q", vec![1]).await.unwrap();
        let err = service.next("q", Some(0)).await.unwrap_err();
        assert!(matches!(err, ContinuationError::InvalidPageSize(0)));

        // Cursor untouched.
        assert_eq!(service.next("q", Some(1)).await.unwrap().items, vec![1]);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let service = service(4);
        let err = service.start("", vec![1]).await.unwrap_err();
        assert!(matches!(err, ContinuationError::InvalidKey(_)));
        let err = service.next("", None).await.unwrap_err();
        assert!(matches!(err, ContinuationError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let service = service(4);
        let err = service.next("nope", None).await.unwrap_err();
        assert!(matches!(err, ContinuationError::UnknownSession(_)));
        let err = service.has_more("nope").await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let service = service(4);
        service.start("q", vec![1]).await.unwrap();
        service.reset("q").await.unwrap();
        service.reset("q").await.unwrap();
        assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let service = service(4);
        assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);

        service.start("q", vec![1, 2, 3]).await.unwrap();
        assert_eq!(
            service.state("q").await.unwrap(),
            SessionState::Active { offset: 0, total: 3 }
        );

        service.next("q", Some(2)).await.unwrap();
        assert_eq!(
            service.state("q").await.unwrap(),
            SessionState::Active { offset: 2, total: 3 }
        );

        service.next("q", Some(2)).await.unwrap();
        assert_eq!(
            service.state("q").await.unwrap(),
            SessionState::Exhausted { total: 3 }
        );
    }

    #[tokio::test]
    async fn test_empty_start_is_immediately_exhausted() {
        let service = service(4);
        service.start("q", Vec::new()).await.unwrap();
        assert!(!service.has_more("q").await.unwrap());
        assert_eq!(
            service.state("q").await.unwrap(),
            SessionState::Exhausted { total: 0 }
        );
    }

    #[tokio::test]
    async fn test_invalid_item_rejected_before_store() {
        let config = StoreConfig::new().with_max_entries(4);
        let service: ContinuationService<ResultItem> = ContinuationService::open(config).unwrap();

        let items = vec![ResultItem::text("fine"), ResultItem::text("   ")];
        let err = service.start("q", items).await.unwrap_err();
        assert!(matches!(err, ContinuationError::InvalidItem { index: 1, .. }));
        assert_eq!(service.state("q").await.unwrap(), SessionState::Empty);
    }

    #[tokio::test]
    async fn test_close_empties_store() {
        let service = service(4);
        service.start("a", vec![1]).await.unwrap();
        service.start("b", vec![2]).await.unwrap();
        service.close().await;
        assert!(service.store().is_empty());
        assert!(service.cleanup.lock().is_none());
    }

    #[test]
    fn test_open_outside_runtime_skips_cleanup() {
        let service: ContinuationService<u32> = service(4);
        assert!(service.cleanup.lock().is_none());
    }
}
