//! Drain a session to completion with a hard iteration bound.

use std::sync::Arc;

use folio_types::config_defaults;
use tracing::{debug, error, warn};

use crate::error::{ContinuationError, Result};
use crate::source::PageSource;

/// Upper limit on pages fetched by one drain, whatever the set size.
pub const DEFAULT_MAX_ITERATIONS: usize = config_defaults::MAX_DRAIN_ITERATIONS;

/// Pulls every remaining page from a [`PageSource`] into one list.
///
/// A correct source reaches exhaustion in `ceil(remaining / page_size)`
/// pages. The driver allows one more than that and reports
/// [`ContinuationError::ContinuationStalled`] past it, so a source that
/// never reports exhaustion cannot spin forever.
///
/// Every page must come from the same result set generation. If the key
/// is restarted mid-drain the drain fails with
/// [`ContinuationError::UnknownSession`] rather than splice two sets, and
/// release never discards a newer generation.
pub struct ContinuationDriver<S> {
    source: Arc<S>,
    max_iterations: usize,
    release_on_completion: bool,
}

impl<S> ContinuationDriver<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            release_on_completion: true,
        }
    }

    /// Cap the number of pages a single drain may fetch.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Whether to release the session after a successful drain.
    pub fn with_release_on_completion(mut self, release: bool) -> Self {
        self.release_on_completion = release;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Fetch pages of `page_size` until the source reports exhaustion.
    ///
    /// Returns the remaining items in order. Items delivered before the
    /// call are not included.
    pub async fn drain_all<T>(&self, session_key: &str, page_size: usize) -> Result<Vec<T>>
    where
        S: PageSource<T>,
    {
        if page_size == 0 {
            return Err(ContinuationError::InvalidPageSize(0));
        }

        let remaining = self.source.remaining(session_key).await?;
        let bound = remaining
            .div_ceil(page_size)
            .saturating_add(1)
            .min(self.max_iterations);

        let mut items = Vec::with_capacity(remaining);
        let mut generation = None;
        let mut iterations = 0;
        loop {
            if iterations >= bound {
                error!(
                    session_key = %session_key,
                    iterations,
                    collected = items.len(),
                    "Continuation did not reach exhaustion"
                );
                return Err(ContinuationError::ContinuationStalled {
                    session_key: session_key.to_string(),
                    iterations,
                });
            }

            let page = self.source.next_page(session_key, page_size).await?;
            iterations += 1;
            if *generation.get_or_insert(page.generation) != page.generation {
                warn!(
                    session_key = %session_key,
                    collected = items.len(),
                    "Session restarted during drain"
                );
                return Err(ContinuationError::UnknownSession(session_key.to_string()));
            }
            let exhausted = page.exhausted;
            items.extend(page.items);
            if exhausted {
                break;
            }
        }

        debug!(
            session_key = %session_key,
            iterations,
            collected = items.len(),
            "Session drained"
        );

        if self.release_on_completion
            && let Some(generation) = generation
            && let Err(e) = self.source.release(session_key, generation).await
        {
            warn!(session_key = %session_key, error = %e, "Failed to release drained session");
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Page;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Claims items remain forever and never reports exhaustion.
    #[derive(Default)]
    struct StuckSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PageSource<u32> for StuckSource {
        async fn next_page(&self, _key: &str, _page_size: usize) -> Result<Page<u32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Page {
                items: vec![7],
                offset: 1,
                total: 10,
                exhausted: false,
                generation: 1,
            })
        }

        async fn remaining(&self, _key: &str) -> Result<usize> {
            Ok(4)
        }

        async fn release(&self, _key: &str, _generation: u64) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_stuck_source_stalls_at_bound() {
        let source = Arc::new(StuckSource::default());
        let driver = ContinuationDriver::new(Arc::clone(&source));

        let err = driver.drain_all::<u32>("q", 2).await.unwrap_err();
        // ceil(4 / 2) + 1
        assert!(matches!(
            err,
            ContinuationError::ContinuationStalled { iterations: 3, .. }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_max_iterations_caps_bound() {
        let source = Arc::new(StuckSource::default());
        let driver = ContinuationDriver::new(Arc::clone(&source)).with_max_iterations(1);

        let err = driver.drain_all::<u32>("q", 1).await.unwrap_err();
        assert!(matches!(
            err,
            ContinuationError::ContinuationStalled { iterations: 1, .. }
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let source = Arc::new(StuckSource::default());
        let driver = ContinuationDriver::new(Arc::clone(&source));
        let err = driver.drain_all::<u32>("q", 0).await.unwrap_err();
        assert!(matches!(err, ContinuationError::InvalidPageSize(0)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_max_iterations_floor() {
        let driver = ContinuationDriver::new(Arc::new(StuckSource::default())).with_max_iterations(0);
        assert_eq!(driver.max_iterations(), 1);
    }
}
