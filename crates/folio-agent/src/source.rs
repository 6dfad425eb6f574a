//! The seam between a paging consumer and whatever serves the pages.

use async_trait::async_trait;
use folio_session::PersistenceHook;
use folio_types::PageItem;

use crate::error::Result;
use crate::service::ContinuationService;
use crate::types::Page;

/// Something that hands out successive pages of a keyed result set.
///
/// [`ContinuationService`] is the production implementation; tests can
/// substitute a misbehaving source to exercise the driver's safeguards.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    /// Consume and return the next page.
    async fn next_page(&self, session_key: &str, page_size: usize) -> Result<Page<T>>;

    /// Items not yet delivered.
    async fn remaining(&self, session_key: &str) -> Result<usize>;

    /// Release the session once it is no longer needed, unless it has been
    /// restarted since `generation`.
    async fn release(&self, session_key: &str, generation: u64) -> Result<()>;
}

#[async_trait]
impl<T, P> PageSource<T> for ContinuationService<T, P>
where
    T: PageItem,
    P: PersistenceHook<T> + 'static,
{
    async fn next_page(&self, session_key: &str, page_size: usize) -> Result<Page<T>> {
        self.next(session_key, Some(page_size)).await
    }

    async fn remaining(&self, session_key: &str) -> Result<usize> {
        self.peek_remaining(session_key).await
    }

    async fn release(&self, session_key: &str, generation: u64) -> Result<()> {
        self.reset_generation(session_key, generation).await.map(|_| ())
    }
}
