//! Session store for paginated result sets.
//!
//! This crate owns every live session of the continuation cache:
//! - LRU eviction bounds the number of sessions held in memory
//! - Per-entry TTL expires sessions nobody comes back for
//! - A per-key lock makes page reads on one session serializable
//! - Persistence hooks let a shared backing store mirror the sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_session::{SessionStore, StoreConfig};
//!
//! let config = StoreConfig::default()
//!     .with_max_entries(1000)
//!     .with_ttl(Duration::from_secs(600));
//!
//! let store = SessionStore::new(config)?;
//! store.put("query-1", vec![1, 2, 3]).await?;
//! let page = store.advance("query-1", 2).await?;
//! ```

mod config;
mod cursor;
mod entry;
mod error;
mod persistence;
mod store;
mod ttl;

pub use config::{DEFAULT_PAGE_SIZE, StoreConfig};
pub use cursor::PageCursor;
pub use entry::{PageOutcome, ResultSet, SessionEntry};
pub use error::{Error, Result};
pub use persistence::{EvictionReason, NoPersistence, PersistenceHook, SessionSnapshot};
pub use store::{SessionStore, StoreStats, validate_key};
pub use ttl::{AccessRecord, TtlTracker};
