//! Shared types for the Folio continuation cache.

pub mod config;
pub mod item;

pub use config::{
    ConfigProvider, ContinuationConfigProvider, HasContinuationConfig, defaults as config_defaults,
};
pub use item::{ItemError, ItemMetadata, PageItem, ResultItem, ResultKind};
