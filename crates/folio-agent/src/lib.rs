//! Continuation protocol for Folio.
//!
//! This crate turns the session store into the four-operation protocol a
//! tool-calling agent uses to read a large result set across many calls,
//! plus a driver for callers that just want everything at once.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │ ContinueResultsTool  │     │ ContinuationDriver   │
//! │ (agent tool calls)   │     │ (drain to completion)│
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            │                            │ PageSource
//!            ▼                            ▼
//!       ┌──────────────────────────────────────┐
//!       │ ContinuationService                  │
//!       │ start / next / has_more / reset      │
//!       └──────────────────┬───────────────────┘
//!                          ▼
//!              ┌──────────────────────┐
//!              │ SessionStore         │
//!              │ (folio-session)      │
//!              └──────────────────────┘
//! ```

pub mod driver;
pub mod error;
pub mod service;
pub mod source;
pub mod tool;
pub mod tools;
pub mod types;

pub use driver::{ContinuationDriver, DEFAULT_MAX_ITERATIONS};
pub use error::{ContinuationError, EXPIRED_MESSAGE, Result, ToolError};
pub use service::ContinuationService;
pub use source::PageSource;
pub use tool::{
    ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolDefinition,
    ToolRegistry, ToolResult,
};
pub use tools::{ContinueAction, ContinueParams, ContinueResultsTool};
pub use types::{Page, SessionState, StartReceipt};

pub use folio_session::{NoPersistence, PersistenceHook, StoreConfig};
pub use folio_types::{PageItem, ResultItem, ResultKind};
