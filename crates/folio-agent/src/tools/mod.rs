//! Built-in tools.
//!
//! - `continue_results`: page through a stored result set

mod continuation;

pub use continuation::{ContinueAction, ContinueParams, ContinueResultsTool};
