//! Tool that lets an agent page through a stored result set.
//!
//! Another tool (a search, a document extraction) stores its full output
//! with [`ContinuationService::start`] and tells the model the session key.
//! The model then calls `continue_results` whenever it wants more.

use std::sync::Arc;

use async_trait::async_trait;
use folio_session::{NoPersistence, PersistenceHook};
use folio_types::{PageItem, config_defaults};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, error};

use crate::error::{ContinuationError, ToolError};
use crate::service::ContinuationService;
use crate::tool::{ParamExt, ParamResult, ParameterValidationError, Tool, ToolContext, ToolResult};

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// What the caller wants done with the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueAction {
    /// Deliver the next page.
    Next,
    /// Report whether more items remain.
    HasMore,
    /// Discard the session.
    Reset,
}

impl ContinueAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::HasMore => "has_more",
            Self::Reset => "reset",
        }
    }
}

/// Parameters for the `continue_results` tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinueParams {
    pub session_key: String,
    pub action: ContinueAction,
    pub page_size: Option<usize>,
}

impl ContinueParams {
    /// Parse tool parameters, bounding `page_size` by `max_page_size`.
    pub fn parse(params: &Value, max_page_size: usize) -> ParamResult<Self> {
        let session_key = params.required_str(
            "session_key",
            "pass the session key returned alongside the first page of results",
        )?;
        if session_key.trim().is_empty() {
            return Err(ParameterValidationError::invalid_value(
                "session_key",
                session_key,
                "must not be empty",
            ));
        }

        let action = match params.optional_str("action")? {
            None | Some("next") => ContinueAction::Next,
            Some("has_more") => ContinueAction::HasMore,
            Some("reset") => ContinueAction::Reset,
            Some(other) => {
                return Err(ParameterValidationError::invalid_value(
                    "action",
                    other,
                    "expected one of: next, has_more, reset",
                ));
            }
        };

        let page_size = params.optional_usize("page_size")?;
        if let Some(size) = page_size
            && !(1..=max_page_size).contains(&size)
        {
            return Err(ParameterValidationError::out_of_range(
                "page_size",
                size,
                format!("must be between 1 and {max_page_size}"),
            ));
        }

        Ok(Self {
            session_key: session_key.to_string(),
            action,
            page_size,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool
// ─────────────────────────────────────────────────────────────────────────────

/// Tool exposing `next`, `has_more` and `reset` to the model.
pub struct ContinueResultsTool<T, P = NoPersistence> {
    service: Arc<ContinuationService<T, P>>,
    max_page_size: usize,
}

impl<T, P> ContinueResultsTool<T, P> {
    pub fn new(service: Arc<ContinuationService<T, P>>) -> Self {
        Self {
            service,
            max_page_size: config_defaults::MAX_PAGE_SIZE,
        }
    }

    /// Largest page a single call may request.
    pub fn with_max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max.max(1);
        self
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }
}

/// Turn a protocol error into something the model can act on.
fn failure_result(session_key: &str, err: ContinuationError) -> ToolResult {
    match err {
        ContinuationError::UnknownSession(_) => {
            debug!(session_key = %session_key, "Continuation requested for unknown session");
            ToolResult::error(err.user_message())
        }
        ContinuationError::InvalidKey(_) | ContinuationError::InvalidPageSize(_) => {
            ToolResult::error(err.user_message())
        }
        other => {
            error!(session_key = %session_key, error = %other, "Continuation failed");
            ToolResult::fatal_error(other.user_message())
        }
    }
}

#[async_trait]
impl<T, P> Tool for ContinueResultsTool<T, P>
where
    T: PageItem + Serialize,
    P: PersistenceHook<T> + 'static,
{
    fn name(&self) -> &str {
        "continue_results"
    }

    fn description(&self) -> &str {
        "Fetch more results from an earlier request whose output was too large to return at once. Call with action 'next' to get the next page, 'has_more' to check whether anything is left, or 'reset' once you no longer need the results. If the session has expired you must repeat the original request."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_key": {
                    "type": "string",
                    "description": "Session key returned with the first page of results"
                },
                "action": {
                    "type": "string",
                    "enum": ["next", "has_more", "reset"],
                    "description": "What to do (default: next)"
                },
                "page_size": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": self.max_page_size,
                    "description": format!(
                        "Items to return (default: {})",
                        self.service.default_page_size()
                    )
                }
            },
            "required": ["session_key"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let params = match ContinueParams::parse(&params, self.max_page_size) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let key = params.session_key.as_str();

        let result = match params.action {
            ContinueAction::Next => match self.service.next(key, params.page_size).await {
                Ok(page) => ToolResult::json(json!({
                    "session_key": key,
                    "items": serde_json::to_value(&page.items)?,
                    "offset": page.offset,
                    "total": page.total,
                    "exhausted": page.exhausted,
                    "has_more": page.has_more(),
                })),
                Err(e) => failure_result(key, e),
            },
            ContinueAction::HasMore => match self.service.has_more(key).await {
                Ok(has_more) => ToolResult::json(json!({
                    "session_key": key,
                    "has_more": has_more,
                })),
                Err(e) => failure_result(key, e),
            },
            ContinueAction::Reset => match self.service.reset(key).await {
                Ok(()) => ToolResult::json(json!({
                    "session_key": key,
                    "reset": true,
                })),
                Err(e) => failure_result(key, e),
            },
        };

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXPIRED_MESSAGE;
    use folio_session::StoreConfig;
    use folio_types::ResultItem;
    use tokio_util::sync::CancellationToken;

    fn tool() -> ContinueResultsTool<ResultItem> {
        let config = StoreConfig::new()
            .with_max_entries(8)
            .with_default_page_size(2);
        let service = Arc::new(ContinuationService::open(config).unwrap());
        ContinueResultsTool::new(service).with_max_page_size(10)
    }

    fn hits(n: usize) -> Vec<ResultItem> {
        (0..n)
            .map(|i| {
                ResultItem::search_hit(
                    format!("Result {i}"),
                    format!("https://example.com/{i}"),
                    format!("snippet {i}"),
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let params = ContinueParams::parse(&json!({"session_key": "q"}), 10).unwrap();
        assert_eq!(params.action, ContinueAction::Next);
        assert_eq!(params.page_size, None);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        let err = ContinueParams::parse(&json!({}), 10).unwrap_err();
        assert_eq!(err.parameter_name(), "session_key");

        let err = ContinueParams::parse(&json!({"session_key": "  "}), 10).unwrap_err();
        assert!(matches!(err, ParameterValidationError::InvalidValue { .. }));

        let err =
            ContinueParams::parse(&json!({"session_key": "q", "action": "skip"}), 10).unwrap_err();
        assert_eq!(err.parameter_name(), "action");

        let err =
            ContinueParams::parse(&json!({"session_key": "q", "page_size": 0}), 10).unwrap_err();
        assert!(matches!(err, ParameterValidationError::OutOfRange { .. }));

        let err =
            ContinueParams::parse(&json!({"session_key": "q", "page_size": 11}), 10).unwrap_err();
        assert!(err.to_string().contains("between 1 and 10"));
    }

    #[test]
    fn test_tool_definition() {
        let tool = tool();
        assert_eq!(tool.name(), "continue_results");
        let params = tool.parameters();
        assert_eq!(params["properties"]["page_size"]["maximum"], 10);
        assert!(
            params["required"]
                .as_array()
                .unwrap()
                .contains(&json!("session_key"))
        );
    }

    #[tokio::test]
    async fn test_pages_through_results() {
        let tool = tool();
        tool.service.start("search-1", hits(3)).await.unwrap();
        let ctx = ToolContext::default();

        let result = tool
            .execute(json!({"session_key": "search-1"}), &ctx)
            .await
            .unwrap();
        let body = result.as_json().unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["items"][0]["title"], "Result 0");
        assert_eq!(body["offset"], 2);
        assert_eq!(body["has_more"], true);

        let result = tool
            .execute(json!({"session_key": "search-1", "page_size": 5}), &ctx)
            .await
            .unwrap();
        let body = result.as_json().unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["exhausted"], true);

        let result = tool
            .execute(
                json!({"session_key": "search-1", "action": "has_more"}),
                &ctx,
            )
            .await
            .unwrap();
        assert_eq!(result.as_json().unwrap()["has_more"], false);
    }

    #[tokio::test]
    async fn test_unknown_session_is_recoverable() {
        let tool = tool();
        let result = tool
            .execute(json!({"session_key": "gone"}), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(
            result,
            ToolResult::Error {
                message: EXPIRED_MESSAGE.to_string(),
                recoverable: true,
            }
        );
    }

    #[tokio::test]
    async fn test_reset_action() {
        let tool = tool();
        tool.service.start("q", hits(1)).await.unwrap();
        let ctx = ToolContext::default();

        let result = tool
            .execute(json!({"session_key": "q", "action": "reset"}), &ctx)
            .await
            .unwrap();
        assert_eq!(result.as_json().unwrap()["reset"], true);

        let result = tool.execute(json!({"session_key": "q"}), &ctx).await.unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_invalid_params_become_error_result() {
        let tool = tool();
        let result = tool
            .execute(json!({"session_key": "q", "page_size": "lots"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.to_llm_content().contains("page_size"));
    }

    #[tokio::test]
    async fn test_cancelled() {
        let tool = tool();
        let ctx = ToolContext::default();
        ctx.cancellation.cancel();
        let result = tool.execute(json!({"session_key": "q"}), &ctx).await.unwrap();
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_cancelled_by_host_token() {
        let tool = tool();
        let host = CancellationToken::new();
        let ctx = ToolContext::new().with_cancellation(host.child_token());

        assert!(!ctx.is_cancelled());
        let result = tool.execute(json!({"session_key": "q"}), &ctx).await.unwrap();
        assert_eq!(result.to_llm_content(), format!("Error: {EXPIRED_MESSAGE}"));

        host.cancel();
        assert!(ctx.is_cancelled());
        let result = tool.execute(json!({"session_key": "q"}), &ctx).await.unwrap();
        assert_eq!(result.to_llm_content(), "Error: Operation cancelled");
    }
}
