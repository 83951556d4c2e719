//! Tool calling.

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::Result;
use crate::message::{ToolOutput, ToolUseBlock};

/// A set of tools an agent can invoke.
///
/// Implementations return tool output as a stream so long-running tools can
/// report progress; the agent feeds the final chunk back to the model.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Chat-style tool schemas, one per tool:
    /// `{"type": "function", "function": {"name": ..., "description": ...,
    /// "parameters": {...}}}`. Transports reshape these into their vendor's
    /// format.
    fn schemas(&self) -> Vec<Value>;

    /// Invoke the tool named in `tool_use` with its parsed arguments.
    async fn call_tool(&self, tool_use: &ToolUseBlock) -> Result<BoxStream<'static, ToolOutput>>;
}
