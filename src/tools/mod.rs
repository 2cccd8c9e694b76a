use serde::Deserialize;

/// A proposed tool call as serialized by the agent runtime.
///
/// Read-only to the gate. Extra fields the runtime sends alongside
/// (`session_id`, `cwd`, `hook_event_name`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    pub(crate) tool_name: String,
    #[serde(default)]
    pub(crate) tool_input: serde_json::Value,
}

impl ToolInvocation {
    pub fn new(tool_name: &str, tool_input: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.to_owned(),
            tool_input,
        }
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }

    /// Literal shell command in `tool_input["command"]`.
    ///
    /// A missing field, a non-string value, or a `tool_input` that is not an
    /// object all read as the empty command.
    pub fn command(&self) -> &str {
        self.tool_input
            .get("command")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }
}
