//! Tool definitions and dispatch
//!
//! backend마다 도구 하나, 그리고 세션 도구 4개:
//! `session_start`, `session_message`, `session_stop`, `session_list`

use relay_foundation::{BackendDescriptor, Error};
use relay_task::{AgentOrchestrator, InvocationRequest, InvocationResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error as ThisError;
use tracing::debug;

pub const SESSION_START: &str = "session_start";
pub const SESSION_MESSAGE: &str = "session_message";
pub const SESSION_STOP: &str = "session_stop";
pub const SESSION_LIST: &str = "session_list";

/// protocol 에러로 돌려야 하는 호출 실패
#[derive(Debug, ThisError)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("{0}")]
    Internal(String),
}

/// `tools/call` 결과 본문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    fn json<T: Serialize>(value: &T) -> Result<Self, ToolCallError> {
        serde_json::to_string_pretty(value)
            .map(Self::text)
            .map_err(|e| ToolCallError::Internal(e.to_string()))
    }

    /// 성공이면 content, 실패면 에러 줄 + fallback 출력
    pub fn from_invocation(result: &InvocationResult) -> Self {
        if result.success {
            return Self::text(result.content.clone());
        }

        let error = result
            .error()
            .unwrap_or_else(|| "Invocation failed".to_string());
        if result.content.trim().is_empty() {
            Self::error(error)
        } else {
            Self::error(format!("{}\n\n{}", error, result.content))
        }
    }

    pub fn to_value(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.text }],
            "isError": self.is_error,
        })
    }
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InvokeArgs {
    prompt: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    working_dir: Option<String>,
    #[serde(default)]
    timeout_ms: Option<u64>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartArgs {
    backend: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    working_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageArgs {
    session_id: String,
    message: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StopArgs {
    session_id: String,
}

fn parse_args<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, ToolCallError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolCallError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Definitions
// ============================================================================

fn backend_tool(backend: &BackendDescriptor) -> Value {
    let model_hint = if backend.model.is_empty() {
        "Model override".to_string()
    } else {
        format!("Model override (default: {})", backend.model)
    };

    json!({
        "name": backend.name,
        "description": format!(
            "Run the {} agent CLI ({}) with a prompt and return its answer",
            backend.name, backend.command
        ),
        "inputSchema": {
            "type": "object",
            "properties": {
                "prompt": { "type": "string", "description": "Prompt passed to the agent" },
                "model": { "type": "string", "description": model_hint },
                "workingDir": { "type": "string", "description": "Directory the agent runs in" },
                "timeoutMs": { "type": "integer", "minimum": 1, "description": format!("Timeout in milliseconds (default: {})", backend.timeout_ms) },
                "sessionId": { "type": "string", "description": "Continue a session started with session_start" }
            },
            "required": ["prompt"]
        }
    })
}

fn session_tools(backends: &[BackendDescriptor]) -> Vec<Value> {
    let names: Vec<&str> = backends.iter().map(|b| b.name.as_str()).collect();

    vec![
        json!({
            "name": SESSION_START,
            "description": "Start a conversation session with a backend; later messages carry the earlier turns",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "backend": { "type": "string", "enum": names },
                    "model": { "type": "string" },
                    "workingDir": { "type": "string" }
                },
                "required": ["backend"]
            }
        }),
        json!({
            "name": SESSION_MESSAGE,
            "description": "Send a message within a session",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "sessionId": { "type": "string" },
                    "message": { "type": "string" },
                    "timeoutMs": { "type": "integer", "minimum": 1 }
                },
                "required": ["sessionId", "message"]
            }
        }),
        json!({
            "name": SESSION_STOP,
            "description": "End a session and discard its history",
            "inputSchema": {
                "type": "object",
                "properties": { "sessionId": { "type": "string" } },
                "required": ["sessionId"]
            }
        }),
        json!({
            "name": SESSION_LIST,
            "description": "List active sessions",
            "inputSchema": { "type": "object", "properties": {} }
        }),
    ]
}

/// `tools/list` 결과의 tool 배열
pub fn tool_definitions(backends: &[BackendDescriptor]) -> Vec<Value> {
    let mut tools: Vec<Value> = backends.iter().map(backend_tool).collect();
    tools.extend(session_tools(backends));
    tools
}

// ============================================================================
// Dispatch
// ============================================================================

/// orchestrator 에러 -> 사용자 메시지 또는 protocol 에러
fn surface(error: Error) -> Result<ToolOutput, ToolCallError> {
    if error.is_user_facing() {
        Ok(ToolOutput::error(error.to_string()))
    } else {
        Err(ToolCallError::Internal(error.to_string()))
    }
}

fn invocation_output(
    result: relay_foundation::Result<InvocationResult>,
) -> Result<ToolOutput, ToolCallError> {
    match result {
        Ok(result) => Ok(ToolOutput::from_invocation(&result)),
        Err(e) => surface(e),
    }
}

/// tool 하나 실행
pub async fn call_tool(
    orchestrator: &AgentOrchestrator,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput, ToolCallError> {
    debug!(tool = name, "Calling tool");

    match name {
        SESSION_START => {
            let args: StartArgs = parse_args(name, arguments)?;
            let model = non_empty(args.model);
            let working_dir = non_empty(args.working_dir);
            match orchestrator.start_session(&args.backend, model.as_deref(), working_dir.as_deref())
            {
                Ok(started) => ToolOutput::json(&started),
                Err(e) => surface(e),
            }
        }
        SESSION_MESSAGE => {
            let args: MessageArgs = parse_args(name, arguments)?;
            invocation_output(
                orchestrator
                    .send_message(
                        &args.session_id,
                        &args.message,
                        args.timeout_ms.filter(|ms| *ms > 0),
                    )
                    .await,
            )
        }
        SESSION_STOP => {
            let args: StopArgs = parse_args(name, arguments)?;
            let stopped = orchestrator.stop_session(&args.session_id);
            ToolOutput::json(&json!({ "sessionId": args.session_id, "stopped": stopped }))
        }
        SESSION_LIST => ToolOutput::json(&orchestrator.list_sessions()),
        backend => {
            if orchestrator.backend(backend).is_err() {
                return Err(ToolCallError::UnknownTool(backend.to_string()));
            }
            let args: InvokeArgs = parse_args(name, arguments)?;
            let request = InvocationRequest {
                prompt: args.prompt,
                model: non_empty(args.model),
                working_dir: non_empty(args.working_dir),
                timeout_ms: args.timeout_ms.filter(|ms| *ms > 0),
            };
            let session_id = non_empty(args.session_id);
            invocation_output(
                orchestrator
                    .invoke(backend, request, session_id.as_deref())
                    .await,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_foundation::{
        builtin_backends, BackendDescriptor, SessionLimits, RESERVED_BACKEND_NAMES,
    };
    use relay_task::{InvocationFailure, OutputFormat};
    use std::time::Duration;

    fn orchestrator() -> AgentOrchestrator {
        AgentOrchestrator::new(builtin_backends(), SessionLimits::default())
    }

    #[test]
    fn test_definitions_cover_backends_and_sessions() {
        let tools = tool_definitions(&builtin_backends());
        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(
            names,
            vec![
                "claude",
                "gemini",
                "codex",
                SESSION_START,
                SESSION_MESSAGE,
                SESSION_STOP,
                SESSION_LIST
            ]
        );
        assert_eq!(&names[3..], RESERVED_BACKEND_NAMES);
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["prompt"]));
        assert!(tools[0]["inputSchema"]["properties"]["sessionId"].is_object());
        assert_eq!(
            tools[3]["inputSchema"]["properties"]["backend"]["enum"],
            json!(["claude", "gemini", "codex"])
        );
    }

    #[test]
    fn test_output_from_success() {
        let result = InvocationResult::succeeded(
            "claude",
            "sonnet",
            "Everything works.",
            OutputFormat::Claude,
            Duration::ZERO,
        );
        let out = ToolOutput::from_invocation(&result);
        assert_eq!(out, ToolOutput::text("Everything works."));
        assert_eq!(
            out.to_value(),
            json!({"content": [{"type": "text", "text": "Everything works."}], "isError": false})
        );
    }

    #[test]
    fn test_output_from_failure_with_fallback() {
        let result = InvocationResult::failed(
            "codex",
            "gpt-5-codex",
            InvocationFailure::NonZeroExit { code: Some(2) },
            Duration::ZERO,
        )
        .with_content("error: not authenticated");
        let out = ToolOutput::from_invocation(&result);
        assert!(out.is_error);
        assert!(out.text.starts_with("Process exited with non-zero exit code 2"));
        assert!(out.text.ends_with("error: not authenticated"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = call_tool(&orchestrator(), "mystery", json!({"prompt": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(_)));
    }

    #[tokio::test]
    async fn test_missing_prompt_is_invalid_arguments() {
        let err = call_tool(&orchestrator(), "claude", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments { .. }));
    }

    #[tokio::test]
    async fn test_session_tools_round() {
        let orch = orchestrator();

        let out = call_tool(&orch, SESSION_START, json!({"backend": "gemini"}))
            .await
            .unwrap();
        assert!(!out.is_error);
        let started: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(started["backend"], "gemini");
        assert_eq!(started["model"], "gemini-2.5-pro");
        let id = started["sessionId"].as_str().unwrap().to_string();

        let out = call_tool(&orch, SESSION_LIST, Value::Null).await.unwrap();
        let list: Value = serde_json::from_str(&out.text).unwrap();
        assert_eq!(list[0]["id"], id.as_str());
        assert_eq!(list[0]["turnCount"], 0);

        let out = call_tool(&orch, SESSION_STOP, json!({"sessionId": id}))
            .await
            .unwrap();
        assert!(out.text.contains("\"stopped\": true"));

        let out = call_tool(
            &orch,
            SESSION_MESSAGE,
            json!({"sessionId": id, "message": "hello?"}),
        )
        .await
        .unwrap();
        assert!(out.is_error);
        assert!(out.text.contains("Session not found"));
    }

    #[tokio::test]
    async fn test_start_unknown_backend_is_tool_error() {
        let out = call_tool(&orchestrator(), SESSION_START, json!({"backend": "nope"}))
            .await
            .unwrap();
        assert!(out.is_error);
        assert!(out.text.contains("Backend not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_timeout_uses_backend_default() {
        let echo = BackendDescriptor::new("echo", "sh").args(["-c", "echo \"$0\""]);
        let orch = AgentOrchestrator::new(vec![echo], SessionLimits::default());

        let out = call_tool(&orch, "echo", json!({"prompt": "direct", "timeoutMs": 0}))
            .await
            .unwrap();
        assert!(!out.is_error, "{}", out.text);
        assert!(out.text.contains("direct"));

        let started = call_tool(&orch, SESSION_START, json!({"backend": "echo"}))
            .await
            .unwrap();
        let started: Value = serde_json::from_str(&started.text).unwrap();
        let id = started["sessionId"].as_str().unwrap();

        let out = call_tool(
            &orch,
            SESSION_MESSAGE,
            json!({"sessionId": id, "message": "in session", "timeoutMs": 0}),
        )
        .await
        .unwrap();
        assert!(!out.is_error, "{}", out.text);
        assert!(out.text.contains("in session"));
    }
}
