//! Stdio tool server - newline-delimited JSON-RPC 2.0
//!
//! 요청마다 task를 띄워서 긴 backend 호출이 다른 요청을 막지 않게 한다.
//! 응답은 writer task 하나가 순서대로 한 줄씩 쓴다.
//! stdout은 protocol 전용이므로 로그는 전부 stderr로 간다.

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
use crate::tools::{call_tool, tool_definitions, ToolCallError};
use relay_task::AgentOrchestrator;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const SERVER_NAME: &str = "relay";

/// Tool server
#[derive(Clone)]
pub struct ToolServer {
    orchestrator: Arc<AgentOrchestrator>,
}

impl ToolServer {
    pub fn new(orchestrator: Arc<AgentOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// EOF까지 요청 처리 후 진행 중인 호출을 기다리고 세션을 정리한다
    pub async fn serve<R, W>(self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        // stdout writer task
        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(response) = rx.recv().await {
                let line = match serde_json::to_string(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        error!("Failed to serialize response: {}", e);
                        continue;
                    }
                };
                if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()).await {
                    error!("Failed to write response: {}", e);
                    break;
                }
                if let Err(e) = writer.flush().await {
                    error!("Failed to flush response: {}", e);
                    break;
                }
            }
        });

        info!("Tool server listening on stdio");

        let mut in_flight = JoinSet::new();
        let mut reader = reader;
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    error!("Failed to read stdin: {}", e);
                    break;
                }
            }

            // UTF-8이 아닌 줄도 parse error로 응답하고 계속 읽는다
            let line = match String::from_utf8(std::mem::take(&mut buf)) {
                Ok(line) => line,
                Err(e) => {
                    debug!("Request line is not valid UTF-8: {}", e);
                    let _ = tx.send(JsonRpcResponse::failure(
                        Value::Null,
                        JsonRpcError::parse_error(),
                    ));
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            let server = self.clone();
            let tx = tx.clone();
            in_flight.spawn(async move {
                if let Some(response) = server.handle_line(line.trim_end()).await {
                    let _ = tx.send(response);
                }
            });

            // 끝난 task 정리
            while let Some(joined) = in_flight.try_join_next() {
                if let Err(e) = joined {
                    warn!("Request task failed: {}", e);
                }
            }
        }

        debug!(pending = in_flight.len(), "stdin closed, waiting for in-flight requests");
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                warn!("Request task failed: {}", e);
            }
        }

        drop(tx);
        let _ = writer_task.await;

        self.orchestrator.shutdown();
        info!("Tool server stopped");
        Ok(())
    }

    /// 한 줄 처리. notification이면 응답 없음
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                debug!("Unparsable request line: {}", e);
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::parse_error(),
                ));
            }
        };

        let id_hint = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    id_hint,
                    JsonRpcError::invalid_request(),
                ))
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.unwrap_or(Value::Null);

        let response = match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        };
        Some(response)
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({
                "tools": tool_definitions(self.orchestrator.backends())
            })),
            "tools/call" => self.call(params.unwrap_or(Value::Null)).await,
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    async fn call(&self, params: Value) -> Result<Value, JsonRpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| JsonRpcError::invalid_params("tools/call requires a tool name"))?;
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match call_tool(&self.orchestrator, name, arguments).await {
            Ok(output) => Ok(output.to_value()),
            Err(e @ ToolCallError::UnknownTool(_)) | Err(e @ ToolCallError::InvalidArguments { .. }) => {
                Err(JsonRpcError::invalid_params(e.to_string()))
            }
            Err(ToolCallError::Internal(message)) => Err(JsonRpcError::internal_error(message)),
        }
    }
}
