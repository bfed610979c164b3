//! Agent Orchestrator - backend 호출과 세션 조율
//!
//! backend 목록, `Invoker`, `SessionStore`를 묶어서
//! 도구 서버가 호출하는 연산들을 제공한다.
//!
//! ## 사용 예시
//!
//! ```ignore
//! let orchestrator = AgentOrchestrator::new(config.backends()?, config.session_limits()?);
//!
//! // 단발 호출
//! let result = orchestrator.invoke("claude", InvocationRequest::new("explain"), None).await?;
//!
//! // 세션 호출
//! let started = orchestrator.start_session("gemini", None, None)?;
//! let first = orchestrator.send_message(&started.session_id, "What is 2+2?", None).await?;
//! let second = orchestrator.send_message(&started.session_id, "And 3+3?", None).await?;
//!
//! orchestrator.shutdown();
//! ```

use crate::executor::{Invoker, ProcessInvoker};
use crate::invocation::{InvocationRequest, InvocationResult};
use crate::session::{SessionInfo, SessionOptions, SessionStore};
use relay_foundation::{BackendDescriptor, Error, Result, SessionLimits};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `start_session` 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: String,
    pub backend: String,
    pub model: String,
}

/// Agent Orchestrator
pub struct AgentOrchestrator {
    backends: Vec<BackendDescriptor>,
    invoker: Arc<dyn Invoker>,
    sessions: SessionStore,
}

impl AgentOrchestrator {
    /// 로컬 프로세스 invoker로 생성
    pub fn new(backends: Vec<BackendDescriptor>, limits: SessionLimits) -> Self {
        Self::with_invoker(backends, limits, Arc::new(ProcessInvoker::new()))
    }

    pub fn with_invoker(
        backends: Vec<BackendDescriptor>,
        limits: SessionLimits,
        invoker: Arc<dyn Invoker>,
    ) -> Self {
        info!(
            backends = backends.len(),
            invoker = invoker.name(),
            max_turns = limits.max_turns,
            "Orchestrator initialized"
        );
        Self {
            backends,
            invoker,
            sessions: SessionStore::new(limits),
        }
    }

    pub fn backends(&self) -> &[BackendDescriptor] {
        &self.backends
    }

    pub fn backend(&self, name: &str) -> Result<&BackendDescriptor> {
        self.backends
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| Error::BackendNotFound(name.to_string()))
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// backend 호출. session id가 있으면 히스토리를 붙이고 응답을 기록한다.
    ///
    /// 실패한 호출도 `Ok(InvocationResult)` 이다. `Err`는 backend/세션을 찾지 못한 경우뿐.
    pub async fn invoke(
        &self,
        backend: &str,
        mut request: InvocationRequest,
        session_id: Option<&str>,
    ) -> Result<InvocationResult> {
        let descriptor = self.backend(backend)?;

        let session_id = match session_id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => return Ok(self.invoker.invoke(descriptor, &request).await),
        };

        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;
        if session.backend != descriptor.name {
            return Err(Error::InvalidInput(format!(
                "Session {} belongs to backend '{}', not '{}'",
                session_id, session.backend, descriptor.name
            )));
        }

        request.prompt = self.sessions.compose_prompt(session_id, &request.prompt)?;
        if request.model.is_none() {
            request.model = Some(session.model);
        }
        if request.working_dir.is_none() {
            request.working_dir = session.working_dir;
        }

        debug!(
            session = %session_id,
            backend = %descriptor.name,
            prompt_chars = request.prompt.chars().count(),
            "Invoking backend within session"
        );

        let result = self.invoker.invoke(descriptor, &request).await;

        if result.success {
            // 호출 중 stop/만료된 세션이면 결과만 돌려준다
            if let Err(e) = self.sessions.record_response(session_id, &result.content) {
                warn!(session = %session_id, "Response not recorded: {}", e);
            }
        }

        Ok(result)
    }

    /// 세션 시작. model 미지정 시 backend 기본 모델
    pub fn start_session(
        &self,
        backend: &str,
        model: Option<&str>,
        working_dir: Option<&str>,
    ) -> Result<SessionStarted> {
        let descriptor = self.backend(backend)?;
        let model = descriptor.effective_model(model.filter(|m| !m.is_empty()));

        let mut options = SessionOptions::new(model);
        if let Some(dir) = working_dir {
            options = options.with_working_dir(dir);
        }

        let info = self.sessions.create(&descriptor.name, options);
        Ok(SessionStarted {
            session_id: info.id,
            backend: info.backend,
            model: info.model,
        })
    }

    /// 세션의 backend로 메시지 전송
    pub async fn send_message(
        &self,
        session_id: &str,
        message: &str,
        timeout_ms: Option<u64>,
    ) -> Result<InvocationResult> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Error::session_not_found(session_id))?;

        let mut request = InvocationRequest::new(message);
        request.timeout_ms = timeout_ms;

        self.invoke(&session.backend, request, Some(session_id)).await
    }

    pub fn stop_session(&self, session_id: &str) -> bool {
        self.sessions.stop(session_id)
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.list()
    }

    /// 모든 세션 정리
    pub fn shutdown(&self) {
        info!(sessions = self.sessions.len(), "Orchestrator shutting down");
        self.sessions.destroy();
    }
}

impl std::fmt::Debug for AgentOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentOrchestrator")
            .field("backends", &self.backends.iter().map(|b| &b.name).collect::<Vec<_>>())
            .field("invoker", &self.invoker.name())
            .field("sessions", &self.sessions)
            .finish()
    }
}
