//! Session Store - in-memory conversation table with idle eviction
//!
//! - 세션은 `create` 로만 생기고 `compose_prompt` / `record_response` 로만 바뀐다
//! - 모든 변경은 idle timer를 다시 건다
//! - `stop`, idle 만료, `destroy` 이후 id는 존재한 적 없는 것과 같다
//!
//! map lock은 짧게만 잡고 backend 호출 중에는 절대 잡지 않는다.
//! 같은 세션에 겹친 호출은 직렬화하지 않는다 (last write wins).

use crate::session::prompt::render;
use crate::session::types::{ConversationSession, SessionInfo, SessionOptions, Turn};
use parking_lot::Mutex;
use relay_foundation::{Error, Result, SessionLimits};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

struct StoreInner {
    sessions: Mutex<HashMap<String, ConversationSession>>,
    limits: SessionLimits,
}

impl StoreInner {
    /// timer 만료 처리. 그 사이 timer가 다시 걸렸으면 아무것도 하지 않는다.
    fn evict(&self, id: &str, generation: u64) {
        let mut sessions = self.sessions.lock();
        let current = sessions.get(id).map(ConversationSession::generation);
        if current == Some(generation) {
            sessions.remove(id);
            info!(session = %id, "Session evicted after idle timeout");
        }
    }
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        for session in self.sessions.get_mut().values_mut() {
            session.cancel_timer();
        }
    }
}

/// In-memory session table
///
/// tokio runtime 안에서 사용해야 idle timer가 동작한다.
pub struct SessionStore {
    inner: Arc<StoreInner>,
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                sessions: Mutex::new(HashMap::new()),
                limits,
            }),
        }
    }

    pub fn limits(&self) -> &SessionLimits {
        &self.inner.limits
    }

    /// 새 세션 생성, idle timer 등록
    pub fn create(&self, backend: impl Into<String>, options: SessionOptions) -> SessionInfo {
        let mut session = ConversationSession::new(backend, options);
        let info = session.info();

        // timer는 map에 넣는 것과 같은 lock 안에서 건다. 그래야 먼저 깨어난 timer도 세션을 찾는다.
        {
            let mut sessions = self.inner.sessions.lock();
            self.arm(&mut session);
            sessions.insert(info.id.clone(), session);
        }

        info!(
            session = %info.id,
            backend = %info.backend,
            model = %info.model,
            "Session started"
        );
        info
    }

    /// user turn을 추가하고 backend에 보낼 프롬프트를 만든다
    pub fn compose_prompt(&self, id: &str, message: &str) -> Result<String> {
        let mut sessions = self.inner.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| Error::session_not_found(id))?;

        session.push(Turn::user(message));
        self.arm(session);

        let limits = &self.inner.limits;
        let dropped = session.trim(limits.max_turns, limits.max_chars);
        if dropped > 0 {
            debug!(session = %id, dropped, remaining = session.turn_count(), "Trimmed session history");
        }

        let history_len = session.turn_count().saturating_sub(1);
        Ok(render(session.turns().take(history_len), message))
    }

    /// assistant turn 추가 (trim 하지 않음)
    pub fn record_response(&self, id: &str, content: &str) -> Result<()> {
        let mut sessions = self.inner.sessions.lock();
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| Error::session_not_found(id))?;

        session.push(Turn::assistant(content));
        self.arm(session);

        debug!(session = %id, turns = session.turn_count(), "Recorded assistant turn");
        Ok(())
    }

    /// 세션 제거. 존재했으면 true
    pub fn stop(&self, id: &str) -> bool {
        let removed = self.inner.sessions.lock().remove(id);
        match removed {
            Some(mut session) => {
                session.cancel_timer();
                info!(session = %id, "Session stopped");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<SessionInfo> {
        self.inner.sessions.lock().get(id).map(ConversationSession::info)
    }

    /// 생성 순서로 정렬된 메타데이터
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self
            .inner
            .sessions
            .lock()
            .values()
            .map(ConversationSession::info)
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        infos
    }

    pub fn len(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 모든 timer 취소 후 전체 삭제
    pub fn destroy(&self) {
        let drained: Vec<ConversationSession> = {
            let mut sessions = self.inner.sessions.lock();
            sessions.drain().map(|(_, s)| s).collect()
        };

        let count = drained.len();
        for mut session in drained {
            session.cancel_timer();
        }

        if count > 0 {
            info!(count, "Session store destroyed");
        }
    }

    /// idle timer (재)등록
    fn arm(&self, session: &mut ConversationSession) {
        let generation = session.rearm();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(session = %session.id(), "No tokio runtime, idle eviction disabled for session");
                return;
            }
        };

        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let id = session.id().to_string();
        let idle = self.inner.limits.idle_timeout;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(idle).await;
            if let Some(inner) = weak.upgrade() {
                inner.evict(&id, generation);
            }
        });
        session.set_timer(handle.abort_handle());
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .field("limits", &self.inner.limits)
            .finish()
    }
}
