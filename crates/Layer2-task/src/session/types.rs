//! Conversation session type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Turn 작성자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message within a session's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// 문자 수 (byte 아님)
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Options for starting a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// 이미 해석된 모델명 (backend 기본값 적용 후)
    pub model: String,
    pub working_dir: Option<String>,
}

impl SessionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Public session metadata - never carries turn content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub backend: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub turn_count: usize,
}

/// Conversation state owned by the session store
#[derive(Debug)]
pub struct ConversationSession {
    id: String,
    backend: String,
    model: String,
    working_dir: Option<String>,
    turns: VecDeque<Turn>,
    created_at: DateTime<Utc>,
    last_active_at: DateTime<Utc>,

    /// 현재 armed 된 idle timer
    idle: Option<AbortHandle>,

    /// timer를 다시 걸 때마다 증가. 이전 timer가 늦게 깨어나도 무시된다.
    generation: u64,
}

impl ConversationSession {
    pub(crate) fn new(backend: impl Into<String>, options: SessionOptions) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            backend: backend.into(),
            model: options.model,
            working_dir: options.working_dir.filter(|d| !d.is_empty()),
            turns: VecDeque::new(),
            created_at: now,
            last_active_at: now,
            idle: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn total_chars(&self) -> usize {
        self.turns.iter().map(Turn::char_len).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            backend: self.backend.clone(),
            model: self.model.clone(),
            working_dir: self.working_dir.clone(),
            created_at: self.created_at,
            last_active_at: self.last_active_at,
            turn_count: self.turns.len(),
        }
    }

    pub(crate) fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        self.touch();
    }

    /// lastActiveAt은 뒤로 가지 않는다
    pub(crate) fn touch(&mut self) {
        self.last_active_at = self.last_active_at.max(Utc::now());
    }

    /// 가장 오래된 turn 부터 제거. max_turns 먼저, 그 다음 max_chars.
    /// 마지막 하나는 아무리 커도 남긴다.
    pub(crate) fn trim(&mut self, max_turns: usize, max_chars: usize) -> usize {
        let before = self.turns.len();

        while self.turns.len() > max_turns {
            self.turns.pop_front();
        }

        let mut total = self.total_chars();
        while total > max_chars && self.turns.len() > 1 {
            if let Some(dropped) = self.turns.pop_front() {
                total -= dropped.char_len();
            }
        }

        before - self.turns.len()
    }

    /// 새 timer 등록. 이전 timer는 취소하고 다음 generation을 돌려준다.
    pub(crate) fn rearm(&mut self) -> u64 {
        self.cancel_timer();
        self.generation += 1;
        self.generation
    }

    pub(crate) fn set_timer(&mut self, handle: AbortHandle) {
        self.idle = Some(handle);
    }

    #[cfg(test)]
    pub(crate) fn idle_handle(&self) -> Option<AbortHandle> {
        self.idle.clone()
    }

    pub(crate) fn cancel_timer(&mut self) {
        if let Some(handle) = self.idle.take() {
            handle.abort();
        }
    }
}
