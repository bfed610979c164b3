//! Session Limits - 대화 세션 제한 설정
//!
//! 세션별 turn 수, 누적 문자 수, idle 만료 시간.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 기본 최대 turn 수
pub const DEFAULT_MAX_TURNS: usize = 20;
/// 기본 최대 누적 문자 수
pub const DEFAULT_MAX_CHARS: usize = 100_000;
/// 기본 idle 만료 (30분)
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30 * 60 * 1000;

/// 확정된 세션 제한
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// 세션당 최대 turn 수
    pub max_turns: usize,
    /// 세션당 최대 누적 문자 수
    pub max_chars: usize,
    /// 비활성 세션 만료 시간
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_chars: DEFAULT_MAX_CHARS,
            idle_timeout: Duration::from_millis(DEFAULT_IDLE_TIMEOUT_MS),
        }
    }
}

impl SessionLimits {
    pub fn max_turns(mut self, turns: usize) -> Self {
        self.max_turns = turns;
        self
    }

    pub fn max_chars(mut self, chars: usize) -> Self {
        self.max_chars = chars;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

/// 설정 파일의 `sessions` 섹션 (병합용, 모두 optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,
}

impl SessionSettings {
    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: SessionSettings) {
        if other.max_turns.is_some() {
            self.max_turns = other.max_turns;
        }
        if other.max_chars.is_some() {
            self.max_chars = other.max_chars;
        }
        if other.idle_timeout_ms.is_some() {
            self.idle_timeout_ms = other.idle_timeout_ms;
        }
    }

    /// 기본값을 채워 확정
    pub fn resolve(&self) -> std::result::Result<SessionLimits, String> {
        let limits = SessionLimits {
            max_turns: self.max_turns.unwrap_or(DEFAULT_MAX_TURNS),
            max_chars: self.max_chars.unwrap_or(DEFAULT_MAX_CHARS),
            idle_timeout: Duration::from_millis(
                self.idle_timeout_ms.unwrap_or(DEFAULT_IDLE_TIMEOUT_MS),
            ),
        };

        if limits.max_turns == 0 {
            return Err("sessions.maxTurns must be greater than zero".to_string());
        }
        if limits.max_chars == 0 {
            return Err("sessions.maxChars must be greater than zero".to_string());
        }
        if limits.idle_timeout.is_zero() {
            return Err("sessions.idleTimeoutMs must be greater than zero".to_string());
        }
        Ok(limits)
    }
}
