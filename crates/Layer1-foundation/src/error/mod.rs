//! Error types for relay
//!
//! 모든 에러를 중앙에서 관리.
//! 프로세스 실행 실패(spawn, timeout, exit code)는 여기 없음 -
//! `relay-task`의 `InvocationResult`에 값으로 담긴다.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// relay 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // Backend / Session 관련
    // ========================================================================
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 사용자에게 보여줄 수 있는 에러인지 확인
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::BackendNotFound(_) | Error::SessionNotFound(_) | Error::InvalidInput(_)
        )
    }

    /// Session 조회 실패 에러 생성 헬퍼
    pub fn session_not_found(id: impl Into<String>) -> Self {
        Error::SessionNotFound(id.into())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
