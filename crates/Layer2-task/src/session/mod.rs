//! Conversation sessions for stateless backend CLIs
//!
//! backend는 세션 개념이 없으므로 이전 turn들을 히스토리 블록으로 만들어
//! 매 호출의 프롬프트 앞에 붙인다.
//!
//! ## Features
//!
//! - **Session Store**: 명시적으로 생성/해제되는 in-memory 세션 테이블
//! - **Trimming**: max turns, max chars 기준으로 오래된 turn 제거
//! - **Idle Eviction**: 세션별 취소 가능한 단발 timer

pub mod prompt;
pub mod store;
pub mod types;

pub use prompt::{render, HISTORY_CLOSE, HISTORY_INSTRUCTION, HISTORY_OPEN};
pub use store::SessionStore;
pub use types::{ConversationSession, Role, SessionInfo, SessionOptions, Turn};
