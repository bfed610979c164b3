//! Config - 통합 설정 관리
//!
//! - `limits.rs` - 세션 제한
//! - `relay.rs` - RelayConfig 통합 설정

mod limits;
mod relay;

pub use limits::{
    SessionLimits, SessionSettings, DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_MAX_CHARS, DEFAULT_MAX_TURNS,
};
pub use relay::{BackendOverride, RelayConfig, RELAY_CONFIG_FILE};
