//! # relay-foundation
//!
//! Foundation layer for relay:
//! - Error: 중앙 에러 타입
//! - Registry: backend 설명자 및 인자 전략
//! - Storage: JsonStore (설정 파일)
//! - Config: 글로벌 + 프로젝트 병합 설정, 세션 제한
//!
//! ## 아키텍처
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  RelayConfig (global + project JSON)          │
//! │        │                                      │
//! │        ▼                                      │
//! │  builtin backends + overrides                 │
//! │        │                                      │
//! │        ▼                                      │
//! │  Vec<BackendDescriptor>  +  SessionLimits     │
//! └───────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod registry;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{
    BackendOverride, RelayConfig, SessionLimits, SessionSettings, RELAY_CONFIG_FILE,
};

// ============================================================================
// Registry (backend)
// ============================================================================
pub use registry::{
    builtin_backends, ArgStrategy, BackendDescriptor, DEFAULT_TIMEOUT_MS, RESERVED_BACKEND_NAMES,
};

// ============================================================================
// Storage
// ============================================================================
pub use storage::JsonStore;
