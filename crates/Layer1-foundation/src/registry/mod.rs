//! Registry - backend 등록/관리
//!
//! - `backend/` - 외부 CLI backend 설명자 및 인자 전략

pub mod backend;

pub use backend::{
    builtin_backends, ArgStrategy, BackendDescriptor, DEFAULT_TIMEOUT_MS, RESERVED_BACKEND_NAMES,
};
