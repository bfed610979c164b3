//! Backend invokers
//!
//! - `ProcessInvoker` - runs the backend CLI as a local child process
//!
//! ## Security
//! - child 환경은 allow-list + backend 인증 변수 하나로 제한 (`env`)
//! - stdout 캡처는 5 MiB 상한 (`output`)

pub mod env;
pub mod local;
pub mod output;
pub mod r#trait;

pub use env::{build_child_env, child_env_from_process, is_allowed, ALLOWED_ENV_PATTERNS};
pub use local::{ProcessInvoker, ProcessInvokerConfig};
pub use output::{capture, CapturedOutput, MAX_STDOUT_BYTES};
pub use r#trait::Invoker;
