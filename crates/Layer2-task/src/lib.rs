//! # relay-task
//!
//! Backend invocation and conversation sessions for relay.
//! Runs stateless coding-agent CLIs as one-shot child processes and layers
//! multi-turn history on top of them.
//!
//! ## Features
//!
//! - Output extraction for Gemini / Claude / generic JSON and plain text
//! - Local process invoker with restricted env, timeout and bounded capture
//! - In-memory session store with trimming and idle eviction
//! - Orchestrator tying backends, invoker and sessions together

pub mod executor;
pub mod extract;
pub mod invocation;
pub mod orchestrator;
pub mod session;

// Invocation
pub use executor::{Invoker, ProcessInvoker, ProcessInvokerConfig, MAX_STDOUT_BYTES};
pub use extract::{extract_content, Extracted, OutputFormat, MIN_CONTENT_LEN};
pub use invocation::{InvocationFailure, InvocationRequest, InvocationResult};

// Sessions
pub use orchestrator::{AgentOrchestrator, SessionStarted};
pub use session::{Role, SessionInfo, SessionOptions, SessionStore, Turn};
