//! Invoker trait

use crate::invocation::{InvocationRequest, InvocationResult};
use async_trait::async_trait;
use relay_foundation::BackendDescriptor;

/// Invoker trait - implement to add new invocation backends
///
/// 실패도 `InvocationResult` 값으로 돌려준다. `Err`를 쓰지 않는다.
#[async_trait]
pub trait Invoker: Send + Sync {
    /// backend 한 번 실행
    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &InvocationRequest,
    ) -> InvocationResult;

    /// Get invoker name
    fn name(&self) -> &'static str;
}
