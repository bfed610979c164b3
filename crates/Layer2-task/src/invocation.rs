//! Invocation request/result types

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extract::OutputFormat;

/// backend 하나에 대한 호출 요청
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    /// 프롬프트 (argv로 전달)
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl InvocationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = Some(ms);
        self
    }
}

/// 실패 분류
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InvocationFailure {
    /// 프로세스 시작 자체가 실패 (없는 명령, 권한 등)
    SpawnFailure { command: String, message: String },

    /// 타임아웃으로 취소됨
    Timeout { timeout_ms: u64 },

    /// 0이 아닌 exit code
    NonZeroExit { code: Option<i32> },

    /// exit 0이지만 content를 찾지 못함
    ExtractionFailure,

    /// 대기 중 프로세스 에러
    Process { message: String },
}

impl InvocationFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl std::fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SpawnFailure { command, message } => {
                write!(f, "Failed to spawn '{}': {}", command, message)
            }
            Self::Timeout { timeout_ms } => {
                write!(f, "Process timed out after {}ms", timeout_ms)
            }
            Self::NonZeroExit { code: Some(code) } => {
                write!(f, "Process exited with non-zero exit code {}", code)
            }
            Self::NonZeroExit { code: None } => {
                write!(f, "Process exited with non-zero exit (terminated by signal)")
            }
            Self::ExtractionFailure => write!(f, "Process failed to extract content from output"),
            Self::Process { message } => write!(f, "Process error: {}", message),
        }
    }
}

/// 호출 결과 - 성공/실패 모두 같은 형태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationResult {
    /// 추출된 content (실패 시 fallback 출력)
    pub content: String,

    pub success: bool,

    /// spawn 실패/타임아웃이면 None
    pub exit_code: Option<i32>,

    #[serde(with = "duration_ms")]
    pub elapsed: Duration,

    pub backend: String,

    pub model: String,

    /// 추출 형태 (추출 성공 시)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// stdout이 상한을 넘어 잘렸는지
    #[serde(default)]
    pub truncated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<InvocationFailure>,
}

impl InvocationResult {
    pub fn succeeded(
        backend: impl Into<String>,
        model: impl Into<String>,
        content: impl Into<String>,
        format: OutputFormat,
        elapsed: Duration,
    ) -> Self {
        Self {
            content: content.into(),
            success: true,
            exit_code: Some(0),
            elapsed,
            backend: backend.into(),
            model: model.into(),
            format: Some(format),
            truncated: false,
            failure: None,
        }
    }

    pub fn failed(
        backend: impl Into<String>,
        model: impl Into<String>,
        failure: InvocationFailure,
        elapsed: Duration,
    ) -> Self {
        Self {
            content: String::new(),
            success: false,
            exit_code: None,
            elapsed,
            backend: backend.into(),
            model: model.into(),
            format: None,
            truncated: false,
            failure: Some(failure),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_exit_code(mut self, code: Option<i32>) -> Self {
        self.exit_code = code;
        self
    }

    /// 사람이 읽을 에러 메시지
    pub fn error(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
