use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::strategy::ArgStrategy;

/// 기본 타임아웃 (10분)
pub const DEFAULT_TIMEOUT_MS: u64 = 600_000;

/// 세션 도구가 쓰는 이름. backend 이름으로 쓸 수 없다.
pub const RESERVED_BACKEND_NAMES: [&str; 4] =
    ["session_start", "session_message", "session_stop", "session_list"];

/// Backend 설명자 - 외부 CLI 하나와 그 실행 메타데이터
///
/// 설정 로드 시 한 번 만들어지고 이후 변경되지 않는다.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendDescriptor {
    /// Backend 이름 (도구 이름으로도 사용)
    pub name: String,

    /// 실행할 프로그램
    pub command: String,

    /// 전략 인자 앞에 붙는 고정 인자
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// 기본 모델 (빈 문자열이면 model 플래그 생략)
    #[serde(default)]
    pub model: String,

    /// 기본 타임아웃 (ms)
    pub timeout_ms: u64,

    /// 전달할 인증 환경변수 이름
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_env: Option<String>,

    /// 인자 구성 전략
    #[serde(default)]
    pub strategy: ArgStrategy,
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            model: String::new(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth_env: None,
            strategy: ArgStrategy::Passthrough,
        }
    }

    // 빌더
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn auth_env(mut self, var: impl Into<String>) -> Self {
        self.auth_env = Some(var.into());
        self
    }

    pub fn strategy(mut self, strategy: ArgStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// 요청 override가 있으면 그것을, 없으면 기본 모델
    pub fn effective_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested.unwrap_or(self.model.as_str())
    }

    /// 요청 override가 있으면 그것을, 없으면 기본 타임아웃
    pub fn effective_timeout(&self, requested_ms: Option<u64>) -> Duration {
        requested_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.default_timeout())
    }

    /// 전체 argv (base args + 전략 인자)
    pub fn build_args(&self, prompt: &str, model: &str, working_dir: Option<&str>) -> Vec<String> {
        let mut argv = self.args.clone();
        argv.extend(self.strategy.build_args(prompt, model, working_dir));
        argv
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if RESERVED_BACKEND_NAMES.contains(&self.name.as_str()) {
            return Err(format!("'{}' is reserved for a session tool", self.name));
        }
        if self.command.trim().is_empty() {
            return Err(format!("{} requires a command", self.name));
        }
        if self.timeout_ms == 0 {
            return Err(format!("{} timeout must be greater than zero", self.name));
        }
        Ok(())
    }
}

/// 내장 backend 목록 (claude, gemini, codex)
pub fn builtin_backends() -> Vec<BackendDescriptor> {
    vec![
        BackendDescriptor::new("claude", "claude")
            .model("sonnet")
            .auth_env("ANTHROPIC_API_KEY")
            .strategy(ArgStrategy::Claude),
        BackendDescriptor::new("gemini", "gemini")
            .model("gemini-2.5-pro")
            .auth_env("GEMINI_API_KEY")
            .strategy(ArgStrategy::Gemini),
        BackendDescriptor::new("codex", "codex")
            .model("gpt-5-codex")
            .auth_env("OPENAI_API_KEY")
            .strategy(ArgStrategy::Codex),
    ]
}
