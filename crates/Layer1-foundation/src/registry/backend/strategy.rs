use serde::{Deserialize, Serialize};

/// 인자 구성 전략 (backend 계열별)
///
/// 설정 파일에서는 소문자 태그(`"claude"`, `"gemini"`, `"codex"`)로 표현된다.
/// 알 수 없는 태그나 태그 없음은 모두 `Passthrough`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ArgStrategy {
    /// `-p --model <m> --output-format json <prompt>`
    Claude,
    /// `--model <m> --output-format json --prompt <prompt>`
    Gemini,
    /// `exec --model <m> --full-auto [-C <dir>] <prompt>`
    Codex,
    /// prompt 하나만 전달
    #[default]
    Passthrough,
}

impl ArgStrategy {
    /// 태그 문자열에서 변환
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "claude" => Self::Claude,
            "gemini" => Self::Gemini,
            "codex" => Self::Codex,
            _ => Self::Passthrough,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
            Self::Passthrough => "passthrough",
        }
    }

    /// 해당 계열 CLI에 맞는 argv 구성 (base args 뒤에 붙는 부분)
    ///
    /// 빈 model은 model 플래그를 생략한다.
    pub fn build_args(&self, prompt: &str, model: &str, working_dir: Option<&str>) -> Vec<String> {
        let mut args: Vec<String> = Vec::with_capacity(8);
        match self {
            Self::Claude => {
                args.push("-p".into());
                push_model(&mut args, "--model", model);
                args.push("--output-format".into());
                args.push("json".into());
                args.push(prompt.into());
            }
            Self::Gemini => {
                push_model(&mut args, "--model", model);
                args.push("--output-format".into());
                args.push("json".into());
                args.push("--prompt".into());
                args.push(prompt.into());
            }
            Self::Codex => {
                args.push("exec".into());
                push_model(&mut args, "--model", model);
                args.push("--full-auto".into());
                if let Some(dir) = working_dir.filter(|d| !d.is_empty()) {
                    args.push("-C".into());
                    args.push(dir.into());
                }
                args.push(prompt.into());
            }
            Self::Passthrough => {
                args.push(prompt.into());
            }
        }
        args
    }
}

fn push_model(args: &mut Vec<String>, flag: &str, model: &str) {
    if !model.is_empty() {
        args.push(flag.into());
        args.push(model.into());
    }
}

impl From<String> for ArgStrategy {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ArgStrategy> for String {
    fn from(strategy: ArgStrategy) -> Self {
        strategy.tag().to_string()
    }
}

impl std::fmt::Display for ArgStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}
