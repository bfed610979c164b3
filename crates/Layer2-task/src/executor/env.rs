//! Child environment filtering
//!
//! backend 프로세스는 고정 allow-list 환경변수와, 설정된 경우
//! 해당 backend의 인증 변수 하나만 받는다. 다른 backend의 키를 포함해
//! 그 외 변수는 절대 전달하지 않는다.

use std::collections::HashMap;
use tracing::debug;

/// 항상 전달되는 환경변수 패턴
pub const ALLOWED_ENV_PATTERNS: &[&str] = &[
    "PATH", "HOME", "USER", "SHELL", "TERM", "LANG", "LC_*", "NODE_ENV",
];

/// allow-list에 포함되는지 확인
pub fn is_allowed(name: &str) -> bool {
    ALLOWED_ENV_PATTERNS
        .iter()
        .any(|pattern| pattern_matches(pattern, name))
}

/// 주어진 변수 집합에서 child 환경 구성
pub fn build_child_env<I, K, V>(source: I, auth_env: Option<&str>) -> HashMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let auth_env = auth_env.filter(|name| !name.is_empty());
    let mut env = HashMap::new();

    for (key, value) in source {
        let key = key.into();
        if is_allowed(&key) || auth_env == Some(key.as_str()) {
            env.insert(key, value.into());
        }
    }

    if let Some(name) = auth_env {
        debug!(
            auth_env = name,
            forwarded = env.contains_key(name),
            "Auth variable passthrough"
        );
    }

    env
}

/// 현재 프로세스 환경에서 child 환경 구성 (UTF-8 아닌 변수는 제외)
pub fn child_env_from_process(auth_env: Option<&str>) -> HashMap<String, String> {
    let vars = std::env::vars_os().filter_map(|(k, v)| {
        let k = k.into_string().ok()?;
        let v = v.into_string().ok()?;
        Some((k, v))
    });
    build_child_env(vars, auth_env)
}

/// Check if a pattern matches a string (simple glob-like matching)
fn pattern_matches(pattern: &str, s: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        s.starts_with(prefix)
    } else {
        s == pattern
    }
}
