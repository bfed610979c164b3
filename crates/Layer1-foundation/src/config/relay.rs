//! Relay Config - 통합 설정
//!
//! 글로벌(`<config_dir>/relay/config.json`) + 프로젝트(`.relay/config.json`) 병합.
//! 내장 backend 위에 override를 덮어 `BackendDescriptor` 목록을 만든다.

use crate::registry::{builtin_backends, ArgStrategy, BackendDescriptor};
use crate::storage::{load_path, JsonStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use super::limits::{SessionLimits, SessionSettings};

/// 설정 파일명
pub const RELAY_CONFIG_FILE: &str = "config.json";

// ============================================================================
// Backend Override
// ============================================================================

/// backend별 운영자 override (모두 optional)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_env: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<ArgStrategy>,

    /// false면 해당 backend 비활성화
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl BackendOverride {
    /// 다른 override와 병합 (other가 우선)
    pub fn merge(&mut self, other: BackendOverride) {
        if other.command.is_some() {
            self.command = other.command;
        }
        if other.args.is_some() {
            self.args = other.args;
        }
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.timeout_ms.is_some() {
            self.timeout_ms = other.timeout_ms;
        }
        if other.auth_env.is_some() {
            self.auth_env = other.auth_env;
        }
        if other.strategy.is_some() {
            self.strategy = other.strategy;
        }
        if other.enabled.is_some() {
            self.enabled = other.enabled;
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    fn apply(&self, descriptor: &mut BackendDescriptor) {
        if let Some(command) = &self.command {
            descriptor.command = command.clone();
        }
        if let Some(args) = &self.args {
            descriptor.args = args.clone();
        }
        if let Some(model) = &self.model {
            descriptor.model = model.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            descriptor.timeout_ms = timeout_ms;
        }
        if let Some(auth_env) = &self.auth_env {
            descriptor.auth_env = Some(auth_env.clone()).filter(|v| !v.is_empty());
        }
        if let Some(strategy) = self.strategy {
            descriptor.strategy = strategy;
        }
    }
}

// ============================================================================
// Relay Config
// ============================================================================

/// relay 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfig {
    /// backend 이름 -> override
    #[serde(default)]
    pub backends: BTreeMap<String, BackendOverride>,

    /// 인증 환경변수 전달 여부 (기본 true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_auth: Option<bool>,

    /// 세션 제한
    #[serde(default)]
    pub sessions: SessionSettings,
}

impl RelayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<RelayConfig>(RELAY_CONFIG_FILE)? {
                debug!(path = %global.file_path(RELAY_CONFIG_FILE).display(), "Loaded global config");
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) =
                project.load_optional::<RelayConfig>(RELAY_CONFIG_FILE)?
            {
                debug!(path = %project.file_path(RELAY_CONFIG_FILE).display(), "Loaded project config");
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 지정 경로 하나만 로드 (`--config`)
    pub fn load_from(path: &Path) -> Result<Self> {
        load_path(path)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: RelayConfig) {
        for (name, backend) in other.backends {
            self.backends.entry(name).or_default().merge(backend);
        }
        if other.forward_auth.is_some() {
            self.forward_auth = other.forward_auth;
        }
        self.sessions.merge(other.sessions);
    }

    // ========================================================================
    // Resolve
    // ========================================================================

    /// 활성화된 backend 설명자 목록 (내장 -> 추가 순, 추가분은 이름순)
    pub fn backends(&self) -> Result<Vec<BackendDescriptor>> {
        let mut resolved = Vec::new();
        let builtins = builtin_backends();

        for mut descriptor in builtins.iter().cloned() {
            if let Some(overlay) = self.backends.get(&descriptor.name) {
                if !overlay.is_enabled() {
                    continue;
                }
                overlay.apply(&mut descriptor);
            }
            resolved.push(descriptor);
        }

        for (name, overlay) in &self.backends {
            if builtins.iter().any(|b| &b.name == name) || !overlay.is_enabled() {
                continue;
            }
            let command = overlay.command.clone().ok_or_else(|| {
                Error::Config(format!("backend '{}' must specify a command", name))
            })?;
            let mut descriptor = BackendDescriptor::new(name.clone(), command);
            overlay.apply(&mut descriptor);
            resolved.push(descriptor);
        }

        if !self.forward_auth.unwrap_or(true) {
            for descriptor in &mut resolved {
                descriptor.auth_env = None;
            }
        }

        for descriptor in &resolved {
            descriptor.validate().map_err(Error::Config)?;
        }

        Ok(resolved)
    }

    /// 세션 제한 확정
    pub fn session_limits(&self) -> Result<SessionLimits> {
        self.sessions.resolve().map_err(Error::Config)
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn backend(mut self, name: impl Into<String>, overlay: BackendOverride) -> Self {
        self.backends.insert(name.into(), overlay);
        self
    }

    pub fn forward_auth(mut self, forward: bool) -> Self {
        self.forward_auth = Some(forward);
        self
    }
}
