//! Local process invoker - runs one backend CLI per call on the host
//!
//! Features:
//! - Restricted child environment (allow-list + one auth variable)
//! - stdin closed, prompt passed in argv
//! - Single-shot timeout with kill
//! - Bounded stdout capture (5 MiB), unbounded stderr
//! - Output extraction into one content string

use crate::executor::env::{build_child_env, child_env_from_process};
use crate::executor::output::{capture, CapturedOutput, MAX_STDOUT_BYTES};
use crate::executor::Invoker;
use crate::extract::extract_content;
use crate::invocation::{InvocationFailure, InvocationRequest, InvocationResult};
use async_trait::async_trait;
use relay_foundation::BackendDescriptor;
use std::collections::HashMap;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Process invoker configuration
#[derive(Debug, Clone)]
pub struct ProcessInvokerConfig {
    /// stdout 캡처 상한 (bytes)
    pub max_stdout_bytes: usize,

    /// child 환경을 고를 원본 환경 (None이면 현재 프로세스 환경)
    pub env_source: Option<HashMap<String, String>>,
}

impl Default for ProcessInvokerConfig {
    fn default() -> Self {
        Self {
            max_stdout_bytes: MAX_STDOUT_BYTES,
            env_source: None,
        }
    }
}

impl ProcessInvokerConfig {
    pub fn with_max_stdout_bytes(mut self, bytes: usize) -> Self {
        self.max_stdout_bytes = bytes;
        self
    }

    pub fn with_env_source(mut self, env: HashMap<String, String>) -> Self {
        self.env_source = Some(env);
        self
    }
}

/// Process invoker that runs backend CLIs directly on the host
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    config: ProcessInvokerConfig,
}

/// 정상 종료된 프로세스의 출력
struct Completed {
    status: ExitStatus,
    stdout: CapturedOutput,
    stderr: CapturedOutput,
}

impl ProcessInvoker {
    /// Create a new process invoker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with configuration
    pub fn with_config(config: ProcessInvokerConfig) -> Self {
        Self { config }
    }

    fn child_env(&self, auth_env: Option<&str>) -> HashMap<String, String> {
        match &self.config.env_source {
            Some(source) => build_child_env(source.clone(), auth_env),
            None => child_env_from_process(auth_env),
        }
    }

    fn build_command(
        &self,
        backend: &BackendDescriptor,
        request: &InvocationRequest,
        model: &str,
    ) -> Command {
        let working_dir = request.working_dir.as_deref().filter(|d| !d.is_empty());
        let argv = backend.build_args(&request.prompt, model, working_dir);

        let mut cmd = Command::new(&backend.command);
        cmd.args(&argv)
            .env_clear()
            .envs(self.child_env(backend.auth_env.as_deref()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        debug!(
            backend = %backend.name,
            command = %backend.command,
            strategy = %backend.strategy,
            argc = argv.len(),
            "Building backend command"
        );

        cmd
    }

    /// 정상 종료 결과를 content/성공 여부로 변환
    fn finish(
        backend: &BackendDescriptor,
        model: &str,
        completed: Completed,
        started_at: Instant,
    ) -> InvocationResult {
        let exit_code = completed.status.code();
        let stdout = completed.stdout.text();
        let truncated = completed.stdout.truncated;
        let extracted = extract_content(&stdout, exit_code);

        let mut result = match (extracted, exit_code) {
            (Some(extracted), Some(0)) => InvocationResult::succeeded(
                &backend.name,
                model,
                extracted.content,
                extracted.format,
                started_at.elapsed(),
            ),
            (extracted, code) => {
                let failure = if code == Some(0) {
                    InvocationFailure::ExtractionFailure
                } else {
                    InvocationFailure::NonZeroExit { code }
                };
                warn!(backend = %backend.name, ?code, "Backend invocation failed: {}", failure);

                let format = extracted.as_ref().map(|e| e.format);
                let content = match extracted {
                    Some(extracted) => extracted.content,
                    None if !stdout.trim().is_empty() => stdout,
                    None => completed.stderr.text(),
                };

                let mut result = InvocationResult::failed(&backend.name, model, failure, started_at.elapsed())
                    .with_content(content)
                    .with_exit_code(code);
                result.format = format;
                result
            }
        };

        result.truncated = truncated;
        result
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &InvocationRequest,
    ) -> InvocationResult {
        let started_at = Instant::now();
        let model = backend.effective_model(request.model.as_deref()).to_string();
        let timeout = backend.effective_timeout(request.timeout_ms);

        let mut cmd = self.build_command(backend, request, &model);

        // Spawn process
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(backend = %backend.name, command = %backend.command, "Failed to spawn backend: {}", e);
                return InvocationResult::failed(
                    &backend.name,
                    &model,
                    InvocationFailure::SpawnFailure {
                        command: backend.command.clone(),
                        message: e.to_string(),
                    },
                    started_at.elapsed(),
                );
            }
        };

        // Spawn pipe readers
        let max_stdout = self.config.max_stdout_bytes;
        let stdout_handle: Option<JoinHandle<CapturedOutput>> = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(capture(stdout, Some(max_stdout))));
        let stderr_handle: Option<JoinHandle<CapturedOutput>> = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(capture(stderr, None)));

        let reader_aborts: Vec<_> = stdout_handle
            .iter()
            .chain(stderr_handle.iter())
            .map(JoinHandle::abort_handle)
            .collect();

        // Wait for exit and both pipes under one deadline
        let waited = tokio::time::timeout(timeout, async {
            let status = child.wait().await?;
            let stdout = match stdout_handle {
                Some(h) => h.await.unwrap_or_default(),
                None => CapturedOutput::default(),
            };
            let stderr = match stderr_handle {
                Some(h) => h.await.unwrap_or_default(),
                None => CapturedOutput::default(),
            };
            Ok::<_, std::io::Error>(Completed {
                status,
                stdout,
                stderr,
            })
        })
        .await;

        let result = match waited {
            Ok(Ok(completed)) => Self::finish(backend, &model, completed, started_at),
            Ok(Err(e)) => {
                warn!(backend = %backend.name, "Backend process error: {}", e);
                let _ = child.kill().await;
                reader_aborts.iter().for_each(|h| h.abort());
                InvocationResult::failed(
                    &backend.name,
                    &model,
                    InvocationFailure::Process {
                        message: e.to_string(),
                    },
                    started_at.elapsed(),
                )
            }
            Err(_) => {
                let timeout_ms = timeout.as_millis() as u64;
                warn!(backend = %backend.name, timeout_ms, "Backend timed out, killing process");
                let _ = child.kill().await;
                reader_aborts.iter().for_each(|h| h.abort());
                InvocationResult::failed(
                    &backend.name,
                    &model,
                    InvocationFailure::Timeout { timeout_ms },
                    started_at.elapsed(),
                )
            }
        };

        info!(
            backend = %backend.name,
            model = %result.model,
            success = result.success,
            exit_code = ?result.exit_code,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Backend invocation finished"
        );

        result
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::extract::OutputFormat;

    fn script(body: &str) -> BackendDescriptor {
        BackendDescriptor::new("script", "sh")
            .args(["-c", body])
            .timeout_ms(10_000)
    }

    fn test_env() -> HashMap<String, String> {
        HashMap::from([
            ("PATH".to_string(), "/usr/bin:/bin".to_string()),
            ("HOME".to_string(), "/tmp".to_string()),
            ("ANTHROPIC_API_KEY".to_string(), "sk-ant-test".to_string()),
            ("OPENAI_API_KEY".to_string(), "sk-openai-test".to_string()),
            ("SECRET_TOKEN".to_string(), "hidden".to_string()),
        ])
    }

    fn invoker() -> ProcessInvoker {
        ProcessInvoker::with_config(ProcessInvokerConfig::default().with_env_source(test_env()))
    }

    #[tokio::test]
    async fn test_invoker_name() {
        assert_eq!(ProcessInvoker::new().name(), "process");
    }

    #[tokio::test]
    async fn test_success_with_json_result() {
        let backend = script(r#"echo '{"result": "Finished the requested change."}'"#);
        let result = invoker()
            .invoke(&backend, &InvocationRequest::new("do it"))
            .await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.content, "Finished the requested change.");
        assert_eq!(result.format, Some(OutputFormat::Claude));
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.backend, "script");
        assert!(result.failure.is_none());
    }

    #[tokio::test]
    async fn test_prompt_passed_in_argv_and_stdin_closed() {
        // $0 is the first argument after the -c body
        let backend = script(r#"read line; echo "prompt=$0 stdin=${line:-closed}""#);
        let result = invoker()
            .invoke(&backend, &InvocationRequest::new("hello-argv"))
            .await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.content, "prompt=hello-argv stdin=closed");
    }

    #[tokio::test]
    async fn test_spawn_failure_names_command() {
        let backend = BackendDescriptor::new("ghost", "definitely-not-a-real-cli-xyz");
        let result = invoker().invoke(&backend, &InvocationRequest::new("hi")).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert!(matches!(
            result.failure,
            Some(InvocationFailure::SpawnFailure { .. })
        ));
        assert!(result
            .error()
            .unwrap()
            .contains("definitely-not-a-real-cli-xyz"));
    }

    #[tokio::test]
    async fn test_timeout_discards_partial_stdout() {
        let backend = script("echo 'partial output before hanging'; sleep 5");
        let request = InvocationRequest::new("slow").with_timeout_ms(300);
        let result = invoker().invoke(&backend, &request).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, None);
        assert_eq!(
            result.failure,
            Some(InvocationFailure::Timeout { timeout_ms: 300 })
        );
        let error = result.error().unwrap();
        assert!(error.contains("300"));
        assert!(!error.contains("partial output"));
        assert!(result.content.is_empty());
        assert!(result.elapsed < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_non_zero_exit_keeps_extracted_content() {
        let backend = script(r#"echo '{"response": "Partial answer before crash"}'; exit 3"#);
        let result = invoker().invoke(&backend, &InvocationRequest::new("x")).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.content, "Partial answer before crash");
        assert!(result.error().unwrap().contains("non-zero exit"));
    }

    #[tokio::test]
    async fn test_non_zero_exit_falls_back_to_stderr() {
        let backend = script("echo 'fatal: not logged in' >&2; exit 1");
        let result = invoker().invoke(&backend, &InvocationRequest::new("x")).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
        assert_eq!(result.content.trim(), "fatal: not logged in");
    }

    #[tokio::test]
    async fn test_short_output_is_extraction_failure() {
        let backend = script("echo ok");
        let result = invoker().invoke(&backend, &InvocationRequest::new("x")).await;

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(0));
        assert_eq!(result.failure, Some(InvocationFailure::ExtractionFailure));
        assert_eq!(result.content.trim(), "ok");
        assert!(result.error().unwrap().contains("failed to extract content"));
    }

    #[tokio::test]
    async fn test_environment_restricted_to_allow_list_and_auth() {
        let backend = script(
            r#"echo "home=${HOME:-unset} anthropic=${ANTHROPIC_API_KEY:-unset} openai=${OPENAI_API_KEY:-unset} token=${SECRET_TOKEN:-unset}""#,
        )
        .auth_env("ANTHROPIC_API_KEY");
        let result = invoker().invoke(&backend, &InvocationRequest::new("env")).await;

        assert!(result.success, "{:?}", result);
        assert_eq!(
            result.content,
            "home=/tmp anthropic=sk-ant-test openai=unset token=unset"
        );
    }

    #[tokio::test]
    async fn test_stdout_truncated_but_not_killed() {
        let backend = script("head -c 4000 /dev/zero | tr '\\0' 'a'; echo");
        let invoker = ProcessInvoker::with_config(
            ProcessInvokerConfig::default()
                .with_env_source(test_env())
                .with_max_stdout_bytes(1000),
        );
        let result = invoker.invoke(&backend, &InvocationRequest::new("x")).await;

        assert!(result.success, "{:?}", result);
        assert!(result.truncated);
        assert_eq!(result.content.len(), 1000);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_request_overrides_model_and_working_dir() {
        let dir = std::env::temp_dir();
        let backend = script(r#"echo "cwd=$(pwd) prompt=$0""#).model("default-model");
        let request = InvocationRequest::new("p")
            .with_model("override-model")
            .with_working_dir(dir.to_string_lossy());
        let result = invoker().invoke(&backend, &request).await;

        assert!(result.success, "{:?}", result);
        assert_eq!(result.model, "override-model");
        let canonical = std::fs::canonicalize(&dir).unwrap();
        assert!(
            result.content.contains(&*canonical.to_string_lossy())
                || result.content.contains(&*dir.to_string_lossy()),
            "{}",
            result.content
        );
    }
}
