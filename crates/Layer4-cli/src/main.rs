//! relay CLI - Main entry point

mod protocol;
mod server;
mod tools;

use anyhow::Context;
use clap::{Parser, Subcommand};
use relay_foundation::{BackendDescriptor, RelayConfig, SessionSettings};
use relay_task::AgentOrchestrator;
use server::ToolServer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// relay - expose coding-agent CLIs as tools over stdio
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file (replaces the global + project lookup)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Timeout for every backend, in milliseconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: Option<u64>,

    /// Maximum turns kept per session
    #[arg(long)]
    max_turns: Option<usize>,

    /// Maximum history characters kept per session
    #[arg(long)]
    max_chars: Option<usize>,

    /// Idle time before a session is evicted, in milliseconds
    #[arg(long)]
    idle_timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve JSON-RPC tools on stdin/stdout (default)
    Serve,
    /// List configured backends and whether their commands are installed
    Backends,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => RelayConfig::load().context("Failed to load config")?,
        };

        config.sessions.merge(SessionSettings {
            max_turns: self.max_turns,
            max_chars: self.max_chars,
            idle_timeout_ms: self.idle_timeout_ms,
        });
        Ok(config)
    }

    fn resolve_backends(&self, config: &RelayConfig) -> anyhow::Result<Vec<BackendDescriptor>> {
        let mut backends = config.backends()?;
        if let Some(timeout_ms) = self.timeout_ms {
            for backend in &mut backends {
                backend.timeout_ms = timeout_ms;
            }
        }
        Ok(backends)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr - stdout은 protocol 전용)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = args.load_config()?;
    let backends = args.resolve_backends(&config)?;

    match args.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Backends => {
            print_backends(&backends);
            Ok(())
        }
        Command::Serve => {
            let limits = config.session_limits()?;
            info!(
                backends = ?backends.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
                "Starting relay"
            );

            let orchestrator = Arc::new(AgentOrchestrator::new(backends, limits));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            ToolServer::new(orchestrator)
                .serve(stdin, tokio::io::stdout())
                .await
        }
    }
}

fn print_backends(backends: &[BackendDescriptor]) {
    if backends.is_empty() {
        println!("No backends enabled.");
        return;
    }

    println!(
        "{:<12} {:<16} {:<20} {:>10}  {}",
        "NAME", "COMMAND", "MODEL", "TIMEOUT", "INSTALLED"
    );
    for backend in backends {
        let installed = which::which(&backend.command).is_ok();
        let model = if backend.model.is_empty() {
            "-"
        } else {
            backend.model.as_str()
        };
        println!(
            "{:<12} {:<16} {:<20} {:>8}ms  {}",
            backend.name,
            backend.command,
            model,
            backend.timeout_ms,
            if installed { "yes" } else { "no" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parse_overrides() {
        let args = Args::parse_from([
            "relay",
            "--timeout-ms",
            "5000",
            "--max-turns",
            "6",
            "backends",
        ]);
        assert_eq!(args.timeout_ms, Some(5000));
        assert_eq!(args.max_turns, Some(6));
        assert!(matches!(args.command, Some(Command::Backends)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Args::try_parse_from(["relay", "--timeout-ms", "0"]).is_err());
    }

    #[test]
    fn test_cli_overrides_apply_after_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"backends": {"gemini": {"enabled": false}}, "sessions": {"maxTurns": 8, "maxChars": 500}}"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "relay",
            "--config",
            path.to_str().unwrap(),
            "--timeout-ms",
            "1234",
            "--max-turns",
            "3",
        ]);
        let config = args.load_config().unwrap();
        let limits = config.session_limits().unwrap();
        assert_eq!(limits.max_turns, 3);
        assert_eq!(limits.max_chars, 500);

        let backends = args.resolve_backends(&config).unwrap();
        let names: Vec<_> = backends.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["claude", "codex"]);
        assert!(backends.iter().all(|b| b.timeout_ms == 1234));
    }
}
