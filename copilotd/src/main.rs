// ABOUTME: runs the local copilot daemon behind a unix socket.
// ABOUTME: wires config, logging, the shell runner, the ollama backend, and the ledger together.

mod dispatch;
mod exec;
mod llm;
mod server;
mod sessions;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "copilotd", about = "local shell copilot daemon")]
struct Args {
    #[arg(long, env = "COPILOT_SOCKET", default_value = "/tmp/copilotd.sock")]
    socket_path: String,

    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.1:8b")]
    ollama_model: String,

    /// Ledger of completed llm exchanges; disabled when unset.
    #[arg(long, env = "COPILOT_SESSIONS_FILE")]
    sessions_file: Option<String>,

    /// Wall-clock bound for EXECUTE commands; unbounded when unset.
    #[arg(long, env = "COPILOT_EXEC_TIMEOUT_SEC")]
    exec_timeout_sec: Option<u64>,

    #[arg(long, env = "COPILOT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Append logs to this file instead of the console.
    #[arg(long, env = "COPILOT_LOG_FILE")]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let backend = llm::OllamaBackend::new(&args.ollama_url, &args.ollama_model);
    let runner = match args.exec_timeout_sec {
        Some(secs) => exec::ShellRunner::with_timeout(Duration::from_secs(secs)),
        None => exec::ShellRunner::new(),
    };

    let mut dispatcher = dispatch::Dispatcher::new(Box::new(backend), Box::new(runner));
    if let Some(path) = &args.sessions_file {
        let store = sessions::SessionStore::new(path);
        store.ensure_exists().await?;
        dispatcher = dispatcher.with_sessions(store);
    }
    let dispatcher = Arc::new(dispatcher);

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("install SIGTERM handler")?;

    tokio::select! {
        res = server::run(&args.socket_path, dispatcher) => res,
        _ = tokio::signal::ctrl_c() => shutdown(&args.socket_path).await,
        _ = sigterm.recv() => shutdown(&args.socket_path).await,
    }
}

async fn shutdown(socket_path: &str) -> anyhow::Result<()> {
    info!("shutting down");
    let _ = tokio::fs::remove_file(socket_path).await;
    Ok(())
}

fn init_logging(level: &str, log_file: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file at {path}"))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}
