//! The REPL host (spec.md §1, §6 "CLI surface") — wires the core crates
//! together behind real (or demo) collaborators. First-run wizards and a
//! menu-driven shell are explicitly out of scope; this is a thin loop:
//! read a line, run a turn, print the reply.

mod confirm;
mod demo;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aiq_agent::{AgentLoop, AgentLoopConfig};
use aiq_core::config::AppConfig;
use aiq_core::{CancelToken, Session};
use aiq_exec::ExecutorDeps;
use aiq_llm::HttpLlmClient;
use aiq_session::FileSessionStore;
use aiq_skills::SkillsStore;
use aiq_tools::Mode;
use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use confirm::StdinConfirmPrompt;

#[derive(Debug, Parser)]
#[command(name = "aiq", about = "Natural-language database and shell assistant", disable_version_flag = true)]
struct Cli {
    /// Print `aiq <version> (commit: <id>)` and exit.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::SetTrue)]
    version: bool,

    /// Resume a previously persisted session instead of starting a new one.
    #[arg(short = 's', long = "session", value_name = "SESSION_PATH")]
    session_path: Option<PathBuf>,
}

fn config_dir() -> PathBuf {
    std::env::var_os("AIQ_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".aiq"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if cli.version {
        let commit = std::env::var("AIQ_COMMIT").unwrap_or_else(|_| "unknown".to_string());
        println!("aiq {} (commit: {commit})", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    let config_dir = config_dir();

    let config = match AppConfig::load_from(config_dir.join("config.yaml")) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(cli, config, &config_dir).await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli, config: AppConfig, config_dir: &std::path::Path) -> Result<()> {
    let llm = Arc::new(
        HttpLlmClient::new(config.llm.url.clone(), config.llm.api_key.clone(), config.llm.model.clone())
    );

    let sandbox_root = PathBuf::from(&config.safety.sandbox_root);
    let registry = aiq_exec::build_registry(ExecutorDeps {
        db: Arc::new(demo::DemoDb::default()),
        chart_renderer: Arc::new(demo::DemoChartRenderer),
        table_renderer: Arc::new(demo::DemoTableRenderer),
        sandbox_root,
        idle_timeout: Duration::from_secs(config.agent.idle_timeout_s),
        idle_confirm: Arc::new(StdinConfirmPrompt),
    });

    let skills = SkillsStore::scan(config_dir.join("skills"));
    let session_store = Arc::new(FileSessionStore::new(config_dir.join("sessions")));

    let agent_config = AgentLoopConfig::from_agent_section(&config.agent);
    let mut agent = AgentLoop::new(agent_config, llm, registry, Mode::Database, skills, session_store);

    let mut session = match &cli.session_path {
        Some(path) => load_session_from_path(path).await?,
        None => Session::new(Some("repl".into()), Some("cli".into())),
    };

    println!("aiq is ready. Type your request, or /exit to quit.");

    let stdin = std::io::stdin();
    let cancel = CancelToken::new();
    loop {
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush().ok();

        let mut line = String::new();
        let bytes = stdin.read_line(&mut line).context("reading from stdin")?;
        if bytes == 0 {
            println!();
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/exit" {
            break;
        }

        let outcome = agent
            .run_turn(&mut session, line.to_string(), &cancel, &StdinConfirmPrompt)
            .await?;

        match outcome.aborted {
            Some(reason) => eprintln!("turn aborted: {reason:?}"),
            None => {
                if let Some(content) = outcome.final_content {
                    if !content.is_empty() {
                        println!("{content}");
                    }
                }
            }
        }
    }

    Ok(())
}

/// `-s <session_path>` resumes a session file written by [`FileSessionStore`].
/// The path names the file directly rather than a session id, so we read and
/// decode it the same way `FileSessionStore::load` does rather than routing
/// through the store (which indexes by id under its own root).
async fn load_session_from_path(path: &std::path::Path) -> Result<Session> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading session file {}", path.display()))?;
    let session: Session = serde_json::from_str(&raw)
        .with_context(|| format!("session file corrupted: {}", path.display()))?;
    Ok(session)
}
