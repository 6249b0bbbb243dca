//! Claude Lens - reconstructs Claude Code session logs into navigable conversations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use claude_lens::cache::SessionCache;
use claude_lens::config::ConfigLoader;
use claude_lens::journal;
use claude_lens::reconstruct::{build_steps, try_reconstruct_session, AccountingStrategy};
use claude_lens::triggers::TriggerScanner;
use claude_lens::watcher::LogWatcher;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// Message-level context attribution.
    Message,
    /// Proportional per-step estimation.
    Step,
}

impl From<StrategyArg> for AccountingStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Message => AccountingStrategy::MessageLevel,
            StrategyArg::Step => AccountingStrategy::Proportional,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "claude-lens",
    about = "Reconstructs Claude Code session logs into navigable conversations",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file path (defaults to the standard search locations).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List projects and their sessions.
    Sessions {
        /// Only this project id.
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Reconstruct one session and print its turns.
    Show {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        session: String,
        /// Token accounting strategy for the step breakdown.
        #[arg(long, value_enum, default_value_t = StrategyArg::Step)]
        strategy: StrategyArg,
    },
    /// Run the trigger rules over one session log.
    Errors {
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        session: String,
    },
    /// Watch the session tree and print live updates.
    Watch,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = match cli.config.clone() {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let Some(projects_root) = config.projects_root() else {
        eprintln!("error: no projects root configured and no home directory found");
        std::process::exit(1);
    };

    match cli.command {
        Commands::Sessions { project } => {
            list_sessions(&projects_root, project.as_deref()).await;
        }
        Commands::Show {
            project,
            session,
            strategy,
        } => {
            let cache = SessionCache::new(config.cache.max_sessions, config.cache.ttl());
            show_session(&projects_root, &cache, &project, &session, strategy.into()).await;
        }
        Commands::Errors { project, session } => {
            scan_errors(&projects_root, &config.triggers, &project, &session).await;
        }
        Commands::Watch => {
            watch(&projects_root, &config).await;
        }
    }
}

async fn list_sessions(projects_root: &std::path::Path, only_project: Option<&str>) {
    for (project_id, project_dir) in journal::list_project_dirs(projects_root) {
        if only_project.is_some_and(|wanted| wanted != project_id) {
            continue;
        }
        println!("{project_id}");
        for (session_id, path) in journal::list_session_files(&project_dir) {
            let summary = claude_lens::reconstruct::summarize_session(&path, &session_id).await;
            println!(
                "  {session_id}  {} messages, {} turns, {} tokens  {}",
                summary.message_count,
                summary.turn_count,
                summary.usage.total(),
                summary.preview
            );
        }
    }
}

async fn show_session(
    projects_root: &std::path::Path,
    cache: &SessionCache,
    project_id: &str,
    session_id: &str,
    strategy: AccountingStrategy,
) {
    let detail = match cache.get(project_id, session_id) {
        Some(detail) => detail,
        None => match try_reconstruct_session(projects_root, project_id, session_id).await {
            Some(detail) => {
                cache.set(project_id, session_id, detail.clone());
                detail
            }
            None => {
                eprintln!("error: session {project_id}/{session_id} not found");
                std::process::exit(1);
            }
        },
    };

    println!(
        "session {}  {} messages, {} turns, {} tokens, {:.1}s",
        detail.session_id,
        detail.message_count,
        detail.turns.len(),
        detail.total_usage.total(),
        detail.duration_ms as f64 / 1000.0
    );

    for (i, turn) in detail.turns.iter().enumerate() {
        let preview: String = turn.trigger.text().chars().take(60).collect();
        println!(
            "\n[{i}] {}  {} tokens  {preview}",
            turn.start.format("%H:%M:%S"),
            turn.usage.total()
        );
        let steps = build_steps(turn, strategy);
        for step in &steps {
            println!(
                "    {}  +{} tokens (context ~{})",
                step_label(&step.kind),
                step.tokens,
                step.accumulated_context
            );
        }
        for agent in &turn.subagents {
            println!(
                "    subagent {}  {:.1}s{}  {}",
                agent.agent_id,
                agent.duration_ms as f64 / 1000.0,
                if agent.is_parallel { " (parallel)" } else { "" },
                agent.description.as_deref().unwrap_or("-")
            );
        }
    }
}

fn step_label(kind: &claude_lens::reconstruct::StepKind) -> String {
    use claude_lens::reconstruct::StepKind;
    match kind {
        StepKind::Thinking { .. } => "thinking".to_string(),
        StepKind::TextOutput { .. } => "text".to_string(),
        StepKind::ToolCall { name, .. } => format!("tool:{name}"),
        StepKind::SubagentRef { agent_id } => format!("subagent:{agent_id}"),
    }
}

async fn scan_errors(
    projects_root: &std::path::Path,
    rules: &[claude_lens::triggers::TriggerRuleConfig],
    project_id: &str,
    session_id: &str,
) {
    let scanner = match TriggerScanner::compile(rules) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    let path = journal::session_file(projects_root, project_id, session_id);
    let mut tool_names = std::collections::HashMap::new();
    match scanner
        .scan_file(&path, project_id, session_id, 0, &mut tool_names)
        .await
    {
        Ok((errors, _)) => {
            for error in &errors {
                let excerpt: String = error.excerpt.chars().take(120).collect();
                println!(
                    "line {}  [{}]  {}  {excerpt}",
                    error.line,
                    error.category.as_deref().unwrap_or("?"),
                    error.source.as_deref().unwrap_or("?")
                );
            }
            println!("{} errors detected", errors.len());
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

async fn watch(projects_root: &std::path::Path, config: &claude_lens::config::LensConfig) {
    let scanner = match TriggerScanner::compile(&config.triggers) {
        Ok(scanner) => scanner,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    let cache = Arc::new(SessionCache::new(config.cache.max_sessions, config.cache.ttl()));

    let (watcher, mut updates) = match LogWatcher::spawn(
        projects_root.to_path_buf(),
        cache,
        scanner,
        config.watcher.debounce_window(),
    ) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(root = %projects_root.display(), "Watching session tree");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.recv() => {
                let Some(update) = update else { break };
                println!(
                    "{:?} {}  project={} session={}{}",
                    update.event.kind,
                    update.event.path.display(),
                    update.event.project_id.as_deref().unwrap_or("?"),
                    update.event.session_id.as_deref().unwrap_or("-"),
                    if update.event.is_subagent { " (subagent)" } else { "" }
                );
                for error in &update.errors {
                    let excerpt: String = error.excerpt.chars().take(120).collect();
                    println!(
                        "  error line {}  [{}]  {excerpt}",
                        error.line,
                        error.category.as_deref().unwrap_or("?")
                    );
                }
            }
        }
    }

    watcher.shutdown();

    // Wait a moment so the watcher's debounce timers stop cleanly.
    tokio::time::sleep(Duration::from_millis(50)).await;
}
