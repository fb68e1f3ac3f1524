mod commands;
mod config;
mod repl;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use extract::{Extractor, GeminiClient};
use investigate::{History, HistoryStore, JsonFileStore, Session};
use report::{ActiveFilter, AdvancedQuery, ExportDocument};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::repl::Repl;

#[derive(Parser)]
#[command(name = "deepsearch", version, about = "OSINT investigations driven by a grounded language model")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, global = true, help = "Configuration file (TOML)")]
    config: Option<PathBuf>,

    #[arg(long, global = true, help = "Report language: uk or en")]
    locale: Option<extract::Locale>,

    #[arg(short, long, global = true, help = "Enable debug logging")]
    verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Interactive investigation shell (default)")]
    Repl,

    #[command(about = "Investigate one target and print the report")]
    Investigate {
        #[arg(help = "Username, email, domain or phone number")]
        target: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    #[command(about = "Build a query from word groups and investigate it")]
    Advanced {
        #[arg(long, default_value = "", help = "Every word must appear (AND)")]
        all: String,

        #[arg(long, default_value = "", help = "Any of the words may appear (OR)")]
        any: String,

        #[arg(long, default_value = "", help = "None of the words may appear (NOT)")]
        none: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    #[command(about = "Inspect or clear saved investigations")]
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(clap::Args)]
struct OutputArgs {
    #[arg(long, help = "Print the report as JSON instead of text")]
    json: bool,

    #[arg(long, help = "Also save the JSON report into this directory")]
    export: Option<PathBuf>,

    #[arg(long, help = "Also write the relationship graph as SVG")]
    svg: Option<PathBuf>,
}

#[derive(Subcommand)]
enum HistoryAction {
    #[command(about = "List saved investigations")]
    List,
    #[command(about = "Print a saved report")]
    Show { target: String },
    #[command(about = "Delete all saved investigations")]
    Clear,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn open_session(config: &AppConfig) -> Result<Session> {
    let client = GeminiClient::new(config.gemini_config()?)?;
    let extractor = Extractor::new(Arc::new(client), config.prompt_options());
    let store = Arc::new(JsonFileStore::new(config.history_path()));
    Ok(Session::open(extractor, store, config.session_config()).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(locale) = cli.locale {
        config.report.locale = locale;
    }
    info!(model = %config.inference.model, history = %config.history_path().display(), "Configuration loaded");

    match cli.command.unwrap_or(Commands::Repl) {
        Commands::Repl => {
            let session = open_session(&config).await?;
            Repl::new(session, config).run().await?;
        }
        Commands::Investigate { target, output } => {
            investigate_once(&config, &target, &output).await?;
        }
        Commands::Advanced { all, any, none, output } => {
            let query = AdvancedQuery { all_words: all, any_words: any, none_words: none }
                .build()
                .context("Give at least one word in --all, --any or --none")?;
            investigate_once(&config, &query, &output).await?;
        }
        Commands::History { action } => handle_history(&config, action).await?,
    }

    Ok(())
}

async fn investigate_once(config: &AppConfig, target: &str, output: &OutputArgs) -> Result<()> {
    let mut session = open_session(config).await?;
    let locale = session.locale();

    if let Err(e) = session.submit(target).await {
        anyhow::bail!(e.user_message(locale));
    }
    let data = session.analysis().context("Investigation finished without a report")?;

    if output.json {
        println!("{}", ExportDocument::new(&data.target, &data.results, &data.sources).to_json()?);
    } else {
        let sections = report::render_sections(&data.results, &data.sources, ActiveFilter::All, None, locale);
        println!("{}", report::render_text(&sections).trim_end());
    }

    if let Some(dir) = &output.export {
        let path = ExportDocument::new(&data.target, &data.results, &data.sources)
            .write_to(dir)
            .await
            .with_context(|| format!("Failed to export report into {}", dir.display()))?;
        eprintln!("Report saved to {}", path.display());
    }

    if let Some(path) = &output.svg {
        let layout = report::layout(&data.target, &data.results, None, locale, &config.graph);
        tokio::fs::write(path, report::render_svg(&layout))
            .await
            .with_context(|| format!("Failed to write graph to {}", path.display()))?;
        eprintln!("Graph written to {}", path.display());
    }

    Ok(())
}

async fn handle_history(config: &AppConfig, action: HistoryAction) -> Result<()> {
    let store = JsonFileStore::new(config.history_path());

    match action {
        HistoryAction::List => {
            let history = History::load(&store).await;
            if history.is_empty() {
                println!("No saved investigations.");
            }
            for entry in history.entries() {
                let saved = entry
                    .saved_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{:<32} {}  {}", entry.target, saved, entry.investigation_path.steps().join(" -> "));
            }
        }
        HistoryAction::Show { target } => {
            let history = History::load(&store).await;
            let entry = history
                .get(&target)
                .with_context(|| format!("No saved investigation for {}", target))?;
            let sections = report::render_sections(
                &entry.results,
                &entry.sources,
                ActiveFilter::All,
                None,
                config.report.locale,
            );
            println!("# {}\n", entry.investigation_path.steps().join(" -> "));
            println!("{}", report::render_text(&sections).trim_end());
        }
        HistoryAction::Clear => {
            store.clear().await.context("Failed to clear history")?;
            println!("History cleared.");
        }
    }

    Ok(())
}
