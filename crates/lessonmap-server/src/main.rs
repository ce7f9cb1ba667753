//! LessonMap: mind maps from lesson text, served over HTTP or run from the
//! command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use lessonmap_core::{Language, LessonMapConfig};
use lessonmap_map::{post_process_value, NormalizeOptions};
use lessonmap_runtime::{ReprocessFilter, Reprocessor};
use lessonmap_store::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

fn resolve_data_dir() -> PathBuf {
    std::env::var("LESSONMAP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn print_help() {
    println!("LessonMap: mind maps from lesson text");
    println!();
    println!("Usage: lessonmap [command]");
    println!();
    println!("Commands:");
    println!("  (none)                          Start the server");
    println!("  generate <file> [language]      Generate a mind map and print it as JSON");
    println!("  normalize <file>                Post-process a mind-map JSON file");
    println!("  reprocess [--apply] [--limit N] [--title S] [--contains-text S]");
    println!("                                  Re-normalize stored maps (dry run by default)");
    println!("  help                            Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 {
        match args[1].as_str() {
            "generate" => {
                if args.len() < 3 {
                    eprintln!("Usage: lessonmap generate <file> [language]");
                    std::process::exit(1);
                }
                return generate(&args[2], args.get(3).map(String::as_str)).await;
            }
            "normalize" => {
                if args.len() < 3 {
                    eprintln!("Usage: lessonmap normalize <file>");
                    std::process::exit(1);
                }
                return normalize(&args[2]);
            }
            "reprocess" => return reprocess(&args[2..]),
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown command: {}. Use 'lessonmap help' for usage.", args[1]);
                std::process::exit(1);
            }
        }
    }

    serve().await
}

async fn serve() -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = LessonMapConfig::from_env(&data_dir)?;
    let port = config.port;

    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let state = Arc::new(AppState::new(config, store));
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("LessonMap server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn generate(path: &str, language: Option<&str>) -> anyhow::Result<()> {
    let config = LessonMapConfig::from_env(resolve_data_dir())?;
    let language = match language {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|e| anyhow::anyhow!("{}", e))?,
        None => config.default_language,
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;

    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;
    let state = AppState::new(config, store);
    if state.llm_config.read().resolve_provider().is_none() {
        anyhow::bail!("No LLM provider configured: set an API key or edit llm-config.json");
    }

    let report = state
        .pipeline(language)
        .generate(&text)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    info!(
        "{} nodes from {}/{} chunks in {}ms",
        report.node_count, report.chunks_succeeded, report.chunks_total, report.duration_ms
    );

    println!("{}", serde_json::to_string_pretty(&report.mindmap)?);
    Ok(())
}

fn normalize(path: &str) -> anyhow::Result<()> {
    let config = LessonMapConfig::from_env(resolve_data_dir())?;
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path))?;

    let options = NormalizeOptions::from_settings(&config.mindmap, None);
    println!("{}", serde_json::to_string_pretty(&post_process_value(value, &options))?);
    Ok(())
}

fn reprocess(args: &[String]) -> anyhow::Result<()> {
    let mut filter = ReprocessFilter::default();
    let mut apply = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--apply" => apply = true,
            "--limit" => {
                let n = iter.next().context("--limit needs a number")?;
                filter.limit = n.parse().with_context(|| format!("Invalid limit: {}", n))?;
            }
            "--title" => filter.title_contains = Some(iter.next().context("--title needs a value")?.clone()),
            "--contains-text" => {
                filter.contains_text = Some(iter.next().context("--contains-text needs a value")?.clone())
            }
            other => anyhow::bail!("Unknown reprocess option: {}", other),
        }
    }

    let config = LessonMapConfig::from_env(resolve_data_dir())?;
    let store = SqliteStore::open(&config.data_paths.db)
        .map_err(|e| anyhow::anyhow!("Failed to open store: {}", e))?;

    let report = Reprocessor::new(&store, &config.mindmap)
        .run(&filter, apply)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    for entry in &report.entries {
        println!(
            "[{}] {} changed={} nodes {} -> {}",
            entry.id, entry.title, entry.changed, entry.changes.before_nodes, entry.changes.after_nodes
        );
    }
    println!("--- Summary ---");
    println!("Processed: {}", report.processed);
    if apply {
        println!("Updated:   {}", report.updated);
    } else {
        println!("(Dry run) Use --apply to persist changes");
    }
    Ok(())
}
