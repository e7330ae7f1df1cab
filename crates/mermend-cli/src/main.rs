mod commands;
mod config;
mod shell;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use mermend_core::FamilyHint;
use mermend_render::Theme;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::ImageFormat;

// ── CLI ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "mermend",
    version,
    about = "Repair, validate, generate and render Mermaid diagrams"
)]
struct Cli {
    /// Path to config file (defaults to ./mermend.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write JSON logs to a daily file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Override model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Override render theme (default, dark, forest, neutral)
    #[arg(long, global = true)]
    theme: Option<Theme>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract and validate a diagram; exits 1 when issues are found
    Check {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },
    /// Extract, repair and validate; prints the repaired source
    Fix {
        /// Input file, or `-` for stdin
        input: PathBuf,
    },
    /// Generate a diagram from a description with the configured model
    Generate {
        /// What the diagram should show
        description: String,

        #[arg(long, default_value = "flowchart")]
        family: FamilyHint,

        /// Timeline start date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Write the diagram source here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also render the diagram to this image file
        #[arg(long)]
        image: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
        format: ImageFormat,
    },
    /// Render a diagram to an image
    Render {
        /// Input file, or `-` for stdin
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = ImageFormat::Png)]
        format: ImageFormat,

        #[arg(long)]
        out: PathBuf,
    },
    /// Generate diagrams interactively, keeping history and favorites
    Shell {
        #[arg(long, default_value = "flowchart")]
        family: FamilyHint,
    },
}

// ── Logging ─────────────────────────────────────────────────────

fn init_tracing(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log dir: {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::RollingFileAppender::builder()
                .rotation(tracing_appender::rolling::Rotation::DAILY)
                .filename_prefix("mermend")
                .filename_suffix("txt")
                .build(dir)
                .context("Failed to create log file appender")?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    Ok(guard)
}

// ── Main ────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_dir.as_deref())?;

    let file_config = config::load_config(cli.config.as_deref())?;
    let env_api_key = std::env::var(config::API_KEY_ENV).ok();
    let llm_config = file_config.llm_config(env_api_key, cli.model.as_deref());
    let render_config = file_config.render_config(cli.theme);

    match cli.command {
        Command::Check { input } => commands::check(&input),
        Command::Fix { input } => commands::fix(&input),
        Command::Generate {
            description,
            family,
            start_date,
            out,
            image,
            format,
        } => {
            let options = commands::GenerateOptions {
                description,
                family,
                start_date,
                out,
                image,
                format,
            };
            commands::generate(options, llm_config, render_config).await
        }
        Command::Render { input, format, out } => {
            commands::render(&input, format, &out, render_config).await
        }
        Command::Shell { family } => shell::run(family, llm_config).await,
    }
}
