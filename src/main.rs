mod app;
mod config;
mod document;
mod llm;
mod proposal;
mod ui;

use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::cockpit::{Cockpit, run_loop, startup_subtitle};
use config::Config;
use document::{ControllerError, Document, DocumentController};
use llm::ChatCompletionsGenerator;
use proposal::{OnInvalid, ProposalService, validate::starter_document};
use ui::{preview::PreviewSink, screen::Screen};

const DEFAULT_LOG_FILTER: &str = "pagesmith=info";
const LOG_FILE: &str = "pagesmith.log";

#[derive(Debug, Parser)]
#[command(
    version,
    about = "Terminal cockpit that edits one HTML page through reviewed, full-document proposals."
)]
struct Cli {
    /// Run one command without the cockpit and print the proposal to stdout.
    #[arg(short = 'p', long = "prompt", value_name = "COMMAND")]
    prompt: Option<String>,

    /// Start from this HTML file instead of the starter page.
    #[arg(long, value_name = "PATH")]
    document: Option<PathBuf>,

    /// Config file (defaults to $PAGESMITH_CONFIG, then ./pagesmith.toml).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// What to do with responses that are not full documents: reject or wrap.
    #[arg(long, value_name = "STRATEGY")]
    on_invalid: Option<OnInvalid>,

    /// Project name shown in the cockpit.
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Model override for the generator.
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// Where current.html / proposal.html (and the log) are written.
    #[arg(long, value_name = "DIR")]
    preview_dir: Option<PathBuf>,
}

impl Cli {
    fn apply_to(&self, config: &mut Config) {
        if let Some(on_invalid) = self.on_invalid {
            config.proposal.on_invalid = on_invalid;
        }
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            config.session.project_name = name.to_string();
        }
        if let Some(model) = &self.model {
            config.generator.model = model.clone();
        }
        if let Some(dir) = &self.preview_dir {
            config.session.preview_dir = dir.clone();
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    init_logging(cli.prompt.is_some(), &config.session.preview_dir)?;

    let generator = ChatCompletionsGenerator::from_settings(&config.generator)?;
    let model = generator.model().to_string();
    let base_url = generator.base_url().to_string();
    let service = ProposalService::new(Arc::new(generator), config.proposal.options());
    let document = initial_document(cli.document.as_deref(), &config.session.project_name)?;
    info!(
        model = %model,
        on_invalid = %config.proposal.on_invalid,
        chars = document.content.chars().count(),
        "session started"
    );
    let mut controller = DocumentController::new(Arc::new(service), document);

    if let Some(prompt) = cli.prompt {
        return run_headless(&mut controller, &prompt).await;
    }

    let mut cockpit = Cockpit::new(
        controller,
        PreviewSink::new(&config.session.preview_dir),
    );

    enable_raw_mode()?;
    execute!(io::stdout(), EnableBracketedPaste)?;
    let run_result = match Screen::new(&startup_subtitle(&cockpit, &model, &base_url)) {
        Ok(mut screen) => run_loop(&mut cockpit, &mut screen).await,
        Err(e) => Err(e.into()),
    };

    let _ = execute!(io::stdout(), DisableBracketedPaste);
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), Print("\r\n"));
    run_result
}

fn initial_document(path: Option<&Path>, name: &str) -> anyhow::Result<Document> {
    let content = match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read document {}", path.display()))?,
        None => starter_document(name),
    };
    Ok(Document::new(name, content))
}

async fn run_headless(controller: &mut DocumentController, prompt: &str) -> anyhow::Result<()> {
    let proposal = match controller.submit_command(prompt).await {
        Ok(proposal) => proposal,
        Err(err) => {
            if let ControllerError::Generation(generation) = &err
                && let Some(detail) = generation.diagnostic()
            {
                eprintln!("{detail}");
            }
            return Err(err.into());
        }
    };
    eprintln!("{}", proposal.info);
    println!("{}", proposal.content);
    Ok(())
}

/// Headless runs log to stderr; the cockpit owns the terminal, so it logs to
/// a file inside the preview directory.
fn init_logging(headless: bool, preview_dir: &Path) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if headless {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
        return Ok(());
    }

    fs::create_dir_all(preview_dir)
        .with_context(|| format!("failed to create {}", preview_dir.display()))?;
    let path = preview_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    registry
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flags_override_config() {
        let cli = Cli::parse_from([
            "pagesmith",
            "--on-invalid",
            "wrap",
            "--name",
            " Landing ",
            "--model",
            "local-model",
        ]);
        let mut config = Config::default();

        cli.apply_to(&mut config);

        assert_eq!(config.proposal.on_invalid, OnInvalid::Wrap);
        assert_eq!(config.session.project_name, "Landing");
        assert_eq!(config.generator.model, "local-model");
    }

    #[test]
    fn unknown_strategy_flag_is_rejected() {
        assert!(Cli::try_parse_from(["pagesmith", "--on-invalid", "retry"]).is_err());
    }

    #[test]
    fn prompt_flag_selects_headless_mode() {
        let cli = Cli::parse_from(["pagesmith", "-p", "add a footer"]);
        assert_eq!(cli.prompt.as_deref(), Some("add a footer"));
    }

    #[test]
    fn initial_document_defaults_to_starter_page() {
        let document = initial_document(None, "Landing").unwrap();
        assert_eq!(document.name, "Landing");
        assert!(document.content.contains("<title>Landing</title>"));
    }

    #[test]
    fn initial_document_reads_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("page.html");
        fs::write(&path, "<html><body>X</body></html>").unwrap();

        let document = initial_document(Some(path.as_path()), "My Site").unwrap();

        assert_eq!(document.content, "<html><body>X</body></html>");
        assert!(initial_document(Some(tmp.path().join("missing.html").as_path()), "x").is_err());
    }
}
