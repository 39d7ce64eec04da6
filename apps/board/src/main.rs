use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{BoardController, HttpMessageStore, ListOutcome, SubmitOutcome};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod view;

use config::load_settings;
use view::{Draft, TerminalView};

#[derive(Parser, Debug)]
#[command(name = "board", about = "Read and post messages on the spreadsheet board")]
struct Args {
    /// Board endpoint URL; overrides board.toml and the environment.
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Settings file (default: ./board.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Write the rendered page to this HTML file instead of stdout.
    #[arg(long, global = true)]
    output: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and render the message list.
    List,
    /// Post a message, then render the refreshed list.
    Post {
        #[arg(long)]
        username: String,
        #[arg(long)]
        message: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(endpoint) = args.endpoint {
        settings.endpoint_url = Some(endpoint);
    }
    if let Some(output) = args.output {
        settings.output = Some(output);
    }

    let store_config = settings.store_config().context(
        "board endpoint is not usable; set endpoint_url in board.toml, BOARD_ENDPOINT_URL or --endpoint",
    )?;
    let renderer = settings.renderer()?;
    info!(endpoint = %store_config.endpoint, encoding = ?store_config.submit_encoding, "board endpoint configured");

    let controller = BoardController::with_renderer(
        HttpMessageStore::new(store_config),
        TerminalView::new(settings.output.clone()),
        renderer,
    );

    match args.command {
        Command::List => match controller.activate().await {
            ListOutcome::Failed(err) => bail!("failed to load messages: {err}"),
            ListOutcome::Rendered { .. } | ListOutcome::Superseded => {
                ensure_page_written(controller.view())
            }
        },
        Command::Post { username, message } => {
            controller.view().fill_form(&username, &message);
            let form = controller
                .view()
                .draft()
                .unwrap_or(Draft { username, message });
            match controller.handle_submit(&form.username, &form.message).await {
                SubmitOutcome::Posted {
                    refresh: ListOutcome::Failed(err),
                } => {
                    warn!(error = %err, "message posted but the list could not be refreshed");
                    Ok(())
                }
                SubmitOutcome::Posted { .. } => ensure_page_written(controller.view()),
                SubmitOutcome::Invalid(reason) => bail!("nothing posted: {reason}"),
                SubmitOutcome::Busy => bail!("another submission is still in flight"),
                SubmitOutcome::Failed(err) => {
                    if controller.view().draft().is_some() {
                        info!("draft kept for retry");
                    }
                    bail!("failed to post message: {err}")
                }
            }
        }
    }
}

fn ensure_page_written(view: &TerminalView) -> Result<()> {
    match view.take_write_failure() {
        Some(err) => Err(err).with_context(|| {
            let path = view.output().map(|path| path.display().to_string());
            format!(
                "failed to write message page {}",
                path.unwrap_or_default()
            )
        }),
        None => Ok(()),
    }
}
