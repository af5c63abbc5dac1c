use std::path::PathBuf;
use anyhow::Result;
use clap::Parser;
use tracing::info;

mod app;
mod chat;
mod config;
mod handler;
mod logging;
mod model;
mod ollama;
mod tui;
mod ui;

use app::App;
use config::Config;
use model::Model;
use ollama::OllamaClient;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "ollama-chat", version)]
#[command(about = "Chat with a local Ollama server from the terminal")]
struct Cli {
    /// Ollama base URL, e.g. http://localhost:11434
    #[arg(long, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Model to start with (llama2, codellama, mistral)
    #[arg(short, long, value_parser = model::parse_model)]
    model: Option<Model>,

    /// Config file to read instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = logging::configure_logging(cli.log_file)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let host = config.resolve_host(cli.host.as_deref());
    let model = config.resolve_model(cli.model);

    let ollama = host.as_deref().map(OllamaClient::new);
    info!(host = ?ollama.as_ref().map(|c| c.base_url()), model = %model, "starting");
    let app = App::new(ollama, model);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, app).await;
    tui::restore()?;

    info!("exiting");
    result
}

async fn run(terminal: &mut Tui, mut app: App) -> Result<()> {
    let mut events = EventHandler::new();

    // Check the backend before the user can type
    app.start_probe();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if let Some(event) = events.next().await {
            handler::handle_event(&mut app, event)?;
        }
        app.poll_tasks().await;
    }

    Ok(())
}
