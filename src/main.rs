use anyhow::Result;
use clap::Parser;
use colored::*;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use commitcraft::ai::{get_adapter, ClientPool};
use commitcraft::cli::{App, Cli};
use commitcraft::config::{self, Config};
use commitcraft::git::GitRepo;
use commitcraft::prompt::{Outcome, Terminal};
use commitcraft::render::Renderer;
use commitcraft::theme::Theme;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Logs go to stderr so the streamed content on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("COMMITCRAFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(Outcome::Done(())) => ExitCode::SUCCESS,
        Ok(Outcome::Declined(step)) => {
            println!("{}", format!("🙅 Declined {step}").yellow());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("🚨 {}", format!("{err:#}").red());
            ExitCode::FAILURE
        }
    };

    println!("👋 goodbye");
    code
}

async fn run(cli: Cli) -> Result<Outcome<()>> {
    let config = Config::load_or_default(&config::get_config_path()?)?;
    if !config.display.color_output {
        colored::control::set_override(false);
    }

    let adapter_name = cli.adapter.as_deref().unwrap_or(&config.ai.adapter);
    let adapter = get_adapter(adapter_name)?;
    debug!(adapter = adapter.name, model = adapter.model, "selected adapter");

    let clients = ClientPool::new(config.client_settings());
    let repo = GitRepo::open(std::env::current_dir()?)?;

    let shutdown = CancellationToken::new();
    let on_interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted");
            on_interrupt.cancel();
        }
    });

    let renderer = Renderer::stdout(Theme::named(&config.display.theme));
    let mut app = App::new(repo, clients, adapter, Terminal, renderer, shutdown);
    app.run(&cli).await
}
