// src/main.rs — scadcritic entry point

use clap::Parser;
use std::sync::Arc;

use scadcritic::agent::session::SessionConfig;
use scadcritic::agent::SessionController;
use scadcritic::cli::{self, Cli, Commands};
use scadcritic::infra::config::Config;
use scadcritic::infra::logger;
use scadcritic::provider::anthropic::AnthropicClient;
use scadcritic::provider::retry::{RetryClient, RetryPolicy};
use scadcritic::render::OpenScadRenderer;

#[tokio::main]
async fn main() {
    // Respects RUST_LOG; diagnostics go to stderr
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    match cli.command {
        Commands::Review {
            file,
            max_iterations,
            target_score,
            model,
            auto,
            dry_run,
        } => {
            let controller = build_controller(&config)?;
            let session_config = session_config(&config, target_score, max_iterations, model);
            cli::review::run(&controller, &file, session_config, auto, dry_run).await
        }

        Commands::Generate {
            description,
            output,
            max_iterations,
            target_score,
            model,
            auto,
        } => {
            let controller = build_controller(&config)?;
            let session_config = session_config(&config, target_score, max_iterations, model);
            cli::generate::run(&controller, &description, output, session_config, auto).await
        }

        Commands::Render {
            file,
            output,
            width,
            height,
            quality,
        } => cli::render::run_render(&config, &file, output, width, height, &quality).await,

        Commands::Export {
            file,
            output,
            format,
            quality,
        } => cli::render::run_export(&config, &file, output, &format, &quality).await,

        Commands::Validate { file } => cli::render::run_validate(&config, &file).await,

        Commands::Doctor => cli::doctor::run(&config).await,
    }
}

/// Wire the renderer, the retrying model client and the controller.
fn build_controller(config: &Config) -> anyhow::Result<SessionController> {
    let renderer = Arc::new(OpenScadRenderer::discover(&config.renderer)?);
    let client = AnthropicClient::from_env(config.model.max_tokens)?;
    let model = Arc::new(RetryClient::with_policy(
        Arc::new(client),
        RetryPolicy {
            max_attempts: config.model.max_attempts,
            ..RetryPolicy::default()
        },
    ));

    Ok(SessionController::new(
        renderer,
        model,
        config.agent.clone(),
        config.data_dir(),
    ))
}

/// Per-session config: CLI flags override config-file defaults.
fn session_config(
    config: &Config,
    target_score: Option<u8>,
    max_iterations: Option<u32>,
    model: Option<String>,
) -> SessionConfig {
    SessionConfig {
        target_score: target_score.unwrap_or(config.agent.target_score),
        max_iterations: max_iterations.unwrap_or(config.agent.max_iterations),
        model: model.unwrap_or_else(|| config.model.default_model.clone()),
        halt_on_convergence: config.agent.halt_on_convergence,
    }
}
