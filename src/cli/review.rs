// src/cli/review.rs — `scadcritic review <file>`

use std::path::PathBuf;

use crate::agent::session::SessionConfig;
use crate::agent::{SessionController, StartRequest};
use crate::cli::session_loop::{self, LoopOptions};

pub async fn run(
    controller: &SessionController,
    file: &str,
    config: SessionConfig,
    auto: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let mode = if dry_run {
        "dry-run"
    } else if auto {
        "auto"
    } else {
        "interactive"
    };

    println!("  scadcritic review ({mode})");
    println!("  File: {file}");
    println!("  Model: {}", config.model);
    println!(
        "  Target: {}/10 | Max iterations: {}",
        config.target_score, config.max_iterations
    );

    let started = controller
        .start(
            StartRequest::Review {
                path: PathBuf::from(file),
            },
            config,
        )
        .await?;

    session_loop::run(controller, &started, &LoopOptions { auto, dry_run }).await
}
