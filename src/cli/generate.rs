// src/cli/generate.rs — `scadcritic generate <description>`

use crate::agent::session::SessionConfig;
use crate::agent::{SessionController, StartRequest};
use crate::cli::session_loop::{self, LoopOptions};

pub async fn run(
    controller: &SessionController,
    description: &str,
    output: Option<String>,
    config: SessionConfig,
    auto: bool,
) -> anyhow::Result<()> {
    println!(
        "  scadcritic generate ({})",
        if auto { "auto" } else { "interactive" }
    );
    println!("  Description: {description}");
    println!("  Model: {}", config.model);
    println!(
        "  Target: {}/10 | Max iterations: {}",
        config.target_score, config.max_iterations
    );
    println!();
    println!("  Generating initial design...");

    let started = controller
        .start(
            StartRequest::Generate {
                description: description.to_string(),
                output_name: output,
            },
            config,
        )
        .await?;

    println!(
        "  Initial design validated and written to {}",
        started.source_path.display()
    );

    session_loop::run(
        controller,
        &started,
        &LoopOptions {
            auto,
            dry_run: false,
        },
    )
    .await
}
