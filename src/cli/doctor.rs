// src/cli/doctor.rs — System diagnostics

use crate::infra::config::Config;
use crate::provider::anthropic::AnthropicClient;
use crate::render::OpenScadRenderer;

pub async fn run(config: &Config) -> anyhow::Result<()> {
    println!("scadcritic doctor v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // OpenSCAD binary
    eprint!("  Checking OpenSCAD... ");
    match OpenScadRenderer::discover(&config.renderer) {
        Ok(renderer) => match renderer.version().await {
            Ok(version) => eprintln!("ok ({version})"),
            Err(e) => eprintln!("found at {}, but version probe failed: {e}", renderer.binary_path().display()),
        },
        Err(e) => {
            eprintln!("MISSING");
            eprintln!("    {e}");
        }
    }

    // Model API key
    eprint!("  Checking API key... ");
    match AnthropicClient::from_env(config.model.max_tokens) {
        Ok(_) => eprintln!("ok"),
        Err(e) => {
            eprintln!("MISSING");
            eprintln!("    {e}");
        }
    }

    // Data directory
    eprint!("  Checking data directory... ");
    let dir = config.data_dir();
    if dir.is_dir() {
        let designs = std::fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "scad"))
                    .count()
            })
            .unwrap_or(0);
        eprintln!("ok ({} design(s) in {})", designs, dir.display());
    } else {
        eprintln!("not created yet ({})", dir.display());
    }

    println!();
    println!("Done.");
    Ok(())
}
