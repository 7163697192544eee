// src/render/openscad.rs — OpenSCAD CLI wrapper

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{DesignRenderer, Quality, RenderOptions};
use crate::infra::config::RendererConfig;
use crate::infra::errors::ScadCriticError;

/// Invokes the external `openscad` binary for rendering, mesh export and
/// syntax validation. The geometry kernel itself is entirely the
/// binary's business; this wrapper only passes parameters and
/// classifies failures.
pub struct OpenScadRenderer {
    binary: PathBuf,
    timeout: Duration,
    validate_timeout: Duration,
    eval_options: RenderOptions,
}

impl OpenScadRenderer {
    /// Locate the binary and build a renderer: explicit config path,
    /// then $OPENSCAD_BINARY, then PATH lookup.
    pub fn discover(config: &RendererConfig) -> Result<Self, ScadCriticError> {
        let binary = find_binary(config.binary.as_deref())?;
        Ok(Self {
            binary,
            timeout: Duration::from_secs(config.timeout_seconds),
            validate_timeout: Duration::from_secs(config.validate_timeout_seconds),
            eval_options: RenderOptions {
                width: config.image_width,
                height: config.image_height,
                quality: Quality::Eval,
                colorscheme: config.colorscheme.clone(),
            },
        })
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary
    }

    /// Probe the binary version (`openscad --version` writes to stderr).
    pub async fn version(&self) -> Result<String, ScadCriticError> {
        let output = self
            .run(&["--version".to_string()], Duration::from_secs(10))
            .await?;
        let text = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        Ok(text.trim().to_string())
    }

    /// Render a .scad file to PNG and return the image bytes.
    pub async fn render_png(
        &self,
        source: &Path,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, ScadCriticError> {
        ensure_exists(source)?;

        let out = tempfile::Builder::new()
            .prefix("scadcritic_render_")
            .suffix(".png")
            .tempfile()?;

        let mut args = override_args(options.quality);
        args.extend([
            "--autocenter".to_string(),
            "--viewall".to_string(),
            format!("--imgsize={},{}", options.width, options.height),
            "--colorscheme".to_string(),
            options.colorscheme.clone(),
            "-o".to_string(),
            out.path().display().to_string(),
            source.display().to_string(),
        ]);

        let output = self.run(&args, self.timeout).await?;
        if !output.status.success() {
            return Err(render_error(&output));
        }

        let bytes = tokio::fs::read(out.path()).await?;
        if bytes.is_empty() {
            return Err(ScadCriticError::RenderFailed {
                message: "renderer produced an empty image".into(),
            });
        }
        Ok(bytes)
    }

    /// Export a .scad file to a mesh/2D format. The output format is
    /// chosen by the extension of `out`. Returns the written file size.
    pub async fn render_mesh(
        &self,
        source: &Path,
        out: &Path,
        quality: Quality,
    ) -> Result<u64, ScadCriticError> {
        ensure_exists(source)?;
        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut args = override_args(quality);
        args.extend([
            "-o".to_string(),
            out.display().to_string(),
            source.display().to_string(),
        ]);

        let output = self.run(&args, self.timeout).await?;
        if !output.status.success() || !out.exists() {
            return Err(render_error(&output));
        }

        Ok(tokio::fs::metadata(out).await?.len())
    }

    /// Validate .scad syntax via a dry-run export to the echo format.
    /// ERROR lines become diagnostics; WARNING lines are logged only.
    pub async fn validate(&self, source: &Path) -> Result<(), ScadCriticError> {
        ensure_exists(source)?;

        let out = tempfile::Builder::new()
            .prefix("scadcritic_validate_")
            .suffix(".echo")
            .tempfile()?;

        let args = vec![
            "-o".to_string(),
            out.path().display().to_string(),
            "--export-format".to_string(),
            "echo".to_string(),
            source.display().to_string(),
        ];

        let output = self.run(&args, self.validate_timeout).await?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let errors = classify_diagnostics(&stderr);

        if !output.status.success() || !errors.is_empty() {
            let diagnostics = if errors.is_empty() {
                stderr.trim().to_string()
            } else {
                errors.join("\n")
            };
            return Err(ScadCriticError::SyntaxInvalid { diagnostics });
        }
        Ok(())
    }

    async fn run(&self, args: &[String], timeout: Duration) -> Result<Output, ScadCriticError> {
        tracing::debug!(binary = %self.binary.display(), ?args, "running openscad");

        let future = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, future)
            .await
            .map_err(|_| ScadCriticError::Timeout {
                seconds: timeout.as_secs(),
            })?
            .map_err(|e| ScadCriticError::RenderFailed {
                message: format!("failed to launch {}: {}", self.binary.display(), e),
            })?;

        Ok(output)
    }
}

#[async_trait]
impl DesignRenderer for OpenScadRenderer {
    async fn render_preview(&self, code: &str) -> Result<Vec<u8>, ScadCriticError> {
        let scratch = write_scratch(code)?;
        self.render_png(scratch.path(), &self.eval_options).await
    }

    async fn validate_code(&self, code: &str) -> Result<(), ScadCriticError> {
        let scratch = write_scratch(code)?;
        self.validate(scratch.path()).await
    }
}

/// Write source text to a scratch .scad file that lives as long as the
/// returned handle.
fn write_scratch(code: &str) -> Result<tempfile::NamedTempFile, ScadCriticError> {
    use std::io::Write;
    let mut file = tempfile::Builder::new()
        .prefix("scadcritic_")
        .suffix(".scad")
        .tempfile()?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file)
}

fn find_binary(configured: Option<&str>) -> Result<PathBuf, ScadCriticError> {
    if let Some(path) = configured {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Ok(p);
        }
        return Err(ScadCriticError::Config(format!(
            "configured OpenSCAD binary not found: {path}"
        )));
    }

    if let Some(path) = std::env::var_os("OPENSCAD_BINARY") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Ok(p);
        }
    }

    which::which("openscad")
        .or_else(|_| which::which("OpenSCAD"))
        .map_err(|_| ScadCriticError::RenderFailed {
            message: "OpenSCAD binary not found. Install OpenSCAD and ensure it is in PATH, \
                      or set renderer.binary / $OPENSCAD_BINARY."
                .into(),
        })
}

fn ensure_exists(path: &Path) -> Result<(), ScadCriticError> {
    if !path.is_file() {
        return Err(ScadCriticError::NotFound(format!(
            "file not found: {}",
            path.display()
        )));
    }
    Ok(())
}

fn override_args(quality: Quality) -> Vec<String> {
    let mut args = Vec::new();
    for (name, value) in quality.overrides() {
        args.push("-D".to_string());
        args.push(format!("{name}={value}"));
    }
    args
}

fn render_error(output: &Output) -> ScadCriticError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        format!("openscad exited with {}", output.status)
    } else {
        stderr.trim().to_string()
    };
    ScadCriticError::RenderFailed { message }
}

/// Pick out ERROR lines; WARNING lines go to the debug log.
fn classify_diagnostics(stderr: &str) -> Vec<String> {
    let mut errors = Vec::new();
    for line in stderr.lines() {
        let upper = line.to_uppercase();
        if upper.contains("ERROR") {
            errors.push(line.trim().to_string());
        } else if upper.contains("WARNING") {
            tracing::debug!("openscad: {}", line.trim());
        }
    }
    errors
}
