// src/agent/mod.rs — Evaluation session controller

pub mod convergence;
pub mod parser;
pub mod prompts;
pub mod session;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::infra::config::AgentConfig;
use crate::infra::errors::ScadCriticError;
use crate::provider::{ModelClient, Turn};
use crate::render::DesignRenderer;
use convergence::{verdict, Convergence};
use session::{
    AppliedEdit, Evaluation, IterationRecord, Mode, Session, SessionConfig, StartedSession,
};

/// How to start a session.
#[derive(Debug, Clone)]
pub enum StartRequest {
    /// Improve an existing .scad file.
    Review { path: PathBuf },
    /// Create a design from a description, then improve it.
    Generate {
        description: String,
        output_name: Option<String>,
    },
}

/// Drives review/generate sessions through repeated render → evaluate →
/// apply cycles until a stop rule fires.
///
/// The table lock is held only for lookup, insert and remove; the
/// long-running renderer and model calls run under the per-session lock
/// alone, so operations on one session serialize while distinct
/// sessions proceed independently.
pub struct SessionController {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    renderer: Arc<dyn DesignRenderer>,
    model: Arc<dyn ModelClient>,
    defaults: AgentConfig,
    data_dir: PathBuf,
}

impl SessionController {
    pub fn new(
        renderer: Arc<dyn DesignRenderer>,
        model: Arc<dyn ModelClient>,
        defaults: AgentConfig,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            renderer,
            model,
            defaults,
            data_dir,
        }
    }

    /// Create a session. Review mode reads the existing file; generate
    /// mode asks the model for initial source, validates it, and writes
    /// it into the data directory.
    pub async fn start(
        &self,
        request: StartRequest,
        config: SessionConfig,
    ) -> Result<StartedSession, ScadCriticError> {
        self.purge_expired().await;

        let (mode, source_path, description, current_code) = match request {
            StartRequest::Review { path } => {
                let code = read_source(&path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                (Mode::Review, path, format!("Review of {name}"), code)
            }
            StartRequest::Generate {
                description,
                output_name,
            } => {
                if description.trim().is_empty() {
                    return Err(ScadCriticError::InvalidInput(
                        "description must not be empty".into(),
                    ));
                }

                let raw = self.model.generate(&description, &config.model).await?;
                let code = parser::extract_generated_code(&raw);
                self.renderer.validate_code(&code).await?;

                let path = self.data_dir.join(output_filename(&description, output_name));
                tokio::fs::create_dir_all(&self.data_dir).await?;
                write_source(&path, &code).await?;
                tracing::info!(path = %path.display(), "generated initial design");

                (Mode::Generate, path, description, code)
            }
        };

        let session = Session::new(mode, source_path, description, current_code, config);
        let started = StartedSession {
            session_id: session.id.clone(),
            source_path: session.source_path.clone(),
            mode: session.mode,
        };

        self.sessions
            .lock()
            .await
            .insert(session.id.clone(), Arc::new(Mutex::new(session)));

        Ok(started)
    }

    /// Run one render → evaluate cycle. Any failure leaves the session
    /// exactly as it was, so the caller can retry the same call.
    pub async fn evaluate(
        &self,
        session_id: &str,
        feedback: Option<&str>,
    ) -> Result<Evaluation, ScadCriticError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        if session.config.halt_on_convergence {
            if let Some(reason) = session.converged {
                return Err(ScadCriticError::InvalidState(format!(
                    "session already converged ({reason})"
                )));
            }
        }

        // Render the committed source at evaluation quality. Not retried:
        // the session is untouched on failure, re-issuing evaluate() is
        // the retry.
        let png = self.renderer.render_preview(&session.current_code).await?;

        let iteration = session.iteration_count() + 1;
        let instruction = if iteration == 1 {
            prompts::initial_instruction(session.mode, &session.description)
        } else {
            prompts::followup_instruction(iteration)
        };
        let user_turn =
            prompts::evaluation_turn(&instruction, &png, &session.current_code, feedback);

        // Work on a copy of the turn list so a model or parse failure
        // leaves no partial turn behind.
        let mut turns = session.turns.clone();
        turns.push(user_turn.clone());

        let response = self
            .model
            .converse(prompts::EVAL_SYSTEM, &turns, &session.config.model)
            .await?;
        let eval = parser::parse_evaluation(&response)?;

        // All fallible steps are done; commit to the session.
        session.turns.push(user_turn);
        session.turns.push(Turn::assistant(response));

        let record = IterationRecord {
            iteration,
            score: eval.score,
            criteria: eval.criteria,
            summary: eval.summary,
            issues: eval.issues,
            had_suggestion: eval.suggested_code.is_some(),
            stop_reason: eval.stop_reason,
        };
        session.history.push(record.clone());
        session.pending_code = eval.suggested_code;
        session.touch();

        let outcome = verdict(
            &session.history,
            session.config.target_score,
            session.config.max_iterations,
        );
        if let Convergence::Converged(reason) = outcome {
            session.converged = Some(reason);
            tracing::info!(session = %session.id, reason = %reason, "session converged");
        }

        Ok(Evaluation {
            session_id: session.id.clone(),
            record,
            has_suggested_code: session.pending_code.is_some(),
            preview_png: png,
            converged: outcome.is_converged(),
            converge_reason: outcome.reason(),
            history: session.history.clone(),
        })
    }

    /// Validate the pending suggestion and commit it to disk. The
    /// pending text is consumed either way; on validation failure the
    /// committed source stays untouched.
    pub async fn apply(&self, session_id: &str) -> Result<AppliedEdit, ScadCriticError> {
        let handle = self.session_handle(session_id).await?;
        let mut session = handle.lock().await;

        let Some(code) = session.pending_code.take() else {
            return Err(ScadCriticError::InvalidState(
                "no suggested code to apply".into(),
            ));
        };

        if let Err(e) = self.renderer.validate_code(&code).await {
            tracing::warn!(session = %session.id, "suggested code failed validation: {e}");
            return Err(e);
        }

        write_source(&session.source_path, &code).await?;
        session.current_code = code.clone();
        session.touch();

        Ok(AppliedEdit {
            session_id: session.id.clone(),
            code,
        })
    }

    /// Tear the session down and hand back its history.
    pub async fn stop(&self, session_id: &str) -> Result<Vec<IterationRecord>, ScadCriticError> {
        let removed = self.sessions.lock().await.remove(session_id);
        match removed {
            Some(handle) => {
                let session = handle.lock().await;
                Ok(session.history.clone())
            }
            None => Err(ScadCriticError::NotFound(format!(
                "session '{session_id}'"
            ))),
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    async fn session_handle(
        &self,
        session_id: &str,
    ) -> Result<Arc<Mutex<Session>>, ScadCriticError> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| ScadCriticError::NotFound(format!("session '{session_id}'")))
    }

    /// Drop sessions idle past the configured TTL. Sessions with an
    /// operation in flight hold their lock and are never purged.
    async fn purge_expired(&self) {
        let ttl = self.defaults.session_ttl_seconds;
        if ttl == 0 {
            return;
        }

        let mut table = self.sessions.lock().await;
        let before = table.len();
        table.retain(|_, handle| match handle.try_lock() {
            Ok(session) => !session.expired(ttl),
            Err(_) => true,
        });

        let purged = before - table.len();
        if purged > 0 {
            tracing::debug!(purged, "purged expired sessions");
        }
    }
}

async fn read_source(path: &Path) -> Result<String, ScadCriticError> {
    match tokio::fs::read_to_string(path).await {
        Ok(code) => Ok(code),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScadCriticError::NotFound(
            format!("file not found: {}", path.display()),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Write source via a sibling temp file and rename, so a crash mid-write
/// never leaves a truncated design behind.
async fn write_source(path: &Path, code: &str) -> Result<(), ScadCriticError> {
    let tmp = path.with_extension("scad.tmp");
    tokio::fs::write(&tmp, code).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// Pick the generated design's filename: explicit name, else a slug of
/// the description, else a random fallback.
fn output_filename(description: &str, output_name: Option<String>) -> String {
    if let Some(name) = output_name {
        return if name.ends_with(".scad") {
            name
        } else {
            format!("{name}.scad")
        };
    }

    let mut slugged = slug::slugify(description).replace('-', "_");
    slugged.truncate(40);
    let slugged = slugged.trim_end_matches('_').to_string();

    if slugged.is_empty() {
        format!(
            "design_{}.scad",
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        )
    } else {
        format!("{slugged}.scad")
    }
}
