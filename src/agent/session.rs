// src/agent/session.rs — Session data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::agent::convergence::ConvergeReason;
use crate::infra::config::{AgentConfig, DEFAULT_MODEL};
use crate::provider::Turn;

/// How a session was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Review,
    Generate,
}

/// Per-session tuning, snapshotted at start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub target_score: u8,
    pub max_iterations: u32,
    pub model: String,
    /// Reject evaluate() once converged instead of allowing further polish.
    pub halt_on_convergence: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_score: 8,
            max_iterations: 8,
            model: DEFAULT_MODEL.into(),
            halt_on_convergence: false,
        }
    }
}

impl SessionConfig {
    pub fn from_defaults(defaults: &AgentConfig, model: String) -> Self {
        Self {
            target_score: defaults.target_score,
            max_iterations: defaults.max_iterations,
            model,
            halt_on_convergence: defaults.halt_on_convergence,
        }
    }
}

/// Scores for the fixed evaluation criteria, each on a 0-10 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriteriaScores {
    pub recognizability: u8,
    pub proportions: u8,
    pub visual_quality: u8,
    pub structural: u8,
    pub code_quality: u8,
}

/// One immutable entry in a session's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub score: u8,
    pub criteria: CriteriaScores,
    pub summary: String,
    pub issues: Vec<String>,
    pub had_suggestion: bool,
    pub stop_reason: Option<String>,
}

/// One design's in-progress improvement conversation.
///
/// Lives only in the controller's in-memory table; the design file on
/// disk is the sole durable artifact, updated through apply().
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub mode: Mode,
    pub source_path: PathBuf,
    pub description: String,
    pub current_code: String,
    /// At most one not-yet-applied suggestion. Cleared on apply,
    /// superseded by every evaluation.
    pub pending_code: Option<String>,
    pub turns: Vec<Turn>,
    pub history: Vec<IterationRecord>,
    pub config: SessionConfig,
    pub converged: Option<ConvergeReason>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(
        mode: Mode,
        source_path: PathBuf,
        description: String,
        current_code: String,
        config: SessionConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            source_path,
            description,
            current_code,
            pending_code: None,
            turns: Vec::new(),
            history: Vec::new(),
            config,
            converged: None,
            created_at: now,
            last_active: now,
        }
    }

    pub fn iteration_count(&self) -> u32 {
        self.history.len() as u32
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// True once the session has sat idle for at least `ttl_seconds`.
    pub fn expired(&self, ttl_seconds: u64) -> bool {
        Utc::now()
            .signed_duration_since(self.last_active)
            .num_seconds()
            >= ttl_seconds as i64
    }
}

/// Result of start().
#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: String,
    pub source_path: PathBuf,
    pub mode: Mode,
}

/// Result of evaluate(): the new record, the verdict and the preview.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub session_id: String,
    pub record: IterationRecord,
    pub has_suggested_code: bool,
    #[serde(skip)]
    pub preview_png: Vec<u8>,
    pub converged: bool,
    pub converge_reason: Option<ConvergeReason>,
    pub history: Vec<IterationRecord>,
}

/// Result of a successful apply().
#[derive(Debug, Clone, Serialize)]
pub struct AppliedEdit {
    pub session_id: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            Mode::Review,
            PathBuf::from("box.scad"),
            "Review of box.scad".into(),
            "cube(10);".into(),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_new_session_is_empty() {
        let s = session();
        assert!(!s.id.is_empty());
        assert!(s.turns.is_empty());
        assert!(s.history.is_empty());
        assert!(s.pending_code.is_none());
        assert!(s.converged.is_none());
        assert_eq!(s.iteration_count(), 0);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(session().id, session().id);
    }

    #[test]
    fn test_fresh_session_is_not_expired() {
        let s = session();
        assert!(!s.expired(1800));
        // A zero TTL expires immediately; the controller guards that case.
        assert!(s.expired(0));
    }

    #[test]
    fn test_expired_after_backdating() {
        let mut s = session();
        s.last_active = Utc::now() - chrono::Duration::seconds(3600);
        assert!(s.expired(1800));
        assert!(!s.expired(7200));
    }

    #[test]
    fn test_config_from_defaults() {
        let defaults = AgentConfig {
            target_score: 9,
            max_iterations: 4,
            halt_on_convergence: true,
            session_ttl_seconds: 60,
        };
        let cfg = SessionConfig::from_defaults(&defaults, "some-model".into());
        assert_eq!(cfg.target_score, 9);
        assert_eq!(cfg.max_iterations, 4);
        assert!(cfg.halt_on_convergence);
        assert_eq!(cfg.model, "some-model");
    }
}
