// src/infra/errors.rs — Error types for scadcritic

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScadCriticError {
    // Lookup / input errors (surfaced to the caller, no retry)
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    // Renderer errors (surfaced as a failed call; never retried internally)
    #[error("render failed: {message}")]
    RenderFailed { message: String },

    #[error("renderer timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("OpenSCAD source is invalid:\n{diagnostics}")]
    SyntaxInvalid { diagnostics: String },

    // Model client errors (retriable = transient)
    #[error("model error: {message}")]
    Model { message: String, retriable: bool },

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("ANTHROPIC_API_KEY not found in the environment or .env file")]
    NoApiKey,

    // Infra
    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScadCriticError {
    /// Transient failures worth retrying with backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ScadCriticError::Model {
                retriable: true,
                ..
            } | ScadCriticError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_model_error_is_retriable() {
        let err = ScadCriticError::Model {
            message: "HTTP 500".into(),
            retriable: true,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_fatal_model_error_is_not_retriable() {
        let err = ScadCriticError::Model {
            message: "HTTP 400 bad request".into(),
            retriable: false,
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn test_rate_limited_is_retriable() {
        let err = ScadCriticError::RateLimited {
            retry_after_ms: 5000,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn test_render_and_parse_errors_are_not_retriable() {
        assert!(!ScadCriticError::RenderFailed {
            message: "boom".into()
        }
        .is_retriable());
        assert!(!ScadCriticError::Timeout { seconds: 30 }.is_retriable());
        assert!(!ScadCriticError::MalformedResponse("no json".into()).is_retriable());
        assert!(!ScadCriticError::NotFound("session 'x'".into()).is_retriable());
    }
}
