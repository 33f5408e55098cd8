use thiserror::Error;

/// Every way an analysis can fail between `submit` and a validated result.
///
/// The state machine folds all of these into a single user-facing message;
/// none of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Configuration { status: u16, message: String },

    #[error("service temporarily unavailable ({status})")]
    Transient { status: u16 },

    #[error("service still unavailable after {attempts} attempts (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },

    #[error("empty response from the model")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("request failed: {0}")]
    Transport(String),
}

impl AnalysisError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Configuration { .. } => "configuration",
            Self::Transient { .. } => "transient",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::EmptyResponse => "empty_response",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Transport(_) => "transport",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("cannot {operation} while in {state} view")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },
}
