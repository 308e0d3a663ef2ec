//! Error types for the ALS recommender

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AlsError>;

#[derive(Debug, Error)]
pub enum AlsError {
    /// Caller broke a precondition (shapes, rank, regularization, indices).
    /// Always raised before any numerical work starts.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A normal-equation system could not be factored.
    #[error("Ill-conditioned system while solving {stage}: {message}")]
    IllConditioned { stage: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
        key: Option<String>,
    },
}

impl AlsError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AlsError::InvalidInput {
            message: message.into(),
        }
    }

    pub fn ill_conditioned(stage: impl Into<String>, message: impl Into<String>) -> Self {
        AlsError::IllConditioned {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Precondition violations are caller bugs; retrying will not help.
    pub fn is_precondition(&self) -> bool {
        matches!(self, AlsError::InvalidInput { .. })
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, AlsError::IllConditioned { .. })
    }

    /// Re-tag a numerical failure with the solver stage it happened in.
    pub(crate) fn in_stage(self, stage: &str) -> Self {
        match self {
            AlsError::IllConditioned { message, .. } => AlsError::IllConditioned {
                stage: stage.to_string(),
                message,
            },
            other => other,
        }
    }
}
