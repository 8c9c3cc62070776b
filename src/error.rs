use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::http::ApiResponse;

/// Completion-provider failures, worded for end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("API quota exceeded. Please check your OpenAI account.")]
    QuotaExceeded,
    #[error("Invalid API key. Please check your OpenAI configuration.")]
    InvalidApiKey,
    #[error("Failed to get response from AI assistant")]
    Unavailable,
}

impl ProviderError {
    /// Recovers a classified failure from a provider error chain; anything
    /// unclassified becomes [`ProviderError::Unavailable`].
    pub fn classify(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<ProviderError>()
            .copied()
            .unwrap_or(ProviderError::Unavailable)
    }
}

#[derive(Debug, Error)]
pub enum DashboardError {
    /// Chat submission rejected by moderation.
    #[error("Message blocked: {0}. Please keep conversations professional and appropriate.")]
    Blocked(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("storage operation failed")]
    Storage(#[from] anyhow::Error),
}

impl DashboardError {
    pub fn status(&self) -> StatusCode {
        match self {
            DashboardError::Blocked(_)
            | DashboardError::InvalidInput(_)
            | DashboardError::Conflict(_) => StatusCode::BAD_REQUEST,
            DashboardError::NotFound(_) => StatusCode::NOT_FOUND,
            DashboardError::Provider(_) | DashboardError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        if let DashboardError::Storage(source) = &self {
            error!(error = ?source, "storage failure");
        }

        let status = self.status();
        (status, Json(ApiResponse::<()>::failure(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
