pub mod gemini;
pub mod prompt;
pub mod types;
#[cfg(test)]
pub mod test_server;

pub use gemini::GeminiReviewer;
pub use types::{CodeReviewResponse, CodebaseIssue, ReviewRequest};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("{var} environment variable is not set and no api_key is configured")]
    MissingApiKey { var: String },

    #[error("Model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Model returned no usable output: {0}")]
    EmptyResponse(String),

    #[error("Model output does not match the review schema: {0}")]
    Schema(#[from] serde_json::Error),
}

/// A hosted model that turns a flattened codebase into a structured review.
#[async_trait]
pub trait ReviewModel: Send + Sync {
    /// Model identifier, recorded in the run metadata.
    fn model_name(&self) -> &str;

    /// Review `codebase_xml` and return issues matching the response schema.
    /// Output that does not deserialize is an error, never a partial result.
    async fn review(
        &self,
        codebase_xml: &str,
        request: &ReviewRequest,
    ) -> Result<CodeReviewResponse, ReviewError>;
}
