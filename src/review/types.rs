use serde::{Deserialize, Serialize};

/// A single codebase issue identified by the model.
///
/// Labels are kept as plain strings: the model is asked for the values below
/// but only the shape of the response is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodebaseIssue {
    /// Issue category (e.g., "Architecture", "Security", "Testing")
    pub category: String,
    /// Concise one-line name for the issue
    pub title: String,
    /// Why this issue matters
    pub rationale: String,
    /// Detailed description, ideally with examples from the codebase
    pub detailed_description: String,
    /// One of: Low, Medium, High, Critical
    pub severity: String,
    /// File, directory, type or function where the issue occurs
    pub location: String,
    /// One of: Low, Medium, High, Very High
    pub estimated_effort: String,
    /// 1-3 sentences on how to fix the issue
    pub implementation_plan: String,
}

/// The full model output for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeReviewResponse {
    pub issues: Vec<CodebaseIssue>,
}

/// What the user asked the model for.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Number of issues to surface
    pub issues: u32,
    /// Optional free-form instructions appended to the system prompt
    pub instructions: Option<String>,
}
