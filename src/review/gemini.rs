use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::prompt::build_system_prompt;
use super::types::{CodeReviewResponse, ReviewRequest};
use super::{ReviewError, ReviewModel};
use crate::config::ModelConfig;

/// Structured-output review agent backed by the Gemini `generateContent` API.
#[derive(Clone)]
pub struct GeminiReviewer {
    model: String,
    base_url: String,
    api_key: String,
    client: Client,
}

impl std::fmt::Debug for GeminiReviewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiReviewer")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GeminiReviewer {
    /// Build a reviewer from config. Fails fast when no API key can be found.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ReviewError> {
        let api_key = config.api_key().ok_or_else(|| ReviewError::MissingApiKey {
            var: config.api_key_env.clone(),
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent("repo-review")
            .build()?;

        Ok(Self {
            model: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl ReviewModel for GeminiReviewer {
    fn model_name(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, issues = request.issues))]
    async fn review(
        &self,
        codebase_xml: &str,
        request: &ReviewRequest,
    ) -> Result<CodeReviewResponse, ReviewError> {
        let system_prompt = build_system_prompt(request.issues, request.instructions.as_deref());
        let body = build_request(&system_prompt, codebase_xml);

        debug!(url = %self.endpoint(), prompt_bytes = system_prompt.len(), "calling Gemini");
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await
            .map_err(redact)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(redact)?;
        if let Some(usage) = &payload.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini usage"
            );
        }
        parse_response(payload)
    }
}

/// The request URL carries the API key; keep it out of error messages.
fn redact(err: reqwest::Error) -> ReviewError {
    ReviewError::Http(err.without_url())
}

/// JSON schema the model output must conform to, in Gemini's OpenAPI subset.
pub fn response_schema() -> Value {
    let fields = [
        ("category", "Issue category (e.g., \"Architecture\", \"Docs\", \"Security\", \"Efficiency\", \"Readability\", \"Testing\", \"DevX\")."),
        ("title", "Concise one-line name for the issue (~8 words)."),
        ("rationale", "Short explanation of why this issue matters."),
        ("detailed_description", "Detailed description, including specific examples from the codebase if possible."),
        ("severity", "One of: 'Low', 'Medium', 'High', 'Critical'."),
        ("location", "Where the issue occurs (file, directory, class, function, etc.)."),
        ("estimated_effort", "One of: 'Low' (minutes), 'Medium' (hours), 'High' (days), 'Very High' (weeks+)."),
        ("implementation_plan", "1-3 sentences describing how to approach fixing the issue."),
    ];

    let properties: serde_json::Map<String, Value> = fields
        .iter()
        .map(|(name, description)| {
            (
                name.to_string(),
                json!({ "type": "STRING", "description": description }),
            )
        })
        .collect();
    let names: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "issues": {
                "type": "ARRAY",
                "description": "List of identified issues.",
                "items": {
                    "type": "OBJECT",
                    "properties": properties,
                    "required": names,
                    "propertyOrdering": names,
                }
            }
        },
        "required": ["issues"],
    })
}

fn build_request(system_prompt: &str, codebase_xml: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: system_prompt.to_string(),
            }],
        },
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: codebase_xml.to_string(),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}

/// Extract the candidate text and validate it against CodeReviewResponse.
fn parse_response(payload: GenerateContentResponse) -> Result<CodeReviewResponse, ReviewError> {
    let Some(candidate) = payload.candidates.into_iter().next() else {
        let reason = payload
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .map(|reason| format!("prompt blocked: {reason}"))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ReviewError::EmptyResponse(reason));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .map(|reason| format!("finish reason {reason}"))
            .unwrap_or_else(|| "candidate had no text".to_string());
        return Err(ReviewError::EmptyResponse(reason));
    }

    Ok(serde_json::from_str(&text)?)
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
