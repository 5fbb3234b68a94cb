use chrono::Local;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{Config, ConfigError};
use crate::flatten::{FlattenError, Flattener, Repomix};
use crate::report::{self, ReportError, RunMetadata};
use crate::review::{CodeReviewResponse, GeminiReviewer, ReviewError, ReviewModel, ReviewRequest};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    ToolMissing(FlattenError),

    #[error(transparent)]
    Flatten(FlattenError),

    #[error("Model integration not available: {0}")]
    ModelUnavailable(ReviewError),

    #[error("Model invocation failed: {0}")]
    Model(ReviewError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl From<FlattenError> for AppError {
    fn from(err: FlattenError) -> Self {
        match err {
            FlattenError::ToolMissing { .. } => AppError::ToolMissing(err),
            other => AppError::Flatten(other),
        }
    }
}

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Flatten(_) => 1,
            AppError::ToolMissing(_) => 2,
            AppError::ModelUnavailable(_) => 3,
            AppError::Model(_) => 4,
            AppError::Report(_) => 5,
        }
    }
}

/// Fully resolved options for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: PathBuf,
    pub issues: u32,
    pub instructions: Option<String>,
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub response: CodeReviewResponse,
    pub metadata: RunMetadata,
    pub output_path: PathBuf,
}

/// Check the external collaborators before any work is done: the flattening
/// tool must be on PATH and the model must have credentials.
pub fn preflight(config: &Config, keep: bool) -> Result<(Repomix, GeminiReviewer), AppError> {
    let repomix = Repomix::new(config.flatten.program.clone(), keep);
    let resolved = repomix.ensure_available()?;
    debug!(program = %resolved.display(), "flattening tool found");

    let reviewer = GeminiReviewer::from_config(&config.model).map_err(AppError::ModelUnavailable)?;
    Ok((repomix, reviewer))
}

/// Flatten the repository, ask the model for a review and write the workbook.
pub async fn execute(
    options: &RunOptions,
    config: &Config,
    flattener: &dyn Flattener,
    reviewer: &dyn ReviewModel,
) -> Result<RunOutcome, AppError> {
    info!(repo = %options.repo_path.display(), tool = flattener.name(), "flattening repository");
    let codebase = flattener.dump(&options.repo_path)?;
    info!(
        tokens = codebase.token_count,
        method = codebase.token_count_method,
        "repository token count"
    );

    info!(issues = options.issues, model = reviewer.model_name(), "requesting issues from model");
    let request = ReviewRequest {
        issues: options.issues,
        instructions: options.instructions.clone(),
    };
    let response = reviewer
        .review(&codebase.xml, &request)
        .await
        .map_err(AppError::Model)?;
    if response.issues.len() != options.issues as usize {
        warn!(
            requested = options.issues,
            returned = response.issues.len(),
            "model returned a different number of issues"
        );
    }

    let now = Local::now();
    let output_file = report::output_file_name(&config.output.file_prefix, &now);
    let output_path = config.output.dir().join(&output_file);
    let metadata = RunMetadata {
        generated_at: now,
        repo_path: options.repo_path.clone(),
        output_file,
        token_count: codebase.token_count,
        token_count_method: codebase.token_count_method.to_string(),
        issues_requested: options.issues,
        issues_returned: response.issues.len(),
        user_instructions: options.instructions.clone(),
        model: reviewer.model_name().to_string(),
    };

    report::write_workbook(&output_path, &response, &metadata)?;
    info!(path = %output_path.display(), "wrote Excel report");

    Ok(RunOutcome {
        response,
        metadata,
        output_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::Codebase;
    use crate::review::test_server::StubServer;
    use crate::review::CodebaseIssue;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct StubFlattener {
        xml: Option<&'static str>,
    }

    impl Flattener for StubFlattener {
        fn name(&self) -> &str {
            "stub"
        }

        fn dump(&self, _repo: &Path) -> Result<Codebase, FlattenError> {
            match self.xml {
                Some(xml) => Ok(Codebase::new(xml.to_string())),
                None => Err(FlattenError::Failed {
                    program: "stub".to_string(),
                    code: Some(3),
                }),
            }
        }
    }

    /// Returns a canned response and records the request it saw.
    struct MockReviewer {
        issues: usize,
        fail: bool,
        seen: Mutex<Option<(String, ReviewRequest)>>,
    }

    impl MockReviewer {
        fn new(issues: usize) -> Self {
            Self {
                issues,
                fail: false,
                seen: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(0)
            }
        }
    }

    #[async_trait]
    impl ReviewModel for MockReviewer {
        fn model_name(&self) -> &str {
            "mock-model"
        }

        async fn review(
            &self,
            codebase_xml: &str,
            request: &ReviewRequest,
        ) -> Result<CodeReviewResponse, ReviewError> {
            *self.seen.lock().unwrap() = Some((codebase_xml.to_string(), request.clone()));
            if self.fail {
                return Err(ReviewError::Api {
                    status: 500,
                    body: "internal".to_string(),
                });
            }
            let issues = (0..self.issues)
                .map(|i| CodebaseIssue {
                    category: "Architecture".to_string(),
                    title: format!("Issue {i}"),
                    rationale: "r".to_string(),
                    detailed_description: "d".to_string(),
                    severity: "Medium".to_string(),
                    location: "src/".to_string(),
                    estimated_effort: "High".to_string(),
                    implementation_plan: "p".to_string(),
                })
                .collect();
            Ok(CodeReviewResponse { issues })
        }
    }

    fn options(issues: u32) -> RunOptions {
        RunOptions {
            repo_path: PathBuf::from("/repo"),
            issues,
            instructions: Some("Look at error handling".to_string()),
        }
    }

    fn config_for(dir: &Path) -> Config {
        let mut config = Config::default();
        config.output.dir = Some(dir.to_path_buf());
        config
    }

    fn xlsx_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "xlsx"))
            .count()
    }

    #[tokio::test]
    async fn test_execute_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let flattener = StubFlattener {
            xml: Some("<repository>fn main() {}</repository>"),
        };
        let reviewer = MockReviewer::new(3);

        let outcome = execute(&options(3), &config, &flattener, &reviewer)
            .await
            .unwrap();

        assert_eq!(outcome.response.issues.len(), 3);
        assert!(outcome.output_path.exists());
        assert!(outcome.output_path.starts_with(dir.path()));
        assert_eq!(outcome.metadata.model, "mock-model");
        assert_eq!(outcome.metadata.issues_requested, 3);
        assert_eq!(outcome.metadata.issues_returned, 3);
        let expected = Codebase::new("<repository>fn main() {}</repository>".to_string());
        assert_eq!(outcome.metadata.token_count, expected.token_count);
        assert_eq!(outcome.metadata.token_count_method, expected.token_count_method);
        assert_eq!(xlsx_files(dir.path()), 1);

        let (xml, request) = reviewer.seen.lock().unwrap().clone().unwrap();
        assert_eq!(xml, "<repository>fn main() {}</repository>");
        assert_eq!(request.issues, 3);
        assert_eq!(request.instructions.as_deref(), Some("Look at error handling"));
    }

    #[tokio::test]
    async fn test_execute_flatten_failure_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let reviewer = MockReviewer::new(1);

        let err = execute(&options(1), &config, &StubFlattener { xml: None }, &reviewer)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(reviewer.seen.lock().unwrap().is_none());
        assert_eq!(xlsx_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_execute_model_failure_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path());
        let flattener = StubFlattener { xml: Some("<r/>") };

        let err = execute(&options(2), &config, &flattener, &MockReviewer::failing())
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().starts_with("Model invocation failed"));
        assert_eq!(xlsx_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_execute_gemini_server_error_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let server = StubServer::respond(500, r#"{"error":"overloaded"}"#).await;
        let mut config = config_for(dir.path());
        config.model.api_key = Some("app-test-key".to_string());
        config.model.base_url = server.base_url.clone();
        config.model.timeout_secs = 5;
        let reviewer = GeminiReviewer::from_config(&config.model).unwrap();
        let flattener = StubFlattener { xml: Some("<r/>") };

        let err = execute(&options(2), &config, &flattener, &reviewer)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Model(ReviewError::Api { status: 500, .. })
        ));
        assert_eq!(err.exit_code(), 4);
        assert!(!err.to_string().contains("app-test-key"));
        assert_eq!(xlsx_files(dir.path()), 0);
        server.request().await;
    }

    #[tokio::test]
    async fn test_execute_report_failure_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the output directory should be
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let config = config_for(&blocker);
        let flattener = StubFlattener { xml: Some("<r/>") };

        let err = execute(&options(1), &config, &flattener, &MockReviewer::new(1))
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_preflight_missing_tool_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_for(dir.path());
        config.flatten.program = "repo-review-no-such-flattener".to_string();

        let err = preflight(&config, false).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(xlsx_files(dir.path()), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_preflight_missing_api_key_exit_code() {
        let mut config = Config::default();
        config.flatten.program = "sh".to_string();
        config.model.api_key = None;
        config.model.api_key_env = "REPO_REVIEW_TEST_KEY_UNSET_5".to_string();

        let err = preflight(&config, false).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_flatten_error_mapping() {
        let missing = AppError::from(FlattenError::ToolMissing {
            program: "repomix".to_string(),
        });
        assert_eq!(missing.exit_code(), 2);

        let failed = AppError::from(FlattenError::Failed {
            program: "repomix".to_string(),
            code: Some(1),
        });
        assert_eq!(failed.exit_code(), 1);
    }
}
