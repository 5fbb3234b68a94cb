pub mod types;

pub use types::{Codebase, HEURISTIC_METHOD, TIKTOKEN_METHOD};

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("`{program}` not found. Please install it and ensure it is in your PATH.")]
    ToolMissing { program: String },

    #[error("Provided path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("{program} failed ({})", exit_status(.code))]
    Failed { program: String, code: Option<i32> },

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Failed to prepare temporary output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read flattened output: {0}")]
    Read(std::io::Error),
}

fn exit_status(code: &Option<i32>) -> String {
    match *code {
        Some(code) => format!("exit {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Serializes a directory tree into one XML document.
pub trait Flattener {
    /// Name of the underlying tool, for logs.
    fn name(&self) -> &str;

    /// Flatten `repo` and return its XML representation.
    fn dump(&self, repo: &Path) -> Result<Codebase, FlattenError>;
}

/// Flattens repositories by shelling out to the `repomix` CLI.
#[derive(Debug, Clone)]
pub struct Repomix {
    program: String,
    keep: bool,
}

impl Repomix {
    pub fn new(program: impl Into<String>, keep: bool) -> Self {
        Self {
            program: program.into(),
            keep,
        }
    }

    /// Check that the program resolves on PATH (or as a path) before doing any work.
    pub fn ensure_available(&self) -> Result<PathBuf, FlattenError> {
        which::which(&self.program).map_err(|_| FlattenError::ToolMissing {
            program: self.program.clone(),
        })
    }

    fn run_tool(&self, repo: &Path, output: &Path) -> Result<(), FlattenError> {
        debug!(program = %self.program, output = %output.display(), "spawning flattening tool");
        let status = Command::new(&self.program)
            .arg("--quiet")
            .args(["--style", "xml"])
            .arg("--output")
            .arg(output)
            .arg(repo)
            // stdout carries the JSON echo
            .stdout(Stdio::null())
            .status()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => FlattenError::ToolMissing {
                    program: self.program.clone(),
                },
                _ => FlattenError::Spawn {
                    program: self.program.clone(),
                    source: err,
                },
            })?;

        if !status.success() {
            return Err(FlattenError::Failed {
                program: self.program.clone(),
                code: status.code(),
            });
        }
        Ok(())
    }
}

impl Flattener for Repomix {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self), fields(program = %self.program, keep = self.keep))]
    fn dump(&self, repo: &Path) -> Result<Codebase, FlattenError> {
        if !repo.is_dir() {
            return Err(FlattenError::NotADirectory(repo.to_path_buf()));
        }

        let tmp = tempfile::Builder::new()
            .prefix("repomix_")
            .suffix(".xml")
            .tempfile()?
            .into_temp_path();

        let outcome = self
            .run_tool(repo, &tmp)
            .and_then(|()| fs::read_to_string(&tmp).map_err(FlattenError::Read));

        // Dropping the TempPath removes the file.
        if self.keep {
            match tmp.keep() {
                Ok(path) => info!(path = %path.display(), "kept temp XML"),
                Err(err) => warn!(error = %err, "could not keep temp XML"),
            }
        }

        let xml = outcome?;
        debug!(bytes = xml.len(), "read flattened repository");
        Ok(Codebase::new(xml))
    }
}
