use std::fmt;

use thiserror::Error;

/// Pipeline stage an operation failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    EnsureDirectories,
    GenerateFormat,
    RunTool,
    ReadResults,
    Cleanup,
    MatchColumns,
    CreateImportFile,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Step::EnsureDirectories => "ensure directories",
            Step::GenerateFormat => "generate format file",
            Step::RunTool => "run bcp",
            Step::ReadResults => "read results",
            Step::Cleanup => "cleanup",
            Step::MatchColumns => "match import columns",
            Step::CreateImportFile => "create import file",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("bcp did not finish within {ms} ms{}", output_suffix(.stdout, .stderr))]
    Timeout { ms: u64, stdout: String, stderr: String },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("bcp exited with {status}: {}", tool_message(.stdout, .stderr))]
    ToolFailed { status: String, stdout: String, stderr: String },

    #[error("Column '{column}' not found in {table}")]
    ColumnNotFound { column: String, table: String },

    #[error("Cannot decode '{value}' as {type_tag} for field '{field}'")]
    Decode { field: String, type_tag: String, value: String },

    #[error("{step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The stage that failed, when the error came out of an operation pipeline.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The underlying error, skipping the step wrapper.
    pub fn root(&self) -> &Error {
        match self {
            Error::Step { source, .. } => source.root(),
            other => other,
        }
    }
}

fn tool_message(stdout: &str, stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() { stdout.trim().to_string() } else { stderr.to_string() }
}

fn output_suffix(stdout: &str, stderr: &str) -> String {
    let message = tool_message(stdout, stderr);
    if message.is_empty() { message } else { format!(": {message}") }
}

/// Convenience Result type using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Tag a step result with the stage it belongs to.
pub(crate) trait StepExt<T> {
    fn step(self, step: Step) -> Result<T>;
}

impl<T> StepExt<T> for Result<T> {
    fn step(self, step: Step) -> Result<T> {
        self.map_err(|source| Error::Step { step, source: Box::new(source) })
    }
}
