//! Evaluation Errors
//!
//! Only structural failures surface here. Per-episode and per-symbol problems
//! (missing fields, short curves, non-finite values) are absorbed where they
//! occur and never become an `EvalError`.

use std::path::PathBuf;

/// Fatal errors for one evaluation run.
#[derive(Debug)]
pub enum EvalError {
    /// The run directory does not exist at all.
    RunDirNotFound(PathBuf),
    /// Reading or writing a file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An artifact exists but is not valid JSON.
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// CSV writer failure.
    Csv(csv::Error),
    /// Configuration is structurally invalid.
    Config(String),
    /// Configuration file could not be parsed.
    ConfigParse(toml::de::Error),
    /// No rows to write to the named file and no fixed column list.
    EmptyTable(PathBuf),
    /// Writer-level form of `EmptyTable`, when no file path is involved.
    NoColumns,
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RunDirNotFound(p) => write!(f, "Run dir not found: {}", p.display()),
            Self::Io { path, source } => write!(f, "I/O error on {}: {}", path.display(), source),
            Self::Json { path, source } => {
                write!(f, "Invalid JSON in {}: {}", path.display(), source)
            }
            Self::Csv(e) => write!(f, "CSV error: {}", e),
            Self::Config(msg) => write!(f, "Invalid config: {}", msg),
            Self::ConfigParse(e) => write!(f, "Config parse error: {}", e),
            Self::EmptyTable(p) => write!(f, "No rows to write for {}", p.display()),
            Self::NoColumns => write!(f, "No rows to write and no header columns given"),
        }
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::Csv(e) => Some(e),
            Self::ConfigParse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for EvalError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e)
    }
}

impl From<toml::de::Error> for EvalError {
    fn from(e: toml::de::Error) -> Self {
        Self::ConfigParse(e)
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
