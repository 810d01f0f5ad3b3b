//! Run Artifact Loading
//!
//! Reads the per-policy curve documents of one run directory. A missing
//! artifact is normal (not every run produces every baseline) and simply
//! leaves that policy out; a present but unparsable artifact is fatal.
//!
//! Curve writers emit the non-standard `NaN`, `Infinity` and `-Infinity`
//! tokens, and sometimes numbers beyond `f64` range. These are rewritten to
//! `null` before parsing so they reach the record layer as absent values.

use serde_json::Value;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::eval::config::{EvalConfig, PolicyRole, PolicySpec};
use crate::eval::error::{EvalError, EvalResult};
use crate::eval::normalize::{self, CollectionShape};

/// One policy's loaded curve document.
#[derive(Debug, Clone)]
pub struct PolicyArtifact {
    pub name: String,
    pub role: PolicyRole,
    pub label: String,
    pub path: PathBuf,
    document: Value,
}

impl PolicyArtifact {
    pub fn from_value(spec: &PolicySpec, path: PathBuf, document: Value) -> Self {
        Self {
            name: spec.name.clone(),
            role: spec.role,
            label: spec.label().to_string(),
            path,
            document,
        }
    }

    pub fn shape(&self) -> CollectionShape {
        CollectionShape::detect(&self.document)
    }

    /// Raw episode records, in document order.
    pub fn episodes(&self) -> &[Value] {
        normalize::episodes(&self.document)
    }
}

/// Parse one JSON artifact. `Ok(None)` when the file does not exist.
pub fn load_json(path: &Path) -> EvalResult<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
    let text = null_non_finite_tokens(&text);
    let value = serde_json::from_str(&text).map_err(|source| EvalError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(value))
}

/// Replace bare non-finite tokens and out-of-range numbers with `null`.
///
/// String literals are left untouched. Anything else malformed is passed
/// through for the parser to reject.
pub fn null_non_finite_tokens(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let mut out = String::new();
    let mut copied = 0;
    let mut in_string = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 2,
                b'"' => {
                    in_string = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        let rest = &text[i..];
        let token_len = match b {
            b'"' => {
                in_string = true;
                i += 1;
                continue;
            }
            b'N' if rest.starts_with("NaN") => 3,
            b'I' if rest.starts_with("Infinity") => 8,
            b'-' if rest.starts_with("-Infinity") => 9,
            b'-' | b'0'..=b'9' => {
                let len = rest
                    .bytes()
                    .take_while(|c| matches!(c, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E'))
                    .count();
                let overflows = rest[..len]
                    .parse::<f64>()
                    .map(f64::is_infinite)
                    .unwrap_or(false);
                if !overflows {
                    i += len;
                    continue;
                }
                len
            }
            _ => {
                i += 1;
                continue;
            }
        };

        out.push_str(&text[copied..i]);
        out.push_str("null");
        i += token_len;
        copied = i;
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

/// All artifacts of a run, in configured priority order.
#[derive(Debug, Clone, Default)]
pub struct RunArtifacts {
    policies: Vec<PolicyArtifact>,
}

impl RunArtifacts {
    /// Load every configured policy present under `run_dir`.
    pub fn load(run_dir: &Path, config: &EvalConfig) -> EvalResult<Self> {
        let mut policies = Vec::with_capacity(config.policies.len());
        for spec in &config.policies {
            let path = spec.artifact_path(run_dir);
            match load_json(&path)? {
                Some(doc) => {
                    let artifact = PolicyArtifact::from_value(spec, path, doc);
                    debug!(
                        policy = %artifact.name,
                        path = %artifact.path.display(),
                        shape = ?artifact.shape(),
                        episodes = artifact.episodes().len(),
                        "Loaded policy artifact"
                    );
                    policies.push(artifact);
                }
                None => info!(policy = %spec.name, path = %path.display(), "[skip] missing artifact"),
            }
        }
        Ok(Self { policies })
    }

    pub fn from_artifacts(policies: Vec<PolicyArtifact>) -> Self {
        Self { policies }
    }

    pub fn policies(&self) -> &[PolicyArtifact] {
        &self.policies
    }

    pub fn get(&self, name: &str) -> Option<&PolicyArtifact> {
        self.policies.iter().find(|p| p.name == name)
    }

    pub fn treatment(&self) -> Option<&PolicyArtifact> {
        self.policies
            .iter()
            .find(|p| p.role == PolicyRole::Treatment)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
