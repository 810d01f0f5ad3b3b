//! Evaluation Run Configuration
//!
//! Enumerates the policies of one run, in priority order, with their roles
//! spelled out. The built-in default mirrors the standard EarningsEdge run
//! layout; a TOML file can replace the policy list.
//!
//! ```toml
//! summary_file = "summary_table.csv"
//! symbol_failure_file = "symbol_failure_summary.csv"
//!
//! [[policies]]
//! name = "ppo"
//! role = "treatment"
//!
//! [[policies]]
//! name = "buy_hold"
//! role = "baseline"
//! label = "buyhold"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::eval::error::{EvalError, EvalResult};

pub const DEFAULT_SUMMARY_FILE: &str = "summary_table.csv";
pub const DEFAULT_SYMBOL_FAILURE_FILE: &str = "symbol_failure_summary.csv";

/// Suffix of per-policy curve artifacts.
pub const CURVES_SUFFIX: &str = "_curves.json";

/// What a policy is in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRole {
    /// The policy under evaluation. Exactly one per run.
    Treatment,
    /// Compared against the treatment per symbol.
    Baseline,
    /// Reported in the summary table only.
    Reference,
}

/// One policy of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub name: String,
    pub role: PolicyRole,
    /// Artifact file name relative to the run dir. Defaults to
    /// `<name>_curves.json`.
    #[serde(default)]
    pub artifact: Option<String>,
    /// Column suffix for baseline comparisons. Defaults to `name`.
    #[serde(default)]
    pub label: Option<String>,
}

impl PolicySpec {
    pub fn new(name: &str, role: PolicyRole) -> Self {
        Self {
            name: name.to_string(),
            role,
            artifact: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_artifact(mut self, artifact: &str) -> Self {
        self.artifact = Some(artifact.to_string());
        self
    }

    pub fn artifact_name(&self) -> String {
        self.artifact
            .clone()
            .unwrap_or_else(|| format!("{}{}", self.name, CURVES_SUFFIX))
    }

    pub fn artifact_path(&self, run_dir: &Path) -> PathBuf {
        run_dir.join(self.artifact_name())
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

fn default_summary_file() -> String {
    DEFAULT_SUMMARY_FILE.to_string()
}

fn default_symbol_failure_file() -> String {
    DEFAULT_SYMBOL_FAILURE_FILE.to_string()
}

/// Configuration for one evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Policies in priority order.
    pub policies: Vec<PolicySpec>,

    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    #[serde(default = "default_symbol_failure_file")]
    pub symbol_failure_file: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            policies: vec![
                PolicySpec::new("ppo", PolicyRole::Treatment),
                PolicySpec::new("buy_hold", PolicyRole::Baseline).with_label("buyhold"),
                PolicySpec::new("avoid_earnings", PolicyRole::Baseline).with_label("avoid"),
                PolicySpec::new("flat", PolicyRole::Reference),
            ],
            summary_file: default_summary_file(),
            symbol_failure_file: default_symbol_failure_file(),
        }
    }
}

impl EvalConfig {
    /// Load and validate a TOML config file.
    pub fn from_toml_file(path: &Path) -> EvalResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> EvalResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EvalResult<()> {
        let treatments = self
            .policies
            .iter()
            .filter(|p| p.role == PolicyRole::Treatment)
            .count();
        if treatments != 1 {
            return Err(EvalError::Config(format!(
                "expected exactly one treatment policy, found {}",
                treatments
            )));
        }

        let mut names = HashSet::new();
        for p in &self.policies {
            if p.name.trim().is_empty() {
                return Err(EvalError::Config("policy name must not be empty".into()));
            }
            if !names.insert(p.name.as_str()) {
                return Err(EvalError::Config(format!("duplicate policy: {}", p.name)));
            }
        }

        let mut labels = HashSet::new();
        for p in self.baselines() {
            if !labels.insert(p.label()) {
                return Err(EvalError::Config(format!(
                    "duplicate baseline label: {}",
                    p.label()
                )));
            }
        }

        Ok(())
    }

    pub fn treatment(&self) -> Option<&PolicySpec> {
        self.policies
            .iter()
            .find(|p| p.role == PolicyRole::Treatment)
    }

    /// Baselines compared per symbol, in priority order.
    pub fn baselines(&self) -> impl Iterator<Item = &PolicySpec> {
        self.policies
            .iter()
            .filter(|p| p.role == PolicyRole::Baseline)
    }
}
