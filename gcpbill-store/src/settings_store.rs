//! User settings store.
//!
//! Holds defaults for the gcpbill tools and persists them as JSON.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use gcpbill_core::{GroupBy, ModelPattern, is_valid_dataset_id};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{CONFIG_PATH_ENV, default_settings_path, load_json, save_json};

/// Dataset created by setup and searched first.
pub const DEFAULT_DATASET: &str = "billing_export";

/// Dataset location used by setup.
pub const DEFAULT_LOCATION: &str = "US";

/// Days covered when no start date is given.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Datasets searched before falling back to a full scan.
pub const DEFAULT_CANDIDATE_DATASETS: &[&str] = &["billing_export", "billing_data", "billing"];

// ============================================================================
// Settings Types
// ============================================================================

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Grid table.
    #[default]
    Table,
    /// RFC 4180 CSV.
    Csv,
    /// Pretty JSON array.
    Json,
}

impl OutputFormat {
    /// All formats.
    pub fn all() -> &'static [OutputFormat] {
        &[OutputFormat::Table, OutputFormat::Csv, OutputFormat::Json]
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{other}' (expected table, csv, or json)")),
        }
    }
}

/// User settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Billing account used when `--billing-account` is omitted.
    pub default_billing_account: Option<String>,

    /// Project used when `--project` is omitted and credentials name none.
    pub default_project: Option<String>,

    /// Dataset holding the export; searched first.
    pub dataset: String,

    /// Dataset location for setup.
    pub location: String,

    /// Additional datasets searched before the full scan.
    pub candidate_datasets: Vec<String>,

    /// Days covered by default date ranges.
    pub lookback_days: u32,

    /// Default report format.
    pub default_format: OutputFormat,

    /// Default grouping dimension.
    pub default_group_by: GroupBy,

    /// Model patterns checked before the built-in list.
    pub model_patterns: Vec<ModelPattern>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_billing_account: None,
            default_project: None,
            dataset: DEFAULT_DATASET.to_string(),
            location: DEFAULT_LOCATION.to_string(),
            candidate_datasets: DEFAULT_CANDIDATE_DATASETS
                .iter()
                .map(ToString::to_string)
                .collect(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            default_format: OutputFormat::default(),
            default_group_by: GroupBy::default(),
            model_patterns: Vec::new(),
        }
    }
}

impl Settings {
    /// Datasets to search first: the configured dataset, then the candidates.
    pub fn search_datasets(&self) -> Vec<String> {
        let mut datasets = vec![self.dataset.clone()];
        for candidate in &self.candidate_datasets {
            if !datasets.contains(candidate) {
                datasets.push(candidate.clone());
            }
        }
        datasets.retain(|d| !d.is_empty());
        datasets
    }

    /// Checks values that would otherwise fail later in a query.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.lookback_days == 0 {
            return Err(StoreError::Config("lookback_days must be at least 1".into()));
        }
        if let Some(bad) = std::iter::once(&self.dataset)
            .chain(&self.candidate_datasets)
            .find(|d| !is_valid_dataset_id(d))
        {
            return Err(StoreError::Config(format!("invalid dataset id '{bad}'")));
        }
        if let Some(bad) = self
            .model_patterns
            .iter()
            .find(|p| p.pattern.trim().is_empty() || p.label.trim().is_empty())
        {
            return Err(StoreError::Config(format!(
                "model pattern needs both pattern and label: {bad:?}"
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings loaded from and saved to a JSON file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings: Arc<RwLock<Settings>>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store with default settings.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: Arc::new(RwLock::new(Settings::default())),
            path,
        }
    }

    /// Picks the settings path: explicit, then `GCPBILL_CONFIG`, then the default.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| {
                std::env::var_os(CONFIG_PATH_ENV)
                    .filter(|v| !v.is_empty())
                    .map(PathBuf::from)
            })
            .unwrap_or_else(default_settings_path)
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. A file that exists but cannot be
    /// parsed or fails validation is an error.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            let settings: Settings = load_json(&path).await?;
            settings.validate()?;
            settings
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            path,
        })
    }

    /// Path of the settings file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }

    // ========================================================================
    // Convenience Methods
    // ========================================================================

    /// Records where the billing export lives so later searches start there.
    pub async fn remember_export(&self, project_id: &str, dataset_id: &str) {
        self.update(|s| {
            s.default_project = Some(project_id.to_string());
            s.dataset = dataset_id.to_string();
        })
        .await;
    }

    /// Records the default billing account.
    pub async fn set_default_billing_account(&self, account: &str) {
        self.update(|s| s.default_billing_account = Some(account.to_string()))
            .await;
    }
}
