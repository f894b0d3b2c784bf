// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

//! # gcpbill Store
//!
//! Settings persistence for the gcpbill tools.
//!
//! This crate provides:
//!
//! - **Settings**: Defaults for accounts, datasets, report format, and model patterns
//! - **SettingsStore**: Loads and saves [`Settings`] as JSON
//! - **Persistence**: File I/O helpers for JSON data
//!
//! ## Usage
//!
//! ```ignore
//! use gcpbill_store::SettingsStore;
//!
//! let store = SettingsStore::load(SettingsStore::resolve_path(None)).await?;
//! store.update(|s| s.default_project = Some("my-project".into())).await;
//! store.save().await?;
//! ```

pub mod error;
pub mod persistence;
pub mod settings_store;

pub use error::StoreError;
pub use persistence::{
    CONFIG_PATH_ENV, default_config_dir, default_settings_path, load_json, save_json,
};
pub use settings_store::{
    DEFAULT_CANDIDATE_DATASETS, DEFAULT_DATASET, DEFAULT_LOCATION, DEFAULT_LOOKBACK_DAYS,
    OutputFormat, Settings, SettingsStore,
};
