//! EreNodes API library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `nodes`: Leaf prompt-processing functions (concatenation, tag filter,
//!   LoRA-stack extraction) and the node registry exposing them.
//! - `tags`: CSV tag vocabularies, the memoized tag cache, and search.
//! - `files`: Sandboxed file listing/search and preview-image lookup.
//! - `settings`: Whole-file JSON settings store.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `TagStore`,
//! `SettingsStore`, and `AppState`.
pub mod api;
pub mod nodes;
pub mod tags;
pub mod files;
pub mod settings;
pub mod config;
pub mod error;

pub use api::routes::AppState;
pub use config::Config;
pub use settings::SettingsStore;
pub use tags::TagStore;
