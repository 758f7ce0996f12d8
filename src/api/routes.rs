//! Router setup and shared application state.
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::handlers;
use crate::config::Config;
use crate::files::paths::ModelPaths;
use crate::settings::SettingsStore;
use crate::tags::TagStore;

pub struct AppState {
    pub settings: SettingsStore,
    pub tags: TagStore,
    pub model_paths: ModelPaths,
    pub prompts_dir: PathBuf,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        AppState {
            settings: SettingsStore::new(&config.settings_file),
            tags: TagStore::new(&config.autocomplete_dir, &config.csv_cache_dir),
            model_paths: ModelPaths::new(&config.models_dir, &config.extra_model_paths),
            prompts_dir: PathBuf::from(&config.prompts_dir),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/erenodes/settings", get(handlers::get_settings))
        .route("/erenodes/set_setting", post(handlers::set_setting))
        .route("/erenodes/list_csv_files", get(handlers::list_csv_files))
        .route("/erenodes/search_tags", get(handlers::search_tags))
        .route("/erenodes/list_tag_groups", get(handlers::list_tag_groups))
        .route("/erenodes/get_tag_group", get(handlers::get_tag_group))
        .route("/erenodes/save_tag_group", post(handlers::save_tag_group))
        .route("/erenodes/create_folder", post(handlers::create_folder))
        .route("/erenodes/search_files", get(handlers::search_files))
        .route("/erenodes/view/:kind/*path", get(handlers::view_file))
        .route("/erenodes/save_file_image", post(handlers::save_file_image))
        .route("/erenodes/nodes", get(handlers::list_nodes))
        .route("/erenodes/node/:id", post(handlers::process_node))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
