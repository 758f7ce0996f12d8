//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binary. Defaults are provided for convenience during development.
use std::env;
use dotenv;

pub struct Config {
    /// Directory of tag-group JSON presets.
    pub prompts_dir: String,
    /// Directory of autocomplete CSV vocabularies.
    pub autocomplete_dir: String,
    /// Cache directory for CSVs downloaded from a URL source.
    pub csv_cache_dir: String,
    /// Path of the JSON settings file.
    pub settings_file: String,
    /// Base models directory (contains `loras/`, `embeddings/`, ...).
    pub models_dir: String,
    /// Optional extra model paths YAML override file.
    pub extra_model_paths: String,
    pub api_host: String,
    pub api_port: String,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }
    pub fn new() -> Result<Self, env::VarError> {
        Ok(Config {
            prompts_dir: env::var("PROMPTS_DIR").unwrap_or_else(|_| "./__prompts__".to_string()),
            autocomplete_dir: env::var("AUTOCOMPLETE_DIR").unwrap_or_else(|_| "./__autocomplete__".to_string()),
            csv_cache_dir: env::var("CSV_CACHE_DIR").unwrap_or_else(|_| "./__autocomplete__/cache".to_string()),
            settings_file: env::var("SETTINGS_FILE").unwrap_or_else(|_| "./settings.json".to_string()),
            models_dir: env::var("MODELS_DIR").unwrap_or_else(|_| "./models".to_string()),
            extra_model_paths: env::var("EXTRA_MODEL_PATHS").unwrap_or_else(|_| "./extra_model_paths.yaml".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            api_port: env::var("API_PORT").unwrap_or_else(|_| "8189".to_string()),
        })
    }
    pub fn print_env_vars() {
        println!("PROMPTS_DIR: {}", env::var("PROMPTS_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("AUTOCOMPLETE_DIR: {}", env::var("AUTOCOMPLETE_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("CSV_CACHE_DIR: {}", env::var("CSV_CACHE_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("SETTINGS_FILE: {}", env::var("SETTINGS_FILE").unwrap_or_else(|_| "<unset>".to_string()));
        println!("MODELS_DIR: {}", env::var("MODELS_DIR").unwrap_or_else(|_| "<unset>".to_string()));
        println!("EXTRA_MODEL_PATHS: {}", env::var("EXTRA_MODEL_PATHS").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_HOST: {}", env::var("API_HOST").unwrap_or_else(|_| "<unset>".to_string()));
        println!("API_PORT: {}", env::var("API_PORT").unwrap_or_else(|_| "<unset>".to_string()));
    }
}
