//! Whole-file JSON settings store.
//!
//! The document is read fully and rewritten fully on every mutation; there is
//! no file locking, concurrent writers race and the last one wins. A missing
//! or malformed file reads as an empty document, never an error.
use std::path::PathBuf;

use serde_json::{json, Value};

use crate::error::AppResult;

/// Settings key holding the active autocomplete CSV name.
pub const ACTIVE_CSV_KEY: &str = "autocomplete.csv";

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// Read the full settings document, defaulting to `{}`.
    pub async fn load(&self) -> Value {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(value @ Value::Object(_)) => value,
                Ok(_) | Err(_) => {
                    tracing::warn!(
                        "Settings file {} is not a JSON object, using defaults",
                        self.path.display()
                    );
                    json!({})
                }
            },
            Err(_) => json!({}),
        }
    }

    /// Overwrite the settings file with `document`, pretty-printed.
    pub async fn save(&self, document: &Value) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }

    /// Set one top-level key and persist, returning the updated document.
    pub async fn set(&self, key: &str, value: Value) -> AppResult<Value> {
        let mut document = self.load().await;
        if let Some(map) = document.as_object_mut() {
            map.insert(key.to_string(), value);
        }
        self.save(&document).await?;
        Ok(document)
    }

    /// The active CSV name, when configured.
    pub async fn active_csv(&self) -> Option<String> {
        self.load()
            .await
            .get(ACTIVE_CSV_KEY)
            .and_then(Value::as_str)
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load().await, json!({}));
    }

    #[tokio::test]
    async fn corrupt_file_reads_as_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let store = SettingsStore::new(&path);
        assert_eq!(store.load().await, json!({}));
    }

    #[tokio::test]
    async fn set_persists_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        store.set(ACTIVE_CSV_KEY, json!("danbooru.csv")).await.unwrap();
        store.set("theme", json!("dark")).await.unwrap();

        let doc = store.load().await;
        assert_eq!(doc[ACTIVE_CSV_KEY], json!("danbooru.csv"));
        assert_eq!(doc["theme"], json!("dark"));
        assert_eq!(store.active_csv().await.as_deref(), Some("danbooru.csv"));

        store.set(ACTIVE_CSV_KEY, json!("e621.csv")).await.unwrap();
        assert_eq!(store.active_csv().await.as_deref(), Some("e621.csv"));
    }
}
