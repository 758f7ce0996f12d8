//! CSV tag vocabularies: parsing, in-memory memoization, and autocomplete
//! search.
//!
//! Vocabulary files are the common autocomplete CSV layout: column 0 is the
//! tag name, column 2 a usage count, column 3 an optional comma-separated
//! alias list. Rows that do not fit (missing columns, non-numeric count,
//! header lines) are skipped.
pub mod remote;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::nodes::filter::normalize;

/// One parsed vocabulary row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TagRecord {
    pub name: String,
    pub count: i64,
    pub aliases: Vec<String>,
}

/// Parse a vocabulary CSV into records, preserving row order.
pub fn load_tags_from_csv(path: &Path) -> AppResult<Vec<TagRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut tags = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() < 3 {
            continue;
        }
        let name = normalize(row[0].trim());
        if name.is_empty() {
            continue;
        }
        let count: i64 = match row[2].trim().parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        let aliases = row
            .get(3)
            .map(|raw| {
                raw.split(',')
                    .map(|a| normalize(a.trim()))
                    .filter(|a| !a.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        tags.push(TagRecord { name, count, aliases });
    }
    Ok(tags)
}

/// Lookup structures derived from tag records for one filter invocation:
/// the canonical tag set and the alias-to-canonical map.
pub struct TagVocabulary {
    canonical: std::collections::HashSet<String>,
    aliases: HashMap<String, String>,
}

impl TagVocabulary {
    pub fn from_records(records: &[TagRecord]) -> Self {
        let mut canonical = std::collections::HashSet::new();
        let mut aliases = HashMap::new();
        for record in records {
            canonical.insert(record.name.clone());
            for alias in &record.aliases {
                aliases.insert(alias.clone(), record.name.clone());
            }
        }
        TagVocabulary { canonical, aliases }
    }

    /// The canonical form of `tag`, if `tag` is itself a canonical name.
    pub fn canonical<'a>(&'a self, tag: &str) -> Option<&'a str> {
        self.canonical.get(tag).map(String::as_str)
    }

    /// The canonical target of `alias`, if known.
    pub fn alias_target<'a>(&'a self, alias: &str) -> Option<&'a str> {
        self.aliases.get(alias).map(String::as_str)
    }
}

/// Tag vocabulary store: resolves CSV names (local filenames or URLs) to
/// parsed records, memoized per name behind a lock for the life of the
/// process.
pub struct TagStore {
    autocomplete_dir: PathBuf,
    cache_dir: PathBuf,
    client: reqwest::Client,
    cache: RwLock<HashMap<String, Arc<Vec<TagRecord>>>>,
}

impl TagStore {
    pub fn new(autocomplete_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        TagStore {
            autocomplete_dir: autocomplete_dir.into(),
            cache_dir: cache_dir.into(),
            client: reqwest::Client::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Records for `csv_name`, read from the memo cache when present.
    pub async fn records(&self, csv_name: &str) -> AppResult<Arc<Vec<TagRecord>>> {
        if let Some(hit) = self.cache.read().await.get(csv_name) {
            return Ok(hit.clone());
        }
        let path = self.resolve_csv(csv_name).await?;
        let records = Arc::new(load_tags_from_csv(&path)?);
        self.cache
            .write()
            .await
            .insert(csv_name.to_string(), records.clone());
        Ok(records)
    }

    /// Drop and re-read the cached records for `csv_name`.
    pub async fn refresh(&self, csv_name: &str) -> AppResult<()> {
        self.cache.write().await.remove(csv_name);
        self.records(csv_name).await.map(|_| ())
    }

    /// Vocabulary lookup structures for `csv_name`.
    pub async fn vocabulary(&self, csv_name: &str) -> AppResult<TagVocabulary> {
        let records = self.records(csv_name).await?;
        Ok(TagVocabulary::from_records(&records))
    }

    /// CSV filenames available in the autocomplete directory.
    pub fn list_csv_files(&self) -> Vec<String> {
        let mut files: Vec<String> = match std::fs::read_dir(&self.autocomplete_dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|name| name.ends_with(".csv"))
                .collect(),
            Err(_) => Vec::new(),
        };
        files.sort();
        files
    }

    /// Substring search over canonical names and aliases, preserving CSV row
    /// order and deduplicating by canonical name. An empty query yields no
    /// results.
    pub async fn search(&self, csv_name: &str, query: &str, limit: usize) -> Vec<TagRecord> {
        let query = normalize(query.trim());
        if query.is_empty() {
            return Vec::new();
        }
        let records = match self.records(csv_name).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("tag search unavailable for '{}': {}", csv_name, e);
                return Vec::new();
            }
        };

        let mut seen = std::collections::HashSet::new();
        let mut results = Vec::new();
        for record in records.iter() {
            if results.len() >= limit {
                break;
            }
            if seen.contains(&record.name) {
                continue;
            }
            let matched = record.name.contains(&query)
                || record.aliases.iter().any(|a| a.contains(&query));
            if matched {
                seen.insert(record.name.clone());
                results.push(record.clone());
            }
        }
        results
    }

    async fn resolve_csv(&self, csv_name: &str) -> AppResult<PathBuf> {
        if csv_name.starts_with("http://") || csv_name.starts_with("https://") {
            remote::fetch_cached(&self.client, &self.cache_dir, csv_name).await
        } else {
            Ok(self.autocomplete_dir.join(csv_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    const SAMPLE: &str = "\
name,type,count,aliases
1girl,0,5000000,\"1girls,sole_female\"
long_hair,0,400000,longhair
smile,0,300000,
";

    #[test]
    fn parses_rows_and_skips_header() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "tags.csv", SAMPLE);
        let tags = load_tags_from_csv(&dir.path().join("tags.csv")).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].name, "1girl");
        assert_eq!(tags[0].aliases, vec!["1girls", "sole female"]);
        assert_eq!(tags[1].name, "long hair");
        assert!(tags[2].aliases.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_tags_from_csv(Path::new("/nonexistent/tags.csv")).is_err());
    }

    #[tokio::test]
    async fn search_empty_query_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "tags.csv", SAMPLE);
        let store = TagStore::new(dir.path(), dir.path().join("cache"));
        assert!(store.search("tags.csv", "", 10).await.is_empty());
        assert!(store.search("tags.csv", "   ", 10).await.is_empty());
    }

    #[tokio::test]
    async fn search_matches_names_and_aliases_in_order() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "tags.csv", SAMPLE);
        let store = TagStore::new(dir.path(), dir.path().join("cache"));

        let hits = store.search("tags.csv", "girl", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "1girl");

        // alias hit, normalized query
        let hits = store.search("tags.csv", "Sole_Fem", 10).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "1girl");

        // limit caps results
        let hits = store.search("tags.csv", "l", 1).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "1girl");
    }

    #[tokio::test]
    async fn records_are_memoized_until_refresh() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "tags.csv", SAMPLE);
        let store = TagStore::new(dir.path(), dir.path().join("cache"));

        let first = store.records("tags.csv").await.unwrap();
        write_csv(dir.path(), "tags.csv", "new_tag,0,1,\n");
        let cached = store.records("tags.csv").await.unwrap();
        assert_eq!(first.len(), cached.len());

        store.refresh("tags.csv").await.unwrap();
        let reloaded = store.records("tags.csv").await.unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].name, "new tag");
    }

    #[tokio::test]
    async fn missing_csv_surfaces_as_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TagStore::new(dir.path(), dir.path().join("cache"));
        assert!(store.records("absent.csv").await.is_err());
        assert!(store.search("absent.csv", "girl", 10).await.is_empty());
    }
}
