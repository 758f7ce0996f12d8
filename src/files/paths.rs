//! Path handling for the sandboxed file endpoints: traversal neutralization,
//! root containment checks, filename sanitization, and model-root resolution
//! including the extra-model-paths YAML override used by managed installs.
use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::Value as YamlValue;

use crate::error::{AppError, AppResult};

static UNSAFE_FILENAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]"#).unwrap());

/// Replace path-unsafe characters and `..` sequences in a filename with `_`.
pub fn sanitize_filename(filename: &str) -> String {
    UNSAFE_FILENAME_CHARS
        .replace_all(filename, "_")
        .replace("..", "_")
        .trim()
        .to_string()
}

/// Neutralize a client-supplied relative path: strip leading slashes and
/// substitute `..` segments rather than rejecting them.
pub fn neutralize_rel_path(path: &str) -> String {
    path.trim_start_matches(['/', '\\']).replace("..", "_")
}

/// Collapse `.` and `..` components without touching the filesystem, so
/// containment can be checked for paths that do not exist yet.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolve `rel` inside `root` after neutralizing traversal sequences. The
/// resolved path is guaranteed to stay under `root`.
pub fn resolve_in_root(root: &Path, rel: &str) -> AppResult<PathBuf> {
    let rel = neutralize_rel_path(rel);
    contain_in_root(root, &rel)
}

/// Resolve `rel` inside `root` WITHOUT neutralizing: `..` segments are
/// honored lexically and any path escaping the root is rejected.
pub fn contain_in_root(root: &Path, rel: &str) -> AppResult<PathBuf> {
    let candidate = if Path::new(rel).is_absolute() {
        lexical_normalize(Path::new(rel))
    } else {
        lexical_normalize(&root.join(rel))
    };
    if candidate.starts_with(root) {
        Ok(candidate)
    } else {
        tracing::warn!(
            "rejected path outside sandbox: {:?} not under {:?}",
            candidate,
            root
        );
        Err(AppError::Forbidden)
    }
}

/// Resolver for model directories (`loras`, `embeddings`, ...): the base
/// models dir plus any matching entries of the extra-model-paths YAML file.
pub struct ModelPaths {
    models_dir: PathBuf,
    extra_paths_file: PathBuf,
}

impl ModelPaths {
    pub fn new(models_dir: impl Into<PathBuf>, extra_paths_file: impl Into<PathBuf>) -> Self {
        ModelPaths {
            models_dir: models_dir.into(),
            extra_paths_file: extra_paths_file.into(),
        }
    }

    /// All configured roots for `model_type`, deduplicated, existing extra
    /// paths only. The default root is always first.
    pub fn roots(&self, model_type: &str) -> Vec<PathBuf> {
        let mut roots = vec![self.models_dir.join(model_type)];
        for extra in self.extra_roots(model_type) {
            if extra.exists() && !roots.contains(&extra) {
                roots.push(extra);
            }
        }
        roots
    }

    fn extra_roots(&self, model_type: &str) -> Vec<PathBuf> {
        let raw = match std::fs::read_to_string(&self.extra_paths_file) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };
        let doc: YamlValue = match serde_yaml::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed extra model paths file {}: {}",
                    self.extra_paths_file.display(),
                    e
                );
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        let Some(configs) = doc.as_mapping() else {
            return found;
        };
        for (_name, config) in configs {
            let Some(config) = config.as_mapping() else {
                continue;
            };
            let Some(entry) = config.get(model_type) else {
                continue;
            };
            let base_path = config
                .get("base_path")
                .and_then(YamlValue::as_str)
                .unwrap_or("");

            // The per-type value may be a single path, a multiline string,
            // or a list of paths.
            let mut raw_paths: Vec<String> = Vec::new();
            match entry {
                YamlValue::String(s) => {
                    raw_paths.extend(s.lines().map(|l| l.trim().to_string()));
                }
                YamlValue::Sequence(seq) => {
                    raw_paths.extend(
                        seq.iter()
                            .filter_map(YamlValue::as_str)
                            .map(|s| s.trim().to_string()),
                    );
                }
                _ => {}
            }

            for raw_path in raw_paths.into_iter().filter(|p| !p.is_empty()) {
                let full = if Path::new(&raw_path).is_absolute() {
                    PathBuf::from(raw_path)
                } else {
                    Path::new(base_path).join(raw_path)
                };
                found.push(full);
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_filename(r#"my:group?*"<x>|"#), "my_group____x__");
        assert_eq!(sanitize_filename("a/../b"), "a___b");
        assert_eq!(sanitize_filename("  plain name  "), "plain name");
    }

    #[test]
    fn neutralize_substitutes_traversal() {
        assert_eq!(neutralize_rel_path("../../etc"), "_/_/etc");
        assert_eq!(neutralize_rel_path("/leading/slash"), "leading/slash");
        assert_eq!(neutralize_rel_path("sub/dir"), "sub/dir");
    }

    #[test]
    fn resolve_keeps_neutralized_paths_inside() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_in_root(dir.path(), "../../etc/passwd").unwrap();
        assert!(resolved.starts_with(dir.path()));
    }

    #[test]
    fn contain_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            contain_in_root(dir.path(), "../../etc/passwd"),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            contain_in_root(dir.path(), "/etc/passwd"),
            Err(AppError::Forbidden)
        ));
        assert!(contain_in_root(dir.path(), "sub/inner").is_ok());
        // `..` that stays inside the root is allowed
        assert!(contain_in_root(dir.path(), "sub/../other").is_ok());
    }

    #[test]
    fn extra_paths_yaml_resolves_strings_and_lists() {
        let dir = tempfile::tempdir().unwrap();
        let lora_a = dir.path().join("sm/Lora");
        let lora_b = dir.path().join("sm/LyCORIS");
        std::fs::create_dir_all(&lora_a).unwrap();
        std::fs::create_dir_all(&lora_b).unwrap();

        let yaml = format!(
            "stability_matrix:\n  base_path: {}\n  loras: |\n    sm/Lora\n    sm/LyCORIS\nother:\n  base_path: {}\n  loras:\n    - missing/dir\n",
            dir.path().display(),
            dir.path().display(),
        );
        let yaml_path = dir.path().join("extra_model_paths.yaml");
        std::fs::write(&yaml_path, yaml).unwrap();

        let paths = ModelPaths::new(dir.path().join("models"), &yaml_path);
        let roots = paths.roots("loras");
        assert_eq!(roots[0], dir.path().join("models/loras"));
        assert!(roots.contains(&lora_a));
        assert!(roots.contains(&lora_b));
        // nonexistent extra roots are dropped
        assert!(!roots.iter().any(|r| r.ends_with("missing/dir")));
    }

    #[test]
    fn missing_yaml_yields_default_root_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ModelPaths::new(dir.path().join("models"), dir.path().join("absent.yaml"));
        assert_eq!(paths.roots("embeddings"), vec![dir.path().join("models/embeddings")]);
    }
}
