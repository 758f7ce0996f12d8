//! Listing and recursive substring search over the sandboxed file roots
//! (LoRA models, embeddings, tag-group presets).
//!
//! Without a query only the immediate children of the requested directory are
//! returned; with a query the whole tree is walked and matches are collected
//! by file base-name or root-relative path, deduplicated by relative path.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{AppError, AppResult};
use crate::files::paths::contain_in_root;

/// File categories served by the search and preview endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Lora,
    Embedding,
    Group,
}

impl FileKind {
    pub fn from_param(param: &str) -> Option<Self> {
        match param {
            "lora" => Some(FileKind::Lora),
            "embedding" => Some(FileKind::Embedding),
            "group" => Some(FileKind::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Lora => "lora",
            FileKind::Embedding => "embedding",
            FileKind::Group => "group",
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileKind::Lora => &[".safetensors", ".pt", ".ckpt", ".lora"],
            FileKind::Embedding => &[".pt", ".bin", ".safetensors", ".embedding"],
            FileKind::Group => &[".json"],
        }
    }

    /// Model-directory name under the models root, for kinds resolved via
    /// model paths rather than the prompts directory.
    pub fn model_folder(&self) -> Option<&'static str> {
        match self {
            FileKind::Lora => Some("loras"),
            FileKind::Embedding => Some("embeddings"),
            FileKind::Group => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub items: Vec<FileEntry>,
    pub current_path: String,
    pub parent_path: String,
}

fn is_excluded_dir(name: &str) -> bool {
    name.starts_with('.') || name == "__pycache__"
}

fn matches_extension(filename: &str, extensions: &[&str]) -> bool {
    let lower = filename.to_lowercase();
    extensions.iter().any(|ext| lower.ends_with(ext))
}

fn rel_string(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Relative path with the final extension removed, the identifier the
/// front-end uses to address a file.
fn rel_without_extension(path: &Path, root: &Path) -> String {
    rel_string(&path.with_extension(""), root)
}

fn file_entry(entry_path: &Path, root: &Path, kind: FileKind) -> FileEntry {
    let name = entry_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = entry_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));
    FileEntry {
        name,
        kind: kind.as_str().to_string(),
        path: rel_without_extension(entry_path, root),
        extension,
    }
}

fn folder_entry(entry_path: &Path, root: &Path) -> FileEntry {
    FileEntry {
        name: entry_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        kind: "folder".to_string(),
        path: rel_string(entry_path, root),
        extension: None,
    }
}

/// Resolve the requested sub-path against the configured roots and run the
/// listing or search. `..` segments in `path_param` are honored lexically and
/// rejected when they escape every root.
pub fn search_roots(
    roots: &[PathBuf],
    kind: FileKind,
    raw_query: &str,
    path_param: &str,
) -> AppResult<SearchOutcome> {
    let mut path_param = path_param.trim_start_matches(['/', '\\']).to_string();

    // A query ending in a slash navigates into that folder instead of
    // searching.
    let mut query = raw_query.to_lowercase();
    if raw_query.ends_with('/') || raw_query.ends_with('\\') {
        let nav = raw_query.trim_matches(['/', '\\']);
        path_param = if path_param.is_empty() {
            nav.to_string()
        } else {
            format!("{}/{}", path_param.trim_end_matches('/'), nav)
        };
        query.clear();
    }

    if roots.is_empty() {
        return Ok(SearchOutcome {
            items: Vec::new(),
            current_path: String::new(),
            parent_path: path_param,
        });
    }

    // (scan target, collection root) pairs to walk.
    let mut scan_pairs: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut current_path = String::new();
    let mut parent_path = String::new();

    if !path_param.is_empty() {
        let mut contained_anywhere = false;
        for root in roots {
            match contain_in_root(root, &path_param) {
                Ok(candidate) => {
                    contained_anywhere = true;
                    if candidate.is_dir() {
                        current_path = rel_string(&candidate, root);
                        parent_path = Path::new(&current_path)
                            .parent()
                            .map(|p| p.to_string_lossy().replace('\\', "/"))
                            .unwrap_or_default();
                        scan_pairs.push((candidate, root.clone()));
                        break;
                    }
                }
                Err(_) => {}
            }
        }
        if scan_pairs.is_empty() {
            if !contained_anywhere {
                return Err(AppError::Forbidden);
            }
            return Ok(SearchOutcome {
                items: Vec::new(),
                current_path: String::new(),
                parent_path: path_param,
            });
        }
    } else {
        for root in roots {
            scan_pairs.push((root.clone(), root.clone()));
        }
    }

    let mut items = Vec::new();
    let mut seen_paths: HashSet<String> = HashSet::new();

    for (scan_target, collection_root) in &scan_pairs {
        if !scan_target.exists() {
            continue;
        }

        let walker = WalkDir::new(scan_target)
            .min_depth(1)
            .max_depth(if query.is_empty() { 1 } else { usize::MAX })
            .into_iter()
            .filter_entry(|e: &DirEntry| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !is_excluded_dir(&e.file_name().to_string_lossy())
            });

        for entry in walker.filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if entry.file_type().is_dir() {
                let dirname = entry.file_name().to_string_lossy().into_owned();
                let rel = rel_string(entry_path, collection_root);
                let hit = if query.is_empty() {
                    true // listing returns all immediate child folders
                } else {
                    dirname.to_lowercase().contains(&query)
                };
                if hit && seen_paths.insert(rel.clone()) {
                    items.push(folder_entry(entry_path, collection_root));
                }
            } else if entry.file_type().is_file() {
                let filename = entry.file_name().to_string_lossy().into_owned();
                if !matches_extension(&filename, kind.extensions()) {
                    continue;
                }
                let rel_no_ext = rel_without_extension(entry_path, collection_root);
                let hit = if query.is_empty() {
                    true
                } else {
                    let stem = entry_path
                        .file_stem()
                        .map(|s| s.to_string_lossy().to_lowercase())
                        .unwrap_or_default();
                    stem.contains(&query) || rel_no_ext.to_lowercase().contains(&query)
                };
                if hit && seen_paths.insert(rel_no_ext.clone()) {
                    items.push(file_entry(entry_path, collection_root, kind));
                }
            }
        }
    }

    items.sort_by(|a, b| {
        let a_key = (a.kind != "folder", a.name.to_lowercase());
        let b_key = (b.kind != "folder", b.name.to_lowercase());
        a_key.cmp(&b_key)
    });

    Ok(SearchOutcome {
        items,
        current_path: if current_path == "." { String::new() } else { current_path },
        parent_path: if parent_path == "." { String::new() } else { parent_path },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn lora_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("styles")).unwrap();
        fs::create_dir_all(dir.path().join(".cache")).unwrap();
        fs::write(dir.path().join("alpha.safetensors"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("styles/inkwash.safetensors"), b"x").unwrap();
        fs::write(dir.path().join(".cache/hidden.safetensors"), b"x").unwrap();
        dir
    }

    #[test]
    fn listing_returns_immediate_children_folders_first() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];
        let out = search_roots(&roots, FileKind::Lora, "", "").unwrap();

        let names: Vec<(&str, &str)> = out
            .items
            .iter()
            .map(|i| (i.kind.as_str(), i.name.as_str()))
            .collect();
        assert_eq!(names, vec![("folder", "styles"), ("lora", "alpha")]);
        assert_eq!(out.items[1].extension.as_deref(), Some(".safetensors"));
        assert_eq!(out.current_path, "");
        assert_eq!(out.parent_path, "");
    }

    #[test]
    fn query_searches_recursively_by_name_and_rel_path() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];

        let out = search_roots(&roots, FileKind::Lora, "inkwash", "").unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].path, "styles/inkwash");

        // matches on the relative path, not just the basename
        let out = search_roots(&roots, FileKind::Lora, "styles/ink", "").unwrap();
        assert_eq!(out.items.len(), 1);

        // hidden directories are excluded from recursion
        let out = search_roots(&roots, FileKind::Lora, "hidden", "").unwrap();
        assert!(out.items.is_empty());
    }

    #[test]
    fn path_param_navigates_into_subfolder() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];
        let out = search_roots(&roots, FileKind::Lora, "", "styles").unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].name, "inkwash");
        assert_eq!(out.current_path, "styles");
        assert_eq!(out.parent_path, "");
    }

    #[test]
    fn trailing_slash_query_navigates() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];
        let out = search_roots(&roots, FileKind::Lora, "styles/", "").unwrap();
        assert_eq!(out.items.len(), 1);
        assert_eq!(out.items[0].name, "inkwash");
        assert_eq!(out.current_path, "styles");
    }

    #[test]
    fn traversal_outside_every_root_is_forbidden() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];
        let err = search_roots(&roots, FileKind::Lora, "", "../../etc").unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn unknown_subfolder_yields_empty_outcome() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf()];
        let out = search_roots(&roots, FileKind::Lora, "", "nope").unwrap();
        assert!(out.items.is_empty());
        assert_eq!(out.parent_path, "nope");
    }

    #[test]
    fn results_deduplicate_across_roots() {
        let dir = lora_tree();
        let roots = vec![dir.path().to_path_buf(), dir.path().to_path_buf()];
        let out = search_roots(&roots, FileKind::Lora, "alpha", "").unwrap();
        assert_eq!(out.items.len(), 1);
    }
}
