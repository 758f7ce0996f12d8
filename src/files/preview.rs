//! Preview-image lookup for model and tag-group files.
//!
//! Given a root-relative path without extension, tries `<base>.<ext>` then
//! `<base>.preview.<ext>` for each known image extension, across every
//! configured root, first hit wins.
use std::path::{Path, PathBuf};

use crate::files::paths::resolve_in_root;

pub const PREVIEW_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub fn find_preview(roots: &[PathBuf], rel_base: &str) -> Option<PathBuf> {
    for root in roots {
        let Ok(base) = resolve_in_root(root, rel_base) else {
            continue;
        };
        let base = base.to_string_lossy().into_owned();
        for ext in PREVIEW_EXTENSIONS {
            let direct = PathBuf::from(format!("{}.{}", base, ext));
            if direct.is_file() {
                return Some(direct);
            }
            let preview = PathBuf::from(format!("{}.preview.{}", base, ext));
            if preview.is_file() {
                return Some(preview);
            }
        }
    }
    None
}

/// MIME type for a preview file, by extension.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
