//! Axum request handlers for the HTTP API.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Multipart, Path as RoutePath, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::files::paths::{resolve_in_root, sanitize_filename};
use crate::files::preview::{content_type, find_preview};
use crate::files::search::{search_roots, FileKind};
use crate::nodes::registry::{self, NodeKind, ALL_NODES};
use crate::settings::ACTIVE_CSV_KEY;

pub async fn root() -> &'static str {
    "EreNodes API"
}

fn roots_for(state: &AppState, kind: FileKind) -> Vec<PathBuf> {
    match kind.model_folder() {
        Some(folder) => state.model_paths.roots(folder),
        None => vec![state.prompts_dir.clone()],
    }
}

// --- Settings ---

pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(state.settings.load().await)
}

pub async fn set_setting(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    let key = payload
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("Setting 'key' not provided".to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    state.settings.set(key, value.clone()).await?;

    // Changing the active CSV pre-warms the tag cache; the setting is saved
    // even if that fails.
    if key == ACTIVE_CSV_KEY {
        if let Some(csv_name) = value.as_str() {
            if let Err(e) = state.tags.refresh(csv_name).await {
                tracing::warn!("could not reload tags for '{}': {}", csv_name, e);
            }
        }
    }

    Ok(Json(json!({ "status": "ok" })))
}

// --- Tag vocabulary ---

pub async fn list_csv_files(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.tags.list_csv_files())
}

fn default_limit() -> usize {
    10
}

#[derive(Deserialize)]
pub struct SearchTagsQuery {
    #[serde(default)]
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

pub async fn search_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchTagsQuery>,
) -> Json<Value> {
    let Some(active_csv) = state.settings.active_csv().await else {
        return Json(json!([]));
    };
    let results = state.tags.search(&active_csv, &params.query, params.limit).await;
    Json(json!(results))
}

// --- Tag groups ---

#[derive(Deserialize)]
pub struct ListGroupsQuery {
    #[serde(default)]
    path: String,
}

pub async fn list_tag_groups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListGroupsQuery>,
) -> AppResult<Json<Value>> {
    let scan_path = resolve_in_root(&state.prompts_dir, &params.path)?;
    if !scan_path.is_dir() {
        return Ok(Json(json!([])));
    }

    let mut items: Vec<(bool, String)> = Vec::new();
    let mut entries = tokio::fs::read_dir(&scan_path).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().await?;
        if file_type.is_dir() {
            if !name.starts_with('.') && name != "__pycache__" {
                items.push((false, name));
            }
        } else if file_type.is_file() && name.to_lowercase().ends_with(".json") {
            items.push((true, name));
        }
    }
    items.sort_by(|a, b| (a.0, a.1.to_lowercase()).cmp(&(b.0, b.1.to_lowercase())));

    let listed: Vec<Value> = items
        .into_iter()
        .map(|(is_file, name)| {
            json!({ "name": name, "type": if is_file { "file" } else { "folder" } })
        })
        .collect();
    Ok(Json(Value::Array(listed)))
}

#[derive(Deserialize)]
pub struct GetGroupQuery {
    filename: Option<String>,
}

pub async fn get_tag_group(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GetGroupQuery>,
) -> AppResult<Json<Value>> {
    let filename = params
        .filename
        .as_deref()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| AppError::Validation("Filename not provided".to_string()))?;

    let file_path = resolve_in_root(&state.prompts_dir, filename)?;
    if !file_path.is_file() {
        return Err(AppError::NotFound("Tag group not found".to_string()));
    }

    let raw = tokio::fs::read_to_string(&file_path).await?;
    let data: Value = serde_json::from_str(&raw)?;
    Ok(Json(data))
}

pub async fn save_tag_group(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut filename: Option<String> = None;
    let mut tags_json: Option<String> = None;
    let mut path_param = String::new();
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "filename" => filename = Some(field.text().await.unwrap_or_default()),
            "tags_json" => tags_json = Some(field.text().await.unwrap_or_default()),
            "path" => path_param = field.text().await.unwrap_or_default(),
            "image_file" => {
                let original = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid image upload: {}", e)))?;
                image = Some((original, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (Some(filename), Some(tags_json)) = (filename, tags_json) else {
        return Err(AppError::Validation(
            "Filename or tags_json not provided".to_string(),
        ));
    };

    let target_dir = resolve_in_root(&state.prompts_dir, &path_param)?;
    tokio::fs::create_dir_all(&target_dir).await?;

    let base_name = Path::new(&filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(filename.clone());
    let mut safe_filename = sanitize_filename(&base_name);
    if !safe_filename.to_lowercase().ends_with(".json") {
        safe_filename.push_str(".json");
    }

    let file_path = target_dir.join(&safe_filename);
    if file_path.is_dir() {
        return Err(AppError::Validation(
            "A directory with this name already exists at the target location.".to_string(),
        ));
    }

    let tags: Value = serde_json::from_str(&tags_json)
        .map_err(|_| AppError::Validation("Invalid JSON format for tags_json.".to_string()))?;
    tokio::fs::write(&file_path, serde_json::to_string_pretty(&tags)?).await?;

    let saved_as = if path_param.is_empty() {
        safe_filename.clone()
    } else {
        format!("{}/{}", path_param.trim_matches('/'), safe_filename)
    };
    let mut message = format!("Tag group '{}' saved successfully.", saved_as);

    // The preview image is best-effort; a failure only annotates the message.
    if let Some((original_name, bytes)) = image {
        match Path::new(&original_name).extension().and_then(|e| e.to_str()) {
            None => {
                message.push_str(&format!(
                    " Image '{}' was not saved as it has no extension.",
                    original_name
                ));
            }
            Some(ext) => {
                let stem = Path::new(&safe_filename)
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let image_name = format!("{}.{}", stem, ext);
                match tokio::fs::write(target_dir.join(&image_name), &bytes).await {
                    Ok(()) => message.push_str(&format!(" Image '{}' also saved.", image_name)),
                    Err(e) => {
                        tracing::warn!("preview image write failed: {}", e);
                        message.push_str(" Failed to save associated image.");
                    }
                }
            }
        }
    }

    Ok(Json(json!({ "message": message })))
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Value>,
) -> AppResult<Json<Value>> {
    let folder_name = payload
        .get("folderName")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("Folder name not provided".to_string()))?;
    let path_param = payload.get("path").and_then(Value::as_str).unwrap_or("");

    let target_dir = resolve_in_root(&state.prompts_dir, path_param)?;
    let new_folder = target_dir.join(sanitize_filename(folder_name));
    if new_folder.exists() {
        return Err(AppError::Conflict(
            "A folder or file with this name already exists.".to_string(),
        ));
    }
    tokio::fs::create_dir_all(&new_folder).await?;
    Ok(Json(json!({ "message": "Folder created successfully." })))
}

// --- Unified file search ---

#[derive(Deserialize)]
pub struct SearchFilesQuery {
    #[serde(default)]
    query: String,
    #[serde(default)]
    path: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

pub async fn search_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchFilesQuery>,
) -> AppResult<impl IntoResponse> {
    let kind_param = params
        .kind
        .as_deref()
        .ok_or_else(|| AppError::Validation("File type not provided".to_string()))?;
    let kind = FileKind::from_param(kind_param)
        .ok_or_else(|| AppError::Validation(format!("Invalid file type: {}", kind_param)))?;

    let roots = roots_for(&state, kind);
    let outcome = search_roots(&roots, kind, &params.query, &params.path)?;
    Ok(Json(json!(outcome)))
}

// --- Preview images ---

pub async fn view_file(
    State(state): State<Arc<AppState>>,
    RoutePath((kind_param, rel_path)): RoutePath<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let kind = FileKind::from_param(&kind_param).ok_or_else(|| {
        AppError::NotFound(format!("No folder configured for type '{}'", kind_param))
    })?;

    let roots = roots_for(&state, kind);
    let Some(image_path) = find_preview(&roots, &rel_path) else {
        return Err(AppError::NotFound("Preview image not found".to_string()));
    };

    let bytes = tokio::fs::read(&image_path).await?;
    Ok(([(header::CONTENT_TYPE, content_type(&image_path))], bytes))
}

pub async fn save_file_image(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<Value>> {
    let mut kind_param: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut image: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart payload: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "type" => kind_param = Some(field.text().await.unwrap_or_default()),
            "name" => file_name = Some(field.text().await.unwrap_or_default()),
            "image_file" => {
                let original = field.file_name().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid image upload: {}", e)))?;
                image = Some((original, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let (Some(kind_param), Some(file_name), Some((original_name, bytes))) =
        (kind_param, file_name, image)
    else {
        return Err(AppError::Validation(
            "Type, name, or image file not provided".to_string(),
        ));
    };

    let kind = FileKind::from_param(&kind_param)
        .ok_or_else(|| AppError::Validation(format!("Invalid file type: {}", kind_param)))?;

    // Locate the existing model/group file the image belongs to.
    let mut target: Option<PathBuf> = None;
    'roots: for root in roots_for(&state, kind) {
        let Ok(base) = resolve_in_root(&root, &file_name) else {
            continue;
        };
        for ext in kind.extensions() {
            let candidate = PathBuf::from(format!("{}{}", base.to_string_lossy(), ext));
            if candidate.is_file() {
                target = Some(candidate);
                break 'roots;
            }
        }
    }
    let Some(target) = target else {
        return Err(AppError::NotFound(format!("File not found: {}", file_name)));
    };

    let image_ext = Path::new(&original_name)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| AppError::Validation("Image file has no extension".to_string()))?;
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let image_name = format!("{}.{}", stem, image_ext);
    let image_path = target.with_file_name(&image_name);
    tokio::fs::write(&image_path, &bytes).await?;

    Ok(Json(json!({
        "message": format!(
            "Image '{}' saved successfully for {} '{}'.",
            image_name,
            kind.as_str(),
            file_name
        )
    })))
}

// --- Node registry ---

pub async fn list_nodes() -> Json<Value> {
    let nodes: Vec<Value> = ALL_NODES.iter().map(|kind| kind.describe()).collect();
    Json(Value::Array(nodes))
}

pub async fn process_node(
    State(state): State<Arc<AppState>>,
    RoutePath(node_id): RoutePath<String>,
    Json(inputs): Json<Value>,
) -> AppResult<Json<Value>> {
    let kind = NodeKind::from_id(&node_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown node: {}", node_id)))?;
    let outputs = registry::process(kind, &inputs, &state.tags).await?;
    Ok(Json(outputs))
}
