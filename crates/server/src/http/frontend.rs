use std::path::{Component, Path, PathBuf};

use axum::{
    Json,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use utils_core::response::ApiResponse;

use crate::Deployment;

const HASHED_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";
const DEFAULT_CACHE_CONTROL: &str = "public, max-age=300";
const INDEX_FILE: &str = "index.html";

/// Serves the prebuilt dashboard from `frontend_dir`, falling back to
/// `index.html` so client-side routes resolve.
pub async fn serve_frontend(State(deployment): State<Deployment>, uri: Uri) -> Response {
    let Some(root) = deployment.config().frontend_dir() else {
        return not_found();
    };
    let path = uri.path().trim_start_matches('/');
    let path = if path.is_empty() { INDEX_FILE } else { path };
    serve_file(&root, path).await
}

async fn serve_file(root: &Path, path: &str) -> Response {
    if let Some(relative) = sanitize_path(path) {
        if let Ok(content) = tokio::fs::read(root.join(&relative)).await {
            return file_response(path, content);
        }
    }

    match tokio::fs::read(root.join(INDEX_FILE)).await {
        Ok(index) => file_response(INDEX_FILE, index),
        Err(err) => {
            tracing::warn!(root = %root.display(), error = %err, "Frontend index.html is missing");
            not_found()
        }
    }
}

fn file_response(path: &str, content: Vec<u8>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (
                header::CACHE_CONTROL,
                cache_control_for_path(path).to_string(),
            ),
        ],
        content,
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<()>::error("Route not found")),
    )
        .into_response()
}

/// Keeps only plain path segments, refusing anything that could escape the
/// frontend directory.
fn sanitize_path(path: &str) -> Option<PathBuf> {
    let mut clean = PathBuf::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(segment) => clean.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn cache_control_for_path(path: &str) -> &'static str {
    if is_hashed_asset(path) {
        HASHED_CACHE_CONTROL
    } else {
        DEFAULT_CACHE_CONTROL
    }
}

fn is_hashed_asset(path: &str) -> bool {
    let file_name = match Path::new(path).file_name().and_then(|name| name.to_str()) {
        Some(name) => name,
        None => return false,
    };

    let (stem, _ext) = match file_name.rsplit_once('.') {
        Some(parts) => parts,
        None => return false,
    };

    let (_prefix, hash) = match stem.rsplit_once('-') {
        Some(parts) => parts,
        None => return false,
    };

    if hash.len() < 8 {
        return false;
    }

    hash.chars().all(|ch| ch.is_ascii_alphanumeric())
}
