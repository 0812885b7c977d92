//! Artifact Store (C5, §4.5): serves the cached hfi helper binary and its
//! modification timestamp. Building hfi itself is out of core scope — the
//! cache directory is populated out of band; this module only serves what's
//! already there and reports 404/500 when it isn't.

use crate::error::AppError;
use axum::body::Body;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::path::PathBuf;

/// Static `{os -> {arch -> target triple}}` map (§4.5).
fn target_triple(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux", "x86_64") => Some("x86_64-unknown-linux-gnu"),
        ("linux", "aarch64") => Some("aarch64-unknown-linux-gnu"),
        ("darwin", "x86_64") => Some("x86_64-apple-darwin"),
        ("darwin", "aarch64") => Some("aarch64-apple-darwin"),
        ("windows", "x86_64") => Some("x86_64-pc-windows-msvc"),
        _ => None,
    }
}

fn cache_dir() -> PathBuf {
    flagfarm_logging::farm_home().join("hfi_artifacts")
}

fn cached_artifact_path(triple: &str) -> PathBuf {
    let binary_name = if triple.contains("windows") { "hfi.exe" } else { "hfi" };
    cache_dir().join(triple).join(binary_name)
}

/// `GET /hfi/<os>/<arch>`.
pub async fn serve_artifact(Path((os, arch)): Path<(String, String)>) -> Result<Response, AppError> {
    let triple = target_triple(&os, &arch)
        .ok_or_else(|| AppError::NotFound(format!("unsupported platform {os}/{arch}")))?;
    let path = cached_artifact_path(triple);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::BuildMissing(format!("no cached hfi artifact for {triple}")))?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"hfi\"".to_string(),
            ),
        ],
        Body::from(bytes),
    )
        .into_response())
}

/// `GET /hfi/<os>/<arch>/timestamp`.
pub async fn serve_timestamp(
    Path((os, arch)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let triple = target_triple(&os, &arch)
        .ok_or_else(|| AppError::NotFound(format!("unsupported platform {os}/{arch}")))?;
    let path = cached_artifact_path(triple);

    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|_| AppError::BuildMissing(format!("no cached hfi artifact for {triple}")))?;

    let modified = metadata
        .modified()
        .map_err(|_| AppError::BuildMissing("artifact has no modification time".into()))?;
    let timestamp = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    Ok(Json(json!({ "timestamp": timestamp })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_platforms_resolve_to_triples() {
        assert_eq!(target_triple("linux", "x86_64"), Some("x86_64-unknown-linux-gnu"));
        assert_eq!(target_triple("darwin", "aarch64"), Some("aarch64-apple-darwin"));
    }

    #[test]
    fn unknown_platform_is_none() {
        assert_eq!(target_triple("plan9", "x86_64"), None);
    }

    #[test]
    fn windows_binary_name_has_exe_suffix() {
        let path = cached_artifact_path("x86_64-pc-windows-msvc");
        assert_eq!(path.file_name().unwrap(), "hfi.exe");
    }
}
