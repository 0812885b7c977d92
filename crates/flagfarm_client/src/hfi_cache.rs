//! Client Artifact Cache (§4.5a, supplements the distilled spec): keeps a
//! local copy of the `hfi` helper binary fresh against the server's copy.
//! hfi itself is optional tooling — failures here are logged, never fatal.

use std::path::PathBuf;
use std::time::{Duration, UNIX_EPOCH};

#[cfg(unix)]
fn mark_executable(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}

/// Maps `std::env::consts::OS` onto the naming the server's artifact store
/// uses (§4.5) — everything else already lines up, only macOS differs.
pub fn local_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

pub fn local_arch() -> &'static str {
    std::env::consts::ARCH
}

fn binary_name(os: &str) -> &'static str {
    if os == "windows" {
        "hfi.exe"
    } else {
        "hfi"
    }
}

pub fn cached_path(os: &str, arch: &str) -> PathBuf {
    flagfarm_logging::farm_home()
        .join("hfi_cache")
        .join(format!("{os}-{arch}"))
        .join(binary_name(os))
}

fn local_mtime_secs(path: &std::path::Path) -> Option<i64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    let secs = modified.duration_since(UNIX_EPOCH).ok()?.as_secs();
    Some(secs as i64)
}

/// Re-fetches the cached `hfi` binary if the server's copy is newer (or we
/// have none cached yet). Never returns an error that should abort a wave —
/// callers just log and move on when this fails.
pub async fn ensure_fresh(
    client: &reqwest::Client,
    server_url: &str,
    os: &str,
    arch: &str,
    timeout: Duration,
) -> anyhow::Result<PathBuf> {
    let path = cached_path(os, arch);
    let base = server_url.trim_end_matches('/');

    let remote_ts: i64 = client
        .get(format!("{base}/hfi/{os}/{arch}/timestamp"))
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .json::<serde_json::Value>()
        .await?
        .get("timestamp")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| anyhow::anyhow!("server timestamp response missing 'timestamp' field"))?;

    let stale = match local_mtime_secs(&path) {
        Some(local_ts) => local_ts < remote_ts,
        None => true,
    };

    if !stale {
        return Ok(path);
    }

    let bytes = client
        .get(format!("{base}/hfi/{os}/{arch}"))
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, &path)?;
    mark_executable(&path)?;

    Ok(path)
}
