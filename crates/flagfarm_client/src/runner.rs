//! Exploit Runner (C8, §4.8): runs one exploit subprocess against one team
//! with a hard timeout and extracts tokens by regex.

use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct CapturedFlag {
    pub flag: String,
    pub ts: i64,
}

#[derive(Debug)]
pub enum RunFailure {
    /// Non-zero exit.
    Crashed,
    /// Hard-killed after `timeout`.
    TimedOut,
    /// Exploit is neither directly executable nor is an interpreter
    /// configured for it (§9 interpreter selection).
    UnknownInterpreter,
    /// The subprocess could not even be spawned.
    SpawnFailed(String),
}

/// Outcome of one run: `flags` may legitimately be empty on a successful
/// exit (§9 — "no flags" is not a failure, S5).
pub struct RunOutcome {
    pub flags: Vec<CapturedFlag>,
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Runs `exploit_path` against `team`, hard-killing it after `timeout`.
pub async fn run_exploit(
    exploit_path: &Path,
    team: &str,
    timeout: Duration,
    flag_regex: &Regex,
    interpreter: Option<&str>,
) -> Result<RunOutcome, RunFailure> {
    let mut cmd = if is_executable(exploit_path) {
        let mut cmd = Command::new(exploit_path);
        cmd.arg(team);
        cmd
    } else if let Some(interpreter) = interpreter {
        let mut cmd = Command::new(interpreter);
        cmd.arg(exploit_path).arg(team);
        cmd
    } else {
        return Err(RunFailure::UnknownInterpreter);
    };

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|err| RunFailure::SpawnFailed(err.to_string()))?;

    let mut stdout = child.stdout.take().expect("stdout was piped");
    let read_handle = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stdout.read_to_end(&mut buf).await;
        buf
    });

    match tokio::time::timeout(timeout, child.wait()).await {
        Err(_) => {
            let _ = child.kill().await;
            read_handle.abort();
            Err(RunFailure::TimedOut)
        }
        Ok(Err(_)) => Err(RunFailure::Crashed),
        Ok(Ok(status)) => {
            let buf = read_handle.await.unwrap_or_default();
            if !status.success() {
                return Err(RunFailure::Crashed);
            }
            let ts = now();
            let stdout = String::from_utf8_lossy(&buf);
            let flags = flag_regex
                .find_iter(&stdout)
                .map(|m| CapturedFlag {
                    flag: m.as_str().to_string(),
                    ts,
                })
                .collect();
            Ok(RunOutcome { flags })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_flags_from_stdout() {
        let re = Regex::new(r"[A-Z0-9]{31}=").unwrap();
        let outcome = run_exploit(
            Path::new("/bin/echo"),
            "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA= BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB=",
            Duration::from_secs(2),
            &re,
            None,
        )
        .await
        .unwrap();
        assert_eq!(outcome.flags.len(), 2);
    }

    #[tokio::test]
    async fn zero_matches_is_still_a_success() {
        let re = Regex::new(r"[A-Z0-9]{31}=").unwrap();
        let outcome = run_exploit(Path::new("/bin/echo"), "nothing here", Duration::from_secs(2), &re, None)
            .await
            .unwrap();
        assert!(outcome.flags.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_crashed() {
        let re = Regex::new(r"[A-Z0-9]{31}=").unwrap();
        let err = run_exploit(Path::new("/bin/false"), "team", Duration::from_secs(2), &re, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunFailure::Crashed));
    }

    #[tokio::test]
    async fn hangs_past_timeout_are_killed() {
        let re = Regex::new(r"[A-Z0-9]{31}=").unwrap();
        let mut cmd_path = Path::new("/bin/sleep");
        if !cmd_path.exists() {
            cmd_path = Path::new("/usr/bin/sleep");
        }
        let err = run_exploit(cmd_path, "5", Duration::from_millis(100), &re, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RunFailure::TimedOut));
    }
}
