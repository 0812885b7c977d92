//! The pluggable Submitter (§4.2, §9): delivers a batch of pending flags to
//! the upstream game system and reports back per-flag verdicts.

pub mod http;
pub mod tcp;

use async_trait::async_trait;
use flagfarm_protocol::{Flag, Verdict};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unsupported system_url scheme: {0}")]
    UnsupportedScheme(String),
    #[error("invalid system_url: {0}")]
    InvalidUrl(String),
}

/// A batch submission to the upstream game system. A failed or malformed
/// response returns an empty verdict list rather than an error — per §7 the
/// worker never treats an upstream hiccup as fatal, it just retries the
/// batch next cycle.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, batch: &[Flag]) -> Vec<Verdict>;
}

/// Picks the adapter named by `system_type` + the scheme of `system_url`
/// (§9: tagged variant selected at startup).
pub fn build_submitter(
    system_url: &str,
    team_token: &str,
    submit_timeout_secs: u64,
) -> Result<Box<dyn Submitter>, SubmitError> {
    let scheme = system_url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .ok_or_else(|| SubmitError::InvalidUrl(system_url.to_string()))?;

    match scheme {
        "http" | "https" => Ok(Box::new(http::HttpSubmitter::new(
            system_url,
            team_token,
            submit_timeout_secs,
        )?)),
        "tcp" => Ok(Box::new(tcp::TcpSubmitter::new(
            system_url,
            submit_timeout_secs,
        )?)),
        other => Err(SubmitError::UnsupportedScheme(other.to_string())),
    }
}
