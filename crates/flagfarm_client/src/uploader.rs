//! Flag Uploader (C7, §4.7): buffers captured tokens and pushes them to
//! the farm server, keeping anything the server did not acknowledge.

use crate::remote::RemoteSession;
use crate::runner::CapturedFlag;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct FlagUploader {
    session: Arc<RemoteSession>,
    exploit_name: String,
    buffer: Mutex<Vec<CapturedFlag>>,
}

impl FlagUploader {
    pub fn new(session: Arc<RemoteSession>, exploit_name: String) -> Self {
        Self {
            session,
            exploit_name,
            buffer: Mutex::new(Vec::new()),
        }
    }

    pub async fn push(&self, flags: Vec<CapturedFlag>) {
        if flags.is_empty() {
            return;
        }
        self.buffer.lock().await.extend(flags);
    }

    /// Flushes whatever is buffered. The buffer is cleared only when the
    /// server acknowledges with HTTP 200 — any other outcome (network
    /// error, non-200) leaves the buffer intact so the next flush retries
    /// the same tokens (at-least-once, dedup happens server-side).
    pub async fn flush(&self) -> usize {
        let mut buffer = self.buffer.lock().await;
        if buffer.is_empty() {
            return 0;
        }

        let body = json!(buffer
            .iter()
            .map(|captured| json!({ "flag": captured.flag, "ts": captured.ts }))
            .collect::<Vec<_>>());

        match self.session.upload_flags(&self.exploit_name, &body).await {
            Ok(true) => {
                let uploaded = buffer.len();
                buffer.clear();
                uploaded
            }
            Ok(false) => {
                tracing::warn!(buffered = buffer.len(), "flag upload rejected, retaining buffer");
                0
            }
            Err(err) => {
                tracing::warn!(error = %err, buffered = buffer.len(), "flag upload failed, retaining buffer");
                0
            }
        }
    }

    #[cfg(test)]
    pub async fn buffered_len(&self) -> usize {
        self.buffer.lock().await.len()
    }
}
