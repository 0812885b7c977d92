//! Line-oriented TCP submitter adapter (§4.2).

use crate::SubmitError;
use async_trait::async_trait;
use flagfarm_protocol::{Flag, Verdict, VerdictStatus};
use std::collections::HashSet;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub struct TcpSubmitter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpSubmitter {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, SubmitError> {
        let rest = url
            .strip_prefix("tcp://")
            .ok_or_else(|| SubmitError::InvalidUrl(url.to_string()))?;
        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => (
                host.to_string(),
                port.parse()
                    .map_err(|_| SubmitError::InvalidUrl(url.to_string()))?,
            ),
            None => (rest.to_string(), flagfarm_protocol::defaults::DEFAULT_TCP_PORT),
        };
        Ok(Self {
            host,
            port,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    fn pair(flag_set: &HashSet<&str>, fallback_flag: &str, raw_line: &[u8]) -> Verdict {
        let line = match std::str::from_utf8(raw_line) {
            Ok(s) => s,
            Err(_) => {
                return Verdict {
                    flag: fallback_flag.to_string(),
                    status: VerdictStatus::Unknown,
                    message: None,
                }
            }
        };
        let trimmed = line.trim_end_matches(['\r', '\n']);
        let mut parts = trimmed.splitn(2, ' ');
        let first = parts.next().unwrap_or("");

        let (flag, message) = if flag_set.contains(first) {
            (first.to_string(), parts.next().unwrap_or("").to_string())
        } else {
            (fallback_flag.to_string(), trimmed.to_string())
        };

        let status = if message == "OK" {
            VerdictStatus::Accepted
        } else {
            VerdictStatus::Rejected
        };

        Verdict {
            flag,
            status,
            message: Some(message),
        }
    }
}

#[async_trait]
impl crate::Submitter for TcpSubmitter {
    async fn submit(&self, batch: &[Flag]) -> Vec<Verdict> {
        let addr = format!("{}:{}", self.host, self.port);
        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            _ => {
                tracing::warn!(%addr, "tcp submitter failed to connect");
                return Vec::new();
            }
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let flag_set: HashSet<&str> = batch.iter().map(|f| f.flag.as_str()).collect();
        let mut verdicts = Vec::with_capacity(batch.len());

        for item in batch {
            let line = format!("{}\n", item.flag);
            if tokio::time::timeout(self.timeout, write_half.write_all(line.as_bytes()))
                .await
                .is_err()
            {
                break;
            }

            let mut raw = Vec::new();
            let read = tokio::time::timeout(self.timeout, reader.read_until(b'\n', &mut raw)).await;
            match read {
                Ok(Ok(0)) | Err(_) => break, // connection closed or timed out
                Ok(Ok(_)) => verdicts.push(Self::pair(&flag_set, &item.flag, &raw)),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, "tcp submitter read error");
                    break;
                }
            }
        }

        verdicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_port() {
        let sub = TcpSubmitter::new("tcp://game.ctf", 5).unwrap();
        assert_eq!(sub.host, "game.ctf");
        assert_eq!(sub.port, flagfarm_protocol::defaults::DEFAULT_TCP_PORT);
    }

    #[test]
    fn parses_explicit_port() {
        let sub = TcpSubmitter::new("tcp://game.ctf:9999", 5).unwrap();
        assert_eq!(sub.port, 9999);
    }

    #[test]
    fn pairs_bare_ok_message_as_accepted() {
        let set: HashSet<&str> = ["AAAA="].into_iter().collect();
        let v = TcpSubmitter::pair(&set, "AAAA=", b"OK\n");
        assert_eq!(v.flag, "AAAA=");
        assert_eq!(v.status, VerdictStatus::Accepted);
    }

    #[test]
    fn pairs_flag_prefixed_message_by_embedded_token() {
        let set: HashSet<&str> = ["AAAA=", "BBBB="].into_iter().collect();
        let v = TcpSubmitter::pair(&set, "AAAA=", b"BBBB= too old\n");
        assert_eq!(v.flag, "BBBB=");
        assert_eq!(v.status, VerdictStatus::Rejected);
    }

    #[test]
    fn non_utf8_line_yields_unknown() {
        let set: HashSet<&str> = ["AAAA="].into_iter().collect();
        let v = TcpSubmitter::pair(&set, "AAAA=", &[0xff, 0xfe, b'\n']);
        assert_eq!(v.status, VerdictStatus::Unknown);
    }
}
