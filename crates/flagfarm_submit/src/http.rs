//! HTTP-JSON submitter adapter (§4.2), the ForcAD wire profile.

use crate::SubmitError;
use async_trait::async_trait;
use flagfarm_protocol::naming::strip_flag_prefix;
use flagfarm_protocol::{Flag, Verdict, VerdictStatus};
use serde_json::Value;
use std::time::Duration;

pub struct HttpSubmitter {
    client: reqwest::Client,
    url: String,
    team_token: String,
}

impl HttpSubmitter {
    pub fn new(url: &str, team_token: &str, timeout_secs: u64) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SubmitError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            team_token: team_token.to_string(),
        })
    }

    fn map_status(raw: &str) -> VerdictStatus {
        match raw.to_ascii_uppercase().as_str() {
            "ACCEPTED" => VerdictStatus::Accepted,
            "DENIED" | "RESUBMIT" | "ERROR" => VerdictStatus::Rejected,
            _ => VerdictStatus::Unknown,
        }
    }

    fn parse_response(body: &Value) -> Vec<Verdict> {
        let items: Vec<&Value> = match body {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![body],
            _ => return Vec::new(),
        };

        items
            .into_iter()
            .filter_map(|item| {
                let obj = item.as_object()?;
                let flag = obj.get("flag")?.as_str()?.to_string();
                let status = obj
                    .get("status")
                    .and_then(Value::as_str)
                    .map(Self::map_status)
                    .unwrap_or(VerdictStatus::Unknown);
                let raw_message = obj
                    .get("msg")
                    .or_else(|| obj.get("message"))
                    .and_then(Value::as_str)
                    .map(|m| strip_flag_prefix(&flag, m));
                Some(Verdict {
                    flag,
                    status,
                    message: raw_message,
                })
            })
            .collect()
    }
}

#[async_trait]
impl crate::Submitter for HttpSubmitter {
    async fn submit(&self, batch: &[Flag]) -> Vec<Verdict> {
        let flags: Vec<&str> = batch.iter().map(|f| f.flag.as_str()).collect();

        let response = match self
            .client
            .put(&self.url)
            .header("X-Team-Token", &self.team_token)
            .json(&flags)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(err) => {
                tracing::warn!(error = %err, "submit request failed");
                return Vec::new();
            }
        };

        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!(error = %err, "submit response was not valid JSON");
                return Vec::new();
            }
        };

        Self::parse_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_forcad_statuses() {
        assert_eq!(HttpSubmitter::map_status("ACCEPTED"), VerdictStatus::Accepted);
        assert_eq!(HttpSubmitter::map_status("DENIED"), VerdictStatus::Rejected);
        assert_eq!(HttpSubmitter::map_status("RESUBMIT"), VerdictStatus::Rejected);
        assert_eq!(HttpSubmitter::map_status("ERROR"), VerdictStatus::Rejected);
        assert_eq!(HttpSubmitter::map_status("GAME_NOT_STARTED"), VerdictStatus::Unknown);
    }

    #[test]
    fn parses_array_response_and_strips_flag_prefix() {
        let body = serde_json::json!([
            {"flag": "AAAA=", "status": "ACCEPTED", "msg": "[AAAA=] nice"},
            {"flag": "BBBB=", "status": "DENIED", "message": "too late"},
        ]);
        let verdicts = HttpSubmitter::parse_response(&body);
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].flag, "AAAA=");
        assert_eq!(verdicts[0].status, VerdictStatus::Accepted);
        assert_eq!(verdicts[0].message.as_deref(), Some("nice"));
        assert_eq!(verdicts[1].status, VerdictStatus::Rejected);
    }

    #[test]
    fn wraps_single_object_response() {
        let body = serde_json::json!({"flag": "AAAA=", "status": "ACCEPTED"});
        let verdicts = HttpSubmitter::parse_response(&body);
        assert_eq!(verdicts.len(), 1);
    }

    #[test]
    fn drops_items_missing_flag_field() {
        let body = serde_json::json!([{"status": "ACCEPTED"}]);
        assert!(HttpSubmitter::parse_response(&body).is_empty());
    }

    #[test]
    fn non_list_non_object_top_level_yields_no_verdicts() {
        let body = serde_json::json!("not a list");
        assert!(HttpSubmitter::parse_response(&body).is_empty());
    }
}
