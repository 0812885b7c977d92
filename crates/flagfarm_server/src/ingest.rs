//! Ingest API (C4, §4.4): normalizes user-submitted flag payloads and hands
//! them to the Flag Store.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

struct Candidate {
    flag: Option<String>,
    ts: Option<i64>,
}

fn as_candidates(body: Value) -> Result<Vec<Candidate>, AppError> {
    let items: Vec<Value> = match body {
        Value::Array(items) => items,
        Value::String(_) | Value::Object(_) => vec![body],
        _ => return Err(AppError::ClientMalformed("expected string, object, or list".into())),
    };

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(flag) => Candidate { flag: Some(flag), ts: None },
            Value::Object(mut obj) => {
                let flag = obj.remove("flag").and_then(|v| v.as_str().map(str::to_string));
                let ts = obj.remove("ts").and_then(|v| v.as_i64());
                Candidate { flag, ts }
            }
            _ => Candidate { flag: None, ts: None },
        })
        .collect())
}

/// `POST /api/flags/<exploit>`.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Path(exploit): Path<String>,
    Json(body): Json<Value>,
) -> Result<StatusCode, AppError> {
    let now = now();
    let lifetime = state.config.lifetime_secs();
    let candidates = as_candidates(body)?;

    let accepted: Vec<(String, i64)> = candidates
        .into_iter()
        .filter_map(|c| c.flag.map(|flag| (flag, c.ts)))
        .filter(|(flag, _)| state.config.flag_regex.0.is_match(flag))
        .map(|(flag, ts)| (flag, ts.unwrap_or(now)))
        .filter(|(_, ts)| ts + lifetime > now)
        .collect();

    let accepted_count = accepted.len();
    if accepted_count > 0 {
        state.flags.insert_many(&accepted, &exploit).await?;
    }
    tracing::info!(exploit = %exploit, accepted = accepted_count, "ingested flags");

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_string() {
        let candidates = as_candidates(Value::String("AAAA=".into())).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].flag.as_deref(), Some("AAAA="));
    }

    #[test]
    fn drops_objects_without_flag_field() {
        let body = serde_json::json!([{"ts": 10}, {"flag": "AAAA="}]);
        let candidates = as_candidates(body).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].flag.is_none());
        assert_eq!(candidates[1].flag.as_deref(), Some("AAAA="));
    }

    #[test]
    fn rejects_non_list_non_object_non_string_top_level() {
        assert!(as_candidates(Value::Number(3.into())).is_err());
        assert!(as_candidates(Value::Bool(true)).is_err());
        assert!(as_candidates(Value::Null).is_err());
    }
}
