//! HTTP-style invocation glue around [`ReportEngine`].
//!
//! Preflight requests and wrong verbs are answered before any configuration is read or any
//! collaborator is touched.

use crate::core::report::{ReportEngine, ReportOutcome};
use crate::core::{EmailDispatcher, OrderStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const EXPECTED_METHOD: &str = "POST";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerRequest {
    /// Absent for scheduled or direct invocations.
    #[serde(default, alias = "httpMethod", alias = "method")]
    pub http_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

fn cors_headers() -> HashMap<String, String> {
    HashMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            "authorization, x-client-info, apikey, content-type".to_string(),
        ),
    ])
}

impl TriggerResponse {
    pub fn json(status_code: u16, body: &serde_json::Value) -> Self {
        let mut headers = cors_headers();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code,
            headers,
            body: body.to_string(),
        }
    }

    pub fn from_outcome(outcome: &ReportOutcome) -> Self {
        Self::json(outcome.status_code(), &outcome.to_body())
    }
}

/// Answers requests that must not start a report run.
pub fn short_circuit(request: &TriggerRequest) -> Option<TriggerResponse> {
    let method = request.http_method.as_deref()?.to_ascii_uppercase();
    if method == "OPTIONS" {
        return Some(TriggerResponse {
            status_code: 200,
            headers: cors_headers(),
            body: "ok".to_string(),
        });
    }
    if method != EXPECTED_METHOD {
        tracing::warn!(%method, "Rejected report trigger with unexpected method");
        return Some(TriggerResponse::json(
            405,
            &serde_json::json!({ "error": format!("Method {} not allowed", method) }),
        ));
    }
    None
}

pub async fn handle<S, D>(
    engine: &ReportEngine<S, D>,
    request: &TriggerRequest,
    now: DateTime<Utc>,
) -> TriggerResponse
where
    S: OrderStore,
    D: EmailDispatcher,
{
    if let Some(response) = short_circuit(request) {
        return response;
    }
    let run = engine.run_at(now).await;
    TriggerResponse::from_outcome(&run.outcome)
}
