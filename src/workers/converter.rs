use serde_json::Value;
use tracing::{info, warn};

use crate::modules::job::dto::JobResponse;
use crate::modules::job::service::JobService;
use crate::state::AppState;

/// Handles one raw job payload end to end and renders the invoker response.
///
/// A payload that is not JSON is treated as an empty event, so it fails
/// validation like any other malformed request.
pub async fn handle_payload(state: &AppState, payload: &[u8]) -> JobResponse {
    info!("📦 Received conversion job ({} bytes)", payload.len());

    let event = match serde_json::from_slice::<Value>(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Job payload is not valid JSON: {}", e);
            Value::Null
        }
    };

    JobService::run(state, &event).await.into()
}
