use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use codesmith::agent::AgentStep;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::state::AppState;
use crate::submission::Submission;

#[derive(Debug, Deserialize)]
struct RunRequest {
    #[serde(flatten)]
    submission: Submission,
    #[serde(default)]
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    output: String,
    steps: Vec<AgentStep>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

// non-interactive counterpart of the form, the key may come from the server config
async fn run_handler(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, ApiError> {
    let api_key = request
        .api_key
        .filter(|key| !key.trim().is_empty())
        .or_else(|| state.api_key.clone())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "an OpenAI API key is required"))?;
    request
        .submission
        .validate()
        .map_err(|message| api_error(StatusCode::BAD_REQUEST, message))?;

    let agent = state
        .agent(&api_key)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    match agent.run(request.submission.request()).await {
        Ok(output) => Ok(Json(RunResponse {
            output: output.text,
            steps: output.steps,
        })),
        Err(e) => {
            tracing::error!("Agent failed: {:#}", e);
            Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error invoking the agent: {}", e),
            ))
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/run", post(run_handler))
        .with_state(state)
}
