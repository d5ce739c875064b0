use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context;

use crate::state::AppState;
use crate::submission::{Mode, Submission};

#[derive(Debug, Deserialize)]
pub struct FormInput {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    mode: Mode,
    #[serde(default)]
    language: String,
    #[serde(default)]
    text: String,
}

impl FormInput {
    fn submission(&self) -> Submission {
        Submission {
            mode: self.mode,
            language: self.language.clone(),
            text: self.text.clone(),
        }
    }
}

/// What the page shows under the form after a submit
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outcome {
    Warning { message: String },
    Error { message: String },
    Code { language: String, text: String },
    Prose { text: String },
}

fn render(state: &AppState, submission: &Submission, outcome: Option<&Outcome>) -> Response {
    let mut context = Context::new();
    context.insert("submission", submission);
    context.insert("outcome", &outcome);

    match state.templates.render("form.html", &context) {
        Ok(page) => Html(page).into_response(),
        Err(e) => {
            tracing::error!("Failed to render form: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response()
        }
    }
}

async fn show_form(State(state): State<AppState>) -> Response {
    render(&state, &Submission::default(), None)
}

async fn submit_form(State(state): State<AppState>, Form(input): Form<FormInput>) -> Response {
    let submission = input.submission();
    let outcome = run_submission(&state, &input.api_key, &submission).await;
    render(&state, &submission, Some(&outcome))
}

async fn run_submission(state: &AppState, api_key: &str, submission: &Submission) -> Outcome {
    if api_key.trim().is_empty() {
        return Outcome::Warning {
            message: "Please enter your OpenAI API key.".to_string(),
        };
    }
    if let Err(message) = submission.validate() {
        return Outcome::Warning {
            message: message.to_string(),
        };
    }

    let result = match state.agent(api_key.trim()) {
        Ok(agent) => agent.run(submission.request()).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => match submission.mode {
            Mode::Write => Outcome::Code {
                language: submission.language.trim().to_lowercase(),
                text: output.text,
            },
            Mode::Explain => Outcome::Prose { text: output.text },
        },
        Err(e) => {
            tracing::warn!("Agent failed: {:#}", e);
            Outcome::Error {
                message: format!("Error invoking the agent: {}", e),
            }
        }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_form).post(submit_form))
        .with_state(state)
}
