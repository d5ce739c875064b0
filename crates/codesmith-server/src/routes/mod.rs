pub mod form;
pub mod run;

use axum::{routing::get, Router};

use crate::state::AppState;

async fn status() -> &'static str {
    "ok"
}

pub fn configure(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .merge(form::routes(state.clone()))
        .merge(run::routes(state))
}
