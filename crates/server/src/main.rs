use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use predictor::LinearModel;
use server_api::{evaluate, store_record, ApiContext, Evaluation};
use shared::{
    domain::PatientRecord,
    error::{ApiError, ErrorCode},
    protocol::{EvaluateRequest, FormInputs},
};
use tower_http::{limit::RequestBodyLimitLayer, services::ServeDir};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod page;

use app_state::AppState;
use config::{load_settings, prepare_model_path};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let model_path = prepare_model_path(&settings.model_path)?;
    let model = LinearModel::load(&model_path).map_err(|error| {
        error!(
            model_path = %model_path.display(),
            %error,
            "failed to load model artifact; verify the file is a valid linear model export"
        );
        error
    })?;

    let assets_dir = PathBuf::from(&settings.assets_dir);
    if !assets_dir.is_dir() {
        warn!(
            assets_dir = %assets_dir.display(),
            "assets directory not found; result images will be missing"
        );
    }

    let state = AppState {
        api: ApiContext::new(Arc::new(model)),
        assets_dir,
        index_html: page::render_index(),
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let assets = ServeDir::new(&state.assets_dir);
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route(page::STORE_ROUTE, post(store_data))
        .route(page::EVALUATE_ROUTE, post(make_prediction))
        .nest_service("/assets", assets)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.clone())
}

async fn store_data(
    payload: Result<Json<FormInputs>, JsonRejection>,
) -> Result<Json<PatientRecord>, (StatusCode, Json<ApiError>)> {
    let Json(inputs) = payload.map_err(rejected)?;
    Ok(Json(store_record(&inputs)))
}

async fn make_prediction(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Response, (StatusCode, Json<ApiError>)> {
    let Json(req) = payload.map_err(rejected)?;
    let outcome = evaluate(&state.api, req.n_clicks, req.data.as_ref())
        .map_err(|e| (status_for(&e.code), Json(e)))?;

    Ok(match outcome {
        Evaluation::NoUpdate => StatusCode::NO_CONTENT.into_response(),
        Evaluation::Empty => Html(String::new()).into_response(),
        Evaluation::Rendered(risk) => Html(page::result_panel(risk)).into_response(),
    })
}

fn rejected(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    warn!(error = %rejection.body_text(), "rejected request body");
    (
        rejection.status(),
        Json(ApiError::new(ErrorCode::Validation, rejection.body_text())),
    )
}

fn status_for(code: &ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
