use super::*;
use axum::{
    body::{self, Body},
    http::{header, Request},
};
use predictor::{Classifier, ModelError};
use std::{
    env, fs,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;

const REPO_MODEL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/finalmodel.json");

struct FixedLabel(i64);

impl Classifier for FixedLabel {
    fn predict(&self, _record: &PatientRecord) -> Result<i64, ModelError> {
        Ok(self.0)
    }
}

struct AlwaysFails;

impl Classifier for AlwaysFails {
    fn predict(&self, _record: &PatientRecord) -> Result<i64, ModelError> {
        Err(ModelError::MissingFeature("Age"))
    }
}

fn test_app_with(classifier: Arc<dyn Classifier>, assets_dir: PathBuf) -> Router {
    build_router(Arc::new(AppState {
        api: ApiContext::new(classifier),
        assets_dir,
        index_html: page::render_index(),
    }))
}

fn test_app(label: i64) -> Router {
    test_app_with(Arc::new(FixedLabel(label)), env::temp_dir().join("no_assets"))
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

const REFERENCE_INPUTS: &str = r#"{
    "age": 55, "sex": "M", "chest_pain": "ASY", "bp": 140, "cholesterol": 60,
    "blood_sugar": 0, "resting_ecg": "Normal", "maximum_hr": 120,
    "exercise_angina": "Y", "oldpeak": 1.5, "st_slope": "Flat"
}"#;

#[tokio::test]
async fn healthz_reports_ok() {
    let response = test_app(0)
        .oneshot(Request::get("/healthz").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn index_serves_the_form() {
    let response = test_app(0)
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("id=\"submit-val\""));
    assert!(html.contains("\"storeKey\":\"store-data\""));
}

#[tokio::test]
async fn store_returns_record_keyed_by_column() {
    let response = test_app(0)
        .oneshot(post_json("/api/store", REFERENCE_INPUTS))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let value: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(value["Age"], 55);
    assert_eq!(value["ChestPainType"], "ASY");
    assert_eq!(value["FastingBS"], 0);
    assert_eq!(value["Oldpeak"], 1.5);
    assert_eq!(value["ST_Slope"], "Flat");
}

#[tokio::test]
async fn store_drops_values_the_widget_refuses() {
    let response = test_app(0)
        .oneshot(post_json("/api/store", r#"{"age": 130, "maximum_hr": 80}"#))
        .await
        .expect("response");
    let value: serde_json::Value =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert!(value["Age"].is_null());
    assert_eq!(value["MaxHR"], 80);
    assert!(value["Sex"].is_null());
}

#[tokio::test]
async fn store_rejects_unknown_dropdown_values() {
    let response = test_app(0)
        .oneshot(post_json("/api/store", r#"{"sex": "X"}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("error");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let padding = "x".repeat(MAX_BODY_BYTES + 6 * 1024);
    let body = format!(r#"{{"age": 55, "padding": "{padding}"}}"#);
    let response = test_app(0)
        .oneshot(post_json("/api/store", &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("error");
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn evaluate_without_clicks_renders_nothing() {
    let response = test_app(1)
        .oneshot(post_json(
            "/api/evaluate",
            r#"{"n_clicks": 0, "data": {"Age": 55}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn evaluate_without_stored_record_is_no_content() {
    for body in [r#"{"n_clicks": 2}"#, r#"{"n_clicks": 2, "data": null}"#] {
        let response = test_app(1)
            .oneshot(post_json("/api/evaluate", body))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{body}");
    }
}

#[tokio::test]
async fn evaluate_renders_panel_for_label() {
    let response = test_app(1)
        .oneshot(post_json("/api/evaluate", r#"{"n_clicks": 1, "data": {}}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert_eq!(html, page::result_panel(shared::protocol::RiskClass::AtRisk));

    let response = test_app(0)
        .oneshot(post_json("/api/evaluate", r#"{"n_clicks": 1, "data": {}}"#))
        .await
        .expect("response");
    let html = body_text(response).await;
    assert_eq!(
        html,
        page::result_panel(shared::protocol::RiskClass::NotAtRisk)
    );
}

#[tokio::test]
async fn evaluate_rejects_out_of_domain_stored_record() {
    let response = test_app(1)
        .oneshot(post_json(
            "/api/evaluate",
            r#"{"n_clicks": 1, "data": {"RestingBP": 0}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn model_failure_is_a_generic_server_error() {
    let app = test_app_with(Arc::new(AlwaysFails), env::temp_dir().join("no_assets"));
    let response = app
        .oneshot(post_json("/api/evaluate", r#"{"n_clicks": 1, "data": {}}"#))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("error");
    assert_eq!(err.code, ErrorCode::Internal);
    assert!(!err.message.contains("Age"));
}

#[tokio::test]
async fn reference_patient_round_trips_through_store_and_evaluate() {
    let model = LinearModel::load(REPO_MODEL).expect("model");
    let app = test_app_with(Arc::new(model.clone()), env::temp_dir().join("no_assets"));

    let response = app
        .clone()
        .oneshot(post_json("/api/store", REFERENCE_INPUTS))
        .await
        .expect("store response");
    let stored = body_text(response).await;
    let record: PatientRecord = serde_json::from_str(&stored).expect("record");
    assert!(record.is_complete());

    let response = app
        .oneshot(post_json(
            "/api/evaluate",
            &format!(r#"{{"n_clicks": 1, "data": {stored}}}"#),
        ))
        .await
        .expect("evaluate response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;

    let expected = shared::protocol::RiskClass::from_label(model.predict(&record).expect("predict"))
        .expect("binary label");
    assert_eq!(html, page::result_panel(expected));
}

#[tokio::test]
async fn assets_are_served_from_the_configured_directory() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let root = env::temp_dir().join(format!("heart_predictor_assets_{suffix}"));
    fs::create_dir_all(root.join("images")).expect("assets dir");
    fs::write(root.join("images").join("healthy-heart.svg"), "<svg/>").expect("image");

    let app = test_app_with(Arc::new(FixedLabel(0)), root.clone());
    let response = app
        .oneshot(
            Request::get("/assets/images/healthy-heart.svg")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "<svg/>");

    fs::remove_dir_all(root).expect("cleanup");
}
