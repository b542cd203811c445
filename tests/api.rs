use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use credit_scoring::config::{FeaturesConfig, ServerConfig};
use credit_scoring::models::pipeline::split_target;
use credit_scoring::models::{Classifier, ClassifierKind, ModelArtifact, ParamSet, ScoringPipeline};
use credit_scoring::server::{build_router, AppState};
use credit_scoring::synthetic::ApplicantGenerator;
use credit_scoring::types::CreditApplication;
use http_body_util::BodyExt;
use ndarray::Array1;
use serde_json::Value;
use tower::ServiceExt;

fn fitted_artifact() -> ModelArtifact {
    let mut raw = ApplicantGenerator::new(11).raw_table(400, 0.3, "ID", "default");
    raw.drop_column("ID").unwrap();
    let (predictors, labels) = split_target(&raw, "default").unwrap();

    let features = FeaturesConfig::default();
    let pipeline = ScoringPipeline::fit(
        &predictors,
        &labels,
        &features.numeric_features,
        &features.categorical_features,
        ClassifierKind::LogisticRegression.build(&ParamSet::new()).unwrap(),
    )
    .unwrap();
    ModelArtifact::new(pipeline, ParamSet::new(), 0.8)
}

fn app() -> (Router, AppState) {
    let state = AppState::new(fitted_artifact(), &ServerConfig::default());
    (build_router(state.clone()), state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn root_and_health() {
    let (app, _) = app();

    let (status, body) = send(app.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Credit Scoring API is running");

    let (status, body) = send(app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "status": "healthy" }));
}

#[tokio::test]
async fn predict_returns_consistent_label() {
    let (app, state) = app();
    let mut risky = ApplicantGenerator::new(5).generate_risky();
    risky.pay_0 = 3;

    let (status, body) = send(app.clone(), post_json("/predict", serde_json::to_string(&risky).unwrap())).await;
    assert_eq!(status, StatusCode::OK);

    let probability = body["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    let expected_label = if probability > 0.5 { 1 } else { 0 };
    assert_eq!(body["prediction"], expected_label);
    let expected_class = if expected_label == 1 { "default" } else { "non-default" };
    assert_eq!(body["class_name"], expected_class);
    assert!(body["risk_level"].is_string());

    let direct = state.artifact.score(&risky).unwrap();
    assert!((direct - probability).abs() < 1e-12);

    let (_, metrics) = send(app, get("/metrics")).await;
    assert_eq!(metrics["predictions_total"], 1);
    assert_eq!(metrics["requests_total"], 2);
}

#[tokio::test]
async fn risky_applicant_scores_above_reliable_one() {
    let (app, _) = app();
    let mut generator = ApplicantGenerator::new(9);

    let risky = generator.generate_risky();
    let reliable = generator.generate_reliable();
    let (_, risky_body) = send(app.clone(), post_json("/predict", serde_json::to_string(&risky).unwrap())).await;
    let (_, reliable_body) = send(app, post_json("/predict", serde_json::to_string(&reliable).unwrap())).await;

    assert!(risky_body["probability"].as_f64().unwrap() > reliable_body["probability"].as_f64().unwrap());
}

#[tokio::test]
async fn predict_rejects_incomplete_body() {
    let (app, _) = app();
    let (status, _) = send(app, post_json("/predict", r#"{"LIMIT_BAL": 20000}"#.to_string())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn predict_rejects_unparseable_body() {
    let (app, state) = app();
    let (status, body) = send(app, post_json("/predict", r#"{"LIMIT_BAL": "#.to_string())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid request body"));
    assert_eq!(state.metrics.snapshot().predictions_total, 0);
}

#[tokio::test]
async fn predict_without_content_type_is_unprocessable() {
    let (app, _) = app();
    let application = CreditApplication::new(50_000.0, 35);
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from(serde_json::to_string(&application).unwrap()))
        .unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn scoring_failure_returns_prediction_error() {
    let mut artifact = fitted_artifact();
    if let Classifier::LogisticRegression(model) = &mut artifact.pipeline.classifier {
        model.coefficients = Some(Array1::zeros(3));
    }
    let app = build_router(AppState::new(artifact, &ServerConfig::default()));

    let application = CreditApplication::new(50_000.0, 35);
    let (status, body) = send(app.clone(), post_json("/predict", serde_json::to_string(&application).unwrap())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("Prediction error: "), "{detail}");
    assert!(detail.contains("dimension mismatch"), "{detail}");

    let (_, metrics) = send(app, get("/metrics")).await;
    assert_eq!(metrics["errors_total"], 1);
    assert_eq!(metrics["predictions_total"], 0);
}

#[tokio::test]
async fn predict_accepts_uci_field_names() {
    let (app, _) = app();
    let application = CreditApplication::new(50_000.0, 35);
    let body = serde_json::to_value(&application).unwrap();
    assert!(body.get("PAY_0").is_some());
    assert!(body.get("LIMIT_BAL").is_some());

    let (status, _) = send(app, post_json("/predict", body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn model_metadata() {
    let (app, _) = app();
    let (status, body) = send(app, get("/model")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classifier"], "logistic_regression");
    assert_eq!(body["cv_score"], 0.8);
    assert_eq!(body["threshold"], 0.5);
    assert!(body["n_features"].as_u64().unwrap() > 0);
}
