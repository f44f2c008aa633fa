use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use shared::domain::{CorrectionLabel, FeedbackLabel, FlagReason, PredictionId, Sentiment};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordedRequest {
    method: Method,
    path: String,
    body: String,
}

#[derive(Clone, Default)]
struct BackendState {
    responses: Arc<HashMap<&'static str, (StatusCode, &'static str)>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl BackendState {
    fn with_responses(responses: &[(&'static str, StatusCode, &'static str)]) -> Self {
        Self {
            responses: Arc::new(
                responses
                    .iter()
                    .map(|(path, status, body)| (*path, (*status, *body)))
                    .collect(),
            ),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().await.clone()
    }
}

async fn handle_any(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    body: String,
) -> impl IntoResponse {
    let path = uri.path().to_string();
    state.requests.lock().await.push(RecordedRequest {
        method,
        path: path.clone(),
        body,
    });
    let (status, body) = state
        .responses
        .get(path.as_str())
        .copied()
        .unwrap_or((StatusCode::NOT_FOUND, "{}"));
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

async fn spawn_backend(state: BackendState) -> std::io::Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().fallback(handle_any).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

#[test]
fn endpoints_join_onto_base_path() {
    let api = HttpSentimentApi::new("http://localhost:5000/app").expect("api");
    assert_eq!(
        api.endpoint(SENTIMENT_PATH).expect("url").as_str(),
        "http://localhost:5000/app/sentiment"
    );
    assert_eq!(
        api.endpoint(MODEL_VERSION_PATH).expect("url").as_str(),
        "http://localhost:5000/app/version/modelversion"
    );

    let api = HttpSentimentApi::new("http://localhost:5000/").expect("api");
    assert_eq!(
        api.endpoint(VERSION_PATH).expect("url").as_str(),
        "http://localhost:5000/version"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    for raw in ["not a url", "mailto:someone@example.com"] {
        let err = HttpSentimentApi::new(raw).err().expect("must fail");
        assert!(
            matches!(err, ClientError::InvalidBaseUrl { .. }),
            "unexpected error for {raw}: {err}"
        );
    }
}

#[tokio::test]
async fn classify_posts_form_encoded_text() {
    let state = BackendState::with_responses(&[(
        "/sentiment",
        StatusCode::OK,
        r#"{"sentiment":1,"prediction_id":"p123"}"#,
    )]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    let result = api.classify("I love this product").await.expect("classify");
    assert_eq!(result.sentiment, Sentiment::Positive);
    assert_eq!(result.prediction_id, Some(PredictionId::new("p123")));
    assert_eq!(result.confidence, None);

    assert_eq!(
        state.recorded().await,
        vec![RecordedRequest {
            method: Method::POST,
            path: "/sentiment".into(),
            body: "text=I+love+this+product".into(),
        }]
    );
}

#[tokio::test]
async fn classify_reads_optional_confidence() {
    let state = BackendState::with_responses(&[(
        "/sentiment",
        StatusCode::OK,
        r#"{"sentiment":0,"confidence":0.873,"prediction_id":"p9"}"#,
    )]);
    let base = spawn_backend(state).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    let result = api.classify("meh").await.expect("classify");
    assert_eq!(result.sentiment, Sentiment::Negative);
    assert_eq!(result.confidence, Some(0.873));
}

#[tokio::test]
async fn feedback_and_correction_bodies_match_wire_format() {
    let state = BackendState::with_responses(&[("/feedback", StatusCode::OK, "{}")]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    api.send_feedback(&FeedbackRequest::feedback(
        PredictionId::new("p123"),
        FeedbackLabel::correct(),
    ))
    .await
    .expect("feedback");
    api.send_feedback(&FeedbackRequest::correction(
        PredictionId::new("p123"),
        CorrectionLabel::new(CorrectionLabel::POSITIVE),
    ))
    .await
    .expect("correction");

    let bodies: Vec<_> = state
        .recorded()
        .await
        .into_iter()
        .map(|request| (request.method, request.path, request.body))
        .collect();
    assert_eq!(
        bodies,
        vec![
            (
                Method::POST,
                "/feedback".to_string(),
                "prediction_id=p123&feedback=correct".to_string()
            ),
            (
                Method::POST,
                "/feedback".to_string(),
                "prediction_id=p123&feedback=incorrect&correction=positive".to_string()
            ),
        ]
    );
}

#[tokio::test]
async fn flag_body_carries_reason() {
    let state = BackendState::with_responses(&[("/flag", StatusCode::OK, "{}")]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    api.flag(&FlagRequest {
        prediction_id: PredictionId::new("p123"),
        reason: FlagReason::from_answer(None),
    })
    .await
    .expect("flag");

    let recorded = state.recorded().await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].path, "/flag");
    assert_eq!(recorded[0].body, "prediction_id=p123&reason=other");
}

#[tokio::test]
async fn relay_ignores_non_json_success_bodies() {
    let state = BackendState::with_responses(&[("/feedback", StatusCode::OK, "OK")]);
    let base = spawn_backend(state).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    api.send_feedback(&FeedbackRequest::feedback(
        PredictionId::new("p1"),
        FeedbackLabel::incorrect(),
    ))
    .await
    .expect("fire-and-forget body is not decoded");
}

#[tokio::test]
async fn versions_read_each_endpoint_with_message_fallback() {
    let state = BackendState::with_responses(&[
        ("/version", StatusCode::OK, r#"{"app_version":"1.4.0"}"#),
        ("/version/appversion", StatusCode::OK, r#"{"message":"1.5.0"}"#),
        (
            "/version/modelversion",
            StatusCode::OK,
            r#"{"model_service_version":"0.9.2"}"#,
        ),
    ]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    assert_eq!(
        api.app_version(VersionSource::Combined).await.expect("combined"),
        "1.4.0"
    );
    assert_eq!(
        api.app_version(VersionSource::Split).await.expect("split"),
        "1.5.0"
    );
    assert_eq!(api.model_version().await.expect("model"), "0.9.2");

    let recorded = state.recorded().await;
    assert!(recorded.iter().all(|request| request.method == Method::GET));
    assert!(recorded.iter().all(|request| request.body.is_empty()));
}

#[tokio::test]
async fn malformed_bodies_are_decode_failures() {
    let state = BackendState::with_responses(&[
        ("/version", StatusCode::OK, r#"{"unrelated":true}"#),
        ("/version/modelversion", StatusCode::OK, "<html>"),
        ("/sentiment", StatusCode::OK, r#"{"prediction_id":"p1"}"#),
    ]);
    let base = spawn_backend(state).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    let err = api
        .app_version(VersionSource::Combined)
        .await
        .expect_err("no version field");
    assert!(matches!(err, ClientError::MissingVersion { endpoint: "version" }));
    assert!(err.is_decode());

    let err = api.model_version().await.expect_err("not json");
    assert!(err.is_decode(), "unexpected error: {err}");

    let err = api.classify("text").await.expect_err("missing sentiment");
    assert!(err.is_decode(), "unexpected error: {err}");
}

#[tokio::test]
async fn error_statuses_still_decode_the_body() {
    let state = BackendState::with_responses(&[
        (
            "/sentiment",
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"sentiment":1,"prediction_id":"p1"}"#,
        ),
        ("/version", StatusCode::SERVICE_UNAVAILABLE, "upstream down"),
    ]);
    let base = spawn_backend(state).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    let result = api.classify("text").await.expect("body decoded despite 500");
    assert_eq!(result.prediction_id, Some(PredictionId::new("p1")));

    let err = api
        .app_version(VersionSource::Combined)
        .await
        .expect_err("non-json error body");
    assert!(err.is_decode(), "unexpected error: {err}");
}

#[tokio::test]
async fn relays_complete_on_error_statuses() {
    let state = BackendState::with_responses(&[
        ("/feedback", StatusCode::INTERNAL_SERVER_ERROR, "{}"),
        ("/flag", StatusCode::BAD_REQUEST, "{}"),
    ]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let api = HttpSentimentApi::new(&base).expect("api");

    api.send_feedback(&FeedbackRequest::feedback(
        PredictionId::new("p1"),
        FeedbackLabel::correct(),
    ))
    .await
    .expect("feedback completes");
    api.flag(&FlagRequest {
        prediction_id: PredictionId::new("p1"),
        reason: FlagReason::from_answer(None),
    })
    .await
    .expect("flag completes");

    assert_eq!(state.recorded().await.len(), 2);
}

#[tokio::test]
async fn refused_connections_are_transport_failures() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let api = HttpSentimentApi::new(&format!("http://{addr}")).expect("api");

    let err = api.model_version().await.expect_err("refused");
    assert!(err.is_transport(), "unexpected error: {err}");

    let err = api
        .send_feedback(&FeedbackRequest::feedback(
            PredictionId::new("p1"),
            FeedbackLabel::correct(),
        ))
        .await
        .expect_err("refused");
    assert!(err.is_transport(), "unexpected error: {err}");
}

#[tokio::test]
async fn controller_confirms_feedback_answered_with_server_error() {
    let state = BackendState::with_responses(&[
        (
            "/sentiment",
            StatusCode::OK,
            r#"{"sentiment":1,"prediction_id":"p123"}"#,
        ),
        ("/feedback", StatusCode::INTERNAL_SERVER_ERROR, "{}"),
    ]);
    let base = spawn_backend(state.clone()).await.expect("spawn backend");
    let controller = Controller::new(
        Arc::new(HttpSentimentApi::new(&base).expect("api")),
        Arc::new(DismissingPrompter),
        ControllerOptions::default(),
    );

    controller
        .submit(SubmitForm::text("I love this product"))
        .await;
    controller
        .dispatch(Action::Feedback(FeedbackLabel::correct()))
        .await
        .expect("dispatched")
        .await
        .expect("relay task");

    let feedback_posts = state
        .recorded()
        .await
        .into_iter()
        .filter(|request| request.path == "/feedback")
        .count();
    assert_eq!(feedback_posts, 1);
    assert_eq!(
        controller.snapshot().await.confirmation.as_deref(),
        Some("Thank you for your feedback!")
    );
}
