pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;
use crate::store::handlers as resume;
use crate::tailoring::handlers as tailoring;

/// Uploads and request bodies are capped at 16 MiB.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Resume + context
        .route("/upload", post(resume::handle_upload))
        .route("/current-resume", get(resume::handle_current_resume))
        .route(
            "/rag-context",
            get(resume::handle_get_context).post(resume::handle_update_context),
        )
        // Tailoring
        .route("/tailor", post(tailoring::handle_tailor))
        .route("/compiled/:filename", get(tailoring::handle_download))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// The browser extension is the only intended client.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.as_bytes().starts_with(b"chrome-extension://")
        }))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::compiler::PdfLatexCompiler;
    use crate::db::test_pool;
    use crate::llm_client::{LlmClient, LlmSettings};
    use crate::store::ResumeStore;
    use crate::tailoring::artifacts::ArtifactStore;
    use crate::tailoring::{FitPolicy, Tailor};

    const BOUNDARY: &str = "tailor-test-boundary";

    /// No API key and no pdflatex: nothing in these tests leaves the process.
    async fn test_state(artifact_dir: &Path) -> AppState {
        let store = Arc::new(ResumeStore::new(test_pool().await));
        let llm = LlmClient::new(LlmSettings {
            api_url: "http://127.0.0.1:9/chat/completions".into(),
            api_key: None,
            model: "sonar".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        let compiler = PdfLatexCompiler::new("tailor-test-no-pdflatex", Duration::from_secs(1));
        let artifacts = ArtifactStore::new(artifact_dir);
        let tailor = Tailor::new(
            Arc::clone(&store),
            Arc::new(llm),
            Arc::new(compiler),
            artifacts.clone(),
            FitPolicy::default(),
        );
        AppState {
            store,
            tailor: Arc::new(tailor),
            artifacts,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn upload_req(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n\
             {content}\r\n\
             --{BOUNDARY}--\r\n"
        );
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);
        let (status, body) = send_json(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_upload_then_current_resume() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);

        let (status, body) = send_json(&app, get_req("/current-resume")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"loaded": false}));

        let doc = "\\documentclass{article}\n\\begin{document}\nJane Doe\n\\end{document}";
        let (status, body) = send_json(&app, upload_req("Jane Doe.tex", doc)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["success"], true);
        assert_eq!(body["filename"], "Jane_Doe.tex");
        assert_eq!(body["file_type"], "tex");
        assert_eq!(body["preview"], doc);
        assert_eq!(body["persisted"], true);

        let (_, body) = send_json(&app, get_req("/current-resume")).await;
        assert_eq!(body["loaded"], true);
        assert_eq!(body["filename"], "Jane_Doe.tex");
        assert_eq!(body["persisted"], true);
        let loaded_at = body["loaded_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(loaded_at).is_ok(), "{loaded_at}");
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);
        let (status, body) = send_json(&app, upload_req("cv.docx", "PK")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_tailor_without_resume() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);
        let (status, body) = send_json(
            &app,
            post_json("/tailor", json!({"job_description": "Rust engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "NO_RESUME_LOADED");
    }

    #[tokio::test]
    async fn test_tailor_rejects_empty_job_description() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);
        let (status, body) =
            send_json(&app, post_json("/tailor", json!({"job_description": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_tailor_without_credential_is_auth_error() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);
        send(&app, upload_req("cv.txt", "Jane Doe\nEngineer")).await;

        let (status, body) = send_json(
            &app,
            post_json("/tailor", json!({"job_description": "Rust engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "LLM_AUTH_ERROR");
    }

    #[tokio::test]
    async fn test_rag_context_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await);

        let (_, body) = send_json(&app, get_req("/rag-context")).await;
        assert_eq!(body, json!({"context": ""}));

        let (status, body) = send_json(
            &app,
            post_json("/rag-context", json!({"context": "Led the storage team"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));

        let (_, body) = send_json(&app, get_req("/rag-context")).await;
        assert_eq!(body["context"], "Led the storage team");
    }

    #[tokio::test]
    async fn test_compiled_download() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(dir.path()).await;
        state
            .artifacts
            .publish("jane", &Bytes::from_static(b"%PDF-1.5"))
            .await
            .unwrap();
        let app = build_router(state);

        let response = app.clone().oneshot(get_req("/compiled/jane.pdf")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/pdf")
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"%PDF-1.5");

        let (status, body) = send_json(&app, get_req("/compiled/missing.pdf")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_cors_allows_extension_origin_only() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(test_state(dir.path()).await).layer(cors_layer());

        let allowed = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "chrome-extension://abcdefghijklmnop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "chrome-extension://abcdefghijklmnop"
        );

        let denied = app
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
