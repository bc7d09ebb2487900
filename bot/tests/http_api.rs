use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pkb_ai::embeddings::Embedder;
use pkb_ai::guardrails::DEFERRAL_MESSAGE;
use pkb_ai::llm::Llm;
use pkb_ai::respond::ReplyMessages;
use pkb_core::error::AppError;
use policybot_lib::config::BotConfig;
use policybot_lib::server::{router, AskResponse, HealthResponse};
use policybot_lib::{indexer, service};
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use tower::ServiceExt;

/// Embeds by counting two marker characters: '病' (sick leave) and '差' (business trip).
struct MarkerEmbedder;

impl Embedder for MarkerEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        let sick = input.chars().filter(|c| *c == '病').count() as f32;
        let trip = input.chars().filter(|c| *c == '差').count() as f32;
        Ok(vec![sick, trip])
    }
}

struct CannedLlm {
    calls: AtomicUsize,
}

impl Llm for CannedLlm {
    fn generate(&self, _model: &str, _system: &str, _prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("病假一年內合計以三十日為限。".to_string())
    }
}

fn write_policies(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("HR-105-01_請假管理辦法_202509.txt"),
        "第五條 病假：員工因病需治療或休養者，一年內合計以三十日為限。病假期間薪資折半發給。",
    )
    .unwrap();
    fs::write(
        dir.join("QP-212-07_國內外出差管理辦法_202401.txt"),
        "第三條 出差：員工因公出差應事先申請，出差旅費依規定核銷。",
    )
    .unwrap();
}

fn config_in(root: &Path) -> BotConfig {
    let mut cfg = BotConfig::default();
    cfg.paths.policies_dir = root.join("policies");
    cfg.paths.index_path = root.join("kb").join("hr_kb_index.json");
    cfg.models.embedding = "marker".to_string();
    cfg
}

async fn post_ask(app: axum::Router, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/ask")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[test]
fn index_command_builds_loadable_artifact() {
    let dir = tempdir().unwrap();
    write_policies(&dir.path().join("policies"));
    let cfg = config_in(dir.path());

    let index = indexer::run_index(&cfg, &MarkerEmbedder).expect("index");
    assert_eq!(index.meta.policies_count, 2);
    assert_eq!(index.meta.embedding_model, "marker");
    assert_eq!(index.items[0].policy_code, "HR-105-01");
    assert!(cfg.paths.index_path.is_file());
}

#[test]
fn index_command_fails_on_missing_directory() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path());

    let err = indexer::run_index(&cfg, &MarkerEmbedder).unwrap_err();
    assert_eq!(err.code, "PKB_INGEST_DIR_MISSING");
    assert!(!cfg.paths.index_path.exists());
}

#[test]
fn responder_requires_a_built_index() {
    let dir = tempdir().unwrap();
    let cfg = config_in(dir.path());
    let err = service::build_responder(
        &cfg,
        Arc::new(MarkerEmbedder),
        Arc::new(CannedLlm {
            calls: AtomicUsize::new(0),
        }),
    )
    .err()
    .expect("no index yet");
    assert_eq!(err.code, "AI_INDEX_NOT_READY");
}

#[tokio::test]
async fn ask_endpoint_answers_and_defers() {
    let dir = tempdir().unwrap();
    write_policies(&dir.path().join("policies"));
    let cfg = config_in(dir.path());
    indexer::run_index(&cfg, &MarkerEmbedder).expect("index");

    let llm = Arc::new(CannedLlm {
        calls: AtomicUsize::new(0),
    });
    let responder = Arc::new(service::build_responder(&cfg, Arc::new(MarkerEmbedder), llm.clone()).unwrap());
    let app = router(responder);

    let (status, body) = post_ask(
        app.clone(),
        serde_json::json!({"question": "病假可以請幾天？", "requester_id": "U-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply: AskResponse = serde_json::from_slice(&body).unwrap();
    let msgs = ReplyMessages::default();
    assert!(reply.reply.starts_with(&msgs.intro));
    assert!(reply.reply.contains("根據 202509 版《請假管理辦法》（HR-105-01）：\n病假一年內合計以三十日為限。"));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

    let (status, body) = post_ask(
        app.clone(),
        serde_json::json!({"question": "今天午餐吃什麼？", "requester_id": "U-1"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply: AskResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(reply.reply, DEFERRAL_MESSAGE);
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

    let (status, _) = post_ask(app, serde_json::json!({"question": "病假", "requester_id": " "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn healthz_reports_loaded_index() {
    let dir = tempdir().unwrap();
    write_policies(&dir.path().join("policies"));
    let cfg = config_in(dir.path());
    indexer::run_index(&cfg, &MarkerEmbedder).expect("index");

    let responder = Arc::new(
        service::build_responder(
            &cfg,
            Arc::new(MarkerEmbedder),
            Arc::new(CannedLlm {
                calls: AtomicUsize::new(0),
            }),
        )
        .unwrap(),
    );
    let res = router(responder)
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(health.ok);
    assert_eq!(health.embedding_model, "marker");
    assert!(health.chunks >= 2);
}
