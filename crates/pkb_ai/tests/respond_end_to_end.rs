use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pkb_ai::chunking::ChunkConfig;
use pkb_ai::embeddings::Embedder;
use pkb_ai::guardrails::DEFERRAL_MESSAGE;
use pkb_ai::index::{IndexBuildInput, IndexStore, PolicyIndex};
use pkb_ai::llm::Llm;
use pkb_ai::respond::{
    Clock, InMemoryLastSeenStore, Outcome, ReplyMessages, Responder, ResponderSettings,
};
use pkb_core::domain::PolicyDocument;
use pkb_core::error::AppError;
use pkb_core::ingest::parse_policy_filename;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use time::{Duration, OffsetDateTime};

const POLICY_TEXT: &str = "第五條 病假：員工因病需治療或休養者，一年內合計以三十日為限。";
const CONFIDENT_QUERY: &str = "病假一年可以請幾天？";
const WEAK_QUERY: &str = "公司附近有什麼好吃的？";
const AT_THRESHOLD_QUERY: &str = "生病可以請假嗎？";
const BELOW_THRESHOLD_QUERY: &str = "身體不舒服怎麼辦？";

/// Vectors are looked up by exact text so scores are fixed by construction:
/// the policy chunk is [1, 0]; the confident query scores 0.5 and the weak one 0.1.
struct TableEmbedder {
    table: HashMap<&'static str, Vec<f32>>,
    calls: AtomicUsize,
    fail: bool,
}

impl TableEmbedder {
    fn new() -> Self {
        let mut table = HashMap::new();
        table.insert(POLICY_TEXT, vec![1.0, 0.0]);
        table.insert(CONFIDENT_QUERY, vec![0.5, 0.75f32.sqrt()]);
        table.insert(WEAK_QUERY, vec![0.1, 0.99f32.sqrt()]);
        // 7/25 is exactly 0.28; 6.999 lands just under it.
        table.insert(AT_THRESHOLD_QUERY, vec![7.0, 24.0]);
        table.insert(BELOW_THRESHOLD_QUERY, vec![6.999, 24.0]);
        Self {
            table,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, _model: &str, input: &str) -> Result<Vec<f32>, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AppError::new("AI_EMBEDDINGS_FAILED", "Failed to call Embeddings endpoint")
                .with_retryable(true));
        }
        Ok(self.table.get(input).cloned().unwrap_or_else(|| vec![0.0, 1.0]))
    }
}

struct CountingLlm {
    out: String,
    calls: AtomicUsize,
    last_prompt: Mutex<String>,
}

impl CountingLlm {
    fn new(out: &str) -> Self {
        Self {
            out: out.to_string(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(String::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Llm for CountingLlm {
    fn generate(&self, _model: &str, _system: &str, prompt: &str) -> Result<String, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap() = prompt.to_string();
        Ok(self.out.clone())
    }
}

struct ManualClock(Mutex<OffsetDateTime>);

impl ManualClock {
    fn new() -> Self {
        Self(Mutex::new(OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)))
    }

    fn advance(&self, d: Duration) {
        *self.0.lock().unwrap() += d;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.0.lock().unwrap()
    }
}

fn build_index(dir: &std::path::Path, embedder: &TableEmbedder) -> Arc<PolicyIndex> {
    let filename = "HR-105-01_請假管理辦法_202509.docx";
    let docs = vec![PolicyDocument {
        filename: filename.to_string(),
        path: PathBuf::from(filename),
        meta: parse_policy_filename(filename),
        text: POLICY_TEXT.to_string(),
    }];
    let store = IndexStore::open(dir.join("hr_kb_index.json"));
    store
        .build_with_embedder(
            &docs,
            embedder,
            IndexBuildInput {
                model: "mock-embed".to_string(),
                policies_dir: "policies".to_string(),
                generated_at_utc: "2026-02-10T00:00:00Z".to_string(),
                chunking: ChunkConfig::default(),
            },
        )
        .expect("build");
    Arc::new(store.load().expect("load"))
}

fn settings() -> ResponderSettings {
    ResponderSettings {
        embedding_model: "mock-embed".to_string(),
        completion_model: "mock-chat".to_string(),
        top_k: 6,
        confidence_threshold: 0.28,
        intro_cooldown: Duration::hours(12),
        messages: ReplyMessages::default(),
    }
}

#[test]
fn confident_query_is_answered_with_provenance_and_one_completion() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let llm = Arc::new(CountingLlm::new("病假一年內合計以三十日為限。"));

    let responder = Responder::new(index, embedder.clone(), llm.clone(), settings())
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));

    let outcome = responder.answer(CONFIDENT_QUERY).expect("answer");
    match outcome {
        Outcome::Answered { top_score, .. } => assert!((top_score - 0.5).abs() < 1e-6),
        other => panic!("expected answer, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 1);

    let prompt = llm.last_prompt.lock().unwrap().clone();
    assert!(prompt.contains("[HR-105-01#1]"));
    assert!(prompt.contains(POLICY_TEXT));
    assert!(prompt.contains(DEFERRAL_MESSAGE));
    assert!(prompt.contains(CONFIDENT_QUERY));

    let reply = responder.respond(CONFIDENT_QUERY, "U-alice");
    assert!(reply.contains("根據 202509 版《請假管理辦法》（HR-105-01）：\n病假一年內合計以三十日為限。"));
    assert_eq!(llm.call_count(), 2);
}

#[test]
fn weak_query_defers_without_calling_the_model() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let llm = Arc::new(CountingLlm::new("不該被呼叫"));

    let responder = Responder::new(index, embedder.clone(), llm.clone(), settings())
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));

    // First message shows the banner; consume it so the next reply is the bare deferral.
    let first = responder.respond(WEAK_QUERY, "U-bob");
    assert!(first.starts_with(&ReplyMessages::default().intro));
    assert!(first.ends_with(DEFERRAL_MESSAGE));

    let reply = responder.respond(WEAK_QUERY, "U-bob");
    assert_eq!(reply, DEFERRAL_MESSAGE);
    assert_eq!(llm.call_count(), 0);

    match responder.answer(WEAK_QUERY).unwrap() {
        Outcome::Deferred { top_score } => {
            let s = top_score.expect("score");
            assert!((s - 0.1).abs() < 1e-6);
        }
        other => panic!("expected deferral, got {other:?}"),
    }
}

#[test]
fn threshold_is_inclusive_at_the_responder() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let llm = Arc::new(CountingLlm::new("病假一年內合計以三十日為限。"));

    let responder = Responder::new(index, embedder, llm.clone(), settings())
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));
    responder.respond("hello", "U-gina");

    match responder.answer(AT_THRESHOLD_QUERY).unwrap() {
        Outcome::Answered { top_score, .. } => assert_eq!(top_score, 0.28),
        other => panic!("expected answer at the threshold, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 1);

    let reply = responder.respond(BELOW_THRESHOLD_QUERY, "U-gina");
    assert_eq!(reply, DEFERRAL_MESSAGE);
    assert_eq!(llm.call_count(), 1);

    match responder.answer(BELOW_THRESHOLD_QUERY).unwrap() {
        Outcome::Deferred { top_score } => {
            let s = top_score.expect("score");
            assert!(s < 0.28 && s > 0.279, "score {s}");
        }
        other => panic!("expected deferral, got {other:?}"),
    }
    assert_eq!(llm.call_count(), 1);
}

#[test]
fn model_deferral_drops_the_provenance_preface() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let llm = Arc::new(CountingLlm::new(DEFERRAL_MESSAGE));

    let responder = Responder::new(index, embedder, llm.clone(), settings())
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));
    responder.respond("hello", "U-carol");

    let reply = responder.respond(CONFIDENT_QUERY, "U-carol");
    assert_eq!(reply, DEFERRAL_MESSAGE);
    assert_eq!(llm.call_count(), 1);
}

#[test]
fn provider_failure_uses_apology_distinct_from_deferral() {
    let dir = tempdir().unwrap();
    let index = build_index(dir.path(), &TableEmbedder::new());
    let llm = Arc::new(CountingLlm::new("unused"));

    let responder = Responder::new(index, Arc::new(TableEmbedder::failing()), llm.clone(), settings())
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));

    let err = responder.answer(CONFIDENT_QUERY).unwrap_err();
    assert_eq!(err.code, "AI_EMBEDDINGS_FAILED");

    responder.respond("hi", "U-dave");
    let reply = responder.respond(CONFIDENT_QUERY, "U-dave");
    let msgs = ReplyMessages::default();
    assert_eq!(reply, msgs.failure);
    assert_ne!(reply, msgs.deferral);
    assert_eq!(llm.call_count(), 0);
}

#[test]
fn empty_index_and_blank_questions_defer() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let mut index = (*build_index(dir.path(), &embedder)).clone();
    index.items.clear();
    let calls_after_build = embedder.calls.load(Ordering::SeqCst);
    let llm = Arc::new(CountingLlm::new("unused"));

    let responder = Responder::new(Arc::new(index), embedder.clone(), llm.clone(), settings()).unwrap();

    assert_eq!(responder.answer(CONFIDENT_QUERY).unwrap(), Outcome::Deferred { top_score: None });
    assert_eq!(responder.answer("   ").unwrap(), Outcome::Deferred { top_score: None });
    assert_eq!(embedder.calls.load(Ordering::SeqCst), calls_after_build);
    assert_eq!(llm.call_count(), 0);
}

#[test]
fn intro_banner_respects_cooldown_per_requester() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let clock = Arc::new(ManualClock::new());
    let store = Arc::new(InMemoryLastSeenStore::new());

    let responder = Responder::new(index, embedder, Arc::new(CountingLlm::new("ok")), settings())
        .unwrap()
        .with_clock(clock.clone())
        .with_last_seen_store(store.clone());
    let intro = ReplyMessages::default().intro;

    assert!(responder.respond(WEAK_QUERY, "U-erin").starts_with(&intro));
    assert!(!responder.respond(WEAK_QUERY, "U-erin").starts_with(&intro));

    clock.advance(Duration::hours(11));
    assert!(!responder.respond(WEAK_QUERY, "U-erin").starts_with(&intro));

    clock.advance(Duration::hours(13));
    assert!(responder.respond(WEAK_QUERY, "U-erin").starts_with(&intro));

    assert!(responder.respond(WEAK_QUERY, "U-frank").starts_with(&intro));
}

#[test]
fn identical_deferral_and_failure_texts_are_rejected() {
    let dir = tempdir().unwrap();
    let embedder = Arc::new(TableEmbedder::new());
    let index = build_index(dir.path(), &embedder);
    let mut s = settings();
    s.messages.failure = s.messages.deferral.clone();

    let err = Responder::new(index, embedder, Arc::new(CountingLlm::new("ok")), s)
        .err()
        .expect("should reject");
    assert_eq!(err.code, "PKB_CONFIG_INVALID");
}
