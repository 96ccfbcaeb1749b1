//! SQLite store round trips and batch workflows with a scripted backend.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use caseminer::schema::schema;
use caseminer::{
    extract_answer, normalize, ActivityStatus, CaseRecord, CaseStore, DefaultPrompts, Error,
    ModelBackend, Pipeline, SqliteStore, Verdict,
};
use pretty_assertions::assert_eq;
use serde_json::json;

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_store(label: &str) -> SqliteStore {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let n = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "caseminer-test-{}-{label}-{n}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let store = SqliteStore::open(path.to_string_lossy().to_string());
    store.init().expect("init should succeed");
    store
}

fn seed_case(store: &SqliteStore, id: &str) {
    store
        .upsert_case(&CaseRecord {
            id: id.to_string(),
            title: format!("Press release {id}"),
            body: "Defendant operated an unlicensed money transmitting business.".to_string(),
            url: format!("https://justice.gov/{id}"),
        })
        .unwrap();
}

/// Backend that replays canned responses in order.
struct Scripted {
    responses: RefCell<VecDeque<Result<String, ()>>>,
}

impl Scripted {
    fn new(responses: Vec<Result<&str, ()>>) -> Self {
        Self {
            responses: RefCell::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string))
                    .collect(),
            ),
        }
    }
}

impl ModelBackend for Scripted {
    fn complete(&self, _prompt: &str, _max_tokens: u32, _temperature: f32) -> caseminer::Result<String> {
        match self.responses.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(())) => Err(Error::ModelsExhausted),
            None => panic!("backend called more times than scripted"),
        }
    }
}

fn scripted_pipeline(responses: Vec<Result<&str, ()>>) -> Pipeline {
    Pipeline::with_backend(
        Box::new(Scripted::new(responses)),
        Box::new(DefaultPrompts),
        Duration::ZERO,
    )
}

#[test]
fn single_payload_upsert_round_trip() {
    let store = temp_store("meta");
    let meta = schema("case_metadata").unwrap();
    seed_case(&store, "case-1");

    let value = json!({
        "district_office": "Southern District of New York",
        "usa_name": "Joon H. Kim",
        "event_type": "sentencing",
        "money_amounts": ["$2.5 million", "€800,000"],
    });
    let payload = normalize(value, meta).unwrap();
    let report = store
        .store_payload("case-1", meta, &payload, "https://justice.gov/case-1")
        .unwrap();
    assert_eq!(report.stored, 1);
    assert_eq!(report.skipped, 0);

    // Upsert semantics: storing again replaces, not duplicates.
    let payload2 = normalize(
        json!({"district_office": "Eastern District of New York"}),
        meta,
    )
    .unwrap();
    store
        .store_payload("case-1", meta, &payload2, "https://justice.gov/case-1")
        .unwrap();

    let conn = rusqlite::Connection::open(store.path()).unwrap();
    let (count, office): (i64, String) = conn
        .query_row(
            "SELECT COUNT(*), MAX(district_office) FROM case_metadata WHERE case_id = 'case-1'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(office, "Eastern District of New York");
}

#[test]
fn list_payload_replaces_and_counts_skipped_elements() {
    let store = temp_store("participants");
    let participants = schema("participants").unwrap();
    seed_case(&store, "case-2");

    let payload = normalize(
        json!([
            {"name": "Jane Doe", "role": "defendant"},
            "a stray string the model emitted",
            {"name": "John Roe", "role": "co-conspirator"},
        ]),
        participants,
    )
    .unwrap();

    let report = store
        .store_payload("case-2", participants, &payload, "https://justice.gov/case-2")
        .unwrap();
    assert_eq!(report.stored, 2);
    assert_eq!(report.skipped, 1);

    // A rerun clears the previous rows for the case first.
    let report = store
        .store_payload("case-2", participants, &payload, "https://justice.gov/case-2")
        .unwrap();
    assert_eq!(report.stored, 2);

    let conn = rusqlite::Connection::open(store.path()).unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM participants WHERE case_id = 'case-2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn pending_query_tracks_latest_activity_status() {
    let store = temp_store("pending");
    seed_case(&store, "case-a");
    seed_case(&store, "case-b");

    let pending = store.pending_for("charges", 10).unwrap();
    assert_eq!(pending.len(), 2);

    // case-a fails once, then succeeds: only the latest status counts.
    store
        .log_activity("case-a", "charges", ActivityStatus::Error, "API call failed")
        .unwrap();
    store
        .log_activity("case-a", "charges", ActivityStatus::Success, "stored 3 elements")
        .unwrap();
    // case-b succeeded earlier but regressed to skipped on the latest run.
    store
        .log_activity("case-b", "charges", ActivityStatus::Success, "stored 1 element")
        .unwrap();
    store
        .log_activity("case-b", "charges", ActivityStatus::Skipped, "nothing extracted")
        .unwrap();

    let pending = store.pending_for("charges", 10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "case-b");

    // Status for one schema must not bleed into another.
    let pending_other = store.pending_for("quotes", 10).unwrap();
    assert_eq!(pending_other.len(), 2);
}

#[test]
fn enrichment_run_stores_logs_and_resumes() {
    let store = temp_store("run");
    seed_case(&store, "case-1");
    seed_case(&store, "case-2");

    // case-1 gets a clean fenced response; case-2 returns prose with no
    // structure and is skipped.
    let pipeline = scripted_pipeline(vec![
        Ok("```json\n[{\"charge_description\": \"operating unlicensed MSB\", \"statute\": \"18 U.S.C. § 1960\"}]\n```"),
        Ok("I could not find any charges in this press release."),
    ]);

    let summary = pipeline.run_enrichment(&store, "charges", 10).unwrap();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    // Only the failed case is eligible on the next run.
    let pending = store.pending_for("charges", 10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "case-2");

    // The skip preserved the raw response for offline inspection.
    let conn = rusqlite::Connection::open(store.path()).unwrap();
    let notes: String = conn
        .query_row(
            "SELECT notes FROM activity_log
             WHERE case_id = 'case-2' AND schema_name = 'charges' AND status = 'skipped'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(notes.contains("I could not find any charges"));
}

#[test]
fn enrichment_run_survives_api_exhaustion() {
    let store = temp_store("exhausted");
    seed_case(&store, "case-1");
    seed_case(&store, "case-2");

    let pipeline = scripted_pipeline(vec![
        Err(()),
        Ok("[{\"charge_description\": \"money transmission without a license\"}]"),
    ]);

    let summary = pipeline.run_enrichment(&store, "charges", 10).unwrap();
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);

    let pending = store.pending_for("charges", 10).unwrap();
    assert_eq!(pending[0].id, "case-1");
}

#[test]
fn classification_run_persists_verdicts() {
    let store = temp_store("classify");
    seed_case(&store, "case-1");
    seed_case(&store, "case-2");
    seed_case(&store, "case-3");

    let pipeline = scripted_pipeline(vec![
        Ok("{\"answer\": \"yes\"}"),
        Ok("<think>hmm</think>\n{\"answer\": \"no\"}"),
        Ok("nothing useful at all §§§"),
    ]);

    let summary = pipeline.run_classification(&store, 10).unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.succeeded, 3);

    let conn = rusqlite::Connection::open(store.path()).unwrap();
    let verdict_of = |id: &str| -> String {
        conn.query_row(
            "SELECT classification FROM cases WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .unwrap()
    };
    assert_eq!(verdict_of("case-1"), "yes");
    assert_eq!(verdict_of("case-2"), "no");
    assert_eq!(verdict_of("case-3"), "unknown");

    // Unknown verdicts stay eligible for reclassification; yes/no do not.
    let pending = store.pending_classification(10).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, "case-3");
}

#[test]
fn unknown_schema_is_an_error_not_a_skip() {
    let store = temp_store("unknown-schema");
    let pipeline = scripted_pipeline(vec![]);
    let result = pipeline.run_enrichment(&store, "not_a_schema", 10);
    assert!(matches!(result, Err(Error::UnknownSchema(_))));
}

#[test]
fn extract_answer_matches_what_classification_persists() {
    // The only three strings the store ever sees.
    for (raw, expected) in [
        ("{\"answer\": \"yes\"}", "yes"),
        ("{\"answer\": \"no\"}", "no"),
        ("{\"answer\": \"maybe\"}", "unknown"),
    ] {
        assert_eq!(extract_answer(raw).as_str(), expected);
    }
    assert_eq!(Verdict::Unknown.as_str(), "unknown");
}
