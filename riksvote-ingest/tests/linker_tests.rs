//! Decision-text and motion linker tests
//!
//! Seeds the store directly, scripts document detail records and checks
//! label backfill, tolerance of bad detail records, and that resolved
//! motions are never fetched or changed again.

mod helpers;

use helpers::fixtures::{decision_point, document_status, reference};
use helpers::{count_rows, create_test_db, create_test_orchestrator, test_endpoints, test_settings, FakeUpstream};
use riksvote_common::VoteCounts;
use riksvote_ingest::db::documents::Document;
use riksvote_ingest::db::motions::{load_motion, Motion};
use riksvote_ingest::db::proposals::load_for_document;
use riksvote_ingest::db::voting_events::{load_voting_event, VotingEvent};
use riksvote_ingest::db::{upsert_batch, upsert_one};
use riksvote_ingest::services::fetch_client::RawResponse;
use riksvote_ingest::services::{ItemOutcome, Stage};
use sqlx::SqlitePool;

fn report(id: &str, designation: &str) -> Document {
    Document {
        document_id: id.to_string(),
        designation: designation.to_string(),
        session: "2023/24".to_string(),
        committee_code: Some("AU".to_string()),
        title: format!("Betänkande {}", designation),
        subtitle: String::new(),
        decision_date: Some("2024-03-20".to_string()),
        published_date: Some("2024-03-01".to_string()),
        doc_type: "bet".to_string(),
        subtype: "bet".to_string(),
    }
}

fn motion(id: &str) -> Motion {
    Motion {
        document_id: id.to_string(),
        designation: id.trim_start_matches("HB02").to_string(),
        session: "2023/24".to_string(),
        doc_type: "mot".to_string(),
        title: format!("Motion {}", id),
        authors: "Anna Andersson (S)".to_string(),
        department: String::new(),
        published_date: Some("2023-10-05".to_string()),
        resolved_by_document_id: None,
    }
}

fn voting_event(id: &str) -> VotingEvent {
    VotingEvent {
        voting_event_id: id.to_string(),
        designation: "AU10".to_string(),
        session: "2023/24".to_string(),
        point: Some(1),
        committee_code: Some("AU".to_string()),
        decision_label: None,
        counts: VoteCounts::new(170, 130, 2, 47),
        vote_date: Some("2024-03-20".to_string()),
    }
}

async fn seed_reports(pool: &SqlitePool, reports: &[Document]) {
    upsert_batch(pool, reports).await.unwrap();
}

// ============================================================================
// Decision points
// ============================================================================

#[tokio::test]
async fn test_decision_points_stored_and_label_backfilled_case_insensitively() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU10")]).await;
    upsert_one(&pool, &voting_event("AbC1")).await.unwrap();

    let upstream = FakeUpstream::new();
    upstream.respond_json(
        &test_endpoints().document_status("R1"),
        document_status(
            vec![
                decision_point("1", "Arbetslöshetsförsäkringen", "abc1"),
                decision_point("2", "Övriga frågor", ""),
            ],
            vec![],
        ),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    let report = orchestrator.run_stage(Stage::Decisions).await.unwrap();

    let event = load_voting_event(&pool, "AbC1").await.unwrap().unwrap();
    assert_eq!(event.decision_label.as_deref(), Some("Arbetslöshetsförsäkringen"));
    // Backfill leaves the counts alone
    assert_eq!(event.counts, VoteCounts::new(170, 130, 2, 47));

    let points = load_for_document(&pool, "R1").await.unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].point, 1);
    assert_eq!(points[0].voting_event_id.as_deref(), Some("abc1"));
    assert_eq!(points[1].voting_event_id, None);

    assert_eq!(report.tally(ItemOutcome::Persisted), 1);
    assert_eq!(report.counter("decision_points"), 2);
    assert_eq!(report.counter("labels_backfilled"), 1);
}

#[tokio::test]
async fn test_label_survives_rerun_of_decisions() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU10")]).await;
    upsert_one(&pool, &voting_event("V1")).await.unwrap();

    let upstream = FakeUpstream::new();
    upstream.respond_json(
        &test_endpoints().document_status("R1"),
        document_status(vec![decision_point("1", "Skatter", "V1")], vec![]),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    orchestrator.run_stage(Stage::Decisions).await.unwrap();
    let second = orchestrator.run_stage(Stage::Decisions).await.unwrap();

    // Already labelled: nothing left to change
    assert_eq!(second.counter("labels_backfilled"), 0);
    assert_eq!(count_rows(&pool, "proposals").await, 1);

    // Re-aggregation without a label keeps the stored one
    upsert_one(&pool, &voting_event("V1")).await.unwrap();
    let event = load_voting_event(&pool, "V1").await.unwrap().unwrap();
    assert_eq!(event.decision_label.as_deref(), Some("Skatter"));
}

#[tokio::test]
async fn test_bad_detail_records_are_tallied_not_fatal() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(
        &pool,
        &[report("R1", "AU1"), report("R2", "AU2"), report("R3", "AU3"), report("R4", "AU4")],
    )
    .await;

    let endpoints = test_endpoints();
    let upstream = FakeUpstream::new();
    // R1: no route, answers 404
    upstream.respond_json(&endpoints.document_status("R2"), serde_json::json!({"foo": 1}));
    upstream.respond(&endpoints.document_status("R3"), RawResponse::new(500, "down"));
    upstream.respond_json(
        &endpoints.document_status("R4"),
        document_status(vec![decision_point("1", "Bostäder", "")], vec![]),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    let report = orchestrator.run_stage(Stage::Decisions).await.unwrap();

    assert_eq!(report.tally(ItemOutcome::SkippedNotFound), 1);
    assert_eq!(report.tally(ItemOutcome::SkippedMalformed), 1);
    assert_eq!(report.tally(ItemOutcome::Failed), 1);
    assert_eq!(report.tally(ItemOutcome::Persisted), 1);
    assert_eq!(count_rows(&pool, "proposals").await, 1);
    // 500 is retried once before the document is given up on
    assert_eq!(upstream.hits(&endpoints.document_status("R3")), 2);
}

#[tokio::test]
async fn test_missing_only_skips_documents_with_points() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU1"), report("R2", "AU2")]).await;

    let endpoints = test_endpoints();
    let upstream = FakeUpstream::new();
    upstream.respond_json(
        &endpoints.document_status("R1"),
        document_status(vec![decision_point("1", "Arbetsmarknad", "")], vec![]),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    orchestrator.run_stage(Stage::Decisions).await.unwrap();
    assert_eq!(upstream.hits(&endpoints.document_status("R1")), 1);
    assert_eq!(upstream.hits(&endpoints.document_status("R2")), 1);

    let mut settings = test_settings();
    settings.missing_only = true;
    let resumed = create_test_orchestrator(&pool, settings, &upstream);
    let report = resumed.run_stage(Stage::Decisions).await.unwrap();

    // R1 has points and is not fetched again; R2 still has none
    assert_eq!(upstream.hits(&endpoints.document_status("R1")), 1);
    assert_eq!(upstream.hits(&endpoints.document_status("R2")), 2);
    assert_eq!(report.tally(ItemOutcome::SkippedNotFound), 1);
    assert_eq!(report.total(), 1);
}

// ============================================================================
// Motion links
// ============================================================================

#[tokio::test]
async fn test_motion_resolves_to_first_stored_report() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU10"), report("R2", "AU11")]).await;
    upsert_batch(&pool, &[motion("HB02M1"), motion("HB02M2")]).await.unwrap();

    let endpoints = test_endpoints();
    let upstream = FakeUpstream::new();
    upstream.respond_json(
        &endpoints.document_status("HB02M1"),
        // unknown id first, then two stored reports; lower-case must still match
        document_status(vec![], vec![reference("HB01XYZ"), reference("r1"), reference("R2")]),
    );
    upstream.respond_json(
        &endpoints.document_status("HB02M2"),
        document_status(vec![], vec![reference("HB01XYZ")]),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    let first = orchestrator.run_stage(Stage::Links).await.unwrap();

    let m1 = load_motion(&pool, "HB02M1").await.unwrap().unwrap();
    assert_eq!(m1.resolved_by_document_id.as_deref(), Some("R1"));
    let m2 = load_motion(&pool, "HB02M2").await.unwrap().unwrap();
    assert_eq!(m2.resolved_by_document_id, None);

    assert_eq!(first.tally(ItemOutcome::Persisted), 1);
    assert_eq!(first.tally(ItemOutcome::SkippedEmpty), 1);
    assert_eq!(first.tally(ItemOutcome::AlreadyDone), 0);
}

#[tokio::test]
async fn test_resolved_motion_is_never_refetched_or_changed() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU10"), report("R2", "AU11")]).await;
    upsert_batch(&pool, &[motion("HB02M1"), motion("HB02M2")]).await.unwrap();

    let endpoints = test_endpoints();
    let upstream = FakeUpstream::new();
    upstream.respond_json(
        &endpoints.document_status("HB02M1"),
        document_status(vec![], vec![reference("R1")]),
    );
    upstream.respond_json(&endpoints.document_status("HB02M2"), document_status(vec![], vec![]));

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    orchestrator.run_stage(Stage::Links).await.unwrap();

    // Upstream now points M1 elsewhere; it must not be asked again
    upstream.clear(&endpoints.document_status("HB02M1"));
    upstream.respond_json(
        &endpoints.document_status("HB02M1"),
        document_status(vec![], vec![reference("R2")]),
    );
    let second = orchestrator.run_stage(Stage::Links).await.unwrap();

    assert_eq!(upstream.hits(&endpoints.document_status("HB02M1")), 1);
    assert_eq!(upstream.hits(&endpoints.document_status("HB02M2")), 2);
    let m1 = load_motion(&pool, "HB02M1").await.unwrap().unwrap();
    assert_eq!(m1.resolved_by_document_id.as_deref(), Some("R1"));
    assert_eq!(second.tally(ItemOutcome::AlreadyDone), 1);

    // Document re-ingest does not clear the link either
    upsert_one(&pool, &motion("HB02M1")).await.unwrap();
    let m1 = load_motion(&pool, "HB02M1").await.unwrap().unwrap();
    assert_eq!(m1.resolved_by_document_id.as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_link_failures_do_not_abort_stage() {
    let (_dir, pool) = create_test_db().await;
    seed_reports(&pool, &[report("R1", "AU10")]).await;
    upsert_batch(&pool, &[motion("HB02M1"), motion("HB02M2")]).await.unwrap();

    let endpoints = test_endpoints();
    let upstream = FakeUpstream::new();
    upstream.respond(&endpoints.document_status("HB02M1"), RawResponse::new(503, "busy"));
    upstream.respond_json(
        &endpoints.document_status("HB02M2"),
        document_status(vec![], vec![reference("R1")]),
    );

    let orchestrator = create_test_orchestrator(&pool, test_settings(), &upstream);
    let report = orchestrator.run_stage(Stage::Links).await.unwrap();

    assert_eq!(report.tally(ItemOutcome::Failed), 1);
    assert_eq!(report.tally(ItemOutcome::Persisted), 1);
    let m2 = load_motion(&pool, "HB02M2").await.unwrap().unwrap();
    assert_eq!(m2.resolved_by_document_id.as_deref(), Some("R1"));
}
