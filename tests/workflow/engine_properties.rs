use crate::harness;
use draftsmith::app::App;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn stub_workflow_produces_structured_document() {
    let app = App::build_in_memory(harness::offline_config()).await.unwrap();
    let report = app
        .engine
        .run(harness::request(
            "SRS",
            "Inventory system",
            "- track stock\n- barcode scanning",
            3,
        ))
        .await;

    assert_eq!(report.status, "completed");
    assert!(report.content.contains("Requirements"));
    assert!(report.content.contains("Conclusion"));
    assert!(report.word_count > 0);
    assert!(report.error.is_none());

    // The finalized document is ingested as approved for future retrieval.
    let document_id = report.document_id.expect("finalized document id");
    let document = app.store.get_document(&document_id).await.unwrap().unwrap();
    assert!(document.approved);
    assert_eq!(document.doc_type, "SRS");
    assert!((1..=5).contains(&document.feedback_score));
}

#[tokio::test]
async fn generator_never_runs_more_than_max_iterations() {
    // A threshold no review can reach forces regeneration until the budget
    // is exhausted.
    let mut config = harness::offline_config();
    config.workflow.quality_threshold = 0.99;

    for max_iterations in [1_u32, 2, 3] {
        let (engine, _store) =
            harness::engine_with_completion(harness::stub_completion(), &config).await;
        let report = engine
            .run(harness::request(
                "SRS",
                "Inventory system",
                "- track stock",
                max_iterations,
            ))
            .await;

        let generator_runs = report
            .agent_executions
            .iter()
            .filter(|execution| execution.agent == "generator")
            .count();
        assert_eq!(generator_runs as u32, max_iterations);
        assert_eq!(report.status, "completed");
    }
}

#[tokio::test]
async fn quality_score_is_monotonic_and_clamped() {
    let mut config = harness::offline_config();
    config.workflow.quality_threshold = 0.99;

    let (engine, _store) =
        harness::engine_with_completion(harness::stub_completion(), &config).await;
    let report = engine
        .run(harness::request("SRS", "Inventory system", "- track stock", 3))
        .await;

    assert!(report.quality_score >= 0.7);
    assert!(report.quality_score <= 1.0);

    // Reviewer telemetry records a non-decreasing quality trajectory.
    let reviewer_scores: Vec<f64> = report
        .agent_executions
        .iter()
        .filter(|execution| execution.agent == "reviewer")
        .filter_map(|execution| execution.details["quality_score"].as_f64())
        .collect();
    assert!(!reviewer_scores.is_empty());
    for window in reviewer_scores.windows(2) {
        assert!(window[1] >= window[0]);
    }
}

#[tokio::test]
async fn failing_completion_still_completes_with_fallback_document() {
    let config = harness::offline_config();
    let (engine, _store) =
        harness::engine_with_completion(Arc::new(harness::FailingCompletion), &config).await;

    let report = engine
        .run(harness::request(
            "SRS",
            "Inventory system",
            "- track stock\n- barcode scanning",
            3,
        ))
        .await;

    assert_eq!(report.status, "completed");
    assert!(report.content.contains("## Requirements"));
    assert!(report.content.contains("- track stock"));
    assert!(report.content.contains("## Conclusion"));
}

#[tokio::test]
async fn fallback_document_is_deterministic_across_runs() {
    let config = harness::offline_config();
    let mut contents = Vec::new();
    for _ in 0..2 {
        let (engine, _store) =
            harness::engine_with_completion(Arc::new(harness::FailingCompletion), &config).await;
        let report = engine
            .run(harness::request("SOW", "Website build", "design\ndevelop", 2))
            .await;
        contents.push(report.content);
    }
    assert_eq!(contents[0], contents[1]);
}

#[tokio::test]
async fn timed_out_workflow_falls_back_to_direct_generation() {
    let mut config = harness::offline_config();
    config.workflow.timeout_secs = 1;

    let slow = Arc::new(harness::SlowCompletion {
        delay: Duration::from_millis(1_500),
        inner: draftsmith::completion::StubCompletion::new(),
    });
    let (engine, _store) = harness::engine_with_completion(slow, &config).await;

    let report = engine
        .run(harness::request("SRS", "Inventory system", "- track stock", 3))
        .await;

    assert_eq!(report.status, "completed");
    assert!(!report.content.is_empty());
    assert!(
        report
            .messages
            .iter()
            .any(|message| message.contains("direct generation"))
    );
}

#[tokio::test]
async fn workflow_telemetry_is_persisted() {
    let config = harness::offline_config();
    let (engine, store) =
        harness::engine_with_completion(harness::stub_completion(), &config).await;

    let report = engine
        .run(harness::request("SRS", "Inventory system", "- track stock", 3))
        .await;

    let row = sqlx::query("SELECT status FROM workflow_runs WHERE id = $1")
        .bind(&report.workflow_id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    let status: String = sqlx::Row::try_get(&row, "status").unwrap();
    assert_eq!(status, "completed");
}

#[tokio::test]
async fn messages_trace_every_step() {
    let app = App::build_in_memory(harness::offline_config()).await.unwrap();
    let report = app
        .engine
        .run(harness::request("SRS", "Inventory system", "- track stock", 3))
        .await;

    let joined = report.messages.join("\n");
    assert!(joined.contains("Workflow initialized for SRS"));
    assert!(joined.contains("Style profile built"));
    assert!(joined.contains("context chunks"));
    assert!(joined.contains("Document generated (iteration 1)"));
    assert!(joined.contains("Compliance check:"));
    assert!(joined.contains("Document finalized"));
}
