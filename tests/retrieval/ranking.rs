use draftsmith::agents::retriever::Retriever;
use draftsmith::embedding::HashEmbedding;
use draftsmith::index::{ChunkMetadata, LocalIndex, SimilarityIndex};
use std::collections::HashSet;
use std::sync::Arc;

fn metadata(doc_type: &str, feedback_score: i64) -> ChunkMetadata {
    ChunkMetadata {
        document_id: "doc".to_string(),
        doc_type: doc_type.to_string(),
        feedback_score: serde_json::json!(feedback_score),
        ..ChunkMetadata::default()
    }
}

async fn seeded_index(entries: Vec<(String, ChunkMetadata)>) -> Arc<LocalIndex> {
    let index = Arc::new(LocalIndex::new(Arc::new(HashEmbedding::new(128))));
    index.upsert(entries).await.unwrap();
    index
}

#[tokio::test]
async fn feedback_biases_ranking_between_equally_relevant_chunks() {
    // Identical content except a tail token, so relevance is nearly equal
    // and the feedback weight decides the order.
    let index = seeded_index(vec![
        (
            "inventory stock tracking warehouse alpha".to_string(),
            metadata("SRS", 1),
        ),
        (
            "inventory stock tracking warehouse beta".to_string(),
            metadata("SRS", 5),
        ),
    ])
    .await;

    let retriever = Retriever::new(index as Arc<dyn SimilarityIndex>);
    let outcome = retriever
        .retrieve("inventory stock tracking warehouse", Some("SRS"), None, 5)
        .await;
    let context = outcome.into_value().unwrap();

    assert_eq!(context.chunks.len(), 2);
    assert!(context.chunks[0].content.ends_with("beta"));
    assert_eq!(context.chunks[0].metadata.parsed_feedback_score(), Some(5));
}

#[tokio::test]
async fn sparse_results_trigger_broadened_query_fallback() {
    // One chunk matches the requested type; the rest are other types that
    // only the unfiltered broadened search can supply.
    let index = seeded_index(vec![
        (
            "inventory management requirements overview".to_string(),
            metadata("SRS", 4),
        ),
        (
            "inventory management deliverables plan".to_string(),
            metadata("SOW", 4),
        ),
        (
            "inventory management budget proposal".to_string(),
            metadata("Proposal", 4),
        ),
    ])
    .await;

    let retriever = Retriever::new(index as Arc<dyn SimilarityIndex>);
    let outcome = retriever
        .retrieve(
            "inventory management requirements for warehouse operations",
            Some("SRS"),
            Some(3),
            5,
        )
        .await;

    assert!(outcome.is_degraded());
    let context = outcome.into_value().unwrap();
    assert!(context.chunks.len() > 1);

    // Dedup by content prefix: no chunk may appear twice.
    let prefixes: Vec<String> = context
        .chunks
        .iter()
        .map(|chunk| chunk.content.chars().take(100).collect())
        .collect();
    let unique: HashSet<&String> = prefixes.iter().collect();
    assert_eq!(unique.len(), prefixes.len());
}

#[tokio::test]
async fn short_queries_do_not_broaden() {
    let index = seeded_index(vec![(
        "inventory management requirements overview".to_string(),
        metadata("SRS", 4),
    )])
    .await;

    let retriever = Retriever::new(index as Arc<dyn SimilarityIndex>);
    let outcome = retriever.retrieve("inventory", Some("SRS"), Some(3), 5).await;

    assert!(outcome.is_ok());
    let context = outcome.into_value().unwrap();
    assert_eq!(context.chunks.len(), 1);
}

#[tokio::test]
async fn empty_corpus_yields_empty_success() {
    let index = Arc::new(LocalIndex::new(Arc::new(HashEmbedding::new(128))));
    let retriever = Retriever::new(index as Arc<dyn SimilarityIndex>);

    let outcome = retriever.retrieve("anything at all", None, None, 5).await;
    assert!(outcome.is_ok());
    assert!(outcome.into_value().unwrap().chunks.is_empty());
}

#[tokio::test]
async fn scores_stay_within_unit_interval() {
    let index = seeded_index(
        (0..8_i64)
            .map(|i| {
                (
                    format!("inventory record number {i} for the warehouse"),
                    metadata("SRS", (i % 5) + 1),
                )
            })
            .collect(),
    )
    .await;

    let retriever = Retriever::new(index as Arc<dyn SimilarityIndex>);
    let context = retriever
        .retrieve("inventory warehouse", Some("SRS"), Some(1), 8)
        .await
        .into_value()
        .unwrap();

    assert!(!context.chunks.is_empty());
    for chunk in &context.chunks {
        assert!((0.0..=1.0).contains(&chunk.score));
    }
}
