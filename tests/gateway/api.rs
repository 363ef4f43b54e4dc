use crate::harness;
use draftsmith::app::App;
use draftsmith::gateway;
use serde_json::json;

async fn serve() -> (String, App) {
    let app = App::build_in_memory(harness::offline_config()).await.unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let served = app.clone();
    tokio::spawn(async move {
        gateway::run_gateway_with_listener(&served, listener)
            .await
            .unwrap();
    });

    (format!("http://{addr}"), app)
}

async fn upload_document(base: &str, client: &reqwest::Client) -> String {
    let response = client
        .post(format!("{base}/api/upload"))
        .json(&json!({
            "filename": "inventory_srs.md",
            "content": "## Requirements\nThe system shall track stock levels across warehouses.",
            "approved": true,
            "feedback_score": 4
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    body["document_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (base, _app) = serve().await;
    let response = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn generate_endpoint_runs_workflow() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/generate"))
        .json(&json!({
            "doc_type": "SRS",
            "summary": "Inventory system",
            "requirements": "- track stock\n- barcode scanning"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "completed");
    let content = body["content"].as_str().unwrap();
    assert!(content.contains("Requirements"));
    assert!(content.contains("Conclusion"));
    assert!(body["word_count"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn generate_endpoint_rejects_missing_input() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/generate"))
        .json(&json!({ "doc_type": "SRS", "summary": "", "requirements": "  " }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn document_crud_roundtrip() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();
    let document_id = upload_document(&base, &client).await;

    let fetched: serde_json::Value = client
        .get(format!("{base}/api/documents/{document_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["doc_type"], "SRS");
    assert_eq!(fetched["approved"], true);

    let listed: serde_json::Value = client
        .get(format!("{base}/api/documents"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed["documents"].as_array().unwrap().len(), 1);

    let updated: serde_json::Value = client
        .put(format!("{base}/api/documents/{document_id}"))
        .json(&json!({ "title": "Renamed" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["title"], "Renamed");

    let deleted = client
        .delete(format!("{base}/api/documents/{document_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);

    let missing = client
        .get(format!("{base}/api/documents/{document_id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}

#[tokio::test]
async fn missing_document_returns_404() {
    let (base, _app) = serve().await;
    let response = reqwest::get(format!("{base}/api/documents/nope")).await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn feedback_scores_are_clamped_into_bounds() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();
    let document_id = upload_document(&base, &client).await;

    let high: serde_json::Value = client
        .put(format!("{base}/api/documents/{document_id}/feedback"))
        .json(&json!({ "score": 8 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(high["updated_score"], 5);

    let low: serde_json::Value = client
        .put(format!("{base}/api/documents/{document_id}/feedback"))
        .json(&json!({ "score": -3 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(low["updated_score"], 1);

    let fetched: serde_json::Value = client
        .get(format!("{base}/api/documents/{document_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["feedback_score"], 1);
}

#[tokio::test]
async fn export_markdown_and_unavailable_formats() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();
    let document_id = upload_document(&base, &client).await;

    let markdown = client
        .get(format!("{base}/api/export/{document_id}?format=md"))
        .send()
        .await
        .unwrap();
    assert_eq!(markdown.status(), 200);
    assert!(
        markdown
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/markdown")
    );
    let body = markdown.text().await.unwrap();
    assert!(body.contains("## Requirements"));

    let pdf = client
        .get(format!("{base}/api/export/{document_id}?format=pdf"))
        .send()
        .await
        .unwrap();
    assert_eq!(pdf.status(), 501);

    let bogus = client
        .get(format!("{base}/api/export/{document_id}?format=xlsx"))
        .send()
        .await
        .unwrap();
    assert_eq!(bogus.status(), 400);
}

#[tokio::test]
async fn review_endpoint_normalizes_content() {
    let (base, _app) = serve().await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{base}/api/review"))
        .json(&json!({
            "content": "# Title\nFirst.Second sentence.\n\n\n\n\ntext",
            "doc_type": "SRS"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    let improved = body["improved_content"].as_str().unwrap();
    assert!(!improved.contains("\n\n\n"));
    assert_eq!(body["changes_made"][0], "Applied formatting improvements");

    let empty = client
        .post(format!("{base}/api/review"))
        .json(&json!({ "content": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty.status(), 400);
}
