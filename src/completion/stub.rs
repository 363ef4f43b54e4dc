use super::{Completion, CompletionRequest};
use async_trait::async_trait;
use regex::Regex;

/// Deterministic keyword-templated completion backend for offline operation
/// and tests.
///
/// Generation prompts yield a structurally well-formed document (headers, a
/// Requirements section, a Conclusion) derived purely from the prompt text;
/// review prompts yield the submitted content with whitespace and sentence
/// spacing normalized. Same input, same output, no network.
pub struct StubCompletion {
    collapse_blank: Regex,
    sentence_spacing: Regex,
}

const REVIEW_MARKER: &str = "Content to review:";
const REVIEW_END_MARKERS: [&str; 2] = ["Style profile:", "Feedback to address:"];

impl StubCompletion {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collapse_blank: Regex::new(r"\n{3,}").expect("static pattern"),
            sentence_spacing: Regex::new(r"([.!?])\s*([A-Z])").expect("static pattern"),
        }
    }

    fn line_value(text: &str, prefix: &str) -> Option<String> {
        text.lines().find_map(|line| {
            let trimmed = line.trim();
            trimmed
                .strip_prefix(prefix)
                .map(|rest| rest.trim().to_string())
                .filter(|rest| !rest.is_empty())
        })
    }

    fn bullet_items(text: &str) -> Vec<String> {
        text.lines()
            .filter_map(|line| line.trim().strip_prefix("- "))
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect()
    }

    fn render_document(text: &str) -> String {
        let doc_type =
            Self::line_value(text, "Document Type:").unwrap_or_else(|| "Document".to_string());
        let summary =
            Self::line_value(text, "Project Summary:").unwrap_or_else(|| "Project".to_string());
        let requirements = Self::bullet_items(text);
        let requirements_text = if requirements.is_empty() {
            "- Core functionality".to_string()
        } else {
            requirements.join("\n")
        };

        format!(
            "# {doc_type}: {summary}\n\n\
             ## Introduction\nThis outlines the {} for {}.\n\n\
             ## Requirements\n{requirements_text}\n\n\
             ## Conclusion\nComprehensive framework.",
            doc_type.to_lowercase(),
            summary.to_lowercase()
        )
    }

    fn rewrite_review(&self, text: &str) -> String {
        let start = text
            .find(REVIEW_MARKER)
            .map_or(0, |idx| idx + REVIEW_MARKER.len());
        let tail = &text[start..];
        let end = REVIEW_END_MARKERS
            .iter()
            .filter_map(|marker| tail.find(marker))
            .min()
            .unwrap_or(tail.len());
        let content = tail[..end].trim();

        let collapsed = self.collapse_blank.replace_all(content, "\n\n");
        self.sentence_spacing
            .replace_all(&collapsed, "${1} ${2}")
            .into_owned()
    }
}

impl Default for StubCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Completion for StubCompletion {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let text = request.flattened_text();
        if text.contains(REVIEW_MARKER) {
            Ok(self.rewrite_review(&text))
        } else {
            Ok(Self::render_document(&text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generation_prompt() -> CompletionRequest {
        CompletionRequest::from_prompt(
            "Document Type: SRS\n\
             Project Summary: Inventory system\n\
             Requirements:\n- track stock\n- barcode scanning\n",
            0.1,
        )
    }

    #[tokio::test]
    async fn generation_output_is_structured() {
        let stub = StubCompletion::new();
        let output = stub.complete(&generation_prompt()).await.unwrap();
        assert!(output.starts_with("# SRS: Inventory system"));
        assert!(output.contains("## Introduction"));
        assert!(output.contains("## Requirements"));
        assert!(output.contains("track stock"));
        assert!(output.contains("barcode scanning"));
        assert!(output.contains("## Conclusion"));
    }

    #[tokio::test]
    async fn generation_output_is_deterministic() {
        let stub = StubCompletion::new();
        let first = stub.complete(&generation_prompt()).await.unwrap();
        let second = stub.complete(&generation_prompt()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn generation_defaults_when_markers_missing() {
        let stub = StubCompletion::new();
        let output = stub
            .complete(&CompletionRequest::from_prompt("write something", 0.1))
            .await
            .unwrap();
        assert!(output.starts_with("# Document: Project"));
        assert!(output.contains("- Core functionality"));
    }

    #[tokio::test]
    async fn review_prompt_normalizes_whitespace() {
        let stub = StubCompletion::new();
        let request = CompletionRequest::from_prompt(
            "Review this.\n\nContent to review:\nFirst line.\n\n\n\n\nSecond line.\n\nStyle profile:\nprofessional",
            0.1,
        );
        let output = stub.complete(&request).await.unwrap();
        assert!(!output.contains("\n\n\n"));
        assert!(output.contains("First line."));
        assert!(output.contains("Second line."));
        assert!(!output.contains("Style profile"));
    }

    #[tokio::test]
    async fn review_prompt_fixes_sentence_spacing() {
        let stub = StubCompletion::new();
        let request = CompletionRequest::from_prompt(
            "Content to review:\nDone.Next sentence starts here.",
            0.1,
        );
        let output = stub.complete(&request).await.unwrap();
        assert!(output.contains("Done. Next"));
    }
}
