use super::Outcome;
use super::style::StyleProfile;
use crate::completion::{Completion, CompletionRequest};
use crate::prompt::PromptEngine;
use crate::utils::word_count;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// Returned unified diffs are capped at this many lines.
const MAX_DIFF_LINES: usize = 100;

static SENTENCE_SPACING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?])\s*([A-Z])").expect("static pattern"));

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ReviewType {
    Formatting,
    Feedback,
    Both,
}

impl ReviewType {
    #[must_use]
    pub const fn includes_formatting(self) -> bool {
        matches!(self, Self::Formatting | Self::Both)
    }

    #[must_use]
    pub const fn includes_feedback(self) -> bool {
        matches!(self, Self::Feedback | Self::Both)
    }
}

/// Line-level change record between the original and reviewed content.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiffDetails {
    pub removed: Vec<String>,
    pub added: Vec<String>,
    pub summary: Vec<String>,
    pub unified: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub improved_content: String,
    pub changes_made: Vec<String>,
    pub diff: DiffDetails,
    pub original_word_count: usize,
    pub final_word_count: usize,
}

/// Requests formatting/feedback-driven rewrites, reconciles whitespace and
/// punctuation deterministically, and records a structural diff for audit.
pub struct Reviewer {
    completion: Arc<dyn Completion>,
    prompts: PromptEngine,
    temperature: f64,
}

impl Reviewer {
    pub fn new(completion: Arc<dyn Completion>, temperature: f64) -> anyhow::Result<Self> {
        Ok(Self {
            completion,
            prompts: PromptEngine::new()?,
            temperature,
        })
    }

    pub async fn review(
        &self,
        content: &str,
        _doc_type: &str,
        style: Option<&StyleProfile>,
        feedback: &[String],
        review_type: ReviewType,
    ) -> Outcome<Review> {
        tracing::info!(
            content_length = content.len(),
            %review_type,
            "✏️ reviewing document"
        );

        let mut improved = content.to_string();
        let mut changes_made: Vec<String> = Vec::new();
        let mut failures: Vec<String> = Vec::new();
        let mut attempted = 0_u32;

        if review_type.includes_formatting() {
            attempted += 1;
            let style_text = style.map_or_else(
                || "Professional technical writing style with clear structure".to_string(),
                StyleProfile::review_summary,
            );
            let pass = match self.prompts.render_formatting_review(&improved, &style_text) {
                Ok(prompt) => self.rewrite(prompt).await,
                Err(e) => Err(e),
            };
            match pass {
                Ok(rewritten) => {
                    improved = rewritten;
                    changes_made.push("Applied formatting improvements".to_string());
                }
                Err(e) => {
                    tracing::warn!("formatting review pass failed: {e}");
                    failures.push(format!("formatting pass failed: {e}"));
                }
            }
        }

        if review_type.includes_feedback() && !feedback.is_empty() {
            attempted += 1;
            let feedback_text = feedback
                .iter()
                .map(|item| format!("- {item}"))
                .collect::<Vec<_>>()
                .join("\n");
            let pass = match self.prompts.render_feedback_review(&improved, &feedback_text) {
                Ok(prompt) => self.rewrite(prompt).await,
                Err(e) => Err(e),
            };
            match pass {
                Ok(rewritten) => {
                    improved = rewritten;
                    changes_made.push(format!("Addressed {} feedback items", feedback.len()));
                }
                Err(e) => {
                    tracing::warn!("feedback review pass failed: {e}");
                    failures.push(format!("feedback pass failed: {e}"));
                }
            }
        }

        if attempted > 0 && changes_made.is_empty() {
            return Outcome::failed(format!(
                "all review passes failed: {}",
                failures.join("; ")
            ));
        }

        let final_content = post_process_formatting(&improved);
        let diff = line_diff(content, &final_content);

        let review = Review {
            original_word_count: word_count(content),
            final_word_count: word_count(&final_content),
            improved_content: final_content,
            changes_made,
            diff,
        };

        if failures.is_empty() {
            Outcome::ok(review)
        } else {
            Outcome::degraded(review, failures.join("; "))
        }
    }

    async fn rewrite(&self, prompt: String) -> anyhow::Result<String> {
        let request = CompletionRequest::from_prompt(prompt, self.temperature);
        let output = self.completion.complete(&request).await?;
        anyhow::ensure!(!output.trim().is_empty(), "rewrite returned empty output");
        Ok(output)
    }
}

/// Deterministic whitespace/punctuation reconciliation: blank lines around
/// headings, at most two consecutive blank lines, standard sentence spacing.
#[must_use]
pub fn post_process_formatting(content: &str) -> String {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut processed: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if line.starts_with('#') {
            if processed.last().is_some_and(|prev| !prev.trim().is_empty()) {
                processed.push(String::new());
            }
            processed.push((*line).to_string());
            if i + 1 < lines.len() && !lines[i + 1].trim().is_empty() {
                processed.push(String::new());
            }
        } else {
            processed.push((*line).to_string());
        }
    }

    let mut final_lines: Vec<String> = Vec::new();
    let mut blank_count = 0_usize;
    for line in processed {
        if line.trim().is_empty() {
            blank_count += 1;
            if blank_count <= 2 {
                final_lines.push(line);
            }
        } else {
            blank_count = 0;
            final_lines.push(line);
        }
    }

    let joined = final_lines.join("\n");
    SENTENCE_SPACING_RE
        .replace_all(&joined, "${1} ${2}")
        .trim()
        .to_string()
}

/// Multiset line diff: which lines disappeared, which appeared, and a
/// one-line classification of the change.
#[must_use]
pub fn line_diff(original: &str, improved: &str) -> DiffDetails {
    let original_lines: Vec<&str> = original.split('\n').collect();
    let improved_lines: Vec<&str> = improved.split('\n').collect();

    let mut surplus: HashMap<&str, i64> = HashMap::new();
    for line in &original_lines {
        *surplus.entry(*line).or_default() += 1;
    }
    for line in &improved_lines {
        *surplus.entry(*line).or_default() -= 1;
    }

    let mut remaining = surplus.clone();
    let mut removed: Vec<String> = Vec::new();
    for line in &original_lines {
        if let Some(count) = remaining.get_mut(line)
            && *count > 0
        {
            removed.push((*line).to_string());
            *count -= 1;
        }
    }

    let mut added: Vec<String> = Vec::new();
    for line in &improved_lines {
        if let Some(count) = surplus.get_mut(line)
            && *count < 0
        {
            added.push((*line).to_string());
            *count += 1;
        }
    }

    let mut summary = Vec::new();
    if !removed.is_empty() && !added.is_empty() {
        summary.push("Content was revised with both removals and additions.".to_string());
    } else if !removed.is_empty() {
        summary.push("Content was streamlined with some text removed.".to_string());
    } else if !added.is_empty() {
        summary.push("Content was enhanced with additional information.".to_string());
    }

    let mut unified: Vec<String> = removed
        .iter()
        .map(|line| format!("-{line}"))
        .chain(added.iter().map(|line| format!("+{line}")))
        .collect();
    unified.truncate(MAX_DIFF_LINES);

    DiffDetails {
        removed,
        added,
        summary,
        unified,
    }
}
