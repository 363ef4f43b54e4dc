use super::Outcome;
use crate::cache::TtlCache;
use crate::store::{DocumentQuery, DocumentStore};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

const PROFESSIONAL_KEYWORDS: &[&str] = &[
    "requirements",
    "specifications",
    "implementation",
    "deliverables",
    "stakeholders",
    "objectives",
    "methodology",
    "framework",
];

const TECHNICAL_KEYWORDS: &[&str] = &[
    "system",
    "architecture",
    "database",
    "api",
    "interface",
    "algorithm",
    "protocol",
    "configuration",
    "deployment",
];

const FORMAL_KEYWORDS: &[&str] = &[
    "shall",
    "must",
    "should",
    "will",
    "hereby",
    "therefore",
    "furthermore",
    "consequently",
    "accordingly",
];

/// Fixed technical vocabulary tracked for terminology frequencies.
const RELEVANT_TERMS: &[&str] = &[
    "requirements",
    "specifications",
    "implementation",
    "system",
    "architecture",
    "design",
    "development",
    "testing",
    "deployment",
    "database",
    "interface",
    "api",
    "security",
    "performance",
    "functionality",
    "feature",
    "module",
    "component",
    "service",
];

const TERMS_PER_DOCUMENT: usize = 15;
const TERMS_IN_PROFILE: usize = 10;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#+)\s+(.+)$").expect("static pattern"));
static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-Z]{4,}\b").expect("static pattern"));

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StructureProfile {
    /// Weighted counts per heading level, keyed "level_1", "level_2", ...
    pub heading_levels: BTreeMap<String, f64>,
    /// Detected section categories (introduction, requirements, ...).
    pub section_types: Vec<String>,
    pub dominant_heading: String,
}

/// Aggregate tone/terminology/structure descriptor learned from a weighted
/// corpus of approved documents. Never mutated after construction — only
/// replaced when the cache window lapses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleProfile {
    pub tone: String,
    pub tone_analysis: BTreeMap<String, f64>,
    /// Top weighted term frequencies, descending.
    pub terminology: Vec<(String, f64)>,
    pub structure: StructureProfile,
    pub heading_style: String,
    pub list_style: String,
    pub formatting: String,
    pub document_count: usize,
    pub is_default: bool,
    pub created_at: String,
}

impl StyleProfile {
    /// Fixed profile used when no approved documents match.
    #[must_use]
    pub fn default_profile() -> Self {
        Self {
            tone: "professional".to_string(),
            tone_analysis: BTreeMap::new(),
            terminology: Vec::new(),
            structure: StructureProfile {
                heading_levels: BTreeMap::new(),
                section_types: Vec::new(),
                dominant_heading: "level_1".to_string(),
            },
            heading_style: "atx".to_string(),
            list_style: "bulleted".to_string(),
            formatting: "markdown".to_string(),
            document_count: 0,
            is_default: true,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    /// Flattened description for generation prompts.
    #[must_use]
    pub fn flattened(&self) -> String {
        format!(
            "Writing Style: {}\nStructure: standard\nFormatting: {}",
            self.tone, self.formatting
        )
    }

    /// One-line summary for review prompts.
    #[must_use]
    pub fn review_summary(&self) -> String {
        format!(
            "Primary tone: {}; Heading style: {}; List style: {}",
            self.tone, self.heading_style, self.list_style
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleBuild {
    pub profile: StyleProfile,
    pub document_count: usize,
}

type CacheKey = (Vec<String>, Option<i64>);

/// Builds style profiles from the approved-document corpus, weighted by
/// feedback score, with a wall-clock TTL cache.
pub struct StyleProfiler {
    store: DocumentStore,
    cache: TtlCache<CacheKey, StyleBuild>,
    ttl: Duration,
}

impl StyleProfiler {
    #[must_use]
    pub fn new(store: DocumentStore, ttl: Duration) -> Self {
        Self {
            store,
            cache: TtlCache::new(),
            ttl,
        }
    }

    pub async fn build(
        &self,
        doc_types: Option<&[String]>,
        min_feedback_score: Option<i64>,
    ) -> Outcome<StyleBuild> {
        let mut key_types: Vec<String> = doc_types.unwrap_or_default().to_vec();
        key_types.sort();
        let key: CacheKey = (key_types.clone(), min_feedback_score);

        if let Some(cached) = self.cache.get(&key, self.ttl).await {
            tracing::debug!("style profile served from cache");
            return Outcome::ok(cached);
        }

        tracing::info!(?doc_types, ?min_feedback_score, "🎨 building style profile");

        let documents = match self
            .store
            .list_documents(&DocumentQuery {
                doc_types: doc_types.filter(|t| !t.is_empty()).map(<[String]>::to_vec),
                approved: Some(true),
                min_feedback_score,
            })
            .await
        {
            Ok(docs) => docs,
            Err(e) => {
                tracing::warn!("style corpus query failed: {e}");
                return Outcome::degraded(
                    StyleBuild {
                        profile: StyleProfile::default_profile(),
                        document_count: 0,
                    },
                    format!("corpus query failed: {e}"),
                );
            }
        };

        if documents.is_empty() {
            let build = StyleBuild {
                profile: StyleProfile::default_profile(),
                document_count: 0,
            };
            self.cache.put(key, build.clone()).await;
            return Outcome::ok(build);
        }

        let mut tone_totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut term_totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut heading_totals: BTreeMap<String, f64> = BTreeMap::new();
        let mut section_types: Vec<String> = Vec::new();
        let mut total_weight = 0.0_f64;

        for document in &documents {
            #[allow(clippy::cast_precision_loss)]
            let weight = document.feedback_score as f64 / 5.0;
            total_weight += weight;

            for (tone, score) in analyze_tone(&document.content) {
                *tone_totals.entry(tone).or_default() += score * weight;
            }

            for (term, count) in extract_terminology(&document.content) {
                *term_totals.entry(term).or_default() += count * weight;
            }

            let (headings, sections) = analyze_structure(&document.content);
            for (level, count) in headings {
                *heading_totals.entry(level).or_default() += count * weight;
            }
            for section in sections {
                if !section_types.contains(&section) {
                    section_types.push(section);
                }
            }
        }

        if total_weight > 0.0 {
            for score in tone_totals.values_mut() {
                *score /= total_weight;
            }
        }

        let tone = argmax(&tone_totals).unwrap_or_else(|| "professional".to_string());
        let dominant_heading = argmax(&heading_totals).unwrap_or_else(|| "level_1".to_string());

        let mut terminology: Vec<(String, f64)> = term_totals.into_iter().collect();
        terminology.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        terminology.truncate(TERMS_IN_PROFILE);

        section_types.sort();

        let profile = StyleProfile {
            tone,
            tone_analysis: tone_totals,
            terminology,
            heading_style: if dominant_heading == "level_1" {
                "atx".to_string()
            } else {
                "setext".to_string()
            },
            structure: StructureProfile {
                heading_levels: heading_totals,
                section_types,
                dominant_heading,
            },
            list_style: "bulleted".to_string(),
            formatting: "markdown".to_string(),
            document_count: documents.len(),
            is_default: false,
            created_at: Utc::now().to_rfc3339(),
        };

        let build = StyleBuild {
            document_count: documents.len(),
            profile,
        };

        // Audit record; failures degrade to returning the fresh profile.
        let profile_name = if key_types.is_empty() {
            "all_profile".to_string()
        } else {
            format!("{}_profile", key_types.join("_"))
        };
        let mut degradation = None;
        match serde_json::to_value(&build.profile) {
            Ok(profile_json) => {
                if let Err(e) = self
                    .store
                    .save_style_profile(&profile_name, &profile_json, &key_types)
                    .await
                {
                    tracing::warn!("style profile persistence failed: {e}");
                    degradation = Some(format!("profile persistence failed: {e}"));
                }
            }
            Err(e) => degradation = Some(format!("profile serialization failed: {e}")),
        }

        self.cache.put(key, build.clone()).await;

        match degradation {
            None => Outcome::ok(build),
            Some(reason) => Outcome::degraded(build, reason),
        }
    }
}

fn argmax(map: &BTreeMap<String, f64>) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (key, value) in map {
        match best {
            Some((_, best_value)) if *value <= best_value => {}
            _ => best = Some((key, *value)),
        }
    }
    best.map(|(key, _)| key.clone())
}

/// Keyword-density tone signal across three fixed lexical categories,
/// each clamped to 1.0.
fn analyze_tone(content: &str) -> BTreeMap<String, f64> {
    let mut scores = BTreeMap::new();
    let total_words = content.split_whitespace().count();
    if total_words == 0 {
        scores.insert("professional".to_string(), 0.5);
        scores.insert("technical".to_string(), 0.5);
        scores.insert("formal".to_string(), 0.5);
        return scores;
    }

    let content_lower = content.to_lowercase();
    let density = |keywords: &[&str]| -> f64 {
        let hits: usize = keywords
            .iter()
            .map(|word| content_lower.matches(word).count())
            .sum();
        #[allow(clippy::cast_precision_loss)]
        let score = hits as f64 / total_words as f64 * 1000.0;
        score.min(1.0)
    };

    scores.insert("professional".to_string(), density(PROFESSIONAL_KEYWORDS));
    scores.insert("technical".to_string(), density(TECHNICAL_KEYWORDS));
    scores.insert("formal".to_string(), density(FORMAL_KEYWORDS));
    scores
}

/// Occurrence counts of the fixed technical vocabulary, top-N per document.
fn extract_terminology(content: &str) -> Vec<(String, f64)> {
    let content_lower = content.to_lowercase();
    let words: Vec<&str> = WORD_RE
        .find_iter(&content_lower)
        .map(|m| m.as_str())
        .collect();

    let mut counts: Vec<(String, f64)> = RELEVANT_TERMS
        .iter()
        .filter_map(|term| {
            let count = words.iter().filter(|w| *w == term).count();
            #[allow(clippy::cast_precision_loss)]
            (count > 0).then(|| ((*term).to_string(), count as f64))
        })
        .collect();

    counts.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    counts.truncate(TERMS_PER_DOCUMENT);
    counts
}

/// Heading-level histogram plus detected section categories.
fn analyze_structure(content: &str) -> (BTreeMap<String, f64>, Vec<String>) {
    let mut heading_levels: BTreeMap<String, f64> = BTreeMap::new();
    let mut section_types: Vec<String> = Vec::new();

    for capture in HEADING_RE.captures_iter(content) {
        let level = capture[1].len();
        *heading_levels.entry(format!("level_{level}")).or_default() += 1.0;

        let text_lower = capture[2].to_lowercase();
        let category = if ["introduction", "overview"].iter().any(|w| text_lower.contains(w)) {
            Some("introduction")
        } else if ["requirement", "specification"].iter().any(|w| text_lower.contains(w)) {
            Some("requirements")
        } else if ["architecture", "design"].iter().any(|w| text_lower.contains(w)) {
            Some("architecture")
        } else if ["implementation", "development"].iter().any(|w| text_lower.contains(w)) {
            Some("implementation")
        } else if ["testing", "validation"].iter().any(|w| text_lower.contains(w)) {
            Some("testing")
        } else if ["conclusion", "summary"].iter().any(|w| text_lower.contains(w)) {
            Some("conclusion")
        } else {
            None
        };

        if let Some(category) = category {
            let category = category.to_string();
            if !section_types.contains(&category) {
                section_types.push(category);
            }
        }
    }

    (heading_levels, section_types)
}
