use crate::utils::word_count;
use serde::{Deserialize, Serialize};

/// Default minimum word count below which a draft is flagged incomplete.
pub const DEFAULT_MIN_WORD_COUNT: usize = 500;

const GENERIC_SECTIONS: &[&str] = &["Introduction", "Content", "Conclusion"];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub missing_sections: Vec<String>,
    pub issues: Vec<String>,
}

/// Required section names per document type; unknown types fall back to a
/// generic three-section list.
#[must_use]
pub fn required_sections(doc_type: &str) -> &'static [&'static str] {
    match doc_type {
        "SRS" => &["Introduction", "Requirements", "Specifications"],
        "SOW" => &["Scope", "Deliverables", "Timeline"],
        "Proposal" => &["Overview", "Approach", "Budget"],
        "Technical" => &["Architecture", "Implementation", "API"],
        "Business" => &["Executive Summary", "Market Analysis", "Financial"],
        _ => GENERIC_SECTIONS,
    }
}

/// Validate a draft against the required-section checklist and a minimum
/// length heuristic. A section counts as present when its name appears
/// case-insensitively anywhere in the content — no structural parsing.
#[must_use]
pub fn check_compliance(doc_type: &str, content: &str, min_words: usize) -> ComplianceReport {
    let mut report = ComplianceReport {
        compliant: true,
        missing_sections: Vec::new(),
        issues: Vec::new(),
    };

    let content_lower = content.to_lowercase();
    for section in required_sections(doc_type) {
        if !content_lower.contains(&section.to_lowercase()) {
            report.missing_sections.push((*section).to_string());
            report.compliant = false;
        }
    }

    if word_count(content) < min_words {
        report.compliant = false;
        report
            .issues
            .push("Document too short - likely incomplete or truncated".to_string());
    }

    report
}
