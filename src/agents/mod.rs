pub mod compliance;
pub mod generator;
pub mod ingestion;
pub mod retriever;
pub mod reviewer;
pub mod style;

pub use compliance::{ComplianceReport, check_compliance, required_sections};
pub use generator::{Draft, DraftGenerator};
pub use ingestion::{IngestReport, IngestionAgent};
pub use retriever::{RetrievedContext, Retriever};
pub use reviewer::{DiffDetails, Review, ReviewType, Reviewer};
pub use style::{StyleBuild, StyleProfile, StyleProfiler};

use serde::{Deserialize, Serialize};

/// Result of a best-effort agent operation.
///
/// Degradation is an explicit variant rather than a silently swallowed
/// exception: callers (and tests) can tell "succeeded" from "fell back"
/// from "nothing usable produced".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { value: T },
    Degraded { value: T, reason: String },
    Failed { reason: String },
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self::Ok { value }
    }

    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Self::Degraded {
            value,
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok { value } | Self::Degraded { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Ok { value } | Self::Degraded { value, .. } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Degraded { reason, .. } | Self::Failed { reason } => Some(reason),
        }
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors_per_variant() {
        let ok: Outcome<u32> = Outcome::ok(1);
        assert_eq!(ok.value(), Some(&1));
        assert!(ok.reason().is_none());

        let degraded: Outcome<u32> = Outcome::degraded(2, "fallback used");
        assert_eq!(degraded.value(), Some(&2));
        assert_eq!(degraded.reason(), Some("fallback used"));
        assert!(degraded.is_degraded());

        let failed: Outcome<u32> = Outcome::failed("nothing produced");
        assert!(failed.value().is_none());
        assert!(failed.is_failed());
    }

    #[test]
    fn serializes_with_status_tag() {
        let degraded: Outcome<u32> = Outcome::degraded(2, "fallback");
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["value"], 2);
    }
}
