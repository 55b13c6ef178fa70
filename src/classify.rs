//! Status classifier: map a status label to a presentation badge.
//!
//! Display code that only holds the free-text label uses [`classify`]. Code
//! holding a [`crate::job::JobStatus`] should prefer
//! [`crate::job::JobStatus::badge`], which matches on the variant instead of
//! on substrings.

use serde::{Deserialize, Serialize};

/// Presentation category of a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeCategory {
    Danger,
    Success,
    Primary,
    Muted,
}

/// A category plus the text shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBadge {
    pub category: BadgeCategory,
    pub label: String,
}

impl StatusBadge {
    pub fn new(category: BadgeCategory, label: impl Into<String>) -> Self {
        Self {
            category,
            label: label.into(),
        }
    }
}

/// Classify a free-text status. Rules apply in priority order, matching
/// case-insensitive substrings.
pub fn classify(status: Option<&str>) -> StatusBadge {
    let Some(raw) = status else {
        return StatusBadge::new(BadgeCategory::Muted, "Ready");
    };
    let lower = raw.to_lowercase();

    if lower.contains("fail") {
        StatusBadge::new(BadgeCategory::Danger, "Failed")
    } else if lower.contains("complete") {
        StatusBadge::new(BadgeCategory::Success, "Completed")
    } else if ["upload", "convert", "status"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        StatusBadge::new(BadgeCategory::Primary, "Processing")
    } else {
        StatusBadge::new(BadgeCategory::Primary, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_is_ready() {
        assert_eq!(classify(None), StatusBadge::new(BadgeCategory::Muted, "Ready"));
    }

    #[test]
    fn failure_wins_over_everything() {
        let b = classify(Some("Upload FAILED after complete handshake"));
        assert_eq!(b, StatusBadge::new(BadgeCategory::Danger, "Failed"));
    }

    #[test]
    fn completed() {
        assert_eq!(classify(Some("Conversion Complete!")).category, BadgeCategory::Success);
        assert_eq!(classify(Some("completed")).label, "Completed");
    }

    #[test]
    fn processing_keywords() {
        for s in [
            "uploading",
            "requesting-upload-url",
            "converting",
            "Conversion status: processing",
        ] {
            assert_eq!(
                classify(Some(s)),
                StatusBadge::new(BadgeCategory::Primary, "Processing"),
                "{s}"
            );
        }
    }

    #[test]
    fn other_text_passes_through() {
        assert_eq!(
            classify(Some("polling:processing")),
            StatusBadge::new(BadgeCategory::Primary, "polling:processing")
        );
        assert_eq!(classify(Some("queued")).label, "queued");
    }

    #[test]
    fn empty_string_is_present() {
        assert_eq!(classify(Some("")), StatusBadge::new(BadgeCategory::Primary, ""));
    }
}
