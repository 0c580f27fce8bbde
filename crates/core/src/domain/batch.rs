// Migration Batch Domain Model & Tolerance Heuristic

use serde::{Deserialize, Serialize};

use crate::domain::validation::Identity;

/// Which classified identities are included in the submitted batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InclusionPolicy {
    ReadyOnly,
    ReadyAndWarning,
    Abort,
}

impl std::fmt::Display for InclusionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InclusionPolicy::ReadyOnly => write!(f, "READY_ONLY"),
            InclusionPolicy::ReadyAndWarning => write!(f, "READY_AND_WARNING"),
            InclusionPolicy::Abort => write!(f, "ABORT"),
        }
    }
}

/// Migration batch descriptor. Immutable once submitted; a duplicate name
/// is a remote conflict, so existence is checked before submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationBatchDescriptor {
    pub name: String,
    pub source_endpoint: String,
    pub target_domain: String,
    pub complete_after: Option<i64>,
    pub start_after: Option<i64>,
    pub notification_emails: Vec<String>,
    pub mailboxes: Vec<Identity>,
    pub auto_start: bool,
}

/// Advisory migration risk for one mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Per-mailbox bad-item tolerance with its advisory risk level.
/// Advisory only: it never changes Ready/Warning/Failed classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToleranceAssessment {
    pub bad_item_limit: u32,
    pub risk: RiskLevel,
}

const DEFAULT_TOLERANCE: u32 = 10;
const LARGE_MAILBOX_ITEMS: u64 = 100_000;
const MEDIUM_MAILBOX_ITEMS: u64 = 50_000;

/// Compute the per-mailbox bad-item tolerance.
///
/// Default 10; above 100k items `min(100, ceil(count * 0.001))`; above 50k
/// items `min(50, ceil(count * 0.0005))`. A prior deep-folder-hierarchy
/// finding forces risk to High regardless of count.
pub fn compute_tolerance(item_count: u64, deep_folder_hierarchy: bool) -> ToleranceAssessment {
    let (bad_item_limit, mut risk) = if item_count > LARGE_MAILBOX_ITEMS {
        let scaled = (item_count as f64 * 0.001).ceil() as u32;
        (scaled.min(100), RiskLevel::High)
    } else if item_count > MEDIUM_MAILBOX_ITEMS {
        let scaled = (item_count as f64 * 0.0005).ceil() as u32;
        (scaled.min(50), RiskLevel::Medium)
    } else {
        (DEFAULT_TOLERANCE, RiskLevel::Low)
    };

    if deep_folder_hierarchy {
        risk = RiskLevel::High;
    }

    ToleranceAssessment {
        bad_item_limit,
        risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_large_mailbox() {
        let t = compute_tolerance(150_000, false);
        assert_eq!(t.bad_item_limit, 100);
        assert_eq!(t.risk, RiskLevel::High);
    }

    #[test]
    fn test_tolerance_medium_mailbox() {
        let t = compute_tolerance(60_000, false);
        assert_eq!(t.bad_item_limit, 30);
        assert_eq!(t.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_tolerance_small_mailbox_default() {
        let t = compute_tolerance(1_000, false);
        assert_eq!(t.bad_item_limit, 10);
        assert_eq!(t.risk, RiskLevel::Low);
    }

    #[test]
    fn test_deep_hierarchy_forces_high_risk() {
        let t = compute_tolerance(1_000, true);
        assert_eq!(t.bad_item_limit, 10);
        assert_eq!(t.risk, RiskLevel::High);
    }

    #[test]
    fn test_tolerance_caps() {
        // 1,000,000 * 0.001 = 1000, capped at 100
        assert_eq!(compute_tolerance(1_000_000, false).bad_item_limit, 100);
        // 99,999 * 0.0005 = 50.0 -> ceil 50, capped at 50
        assert_eq!(compute_tolerance(99_999, false).bad_item_limit, 50);
    }

    #[test]
    fn test_boundary_counts_use_default() {
        assert_eq!(compute_tolerance(50_000, false).bad_item_limit, 10);
        // 100,000 falls into the medium bucket, not the large one
        assert_eq!(compute_tolerance(100_000, false).bad_item_limit, 50);
    }
}
