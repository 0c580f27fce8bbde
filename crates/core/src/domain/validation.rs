// Per-Mailbox Validation Domain Model

use serde::{Deserialize, Serialize};

/// Identity key for one migratable mailbox (primary SMTP address)
pub type Identity = String;

/// Validation depth selects exactly one nested check set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationDepth {
    Basic,
    Standard,
    Comprehensive,
}

impl ValidationDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationDepth::Basic => "basic",
            ValidationDepth::Standard => "standard",
            ValidationDepth::Comprehensive => "comprehensive",
        }
    }
}

impl std::str::FromStr for ValidationDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(ValidationDepth::Basic),
            "standard" => Ok(ValidationDepth::Standard),
            "comprehensive" => Ok(ValidationDepth::Comprehensive),
            other => Err(format!("unknown validation depth: {}", other)),
        }
    }
}

/// Overall readiness classification of one mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    #[default]
    Unknown,
    Ready,
    Warning,
    Failed,
}

impl std::fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverallStatus::Unknown => write!(f, "UNKNOWN"),
            OverallStatus::Ready => write!(f, "READY"),
            OverallStatus::Warning => write!(f, "WARNING"),
            OverallStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// One coded validation error entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: String,
    pub message: String,
}

/// Mutable per-mailbox result aggregate.
///
/// A fixed, versioned record declaring every field checks may write,
/// written incrementally by the selected check set. Owned exclusively by
/// the worker processing its identity until persisted with its window.
/// All fields carry serde defaults so artifacts from older runs load.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ValidationResult {
    // Identity & directory
    pub identity: Identity,
    pub display_name: Option<String>,
    pub user_principal_name: Option<String>,
    pub primary_smtp_address: Option<String>,
    pub alias: Option<String>,
    pub mailbox_guid: Option<String>,
    pub mailbox_type: Option<String>,
    pub recipient_type_details: Option<String>,
    pub organizational_unit: Option<String>,
    pub email_addresses: Vec<String>,
    pub mailbox_found: bool,

    // Licensing
    pub license_found: bool,
    pub license_sku: Option<String>,
    pub has_exchange_license: bool,
    pub license_assignment_pending: bool,

    // Move requests
    pub pending_move_request: bool,
    pub move_request_status: Option<String>,

    // Statistics
    pub item_count: Option<u64>,
    pub total_size_mb: Option<f64>,
    pub deleted_item_count: Option<u64>,
    pub deleted_item_size_mb: Option<f64>,
    pub last_logon_time: Option<String>,

    // Item size limits
    pub largest_item_size_mb: Option<f64>,
    pub has_oversized_items: bool,
    pub oversized_item_count: u64,

    // Special mailbox types
    pub is_shared_mailbox: bool,
    pub is_resource_mailbox: bool,
    pub is_room_mailbox: bool,
    pub is_equipment_mailbox: bool,
    pub archive_enabled: bool,
    pub archive_size_mb: Option<f64>,
    pub litigation_hold_enabled: bool,
    pub retention_hold_enabled: bool,

    // Permissions
    pub full_access_delegates: Vec<String>,
    pub send_as_delegates: Vec<String>,
    pub send_on_behalf_delegates: Vec<String>,
    pub has_orphaned_permissions: bool,
    pub orphaned_permission_count: u64,

    // Group membership
    pub group_memberships: Vec<String>,
    pub nested_group_depth: u32,
    pub distribution_group_member: bool,

    // Messaging configuration
    pub forwarding_enabled: bool,
    pub forwarding_address: Option<String>,
    pub deliver_to_mailbox_and_forward: bool,
    pub inbox_rules_count: u64,
    pub active_sync_enabled: bool,
    pub imap_enabled: bool,
    pub pop_enabled: bool,

    // Folder structure
    pub folder_count: Option<u64>,
    pub max_folder_depth: u32,
    pub deep_folder_hierarchy: bool,
    pub empty_folder_count: u64,
    pub folder_name_conflicts: Vec<String>,

    // Calendar & contacts
    pub calendar_item_count: Option<u64>,
    pub contact_item_count: Option<u64>,
    pub shared_calendar_count: u64,

    // Audit configuration
    pub audit_enabled: bool,
    pub audit_log_age_days: Option<u32>,

    // Namespace & accepted domains
    pub domain_accepted: bool,
    pub domain_name: Option<String>,
    pub proxy_address_conflicts: Vec<String>,

    // Outcome (derived once, after all selected checks ran)
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<String>,
    pub overall_status: OverallStatus,
    pub validated_at: Option<i64>,
}

impl ValidationResult {
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
            ..Default::default()
        }
    }

    /// Append an ordered error entry
    pub fn add_error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            code: code.into(),
            message: message.into(),
        });
    }

    /// Append an ordered warning entry
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Derive the overall status. Called exactly once, after all selected
    /// checks ran: Failed iff errors non-empty, else Warning iff warnings
    /// non-empty, else Ready.
    pub fn finalize(&mut self, now_millis: i64) {
        self.overall_status = if !self.errors.is_empty() {
            OverallStatus::Failed
        } else if !self.warnings.is_empty() {
            OverallStatus::Warning
        } else {
            OverallStatus::Ready
        };
        self.validated_at = Some(now_millis);
    }

    /// Synthetic result for an identity whose runner failed catastrophically,
    /// so it is never silently dropped from the final report
    pub fn catastrophic(identity: impl Into<Identity>, message: impl Into<String>, now_millis: i64) -> Self {
        let mut result = Self::new(identity);
        result.add_error("RUNNER_FAILURE", message);
        result.finalize(now_millis);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ready_when_clean() {
        let mut r = ValidationResult::new("alice@contoso.com");
        assert_eq!(r.overall_status, OverallStatus::Unknown);
        r.finalize(1000);
        assert_eq!(r.overall_status, OverallStatus::Ready);
        assert_eq!(r.validated_at, Some(1000));
    }

    #[test]
    fn test_status_warning_when_only_warnings() {
        let mut r = ValidationResult::new("bob@contoso.com");
        r.add_warning("mailbox has 3 inbox rules");
        r.finalize(1000);
        assert_eq!(r.overall_status, OverallStatus::Warning);
    }

    #[test]
    fn test_status_failed_when_any_error() {
        let mut r = ValidationResult::new("carol@contoso.com");
        r.add_warning("some warning");
        r.add_error("MBX_NOT_FOUND", "mailbox not found");
        r.finalize(1000);
        assert_eq!(r.overall_status, OverallStatus::Failed);
    }

    #[test]
    fn test_catastrophic_result_is_failed() {
        let r = ValidationResult::catastrophic("dave@contoso.com", "worker panicked", 42);
        assert_eq!(r.overall_status, OverallStatus::Failed);
        assert_eq!(r.errors[0].code, "RUNNER_FAILURE");
    }

    #[test]
    fn test_loads_with_missing_fields() {
        // Forward compatibility: older artifacts lack newer fields
        let r: ValidationResult =
            serde_json::from_str(r#"{"identity":"eve@contoso.com"}"#).unwrap();
        assert_eq!(r.identity, "eve@contoso.com");
        assert_eq!(r.overall_status, OverallStatus::Unknown);
        assert!(r.errors.is_empty());
    }
}
