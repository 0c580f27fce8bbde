// Check Registry - named readiness checks in nested depth groups

mod basic;
mod comprehensive;
mod standard;

use std::sync::Arc;

use async_trait::async_trait;

use crate::application::retry::RetryOptions;
use crate::application::session::SessionManager;
use crate::domain::{ValidationDepth, ValidationResult};
use crate::port::{DirectoryGateway, GatewayResult};

pub use basic::{LicenseCheck, MailboxIdentityCheck, PendingMoveCheck};
pub use comprehensive::{
    AuditConfigCheck, CalendarContactsCheck, FolderStructureCheck, GroupMembershipCheck,
    MessagingConfigCheck, NamespaceConflictCheck, OrphanedPermissionsCheck,
};
pub use standard::{ItemSizeCheck, PermissionsCheck, SpecialTypeCheck, StatisticsCheck};

/// Shared dependencies for check execution. Immutable; checks mutate only
/// their own mailbox's result aggregate.
pub struct CheckContext {
    pub gateway: Arc<dyn DirectoryGateway>,
    pub session: Arc<SessionManager>,
    pub retry: RetryOptions,
}

/// One independent readiness test.
///
/// Checks are stateless and order-tolerant: a later check may read fields
/// set earlier but must tolerate their defaults. A check returning an error
/// (after its remote fetches exhausted their retries) is downgraded to a
/// warning by the runner; it can never abort its mailbox.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()>;
}

/// The selected nested check set for a depth: Basic ⊆ Standard ⊆ Comprehensive
pub fn checks_for(depth: ValidationDepth) -> Vec<Arc<dyn ReadinessCheck>> {
    let mut set: Vec<Arc<dyn ReadinessCheck>> = vec![
        Arc::new(MailboxIdentityCheck),
        Arc::new(LicenseCheck),
        Arc::new(PendingMoveCheck),
    ];

    if depth >= ValidationDepth::Standard {
        set.push(Arc::new(StatisticsCheck));
        set.push(Arc::new(PermissionsCheck));
        set.push(Arc::new(ItemSizeCheck));
        set.push(Arc::new(SpecialTypeCheck));
    }

    if depth >= ValidationDepth::Comprehensive {
        set.push(Arc::new(MessagingConfigCheck));
        set.push(Arc::new(OrphanedPermissionsCheck));
        set.push(Arc::new(GroupMembershipCheck));
        set.push(Arc::new(FolderStructureCheck));
        set.push(Arc::new(CalendarContactsCheck));
        set.push(Arc::new(AuditConfigCheck));
        set.push(Arc::new(NamespaceConflictCheck));
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depths_are_nested() {
        let basic = checks_for(ValidationDepth::Basic);
        let standard = checks_for(ValidationDepth::Standard);
        let comprehensive = checks_for(ValidationDepth::Comprehensive);

        assert_eq!(basic.len(), 3);
        assert_eq!(standard.len(), 7);
        assert_eq!(comprehensive.len(), 14);

        let names = |set: &[Arc<dyn ReadinessCheck>]| {
            set.iter().map(|c| c.name()).collect::<Vec<_>>()
        };
        let standard_names = names(&standard);
        for name in names(&basic) {
            assert!(standard_names.contains(&name));
        }
        let comprehensive_names = names(&comprehensive);
        for name in standard_names {
            assert!(comprehensive_names.contains(&name));
        }
    }
}
