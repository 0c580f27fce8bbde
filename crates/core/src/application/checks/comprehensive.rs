// Comprehensive Depth Checks - configuration, permissions hygiene, folder
// structure, calendar/contacts, audit, namespace

use std::collections::HashSet;

use async_trait::async_trait;

use crate::application::retry::execute_with_retry;
use crate::domain::ValidationResult;
use crate::port::GatewayResult;

use super::{CheckContext, ReadinessCheck};

/// Folder depth beyond which the move service degrades badly
pub const DEEP_FOLDER_DEPTH: u32 = 10;

/// Nested group depth beyond which membership resolution is unreliable
pub const MAX_NESTED_GROUP_DEPTH: u32 = 5;

/// Inbox rule count above which operators should review before moving
pub const INBOX_RULES_WARNING_THRESHOLD: u64 = 50;

/// Record forwarding, protocol, and rule configuration
pub struct MessagingConfigCheck;

#[async_trait]
impl ReadinessCheck for MessagingConfigCheck {
    fn name(&self) -> &'static str {
        "messaging-config"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || ctx.session.execute(|| ctx.gateway.get_mailbox(&identity)),
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(info) => {
                result.forwarding_enabled = info.forwarding_enabled;
                result.forwarding_address = info.forwarding_address;
                result.deliver_to_mailbox_and_forward = info.deliver_to_mailbox_and_forward;
                result.inbox_rules_count = info.inbox_rules_count;
                result.active_sync_enabled = info.active_sync_enabled;
                result.imap_enabled = info.imap_enabled;
                result.pop_enabled = info.pop_enabled;

                if info.forwarding_enabled {
                    result.add_warning("mail forwarding is enabled and will not be migrated");
                }
                if info.inbox_rules_count > INBOX_RULES_WARNING_THRESHOLD {
                    result.add_warning(format!(
                        "{} inbox rules: review before migration",
                        info.inbox_rules_count
                    ));
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Detect permission entries whose holder no longer resolves
pub struct OrphanedPermissionsCheck;

#[async_trait]
impl ReadinessCheck for OrphanedPermissionsCheck {
    fn name(&self) -> &'static str {
        "orphaned-permissions"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let permissions = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_permissions(&identity))
            },
            &ctx.retry,
        )
        .await?;

        let orphaned = permissions.iter().filter(|p| p.orphaned).count() as u64;
        if orphaned > 0 {
            result.has_orphaned_permissions = true;
            result.orphaned_permission_count = orphaned;
            result.add_warning(format!(
                "{} orphaned permission entr(ies) will be dropped",
                orphaned
            ));
        }
        Ok(())
    }
}

/// Resolve recursive group membership and flag excessive nesting
pub struct GroupMembershipCheck;

#[async_trait]
impl ReadinessCheck for GroupMembershipCheck {
    fn name(&self) -> &'static str {
        "group-membership"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_group_memberships(&identity))
            },
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(groups) => {
                result.group_memberships = groups.groups;
                result.nested_group_depth = groups.max_nesting_depth;
                result.distribution_group_member = groups.distribution_group_member;

                if groups.max_nesting_depth > MAX_NESTED_GROUP_DEPTH {
                    result.add_warning(format!(
                        "group nesting depth {} exceeds {}",
                        groups.max_nesting_depth, MAX_NESTED_GROUP_DEPTH
                    ));
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Measure folder structure; a deep hierarchy raises migration risk
pub struct FolderStructureCheck;

#[async_trait]
impl ReadinessCheck for FolderStructureCheck {
    fn name(&self) -> &'static str {
        "folder-structure"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_mailbox_statistics(&identity))
            },
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(stats) => {
                result.folder_count = Some(stats.folder_count);
                result.max_folder_depth = stats.max_folder_depth;
                result.empty_folder_count = stats.empty_folder_count;

                if stats.max_folder_depth > DEEP_FOLDER_DEPTH {
                    result.deep_folder_hierarchy = true;
                    result.add_warning(format!(
                        "folder hierarchy depth {} exceeds {}",
                        stats.max_folder_depth, DEEP_FOLDER_DEPTH
                    ));
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Record calendar and contact volumes
pub struct CalendarContactsCheck;

#[async_trait]
impl ReadinessCheck for CalendarContactsCheck {
    fn name(&self) -> &'static str {
        "calendar-contacts"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_mailbox_statistics(&identity))
            },
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(stats) => {
                result.calendar_item_count = Some(stats.calendar_item_count);
                result.contact_item_count = Some(stats.contact_item_count);
                result.shared_calendar_count = stats.shared_calendar_count;

                if stats.shared_calendar_count > 0 {
                    result.add_warning(format!(
                        "{} shared calendar(s): sharing must be re-established",
                        stats.shared_calendar_count
                    ));
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Verify mailbox auditing configuration
pub struct AuditConfigCheck;

#[async_trait]
impl ReadinessCheck for AuditConfigCheck {
    fn name(&self) -> &'static str {
        "audit-config"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || ctx.session.execute(|| ctx.gateway.get_mailbox(&identity)),
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(info) => {
                result.audit_enabled = info.audit_enabled;
                result.audit_log_age_days = info.audit_log_age_days;
                if !info.audit_enabled {
                    result.add_warning("mailbox auditing is disabled");
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Verify the identity's domain is accepted by the tenant and flag
/// folder-name and proxy-address conflicts
pub struct NamespaceConflictCheck;

#[async_trait]
impl ReadinessCheck for NamespaceConflictCheck {
    fn name(&self) -> &'static str {
        "namespace-conflicts"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let domains = execute_with_retry(
            || ctx.session.execute(|| ctx.gateway.get_accepted_domains()),
            &ctx.retry,
        )
        .await?;

        let accepted: HashSet<String> =
            domains.iter().map(|d| d.name.to_lowercase()).collect();

        let domain = result
            .identity
            .split('@')
            .nth(1)
            .unwrap_or("")
            .to_lowercase();
        result.domain_name = Some(domain.clone());
        result.domain_accepted = accepted.contains(&domain);

        if !result.domain_accepted {
            result.add_error(
                "DOMAIN_NOT_ACCEPTED",
                format!("domain {} is not accepted by the target tenant", domain),
            );
        }

        // Secondary addresses on non-accepted domains break after the move
        let conflicts: Vec<String> = result
            .email_addresses
            .iter()
            .filter_map(|address| {
                let smtp = address.strip_prefix("SMTP:").or_else(|| address.strip_prefix("smtp:"))?;
                let addr_domain = smtp.split('@').nth(1)?.to_lowercase();
                (!accepted.contains(&addr_domain)).then(|| smtp.to_string())
            })
            .collect();
        if !conflicts.is_empty() {
            result.add_warning(format!(
                "{} proxy address(es) on non-accepted domains",
                conflicts.len()
            ));
            result.proxy_address_conflicts = conflicts;
        }

        // Duplicate folder names collide when folders are merged on ingest
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_mailbox_statistics(&identity))
            },
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(stats) => {
                let mut seen = HashSet::new();
                let mut duplicates = Vec::new();
                for name in &stats.folder_names {
                    if !seen.insert(name.to_lowercase()) {
                        duplicates.push(name.clone());
                    }
                }
                if !duplicates.is_empty() {
                    result.add_warning(format!(
                        "{} duplicate folder name(s) will conflict on ingest",
                        duplicates.len()
                    ));
                    result.folder_name_conflicts = duplicates;
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            // The runner downgrades this to a warning on the mailbox
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::retry::RetryOptions;
    use crate::application::session::SessionManager;
    use crate::port::directory_gateway::mocks::MockDirectoryGateway;
    use crate::port::time_provider::mocks::MockTimeProvider;
    use crate::port::GatewayError;
    use std::sync::Arc;
    use std::time::Duration;

    fn ctx(gateway: Arc<MockDirectoryGateway>) -> CheckContext {
        let time = Arc::new(MockTimeProvider::new(1_000));
        CheckContext {
            gateway: gateway.clone(),
            session: Arc::new(SessionManager::new(gateway, time)),
            retry: RetryOptions::transient_only(1, Duration::from_millis(1)),
        }
    }

    #[tokio::test]
    async fn test_namespace_check_surfaces_exhausted_statistics_fetch() {
        let gateway = Arc::new(MockDirectoryGateway::new());
        gateway.add_healthy_mailboxes(&["alice@contoso.com"]);
        // More transient failures than the retry budget allows
        for _ in 0..2 {
            gateway.push_failure(
                "get_mailbox_statistics",
                GatewayError::Transient("throttled".into()),
            );
        }

        let mut result = ValidationResult::new("alice@contoso.com");
        let error = NamespaceConflictCheck
            .run(&ctx(gateway), &mut result)
            .await
            .unwrap_err();

        assert!(error.is_transient());
        // The accepted-domain half still recorded its findings
        assert!(result.domain_accepted);
    }
}
