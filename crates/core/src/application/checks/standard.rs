// Standard Depth Checks - statistics, permissions, item sizes, special types

use async_trait::async_trait;

use crate::application::retry::execute_with_retry;
use crate::domain::ValidationResult;
use crate::port::GatewayResult;

use super::{CheckContext, ReadinessCheck};

/// Largest single item the move service accepts without skipping (MB)
pub const OVERSIZED_ITEM_LIMIT_MB: f64 = 150.0;

/// Record mailbox content statistics for sizing and tolerance computation
pub struct StatisticsCheck;

#[async_trait]
impl ReadinessCheck for StatisticsCheck {
    fn name(&self) -> &'static str {
        "statistics"
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
                result.item_count = Some(stats.item_count);
                result.total_size_mb = Some(stats.total_size_mb);
                result.deleted_item_count = Some(stats.deleted_item_count);
                result.deleted_item_size_mb = Some(stats.deleted_item_size_mb);
                result.last_logon_time = stats.last_logon_time;
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                result.add_warning("mailbox statistics not yet available");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Record delegate permissions that must be re-established after the move
pub struct PermissionsCheck;

#[async_trait]
impl ReadinessCheck for PermissionsCheck {
    fn name(&self) -> &'static str {
        "permissions"
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

        for permission in permissions {
            match permission.access_rights.as_str() {
                "FullAccess" => result.full_access_delegates.push(permission.holder),
                "SendAs" => result.send_as_delegates.push(permission.holder),
                "SendOnBehalf" => result.send_on_behalf_delegates.push(permission.holder),
                _ => {}
            }
        }

        if !result.full_access_delegates.is_empty() || !result.send_as_delegates.is_empty() {
            result.add_warning(format!(
                "{} delegate permission(s) must be re-granted after migration",
                result.full_access_delegates.len() + result.send_as_delegates.len()
            ));
        }
        Ok(())
    }
}

/// Flag items exceeding the move service's per-item size limit
pub struct ItemSizeCheck;

#[async_trait]
impl ReadinessCheck for ItemSizeCheck {
    fn name(&self) -> &'static str {
        "item-size-limits"
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
                result.largest_item_size_mb = Some(stats.largest_item_size_mb);
                result.oversized_item_count = stats.oversized_item_count;
                if stats.largest_item_size_mb > OVERSIZED_ITEM_LIMIT_MB {
                    result.has_oversized_items = true;
                    result.add_warning(format!(
                        "{} item(s) exceed the {:.0} MB size limit and will be skipped",
                        stats.oversized_item_count.max(1),
                        OVERSIZED_ITEM_LIMIT_MB
                    ));
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}

/// Detect shared/resource mailboxes and holds that change migration handling
pub struct SpecialTypeCheck;

#[async_trait]
impl ReadinessCheck for SpecialTypeCheck {
    fn name(&self) -> &'static str {
        "special-mailbox-type"
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
                match info.recipient_type_details.as_str() {
                    "SharedMailbox" => {
                        result.is_shared_mailbox = true;
                        result.add_warning("shared mailbox: verify delegate access post-move");
                    }
                    "RoomMailbox" => {
                        result.is_room_mailbox = true;
                        result.is_resource_mailbox = true;
                        result.add_warning("room mailbox: booking policies are not migrated");
                    }
                    "EquipmentMailbox" => {
                        result.is_equipment_mailbox = true;
                        result.is_resource_mailbox = true;
                        result.add_warning("equipment mailbox: booking policies are not migrated");
                    }
                    _ => {}
                }

                result.archive_enabled = info.archive_enabled;
                result.archive_size_mb = info.archive_size_mb;
                result.litigation_hold_enabled = info.litigation_hold_enabled;
                result.retention_hold_enabled = info.retention_hold_enabled;

                if info.litigation_hold_enabled {
                    result.add_warning("litigation hold enabled: hold settings must be re-applied");
                }
                if info.retention_hold_enabled {
                    result.add_warning("retention hold enabled");
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}
