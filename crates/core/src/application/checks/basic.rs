// Basic Depth Checks - identity, license, pending move

use async_trait::async_trait;

use crate::application::retry::execute_with_retry;
use crate::domain::ValidationResult;
use crate::port::GatewayResult;

use super::{CheckContext, ReadinessCheck};

/// Resolve the mailbox in the remote directory and record its identity fields
pub struct MailboxIdentityCheck;

#[async_trait]
impl ReadinessCheck for MailboxIdentityCheck {
    fn name(&self) -> &'static str {
        "mailbox-identity"
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
                result.mailbox_found = true;
                result.display_name = Some(info.display_name);
                result.user_principal_name = Some(info.user_principal_name);
                result.primary_smtp_address = Some(info.primary_smtp_address);
                result.alias = Some(info.alias);
                result.mailbox_guid = Some(info.mailbox_guid);
                result.mailbox_type = Some(info.mailbox_type);
                result.recipient_type_details = Some(info.recipient_type_details);
                result.organizational_unit = info.organizational_unit;
                result.email_addresses = info.email_addresses;
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                // Expected outcome for an unprovisioned identity, not a
                // check failure
                result.mailbox_found = false;
                result.add_error(
                    "MBX_NOT_FOUND",
                    format!("mailbox not found in target directory: {}", result.identity),
                );
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Verify the identity holds a license with an Exchange plan
pub struct LicenseCheck;

#[async_trait]
impl ReadinessCheck for LicenseCheck {
    fn name(&self) -> &'static str {
        "license"
    }

    async fn run(&self, ctx: &CheckContext, result: &mut ValidationResult) -> GatewayResult<()> {
        let identity = result.identity.clone();
        let fetched = execute_with_retry(
            || {
                ctx.session
                    .execute(|| ctx.gateway.get_license_details(&identity))
            },
            &ctx.retry,
        )
        .await;

        match fetched {
            Ok(license) => {
                result.license_found = true;
                result.license_sku = Some(license.sku);
                result.has_exchange_license = license.has_exchange_plan;
                result.license_assignment_pending = license.assignment_pending;

                if !license.has_exchange_plan {
                    result.add_error(
                        "LICENSE_NO_EXCHANGE",
                        "assigned license has no Exchange Online plan",
                    );
                } else if license.assignment_pending {
                    result.add_warning("license assignment is still pending");
                }
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                result.license_found = false;
                result.add_error("LICENSE_NOT_FOUND", "no license assigned to identity");
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

/// Detect an existing move request that would conflict with a new batch
pub struct PendingMoveCheck;

#[async_trait]
impl ReadinessCheck for PendingMoveCheck {
    fn name(&self) -> &'static str {
        "pending-move"
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
                if let Some(status) = info.move_request_status {
                    if !status.eq_ignore_ascii_case("completed") {
                        result.pending_move_request = true;
                        result.move_request_status = Some(status.clone());
                        result.add_error(
                            "MOVE_PENDING",
                            format!("existing move request in state {}", status),
                        );
                    } else {
                        result.move_request_status = Some(status);
                    }
                }
                Ok(())
            }
            // The identity check already reports a missing mailbox
            Err(error) if error.is_not_found() => Ok(()),
            Err(error) => Err(error),
        }
    }
}
