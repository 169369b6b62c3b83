//! Subscription-change event processing.
//!
//! Events arrive already verified; the payment collaborator owns signature
//! checks and retries. This processor only patches the Subscription record.
//! Period rollovers also zero the usage counters, stamping the reset with the
//! new period start so the lazy in-request reset never fires a second time.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::application::quota::QuotaLedger;
use crate::domain::billing::Tariff;
use crate::domain::foundation::{DomainError, Timestamp, UserId};

/// One verified subscription-change event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BillingEvent {
    /// The user moved to a different tariff.
    TariffChanged { user_id: UserId, tariff: Tariff },
    /// A new billing period began.
    PeriodRenewed {
        user_id: UserId,
        period_start: Timestamp,
        period_end: Timestamp,
    },
    /// The subscription will or will not lapse at period end.
    CancellationChanged {
        user_id: UserId,
        cancel_at_period_end: bool,
    },
}

impl BillingEvent {
    pub fn user_id(&self) -> &UserId {
        match self {
            BillingEvent::TariffChanged { user_id, .. }
            | BillingEvent::PeriodRenewed { user_id, .. }
            | BillingEvent::CancellationChanged { user_id, .. } => user_id,
        }
    }
}

/// Applies billing events to subscription records.
#[derive(Clone)]
pub struct WebhookProcessor {
    ledger: QuotaLedger,
}

impl WebhookProcessor {
    pub fn new(ledger: QuotaLedger) -> Self {
        Self { ledger }
    }

    pub async fn process(&self, event: BillingEvent) -> Result<(), DomainError> {
        match event {
            BillingEvent::TariffChanged { user_id, tariff } => {
                self.ledger
                    .patch_subscription(&user_id, vec![("tariff", json!(tariff))])
                    .await?;
                tracing::info!(user_id = %user_id, tariff = %tariff, "tariff changed");
            }
            BillingEvent::PeriodRenewed {
                user_id,
                period_start,
                period_end,
            } => {
                // Renewal resets usage eagerly; the stamp equals the new
                // period start, matching what the lazy reset would write.
                self.ledger
                    .patch_subscription(
                        &user_id,
                        vec![
                            ("current_period_start", json!(period_start)),
                            ("current_period_end", json!(period_end)),
                            ("quiz_items_usage", json!(0)),
                            ("messages_usage", json!(0)),
                            ("last_usage_reset_at", json!(period_start)),
                        ],
                    )
                    .await?;
                tracing::info!(user_id = %user_id, "billing period renewed, usage reset");
            }
            BillingEvent::CancellationChanged {
                user_id,
                cancel_at_period_end,
            } => {
                self.ledger
                    .patch_subscription(
                        &user_id,
                        vec![("cancel_at_period_end", json!(cancel_at_period_end))],
                    )
                    .await?;
                tracing::info!(user_id = %user_id, cancel_at_period_end, "cancellation flag updated");
            }
        }
        Ok(())
    }
}
