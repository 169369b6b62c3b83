//! Subscription aggregate entity.
//!
//! One Subscription per user, holding the billing period bounds and the
//! increment-only usage counters metered against tariff limits.
//!
//! # Design Decisions
//!
//! - **Counters only go up**: usage is mutated exclusively through the record
//!   store's atomic increment patch; the only decrement is the period reset.
//! - **Lazy period reset**: the reset happens on the first validation after a
//!   period rollover. The monotonic comparison of `last_usage_reset_at`
//!   against `current_period_start` makes the reset fire exactly once per
//!   period, even when validations race.

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use super::{Tariff, TariffLimits};

/// Which usage counter a charge applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageCounter {
    /// Generated quiz items.
    QuizItems,
    /// Explainer and feedback messages.
    Messages,
}

impl UsageCounter {
    /// Record-store field name backing this counter.
    pub fn field_name(&self) -> &'static str {
        match self {
            UsageCounter::QuizItems => "quiz_items_usage",
            UsageCounter::Messages => "messages_usage",
        }
    }
}

/// Subscription aggregate - persisted billing state for one user.
///
/// # Invariants
///
/// - `user_id` is unique (one subscription per user)
/// - `current_period_start <= current_period_end`
/// - usage counters reset exactly once per period transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique identifier for this subscription record.
    pub id: SubscriptionId,

    /// User who owns this subscription.
    pub user_id: UserId,

    /// Active tariff.
    pub tariff: Tariff,

    /// Quiz items generated this period.
    pub quiz_items_usage: u64,

    /// Messages generated this period.
    pub messages_usage: u64,

    /// Bytes of uploaded material currently stored.
    pub storage_usage: u64,

    /// Start of current billing period.
    pub current_period_start: Timestamp,

    /// End of current billing period.
    pub current_period_end: Timestamp,

    /// Whether the subscription lapses at period end.
    pub cancel_at_period_end: bool,

    /// When the usage counters were last reset.
    pub last_usage_reset_at: Timestamp,
}

impl Subscription {
    /// Creates a fresh free-tariff subscription for a new user.
    pub fn new_free(id: SubscriptionId, user_id: UserId, now: Timestamp) -> Self {
        Self {
            id,
            user_id,
            tariff: Tariff::Free,
            quiz_items_usage: 0,
            messages_usage: 0,
            storage_usage: 0,
            current_period_start: now,
            current_period_end: now.add_days(30),
            cancel_at_period_end: false,
            last_usage_reset_at: now,
        }
    }

    /// Limits for the active tariff.
    pub fn limits(&self) -> TariffLimits {
        TariffLimits::for_tariff(self.tariff)
    }

    /// Current usage of the given counter.
    pub fn usage(&self, counter: UsageCounter) -> u64 {
        match counter {
            UsageCounter::QuizItems => self.quiz_items_usage,
            UsageCounter::Messages => self.messages_usage,
        }
    }

    /// Limit of the given counter under the active tariff.
    pub fn limit(&self, counter: UsageCounter) -> u64 {
        let limits = self.limits();
        match counter {
            UsageCounter::QuizItems => limits.quiz_items_limit,
            UsageCounter::Messages => limits.messages_limit,
        }
    }

    /// True when the usage counters have not yet been reset for the
    /// current billing period.
    ///
    /// The comparison is monotonic: once `last_usage_reset_at` reaches
    /// `current_period_start` a second reset for the same period can never
    /// fire, while a new period (with a later start) always triggers one.
    pub fn needs_usage_reset(&self) -> bool {
        self.last_usage_reset_at.is_before(&self.current_period_start)
    }

    /// Applies the period usage reset in memory.
    ///
    /// The persisted counterpart patches the same three counters to zero and
    /// stamps `last_usage_reset_at` with the period start, not `now`, so the
    /// monotonic comparison stays exact across clock skew.
    pub fn apply_usage_reset(&mut self) {
        self.quiz_items_usage = 0;
        self.messages_usage = 0;
        self.last_usage_reset_at = self.current_period_start;
    }

    /// Rolls the subscription into a new billing period.
    pub fn roll_period(&mut self, period_start: Timestamp, period_end: Timestamp) {
        self.current_period_start = period_start;
        self.current_period_end = period_end;
    }
}
