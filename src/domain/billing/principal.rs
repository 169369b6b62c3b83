//! Principal - the per-request authorization and quota view.

use crate::domain::foundation::UserId;
use serde::{Deserialize, Serialize};

use super::{Subscription, Tariff, UsageCounter};

/// Authenticated user view used for authorization decisions.
///
/// Constructed fresh from the subscription record on every validation call
/// and never cached across requests: usage can change concurrently.
///
/// Invariant: `remaining = limit - used` (saturating; a successful charge is
/// always pre-validated, so persisted usage never exceeds the limit by more
/// than the in-flight cost of a racing request).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// The authenticated user.
    pub user_id: UserId,
    /// Active tariff.
    pub tariff: Tariff,
    /// Quiz items remaining this period.
    pub quiz_items_remaining: u64,
    /// Quiz items already used this period.
    pub quiz_items_used: u64,
    /// Quiz item limit for the period.
    pub quiz_items_limit: u64,
    /// Messages remaining this period.
    pub messages_remaining: u64,
    /// Messages already used this period.
    pub messages_used: u64,
    /// Message limit for the period.
    pub messages_limit: u64,
    /// Bytes of material currently stored.
    pub storage_usage: u64,
    /// Storage limit in bytes.
    pub storage_limit: u64,
}

impl Principal {
    /// Derives a principal from a subscription snapshot.
    pub fn from_subscription(subscription: &Subscription) -> Self {
        let limits = subscription.limits();
        Self {
            user_id: subscription.user_id.clone(),
            tariff: subscription.tariff,
            quiz_items_remaining: limits
                .quiz_items_limit
                .saturating_sub(subscription.quiz_items_usage),
            quiz_items_used: subscription.quiz_items_usage,
            quiz_items_limit: limits.quiz_items_limit,
            messages_remaining: limits
                .messages_limit
                .saturating_sub(subscription.messages_usage),
            messages_used: subscription.messages_usage,
            messages_limit: limits.messages_limit,
            storage_usage: subscription.storage_usage,
            storage_limit: limits.bytes_limit,
        }
    }

    /// Remaining balance of the given counter.
    pub fn remaining(&self, counter: UsageCounter) -> u64 {
        match counter {
            UsageCounter::QuizItems => self.quiz_items_remaining,
            UsageCounter::Messages => self.messages_remaining,
        }
    }

    /// True when the principal can afford `cost` against `counter`.
    ///
    /// This is the pre-flight half of the reject-then-never-charge /
    /// succeed-then-always-charge split: callers check here before the
    /// expensive operation and charge unconditionally after it succeeds.
    pub fn can_afford(&self, counter: UsageCounter, cost: u64) -> bool {
        self.remaining(counter) >= cost
    }

    /// True when adding `bytes` of material stays under the storage limit.
    pub fn storage_fits(&self, bytes: u64) -> bool {
        self.storage_usage.saturating_add(bytes) <= self.storage_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionId, Timestamp};

    fn principal_with_usage(quiz_items: u64, messages: u64) -> Principal {
        let mut sub = Subscription::new_free(
            SubscriptionId::new("sub-1").unwrap(),
            UserId::new("user-1").unwrap(),
            Timestamp::now(),
        );
        sub.quiz_items_usage = quiz_items;
        sub.messages_usage = messages;
        Principal::from_subscription(&sub)
    }

    #[test]
    fn remaining_is_limit_minus_used() {
        let principal = principal_with_usage(10, 5);
        assert_eq!(principal.quiz_items_remaining, 20);
        assert_eq!(principal.messages_remaining, 15);
    }

    #[test]
    fn remaining_saturates_at_zero() {
        // Usage can exceed the limit under the documented charge race.
        let principal = principal_with_usage(35, 25);
        assert_eq!(principal.quiz_items_remaining, 0);
        assert_eq!(principal.messages_remaining, 0);
    }

    #[test]
    fn can_afford_checks_counter_balance() {
        let principal = principal_with_usage(28, 0);
        assert!(principal.can_afford(UsageCounter::QuizItems, 2));
        assert!(!principal.can_afford(UsageCounter::QuizItems, 3));
        assert!(principal.can_afford(UsageCounter::Messages, 20));
    }

    #[test]
    fn zero_remaining_affords_nothing_but_zero() {
        let principal = principal_with_usage(30, 20);
        assert!(!principal.can_afford(UsageCounter::QuizItems, 1));
        assert!(principal.can_afford(UsageCounter::QuizItems, 0));
    }

    #[test]
    fn storage_fits_respects_limit() {
        let principal = principal_with_usage(0, 0);
        assert!(principal.storage_fits(principal.storage_limit));
        assert!(!principal.storage_fits(principal.storage_limit + 1));
    }
}
