//! Billing module - subscription state and quota vocabulary.
//!
//! A Subscription is the persisted metering record for one user; a Principal
//! is the per-request authorization view derived from it.

mod principal;
mod subscription;
mod tariff;

pub use principal::Principal;
pub use subscription::{Subscription, UsageCounter};
pub use tariff::{Tariff, TariffLimits};
