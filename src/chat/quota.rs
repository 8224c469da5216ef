//! Daily usage quota tracking
//!
//! This module counts successful chat requests per calendar day and
//! checks them against a cap. The counter lives in the key-value store
//! (`dailyUsageCount` plus `dailyUsageDate`) so it survives restarts.

use crate::clock::Clock;
use crate::storage::{keys, KeyValueStore};
use chrono::NaiveDate;
use std::sync::Arc;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot of today's usage against a cap
///
/// # Fields
///
/// * `can_use` - Whether another request is allowed today
/// * `used` - Requests counted today
/// * `remaining` - Requests left before the cap (never negative)
/// * `limit` - The cap this snapshot was computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageInfo {
    pub can_use: bool,
    pub used: u32,
    pub remaining: u32,
    pub limit: u32,
}

/// Per-day request counter
///
/// Reads and writes go straight to the store on every call; there is no
/// cached copy to fall out of sync. Storage failures are logged and read
/// as a count of zero, so the limiter never blocks and never fails.
///
/// # Examples
///
/// ```
/// use popask::chat::quota::UsageLimiter;
/// use popask::clock::SystemClock;
/// use popask::storage::MemoryStore;
/// use std::sync::Arc;
///
/// let limiter = UsageLimiter::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
/// assert!(limiter.check_limit(2).can_use);
/// limiter.increment();
/// limiter.increment();
/// assert!(!limiter.check_limit(2).can_use);
/// ```
#[derive(Clone)]
pub struct UsageLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl UsageLimiter {
    /// Creates a limiter over the given store and clock
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Checks today's count against `cap`
    ///
    /// A counter stored for a previous day is reset to zero first.
    ///
    /// # Returns
    ///
    /// A [`UsageInfo`] with `can_use = used < cap`
    pub fn check_limit(&self, cap: u32) -> UsageInfo {
        let used = self.today_count();
        UsageInfo {
            can_use: used < cap,
            used,
            remaining: cap.saturating_sub(used),
            limit: cap,
        }
    }

    /// Records one request for today
    ///
    /// # Returns
    ///
    /// The new count for today
    pub fn increment(&self) -> u32 {
        let count = self.today_count().saturating_add(1);
        self.write(count);
        tracing::debug!("Daily usage now {}", count);
        count
    }

    /// Count for the current day, resetting a stale counter
    fn today_count(&self) -> u32 {
        let today = self.clock.today();

        if self.stored_date() != Some(today) {
            self.write(0);
            return 0;
        }

        match self.store.get(keys::DAILY_USAGE_COUNT) {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Unreadable daily usage count {:?}, treating as 0", raw);
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Failed to read daily usage count: {}", e);
                0
            }
        }
    }

    fn stored_date(&self) -> Option<NaiveDate> {
        match self.store.get(keys::DAILY_USAGE_DATE) {
            Ok(Some(raw)) => NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok(),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read daily usage date: {}", e);
                None
            }
        }
    }

    fn write(&self, count: u32) {
        let today = self.clock.today().format(DATE_FORMAT).to_string();
        if let Err(e) = self.store.set(keys::DAILY_USAGE_DATE, &today) {
            tracing::warn!("Failed to persist daily usage date: {}", e);
        }
        if let Err(e) = self.store.set(keys::DAILY_USAGE_COUNT, &count.to_string()) {
            tracing::warn!("Failed to persist daily usage count: {}", e);
        }
    }
}
