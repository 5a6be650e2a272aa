//! Time-based retention rules.
//!
//! Everything here is a pure function of "now" and the retention windows, so
//! callers pass the clock in. Windows are whole calendar days on the site
//! clock (`utc_offset_minutes`, UTC by default).

use chrono::{DateTime, Days, FixedOffset, NaiveDate, Utc};

use crate::config::RetentionConfig;

#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    config: RetentionConfig,
}

impl RetentionPolicy {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// Calendar date on the site clock.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match FixedOffset::east_opt(self.config.utc_offset_minutes.saturating_mul(60)) {
            Some(offset) => now.with_timezone(&offset).date_naive(),
            None => now.date_naive(),
        }
    }

    /// Last day an unshared recording is kept on the remote host.
    /// It becomes eligible for deletion the day after.
    pub fn cleanup_date(&self, start_date: NaiveDate) -> NaiveDate {
        start_date
            .checked_add_days(Days::new(u64::from(self.config.file_cleanup_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// True once the cleanup date is over.
    pub fn is_file_expired(&self, start_date: NaiveDate, now: DateTime<Utc>) -> bool {
        self.cleanup_date(start_date) < self.today(now)
    }

    /// Whole days left before the file becomes eligible for deletion.
    /// Negative once the window has passed. Display only.
    pub fn retention_days_remaining(&self, start_date: NaiveDate, now: DateTime<Utc>) -> i64 {
        (self.cleanup_date(start_date) - self.today(now)).num_days()
    }

    /// Expiry date for a share created today.
    pub fn share_expiry(&self, today: NaiveDate) -> NaiveDate {
        today
            .checked_add_days(Days::new(u64::from(self.config.share_lifetime_days)))
            .unwrap_or(NaiveDate::MAX)
    }

    /// A share expiring before `today` is dead.
    pub fn is_share_active(share_expiry: NaiveDate, today: NaiveDate) -> bool {
        share_expiry >= today
    }
}
