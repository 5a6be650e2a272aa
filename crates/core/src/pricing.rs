//! Price of a recording, derived from its duration.

use crate::config::PricingConfig;

/// Computes purchase prices in minor currency units.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// `base_price + floor(duration / window) * increment`.
    ///
    /// A window of 0 disables the multiplier, so every recording costs the
    /// base price.
    pub fn price(&self, duration_minutes: u32) -> i64 {
        let window = self.config.multiplier_window_minutes;
        if window == 0 {
            return self.config.base_price;
        }
        let steps = i64::from(duration_minutes / window);
        self.config
            .base_price
            .saturating_add(steps.saturating_mul(self.config.multiplier_increment))
    }

    pub fn base_price(&self) -> i64 {
        self.config.base_price
    }
}

/// Format minor units for display, e.g. `500.00 HKD`.
pub fn format_amount(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!(
        "{}{}.{:02} {}",
        sign,
        abs / 100,
        abs % 100,
        currency.to_uppercase()
    )
}
