//! Price resolution: arbitrates between the auto-computed quote and an
//! explicit admin override. The rate table proper (seasons, add-ons) is an
//! external collaborator behind `RateTable`.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::Order;
use crate::{CoreError, CoreResult};

/// The authoritative price of an order, in cents.
///
/// An override wins whenever it is set, including an override of 0 (free
/// rentals are a thing admins grant). Otherwise the auto-computed total.
pub fn effective_price(order: &Order) -> i64 {
    order.override_price.unwrap_or(order.total_price)
}

pub fn has_price_override(order: &Order) -> bool {
    order.override_price.is_some()
}

/// Explicit admin action. Automatic recomputation never calls this.
pub fn set_price_override(order: &mut Order, price_cents: i64) {
    order.override_price = Some(price_cents);
    order.touch();
}

/// Explicit admin action; the auto-computed total becomes authoritative again.
pub fn clear_price_override(order: &mut Order) {
    order.override_price = None;
    order.touch();
}

/// External pricing-table collaborator: day rate for a given calendar day.
pub trait RateTable {
    fn day_rate_cents(&self, date: NaiveDate) -> i64;
}

/// Flat rate with per-month season multipliers, the shape company config
/// delivers them in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalRateTable {
    pub base_day_rate_cents: i64,
    /// month (1-12) -> multiplier; missing months use 1.0
    #[serde(default)]
    pub season_multipliers: std::collections::HashMap<u32, f64>,
}

impl RateTable for SeasonalRateTable {
    fn day_rate_cents(&self, date: NaiveDate) -> i64 {
        let multiplier = self
            .season_multipliers
            .get(&date.month())
            .copied()
            .unwrap_or(1.0);
        (self.base_day_rate_cents as f64 * multiplier).round() as i64
    }
}

/// Recomputes `total_price` from the rental range. Must run whenever dates
/// or options change; leaves `override_price` alone.
pub struct QuoteCalculator<R: RateTable> {
    rates: R,
}

impl<R: RateTable> QuoteCalculator<R> {
    pub fn new(rates: R) -> Self {
        Self { rates }
    }

    /// Inclusive day count: a same-day rental is one billable day.
    pub fn quote_cents(&self, start: NaiveDate, end: NaiveDate) -> CoreResult<i64> {
        if start > end {
            return Err(CoreError::Validation(
                "quote range start must not be after end".into(),
            ));
        }
        let mut total = 0i64;
        let mut day = start;
        while day <= end {
            total += self.rates.day_rate_cents(day);
            day = day.succ_opt().ok_or_else(|| {
                CoreError::Validation("quote range exceeds supported calendar".into())
            })?;
        }
        Ok(total)
    }

    pub fn recompute_total(&self, order: &mut Order) -> CoreResult<()> {
        let (start, end) = order.validate_dates()?;
        order.total_price = self.quote_cents(start, end)?;
        order.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn order() -> Order {
        let mut o = Order::new(Uuid::new_v4(), "2025-06-10".into(), "2025-06-12".into());
        o.total_price = 15_000;
        o
    }

    fn flat_rates(cents: i64) -> SeasonalRateTable {
        SeasonalRateTable {
            base_day_rate_cents: cents,
            season_multipliers: Default::default(),
        }
    }

    #[test]
    fn total_price_wins_without_override() {
        let o = order();
        assert!(!has_price_override(&o));
        assert_eq!(effective_price(&o), 15_000);
    }

    #[test]
    fn override_wins_including_zero() {
        let mut o = order();
        set_price_override(&mut o, 9_900);
        assert_eq!(effective_price(&o), 9_900);

        set_price_override(&mut o, 0);
        assert!(has_price_override(&o));
        assert_eq!(effective_price(&o), 0);
    }

    #[test]
    fn effective_price_is_idempotent() {
        let o = order();
        assert_eq!(effective_price(&o), effective_price(&o));
    }

    #[test]
    fn set_then_clear_restores_auto_total() {
        let mut o = order();
        set_price_override(&mut o, 1);
        clear_price_override(&mut o);
        assert_eq!(effective_price(&o), o.total_price);
    }

    #[test]
    fn quote_counts_days_inclusively() {
        let calc = QuoteCalculator::new(flat_rates(5_000));
        let start = chrono::NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2025, 6, 12).unwrap();
        // 10th, 11th, 12th = 3 billable days
        assert_eq!(calc.quote_cents(start, end).unwrap(), 15_000);
        assert_eq!(calc.quote_cents(start, start).unwrap(), 5_000);
    }

    #[test]
    fn season_multiplier_applies_per_day() {
        let mut rates = flat_rates(10_000);
        rates.season_multipliers.insert(8, 1.5); // August peak
        let calc = QuoteCalculator::new(rates);
        let start = chrono::NaiveDate::from_ymd_opt(2025, 7, 31).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        // One July day at 1.0 plus one August day at 1.5
        assert_eq!(calc.quote_cents(start, end).unwrap(), 25_000);
    }

    #[test]
    fn recompute_updates_total_but_never_the_override() {
        let mut o = order();
        set_price_override(&mut o, 500);
        let calc = QuoteCalculator::new(flat_rates(4_000));
        calc.recompute_total(&mut o).unwrap();
        assert_eq!(o.total_price, 12_000);
        assert_eq!(o.override_price, Some(500));
        assert_eq!(effective_price(&o), 500);
    }
}
