use chrono::{DateTime, NaiveDate, Utc};
use rentis_shared::biztime::DateInput;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// A rental reservation. The single source of truth for which calendar days
/// a car is taken.
///
/// Orders are never physically deleted; conflict resolution happens by
/// moving dates or leaving the order unconfirmed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub car_id: Uuid,
    pub rental_start_date: DateInput,
    pub rental_end_date: DateInput,
    pub confirmed: bool,
    /// Created through the public booking flow (vs. by an admin).
    pub my_order: bool,
    /// Auto-computed quote in cents. Recomputed whenever dates change.
    pub total_price: i64,
    /// Admin-set price in cents. `Some(0)` is a valid override.
    /// Never touched by automatic recomputation.
    #[serde(default)]
    pub override_price: Option<i64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(car_id: Uuid, start: DateInput, end: DateInput) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            car_id,
            rental_start_date: start,
            rental_end_date: end,
            confirmed: false,
            my_order: true,
            total_price: 0,
            override_price: None,
            customer_name: None,
            phone: None,
            email: None,
            flight_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Business calendar day the rental begins, if the stored value parses.
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.rental_start_date.as_business_date()
    }

    /// Business calendar day the rental ends, if the stored value parses.
    pub fn end_date(&self) -> Option<NaiveDate> {
        self.rental_end_date.as_business_date()
    }

    /// Both dates parse and start <= end.
    pub fn validate_dates(&self) -> CoreResult<(NaiveDate, NaiveDate)> {
        let start = self
            .start_date()
            .ok_or_else(|| CoreError::Validation("rentalStartDate is not a valid date".into()))?;
        let end = self
            .end_date()
            .ok_or_else(|| CoreError::Validation("rentalEndDate is not a valid date".into()))?;
        if start > end {
            return Err(CoreError::Validation(
                "rentalStartDate must not be after rentalEndDate".into(),
            ));
        }
        Ok((start, end))
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// A car in the fleet. Orders are a back-reference used by the availability
/// engine, not ownership.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: Uuid,
    pub model: String,
    #[serde(default)]
    pub orders: Vec<Order>,
}
