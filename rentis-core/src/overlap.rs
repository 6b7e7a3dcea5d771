//! Order overlap / selector engine.
//!
//! All interval math here is inclusive-inclusive over business calendar
//! dates: an order ending on the same day another starts still occupies
//! that day on both sides (back-to-back handovers are flagged, not hidden).

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::Order;

/// All orders whose `[start, end]` business-date range contains `date`.
///
/// Orders with unparseable dates never cover anything.
pub fn orders_covering_date<'a>(orders: &'a [Order], date: NaiveDate) -> Vec<&'a Order> {
    orders
        .iter()
        .filter(|order| match (order.start_date(), order.end_date()) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        })
        .collect()
}

/// True iff the order's end day is strictly before `now`'s business day.
/// An order ending today is still running.
pub fn is_order_completed(order: &Order, now: NaiveDate) -> bool {
    match order.end_date() {
        Some(end) => end < now,
        None => false,
    }
}

/// Adjacency flags around a selected order on a given day, used to surface
/// back-to-back handovers that need buffer-time awareness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeCaseFlags {
    /// Some other order ends exactly on this date.
    pub has_previous_order_ending_here: bool,
    /// Some other order starts exactly on this date.
    pub has_next_order_starting_here: bool,
    /// The selected order itself starts on this date.
    pub is_start_edge_case: bool,
    /// The selected order itself ends on this date.
    pub is_end_edge_case: bool,
}

pub fn edge_case_flags(
    selected: &Order,
    all_orders_for_car: &[Order],
    date: NaiveDate,
) -> EdgeCaseFlags {
    let mut flags = EdgeCaseFlags {
        is_start_edge_case: selected.start_date() == Some(date),
        is_end_edge_case: selected.end_date() == Some(date),
        ..EdgeCaseFlags::default()
    };

    for other in all_orders_for_car {
        if other.id == selected.id {
            continue;
        }
        if other.end_date() == Some(date) {
            flags.has_previous_order_ending_here = true;
        }
        if other.start_date() == Some(date) {
            flags.has_next_order_starting_here = true;
        }
    }

    flags
}

/// The authority for "can this range be booked".
///
/// Returns every existing order (except `exclude_id`, for edit flows) whose
/// business-date interval intersects `[candidate_start, candidate_end]`,
/// both boundaries counted. A non-empty result blocks booking unless the
/// permission model grants an override (see `permissions::can_confirm_order`).
pub fn find_overlaps_for_range<'a>(
    car_orders: &'a [Order],
    candidate_start: NaiveDate,
    candidate_end: NaiveDate,
    exclude_id: Option<Uuid>,
) -> Vec<&'a Order> {
    car_orders
        .iter()
        .filter(|order| Some(order.id) != exclude_id)
        .filter(|order| match (order.start_date(), order.end_date()) {
            (Some(start), Some(end)) => start <= candidate_end && candidate_start <= end,
            _ => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rentis_shared::biztime::to_business_date;

    fn d(s: &str) -> NaiveDate {
        to_business_date(s).unwrap()
    }

    fn order(start: &str, end: &str) -> Order {
        Order::new(Uuid::new_v4(), start.into(), end.into())
    }

    #[test]
    fn covering_is_inclusive_on_both_ends() {
        let o = order("2025-06-10", "2025-06-15");
        let orders = vec![o];
        assert_eq!(orders_covering_date(&orders, d("2025-06-10")).len(), 1);
        assert_eq!(orders_covering_date(&orders, d("2025-06-15")).len(), 1);
        assert_eq!(orders_covering_date(&orders, d("2025-06-12")).len(), 1);
        assert!(orders_covering_date(&orders, d("2025-06-09")).is_empty());
        assert!(orders_covering_date(&orders, d("2025-06-16")).is_empty());
    }

    #[test]
    fn covering_skips_orders_with_broken_dates() {
        let mut o = order("2025-06-10", "2025-06-15");
        o.rental_start_date = "whenever".into();
        assert!(orders_covering_date(&[o], d("2025-06-12")).is_empty());
    }

    #[test]
    fn completed_is_strictly_before_today() {
        let o = order("2025-06-10", "2025-06-15");
        assert!(is_order_completed(&o, d("2025-06-16")));
        // Ends today: still running.
        assert!(!is_order_completed(&o, d("2025-06-15")));
        assert!(!is_order_completed(&o, d("2025-06-12")));
    }

    #[test]
    fn shared_boundary_day_counts_as_overlap() {
        // Candidate [06-10, 06-12] vs existing [06-12, 06-15]: day 06-12 is
        // occupied by both.
        let existing = vec![order("2025-06-12", "2025-06-15")];
        let hits = find_overlaps_for_range(&existing, d("2025-06-10"), d("2025-06-12"), None);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn disjoint_ranges_do_not_overlap() {
        let existing = vec![order("2025-06-12", "2025-06-15")];
        let hits = find_overlaps_for_range(&existing, d("2025-06-08"), d("2025-06-11"), None);
        assert!(hits.is_empty());
        let hits = find_overlaps_for_range(&existing, d("2025-06-16"), d("2025-06-20"), None);
        assert!(hits.is_empty());
    }

    #[test]
    fn contained_and_containing_ranges_overlap() {
        let existing = vec![order("2025-06-12", "2025-06-15")];
        // Candidate inside existing
        assert_eq!(
            find_overlaps_for_range(&existing, d("2025-06-13"), d("2025-06-14"), None).len(),
            1
        );
        // Candidate swallows existing
        assert_eq!(
            find_overlaps_for_range(&existing, d("2025-06-01"), d("2025-06-30"), None).len(),
            1
        );
    }

    #[test]
    fn excluded_order_is_ignored_when_editing() {
        let existing = order("2025-06-12", "2025-06-15");
        let id = existing.id;
        let orders = vec![existing];
        let hits = find_overlaps_for_range(&orders, d("2025-06-12"), d("2025-06-14"), Some(id));
        assert!(hits.is_empty());
    }

    #[test]
    fn edge_flags_detect_adjacent_handover() {
        let selected = order("2025-06-12", "2025-06-15");
        let previous = order("2025-06-08", "2025-06-12");
        let next = order("2025-06-15", "2025-06-18");
        let all = vec![selected.clone(), previous, next];

        let at_start = edge_case_flags(&selected, &all, d("2025-06-12"));
        assert!(at_start.is_start_edge_case);
        assert!(at_start.has_previous_order_ending_here);
        assert!(!at_start.has_next_order_starting_here);

        let at_end = edge_case_flags(&selected, &all, d("2025-06-15"));
        assert!(at_end.is_end_edge_case);
        assert!(at_end.has_next_order_starting_here);
        assert!(!at_end.has_previous_order_ending_here);
    }

    #[test]
    fn edge_flags_ignore_the_selected_order_itself() {
        let selected = order("2025-06-12", "2025-06-15");
        let all = vec![selected.clone()];
        let flags = edge_case_flags(&selected, &all, d("2025-06-12"));
        assert!(!flags.has_previous_order_ending_here);
        assert!(!flags.has_next_order_starting_here);
        assert!(flags.is_start_edge_case);
    }
}
