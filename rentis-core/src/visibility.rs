//! Visibility filter: redacts contact fields on orders the viewer does not
//! own. The three wire envelope shapes (bare array, `{orders}`, `{data}`)
//! are resolved once into `OrderEnvelope`; the per-order rule is identical
//! whichever shape arrived. Input structures are never mutated.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Order;

/// Who is looking. Non-admin viewers prove ownership of client-created
/// orders by presenting the ids they hold locally.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    pub is_admin: bool,
    pub owned_order_ids: HashSet<Uuid>,
}

impl Viewer {
    pub fn admin() -> Self {
        Self {
            is_admin: true,
            owned_order_ids: HashSet::new(),
        }
    }

    pub fn public(owned_order_ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            is_admin: false,
            owned_order_ids: owned_order_ids.into_iter().collect(),
        }
    }

    /// A viewer who owns nothing.
    pub fn anonymous() -> Self {
        Self::default()
    }

    fn may_see_contacts(&self, order: &Order) -> bool {
        self.is_admin || (order.my_order && self.owned_order_ids.contains(&order.id))
    }
}

/// Returns a redacted copy; the original order is untouched.
pub fn filter_order_for_viewer(order: &Order, viewer: &Viewer) -> Order {
    let mut filtered = order.clone();
    if !viewer.may_see_contacts(order) {
        filtered.customer_name = None;
        filtered.phone = None;
        filtered.email = None;
        filtered.flight_number = None;
    }
    filtered
}

pub fn filter_orders_for_viewer(orders: &[Order], viewer: &Viewer) -> Vec<Order> {
    orders
        .iter()
        .map(|order| filter_order_for_viewer(order, viewer))
        .collect()
}

/// The three response shapes upstream clients send and expect back.
/// Deserialization resolves the shape exactly once; filtering preserves it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum OrderEnvelope {
    Bare(Vec<Order>),
    Orders { orders: Vec<Order> },
    Data { data: Vec<Order> },
}

impl OrderEnvelope {
    pub fn filter_for_viewer(&self, viewer: &Viewer) -> OrderEnvelope {
        match self {
            OrderEnvelope::Bare(orders) => {
                OrderEnvelope::Bare(filter_orders_for_viewer(orders, viewer))
            }
            OrderEnvelope::Orders { orders } => OrderEnvelope::Orders {
                orders: filter_orders_for_viewer(orders, viewer),
            },
            OrderEnvelope::Data { data } => OrderEnvelope::Data {
                data: filter_orders_for_viewer(data, viewer),
            },
        }
    }

    pub fn orders(&self) -> &[Order] {
        match self {
            OrderEnvelope::Bare(orders) => orders,
            OrderEnvelope::Orders { orders } => orders,
            OrderEnvelope::Data { data } => data,
        }
    }
}
