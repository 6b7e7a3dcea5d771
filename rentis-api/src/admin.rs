use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rentis_core::models::Order;
use rentis_core::overlap::find_overlaps_for_range;
use rentis_core::permissions::{can_confirm_order, can_edit_order, ActingUser};
use rentis_core::pricing::{clear_price_override, set_price_override, QuoteCalculator};
use rentis_guard::Ban;
use rentis_shared::events::{self, BanIssuedEvent, OrderConfirmedEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    #[serde(default)]
    pub rental_start_date: Option<String>,
    #[serde(default)]
    pub rental_end_date: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceOverrideRequest {
    /// Explicit `null` clears the override; 0 is a valid override. An absent
    /// field is rejected, so an empty body cannot wipe an override.
    #[serde(default, deserialize_with = "present_price")]
    pub override_price: Option<Option<i64>>,
}

/// Distinguishes `{"overridePrice": null}` (outer `Some`) from a missing
/// field (outer `None`, via the serde default).
fn present_price<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBanRequest {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub reason: String,
    /// None means permanent until removed.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderMutationResponse {
    pub success: bool,
    pub order: Order,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /v1/admin/orders
/// Unredacted listing for the back office.
pub async fn list_orders(
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>, AppError> {
    state
        .order_repo
        .list_orders()
        .await
        .map(Json)
        .map_err(AppError::internal)
}

/// PUT /v1/admin/orders/:id
/// Edit an order. Date changes re-run the conflict check (excluding the
/// order itself) and recompute the auto total; the override is untouched.
pub async fn update_order(
    State(state): State<AppState>,
    Extension(actor): Extension<ActingUser>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderMutationResponse>, AppError> {
    let mut order = state
        .order_repo
        .get_order(order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let decision = can_edit_order(&actor, &order);
    if !decision.allowed {
        return Err(AppError::PermissionDenied(decision));
    }

    let dates_changed = req.rental_start_date.is_some() || req.rental_end_date.is_some();
    if let Some(start) = req.rental_start_date {
        order.rental_start_date = start.as_str().into();
    }
    if let Some(end) = req.rental_end_date {
        order.rental_end_date = end.as_str().into();
    }
    if let Some(name) = req.customer_name {
        order.customer_name = Some(name);
    }
    if let Some(phone) = req.phone {
        order.phone = Some(phone);
    }
    if let Some(email) = req.email {
        order.email = Some(email);
    }
    if let Some(flight) = req.flight_number {
        order.flight_number = Some(flight);
    }

    if dates_changed {
        let (start, end) = order.validate_dates()?;
        let existing = state
            .order_repo
            .list_orders_for_car(order.car_id)
            .await
            .map_err(AppError::internal)?;
        let conflicts = find_overlaps_for_range(&existing, start, end, Some(order.id));
        if !conflicts.is_empty() {
            let decision = can_confirm_order(&actor, &order, &conflicts);
            if !decision.allowed {
                return Err(AppError::PermissionDenied(decision));
            }
        }

        // Dates changed: the auto quote must follow. Overrides never move
        // automatically.
        let calculator = QuoteCalculator::new(state.rates.as_ref().clone());
        calculator.recompute_total(&mut order)?;
    } else {
        order.touch();
    }

    state
        .order_repo
        .update_order(&order)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(OrderMutationResponse {
        success: true,
        order,
    }))
}

/// POST /v1/admin/orders/:id/confirm
/// The sensitive mutation: surfaces the permission decision verbatim on
/// denial.
pub async fn confirm_order(
    State(state): State<AppState>,
    Extension(actor): Extension<ActingUser>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderMutationResponse>, AppError> {
    let mut order = state
        .order_repo
        .get_order(order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let (start, end) = order.validate_dates()?;
    let existing = state
        .order_repo
        .list_orders_for_car(order.car_id)
        .await
        .map_err(AppError::internal)?;
    let conflicts = find_overlaps_for_range(&existing, start, end, Some(order.id));

    let decision = can_confirm_order(&actor, &order, &conflicts);
    if !decision.allowed {
        return Err(AppError::PermissionDenied(decision));
    }

    state
        .order_repo
        .set_confirmed(order_id, true)
        .await
        .map_err(AppError::internal)?;
    order.confirmed = true;
    order.touch();

    tracing::info!(order_id = %order.id, conflicts = conflicts.len(), "order confirmed");
    events::emit(
        "order.confirmed",
        &OrderConfirmedEvent {
            order_id: order.id,
            actor_role: actor.role.map(|r| r.as_str().to_string()).unwrap_or_default(),
            conflict_override: !conflicts.is_empty(),
            timestamp: order.updated_at.timestamp(),
        },
    );
    Ok(Json(OrderMutationResponse {
        success: true,
        order,
    }))
}

/// PUT /v1/admin/orders/:id/price
/// Set or clear the admin price override.
pub async fn set_order_price(
    State(state): State<AppState>,
    Extension(actor): Extension<ActingUser>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<PriceOverrideRequest>,
) -> Result<Json<OrderMutationResponse>, AppError> {
    let mut order = state
        .order_repo
        .get_order(order_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    let decision = can_edit_order(&actor, &order);
    if !decision.allowed {
        return Err(AppError::PermissionDenied(decision));
    }

    match req.override_price {
        Some(Some(price)) => set_price_override(&mut order, price),
        Some(None) => clear_price_override(&mut order),
        None => {
            return Err(AppError::Validation(
                "overridePrice is required; send null to clear the override".into(),
            ))
        }
    }

    state
        .order_repo
        .update_order(&order)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(OrderMutationResponse {
        success: true,
        order,
    }))
}

/// POST /v1/admin/bans
/// Manual ban; omitting expiresAt makes it permanent until removed.
pub async fn create_ban(
    State(state): State<AppState>,
    Json(req): Json<CreateBanRequest>,
) -> Result<(StatusCode, Json<Ban>), AppError> {
    let ban = Ban::manual(req.ip, req.fingerprint, req.reason, req.expires_at)?;
    state
        .guard
        .store()
        .save_ban(&ban)
        .await
        .map_err(AppError::internal)?;

    tracing::info!(ban_id = %ban.id, "manual ban created");
    events::emit(
        "ban.issued",
        &BanIssuedEvent {
            ban_id: ban.id,
            reason: ban.reason.clone(),
            auto: false,
            expires_at: ban.expires_at.map(|at| at.timestamp()),
            timestamp: ban.created_at.timestamp(),
        },
    );
    Ok((StatusCode::CREATED, Json(ban)))
}

/// DELETE /v1/admin/bans/:id
pub async fn delete_ban(
    State(state): State<AppState>,
    Path(ban_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let removed = state
        .guard
        .store()
        .remove_ban(ban_id)
        .await
        .map_err(AppError::internal)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("ban {ban_id} not found")))
    }
}
