use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::NaiveDate;
use rentis_core::models::{Car, Order};
use rentis_core::overlap::{edge_case_flags, find_overlaps_for_range, is_order_completed, orders_covering_date, EdgeCaseFlags};
use rentis_core::pricing::QuoteCalculator;
use rentis_core::visibility::{OrderEnvelope, Viewer};
use rentis_guard::IdentityKey;
use rentis_shared::biztime;
use rentis_shared::events::{self, OrderCreatedEvent};
use rentis_shared::pii::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

pub const CLIENT_ORDERS_HEADER: &str = "x-client-orders";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub car_id: Uuid,
    pub rental_start_date: String,
    pub rental_end_date: String,
    pub customer_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub flight_number: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: String,
    #[serde(default)]
    pub order_id: Option<Uuid>,
}

/// Desk opening hours, surfaced so the client can constrain pickup/return
/// time choices.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupWindow {
    pub opens: String,
    pub closes: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub available: bool,
    pub orders: Vec<Order>,
    pub completed: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_flags: Option<EdgeCaseFlags>,
    /// Hours to keep free around a back-to-back handover; present only when
    /// the edge flags show one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_hours: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_window: Option<PickupWindow>,
}

/// Non-admin callers prove ownership of their own bookings by sending the
/// order ids they hold locally.
fn viewer_from_headers(headers: &HeaderMap) -> Viewer {
    let owned = headers
        .get(CLIENT_ORDERS_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|raw| {
            raw.split(',')
                .filter_map(|part| Uuid::parse_str(part.trim()).ok())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    Viewer::public(owned)
}

// ============================================================================
// Booking flow
// ============================================================================

fn validate_booking(
    req: &CreateOrderRequest,
    order: &Order,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    if req.customer_name.trim().is_empty() {
        return Err(AppError::Validation("customerName is required".into()));
    }
    if req.phone.trim().is_empty() {
        return Err(AppError::Validation("phone is required".into()));
    }
    Ok(order.validate_dates()?)
}

/// The public booking path, kept free of HTTP types so the whole flow is
/// exercisable in tests: validate, record abuse tallies, check conflicts,
/// quote, persist.
pub async fn place_order(
    state: &AppState,
    identity: &IdentityKey,
    req: &CreateOrderRequest,
) -> Result<Order, AppError> {
    // Tally the submission before anything can reject it; replaying the
    // same body past the identical-payload threshold bans the identity
    // whether or not the body would ever validate.
    let payload = serde_json::to_vec(req).map_err(AppError::internal)?;
    if let Some(ban) = state.guard.note_submission(identity, &payload).await? {
        tracing::warn!(ban_id = %ban.id, "identity auto-banned during submission");
    }

    let mut order = Order::new(
        req.car_id,
        req.rental_start_date.as_str().into(),
        req.rental_end_date.as_str().into(),
    );
    order.customer_name = Some(req.customer_name.clone());
    order.phone = Some(req.phone.clone());
    order.email = req.email.clone();
    order.flight_number = req.flight_number.clone();

    // Validation failures count as failed attempts too.
    let (start, end) = match validate_booking(req, &order) {
        Ok(range) => range,
        Err(err) => {
            if let Some(ban) = state.guard.note_failure(identity).await? {
                tracing::warn!(ban_id = %ban.id, "identity auto-banned after repeated failures");
            }
            return Err(err);
        }
    };

    let car = state
        .car_repo
        .get_car(req.car_id)
        .await
        .map_err(AppError::internal)?;
    if car.is_none() {
        if let Some(ban) = state.guard.note_failure(identity).await? {
            tracing::warn!(ban_id = %ban.id, "identity auto-banned after repeated failures");
        }
        return Err(AppError::NotFound(format!("car {} not found", req.car_id)));
    }

    let existing = state
        .order_repo
        .list_orders_for_car(req.car_id)
        .await
        .map_err(AppError::internal)?;

    let conflicts = find_overlaps_for_range(&existing, start, end, None);
    if !conflicts.is_empty() {
        if let Some(ban) = state.guard.note_failure(identity).await? {
            tracing::warn!(ban_id = %ban.id, "identity auto-banned after repeated conflicts");
        }
        return Err(AppError::Conflict(
            "the requested dates are no longer available".into(),
        ));
    }

    let calculator = QuoteCalculator::new(state.rates.as_ref().clone());
    calculator.recompute_total(&mut order)?;

    state
        .order_repo
        .create_order(&order)
        .await
        .map_err(AppError::internal)?;

    tracing::info!(
        order_id = %order.id,
        car_id = %order.car_id,
        customer_phone = %Masked::new(req.phone.as_str()),
        "booking created"
    );
    events::emit(
        "order.created",
        &OrderCreatedEvent {
            order_id: order.id,
            car_id: order.car_id,
            rental_start: req.rental_start_date.clone(),
            rental_end: req.rental_end_date.clone(),
            client_created: order.my_order,
            timestamp: order.created_at.timestamp(),
        },
    );
    Ok(order)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Public booking creation; runs behind the abuse-guard middleware.
pub async fn create_order(
    State(state): State<AppState>,
    Extension(identity): Extension<IdentityKey>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = place_order(&state, &identity, &req).await?;
    Ok(Json(CreateOrderResponse {
        success: true,
        order,
    }))
}

/// GET /v1/cars/:id/orders
/// Visibility-filtered listing in the `{orders: [...]}` envelope.
pub async fn list_car_orders(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<OrderEnvelope>, AppError> {
    let orders = state
        .order_repo
        .list_orders_for_car(car_id)
        .await
        .map_err(AppError::internal)?;

    let viewer = viewer_from_headers(&headers);
    let envelope = OrderEnvelope::Orders { orders };
    Ok(Json(envelope.filter_for_viewer(&viewer)))
}

/// GET /v1/cars/:id/availability?date=YYYY-MM-DD&orderId=...
/// Which orders occupy a day, which are done, and the handover edge flags
/// for a selected order.
pub async fn car_availability(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
    headers: HeaderMap,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let date = biztime::to_business_date(&query.date)
        .ok_or_else(|| AppError::Validation(format!("not a valid date: {}", query.date)))?;

    let orders = state
        .order_repo
        .list_orders_for_car(car_id)
        .await
        .map_err(AppError::internal)?;

    let today = biztime::business_today();
    let covering: Vec<Order> = orders_covering_date(&orders, date)
        .into_iter()
        .cloned()
        .collect();
    let completed = covering
        .iter()
        .filter(|order| is_order_completed(order, today))
        .map(|order| order.id)
        .collect();

    let edge_flags = query.order_id.and_then(|selected_id| {
        orders
            .iter()
            .find(|order| order.id == selected_id)
            .map(|selected| edge_case_flags(selected, &orders, date))
    });

    let viewer = viewer_from_headers(&headers);
    let available = covering.is_empty();

    let handover = edge_flags.is_some_and(|flags| {
        flags.has_previous_order_ending_here || flags.has_next_order_starting_here
    });
    let buffer_hours = handover.then_some(state.business_rules.buffer_time_hours);

    let pickup_window = match (
        &state.business_rules.working_hours_start,
        &state.business_rules.working_hours_end,
    ) {
        (Some(opens), Some(closes)) => Some(PickupWindow {
            opens: opens.clone(),
            closes: closes.clone(),
        }),
        _ => None,
    };

    Ok(Json(AvailabilityResponse {
        date,
        available,
        orders: rentis_core::visibility::filter_orders_for_viewer(&covering, &viewer),
        completed,
        edge_flags,
        buffer_hours,
        pickup_window,
    }))
}

/// GET /v1/cars
/// The fleet with each car's bookings attached, visibility-filtered so the
/// picker can gray out taken ranges without leaking contacts.
pub async fn list_cars(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Car>>, AppError> {
    let mut cars = state.car_repo.list_cars().await.map_err(AppError::internal)?;

    let viewer = viewer_from_headers(&headers);
    for car in &mut cars {
        car.orders = rentis_core::visibility::filter_orders_for_viewer(&car.orders, &viewer);
    }
    Ok(Json(cars))
}

/// GET /v1/cars/:id
pub async fn get_car(
    State(state): State<AppState>,
    Path(car_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<Car>, AppError> {
    let mut car = state
        .car_repo
        .get_car(car_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::NotFound(format!("car {car_id} not found")))?;

    let viewer = viewer_from_headers(&headers);
    car.orders = rentis_core::visibility::filter_orders_for_viewer(&car.orders, &viewer);
    Ok(Json(car))
}
