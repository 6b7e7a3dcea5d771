//! End-to-end booking flow over in-memory collaborators: the public booking
//! path, conflict blocking, abuse escalation, and the admin confirm gate.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Extension;
use rentis_api::error::AppError;
use rentis_api::orders::{self, place_order, CreateOrderRequest};
use rentis_api::state::{AppState, AuthConfig};
use rentis_api::admin;
use rentis_core::models::{Car, Order};
use rentis_core::permissions::{ActingUser, Role};
use rentis_core::pricing::SeasonalRateTable;
use rentis_core::repository::{CarRepository, OrderRepository};
use rentis_guard::store::MemoryGuardStore;
use rentis_guard::{AbuseGuard, GuardConfig, GuardDecision, IdentityKey};
use uuid::Uuid;

// ============================================================================
// In-memory collaborators
// ============================================================================

#[derive(Default)]
struct MemoryOrderRepo {
    orders: Mutex<Vec<Order>>,
}

#[async_trait]
impl OrderRepository for MemoryOrderRepo {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>> {
        self.orders.lock().unwrap().push(order.clone());
        Ok(order.id)
    }

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.orders.lock().unwrap().iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders_for_car(
        &self,
        car_id: Uuid,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.car_id == car_id)
            .cloned()
            .collect())
    }

    async fn list_orders(&self) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn update_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(existing) = orders.iter_mut().find(|o| o.id == order.id) {
            *existing = order.clone();
        }
        Ok(())
    }

    async fn set_confirmed(
        &self,
        id: Uuid,
        confirmed: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut orders = self.orders.lock().unwrap();
        if let Some(existing) = orders.iter_mut().find(|o| o.id == id) {
            existing.confirmed = confirmed;
        }
        Ok(())
    }
}

#[async_trait]
impl CarRepository for MemoryOrderRepo {
    async fn get_car(
        &self,
        id: Uuid,
    ) -> Result<Option<Car>, Box<dyn std::error::Error + Send + Sync>> {
        let orders = self.list_orders_for_car(id).await?;
        Ok(Some(Car {
            id,
            model: "Test Car".into(),
            orders,
        }))
    }

    async fn list_cars(&self) -> Result<Vec<Car>, Box<dyn std::error::Error + Send + Sync>> {
        let orders = self.orders.lock().unwrap();
        let mut ids: Vec<Uuid> = orders.iter().map(|o| o.car_id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids
            .into_iter()
            .map(|id| Car {
                id,
                model: "Test Car".into(),
                orders: orders.iter().filter(|o| o.car_id == id).cloned().collect(),
            })
            .collect())
    }
}

fn test_state(guard_config: GuardConfig) -> AppState {
    let repo = Arc::new(MemoryOrderRepo::default());
    AppState {
        order_repo: repo.clone(),
        car_repo: repo,
        guard: Arc::new(AbuseGuard::new(
            Arc::new(MemoryGuardStore::new()),
            guard_config,
        )),
        rates: Arc::new(SeasonalRateTable {
            base_day_rate_cents: 5_000,
            season_multipliers: Default::default(),
        }),
        auth: AuthConfig {
            secret: "test-secret".into(),
        },
        business_rules: rentis_store::app_config::BusinessRules {
            buffer_time_hours: 3,
            base_day_rate_cents: 5_000,
            season_multipliers: Default::default(),
            working_hours_start: None,
            working_hours_end: None,
        },
    }
}

fn booking(car_id: Uuid, start: &str, end: &str) -> CreateOrderRequest {
    CreateOrderRequest {
        car_id,
        rental_start_date: start.into(),
        rental_end_date: end.into(),
        customer_name: "Maria K.".into(),
        phone: "+30 694 000 0000".into(),
        email: Some("maria@example.com".into()),
        flight_number: None,
    }
}

fn identity(fp: &str) -> IdentityKey {
    IdentityKey::new(Some("10.0.0.1".into()), Some(fp.into()))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn booking_persists_and_quotes_inclusive_days() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    let order = place_order(&state, &identity("fp-a"), &booking(car_id, "2025-06-10", "2025-06-12"))
        .await
        .expect("booking succeeds");

    // 3 billable days at 50.00
    assert_eq!(order.total_price, 15_000);
    assert!(order.my_order);
    assert!(!order.confirmed);

    let stored = state.order_repo.get_order(order.id).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn shared_boundary_day_blocks_the_second_booking() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    place_order(&state, &identity("fp-a"), &booking(car_id, "2025-06-12", "2025-06-15"))
        .await
        .expect("first booking succeeds");

    // Candidate ends on the day the existing order starts: inclusive overlap.
    let err = place_order(&state, &identity("fp-b"), &booking(car_id, "2025-06-10", "2025-06-12"))
        .await
        .expect_err("boundary day conflicts");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn invalid_dates_are_rejected_as_validation_errors() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    let err = place_order(&state, &identity("fp-a"), &booking(car_id, "2025-06-15", "2025-06-10"))
        .await
        .expect_err("inverted range");
    assert!(matches!(err, AppError::Validation(_)));

    let err = place_order(&state, &identity("fp-a"), &booking(car_id, "someday", "2025-06-10"))
        .await
        .expect_err("unparseable date");
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn third_identical_payload_bans_the_fingerprint() {
    let state = test_state(GuardConfig {
        abuse_identical_payload_max: 3,
        ..GuardConfig::default()
    });
    let car_id = Uuid::new_v4();
    let id = identity("fp-flood");

    // First submission books the car; the next two identical ones conflict,
    // but every one of them is tallied as an identical payload.
    let req = booking(car_id, "2025-06-10", "2025-06-12");
    let _ = place_order(&state, &id, &req).await;
    let _ = place_order(&state, &id, &req).await;
    let _ = place_order(&state, &id, &req).await;

    assert!(state
        .guard
        .is_banned(None, Some("fp-flood"))
        .await
        .unwrap());

    // The fourth request dies at the gate, before business logic.
    assert!(matches!(
        state.guard.check_request(&id).await.unwrap(),
        GuardDecision::Banned { .. }
    ));
}

#[tokio::test]
async fn admin_cannot_confirm_over_confirmed_conflict_but_superadmin_can() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    // A confirmed booking already occupies the range.
    let mut blocking = Order::new(car_id, "2025-06-10".into(), "2025-06-14".into());
    blocking.confirmed = true;
    state.order_repo.create_order(&blocking).await.unwrap();

    // A competing unconfirmed order on overlapping dates.
    let contender = Order::new(car_id, "2025-06-12".into(), "2025-06-16".into());
    state.order_repo.create_order(&contender).await.unwrap();

    let err = admin::confirm_order(
        State(state.clone()),
        Extension(ActingUser::admin(Role::Admin)),
        Path(contender.id),
    )
    .await
    .expect_err("admin is blocked");
    match err {
        AppError::PermissionDenied(decision) => {
            assert_eq!(decision.code.as_deref(), Some("PERMISSION_DENIED"));
        }
        other => panic!("expected permission denial, got {other:?}"),
    }

    let response = admin::confirm_order(
        State(state.clone()),
        Extension(ActingUser::admin(Role::SuperAdmin)),
        Path(contender.id),
    )
    .await
    .expect("superadmin overrides");
    assert!(response.0.order.confirmed);

    let stored = state.order_repo.get_order(contender.id).await.unwrap().unwrap();
    assert!(stored.confirmed);
}

#[tokio::test]
async fn date_edit_recomputes_total_but_keeps_override() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    let mut order = Order::new(car_id, "2025-06-10".into(), "2025-06-12".into());
    order.total_price = 15_000;
    order.override_price = Some(9_000);
    state.order_repo.create_order(&order).await.unwrap();

    let response = admin::update_order(
        State(state.clone()),
        Extension(ActingUser::admin(Role::Admin)),
        Path(order.id),
        axum::Json(serde_json::from_value(serde_json::json!({
            "rentalEndDate": "2025-06-13"
        })).unwrap()),
    )
    .await
    .expect("edit succeeds");

    // 4 billable days at 50.00; the admin override survives untouched.
    assert_eq!(response.0.order.total_price, 20_000);
    assert_eq!(response.0.order.override_price, Some(9_000));
}

#[tokio::test]
async fn repeated_invalid_submissions_escalate_to_a_ban() {
    let state = test_state(GuardConfig {
        abuse_identical_payload_max: 3,
        abuse_failed_attempts_max: 3,
        ..GuardConfig::default()
    });
    let car_id = Uuid::new_v4();
    let id = identity("fp-malformed");

    // The same malformed body over and over: every submission is tallied
    // even though none of them survives validation.
    let req = booking(car_id, "someday", "2025-06-12");
    for _ in 0..3 {
        let err = place_order(&state, &id, &req).await.expect_err("bad dates");
        assert!(matches!(err, AppError::Validation(_)));
    }

    assert!(state
        .guard
        .is_banned(None, Some("fp-malformed"))
        .await
        .unwrap());
    assert!(matches!(
        state.guard.check_request(&id).await.unwrap(),
        GuardDecision::Banned { .. }
    ));
}

#[tokio::test]
async fn fleet_listing_embeds_redacted_bookings() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    place_order(&state, &identity("fp-a"), &booking(car_id, "2025-06-10", "2025-06-12"))
        .await
        .expect("booking succeeds");

    let response = orders::list_cars(State(state.clone()), HeaderMap::new())
        .await
        .expect("listing succeeds");
    let cars = response.0;
    assert_eq!(cars.len(), 1);
    assert_eq!(cars[0].id, car_id);
    assert_eq!(cars[0].orders.len(), 1);
    // Anonymous viewer: the booking is visible, the contacts are not.
    assert!(cars[0].orders[0].phone.is_none());
    assert!(cars[0].orders[0].customer_name.is_none());
}

#[tokio::test]
async fn availability_surfaces_buffer_hours_on_handover_edges() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    let previous = Order::new(car_id, "2025-06-08".into(), "2025-06-12".into());
    state.order_repo.create_order(&previous).await.unwrap();
    let selected = Order::new(car_id, "2025-06-12".into(), "2025-06-16".into());
    state.order_repo.create_order(&selected).await.unwrap();

    let response = orders::car_availability(
        State(state.clone()),
        Path(car_id),
        Query(orders::AvailabilityQuery {
            date: "2025-06-12".into(),
            order_id: Some(selected.id),
        }),
        HeaderMap::new(),
    )
    .await
    .expect("availability succeeds");
    let body = response.0;

    assert!(!body.available);
    let flags = body.edge_flags.expect("selected order has flags");
    assert!(flags.has_previous_order_ending_here);
    // The configured handover gap rides along with the edge flags.
    assert_eq!(body.buffer_hours, Some(3));

    // A day with no handover carries no buffer guidance.
    let response = orders::car_availability(
        State(state.clone()),
        Path(car_id),
        Query(orders::AvailabilityQuery {
            date: "2025-06-14".into(),
            order_id: Some(selected.id),
        }),
        HeaderMap::new(),
    )
    .await
    .expect("availability succeeds");
    assert_eq!(response.0.buffer_hours, None);
}

#[tokio::test]
async fn empty_price_body_does_not_clear_the_override() {
    let state = test_state(GuardConfig::default());
    let car_id = Uuid::new_v4();

    let mut order = Order::new(car_id, "2025-06-10".into(), "2025-06-12".into());
    order.total_price = 15_000;
    order.override_price = Some(9_000);
    state.order_repo.create_order(&order).await.unwrap();

    let err = admin::set_order_price(
        State(state.clone()),
        Extension(ActingUser::admin(Role::Admin)),
        Path(order.id),
        axum::Json(serde_json::from_value(serde_json::json!({})).unwrap()),
    )
    .await
    .expect_err("absent field is rejected");
    assert!(matches!(err, AppError::Validation(_)));

    let stored = state.order_repo.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(stored.override_price, Some(9_000));

    // Explicit null is the deliberate clear.
    let response = admin::set_order_price(
        State(state.clone()),
        Extension(ActingUser::admin(Role::Admin)),
        Path(order.id),
        axum::Json(
            serde_json::from_value(serde_json::json!({ "overridePrice": null })).unwrap(),
        ),
    )
    .await
    .expect("null clears");
    assert_eq!(response.0.order.override_price, None);
}
