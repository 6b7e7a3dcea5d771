use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod middleware;
pub mod orders;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::HeaderName::from_static(middleware::guard::FINGERPRINT_HEADER),
            axum::http::HeaderName::from_static(orders::CLIENT_ORDERS_HEADER),
        ]);

    // The guard gate only fronts public order creation; reads stay cheap.
    let booking = Router::new()
        .route("/v1/orders", post(orders::create_order))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::guard::abuse_guard_middleware,
        ));

    let public_reads = Router::new()
        .route("/v1/cars", get(orders::list_cars))
        .route("/v1/cars/{id}", get(orders::get_car))
        .route("/v1/cars/{id}/orders", get(orders::list_car_orders))
        .route("/v1/cars/{id}/availability", get(orders::car_availability));

    let back_office = Router::new()
        .route("/v1/admin/orders", get(admin::list_orders))
        .route("/v1/admin/orders/{id}", put(admin::update_order))
        .route("/v1/admin/orders/{id}/confirm", post(admin::confirm_order))
        .route("/v1/admin/orders/{id}/price", put(admin::set_order_price))
        .route("/v1/admin/bans", post(admin::create_ban))
        .route("/v1/admin/bans/{id}", delete(admin::delete_ban))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .merge(booking)
        .merge(public_reads)
        .merge(back_office)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
