//! Audit events recorded on the mutation paths. Emitted as structured
//! `target: "audit"` log lines so downstream collectors can pick them up
//! without a broker in the loop.

use serde::Serialize;
use uuid::Uuid;

/// Serialize and log an audit event. Serialization failure is logged, never
/// propagated; audit must not fail the mutation it describes.
pub fn emit<E: Serialize>(name: &str, event: &E) {
    match serde_json::to_string(event) {
        Ok(payload) => tracing::info!(target: "audit", event = name, %payload),
        Err(err) => {
            tracing::warn!(target: "audit", event = name, "audit event not serializable: {err}")
        }
    }
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub car_id: Uuid,
    pub rental_start: String,
    pub rental_end: String,
    pub client_created: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderConfirmedEvent {
    pub order_id: Uuid,
    pub actor_role: String,
    pub conflict_override: bool,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BanIssuedEvent {
    pub ban_id: Uuid,
    pub reason: String,
    pub auto: bool,
    pub expires_at: Option<i64>,
    pub timestamp: i64,
}
