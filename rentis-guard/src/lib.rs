pub mod ban;
pub mod config;
pub mod guard;
pub mod store;

pub use ban::{Ban, BanType};
pub use config::GuardConfig;
pub use guard::{AbuseGuard, GuardDecision, IdentityKey};
pub use store::GuardStore;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Guard store error: {0}")]
    Store(#[from] Box<dyn std::error::Error + Send + Sync>),
}

pub type GuardResult<T> = Result<T, GuardError>;
