pub mod biztime;
pub mod events;
pub mod pii;
