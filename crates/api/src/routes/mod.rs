//! HTTP handlers, one module per resource.

pub mod health;
pub mod history;
pub mod metrics;
pub mod payments;
pub mod rooms;
