//! API handlers.

pub mod accounts;
pub mod credits;
pub mod generation;
pub mod health;
