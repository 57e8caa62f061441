//! Codia HTTP API service.
//!
//! This crate exposes the credit ledger and the generation proxy over HTTP:
//!
//! - Account registration, soft deletion and e-mail verification
//! - Credit balance, consumption, purchases and transaction history
//! - Generation endpoints that charge credits and call the upstream provider
//!
//! # Authentication
//!
//! 1. **Platform JWTs** - bearer tokens for end-user requests
//! 2. **Admin key** - `X-Admin-Key` header for operator endpoints

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod prompts;
pub mod provider;
pub mod routes;
pub mod state;

pub use config::{ProviderConfig, ServiceConfig, StoreBackend};
pub use error::ApiError;
pub use provider::{GenerationProvider, ProviderClient, ProviderError};
pub use routes::create_router;
pub use state::AppState;
