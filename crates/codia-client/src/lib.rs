//! Codia Client SDK.
//!
//! This crate provides:
//!
//! - [`LedgerClient`]: HTTP client for the balance, consume and add endpoints
//! - [`BalanceCache`]: a session-scoped balance holder for UI code, refreshed
//!   from the server after every mutation
//!
//! # Example
//!
//! ```no_run
//! use codia_client::{AuthEvent, BalanceCache, LedgerClient};
//! use codia_core::ConsumeRequest;
//!
//! # async fn example() -> Result<(), codia_client::ClientError> {
//! let client = LedgerClient::new("https://api.codia.app")?;
//! let cache = BalanceCache::new(client);
//!
//! cache.on_auth_change(AuthEvent::SignedIn("user-jwt".into())).await;
//!
//! let receipt = cache
//!     .consume(&ConsumeRequest {
//!         category: "logo".into(),
//!         metadata: None,
//!     })
//!     .await?;
//!
//! println!("Spent {} credits", receipt.consumption.credits_used);
//! println!("Balance now: {:?}", cache.snapshot().await.balance);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod cache;
mod client;
mod error;

pub use cache::{AuthEvent, BalanceCache, BalanceSnapshot, BalanceSource};
pub use client::{ClientOptions, LedgerClient};
pub use error::ClientError;
