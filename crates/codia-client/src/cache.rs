//! Session-scoped balance cache.
//!
//! The cache never trusts mutation responses for display: after every
//! consume or add it refetches the balance from the server. A refetch that
//! fails keeps the last good balance and records the error.

use async_trait::async_trait;
use tokio::sync::RwLock;

use codia_core::{AddCreditsRequest, AddCreditsResponse, Balance, ConsumeRequest, ConsumeResponse};

use crate::error::ClientError;

/// Where the cache reads balances and sends mutations.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the authoritative balance.
    async fn fetch_balance(&self, token: &str) -> Result<Balance, ClientError>;

    /// Charge one generation.
    async fn consume(
        &self,
        token: &str,
        request: &ConsumeRequest,
    ) -> Result<ConsumeResponse, ClientError>;

    /// Add purchased credits.
    async fn add_credits(
        &self,
        token: &str,
        request: &AddCreditsRequest,
    ) -> Result<AddCreditsResponse, ClientError>;
}

/// Authentication state change reported by the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A session started or its token was renewed.
    SignedIn(String),
    /// The session ended.
    SignedOut,
}

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BalanceSnapshot {
    /// Last balance fetched successfully in this session.
    pub balance: Option<Balance>,
    /// A fetch is in flight.
    pub loading: bool,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
}

#[derive(Default)]
struct Session {
    token: Option<String>,
    /// Bumped on every auth change so late fetches from an old session are dropped.
    epoch: u64,
    /// Sequence handed to the next refresh.
    next_request: u64,
    /// Sequence of the newest refresh whose result is in the snapshot.
    applied_request: u64,
    /// Refreshes started in this epoch that have not finished.
    in_flight: usize,
    snapshot: BalanceSnapshot,
}

/// Balance cache bound to one signed-in session at a time.
pub struct BalanceCache<S> {
    source: S,
    session: RwLock<Session>,
}

impl<S: BalanceSource> BalanceCache<S> {
    /// Create an empty, signed-out cache.
    pub fn new(source: S) -> Self {
        Self {
            source,
            session: RwLock::new(Session::default()),
        }
    }

    /// Current state.
    pub async fn snapshot(&self) -> BalanceSnapshot {
        self.session.read().await.snapshot.clone()
    }

    /// React to sign-in, token renewal or sign-out.
    ///
    /// Signing in drops whatever the previous session cached and fetches a
    /// fresh balance. Signing out clears everything.
    pub async fn on_auth_change(&self, event: AuthEvent) {
        {
            let mut session = self.session.write().await;
            let epoch = session.epoch + 1;
            *session = Session {
                token: match event {
                    AuthEvent::SignedIn(token) => Some(token),
                    AuthEvent::SignedOut => None,
                },
                epoch,
                ..Session::default()
            };
        }

        if let Err(e) = self.refresh().await {
            tracing::debug!(error = %e, "Initial balance fetch failed");
        }
    }

    /// Refetch the balance from the server.
    ///
    /// Refreshes may overlap. The snapshot only ever moves forward: a
    /// response older than the one already shown is dropped, and `loading`
    /// stays set until the last overlapping refresh finishes.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` when signed out, or the fetch
    /// error. On error the previous balance stays in the snapshot.
    pub async fn refresh(&self) -> Result<Balance, ClientError> {
        let (token, epoch, request) = {
            let mut session = self.session.write().await;
            let Some(token) = session.token.clone() else {
                return Err(ClientError::Unauthenticated);
            };
            session.next_request += 1;
            session.in_flight += 1;
            session.snapshot.loading = true;
            (token, session.epoch, session.next_request)
        };

        let result = self.source.fetch_balance(&token).await;

        let mut session = self.session.write().await;
        if session.epoch != epoch {
            return result;
        }
        session.in_flight = session.in_flight.saturating_sub(1);
        session.snapshot.loading = session.in_flight > 0;
        if request <= session.applied_request {
            tracing::debug!(request, "Dropping out-of-order balance response");
            return result;
        }
        session.applied_request = request;
        match &result {
            Ok(balance) => {
                session.snapshot.balance = Some(balance.clone());
                session.snapshot.error = None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Balance refresh failed");
                session.snapshot.error = Some(e.to_string());
            }
        }
        result
    }

    /// Charge one generation, then refetch the balance.
    ///
    /// # Errors
    ///
    /// Returns the server's error for the charge. A failed refetch is only
    /// recorded in the snapshot.
    pub async fn consume(&self, request: &ConsumeRequest) -> Result<ConsumeResponse, ClientError> {
        let token = self.token().await?;
        let result = self.source.consume(&token, request).await;
        self.refetch_after_mutation().await;
        result
    }

    /// Add purchased credits, then refetch the balance.
    ///
    /// # Errors
    ///
    /// Same as [`BalanceCache::consume`].
    pub async fn add_credits(
        &self,
        request: &AddCreditsRequest,
    ) -> Result<AddCreditsResponse, ClientError> {
        let token = self.token().await?;
        let result = self.source.add_credits(&token, request).await;
        self.refetch_after_mutation().await;
        result
    }

    async fn token(&self) -> Result<String, ClientError> {
        self.session
            .read()
            .await
            .token
            .clone()
            .ok_or(ClientError::Unauthenticated)
    }

    async fn refetch_after_mutation(&self) {
        if let Err(e) = self.refresh().await {
            tracing::debug!(error = %e, "Balance refetch after mutation failed");
        }
    }
}
