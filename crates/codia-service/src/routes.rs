//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{accounts, credits, generation, health};
use crate::state::AppState;

/// Maximum concurrent requests across all ledger endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Maximum concurrent generations; each one holds an upstream connection.
const GENERATION_MAX_CONCURRENT_REQUESTS: usize = 20;

/// Cap the in-flight requests of every route in `routes` with one shared
/// semaphore. `Router::layer` wraps each route separately, so the limiter
/// must hold its permits outside the per-route service.
fn concurrency_group<S>(routes: Router<S>, max: usize) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    routes.layer(GlobalConcurrencyLimitLayer::new(max))
}

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Accounts (bearer)
/// - `POST /v1/accounts` - Register account
/// - `GET /v1/accounts/me` - Current account
/// - `DELETE /v1/accounts/me` - Soft delete
/// - `POST /v1/accounts/me/verify-email` - One-time verification bonus
///
/// ## Credits (bearer)
/// - `GET /v1/credits/balance`
/// - `POST /v1/credits/consume`
/// - `POST /v1/credits/add`
/// - `GET /v1/credits/transactions`
///
/// ## Admin (`X-Admin-Key`)
/// - `POST /v1/admin/credits/grant`
///
/// ## Generation (bearer)
/// - `POST /v1/generate/:category`
/// - `GET /v1/artifacts/:category`
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let generation_routes = concurrency_group(
        Router::new().route("/generate/:category", post(generation::generate)),
        GENERATION_MAX_CONCURRENT_REQUESTS,
    );

    let ledger_routes = Router::new()
        // Accounts
        .route("/accounts", post(accounts::create_account))
        .route(
            "/accounts/me",
            get(accounts::get_account).delete(accounts::delete_account),
        )
        .route("/accounts/me/verify-email", post(accounts::verify_email))
        // Credits
        .route("/credits/balance", get(credits::get_balance))
        .route("/credits/consume", post(credits::consume))
        .route("/credits/add", post(credits::add_credits))
        .route("/credits/transactions", get(credits::list_transactions))
        // Admin
        .route("/admin/credits/grant", post(credits::admin_grant_credits))
        // Artifacts
        .route("/artifacts/:category", get(generation::get_artifact));

    let api_routes = concurrency_group(ledger_routes, API_MAX_CONCURRENT_REQUESTS)
        .merge(generation_routes);

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn routes_in_a_group_share_one_limit() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let hold = {
            let entered = entered.clone();
            let release = release.clone();
            move || {
                let entered = entered.clone();
                let release = release.clone();
                async move {
                    entered.notify_one();
                    release.notified().await;
                    StatusCode::OK
                }
            }
        };
        let router: Router = concurrency_group(
            Router::new()
                .route("/hold", get(hold))
                .route("/fast", get(|| async { StatusCode::OK })),
            1,
        );

        let held = tokio::spawn(router.clone().oneshot(get_request("/hold")));
        entered.notified().await;

        let blocked = tokio::time::timeout(
            Duration::from_millis(100),
            router.clone().oneshot(get_request("/fast")),
        )
        .await;
        assert!(blocked.is_err(), "second route ran past the shared limit");

        release.notify_one();
        assert_eq!(held.await.unwrap().unwrap().status(), StatusCode::OK);
        let response = router.oneshot(get_request("/fast")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
