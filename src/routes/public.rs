use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session: health, the account gateway, and
/// read-only browsing of listings.
///
/// GET /listings is public but switches to the caller's own listings with
/// `?owner=true`; that branch authenticates inside the handler.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // POST /register
        // Renter/Owner account creation. Admins are seeded, never registered.
        .route("/register", post(handlers::register_user))
        // POST /login
        // Exchanges username/password/role for a bearer token.
        .route("/login", post(handlers::login))
        // GET /listings[?owner=true]
        .route("/listings", get(handlers::get_listings))
        // GET /listings/{id}/quote?start_time=..&end_time=..&duration_type=..
        // Price estimate shown before confirming a booking.
        .route("/listings/{id}/quote", get(handlers::get_listing_quote))
}
