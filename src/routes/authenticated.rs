use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Routes for any logged-in account. The router is wrapped in the auth
/// middleware, and every handler also takes `AuthUser` for its ownership checks
/// (listing owner, booking renter).
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /logout
        .route("/logout", post(handlers::logout))
        // GET /me
        .route("/me", get(handlers::get_me))
        // GET /me/earnings
        // Confirmed booking revenue on the caller's listings.
        .route("/me/earnings", get(handlers::get_my_earnings))
        // --- Listings ---
        // POST /listings
        .route("/listings", post(handlers::create_listing))
        // DELETE /listings/{id}
        // Owner of the listing or admin.
        .route("/listings/{id}", delete(handlers::delete_listing))
        // --- Bookings ---
        // GET /bookings is scoped by role; POST /bookings prices and books a span.
        .route(
            "/bookings",
            get(handlers::get_bookings).post(handlers::create_booking),
        )
        // DELETE /bookings/{id}
        // Cancels rather than deletes. Renter, listing owner or admin.
        .route("/bookings/{id}", delete(handlers::cancel_booking))
}
