use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get},
};

/// Admin Router Module
///
/// User management and oversight. Mounted behind the auth middleware; each
/// handler then rejects non-admin callers with 403.
///
/// The user endpoints keep their historical top-level paths (/users) that the
/// dashboards call, the newer oversight endpoints live under /admin.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /users
        .route("/users", get(handlers::get_users))
        // DELETE /users/{id}
        .route("/users/{id}", delete(handlers::delete_user))
        // GET /admin/stats
        // Users, listings, bookings, confirmed revenue, pending payments.
        .route("/admin/stats", get(handlers::get_admin_stats))
        // GET /admin/payments
        .route("/admin/payments", get(handlers::get_payments))
}
