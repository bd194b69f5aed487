/// Router Module Index
///
/// Routing split by access level. `api_routes` in the crate root wraps the
/// authenticated and admin modules in the auth middleware.

/// Routes open to anonymous clients.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes for the 'Admin' role; authenticated, with the role checked in handlers.
pub mod admin;
