use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Domain logic with no I/O.
pub mod pricing;
pub mod schedule;

// Application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod session;

// Routing split by access level (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};
pub use session::{SessionState, SessionStore};

/// ApiDoc
///
/// OpenAPI document for every handler and wire schema, served at
/// `/api-docs/openapi.json` and browsable at `/swagger-ui`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::register_user, handlers::login, handlers::logout, handlers::get_me,
        handlers::get_my_earnings, handlers::get_listings, handlers::get_listing_quote,
        handlers::create_listing, handlers::delete_listing, handlers::get_bookings,
        handlers::create_booking, handlers::cancel_booking, handlers::get_users,
        handlers::delete_user, handlers::get_admin_stats, handlers::get_payments
    ),
    components(
        schemas(
            models::Role, models::BookingStatus, models::User, models::Listing, models::Booking,
            models::Payment, models::RegisterRequest, models::LoginRequest,
            models::LoginResponse, models::SessionUser, models::AvailabilityInput,
            models::CreateListingRequest, models::CreateBookingRequest, models::UserEnvelope,
            models::UsersEnvelope, models::ListingEnvelope, models::ListingsEnvelope,
            models::BookingEnvelope, models::BookingsEnvelope, models::PaymentsEnvelope,
            models::OkResponse, models::AdminDashboardStats, models::OwnerEarnings,
            pricing::DurationType, pricing::Quote, error::ErrorBody,
        )
    ),
    tags(
        (name = "parkeasy", description = "Parking space rental marketplace API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared state handed to every route.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres or the embedded store.
    pub repo: RepositoryState,
    /// Bearer token to username map.
    pub sessions: SessionState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// State with a fresh, empty session store.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        Self {
            repo,
            sessions: SessionState::default(),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// Let extractors such as `AuthUser` pull single components out of `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Rejects the request with 401 before it reaches the handler when `AuthUser`
/// cannot be resolved.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// api_routes
///
/// Public, authenticated and admin routes merged into one router (state still
/// unbound). `create_router` mounts it twice: at the root and under `/api`.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let protected = authenticated::authenticated_routes()
        .merge(admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public::public_routes())
        .merge(protected)
}

/// create_router
///
/// Assembles the routing tree, applies the observability and CORS layers and
/// binds the state.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let api = api_routes(&state);

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with the `x-request-id` so every log line
/// of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
