use crate::{
    AppState,
    auth::{AuthUser, bearer_token, hash_password},
    error::{ApiError, OrInternal},
    models::{
        AdminDashboardStats, BookingEnvelope, BookingScope, BookingsEnvelope,
        CreateBookingRequest, CreateListingRequest, ListingEnvelope, ListingsEnvelope,
        ListingsQuery, LoginRequest, LoginResponse, NewBooking, NewListing, NewUser, OkResponse,
        OwnerEarnings, PaymentsEnvelope, QuoteQuery, RegisterRequest, Role, SessionUser, User,
        UserEnvelope, UsersEnvelope,
    },
    pricing::{self, Quote},
    repository::RepositoryError,
    schedule::Span,
};
use crate::extract::{Json, Path, Query};
use axum::{extract::State, http::HeaderMap};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Treats absent and blank strings the same way.
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Passwords are taken verbatim; only the empty string counts as missing.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_span(start: &str, end: &str) -> Result<Span, ApiError> {
    Span::parse(start, end).map_err(|e| ApiError::bad_request(e.to_string()))
}

// --- Accounts ---

/// register_user
///
/// [Public Route] Creates a Renter or Owner account. Admin accounts cannot be
/// registered; they are seeded at startup.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = UserEnvelope),
        (status = 400, description = "Missing fields or unknown role", body = crate::error::ErrorBody),
        (status = 403, description = "Admin registration not allowed", body = crate::error::ErrorBody),
        (status = 409, description = "Username already exists", body = crate::error::ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> ApiResult<UserEnvelope> {
    let contact = present(payload.contact).or(present(payload.contact_number));
    let (Some(username), Some(password), Some(role)) = (
        present(payload.username),
        non_empty(payload.password),
        present(payload.role),
    ) else {
        return Err(ApiError::bad_request("Missing fields"));
    };

    let role: Role = role
        .parse()
        .map_err(|_| ApiError::bad_request("Invalid role"))?;
    if role == Role::Admin {
        return Err(ApiError::Forbidden("Admin registration not allowed"));
    }

    let new_user = NewUser {
        username,
        password_hash: hash_password(&password),
        role,
        contact,
    };

    match state.repo.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, role = %user.role, "user registered");
            Ok(Json(UserEnvelope { user }))
        }
        Err(RepositoryError::Duplicate) => Err(ApiError::Conflict("Username already exists")),
        Err(e) => {
            tracing::error!(error = %e, "Registration failed");
            Err(ApiError::Internal("Registration failed"))
        }
    }
}

/// login
///
/// [Public Route] Verifies username (case-insensitive), role and password and
/// issues a bearer token.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing fields", body = crate::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let (Some(username), Some(password), Some(role)) = (
        present(payload.username),
        non_empty(payload.password),
        present(payload.role),
    ) else {
        return Err(ApiError::bad_request("Missing fields"));
    };

    // an unknown role matches no account
    let role: Role = role.parse().map_err(|_| ApiError::InvalidCredentials)?;

    let creds = state
        .repo
        .find_credentials(&username, role)
        .await
        .or_internal("Login failed")?
        .ok_or(ApiError::InvalidCredentials)?;

    if creds.password != hash_password(&password) {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state.sessions.issue(&creds.username);
    tracing::info!(user_id = creds.id, "login succeeded");

    Ok(Json(LoginResponse {
        user: SessionUser {
            username: creds.username,
            role: creds.role,
            contact: creds.contact,
        },
        token,
    }))
}

/// logout
///
/// [Authenticated Route] Revokes the bearer token used for this request.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 200, description = "Logged out", body = OkResponse))
)]
pub async fn logout(
    _user: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<OkResponse> {
    if let Some(token) = bearer_token(&headers) {
        state.sessions.revoke(token);
    }
    Json(OkResponse::ok())
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(user: AuthUser) -> Json<User> {
    Json(User {
        id: user.id,
        username: user.username,
        role: user.role,
        contact: user.contact,
    })
}

// --- Listings ---

/// get_listings
///
/// [Public Route] Every listing, or with `?owner=true` only the caller's own,
/// which requires authentication.
#[utoipa::path(
    get,
    path = "/listings",
    params(ListingsQuery),
    responses(
        (status = 200, description = "Listings", body = ListingsEnvelope),
        (status = 401, description = "owner=true without a session", body = crate::error::ErrorBody)
    )
)]
pub async fn get_listings(
    user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> ApiResult<ListingsEnvelope> {
    let listings = if query.owner.as_deref() == Some("true") {
        let user = user.ok_or(ApiError::Unauthorized)?;
        state.repo.list_listings_by_owner(&user.username).await
    } else {
        state.repo.list_listings().await
    }
    .or_internal("Failed to fetch listings")?;

    Ok(Json(ListingsEnvelope { listings }))
}

/// get_listing_quote
///
/// [Public Route] Price estimate for renting a listing over a span, using the
/// requested rate plan (optimal by default).
#[utoipa::path(
    get,
    path = "/listings/{id}/quote",
    params(("id" = i32, Path, description = "Listing ID"), QuoteQuery),
    responses(
        (status = 200, description = "Quote", body = Quote),
        (status = 400, description = "Bad span", body = crate::error::ErrorBody),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody)
    )
)]
pub async fn get_listing_quote(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult<Quote> {
    let (Some(start), Some(end)) = (present(query.start_time), present(query.end_time)) else {
        return Err(ApiError::bad_request("Missing fields"));
    };
    let span = parse_span(&start, &end)?;

    let listing = state
        .repo
        .get_listing(id)
        .await
        .or_internal("Failed to fetch listing")?
        .ok_or(ApiError::NotFound("Listing not found"))?;

    let duration_type = query.duration_type.unwrap_or_default();
    Ok(Json(pricing::quote(
        &listing.tiers(),
        duration_type,
        span.start,
        span.end,
    )))
}

/// create_listing
///
/// [Authenticated Route] Lists a new spot owned by the caller. Missing prices
/// default to zero and a missing availability to `Available`.
#[utoipa::path(
    post,
    path = "/listings",
    request_body = CreateListingRequest,
    responses(
        (status = 200, description = "Created", body = ListingEnvelope),
        (status = 400, description = "Missing location", body = crate::error::ErrorBody)
    )
)]
pub async fn create_listing(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateListingRequest>,
) -> ApiResult<ListingEnvelope> {
    let location = present(payload.location).ok_or(ApiError::bad_request("Missing location"))?;

    let new_listing = NewListing {
        location,
        price_hourly: payload.price_hourly.unwrap_or(0.0),
        price_daily: payload.price_daily.unwrap_or(0.0),
        price_monthly: payload.price_monthly.unwrap_or(0.0),
        availability: payload
            .availability
            .map(|a| a.into_label())
            .unwrap_or_else(|| "Available".to_string()),
    };
    if [
        new_listing.price_hourly,
        new_listing.price_daily,
        new_listing.price_monthly,
    ]
    .iter()
    .any(|p| !p.is_finite() || *p < 0.0)
    {
        return Err(ApiError::bad_request("Prices must be non-negative numbers"));
    }

    let listing = state
        .repo
        .create_listing(&user.username, new_listing)
        .await
        .or_internal("Failed to create listing")?;

    tracing::info!(listing_id = listing.id, owner = %listing.owner, "listing created");
    Ok(Json(ListingEnvelope { listing }))
}

/// delete_listing
///
/// [Authenticated Route] Removes a listing with its bookings. Allowed for the
/// listing's owner and for admins.
#[utoipa::path(
    delete,
    path = "/listings/{id}",
    params(("id" = i32, Path, description = "Listing ID")),
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 403, description = "Not owner or admin", body = crate::error::ErrorBody),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_listing(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OkResponse> {
    let listing = state
        .repo
        .get_listing(id)
        .await
        .or_internal("Failed to delete listing")?
        .ok_or(ApiError::NotFound("Listing not found"))?;

    if listing.owner != user.username && !user.is_admin() {
        return Err(ApiError::forbidden());
    }

    state
        .repo
        .delete_listing(id)
        .await
        .or_internal("Failed to delete listing")?;

    tracing::info!(listing_id = id, by = %user.username, "listing deleted");
    Ok(Json(OkResponse::ok()))
}

// --- Bookings ---

/// get_bookings
///
/// [Authenticated Route] Admins see every booking, owners the bookings on their
/// listings, everyone else their own bookings.
#[utoipa::path(
    get,
    path = "/bookings",
    responses((status = 200, description = "Bookings", body = BookingsEnvelope))
)]
pub async fn get_bookings(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<BookingsEnvelope> {
    let scope = match user.role {
        Role::Admin => BookingScope::All,
        Role::Owner => BookingScope::OwnedBy(user.username),
        Role::Renter => BookingScope::RentedBy(user.username),
    };
    let bookings = state
        .repo
        .list_bookings(scope)
        .await
        .or_internal("Failed to fetch bookings")?;
    Ok(Json(BookingsEnvelope { bookings }))
}

/// create_booking
///
/// [Authenticated Route] Books a listing for a span. The price is computed
/// server-side from the listing's tiers; the booking is stored confirmed with a
/// pending payment.
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 200, description = "Booked", body = BookingEnvelope),
        (status = 400, description = "Missing or invalid fields", body = crate::error::ErrorBody),
        (status = 404, description = "Listing not found", body = crate::error::ErrorBody),
        (status = 409, description = "Not available", body = crate::error::ErrorBody)
    )
)]
pub async fn create_booking(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> ApiResult<BookingEnvelope> {
    let (Some(listing_id), Some(start), Some(end)) = (
        payload.listing_id,
        present(payload.start_time),
        present(payload.end_time),
    ) else {
        return Err(ApiError::bad_request("Missing fields"));
    };
    let span = parse_span(&start, &end)?;

    let listing = state
        .repo
        .get_listing(listing_id)
        .await
        .or_internal("Failed to create booking")?
        .ok_or(ApiError::NotFound("Listing not found"))?;

    let taken = state
        .repo
        .has_conflict(listing_id, span)
        .await
        .or_internal("Failed to create booking")?;
    if taken {
        return Err(ApiError::Conflict("Not available"));
    }

    let duration_type = payload.duration_type.unwrap_or_default();
    let quote = pricing::quote(&listing.tiers(), duration_type, span.start, span.end);

    let booking = state
        .repo
        .create_booking(NewBooking {
            listing_id,
            renter: user.username,
            span,
            duration_type,
            total_price: quote.price,
        })
        .await
        .or_internal("Failed to create booking")?;

    tracing::info!(
        booking_id = booking.id,
        listing_id,
        hours = quote.hours,
        total = booking.total_price,
        "booking confirmed"
    );
    Ok(Json(BookingEnvelope { booking }))
}

/// cancel_booking
///
/// [Authenticated Route] Marks a booking cancelled. Allowed for the renter, the
/// owner of the booked listing, and admins.
#[utoipa::path(
    delete,
    path = "/bookings/{id}",
    params(("id" = i32, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Cancelled", body = OkResponse),
        (status = 403, description = "Forbidden", body = crate::error::ErrorBody),
        (status = 404, description = "Booking not found", body = crate::error::ErrorBody)
    )
)]
pub async fn cancel_booking(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OkResponse> {
    let booking = state
        .repo
        .get_booking(id)
        .await
        .or_internal("Failed to cancel booking")?
        .ok_or(ApiError::NotFound("Booking not found"))?;

    let listing_owner = state
        .repo
        .get_listing(booking.listing_id)
        .await
        .or_internal("Failed to cancel booking")?
        .map(|l| l.owner);

    let allowed = booking.renter == user.username
        || listing_owner.as_deref() == Some(user.username.as_str())
        || user.is_admin();
    if !allowed {
        return Err(ApiError::forbidden());
    }

    state
        .repo
        .cancel_booking(id)
        .await
        .or_internal("Failed to cancel booking")?;

    tracing::info!(booking_id = id, by = %user.username, "booking cancelled");
    Ok(Json(OkResponse::ok()))
}

/// get_my_earnings
///
/// [Authenticated Route] Total of confirmed bookings on the caller's listings.
#[utoipa::path(
    get,
    path = "/me/earnings",
    responses((status = 200, description = "Earnings", body = OwnerEarnings))
)]
pub async fn get_my_earnings(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<OwnerEarnings> {
    let bookings = state
        .repo
        .list_bookings(BookingScope::OwnedBy(user.username))
        .await
        .or_internal("Failed to fetch earnings")?;
    Ok(Json(OwnerEarnings::from_bookings(&bookings)))
}

// --- Administration ---

/// get_users
///
/// [Admin Route] Every account, without password hashes.
#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "Users", body = UsersEnvelope),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn get_users(user: AuthUser, State(state): State<AppState>) -> ApiResult<UsersEnvelope> {
    user.require_admin()?;
    let users = state
        .repo
        .list_users()
        .await
        .or_internal("Failed to fetch users")?;
    Ok(Json(UsersEnvelope { users }))
}

/// delete_user
///
/// [Admin Route] Removes an account. Its listings and bookings stay.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = OkResponse),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody),
        (status = 404, description = "User not found", body = crate::error::ErrorBody)
    )
)]
pub async fn delete_user(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<OkResponse> {
    user.require_admin()?;
    let deleted = state
        .repo
        .delete_user(id)
        .await
        .or_internal("Failed to delete user")?;
    if !deleted {
        return Err(ApiError::NotFound("User not found"));
    }
    tracing::info!(user_id = id, by = %user.username, "user deleted");
    Ok(Json(OkResponse::ok()))
}

/// get_admin_stats
///
/// [Admin Route] Dashboard counters.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminDashboardStats),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn get_admin_stats(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<AdminDashboardStats> {
    user.require_admin()?;
    Ok(Json(
        state.repo.get_stats().await.or_internal("Failed to fetch stats")?,
    ))
}

/// get_payments
///
/// [Admin Route] Every payment record.
#[utoipa::path(
    get,
    path = "/admin/payments",
    responses(
        (status = 200, description = "Payments", body = PaymentsEnvelope),
        (status = 403, description = "Not an admin", body = crate::error::ErrorBody)
    )
)]
pub async fn get_payments(
    user: AuthUser,
    State(state): State<AppState>,
) -> ApiResult<PaymentsEnvelope> {
    user.require_admin()?;
    let payments = state
        .repo
        .list_payments()
        .await
        .or_internal("Failed to fetch payments")?;
    Ok(Json(PaymentsEnvelope { payments }))
}
