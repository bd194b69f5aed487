use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::pricing::{DurationType, PriceTiers};
use crate::schedule::Span;

/// Raised when a stored or submitted label does not name a known variant.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// --- Enumerations ---

/// Role
///
/// The RBAC field carried by every account. `Admin` accounts are only ever
/// seeded at startup; registration refuses them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum Role {
    Renter,
    Owner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Renter => "Renter",
            Role::Owner => "Owner",
            Role::Admin => "Admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Renter" => Ok(Role::Renter),
            "Owner" => Ok(Role::Owner),
            "Admin" => Ok(Role::Admin),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// BookingStatus
///
/// New bookings are stored `confirmed`; cancelling flips them to `cancelled`,
/// which also releases the span for other renters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(UnknownVariant {
                kind: "booking status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// A row of the `users` table without the password hash. This is what every
/// endpoint that lists or returns accounts exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub contact: Option<String>,
}

/// UserCredentials
///
/// Internal row used only by the login flow: the account plus its stored hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub username: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub contact: Option<String>,
    pub password: String,
}

impl UserCredentials {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            role: self.role,
            contact: self.contact,
        }
    }
}

/// Listing
///
/// A parking spot offered by an owner, with its three price tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Listing {
    pub id: i32,
    /// Username of the owner.
    pub owner: String,
    pub location: String,
    pub price_hourly: f64,
    pub price_daily: f64,
    pub price_monthly: f64,
    /// Free-form label, `Available` or `Unavailable` when set from the dashboard.
    pub availability: String,
}

impl Listing {
    pub fn tiers(&self) -> PriceTiers {
        PriceTiers::new(self.price_hourly, self.price_daily, self.price_monthly)
    }
}

/// Booking
///
/// A reservation of a listing. `location` is only present on rows loaded
/// through the listings join (GET /bookings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Booking {
    pub id: i32,
    pub listing_id: i32,
    pub renter: String,
    #[ts(type = "string")]
    pub start_time: NaiveDateTime,
    #[ts(type = "string")]
    pub end_time: NaiveDateTime,
    #[sqlx(try_from = "String")]
    pub duration_type: DurationType,
    pub total_price: f64,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    #[sqlx(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Booking {
    pub fn span(&self) -> Span {
        Span {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// Payment
///
/// One payment record is written per booking, with the `dummy` method and a
/// `pending` status. Nothing settles them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct Payment {
    pub id: i32,
    pub booking_id: i32,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
}

// --- Repository Inputs ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub contact: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewListing {
    pub location: String,
    pub price_hourly: f64,
    pub price_daily: f64,
    pub price_monthly: f64,
    pub availability: String,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub listing_id: i32,
    pub renter: String,
    pub span: Span,
    pub duration_type: DurationType,
    pub total_price: f64,
}

/// Which bookings a caller may see on GET /bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingScope {
    All,
    /// Bookings on listings owned by this username.
    OwnedBy(String),
    /// Bookings made by this username.
    RentedBy(String),
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for POST /register. Every field is optional on the wire so the
/// handler can answer `Missing fields` instead of a deserialization error.
/// `contact_number` is accepted as an older spelling of `contact`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub contact: Option<String>,
    pub contact_number: Option<String>,
}

/// LoginRequest
///
/// The role is part of the credentials: the same username cannot log in under
/// a role it was not registered with.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

/// AvailabilityInput
///
/// The dashboard sends a checkbox (`true`/`false`), older clients send the label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum AvailabilityInput {
    Flag(bool),
    Label(String),
}

impl AvailabilityInput {
    pub fn into_label(self) -> String {
        match self {
            AvailabilityInput::Flag(true) => "Available".to_string(),
            AvailabilityInput::Flag(false) => "Unavailable".to_string(),
            AvailabilityInput::Label(label) if label.is_empty() => "Available".to_string(),
            AvailabilityInput::Label(label) => label,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateListingRequest {
    pub location: Option<String>,
    pub price_hourly: Option<f64>,
    pub price_daily: Option<f64>,
    pub price_monthly: Option<f64>,
    pub availability: Option<AvailabilityInput>,
}

/// CreateBookingRequest
///
/// Times are taken as strings and parsed by the handler; see
/// [`crate::schedule::parse_timestamp`] for the accepted forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateBookingRequest {
    pub listing_id: Option<i32>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_type: Option<DurationType>,
}

// --- Query Parameters ---

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListingsQuery {
    /// `true` restricts the result to the caller's own listings.
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuoteQuery {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration_type: Option<DurationType>,
}

// --- Response Envelopes ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserEnvelope {
    pub user: User,
}

/// SessionUser
///
/// The account as echoed back on login: no id, matching what the browser stores.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionUser {
    pub username: String,
    pub role: Role,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UsersEnvelope {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ListingEnvelope {
    pub listing: Listing,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ListingsEnvelope {
    pub listings: Vec<Listing>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BookingEnvelope {
    pub booking: Booking,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BookingsEnvelope {
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PaymentsEnvelope {
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

// --- Dashboard Schemas (Output) ---

/// AdminDashboardStats
///
/// Output schema for GET /admin/stats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminDashboardStats {
    pub total_users: i64,
    pub total_listings: i64,
    pub total_bookings: i64,
    pub confirmed_bookings: i64,
    /// Sum of `total_price` over confirmed bookings.
    pub total_revenue: f64,
    pub pending_payments: i64,
}

/// OwnerEarnings
///
/// What an owner has earned: confirmed bookings on their listings only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OwnerEarnings {
    pub confirmed_bookings: i64,
    pub total_earnings: f64,
}

impl OwnerEarnings {
    pub fn from_bookings<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        bookings
            .into_iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .fold(Self::default(), |acc, b| Self {
                confirmed_bookings: acc.confirmed_bookings + 1,
                total_earnings: acc.total_earnings + b.total_price,
            })
    }
}
