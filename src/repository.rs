use crate::{
    auth::hash_password,
    config::AppConfig,
    models::{
        AdminDashboardStats, Booking, BookingScope, BookingStatus, Listing, NewBooking,
        NewListing, NewUser, Payment, Role, User, UserCredentials,
    },
    schedule::Span,
};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write (usernames).
    #[error("duplicate record")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract shared by the Postgres store and the embedded
/// in-process store. Handlers only ever see `Arc<dyn Repository>`, so both
/// backends must agree on every observable behaviour listed here.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    /// Fails with `RepositoryError::Duplicate` when the username is taken.
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    /// Username compared case-insensitively, role exactly.
    async fn find_credentials(&self, username: &str, role: Role)
    -> RepoResult<Option<UserCredentials>>;
    async fn get_user(&self, id: i32) -> RepoResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn delete_user(&self, id: i32) -> RepoResult<bool>;
    /// Creates the account as an admin, or resets an existing one to admin with this hash.
    async fn upsert_admin(&self, username: &str, password_hash: &str) -> RepoResult<()>;

    // --- Listings ---
    async fn list_listings(&self) -> RepoResult<Vec<Listing>>;
    async fn list_listings_by_owner(&self, owner: &str) -> RepoResult<Vec<Listing>>;
    async fn get_listing(&self, id: i32) -> RepoResult<Option<Listing>>;
    async fn create_listing(&self, owner: &str, listing: NewListing) -> RepoResult<Listing>;
    /// Removes the listing together with its bookings and their payments.
    async fn delete_listing(&self, id: i32) -> RepoResult<bool>;

    // --- Bookings ---
    /// True when a non-cancelled booking of the listing conflicts with `span`.
    async fn has_conflict(&self, listing_id: i32, span: Span) -> RepoResult<bool>;
    /// Stores the booking as confirmed and records its pending payment.
    async fn create_booking(&self, booking: NewBooking) -> RepoResult<Booking>;
    async fn get_booking(&self, id: i32) -> RepoResult<Option<Booking>>;
    /// Rows carry the listing location.
    async fn list_bookings(&self, scope: BookingScope) -> RepoResult<Vec<Booking>>;
    async fn cancel_booking(&self, id: i32) -> RepoResult<bool>;

    // --- Payments & Dashboard ---
    async fn list_payments(&self) -> RepoResult<Vec<Payment>>;
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const PAYMENT_METHOD: &str = "dummy";
const PAYMENT_PENDING: &str = "pending";

/// seed_admins
///
/// Makes sure every configured admin account exists with the configured
/// password. A failure is logged and startup carries on.
pub async fn seed_admins(repo: &dyn Repository, config: &AppConfig) {
    let hash = hash_password(&config.admin_password);
    for username in &config.admin_usernames {
        match repo.upsert_admin(username, &hash).await {
            Ok(()) => tracing::debug!(%username, "admin account ensured"),
            Err(e) => tracing::warn!(%username, error = %e, "failed to seed admin account"),
        }
    }
}

// --- Postgres ---

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. The schema lives in `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, role, contact";
const LISTING_COLUMNS: &str =
    "id, owner, location, price_hourly, price_daily, price_monthly, availability";
const BOOKING_COLUMNS: &str =
    "id, listing_id, renter, start_time, end_time, duration_type, total_price, status";

fn map_unique(e: sqlx::Error) -> RepositoryError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Duplicate,
        _ => RepositoryError::Database(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (username, password, role, contact) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.contact)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)
    }

    async fn find_credentials(
        &self,
        username: &str,
        role: Role,
    ) -> RepoResult<Option<UserCredentials>> {
        let creds = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, username, role, contact, password FROM users WHERE LOWER(username) = LOWER($1) AND role = $2 ORDER BY id LIMIT 1",
        )
        .bind(username)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(creds)
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn upsert_admin(&self, username: &str, password_hash: &str) -> RepoResult<()> {
        sqlx::query(
            r#"INSERT INTO users (username, password, role) VALUES ($1, $2, 'Admin')
               ON CONFLICT (username) DO UPDATE SET password = EXCLUDED.password, role = EXCLUDED.role"#,
        )
        .bind(username)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_listings(&self) -> RepoResult<Vec<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings ORDER BY id");
        Ok(sqlx::query_as::<_, Listing>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_listings_by_owner(&self, owner: &str) -> RepoResult<Vec<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE owner = $1 ORDER BY id");
        Ok(sqlx::query_as::<_, Listing>(&sql)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_listing(&self, id: i32) -> RepoResult<Option<Listing>> {
        let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE id = $1");
        Ok(sqlx::query_as::<_, Listing>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_listing(&self, owner: &str, listing: NewListing) -> RepoResult<Listing> {
        let sql = format!(
            "INSERT INTO listings (owner, location, price_hourly, price_daily, price_monthly, availability) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {LISTING_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Listing>(&sql)
            .bind(owner)
            .bind(&listing.location)
            .bind(listing.price_hourly)
            .bind(listing.price_daily)
            .bind(listing.price_monthly)
            .bind(&listing.availability)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_listing(&self, id: i32) -> RepoResult<bool> {
        // bookings and payments go with it through ON DELETE CASCADE
        let res = sqlx::query("DELETE FROM listings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// has_conflict
    ///
    /// Same three-clause predicate as `Span::conflicts_with`, evaluated in SQL.
    async fn has_conflict(&self, listing_id: i32, span: Span) -> RepoResult<bool> {
        let conflict = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM bookings
                WHERE listing_id = $1
                AND status <> 'cancelled'
                AND (
                    (start_time <= $2 AND end_time >= $2) OR
                    (start_time <= $3 AND end_time >= $3) OR
                    (start_time >= $2 AND end_time <= $3)
                )
            )
            "#,
        )
        .bind(listing_id)
        .bind(span.start)
        .bind(span.end)
        .fetch_one(&self.pool)
        .await?;
        Ok(conflict)
    }

    async fn create_booking(&self, booking: NewBooking) -> RepoResult<Booking> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO bookings (listing_id, renter, start_time, end_time, duration_type, total_price, status) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {BOOKING_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Booking>(&sql)
            .bind(booking.listing_id)
            .bind(&booking.renter)
            .bind(booking.span.start)
            .bind(booking.span.end)
            .bind(booking.duration_type.as_str())
            .bind(booking.total_price)
            .bind(BookingStatus::Confirmed.as_str())
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO payments (booking_id, amount, payment_method, status) VALUES ($1, $2, $3, $4)",
        )
        .bind(created.id)
        .bind(created.total_price)
        .bind(PAYMENT_METHOD)
        .bind(PAYMENT_PENDING)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_booking(&self, id: i32) -> RepoResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        Ok(sqlx::query_as::<_, Booking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_bookings(&self, scope: BookingScope) -> RepoResult<Vec<Booking>> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
            r#"
            SELECT
                b.id, b.listing_id, b.renter, b.start_time, b.end_time,
                b.duration_type, b.total_price, b.status, l.location
            FROM bookings b
            JOIN listings l ON b.listing_id = l.id
            "#,
        );

        match scope {
            BookingScope::All => {}
            BookingScope::OwnedBy(owner) => {
                builder.push(" WHERE l.owner = ");
                builder.push_bind(owner);
            }
            BookingScope::RentedBy(renter) => {
                builder.push(" WHERE b.renter = ");
                builder.push_bind(renter);
            }
        }

        builder.push(" ORDER BY b.start_time, b.id");

        Ok(builder
            .build_query_as::<Booking>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn cancel_booking(&self, id: i32) -> RepoResult<bool> {
        let res = sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
            .bind(BookingStatus::Cancelled.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_payments(&self) -> RepoResult<Vec<Payment>> {
        Ok(sqlx::query_as::<_, Payment>(
            "SELECT id, booking_id, amount, payment_method, status FROM payments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// get_stats
    ///
    /// Compiles all dashboard counters in a single round of queries.
    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let count = |sql: &'static str| sqlx::query_scalar::<_, i64>(sql).fetch_one(&self.pool);

        let total_users = count("SELECT COUNT(*) FROM users").await?;
        let total_listings = count("SELECT COUNT(*) FROM listings").await?;
        let total_bookings = count("SELECT COUNT(*) FROM bookings").await?;
        let confirmed_bookings =
            count("SELECT COUNT(*) FROM bookings WHERE status = 'confirmed'").await?;
        let pending_payments =
            count("SELECT COUNT(*) FROM payments WHERE status = 'pending'").await?;
        let total_revenue = sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(total_price), 0)::DOUBLE PRECISION FROM bookings WHERE status = 'confirmed'",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminDashboardStats {
            total_users,
            total_listings,
            total_bookings,
            confirmed_bookings,
            total_revenue,
            pending_payments,
        })
    }
}

// --- Embedded ---

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, UserCredentials>,
    listings: BTreeMap<i32, Listing>,
    bookings: BTreeMap<i32, Booking>,
    payments: BTreeMap<i32, Payment>,
    next_user_id: i32,
    next_listing_id: i32,
    next_booking_id: i32,
    next_payment_id: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// MemoryRepository
///
/// An embedded, in-process `Repository` with the same semantics as the
/// Postgres store: serial ids starting at 1, case-insensitive login lookup,
/// cascading listing deletes. Used when no `DATABASE_URL` is configured and
/// throughout the tests. Nothing is persisted across restarts.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Duplicate);
        }
        let id = next_id(&mut t.next_user_id);
        let stored = UserCredentials {
            id,
            username: user.username,
            role: user.role,
            contact: user.contact,
            password: user.password_hash,
        };
        t.users.insert(id, stored.clone());
        Ok(stored.into_user())
    }

    async fn find_credentials(
        &self,
        username: &str,
        role: Role,
    ) -> RepoResult<Option<UserCredentials>> {
        let wanted = username.to_lowercase();
        let t = self.tables.read().await;
        Ok(t
            .users
            .values()
            .find(|u| u.role == role && u.username.to_lowercase() == wanted)
            .cloned())
    }

    async fn get_user(&self, id: i32) -> RepoResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.get(&id).cloned().map(UserCredentials::into_user))
    }

    async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .map(UserCredentials::into_user))
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().cloned().map(UserCredentials::into_user).collect())
    }

    async fn delete_user(&self, id: i32) -> RepoResult<bool> {
        Ok(self.tables.write().await.users.remove(&id).is_some())
    }

    async fn upsert_admin(&self, username: &str, password_hash: &str) -> RepoResult<()> {
        let mut t = self.tables.write().await;
        if let Some(existing) = t.users.values_mut().find(|u| u.username == username) {
            existing.password = password_hash.to_string();
            existing.role = Role::Admin;
            return Ok(());
        }
        let id = next_id(&mut t.next_user_id);
        t.users.insert(
            id,
            UserCredentials {
                id,
                username: username.to_string(),
                role: Role::Admin,
                contact: None,
                password: password_hash.to_string(),
            },
        );
        Ok(())
    }

    async fn list_listings(&self) -> RepoResult<Vec<Listing>> {
        Ok(self.tables.read().await.listings.values().cloned().collect())
    }

    async fn list_listings_by_owner(&self, owner: &str) -> RepoResult<Vec<Listing>> {
        let t = self.tables.read().await;
        Ok(t.listings.values().filter(|l| l.owner == owner).cloned().collect())
    }

    async fn get_listing(&self, id: i32) -> RepoResult<Option<Listing>> {
        Ok(self.tables.read().await.listings.get(&id).cloned())
    }

    async fn create_listing(&self, owner: &str, listing: NewListing) -> RepoResult<Listing> {
        let mut t = self.tables.write().await;
        let id = next_id(&mut t.next_listing_id);
        let created = Listing {
            id,
            owner: owner.to_string(),
            location: listing.location,
            price_hourly: listing.price_hourly,
            price_daily: listing.price_daily,
            price_monthly: listing.price_monthly,
            availability: listing.availability,
        };
        t.listings.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_listing(&self, id: i32) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        if t.listings.remove(&id).is_none() {
            return Ok(false);
        }
        let dropped: Vec<i32> = t
            .bookings
            .values()
            .filter(|b| b.listing_id == id)
            .map(|b| b.id)
            .collect();
        t.bookings.retain(|_, b| b.listing_id != id);
        t.payments.retain(|_, p| !dropped.contains(&p.booking_id));
        Ok(true)
    }

    async fn has_conflict(&self, listing_id: i32, span: Span) -> RepoResult<bool> {
        let t = self.tables.read().await;
        Ok(t.bookings.values().any(|b| {
            b.listing_id == listing_id
                && b.status != BookingStatus::Cancelled
                && span.conflicts_with(&b.span())
        }))
    }

    async fn create_booking(&self, booking: NewBooking) -> RepoResult<Booking> {
        let mut t = self.tables.write().await;
        let id = next_id(&mut t.next_booking_id);
        let created = Booking {
            id,
            listing_id: booking.listing_id,
            renter: booking.renter,
            start_time: booking.span.start,
            end_time: booking.span.end,
            duration_type: booking.duration_type,
            total_price: booking.total_price,
            status: BookingStatus::Confirmed,
            location: None,
        };
        t.bookings.insert(id, created.clone());

        let payment_id = next_id(&mut t.next_payment_id);
        t.payments.insert(
            payment_id,
            Payment {
                id: payment_id,
                booking_id: id,
                amount: created.total_price,
                payment_method: PAYMENT_METHOD.to_string(),
                status: PAYMENT_PENDING.to_string(),
            },
        );
        Ok(created)
    }

    async fn get_booking(&self, id: i32) -> RepoResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, scope: BookingScope) -> RepoResult<Vec<Booking>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Booking> = t
            .bookings
            .values()
            .filter_map(|b| {
                // inner join: bookings whose listing is gone are not listed
                let listing = t.listings.get(&b.listing_id)?;
                let visible = match &scope {
                    BookingScope::All => true,
                    BookingScope::OwnedBy(owner) => &listing.owner == owner,
                    BookingScope::RentedBy(renter) => &b.renter == renter,
                };
                visible.then(|| Booking {
                    location: Some(listing.location.clone()),
                    ..b.clone()
                })
            })
            .collect();
        rows.sort_by_key(|b| (b.start_time, b.id));
        Ok(rows)
    }

    async fn cancel_booking(&self, id: i32) -> RepoResult<bool> {
        let mut t = self.tables.write().await;
        match t.bookings.get_mut(&id) {
            Some(b) => {
                b.status = BookingStatus::Cancelled;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_payments(&self) -> RepoResult<Vec<Payment>> {
        Ok(self.tables.read().await.payments.values().cloned().collect())
    }

    async fn get_stats(&self) -> RepoResult<AdminDashboardStats> {
        let t = self.tables.read().await;
        let confirmed = t
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Confirmed);
        let (confirmed_bookings, total_revenue) =
            confirmed.fold((0i64, 0f64), |(n, sum), b| (n + 1, sum + b.total_price));
        Ok(AdminDashboardStats {
            total_users: t.users.len() as i64,
            total_listings: t.listings.len() as i64,
            total_bookings: t.bookings.len() as i64,
            confirmed_bookings,
            total_revenue,
            pending_payments: t
                .payments
                .values()
                .filter(|p| p.status == PAYMENT_PENDING)
                .count() as i64,
        })
    }
}
