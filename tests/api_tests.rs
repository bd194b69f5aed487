use parkeasy::{
    AppConfig, AppState, MemoryRepository, create_router,
    models::{BookingsEnvelope, ListingEnvelope, LoginResponse, UserEnvelope},
    repository::{self, RepositoryState},
};
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(self.url(path)).json(&body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("request failed")
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("request failed")
    }

    async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("request failed")
    }

    /// Registers the account and returns a bearer token for it.
    async fn sign_up(&self, username: &str, role: &str) -> String {
        let response = self
            .post(
                "/register",
                None,
                json!({ "username": username, "password": "pw", "role": role }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        self.sign_in(username, "pw", role).await
    }

    async fn sign_in(&self, username: &str, password: &str, role: &str) -> String {
        let response = self
            .post(
                "/login",
                None,
                json!({ "username": username, "password": password, "role": role }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        response.json::<LoginResponse>().await.unwrap().token
    }
}

async fn spawn_app() -> TestApp {
    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let config = AppConfig::default();
    repository::seed_admins(repo.as_ref(), &config).await;

    let router = create_router(AppState::new(repo, config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.get("/health", None).await;
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_routes_are_also_served_under_api_prefix() {
    let app = spawn_app().await;
    assert!(app.get("/api/health", None).await.status().is_success());

    let response = app
        .post(
            "/api/register",
            None,
            json!({ "username": "rita", "password": "pw", "role": "Renter" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let envelope: UserEnvelope = response.json().await.unwrap();
    assert_eq!(envelope.user.username, "rita");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let response = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value = response.json().await.unwrap();
    assert!(doc["paths"]["/bookings"].is_object());
}

#[tokio::test]
async fn test_protected_routes_require_a_session() {
    let app = spawn_app().await;

    let response = app.get("/bookings", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Unauthorized" }));

    let response = app
        .post("/listings", Some("not-a-token"), json!({ "location": "Dock A" }))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // the public listing index shares the path but stays open
    assert_eq!(app.get("/listings", None).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_error_bodies() {
    let app = spawn_app().await;

    let response = app.post("/register", None, json!({ "username": "rita" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Missing fields");

    let response = app
        .post(
            "/login",
            None,
            json!({ "username": "nobody", "password": "pw", "role": "Renter" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = spawn_app().await;

    let mistyped = app
        .post(
            "/register",
            None,
            json!({ "username": "a", "password": 1, "role": "Renter" }),
        )
        .await;
    let not_json = app
        .client
        .post(app.url("/register"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .expect("request failed");
    let bad_id = app.get("/listings/abc/quote", None).await;

    for response in [mistyped, not_json, bad_id] {
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            response.headers()["content-type"]
                .to_str()
                .unwrap()
                .starts_with("application/json")
        );
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }
}

#[tokio::test]
async fn test_booking_lifecycle() {
    let app = spawn_app().await;
    let owner = app.sign_up("olga", "Owner").await;
    let renter = app.sign_up("rita", "Renter").await;
    let rival = app.sign_up("ravi", "Renter").await;

    // Owner lists a spot, the dashboard sends availability as a checkbox
    let response = app
        .post(
            "/listings",
            Some(owner.as_str()),
            json!({
                "location": "Dock A",
                "price_hourly": 2.0,
                "price_daily": 20.0,
                "price_monthly": 300.0,
                "availability": true
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listing = response.json::<ListingEnvelope>().await.unwrap().listing;
    assert_eq!(listing.availability, "Available");

    // Quote before booking
    let quote: Value = app
        .get(
            &format!(
                "/listings/{}/quote?start_time=2025-03-01T08:00&end_time=2025-03-02T14:00",
                listing.id
            ),
            None,
        )
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(quote["hours"], 30);
    assert_eq!(quote["price"], 32.0);

    // Renter books
    let booking_body = json!({
        "listing_id": listing.id,
        "start_time": "2025-03-01T08:00",
        "end_time": "2025-03-02T14:00"
    });
    let response = app.post("/bookings", Some(renter.as_str()), booking_body.clone()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let booking: Value = response.json().await.unwrap();
    assert_eq!(booking["booking"]["status"], "confirmed");
    assert_eq!(booking["booking"]["duration_type"], "optimal");
    assert_eq!(booking["booking"]["total_price"], 32.0);
    let booking_id = booking["booking"]["id"].as_i64().unwrap();

    // A second renter cannot take the same span
    let response = app.post("/bookings", Some(rival.as_str()), booking_body.clone()).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not available");

    // The owner sees it on their dashboard, with the location joined in
    let owner_view: BookingsEnvelope = app
        .get("/bookings", Some(owner.as_str()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(owner_view.bookings.len(), 1);
    assert_eq!(owner_view.bookings[0].location.as_deref(), Some("Dock A"));

    // Cancellation frees the span
    let response = app
        .delete(&format!("/bookings/{booking_id}"), &renter)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post("/bookings", Some(rival.as_str()), booking_body).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_owner_listing_filter_and_logout() {
    let app = spawn_app().await;
    let owner = app.sign_up("olga", "Owner").await;
    app.post("/listings", Some(owner.as_str()), json!({ "location": "Dock A" }))
        .await;

    let response = app.get("/listings?owner=true", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let mine: Value = app
        .get("/listings?owner=true", Some(owner.as_str()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(mine["listings"].as_array().unwrap().len(), 1);

    let response = app.post("/logout", Some(owner.as_str()), json!({})).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        app.get("/me", Some(owner.as_str())).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn test_admin_dashboard() {
    let app = spawn_app().await;
    let renter = app.sign_up("rita", "Renter").await;
    let admin = app.sign_in("Sir", "12345", "Admin").await;

    let response = app.get("/users", Some(renter.as_str())).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Forbidden");

    let users: Value = app.get("/users", Some(admin.as_str())).await.json().await.unwrap();
    assert_eq!(users["users"].as_array().unwrap().len(), 6);

    let stats: Value = app
        .get("/api/admin/stats", Some(admin.as_str()))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_users"], 6);
    assert_eq!(stats["total_bookings"], 0);

    let response = app
        .post(
            "/register",
            None,
            json!({ "username": "eve", "password": "pw", "role": "Admin" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
