//! Router tests over the in-memory backend and a mocked identity provider.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use jobboard_api::{create_router, ApiConfig, AppState};
use jobboard_client::{ListingBackend, MemoryBackend};
use jobboard_supabase::{AuthClient, SupabaseClient, SupabaseConfig};

struct TestApp {
    router: Router,
    backend: Arc<MemoryBackend>,
    server: MockServer,
}

async fn mock_user(server: &MockServer, token: &str, id: &str, email: &str) {
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", format!("Bearer {}", token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "email": email })))
        .mount(server)
        .await;
}

async fn test_app() -> TestApp {
    let server = MockServer::start().await;
    mock_user(&server, "token-ada", "ada", "ada@example.com").await;
    mock_user(&server, "token-bob", "bob", "bob@example.com").await;

    let client = SupabaseClient::new(SupabaseConfig::new(server.uri(), "anon-key").unwrap()).unwrap();
    let backend = Arc::new(MemoryBackend::new());
    let state = AppState::with_backend(
        ApiConfig::default(),
        Arc::clone(&backend) as Arc<dyn ListingBackend>,
        AuthClient::new(client),
    );

    TestApp {
        router: create_router(state, None),
        backend,
        server,
    }
}

impl TestApp {
    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        self.send_raw(method, uri, token, body.map(|b| b.to_string())).await
    }

    /// Like `send`, with the body passed through unparsed.
    async fn send_raw(&self, method: Method, uri: &str, token: Option<&str>, body: Option<String>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }
}

fn draft_body(title: &str, status: &str) -> Value {
    json!({
        "title": title,
        "companyName": "Northwind",
        "location": "Berlin",
        "jobType": "Full-Time",
        "jobStatus": status,
        "overview": "Build things",
        "responsibilities": ["Write code", "Review code"],
        "tags": ["rust", "backend"]
    })
}

fn slugs(page: &Value) -> Vec<String> {
    page["listings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["slug"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_sets_security_and_request_id_headers() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_listing_lifecycle_over_http() {
    let app = test_app().await;

    let (status, created) = app
        .send(Method::POST, "/api/me/jobs", Some("token-ada"), Some(draft_body("Rust Engineer", "draft")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let slug = created["slug"].as_str().unwrap().to_string();
    assert!(slug.starts_with("rust-engineer-"));
    assert_eq!(created["posterId"], "ada");
    assert_eq!(created["publishedAt"], Value::Null);
    assert_eq!(created["responsibilities"], json!(["Write code", "Review code"]));

    // Drafts are only visible to their owner
    let (_, public) = app.get("/api/jobs", None).await;
    assert_eq!(public["total"], 0);
    let (_, mine) = app.get("/api/me/jobs", Some("token-ada")).await;
    assert_eq!(slugs(&mine), vec![slug.clone()]);
    let (status, _) = app.get(&format!("/api/jobs/{}", slug), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/me/jobs/{}", slug),
            Some("token-ada"),
            Some(draft_body("Senior Rust Engineer", "published")),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["slug"], slug.as_str());
    assert_eq!(updated["title"], "Senior Rust Engineer");
    assert!(updated["publishedAt"].is_string());

    let (status, detail) = app.get(&format!("/api/jobs/{}", slug), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["title"], "Senior Rust Engineer");
    let (_, public) = app.get("/api/jobs", None).await;
    assert_eq!(slugs(&public), vec![slug.clone()]);
    let (_, all_slugs) = app.get("/api/jobs/slugs", None).await;
    assert_eq!(all_slugs, json!([slug.clone()]));

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/me/jobs/{}", slug), Some("token-ada"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("confirm=true"));
    assert_eq!(app.backend.len().await, 1);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/me/jobs/{}?confirm=true", slug),
            Some("token-ada"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&format!("/api/jobs/{}", slug), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, mine) = app.get("/api/me/jobs", Some("token-ada")).await;
    assert_eq!(mine["total"], 0);
}

#[tokio::test]
async fn test_owner_routes_require_valid_token() {
    let app = test_app().await;

    let (status, body) = app.get("/api/me/jobs", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized: Missing Authorization header");

    let (status, body) = app.get("/api/me/jobs", Some("forged")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized: Invalid or expired access token");

    let (status, _) = app.get("/api/jobs?mine=true", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_other_posters_cannot_modify_listing() {
    let app = test_app().await;
    let (_, created) = app
        .send(Method::POST, "/api/me/jobs", Some("token-ada"), Some(draft_body("Designer", "published")))
        .await;
    let slug = created["slug"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/me/jobs/{}", slug),
            Some("token-bob"),
            Some(draft_body("Hijacked", "published")),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"].as_str().unwrap().contains("permission"));

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/me/jobs/{}?confirm=true", slug),
            Some("token-bob"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&format!("/api/me/jobs/{}", slug), Some("token-bob")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, detail) = app.get(&format!("/api/jobs/{}", slug), None).await;
    assert_eq!(detail["title"], "Designer");
}

#[tokio::test]
async fn test_invalid_draft_is_rejected_before_backend() {
    let app = test_app().await;
    let before = app.backend.request_count();

    let mut body = draft_body("", "draft");
    body["applicationEmail"] = json!("not-an-email");
    let (status, response) = app.send(Method::POST, "/api/me/jobs", Some("token-ada"), Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors: Vec<&str> = response["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert!(errors.contains(&"Title is required"));
    assert!(errors.contains(&"Application email must be a valid email address"));
    assert_eq!(app.backend.request_count(), before);
}

#[tokio::test]
async fn test_filters_and_mine_view() {
    let app = test_app().await;
    for (token, title, location) in [
        ("token-ada", "Backend", "Berlin"),
        ("token-bob", "Frontend", "Remote"),
    ] {
        let mut body = draft_body(title, "published");
        body["location"] = json!(location);
        let (status, _) = app.send(Method::POST, "/api/me/jobs", Some(token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, options) = app.get("/api/jobs/filters", None).await;
    assert_eq!(options["locations"], json!(["Berlin", "Remote"]));
    assert_eq!(options["jobTypes"], json!(["Full-Time"]));

    let (_, remote) = app.get("/api/jobs?location=Remote&job_type=all", None).await;
    assert_eq!(remote["total"], 1);
    assert_eq!(remote["listings"][0]["title"], "Frontend");

    let (_, mine) = app.get("/api/jobs?mine=true", Some("token-ada")).await;
    assert_eq!(mine["total"], 1);
    assert_eq!(mine["listings"][0]["title"], "Backend");

    let (_, mine_filters) = app.get("/api/jobs/filters?mine=true", Some("token-bob")).await;
    assert_eq!(mine_filters["locations"], json!(["Remote"]));

    let (status, _) = app.get("/api/jobs?job_type=Gig", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = test_app().await;

    let (status, body) = app.get("/api/jobs?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .starts_with("Bad request: Failed to deserialize query string"));

    let (status, body) = app
        .send_raw(Method::POST, "/api/me/jobs", Some("token-ada"), Some("{not json".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Failed to parse the request body as JSON"));

    let (status, body) = app
        .send(Method::POST, "/api/me/jobs", Some("token-ada"), Some(json!({ "title": 5 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("Failed to deserialize the JSON body"));

    let (status, body) = app
        .send(Method::DELETE, "/api/me/jobs/anything?confirm=maybe", Some("token-ada"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());

    assert_eq!(app.backend.request_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_maps_to_bad_gateway() {
    let app = test_app().await;
    app.backend.set_failing(true);

    let (status, body) = app.get("/api/jobs", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Supabase request failed (503 Service Unavailable)"));
}

#[tokio::test]
async fn test_sign_in_proxies_identity_provider() {
    let app = test_app().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-ada",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "refresh",
            "user": { "id": "ada", "email": "ada@example.com" }
        })))
        .up_to_n_times(1)
        .mount(&app.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&app.server)
        .await;

    let credentials = json!({ "email": "ada@example.com", "password": "hunter22" });
    let (status, session) = app.send(Method::POST, "/auth/sign-in", None, Some(credentials.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["access_token"], "token-ada");

    let (status, body) = app.get("/auth/session", Some("token-ada")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "ada@example.com");

    let (status, body) = app.send(Method::POST, "/auth/sign-in", None, Some(credentials)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Unauthorized: Invalid login credentials");

    let (status, body) = app
        .send(Method::POST, "/auth/sign-in", None, Some(json!({ "email": "ada.example.com", "password": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"],
        json!(["A valid email address is required", "Password is required"])
    );
}

#[tokio::test]
async fn test_sign_up_pending_confirmation_is_accepted() {
    let app = test_app().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "new-user",
            "email": "new@example.com"
        })))
        .mount(&app.server)
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/sign-up",
            None,
            Some(json!({ "email": "new@example.com", "password": "secret-pass", "data": { "name": "New" } })),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "confirmation_required");
    assert_eq!(body["user"]["id"], "new-user");
}
