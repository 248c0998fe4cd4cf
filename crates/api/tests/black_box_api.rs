use std::net::SocketAddr;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use depot_api::{app::build_app, bootstrap, config::ApiConfig};
use depot_auth::{JwtClaims, Role};
use depot_core::UserId;
use depot_infra::{Store, StoreConfig};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
    client: reqwest::Client,
    _dir: tempfile::TempDir,
}

impl TestServer {
    async fn spawn() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store_config = StoreConfig::with_path(dir.path().join("depot.sqlite3"));
        let config = ApiConfig {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: Some(JWT_SECRET.to_string()),
            admin_user: "admin".to_string(),
            admin_password: Some(ADMIN_PASSWORD.to_string()),
            op_timeout: Duration::from_secs(10),
            store: store_config.clone(),
        };

        // Same router as prod, bound to an ephemeral port.
        let store = Store::open(&store_config).await.expect("failed to open store");
        let services = bootstrap::prepare(store, &config)
            .await
            .expect("failed to bootstrap");
        let app = build_app(services);

        let listener = tokio::net::TcpListener::bind(config.addr)
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
                .await
                .unwrap();
        });

        Self {
            base_url,
            handle,
            client: reqwest::Client::new(),
            _dir: dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login as {username}");
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login("admin", ADMIN_PASSWORD).await
    }

    /// Create an account through the admin API and log in as it.
    async fn user_token(&self, admin: &str, username: &str, role: &str) -> String {
        let res = self
            .client
            .post(self.url("/api/users"))
            .bearer_auth(admin)
            .json(&json!({ "username": username, "password": "secret-pass", "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        self.login(username, "secret-pass").await
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// POST and return the created resource's id.
    async fn create(&self, token: &str, path: &str, body: Value) -> i64 {
        let res = self.post(token, path, body).await;
        assert_eq!(res.status(), StatusCode::CREATED, "POST {path}");
        let created: Value = res.json().await.unwrap();
        created["id"].as_i64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, user_id: i64, username: &str, role: Role) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        user_id: UserId::new(user_id),
        username: username.to_string(),
        role,
        jti: "minted-token".to_string(),
        iat: now.timestamp(),
        exp: (now + ChronoDuration::minutes(10)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn assert_error(res: reqwest::Response, status: StatusCode, code: &str) {
    assert_eq!(res.status(), status);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], code, "body: {body}");
    assert!(body["message"].is_string(), "body: {body}");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/api/whoami")).send().await.unwrap();
    assert_error(res, StatusCode::UNAUTHORIZED, "unauthorized").await;

    let res = srv
        .client
        .get(srv.url("/api/items"))
        .header("Authorization", "Basic abc")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv.get(&token, "/api/whoami").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["username"], "admin");
    assert_eq!(body["role"], "admin");
    assert!(body["user_id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn bad_credentials_and_foreign_tokens_are_rejected() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "username": "admin", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_error(res, StatusCode::UNAUTHORIZED, "unauthorized").await;

    let res = srv
        .client
        .post(srv.url("/api/auth/login"))
        .json(&json!({ "username": "", "password": "" }))
        .send()
        .await
        .unwrap();
    assert_error(res, StatusCode::BAD_REQUEST, "validation_error").await;

    let token = srv.admin_token().await;
    let body: Value = srv.get(&token, "/api/whoami").await.json().await.unwrap();
    let admin_id = body["user_id"].as_i64().unwrap();

    let forged = mint_jwt("some-other-secret", admin_id, "admin", Role::Admin);
    assert_eq!(srv.get(&forged, "/api/whoami").await.status(), StatusCode::UNAUTHORIZED);

    // A well-signed token is accepted, but only for a user that exists.
    let minted = mint_jwt(JWT_SECRET, admin_id, "admin", Role::Admin);
    assert_eq!(srv.get(&minted, "/api/whoami").await.status(), StatusCode::OK);
    let ghost = mint_jwt(JWT_SECRET, 9_999, "ghost", Role::Admin);
    assert_eq!(srv.get(&ghost, "/api/whoami").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv.post(&token, "/api/auth/logout", json!({})).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get(&token, "/api/whoami").await;
    assert_error(res, StatusCode::UNAUTHORIZED, "unauthorized").await;

    // A fresh login still works.
    let token = srv.admin_token().await;
    assert_eq!(srv.get(&token, "/api/whoami").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn roles_gate_mutations() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let clerk = srv.user_token(&admin, "clerk", "user").await;
    let boss = srv.user_token(&admin, "boss", "manager").await;

    // Plain users read but cannot manage owners, items or stock.
    assert_eq!(srv.get(&clerk, "/api/owners").await.status(), StatusCode::OK);
    let res = srv
        .post(&clerk, "/api/owners", json!({ "name": "Shelf", "type": "location" }))
        .await;
    assert_error(res, StatusCode::FORBIDDEN, "forbidden").await;
    let res = srv.post(&clerk, "/api/items", json!({ "name": "Drill" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Managers manage the catalogue but not accounts.
    let shelf = srv
        .create(&boss, "/api/owners", json!({ "name": "Shelf", "type": "location" }))
        .await;
    let drill = srv.create(&boss, "/api/items", json!({ "name": "Drill" })).await;
    assert_eq!(srv.get(&boss, "/api/users").await.status(), StatusCode::FORBIDDEN);

    let res = srv
        .post(&clerk, "/api/inventory/stock", json!({ "item_id": drill, "owner_id": shelf, "quantity": 1 }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Any role may move stock.
    let bench = srv
        .create(&boss, "/api/owners", json!({ "name": "Bench", "type": "location" }))
        .await;
    let res = srv
        .post(&boss, "/api/inventory/stock", json!({ "item_id": drill, "owner_id": shelf, "quantity": 2 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let res = srv
        .post(
            &clerk,
            "/api/transfers",
            json!({ "item_id": drill, "from_owner_id": shelf, "to_owner_id": bench, "quantity": 1 }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn demoted_user_loses_access_immediately() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let boss = srv.user_token(&admin, "boss", "manager").await;

    let body: Value = srv.get(&boss, "/api/whoami").await.json().await.unwrap();
    let boss_id = body["user_id"].as_i64().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/api/users/{boss_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "user" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The token still says manager; the live role wins.
    let res = srv.post(&boss, "/api/items", json!({ "name": "Drill" })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv.delete(&admin, &format!("/api/users/{boss_id}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.get(&boss, "/api/whoami").await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn sole_admin_cannot_demote_themself() {
    let srv = TestServer::spawn().await;
    let admin = srv.admin_token().await;
    let body: Value = srv.get(&admin, "/api/whoami").await.json().await.unwrap();
    let admin_id = body["user_id"].as_i64().unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/api/users/{admin_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "manager" }))
        .send()
        .await
        .unwrap();
    assert_error(res, StatusCode::CONFLICT, "conflict").await;

    let body: Value = srv.get(&admin, "/api/whoami").await.json().await.unwrap();
    assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn stock_lifecycle_add_transfer_adjust_delete() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let warehouse = srv
        .create(&token, "/api/owners", json!({ "name": "Warehouse", "type": "location" }))
        .await;
    let alice = srv
        .create(&token, "/api/owners", json!({ "name": "Alice", "type": "person" }))
        .await;
    let laptop = srv
        .create(&token, "/api/items", json!({ "name": "Laptop", "description": "14 inch" }))
        .await;

    // Stock appears at locations only.
    let res = srv
        .post(&token, "/api/inventory/stock", json!({ "item_id": laptop, "owner_id": warehouse, "quantity": 10 }))
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let level: Value = res.json().await.unwrap();
    assert_eq!(level["quantity"], 10);
    let res = srv
        .post(&token, "/api/inventory/stock", json!({ "item_id": laptop, "owner_id": alice, "quantity": 1 }))
        .await;
    assert_error(res, StatusCode::UNPROCESSABLE_ENTITY, "owner_variant_mismatch").await;

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": laptop, "from_owner_id": warehouse, "to_owner_id": alice, "quantity": 4, "notes": "onboarding" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let transfer: Value = res.json().await.unwrap();
    assert_eq!(transfer["item_name"], "Laptop");
    assert_eq!(transfer["from_owner_name"], "Warehouse");
    assert_eq!(transfer["to_owner_name"], "Alice");
    assert_eq!(transfer["quantity"], 4);
    assert_eq!(transfer["notes"], "onboarding");

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": laptop, "from_owner_id": alice, "to_owner_id": warehouse, "quantity": 5 }),
        )
        .await;
    assert_error(res, StatusCode::UNPROCESSABLE_ENTITY, "insufficient_quantity").await;

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": laptop, "from_owner_id": alice, "to_owner_id": alice, "quantity": 1 }),
        )
        .await;
    assert_error(res, StatusCode::BAD_REQUEST, "self_transfer").await;

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": laptop, "from_owner_id": warehouse, "to_owner_id": alice, "quantity": 0 }),
        )
        .await;
    assert_error(res, StatusCode::BAD_REQUEST, "invalid_quantity").await;

    // Item detail shows the distribution; the total is conserved.
    let details: Value = srv.get(&token, &format!("/api/items/{laptop}")).await.json().await.unwrap();
    assert_eq!(details["item"]["name"], "Laptop");
    let distribution = details["distribution"].as_array().unwrap();
    let total: i64 = distribution.iter().map(|h| h["quantity"].as_i64().unwrap()).sum();
    assert_eq!(total, 10);

    let inventory: Value = srv.get(&token, "/api/inventory").await.json().await.unwrap();
    assert_eq!(inventory.as_array().unwrap().len(), 2);

    let held: Value = srv
        .get(&token, &format!("/api/owners/{alice}/inventory"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(held[0]["quantity"], 4);

    // An owner holding stock cannot be deleted.
    let res = srv.delete(&token, &format!("/api/owners/{alice}")).await;
    assert_error(res, StatusCode::CONFLICT, "owner_has_inventory").await;

    // Adjustments cannot go negative; reaching zero removes the holding.
    let res = srv
        .post(&token, "/api/inventory/adjust", json!({ "item_id": laptop, "owner_id": alice, "delta": -5 }))
        .await;
    assert_error(res, StatusCode::UNPROCESSABLE_ENTITY, "invalid_adjustment").await;
    let res = srv
        .post(
            &token,
            "/api/inventory/adjust",
            json!({ "item_id": laptop, "owner_id": alice, "delta": -4, "notes": "lost" }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::OK);
    let level: Value = res.json().await.unwrap();
    assert!(level["quantity"].is_null());

    let res = srv.delete(&token, &format!("/api/owners/{alice}")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        srv.get(&token, &format!("/api/owners/{alice}")).await.status(),
        StatusCode::NOT_FOUND
    );

    // History survives the owner and only records transfers.
    let history: Value = srv
        .get(&token, &format!("/api/items/{laptop}/history"))
        .await
        .json()
        .await
        .unwrap();
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["to_owner_name"], "Alice");

    let filtered: Value = srv
        .get(&token, &format!("/api/transfers?owner_id={warehouse}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(filtered.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;

    let res = srv.get(&token, "/api/items/abc").await;
    assert_error(res, StatusCode::BAD_REQUEST, "invalid_id").await;

    let res = srv.get(&token, "/api/items/0").await;
    assert_error(res, StatusCode::BAD_REQUEST, "invalid_id").await;

    let res = srv.get(&token, "/api/items/999").await;
    assert_error(res, StatusCode::NOT_FOUND, "not_found").await;

    let res = srv.get(&token, "/api/transfers?item_id=x").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": 1, "from_owner_id": -1, "to_owner_id": 2, "quantity": 1 }),
        )
        .await;
    assert_error(res, StatusCode::BAD_REQUEST, "invalid_id").await;

    let res = srv
        .post(
            &token,
            "/api/transfers",
            json!({ "item_id": 41, "from_owner_id": 42, "to_owner_id": 43, "quantity": 1 }),
        )
        .await;
    assert_error(res, StatusCode::NOT_FOUND, "not_found").await;
}

#[tokio::test]
async fn item_image_upload_and_download() {
    let srv = TestServer::spawn().await;
    let token = srv.admin_token().await;
    let item = srv.create(&token, "/api/items", json!({ "name": "Camera" })).await;

    let png = b"\x89PNG\r\n\x1a\nnot-really-pixels".to_vec();
    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(png.clone()).file_name("camera.png"),
    );
    let res = srv
        .client
        .put(srv.url(&format!("/api/items/{item}/image")))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get(&token, &format!("/api/items/{item}/image")).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "image/png");
    assert_eq!(res.bytes().await.unwrap().as_ref(), png.as_slice());

    // Text is not an image.
    let form = reqwest::multipart::Form::new().part(
        "image",
        reqwest::multipart::Part::bytes(b"hello".to_vec()).file_name("note.txt"),
    );
    let res = srv
        .client
        .put(srv.url(&format!("/api/items/{item}/image")))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
