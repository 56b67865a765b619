//! End-to-end tests of the HTTP API against an in-memory database.

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use chrono::{Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use serde_json::{json, Value};

use shopfront::api::{build_router, AppState};
use shopfront::db::{create_test_pool, migrations};
use shopfront::services::token::{TokenClaims, TokenCodec};

const ADMIN_EMAIL: &str = "admin@shop.test";
const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    server: TestServer,
    state: AppState,
}

async fn setup() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    migrations::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState::new(pool, TokenCodec::new("api-test-secret", Duration::days(7)));
    state
        .user_service
        .ensure_admin("Admin", ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to create admin");

    let app = build_router(state.clone(), "*").expect("Failed to build router");
    let server = TestServer::new(app).expect("Failed to start test server");
    TestApp { server, state }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl TestApp {
    async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/api/auth/register")
            .json(&json!({ "name": name, "email": email, "password": password }))
            .await
    }

    async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.server
            .post("/api/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await
    }

    async fn admin_token(&self) -> String {
        let response = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn shopper_token(&self) -> String {
        let response = self.register("Shopper", "shopper@shop.test", "pw123456").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        response.json::<Value>()["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn create_product(&self, token: &str, body: Value) -> TestResponse {
        self.server
            .post("/api/products")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&body)
            .await
    }

    fn expired_token(&self, is_admin: bool) -> String {
        self.state
            .user_service
            .tokens()
            .encode(&TokenClaims {
                user_id: 1,
                email: ADMIN_EMAIL.to_string(),
                is_admin,
                exp: Utc::now().timestamp_millis() - 1_000,
            })
            .unwrap()
    }
}

fn product_body(name: &str, price: f64, category: &str) -> Value {
    json!({
        "name": name,
        "description": format!("{} description", name),
        "price": price,
        "image": format!("https://img.shop.test/{}.jpg", name),
        "category": category,
        "countInStock": 10,
    })
}

fn error_message(response: &TestResponse) -> String {
    response.json::<Value>()["error"]["message"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn register_returns_token_and_user() {
    let app = setup().await;

    let response = app.register("Ada", "Ada@Shop.test", "pw123456").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert!(body["token"].as_str().unwrap().contains('.'));
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["email"], "ada@shop.test");
    assert_eq!(body["user"]["isAdmin"], false);
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_same_email_twice_is_rejected() {
    let app = setup().await;

    let first = app.register("Ada", "ada@shop.test", "pw123456").await;
    assert_eq!(first.status_code(), StatusCode::OK);

    let second = app.register("Ada Again", "ADA@shop.test", "other").await;
    assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&second), "User with this email already exists");
}

#[tokio::test]
async fn register_missing_fields_is_rejected() {
    let app = setup().await;

    let response = app
        .server
        .post("/api/auth/register")
        .json(&json!({ "email": "ada@shop.test" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let bad_email = app.register("Ada", "not-an-email", "pw").await;
    assert_eq!(bad_email.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_wrong_password_and_unknown_email_look_the_same() {
    let app = setup().await;
    app.register("Ada", "ada@shop.test", "pw123456").await;

    let wrong_password = app.login("ada@shop.test", "nope").await;
    let unknown_email = app.login("ghost@shop.test", "pw123456").await;

    assert_eq!(wrong_password.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&wrong_password), "Invalid email or password");
    assert_eq!(error_message(&wrong_password), error_message(&unknown_email));
}

#[tokio::test]
async fn login_missing_fields_is_bad_request() {
    let app = setup().await;
    let response = app
        .server
        .post("/api/auth/login")
        .json(&json!({ "email": "ada@shop.test" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_requires_valid_token() {
    let app = setup().await;

    let missing = app.server.get("/api/auth/profile").await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&missing), "No token provided");

    let garbage = app
        .server
        .get("/api/auth/profile")
        .add_header(header::AUTHORIZATION, bearer("garbage"))
        .await;
    assert_eq!(garbage.status_code(), StatusCode::UNAUTHORIZED);

    let expired = app
        .server
        .get("/api/auth/profile")
        .add_header(header::AUTHORIZATION, bearer(&app.expired_token(false)))
        .await;
    assert_eq!(expired.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&expired), "Token expired");
}

#[tokio::test]
async fn profile_returns_current_user() {
    let app = setup().await;
    let token = app.shopper_token().await;

    let response = app
        .server
        .get("/api/auth/profile")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body = response.json::<Value>();
    assert_eq!(body["name"], "Shopper");
    assert_eq!(body["email"], "shopper@shop.test");
    assert_eq!(body["isAdmin"], false);
    assert!(body["id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn profile_of_deleted_user_is_not_found() {
    let app = setup().await;
    let token = app.shopper_token().await;

    app.state
        .pool
        .execute("DELETE FROM users WHERE email = 'shopper@shop.test'")
        .await
        .unwrap();

    let response = app
        .server
        .get("/api/auth/profile")
        .add_header(header::AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Admin gating
// ============================================================================

#[tokio::test]
async fn crafted_admin_token_is_rejected() {
    let app = setup().await;

    let claims = json!({
        "userId": 1,
        "email": ADMIN_EMAIL,
        "isAdmin": true,
        "exp": Utc::now().timestamp_millis() + 3_600_000,
    });
    let payload = BASE64URL_NOPAD.encode(claims.to_string().as_bytes());
    let header = |alg: &str| {
        BASE64URL_NOPAD.encode(json!({ "alg": alg, "typ": "JWT" }).to_string().as_bytes())
    };
    let alg_none = format!("{}.{}.", header("none"), payload);
    let fake_signature = format!(
        "{}.{}.{}",
        header("HS256"),
        payload,
        BASE64URL_NOPAD.encode(&[0u8; 32])
    );

    for token in [payload, alg_none, fake_signature] {
        let response = app
            .create_product(&token, product_body("Forged", 1.0, "Home"))
            .await;
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }

    let listed = app.server.get("/api/products").await.json::<Vec<Value>>();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn token_from_another_secret_is_rejected() {
    let app = setup().await;
    let other = TokenCodec::new("someone-elses-secret", Duration::days(7))
        .encode(&TokenClaims {
            user_id: 1,
            email: ADMIN_EMAIL.to_string(),
            is_admin: true,
            exp: Utc::now().timestamp_millis() + 3_600_000,
        })
        .unwrap();

    let response = app
        .create_product(&other, product_body("Forged", 1.0, "Home"))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_admin_token_is_rejected_everywhere() {
    let app = setup().await;
    let admin = app.admin_token().await;
    let created = app
        .create_product(&admin, product_body("Lamp", 20.0, "Home"))
        .await
        .json::<Value>();
    let path = format!("/api/products/{}", created["id"]);

    let expired = bearer(&app.expired_token(true));
    let responses = [
        app.server
            .post("/api/products")
            .add_header(header::AUTHORIZATION, expired.clone())
            .json(&product_body("Other", 1.0, "Home"))
            .await,
        app.server
            .put(&path)
            .add_header(header::AUTHORIZATION, expired.clone())
            .json(&json!({ "price": 1.0 }))
            .await,
        app.server
            .delete(&path)
            .add_header(header::AUTHORIZATION, expired.clone())
            .await,
        app.server
            .get("/api/auth/profile")
            .add_header(header::AUTHORIZATION, expired.clone())
            .await,
    ];
    for response in responses {
        assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn non_admin_token_is_forbidden() {
    let app = setup().await;
    let token = app.shopper_token().await;

    let response = app
        .create_product(&token, product_body("Lamp", 20.0, "Home"))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(
        error_message(&response),
        "Not authorized - Admin access required"
    );
}

#[tokio::test]
async fn missing_token_on_admin_route_is_unauthorized() {
    let app = setup().await;
    let response = app.server.delete("/api/products/1").await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn admin_creates_and_reads_product() {
    let app = setup().await;
    let admin = app.admin_token().await;

    let response = app
        .create_product(&admin, product_body("Desk Lamp", 25.5, "home"))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);

    let created = response.json::<Value>();
    assert_eq!(created["name"], "Desk Lamp");
    assert_eq!(created["category"], "Home");
    assert_eq!(created["count_in_stock"], 10);
    assert_eq!(created["price"], 25.5);
    assert!(created["created_at"].is_string());

    let fetched = app
        .server
        .get(&format!("/api/products/{}", created["id"]))
        .await;
    assert_eq!(fetched.status_code(), StatusCode::OK);
    assert_eq!(fetched.json::<Value>(), created);
}

#[tokio::test]
async fn create_product_validation() {
    let app = setup().await;
    let admin = app.admin_token().await;

    let missing_price = json!({
        "name": "Lamp",
        "description": "d",
        "image": "i",
        "category": "Home",
    });
    let response = app.create_product(&admin, missing_price).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "Please provide all required fields");

    let bad_category = app
        .create_product(&admin, product_body("Lamp", 1.0, "Toys"))
        .await;
    assert_eq!(bad_category.status_code(), StatusCode::BAD_REQUEST);

    let negative = app
        .create_product(&admin, product_body("Lamp", -5.0, "Home"))
        .await;
    assert_eq!(negative.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_missing_product_is_not_found() {
    let app = setup().await;
    let response = app.server.get("/api/products/9999").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(&response), "Product not found");
}

#[tokio::test]
async fn update_with_empty_body_is_bad_request() {
    let app = setup().await;
    let admin = app.admin_token().await;
    let created = app
        .create_product(&admin, product_body("Lamp", 20.0, "Home"))
        .await
        .json::<Value>();

    let response = app
        .server
        .put(&format!("/api/products/{}", created["id"]))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response), "No fields to update");
}

#[tokio::test]
async fn update_price_changes_only_price() {
    let app = setup().await;
    let admin = app.admin_token().await;
    let created = app
        .create_product(&admin, product_body("Lamp", 20.0, "Home"))
        .await
        .json::<Value>();

    let response = app
        .server
        .put(&format!("/api/products/{}", created["id"]))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "price": 9.99 }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let updated = response.json::<Value>();
    assert_eq!(updated["price"], 9.99);
    for field in ["id", "name", "description", "image", "category", "count_in_stock", "created_at"] {
        assert_eq!(updated[field], created[field], "field {} changed", field);
    }
}

#[tokio::test]
async fn update_missing_product_is_not_found() {
    let app = setup().await;
    let admin = app.admin_token().await;

    let response = app
        .server
        .put("/api/products/9999")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Ghost" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mistyped_product_body_is_a_json_bad_request() {
    let app = setup().await;
    let admin = app.admin_token().await;
    let created = app
        .create_product(&admin, product_body("Lamp", 20.0, "Home"))
        .await
        .json::<Value>();

    let mut string_price = product_body("Desk", 1.0, "Home");
    string_price["price"] = json!("12.5");
    let create = app.create_product(&admin, string_price).await;
    assert_eq!(create.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(create.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let update = app
        .server
        .put(&format!("/api/products/{}", created["id"]))
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "price": "abc" }))
        .await;
    assert_eq!(update.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(update.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let not_json = app
        .server
        .post("/api/auth/login")
        .text("email=a&password=b")
        .await;
    assert_eq!(not_json.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(not_json.json::<Value>()["error"]["code"], "VALIDATION_ERROR");

    let unchanged = app
        .server
        .get(&format!("/api/products/{}", created["id"]))
        .await
        .json::<Value>();
    assert_eq!(unchanged["price"], 20.0);
}

#[tokio::test]
async fn non_numeric_product_id_is_not_found() {
    let app = setup().await;
    let admin = app.admin_token().await;

    let get = app.server.get("/api/products/abc").await;
    assert_eq!(get.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(&get), "Product not found");

    let update = app
        .server
        .put("/api/products/abc")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .json(&json!({ "name": "Ghost" }))
        .await;
    assert_eq!(update.status_code(), StatusCode::NOT_FOUND);

    let delete = app
        .server
        .delete("/api/products/abc")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(delete.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(delete.json::<Value>()["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn delete_product_then_again() {
    let app = setup().await;
    let admin = app.admin_token().await;
    let created = app
        .create_product(&admin, product_body("Lamp", 20.0, "Home"))
        .await
        .json::<Value>();
    let path = format!("/api/products/{}", created["id"]);

    let first = app
        .server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(
        first.json::<Value>(),
        json!({ "message": "Product deleted successfully" })
    );

    let second = app
        .server
        .delete(&path)
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(second.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_nonexistent_product_is_not_found() {
    let app = setup().await;
    let admin = app.admin_token().await;

    let response = app
        .server
        .delete("/api/products/424242")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

async fn seed_catalog(app: &TestApp) -> Vec<Value> {
    let admin = app.admin_token().await;
    let mut created = Vec::new();
    for (name, price, category) in [
        ("Desk Lamp", 25.0, "Home"),
        ("Headphones", 99.5, "Electronics"),
        ("Yoga Mat", 19.99, "Fitness"),
        ("Floor Lamp", 60.0, "Home"),
        ("Watch Strap", 19.99, "Accessories"),
    ] {
        let response = app
            .create_product(&admin, product_body(name, price, category))
            .await;
        assert_eq!(response.status_code(), StatusCode::CREATED);
        created.push(response.json::<Value>());
    }
    created
}

fn prices(products: &[Value]) -> Vec<f64> {
    products.iter().map(|p| p["price"].as_f64().unwrap()).collect()
}

#[tokio::test]
async fn list_sorted_by_price() {
    let app = setup().await;
    seed_catalog(&app).await;

    let asc = app
        .server
        .get("/api/products")
        .add_query_param("sort", "price-asc")
        .await
        .json::<Vec<Value>>();
    assert_eq!(asc.len(), 5);
    assert!(prices(&asc).windows(2).all(|w| w[0] <= w[1]));

    let desc = app
        .server
        .get("/api/products")
        .add_query_param("sort", "price-desc")
        .await
        .json::<Vec<Value>>();
    assert!(prices(&desc).windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn list_default_is_newest_first() {
    let app = setup().await;
    let created = seed_catalog(&app).await;

    let listed = app.server.get("/api/products").await.json::<Vec<Value>>();
    let listed_ids: Vec<&Value> = listed.iter().map(|p| &p["id"]).collect();
    let newest_first: Vec<&Value> = created.iter().rev().map(|p| &p["id"]).collect();
    assert_eq!(listed_ids, newest_first);
}

#[tokio::test]
async fn list_filters_by_search_and_category() {
    let app = setup().await;
    seed_catalog(&app).await;

    let lamps = app
        .server
        .get("/api/products")
        .add_query_param("search", "lamp")
        .add_query_param("sort", "price-asc")
        .await
        .json::<Vec<Value>>();
    let names: Vec<&str> = lamps.iter().map(|p| p["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Desk Lamp", "Floor Lamp"]);

    let home = app
        .server
        .get("/api/products")
        .add_query_param("category", "Home")
        .await
        .json::<Vec<Value>>();
    assert_eq!(home.len(), 2);
    assert!(home.iter().all(|p| p["category"] == "Home"));

    let all = app
        .server
        .get("/api/products")
        .add_query_param("category", "all")
        .await
        .json::<Vec<Value>>();
    assert_eq!(all.len(), 5);

    let none = app
        .server
        .get("/api/products")
        .add_query_param("search", "%")
        .await
        .json::<Vec<Value>>();
    assert!(none.is_empty());
}

#[tokio::test]
async fn search_ignores_case_beyond_ascii() {
    let app = setup().await;
    let admin = app.admin_token().await;
    app.create_product(&admin, product_body("Écran Plat", 199.0, "Electronics"))
        .await;

    for search in ["écran", "ÉCRAN", "Écran"] {
        let found = app
            .server
            .get("/api/products")
            .add_query_param("search", search)
            .await
            .json::<Vec<Value>>();
        assert_eq!(found.len(), 1, "search {:?}", search);
        assert_eq!(found[0]["name"], "Écran Plat");
    }
}

#[tokio::test]
async fn categories_endpoint_lists_known_set() {
    let app = setup().await;
    let categories = app
        .server
        .get("/api/products/categories")
        .await
        .json::<Vec<String>>();
    assert_eq!(
        categories,
        vec!["Electronics", "Fashion", "Home", "Fitness", "Accessories"]
    );
}

#[tokio::test]
async fn health_reports_database() {
    let app = setup().await;
    let response = app.server.get("/api/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>()["status"], "ok");
}
