use serde_json::{json, Value};

mod common;
use common::*;

async fn get_json(env: &TestEnvironment, path: &str) -> (u16, Value) {
    let response = env
        .client
        .get(env.url(path))
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Failed to parse response");
    (status, body)
}

async fn post_json(env: &TestEnvironment, path: &str, body: Value) -> (u16, Value) {
    let response = env
        .client
        .post(env.url(path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Failed to parse response");
    (status, body)
}

async fn delete_json(env: &TestEnvironment, path: &str) -> (u16, Value) {
    let response = env
        .client
        .delete(env.url(path))
        .send()
        .await
        .expect("Failed to send request");
    let status = response.status().as_u16();
    let body = response.json().await.expect("Failed to parse response");
    (status, body)
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let env = TestEnvironment::new().await;

    let (status, body) = get_json(&env, "/health/status").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "storefront-rs");

    let response = env
        .client
        .get(env.url("/metrics"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    let text = response.text().await.expect("Failed to read metrics");
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn test_list_products_with_and_without_category() {
    let env = TestEnvironment::new().await;

    let (status, body) = get_json(&env, "/api/products").await;
    assert_eq!(status, 200);
    let products = body.as_array().expect("Expected product array");
    assert_eq!(products.len(), 4);
    assert_eq!(products[0]["Product_ID"], 1);
    assert_eq!(products[0]["Name"], "Wireless Mouse");
    assert_eq!(products[0]["category_name"], "Electronics");

    let (status, body) = get_json(&env, "/api/products?category=Electronics").await;
    assert_eq!(status, 200);
    let products = body.as_array().expect("Expected product array");
    assert_eq!(products.len(), 2);
    assert!(products
        .iter()
        .all(|p| p["category_name"] == "Electronics"));

    let (status, body) = get_json(&env, "/api/products?category=Garden").await;
    assert_eq!(status, 200);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_get_product_by_id() {
    let env = TestEnvironment::new().await;

    let (status, body) = get_json(&env, "/api/products/3").await;
    assert_eq!(status, 200);
    assert_eq!(body["Name"], "Rust in Action");
    assert_eq!(body["Price"], "39.00");

    let (status, body) = get_json(&env, "/api/products/77").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Product not found: 77");

    let (status, _) = get_json(&env, "/api/products/abc").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_get_cart_creates_empty_cart() {
    let env = TestEnvironment::new().await;
    assert!(!env.cart_repository.has_cart(42));

    let (status, body) = get_json(&env, "/api/cart/42").await;
    assert_eq!(status, 200);
    assert!(body["cartId"].is_number());
    assert_eq!(body["items"], json!([]));
    assert_eq!(body["totalItems"], 0);
    assert!(env.cart_repository.has_cart(42));
}

#[tokio::test]
async fn test_add_item_accumulates_quantity() {
    let env = TestEnvironment::new().await;

    let (status, body) = post_json(
        &env,
        "/api/cart/1/items",
        json!({ "productId": 3, "quantity": 2 }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Cart updated successfully");

    let (status, _) = post_json(
        &env,
        "/api/cart/1/items",
        json!({ "productId": 3, "quantity": 3 }),
    )
    .await;
    assert_eq!(status, 200);

    let (status, cart) = get_json(&env, "/api/cart/1").await;
    assert_eq!(status, 200);
    let items = cart["items"].as_array().expect("Expected items array");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["Product_ID"], 3);
    assert_eq!(items[0]["Quantity"], 5);
    assert_eq!(items[0]["Name"], "Rust in Action");
    assert_eq!(cart["totalItems"], 5);
    assert_eq!(cart["totalPrice"], "195.00");
}

#[tokio::test]
async fn test_add_item_rejects_bad_input() {
    let env = TestEnvironment::new().await;

    let (status, body) = post_json(
        &env,
        "/api/cart/1/items",
        json!({ "productId": 3, "quantity": 0 }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid quantity: 0");

    let (status, _) = post_json(&env, "/api/cart/1/items", json!({ "quantity": 1 })).await;
    assert_eq!(status, 400);

    let (status, _) = post_json(
        &env,
        "/api/cart/abc/items",
        json!({ "productId": 3, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, 400);

    let (status, body) = post_json(
        &env,
        "/api/cart/1/items",
        json!({ "productId": 999, "quantity": 1 }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Product not found: 999");
    assert!(!env.cart_repository.has_cart(1));
}

#[tokio::test]
async fn test_add_item_past_line_limit_is_a_client_error() {
    let env = TestEnvironment::new().await;
    env.cart_repository.set_quantity(8, 3, 2_147_483_000);

    let (status, body) = post_json(
        &env,
        "/api/cart/8/items",
        json!({ "productId": 3, "quantity": 1000 }),
    )
    .await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid quantity: 1000");
    assert_eq!(env.cart_repository.quantity(8, 3), Some(2_147_483_000));
}

#[tokio::test]
async fn test_malformed_json_is_a_client_error() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .post(env.url("/api/cart/1/items"))
        .header("content-type", "application/json")
        .body("{\"productId\": ")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_removing_last_item_deletes_cart() {
    let env = TestEnvironment::new().await;

    post_json(
        &env,
        "/api/cart/7/items",
        json!({ "productId": 1, "quantity": 1 }),
    )
    .await;
    post_json(
        &env,
        "/api/cart/7/items",
        json!({ "productId": 2, "quantity": 1 }),
    )
    .await;

    let (status, body) = delete_json(&env, "/api/cart/7/items/1").await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Item removed from cart successfully");
    assert!(env.cart_repository.has_cart(7));

    let (status, _) = delete_json(&env, "/api/cart/7/items/2").await;
    assert_eq!(status, 200);
    assert!(!env.cart_repository.has_cart(7));

    // The next read starts a fresh cart
    let (status, cart) = get_json(&env, "/api/cart/7").await;
    assert_eq!(status, 200);
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn test_remove_without_cart_is_not_found() {
    let env = TestEnvironment::new().await;

    let (status, body) = delete_json(&env, "/api/cart/55/items/1").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "Cart not found for customer: 55");
    assert!(!env.cart_repository.has_cart(55));
}

#[tokio::test]
async fn test_signup_login_and_check() {
    let env = TestEnvironment::new().await;
    let credentials = json!({ "username": "alice", "password": "wonderland" });

    let (status, body) = post_json(&env, "/api/auth/signup", credentials.clone()).await;
    assert_eq!(status, 201);
    assert_eq!(body["message"], "User created successfully");
    let user_id = body["userId"].as_i64().expect("Expected userId");

    let stored = env
        .user_repository
        .stored_hash("alice")
        .expect("Expected stored user");
    assert_ne!(stored, "wonderland");
    assert!(stored.starts_with("$argon2"));

    let (status, body) = post_json(&env, "/api/auth/login", credentials).await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], user_id);
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["role"], "user");
    assert!(body["user"].get("password_hash").is_none());

    let (status, body) = get_json(&env, &format!("/api/auth/check?userId={}", user_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["authenticated"], true);
    assert_eq!(body["user"]["username"], "alice");
}

#[tokio::test]
async fn test_auth_failures() {
    let env = TestEnvironment::new().await;

    let (status, _) = post_json(
        &env,
        "/api/auth/signup",
        json!({ "username": "bob", "password": "builder1" }),
    )
    .await;
    assert_eq!(status, 201);

    let (status, body) = post_json(
        &env,
        "/api/auth/signup",
        json!({ "username": "bob", "password": "another1" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Username already exists");

    let (status, body) = post_json(
        &env,
        "/api/auth/login",
        json!({ "username": "bob", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(status, 401);
    assert_eq!(body["error"], "Invalid username or password");

    let (status, _) = post_json(&env, "/api/auth/login", json!({ "username": "bob" })).await;
    assert_eq!(status, 400);

    let (status, body) = get_json(&env, "/api/auth/check?userId=999").await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({ "authenticated": false }));

    let (status, body) = get_json(&env, "/api/auth/check").await;
    assert_eq!(status, 401);
    assert_eq!(body, json!({ "authenticated": false }));
}

#[tokio::test]
async fn test_frontend_pages_are_served() {
    let env = TestEnvironment::new().await;

    let response = env
        .client
        .get(env.url("/"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers().contains_key("content-security-policy"));
    let html = response.text().await.expect("Failed to read body");
    assert!(html.contains("login-form"));

    let response = env
        .client
        .get(env.url("/main"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn test_admin_routes_disabled_by_default() {
    let env = TestEnvironment::with_admin_flag(false).await;

    for path in ["/api/admin/cleanup", "/api/admin/seed", "/api/admin/setup-schema"] {
        let (status, body) = post_json(&env, path, json!({})).await;
        assert_eq!(status, 404, "{} should not be mounted", path);
        assert_eq!(body["error"], "Not found");
    }
}

#[tokio::test]
async fn test_admin_routes_mounted_when_enabled() {
    let env = TestEnvironment::with_admin_flag(true).await;

    // Mounted, but the pool behind it has no database
    let (status, body) = post_json(&env, "/api/admin/cleanup", json!({})).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Failed to cleanup database");
}
