//! End-to-end tests for the storefront cart API.
//!
//! Each test boots a storefront on an ephemeral port and talks to it over
//! real HTTP with a cookie-keeping client.

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sillage_integration_tests::{TestContext, new_client};

async fn get(ctx: &TestContext, client: &Client, path: &str) -> Value {
    let resp = client
        .get(ctx.url(path))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Failed to parse response")
}

async fn post(ctx: &TestContext, client: &Client, path: &str, body: Value) -> Value {
    let resp = client
        .post(ctx.url(path))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::OK);
    resp.json().await.expect("Failed to parse response")
}

fn product(id: &str, price: u32) -> Value {
    json!({
        "id": id,
        "name": "Iris Poudré",
        "subtitle": "Eau de parfum",
        "size": "50ml",
        "image": "/images/iris-poudre.jpg",
        "slug": "iris-poudre",
        "price": price,
    })
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .client
        .get(ctx.url("/health"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.text().await.expect("Failed to read body"), "ok");
}

// ============================================================================
// Totals
// ============================================================================

#[tokio::test]
async fn test_totals_below_free_shipping() {
    let ctx = TestContext::spawn().await;
    post(&ctx, &ctx.client, "/cart/add", product("p1", 100)).await;

    let totals = get(&ctx, &ctx.client, "/cart/totals").await;
    assert_eq!(totals["subtotal"], "100.00");
    assert_eq!(totals["shipping"], "15.00");
    assert_eq!(totals["tax"], "8.00");
    assert_eq!(totals["total"], "123.00");
}

#[tokio::test]
async fn test_totals_with_free_shipping() {
    let ctx = TestContext::spawn().await;
    post(&ctx, &ctx.client, "/cart/add", product("p1", 200)).await;

    let totals = get(&ctx, &ctx.client, "/cart/totals").await;
    assert_eq!(totals["subtotal"], "200.00");
    assert_eq!(totals["shipping"], "0.00");
    assert_eq!(totals["tax"], "16.00");
    assert_eq!(totals["total"], "216.00");
    assert_eq!(totals["free_shipping_remaining"], "0.00");
}

// ============================================================================
// Limits
// ============================================================================

#[tokio::test]
async fn test_repeated_add_caps_at_ten() {
    let ctx = TestContext::spawn().await;

    let mut last = Value::Null;
    for _ in 0..11 {
        last = post(&ctx, &ctx.client, "/cart/add", product("p1", 10)).await;
    }

    assert_eq!(last["outcome"]["status"], "clamped_quantity");
    assert_eq!(last["cart"]["lines"][0]["quantity"], 10);
    assert_eq!(last["cart"]["item_count"], 10);
}

#[tokio::test]
async fn test_update_quantity_is_clamped() {
    let ctx = TestContext::spawn().await;
    post(&ctx, &ctx.client, "/cart/add", product("p1", 10)).await;

    for (requested, applied) in [(-3, 1), (0, 1), (4, 4), (99, 10)] {
        let resp = post(
            &ctx,
            &ctx.client,
            "/cart/update",
            json!({ "id": "p1", "quantity": requested }),
        )
        .await;
        assert_eq!(resp["cart"]["lines"][0]["quantity"], applied);
    }
}

#[tokio::test]
async fn test_cart_full_at_twenty_lines() {
    let ctx = TestContext::spawn().await;
    for i in 0..20 {
        post(&ctx, &ctx.client, "/cart/add", product(&format!("p{i}"), 5)).await;
    }

    let resp = post(&ctx, &ctx.client, "/cart/add", product("p20", 5)).await;
    assert_eq!(resp["outcome"]["status"], "cart_full");
    assert_eq!(resp["cart"]["lines"].as_array().map(Vec::len), Some(20));

    // An existing line can still be bumped
    let resp = post(&ctx, &ctx.client, "/cart/add", product("p0", 5)).await;
    assert_eq!(resp["outcome"]["status"], "applied");
    assert_eq!(resp["cart"]["item_count"], 21);
}

#[tokio::test]
async fn test_update_missing_line_is_noop() {
    let ctx = TestContext::spawn().await;
    let resp = post(
        &ctx,
        &ctx.client,
        "/cart/update",
        json!({ "id": "missing", "quantity": 5 }),
    )
    .await;

    assert_eq!(resp["outcome"]["status"], "not_in_cart");
    assert_eq!(resp["cart"]["lines"], json!([]));
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_carts_are_per_visitor() {
    let ctx = TestContext::spawn().await;
    post(&ctx, &ctx.client, "/cart/add", product("p1", 40)).await;

    let stranger = new_client();
    let count = get(&ctx, &stranger, "/cart/count").await;
    assert_eq!(count["count"], 0);

    let count = get(&ctx, &ctx.client, "/cart/count").await;
    assert_eq!(count["count"], 1);
}

#[tokio::test]
async fn test_clear_empties_cart() {
    let ctx = TestContext::spawn().await;
    post(&ctx, &ctx.client, "/cart/add", product("p1", 40)).await;
    post(&ctx, &ctx.client, "/cart/add", product("p2", 60)).await;

    let resp = post(&ctx, &ctx.client, "/cart/clear", json!({})).await;
    assert_eq!(resp["cart"]["item_count"], 0);

    let cart = get(&ctx, &ctx.client, "/cart").await;
    assert_eq!(cart["lines"], json!([]));
    assert_eq!(cart["subtotal"], "0.00");
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .client
        .post(ctx.url("/cart/add"))
        .header("content-type", "application/json")
        .body("{\"id\": ")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("Failed to parse response");
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let ctx = TestContext::spawn().await;
    let resp = ctx
        .client
        .get(ctx.url("/cart/checkout"))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
