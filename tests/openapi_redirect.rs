//! Integration tests for /openapi lookups and redirects.

mod common;

use common::TestServer;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn test_redirect_status_follows_link_kind() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client();

    client.create_link(1, "https://example.com/permanent", 301).await?;
    client.create_link(2, "https://example.com/temporary", 302).await?;

    let permanent = client.redirect("B").await?;
    assert_eq!(permanent.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        permanent.headers()[reqwest::header::LOCATION],
        "https://example.com/permanent"
    );

    let temporary = client.redirect("C").await?;
    assert_eq!(temporary.status(), StatusCode::FOUND);
    assert_eq!(
        client.location("C").await?.as_deref(),
        Some("https://example.com/temporary")
    );

    // Every request carries a correlation id.
    assert!(temporary.headers().contains_key("x-request-id"));

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_redirect_rejects_unknown_and_inactive_codes() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client();

    client
        .post(
            "/api/v1/links/create",
            &json!({"id": 1, "redirect": 302, "originalUrl": "https://example.com", "isActive": 0}),
        )
        .await?;

    assert_eq!(client.redirect("B").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.redirect("nope").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.redirect("").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(client.location("B").await?, None);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_create_after_miss_is_visible() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client();

    // Caches a null entry for "B".
    assert_eq!(client.redirect("B").await?.status(), StatusCode::BAD_REQUEST);

    client.create_link(1, "https://example.com/new", 302).await?;
    assert_eq!(
        client.location("B").await?.as_deref(),
        Some("https://example.com/new")
    );

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_update_moves_the_redirect() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client();

    client.create_link(1, "https://example.com/old", 302).await?;
    assert_eq!(client.location("B").await?.as_deref(), Some("https://example.com/old"));

    client
        .post(
            "/api/v1/links/update",
            &json!({"id": 1, "code": "moved", "redirect": 302, "originalUrl": "https://example.com/new", "isActive": 1}),
        )
        .await?;
    assert_eq!(client.redirect("B").await?.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        client.location("moved").await?.as_deref(),
        Some("https://example.com/new")
    );

    client.delete("/api/v1/links/delete/1").await?;
    assert_eq!(client.redirect("moved").await?.status(), StatusCode::BAD_REQUEST);

    server.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn test_mapping_and_lists() -> anyhow::Result<()> {
    let server = TestServer::spawn().await?;
    let client = server.client();

    client.create_link(1, "https://example.com/live", 301).await?;
    client
        .post(
            "/api/v1/links/create",
            &json!({"id": 2, "redirect": 302, "originalUrl": "https://example.com/off", "isActive": 0}),
        )
        .await?;

    let mapping = client.get("/openapi/mapping?original=B").await?;
    assert!(mapping.success);
    assert_eq!(mapping.data()["originalUrl"], "https://example.com/live");
    assert_eq!(mapping.data()["redirect"], 301);
    assert!(mapping.data().get("id").is_none());

    let missing = client.get("/openapi/mapping?original=zzz").await?;
    assert!(!missing.success);
    assert_eq!(missing.code, 20001);

    let empty = client.get("/openapi/mapping").await?;
    assert_eq!(empty.code, 400);

    let lists = client.get("/openapi/lists").await?;
    let codes: Vec<_> = lists
        .data()
        .as_array()
        .into_iter()
        .flatten()
        .map(|l| l["code"].clone())
        .collect();
    assert_eq!(codes, vec![json!("B")]);

    server.shutdown().await;
    Ok(())
}
