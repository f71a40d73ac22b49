//! Test HTTP client.
//!
//! Sends API requests and decodes the `{success, message, code, data}`
//! envelope. Redirects are never followed.

use serde::Deserialize;
use serde_json::{Value, json};
use std::net::SocketAddr;

#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub code: i32,
    pub data: Option<Value>,
}

impl Envelope {
    pub fn data(&self) -> &Value {
        self.data.as_ref().unwrap_or(&Value::Null)
    }
}

/// A test API client.
pub struct TestClient {
    http: reqwest::Client,
    base: String,
}

impl TestClient {
    pub fn new(addr: SocketAddr) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            http,
            base: format!("http://{addr}"),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn envelope(response: reqwest::Response) -> anyhow::Result<Envelope> {
        let status = response.status();
        anyhow::ensure!(status.is_success(), "unexpected HTTP status {status}");
        Ok(response.json().await?)
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Envelope> {
        Self::envelope(self.http.get(self.url(path)).send().await?).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> anyhow::Result<Envelope> {
        Self::envelope(self.http.post(self.url(path)).json(body).send().await?).await
    }

    /// POST a body verbatim, without a content type.
    pub async fn post_raw(&self, path: &str, body: &str) -> anyhow::Result<Envelope> {
        Self::envelope(
            self.http
                .post(self.url(path))
                .body(body.to_string())
                .send()
                .await?,
        )
        .await
    }

    pub async fn delete(&self, path: &str) -> anyhow::Result<Envelope> {
        Self::envelope(self.http.delete(self.url(path)).send().await?).await
    }

    /// GET `/openapi/redirect?encode=<code>`, returning the raw response.
    pub async fn redirect(&self, code: &str) -> anyhow::Result<reqwest::Response> {
        Ok(self
            .http
            .get(self.url("/openapi/redirect"))
            .query(&[("encode", code)])
            .send()
            .await?)
    }

    /// Location header of a redirect, if any.
    pub async fn location(&self, code: &str) -> anyhow::Result<Option<String>> {
        let response = self.redirect(code).await?;
        Ok(response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from))
    }

    pub async fn create_link(&self, id: i64, url: &str, redirect: i32) -> anyhow::Result<Envelope> {
        self.post(
            "/api/v1/links/create",
            &json!({
                "id": id,
                "redirect": redirect,
                "originalUrl": url,
                "isActive": 1,
            }),
        )
        .await
    }
}
