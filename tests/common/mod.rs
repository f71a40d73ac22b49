//! Integration test common infrastructure.
//!
//! Provides an in-process test server and an HTTP client that decodes the
//! response envelope.

#![allow(dead_code)]

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::{Envelope, TestClient};
#[allow(unused_imports)]
pub use server::{TestServer, test_config};

use std::time::Duration;

/// Poll `check` until it returns true, for up to two seconds.
pub async fn eventually<F, Fut>(mut check: F) -> anyhow::Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<bool>>,
{
    for _ in 0..100 {
        if check().await? {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    anyhow::bail!("condition not reached within 2 seconds")
}
