//! venus - short link redirect service.
//!
//! Links are managed through the admin API and resolved through the open
//! API, with lookups served from a multi-level cache kept coherent across
//! nodes. Clicks and their locations are reported in batches.

pub mod admin;
pub mod app;
pub mod cache;
pub mod codec;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics;
pub mod openapi;
pub mod support;
pub mod telemetry;

pub use app::{App, AppError};
pub use config::Config;
