//! HTTP adapter for the back-office REST API.

mod client;

pub use client::{ApiClient, REQUEST_ID_HEADER, classify_failure};
