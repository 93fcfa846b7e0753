//! Headless back-office client.
//!
//! The crate drives the storefront admin REST API: URL-synchronized list
//! views (parameter store, deduplicating list fetcher, pagination), CRUD
//! calls, session handling and the rich-text editor helpers.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
