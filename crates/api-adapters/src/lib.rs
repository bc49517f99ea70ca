//! # api-adapters
//!
//! Concrete implementations of the `domains` ports: the HTTP client for the
//! marketplace REST API and an in-process push hub.

pub mod http;
pub mod push;

pub use http::HttpMarketplaceClient;
pub use push::InProcessPushHub;
