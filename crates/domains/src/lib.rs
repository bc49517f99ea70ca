//! # domains
//!
//! Data model, port traits and the error taxonomy for the domain marketplace
//! client. Nothing here performs I/O: adapters implement the ports, services
//! drive them.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::*;
pub use models::*;
pub use ports::*;
