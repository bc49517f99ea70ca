//! # Domain Models
//!
//! These structs mirror the JSON documents served by the marketplace backend.
//! Field names follow the backend (`_id`, `Actualprice`, camelCase) so that
//! snapshots round-trip through the REST API unchanged.

mod catalog;
mod chat;
mod commerce;
mod filters;

pub use catalog::*;
pub use chat::*;
pub use commerce::*;
pub use filters::*;
