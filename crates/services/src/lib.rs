//! # services
//!
//! Client-side behaviour of the domain marketplace: deriving listing views,
//! managing filter state and presets, the cart, and live chat. Everything
//! talks to the outside world through the ports in `domains`.

pub mod cart;
pub mod chat;
pub mod filters;
pub mod panel;
pub mod saved_filters;
pub mod store;

pub use cart::{Cart, CartState, Wishlist, WishlistState};
pub use chat::{ChatConfig, ChatState, ChatSync, MessageLog, PushOutcome};
pub use panel::{FilterChange, FilterPanel, UrlSeeded};
pub use saved_filters::SavedFilterService;
pub use store::Store;
