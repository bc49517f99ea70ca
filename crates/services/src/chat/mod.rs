//! # Chat synchronization
//!
//! One active conversation per tab (customer) or one selected conversation
//! out of many (admin), kept current from REST fetches, push events and a
//! fallback poll.

mod message_log;
mod state;
mod sync;

pub use message_log::MessageLog;
pub use state::{ChatState, PushOutcome};
pub use sync::{ChatConfig, ChatSync};
