//! The line-filtering core: rolling buffer, matching predicates and the
//! conversation state machine.

pub mod buffer;
pub mod conversation;
pub mod matching;

pub use buffer::{RollingBuffer, evict_expired};
pub use conversation::{ConversationFilter, FilterSettings, FilterState};
pub use matching::{CallSign, TerminationSet, contains_call_sign, names_other_station};
