//! Core domain logic for Jifra.
//!
//! Everything here is synchronous and free of IO: the tier gate, prompt
//! templates, the history retention rules, and the parser that turns raw
//! model output into display blocks.

pub mod auth;
pub mod history;
mod language;
pub mod parse;
pub mod prompt;

pub use auth::{is_pro, tier_for};
pub use history::{HistoryList, MAX_PINNED, PRO_CAPACITY, PinOutcome, PinRejected};
pub use language::detect_language;
pub use parse::{SchemaHints, parse_blocks};
pub use prompt::build_prompt;
