//! Top-level turn handling.

pub mod command;
pub mod router;

pub use command::TurnCommand;
pub use router::{TurnOutcome, TurnRouter, language_menu};
