//! Polyglot bot — language-aware turn router with waterfall dialogs.

pub mod bot;
pub mod channels;
pub mod config;
pub mod context;
pub mod dialogs;
pub mod error;
pub mod state;
pub mod store;
