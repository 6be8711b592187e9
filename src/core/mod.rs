pub mod actions;
pub mod config;
pub mod daemon;
pub mod engine;
pub mod error;
pub mod history;
pub mod notify;
pub mod preset;
pub mod terminal;
