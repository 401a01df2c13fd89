//! `TaskDeck` — task and habit tracking client core.

pub mod config;
pub mod habits;
pub mod store;
pub mod tasks;
