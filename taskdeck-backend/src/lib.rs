//! `TaskDeck` store backend library.
//!
//! Exposes the store backend for use in tests and embedding. The backend
//! accepts WebSocket connections, authenticates clients by token, and
//! serves owner-scoped task and habit collections.

pub mod collections;
pub mod config;
pub mod server;
