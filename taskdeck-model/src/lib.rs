//! `TaskDeck` data model library.
//!
//! Holds the record types for the `tasks` and `recurring_tasks`
//! collections, the checklist codec embedded in a task's description
//! field, and the wire protocol spoken between clients and the store
//! backend. Contains no I/O.

pub mod checklist;
pub mod habit;
pub mod task;
pub mod wire;
