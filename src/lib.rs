//! schedulr - terminal task and schedule manager
//!
//! Base tasks are stored per user as JSON. Recurring tasks are expanded on
//! read into dated occurrences, which the query, filter and view layers
//! work on. Nothing derived is ever persisted.

pub mod commands;
pub mod dates;
pub mod due;
pub mod error;
pub mod filter;
pub mod models;
pub mod query;
pub mod recurrence;
pub mod settings;
pub mod storage;
pub mod tasks;
pub mod tui;
