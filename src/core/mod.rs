//! Core modules shared by every subsystem: configuration, diagnostics,
//! the document schema and its persistent store.

pub mod config;
pub mod error;
pub mod logging;
pub mod migration;
pub mod output;
pub mod schemas;
pub mod store;
pub mod time;
