//! services/dashboard/src/lib.rs
//!
//! Client synchronization core for the time-tracking dashboard: the active
//! timer store, its ticker, wholesale caches, platform adapters, and the
//! HTTP/WebSocket surfaces that render them.

pub mod adapters;
pub mod config;
pub mod error;
pub mod store;
pub mod web;
