//! bookdrill library
//!
//! This module exposes the search, storage, and navigation pieces for use by
//! the binary and in integration tests.

pub mod cache;
pub mod chart;
pub mod cli;
pub mod data;
pub mod logging;
pub mod navigation;
pub mod search;
pub mod store;
