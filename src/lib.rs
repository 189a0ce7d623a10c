//! wxscrape library
//!
//! This module exposes the calendar, matcher, store and driver modules for use
//! by the binary and in integration tests.

pub mod backfill;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod deployment;
pub mod logging;
pub mod lookup;
pub mod storms;
