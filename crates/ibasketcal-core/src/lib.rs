//! Core types and trait definitions for the Israeli basketball calendar.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; the `Store` trait defined here is the only
//! contract between the ingest side and the serving side.

pub mod collate;
pub mod error;
pub mod matches;
pub mod season;
pub mod store;
pub mod team;

pub use error::{Error, Result};
