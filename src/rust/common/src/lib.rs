//! Shared definitions for pipdb
//!
//! This crate provides canonical implementations used by both the core library
//! and the CLI:
//! - Table and column definitions for every SQLite table
//! - Table name and default constants
//! - UTC timestamp formatting for stored `lastmodified` values

pub mod constants;
pub mod schema;
pub mod timestamps;
