//! SQLite table schema definitions.
//!
//! One module per table, each exporting a `TABLE` constant, individual
//! column constants, and an `ALL_COLUMNS` slice in insert order.

pub mod geojson;
pub mod rtree;
pub mod spelunker;
pub mod whosonfirst;
