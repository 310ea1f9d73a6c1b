//! Point-in-polygon database for place records
//!
//! This crate indexes GeoJSON place documents into a set of SQLite tables in
//! a single transaction per document, and answers "which places contain this
//! point?" with a bounding-box pre-filter followed by concurrent, cancellable
//! inflation of each candidate.

pub mod admin;
pub mod cache;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod filter;
pub mod geometry;
pub mod ingest;
pub mod logging;
pub mod spatial;
pub mod spr;
pub mod store;
pub mod tables;
pub mod uri;

pub use crate::config::{IngestSettings, LogSettings, PoolSettings, QuerySettings, SpatialConfig};
pub use crate::database::{DatabaseRegistry, SqlDatabase, TableTiming};
pub use crate::document::{Document, Existential};
pub use crate::error::{FilterRejection, SpatialError, SpatialResult};
pub use crate::filter::{Filter, PlaceFilter, PredicateFilter};
pub use crate::ingest::{index_paths, AltPolicy, IndexOptions, IndexReport};
pub use crate::logging::{initialize_logging, LoggingConfig};
pub use crate::spatial::{Candidate, QueryEvent, QuerySummary, SpatialDatabase};
pub use crate::spr::StandardPlaceResult;
pub use crate::store::{DocumentReader, DocumentWriter, TableWriter};
pub use crate::tables::{register_default_tables, Table, TableRegistry};
pub use crate::uri::{parse_record_uri, AltGeom, RecordUri};

pub use geo_types::Point;
pub use tokio_util::sync::CancellationToken;
