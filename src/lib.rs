//! # ais-stream
//!
//! A streaming record store for delimited-text AIS (Automatic Identification
//! System) vessel-tracking data.
//!
//! Files published by MarineCadastre and similar sources run to millions of
//! rows. Records are decoded one at a time with bounded memory, and every
//! bulk operation writes its result into a new stream rather than loading
//! the input.
//!
//! ## Overview
//!
//! - **[`Record`]**: one row of text fields with typed accessors
//! - **[`Headers`]**: column names and name-to-index lookups
//! - **[`Matching`]**: record predicates such as [`BoundingBox`]
//! - **[`Generator`]**: derived columns such as [`Geohasher`]
//! - **[`RecordStream`]**: read, stash, subset, append, sort and save
//!
//! ## Example
//!
//! ```
//! use ais_stream::{Geohasher, RecordStream};
//!
//! let csv = "\
//! MMSI,BaseDateTime,LAT,LON
//! 100,2020-01-01T00:00:05,10.0,20.0
//! 100,2020-01-01T00:00:01,10.5,20.5
//! ";
//!
//! let mut rs = RecordStream::from_bytes(csv).unwrap();
//! let mut sorted = rs.sort_by_time().unwrap();
//! let mut hashed = sorted
//!     .append_field("Geohash", &["LAT", "LON"], &Geohasher)
//!     .unwrap();
//!
//! let first = hashed.read().unwrap().unwrap();
//! assert_eq!(first.value(1), Some("2020-01-01T00:00:01"));
//! assert_eq!(hashed.headers().index_of("Geohash"), Some(4));
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod geo;
pub mod handle;
pub mod headers;
pub mod matching;
pub mod order;
pub mod record;
pub mod stream;
pub mod vessel;

pub use config::{FLUSH_THRESHOLD, StreamConfig};
pub use error::{GenerateError, ParseError, StreamError};
pub use generator::{GEOHASH_BITS, Generator, Geohasher};
pub use handle::{AppendFile, MemoryBuffer, NoClose, Sink, Source};
pub use headers::{BASE_DATE_TIME, Headers, MMSI, VESSEL_NAME};
pub use matching::{BoundingBox, Matching};
pub use order::ByTimestamp;
pub use record::{Record, TIME_LAYOUT};
pub use stream::{RecordStream, Records, ScanMode, Selection, StreamState};
pub use vessel::{NO_VESSEL_NAME, Vessel, VesselSet};
