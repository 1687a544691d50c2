//! Record predicates used by subset operations.

use crate::error::ParseError;
use crate::headers::Headers;
use crate::record::Record;

/// A predicate over records.
///
/// An `Err` is never a non-match: it aborts the enclosing subset operation.
pub trait Matching {
    fn matches(&self, record: &Record) -> Result<bool, ParseError>;
}

impl<F> Matching for F
where
    F: Fn(&Record) -> Result<bool, ParseError>,
{
    fn matches(&self, record: &Record) -> Result<bool, ParseError> {
        self(record)
    }
}

/// Geographic bounding box over a record's latitude and longitude columns.
///
/// Bounds are inclusive: points on an edge or a vertex match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub lat_index: usize,
    pub lon_index: usize,
}

impl BoundingBox {
    /// Box reading coordinates from the columns named `lat` and `lon`.
    ///
    /// Returns `None` if either column is missing from `headers`.
    pub fn for_columns(
        headers: &Headers,
        lat: &str,
        lon: &str,
        (min_lat, max_lat): (f64, f64),
        (min_lon, max_lon): (f64, f64),
    ) -> Option<Self> {
        let lat_index = headers.index_of(lat)?;
        let lon_index = headers.index_of(lon)?;
        Some(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            lat_index,
            lon_index,
        })
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

impl Matching for BoundingBox {
    fn matches(&self, record: &Record) -> Result<bool, ParseError> {
        let lat = record.parse_float(self.lat_index)?;
        let lon = record.parse_float(self.lon_index)?;
        Ok(self.contains(lat, lon))
    }
}
