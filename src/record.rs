//! A single row of delimited-text fields.
//!
//! Records are plain values: every stream operation hands out owned copies,
//! so mutating a record never reaches back into the stream it came from.

use std::fmt;

use chrono::NaiveDateTime;
use xxhash_rust::xxh64::xxh64;

use crate::error::ParseError;
use crate::geo;
use crate::headers::Headers;

/// Timestamp layout of the MarineCadastre AIS exports, e.g.
/// `2017-12-05T00:01:14`.
pub const TIME_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S";

/// An ordered sequence of text fields.
///
/// Index `i` refers to the same column as index `i` of the headers of the
/// stream the record was read from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Record {
    fields: Vec<String>,
}

impl Record {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<String> {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// This record with `field` appended as a new last column.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Bounds-checked access to the field at `index`.
    pub fn value(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(String::as_str)
    }

    /// The field under column `name`, if the headers contain it and the
    /// record is wide enough.
    pub fn value_for(&self, headers: &Headers, name: &str) -> Option<&str> {
        headers.index_of(name).and_then(|index| self.value(index))
    }

    fn field(&self, index: usize) -> Result<&str, ParseError> {
        self.value(index).ok_or(ParseError::OutOfRange {
            index,
            len: self.fields.len(),
        })
    }

    /// Parse the field at `index` as an `f64`, e.g. `LAT`, `LON` or `SOG`.
    pub fn parse_float(&self, index: usize) -> Result<f64, ParseError> {
        let value = self.field(index)?;
        value.parse().map_err(|source| ParseError::Float {
            index,
            value: value.to_string(),
            source,
        })
    }

    /// Parse the field at `index` as an `i64`, e.g. `MMSI` or `IMO`.
    pub fn parse_int(&self, index: usize) -> Result<i64, ParseError> {
        let value = self.field(index)?;
        value.parse().map_err(|source| ParseError::Int {
            index,
            value: value.to_string(),
            source,
        })
    }

    /// Parse the field at `index` as a timestamp in `layout`
    /// (`chrono` strftime syntax). The whole field must match.
    pub fn parse_time(&self, index: usize, layout: &str) -> Result<NaiveDateTime, ParseError> {
        let value = self.field(index)?;
        NaiveDateTime::parse_from_str(value, layout).map_err(|source| ParseError::Time {
            index,
            value: value.to_string(),
            layout: layout.to_string(),
            source,
        })
    }

    /// [`parse_time`](Self::parse_time) with [`TIME_LAYOUT`].
    pub fn parse_timestamp(&self, index: usize) -> Result<NaiveDateTime, ParseError> {
        self.parse_time(index, TIME_LAYOUT)
    }

    /// Canonical byte form: fields joined by `,` with a trailing newline.
    pub fn data(&self) -> Vec<u8> {
        self.data_with(b',')
    }

    /// Canonical byte form for streams delimited by `delimiter`.
    pub fn data_with(&self, delimiter: u8) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            out.extend_from_slice(field.as_bytes());
        }
        out.push(b'\n');
        out
    }

    /// 64-bit content fingerprint of [`data`](Self::data).
    pub fn hash(&self) -> u64 {
        self.hash_with(b',')
    }

    /// 64-bit content fingerprint of [`data_with`](Self::data_with).
    pub fn hash_with(&self, delimiter: u8) -> u64 {
        xxh64(&self.data_with(delimiter), 0)
    }

    /// Great-circle distance in nautical miles between the positions held by
    /// this record and `other` at the same column indices.
    ///
    /// Any coordinate that fails to parse is reported rather than treated as
    /// zero.
    pub fn distance_nm(
        &self,
        other: &Record,
        lat_index: usize,
        lon_index: usize,
    ) -> Result<f64, ParseError> {
        let lat_p = self.parse_float(lat_index)?;
        let lon_p = self.parse_float(lon_index)?;
        let lat_q = other.parse_float(lat_index)?;
        let lon_q = other.parse_float(lon_index)?;
        Ok(geo::haversine_nm(lat_p, lon_p, lat_q, lon_q))
    }
}

impl From<Vec<String>> for Record {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for Record {
    fn from(fields: [S; N]) -> Self {
        fields.into_iter().map(Into::into).collect()
    }
}

/// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
impl From<&csv::ByteRecord> for Record {
    fn from(row: &csv::ByteRecord) -> Self {
        row.iter().map(String::from_utf8_lossy).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fields.join(","))
    }
}
