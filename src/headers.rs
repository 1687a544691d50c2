//! Column names of a record stream.

use std::collections::HashMap;
use std::fmt;

/// Vessel identifier column.
pub const MMSI: &str = "MMSI";
/// Vessel display-name column.
pub const VESSEL_NAME: &str = "VesselName";
/// Report timestamp column.
pub const BASE_DATE_TIME: &str = "BaseDateTime";

/// Ordered column names taken from the first non-comment line of a file.
///
/// Names need not be unique; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<String>,
}

impl Headers {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of the first column called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field == name)
    }

    /// Positions of every column in `names`, in request order.
    ///
    /// Returns `None` if any name is missing; partial results are never
    /// handed out.
    pub fn indices_of(&self, names: &[&str]) -> Option<Vec<usize>> {
        names.iter().map(|name| self.index_of(name)).collect()
    }

    /// Like [`indices_of`](Self::indices_of) but keyed by column name.
    pub fn index_map(&self, names: &[&str]) -> Option<HashMap<String, usize>> {
        names
            .iter()
            .map(|name| self.index_of(name).map(|index| (name.to_string(), index)))
            .collect()
    }

    /// These headers with `name` appended as a new last column.
    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.fields.push(name.into());
        self
    }
}

impl From<&csv::ByteRecord> for Headers {
    fn from(row: &csv::ByteRecord) -> Self {
        Self::new(row.iter().map(String::from_utf8_lossy))
    }
}

/// Two-column `Index  Header` table, one row per column.
impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const PADDING: usize = 2;
        let width = self
            .fields
            .len()
            .saturating_sub(1)
            .to_string()
            .len()
            .max("Index".len())
            + PADDING;

        writeln!(f, "{:<width$}Header", "Index")?;
        for (index, field) in self.fields.iter().enumerate() {
            writeln!(f, "{:<width$}{}", index, field.trim())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ais() -> Headers {
        Headers::new(["MMSI", "BaseDateTime", "LAT", "LON", "VesselName"])
    }

    #[test]
    fn test_index_of() {
        let h = ais();
        assert_eq!(h.index_of("MMSI"), Some(0));
        assert_eq!(h.index_of("LON"), Some(3));
        assert_eq!(h.index_of("IMO"), None);
    }

    #[test]
    fn test_index_of_returns_first_duplicate() {
        let h = Headers::new(["A", "B", "A"]);
        assert_eq!(h.index_of("A"), Some(0));
    }

    #[test]
    fn test_indices_of_all_present() {
        assert_eq!(ais().indices_of(&["LAT", "LON"]), Some(vec![2, 3]));
    }

    #[test]
    fn test_indices_of_fails_as_unit() {
        assert_eq!(ais().indices_of(&["LAT", "IMO", "LON"]), None);
    }

    #[test]
    fn test_index_map() {
        let map = ais().index_map(&["LAT", "MMSI"]).unwrap();
        assert_eq!(map["LAT"], 2);
        assert_eq!(map["MMSI"], 0);
        assert!(ais().index_map(&["LAT", "Heading"]).is_none());
    }

    #[test]
    fn test_equality_is_structural() {
        assert_eq!(ais(), ais());
        assert_ne!(ais(), Headers::new(["MMSI", "BaseDateTime", "LAT", "LON"]));
        assert_ne!(
            Headers::new(["LAT", "LON"]),
            Headers::new(["LON", "LAT"])
        );
        assert_eq!(Headers::default(), Headers::new(Vec::<String>::new()));
    }

    #[test]
    fn test_with_column() {
        let h = Headers::new(["LAT", "LON"]).with_column("Geohash");
        assert_eq!(h.fields(), ["LAT", "LON", "Geohash"]);
    }

    #[test]
    fn test_display_table() {
        let h = Headers::new(["MMSI", " LAT "]);
        assert_eq!(h.to_string(), "Index  Header\n0      MMSI\n1      LAT\n");
    }
}
