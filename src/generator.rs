//! Field generators used by [`RecordStream::append_field`].
//!
//! [`RecordStream::append_field`]: crate::RecordStream::append_field

use crate::error::GenerateError;
use crate::geo;
use crate::record::Record;

/// Computes one new field for a record from the fields at `indices`.
///
/// `indices` are resolved from column names by the caller, in the order the
/// names were given.
pub trait Generator {
    fn generate(&self, record: &Record, indices: &[usize]) -> Result<String, GenerateError>;
}

impl<F> Generator for F
where
    F: Fn(&Record, &[usize]) -> Result<String, GenerateError>,
{
    fn generate(&self, record: &Record, indices: &[usize]) -> Result<String, GenerateError> {
        self(record, indices)
    }
}

/// Bits of precision in the geohash column: roughly 0.1 degree cells.
pub const GEOHASH_BITS: u32 = 22;

/// Appends a 22-bit integer geohash, formatted as lowercase `0x` hex.
///
/// Expects exactly two indices: latitude then longitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct Geohasher;

impl Geohasher {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for Geohasher {
    fn generate(&self, record: &Record, indices: &[usize]) -> Result<String, GenerateError> {
        let &[lat_index, lon_index] = indices else {
            return Err(GenerateError::Arity {
                generator: "geohash",
                expected: 2,
                got: indices.len(),
            });
        };
        let lat = record.parse_float(lat_index)?;
        let lon = record.parse_float(lon_index)?;
        let hash = geo::encode_int_with_precision(lat, lon, GEOHASH_BITS);
        Ok(format!("{hash:#x}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geohash_format() {
        let rec = Record::from(["10.0", "20.0"]);
        let field = Geohasher.generate(&rec, &[0, 1]).unwrap();
        assert_eq!(field, "0x303f03");
    }

    #[test]
    fn test_geohash_origin() {
        let rec = Record::from(["0", "0"]);
        assert_eq!(Geohasher.generate(&rec, &[0, 1]).unwrap(), "0x300000");
    }

    #[test]
    fn test_geohash_index_order_matters() {
        let rec = Record::from(["20.0", "10.0"]);
        let swapped = Geohasher.generate(&rec, &[1, 0]).unwrap();
        assert_eq!(swapped, "0x303f03");
    }

    #[test]
    fn test_geohash_arity() {
        let rec = Record::from(["10.0", "20.0", "30.0"]);
        for indices in [&[][..], &[0][..], &[0, 1, 2][..]] {
            let err = Geohasher.generate(&rec, indices).unwrap_err();
            assert!(matches!(err, GenerateError::Arity { expected: 2, .. }));
        }
    }

    #[test]
    fn test_geohash_parse_error() {
        let rec = Record::from(["ten", "20.0"]);
        let err = Geohasher.generate(&rec, &[0, 1]).unwrap_err();
        assert!(matches!(err, GenerateError::Parse(_)));
    }

    #[test]
    fn test_closure_generator() {
        let concat = |r: &Record, idx: &[usize]| -> Result<String, GenerateError> {
            Ok(idx.iter().filter_map(|&i| r.value(i)).collect::<Vec<_>>().join("-"))
        };
        let rec = Record::from(["a", "b", "c"]);
        assert_eq!(concat.generate(&rec, &[2, 0]).unwrap(), "c-a");
    }
}
