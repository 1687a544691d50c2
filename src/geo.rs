//! Stateless geographic helpers: great-circle distance and integer geohash.

/// Mean earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3_440.065;

/// Haversine distance between two points, in nautical miles.
pub fn haversine_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_NM * c
}

/// Full 64-bit integer geohash.
///
/// Latitude and longitude are each quantised to 32 bits and interleaved with
/// longitude in the most significant position, matching the bit order of the
/// base-32 geohash alphabet encoding.
pub fn encode_int(lat: f64, lon: f64) -> u64 {
    let lat_bits = quantise(lat, 90.0);
    let lon_bits = quantise(lon, 180.0);
    spread(lat_bits) | (spread(lon_bits) << 1)
}

/// Integer geohash truncated to the `bits` most significant bits.
///
/// `bits` is clamped to `1..=64`.
pub fn encode_int_with_precision(lat: f64, lon: f64, bits: u32) -> u64 {
    let bits = bits.clamp(1, 64);
    encode_int(lat, lon) >> (64 - bits)
}

fn quantise(value: f64, range: f64) -> u32 {
    let p = (value + range) / (2.0 * range);
    // `as` saturates, so the upper bound maps to u32::MAX.
    (p * 4_294_967_296.0) as u32
}

/// Spread the 32 bits of `x` into the even bit positions of a u64.
fn spread(x: u32) -> u64 {
    let mut x = x as u64;
    x = (x | (x << 16)) & 0x0000_FFFF_0000_FFFF;
    x = (x | (x << 8)) & 0x00FF_00FF_00FF_00FF;
    x = (x | (x << 4)) & 0x0F0F_0F0F_0F0F_0F0F;
    x = (x | (x << 2)) & 0x3333_3333_3333_3333;
    x = (x | (x << 1)) & 0x5555_5555_5555_5555;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        assert_eq!(haversine_nm(10.0, 20.0, 10.0, 20.0), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        // One degree of latitude is about 60 nautical miles.
        let d = haversine_nm(0.0, 0.0, 1.0, 0.0);
        assert!((d - 60.04).abs() < 0.1, "got {d}");
    }

    #[test]
    fn test_spread_interleaves() {
        assert_eq!(spread(0b1), 0b1);
        assert_eq!(spread(0b11), 0b101);
        assert_eq!(spread(u32::MAX), 0x5555_5555_5555_5555);
    }

    #[test]
    fn test_encode_int_origin() {
        // Origin sits at the midpoint of both ranges: top bit of each set.
        assert_eq!(encode_int(0.0, 0.0), 0xC000_0000_0000_0000);
        assert_eq!(encode_int_with_precision(0.0, 0.0, 22), 0x30_0000);
    }

    #[test]
    fn test_encode_int_extremes() {
        assert_eq!(encode_int(-90.0, -180.0), 0);
        assert_eq!(encode_int(90.0, 180.0), u64::MAX);
    }

    #[test]
    fn test_precision_matches_prefix() {
        let full = encode_int(37.7749, -122.4194);
        let short = encode_int_with_precision(37.7749, -122.4194, 22);
        assert_eq!(short, full >> 42);
        assert!(short < (1 << 22));
    }

    #[test]
    fn test_known_geohash_prefix() {
        // "9q8y" is the base-32 geohash cell for San Francisco: 20 bits.
        let bits = encode_int_with_precision(37.7749, -122.4194, 20);
        let alphabet = b"0123456789bcdefghjkmnpqrstuvwxyz";
        let text: String = (0..4)
            .rev()
            .map(|i| alphabet[((bits >> (i * 5)) & 0x1F) as usize] as char)
            .collect();
        assert_eq!(text, "9q8y");
    }
}
