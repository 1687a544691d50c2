//! Vessel identity and per-vessel record counts.

use std::collections::HashMap;

/// Display name used when a stream has no `VesselName` column.
pub const NO_VESSEL_NAME: &str = "no VesselName header";

/// Identifying information for one ship in an AIS dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Vessel {
    pub mmsi: String,
    pub vessel_name: String,
}

impl Vessel {
    pub fn new(mmsi: impl Into<String>, vessel_name: impl Into<String>) -> Self {
        Self {
            mmsi: mmsi.into(),
            vessel_name: vessel_name.into(),
        }
    }
}

/// Number of records seen for each vessel.
pub type VesselSet = HashMap<Vessel, usize>;
