//! Per-zone IXFR options.

use serde::{Deserialize, Serialize};

//------------ ZoneIxfrConfig ------------------------------------------------

/// The IXFR related options of a single zone.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ZoneIxfrConfig {
    /// Whether IXFR data is written to disk next to the zone file.
    pub store_ixfr: bool,

    /// The number of IXFR versions kept for the zone.
    ///
    /// Zero disables keeping IXFR data altogether.
    pub ixfr_number: u32,

    /// The maximum number of bytes of IXFR data kept for the zone.
    ///
    /// Zero means no size limit is imposed.
    pub ixfr_size: u64,
}

impl Default for ZoneIxfrConfig {
    fn default() -> Self {
        ZoneIxfrConfig {
            store_ixfr: false,
            ixfr_number: 5,
            ixfr_size: 1_048_576,
        }
    }
}

//============ Testing =======================================================
