//! World configuration.

use serde::{Deserialize, Serialize};
use voltrail_core::coord::DEFAULT_CELL_SIZE;
use voltrail_core::fixed::Ticks;

/// Tunables for a [`World`](crate::World). Every field has a default, so a
/// config file only needs to name the values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// World units per grid cell.
    pub cell_size: i32,
    /// How many cells a rail walk may cover.
    pub max_extent: u32,
    /// Radius, in world units, of the rail segment scan around a stop.
    pub rail_scan_radius: i32,
    /// Duration of a quarter turn.
    pub rotation_ticks: Ticks,
    /// Movement duration per traversed cell.
    pub ticks_per_cell: Ticks,
    /// Require a connector on the neighbour pointing back before power can
    /// cross between two blocks.
    pub require_reciprocal_connectors: bool,
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            max_extent: 9,
            rail_scan_radius: 1,
            rotation_ticks: 50,
            ticks_per_cell: 50,
            require_reciprocal_connectors: false,
            event_capacity: 256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config: WorldConfig =
            serde_json::from_str(r#"{ "rotation_ticks": 10, "require_reciprocal_connectors": true }"#)
                .unwrap();
        assert_eq!(config.rotation_ticks, 10);
        assert!(config.require_reciprocal_connectors);
        assert_eq!(config.cell_size, 5);
        assert_eq!(config.max_extent, 9);
    }
}
