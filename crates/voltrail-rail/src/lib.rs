//! Rail network: the stops blocks rest on and the track between them.
//!
//! A [`RailStop`] records which directions have track leaving it
//! (`connected_rails`) and which block currently rests on it. Track is made
//! of [`RailSegment`]s placed next to stops; a stop discovers its adjacency
//! by scanning a small radius around itself for segments.
//!
//! Segments may be chained into runs of any length ("long rails"), so the
//! stop reached by moving in a direction is not necessarily the adjacent
//! cell. [`RailNetwork::next_stop`] walks cell by cell up to the world's
//! extent to find it.
//!
//! Stop coordinates are indexed by the [`SpatialGrid`]; this crate owns the
//! stop and segment records themselves.

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::BTreeMap;
use voltrail_core::coord::{Coordinate, Direction};
use voltrail_core::id::{BlockId, RailSegmentId, RailStopId};
use voltrail_spatial::SpatialGrid;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A single piece of track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RailSegment {
    pub position: Coordinate,
}

/// A node of the rail network that a block can rest on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailStop {
    pub position: Coordinate,
    connected_rails: BTreeMap<Direction, RailSegmentId>,
    occupant: Option<BlockId>,
    reserved_by: Option<BlockId>,
}

impl RailStop {
    fn new(position: Coordinate) -> Self {
        Self {
            position,
            connected_rails: BTreeMap::new(),
            occupant: None,
            reserved_by: None,
        }
    }

    /// Directions with traversable track, and the segment found there.
    pub fn connected_rails(&self) -> &BTreeMap<Direction, RailSegmentId> {
        &self.connected_rails
    }

    pub fn occupant(&self) -> Option<BlockId> {
        self.occupant
    }

    /// The block that has claimed this stop as its destination, if any.
    pub fn reserved_by(&self) -> Option<BlockId> {
        self.reserved_by
    }

    pub fn has_block(&self) -> bool {
        self.occupant.is_some()
    }
}

/// Errors from rail network operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RailError {
    #[error("unknown rail stop")]
    UnknownStop,
    #[error("rail stop is held by another block")]
    StopOccupied { holder: BlockId },
    #[error("a rail segment already exists at {coord}")]
    DuplicateSegment { coord: Coordinate },
}

// ---------------------------------------------------------------------------
// RailNetwork
// ---------------------------------------------------------------------------

/// All rail stops and segments of a world.
#[derive(Debug)]
pub struct RailNetwork {
    stops: SlotMap<RailStopId, RailStop>,
    segments: SlotMap<RailSegmentId, RailSegment>,
    segment_cells: BTreeMap<Coordinate, RailSegmentId>,
    /// Radius (world units, Chebyshev) of the adjacency scan.
    scan_radius: i32,
    /// Maximum number of cells walked by `next_stop`.
    max_extent: u32,
}

impl RailNetwork {
    pub fn new(scan_radius: i32, max_extent: u32) -> Self {
        Self {
            stops: SlotMap::with_key(),
            segments: SlotMap::with_key(),
            segment_cells: BTreeMap::new(),
            scan_radius: scan_radius.max(1),
            max_extent,
        }
    }

    // -- Construction --

    /// Create a stop record. The caller registers its coordinate on the grid.
    pub fn add_stop(&mut self, position: Coordinate) -> RailStopId {
        self.stops.insert(RailStop::new(position))
    }

    /// Place a rail segment. Adjacency is not updated until
    /// [`populate_adjacency`](Self::populate_adjacency) runs.
    pub fn add_segment(&mut self, position: Coordinate) -> Result<RailSegmentId, RailError> {
        if self.segment_cells.contains_key(&position) {
            return Err(RailError::DuplicateSegment { coord: position });
        }
        let id = self.segments.insert(RailSegment { position });
        self.segment_cells.insert(position, id);
        Ok(id)
    }

    /// Rebuild a stop's adjacency from the segments within the scan radius.
    ///
    /// Each axis-aligned segment contributes its direction; if several
    /// segments lie in the same direction the nearest wins. Any previous
    /// adjacency is discarded, so the call is idempotent. Returns the number
    /// of directions found.
    pub fn populate_adjacency(&mut self, stop: RailStopId) -> Result<usize, RailError> {
        let origin = self.stops.get(stop).ok_or(RailError::UnknownStop)?.position;
        let r = self.scan_radius;
        let min = Coordinate::new(origin.x - r, origin.y - r, origin.z - r);
        let max = Coordinate::new(origin.x + r, origin.y + r, origin.z + r);

        let mut found: BTreeMap<Direction, (u32, RailSegmentId)> = BTreeMap::new();
        for (&pos, &segment) in self.segment_cells.range(min..=max) {
            if pos == origin || origin.chebyshev_distance(&pos) > r as u32 {
                continue;
            }
            let (dx, dy, dz) = origin.delta_to(pos);
            let Some(direction) = Direction::from_delta(dx, dy, dz) else {
                continue;
            };
            let distance = origin.manhattan_distance(&pos);
            match found.get(&direction) {
                Some(&(best, _)) if best <= distance => {}
                _ => {
                    found.insert(direction, (distance, segment));
                }
            }
        }

        let record = self.stops.get_mut(stop).ok_or(RailError::UnknownStop)?;
        record.connected_rails = found.into_iter().map(|(d, (_, s))| (d, s)).collect();
        tracing::trace!(
            stop = ?stop,
            directions = record.connected_rails.len(),
            "populated rail adjacency"
        );
        Ok(record.connected_rails.len())
    }

    /// Rebuild adjacency for every stop.
    pub fn populate_all(&mut self) -> Result<(), RailError> {
        let ids: Vec<RailStopId> = self.stops.keys().collect();
        for id in ids {
            self.populate_adjacency(id)?;
        }
        Ok(())
    }

    // -- Queries --

    pub fn stop(&self, stop: RailStopId) -> Option<&RailStop> {
        self.stops.get(stop)
    }

    pub fn segment(&self, segment: RailSegmentId) -> Option<&RailSegment> {
        self.segments.get(segment)
    }

    pub fn stops(&self) -> impl Iterator<Item = (RailStopId, &RailStop)> {
        self.stops.iter()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Whether track leaves `stop` in `direction`.
    pub fn is_legal_move(&self, stop: RailStopId, direction: Direction) -> bool {
        self.stops
            .get(stop)
            .is_some_and(|s| s.connected_rails.contains_key(&direction))
    }

    /// Directions in which track leaves `stop`, in a stable order.
    pub fn connected_directions(&self, stop: RailStopId) -> Vec<Direction> {
        self.stops
            .get(stop)
            .map(|s| s.connected_rails.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a block could come to rest on `stop` right now.
    ///
    /// A stop is unavailable while it has an occupant, while another move
    /// has reserved it, or while any block sits at its coordinate.
    pub fn is_available(&self, grid: &SpatialGrid, stop: RailStopId) -> bool {
        let Some(record) = self.stops.get(stop) else {
            return false;
        };
        record.occupant.is_none()
            && record.reserved_by.is_none()
            && grid.block_at(record.position).is_none()
    }

    /// The first stop reached from `from` walking in `direction`.
    ///
    /// Walks in steps of one grid cell, up to the world's extent. Returns
    /// `None` if no stop is found within the bound, or if the first stop
    /// found is unavailable (see [`is_available`](Self::is_available)).
    pub fn next_stop(
        &self,
        grid: &SpatialGrid,
        from: RailStopId,
        direction: Direction,
    ) -> Option<RailStopId> {
        let origin = self.stops.get(from)?.position;
        let step = grid.cell_size();
        for i in 1..self.max_extent as i32 {
            let Some(candidate) = grid.rail_stop_at(origin.offset(direction, step * i)) else {
                continue;
            };
            if self.is_available(grid, candidate) {
                return Some(candidate);
            }
            tracing::trace!(stop = ?candidate, "next stop is unavailable");
            return None;
        }
        None
    }

    // -- Occupancy --

    /// Place `block` on `stop`. Clears a reservation held by the same block.
    pub fn occupy(&mut self, stop: RailStopId, block: BlockId) -> Result<(), RailError> {
        let record = self.stops.get_mut(stop).ok_or(RailError::UnknownStop)?;
        if let Some(holder) = record.occupant.filter(|&b| b != block) {
            return Err(RailError::StopOccupied { holder });
        }
        if let Some(holder) = record.reserved_by.filter(|&b| b != block) {
            return Err(RailError::StopOccupied { holder });
        }
        record.occupant = Some(block);
        record.reserved_by = None;
        Ok(())
    }

    /// Remove whatever block rests on `stop`, returning it.
    pub fn vacate(&mut self, stop: RailStopId) -> Result<Option<BlockId>, RailError> {
        let record = self.stops.get_mut(stop).ok_or(RailError::UnknownStop)?;
        Ok(record.occupant.take())
    }

    /// Claim `stop` as the destination of an in-flight move.
    pub fn reserve(&mut self, stop: RailStopId, block: BlockId) -> Result<(), RailError> {
        let record = self.stops.get_mut(stop).ok_or(RailError::UnknownStop)?;
        if let Some(holder) = record.occupant.or(record.reserved_by).filter(|&b| b != block) {
            return Err(RailError::StopOccupied { holder });
        }
        record.reserved_by = Some(block);
        Ok(())
    }

    pub fn occupant(&self, stop: RailStopId) -> Option<BlockId> {
        self.stops.get(stop).and_then(|s| s.occupant)
    }
}

impl Default for RailNetwork {
    fn default() -> Self {
        Self::new(1, 9)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voltrail_core::coord::Rotation;
    use voltrail_core::test_utils::*;

    /// Register a stop on both the network and the grid.
    fn add_stop(net: &mut RailNetwork, grid: &mut SpatialGrid, at: Coordinate) -> RailStopId {
        let id = net.add_stop(at);
        grid.register_rail_stop(at, id).unwrap();
        id
    }

    /// Lay track one unit out from `at` in each direction given.
    fn add_rails(net: &mut RailNetwork, at: Coordinate, dirs: &[Direction]) {
        for &d in dirs {
            net.add_segment(at.offset(d, 1)).unwrap();
        }
    }

    // -----------------------------------------------------------------------
    // Adjacency
    // -----------------------------------------------------------------------

    #[test]
    fn populate_finds_axis_aligned_segments() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let stop = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        add_rails(&mut net, cell(0, 0, 0), &[Direction::East, Direction::North]);

        assert_eq!(net.populate_adjacency(stop).unwrap(), 2);
        assert!(net.is_legal_move(stop, Direction::East));
        assert!(net.is_legal_move(stop, Direction::North));
        assert!(!net.is_legal_move(stop, Direction::West));
        assert_eq!(
            net.connected_directions(stop),
            vec![Direction::East, Direction::North]
        );
    }

    #[test]
    fn populate_all_covers_every_stop() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let west = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        let east = add_stop(&mut net, &mut grid, cell(1, 0, 0));
        add_rails(&mut net, cell(0, 0, 0), &[Direction::East]);
        add_rails(&mut net, cell(1, 0, 0), &[Direction::West]);

        net.populate_all().unwrap();
        assert_eq!(net.connected_directions(west), vec![Direction::East]);
        assert_eq!(net.connected_directions(east), vec![Direction::West]);
    }

    #[test]
    fn populate_ignores_distant_and_diagonal_segments() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let stop = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        net.add_segment(Coordinate::new(3, 0, 0)).unwrap();
        net.add_segment(Coordinate::new(1, 0, 1)).unwrap();

        assert_eq!(net.populate_adjacency(stop).unwrap(), 0);
    }

    #[test]
    fn populate_is_idempotent_and_overwrites() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let stop = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        add_rails(&mut net, cell(0, 0, 0), &[Direction::East]);

        net.populate_adjacency(stop).unwrap();
        net.populate_adjacency(stop).unwrap();
        assert_eq!(net.stop(stop).unwrap().connected_rails().len(), 1);

        add_rails(&mut net, cell(0, 0, 0), &[Direction::South]);
        net.populate_adjacency(stop).unwrap();
        assert_eq!(
            net.connected_directions(stop),
            vec![Direction::East, Direction::South]
        );
    }

    #[test]
    fn duplicate_segment_is_rejected() {
        let mut net = RailNetwork::default();
        net.add_segment(Coordinate::new(1, 0, 0)).unwrap();
        let err = net.add_segment(Coordinate::new(1, 0, 0)).unwrap_err();
        assert!(matches!(err, RailError::DuplicateSegment { .. }));
    }

    #[test]
    fn populate_unknown_stop_errors() {
        let mut net = RailNetwork::default();
        let ghost = make_stop_ids(1)[0];
        assert_eq!(net.populate_adjacency(ghost), Err(RailError::UnknownStop));
    }

    // -----------------------------------------------------------------------
    // next_stop
    // -----------------------------------------------------------------------

    #[test]
    fn next_stop_finds_adjacent_cell() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let a = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        let b = add_stop(&mut net, &mut grid, cell(1, 0, 0));

        assert_eq!(net.next_stop(&grid, a, Direction::East), Some(b));
        assert_eq!(net.next_stop(&grid, b, Direction::West), Some(a));
        assert_eq!(net.next_stop(&grid, a, Direction::West), None);
    }

    #[test]
    fn next_stop_crosses_long_rails() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let a = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        let far = add_stop(&mut net, &mut grid, cell(0, 0, 4));

        assert_eq!(net.next_stop(&grid, a, Direction::North), Some(far));
    }

    #[test]
    fn next_stop_respects_extent_bound() {
        let mut net = RailNetwork::new(1, 3);
        let mut grid = SpatialGrid::default();
        let a = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        add_stop(&mut net, &mut grid, cell(3, 0, 0));

        assert_eq!(net.next_stop(&grid, a, Direction::East), None);
    }

    #[test]
    fn next_stop_returns_none_when_first_stop_is_occupied() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let blocks = make_block_ids(1);
        let a = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        let b = add_stop(&mut net, &mut grid, cell(1, 0, 0));
        add_stop(&mut net, &mut grid, cell(2, 0, 0));

        net.occupy(b, blocks[0]).unwrap();
        // The walk stops at the first stop; it does not skip past it.
        assert_eq!(net.next_stop(&grid, a, Direction::East), None);
    }

    #[test]
    fn next_stop_treats_reserved_and_blocked_stops_as_unavailable() {
        let mut net = RailNetwork::default();
        let mut grid = SpatialGrid::default();
        let blocks = make_block_ids(2);
        let a = add_stop(&mut net, &mut grid, cell(0, 0, 0));
        let east = add_stop(&mut net, &mut grid, cell(1, 0, 0));
        let north = add_stop(&mut net, &mut grid, cell(0, 0, 1));

        net.reserve(east, blocks[0]).unwrap();
        grid.register_block(cell(0, 0, 1), blocks[1], Rotation::None)
            .unwrap();

        assert_eq!(net.next_stop(&grid, a, Direction::East), None);
        assert_eq!(net.next_stop(&grid, a, Direction::North), None);
        assert!(!net.is_available(&grid, north));
    }

    // -----------------------------------------------------------------------
    // Occupancy
    // -----------------------------------------------------------------------

    #[test]
    fn occupy_and_vacate() {
        let mut net = RailNetwork::default();
        let blocks = make_block_ids(2);
        let stop = net.add_stop(cell(0, 0, 0));

        net.occupy(stop, blocks[0]).unwrap();
        assert_eq!(net.occupant(stop), Some(blocks[0]));
        assert_eq!(
            net.occupy(stop, blocks[1]),
            Err(RailError::StopOccupied { holder: blocks[0] })
        );

        assert_eq!(net.vacate(stop).unwrap(), Some(blocks[0]));
        assert_eq!(net.occupant(stop), None);
        assert!(!net.stop(stop).unwrap().has_block());
    }

    #[test]
    fn reservation_converts_to_occupancy() {
        let mut net = RailNetwork::default();
        let blocks = make_block_ids(2);
        let stop = net.add_stop(cell(0, 0, 0));

        net.reserve(stop, blocks[0]).unwrap();
        assert!(net.reserve(stop, blocks[1]).is_err());
        assert!(net.occupy(stop, blocks[1]).is_err());

        net.occupy(stop, blocks[0]).unwrap();
        let record = net.stop(stop).unwrap();
        assert_eq!(record.occupant(), Some(blocks[0]));
        assert_eq!(record.reserved_by(), None);
    }
}
