//! Discrete 3D coordinates, axis-aligned directions and vertical-axis
//! rotations.
//!
//! Coordinates are integer world units. Blocks and rail stops sit on
//! multiples of the world's cell size, while rail segments sit between them,
//! so neighbour lookups always step by an explicit `step` in world units.
//!
//! Axis convention: `+Y` is up, `+Z` is north, `+X` is east. Rotations turn
//! about the vertical axis; a clockwise quarter turn (seen from above) maps
//! north to east.

use serde::{Deserialize, Serialize};

/// Default number of world units per grid cell.
pub const DEFAULT_CELL_SIZE: i32 = 5;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A position in world units. Equality and hashing are exact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    pub const ORIGIN: Coordinate = Coordinate { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The coordinate `steps` world units away in `direction`.
    pub fn offset(self, direction: Direction, steps: i32) -> Coordinate {
        let (dx, dy, dz) = direction.offset();
        Coordinate::new(
            self.x + dx * steps,
            self.y + dy * steps,
            self.z + dz * steps,
        )
    }

    /// Component-wise difference `other - self`.
    pub fn delta_to(self, other: Coordinate) -> (i32, i32, i32) {
        (other.x - self.x, other.y - self.y, other.z - self.z)
    }

    /// Manhattan distance to another coordinate, in world units.
    pub fn manhattan_distance(&self, other: &Coordinate) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }

    /// Chebyshev (chessboard) distance to another coordinate, in world units.
    pub fn chebyshev_distance(&self, other: &Coordinate) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
            .max((self.z - other.z).unsigned_abs())
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl From<[i32; 3]> for Coordinate {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Coordinate::new(x, y, z)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the six axis-aligned unit vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    East,
    West,
    Up,
    Down,
    North,
    South,
}

impl Direction {
    /// All six directions.
    pub fn all() -> [Direction; 6] {
        [
            Direction::East,
            Direction::West,
            Direction::Up,
            Direction::Down,
            Direction::North,
            Direction::South,
        ]
    }

    /// Unit offset for this direction.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
            Direction::North => (0, 0, 1),
            Direction::South => (0, 0, -1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
        }
    }

    /// The direction of an axis-aligned vector of any non-zero length.
    ///
    /// Returns `None` for the zero vector and for vectors with more than
    /// one non-zero component (diagonals).
    pub fn from_delta(dx: i32, dy: i32, dz: i32) -> Option<Direction> {
        match (dx.signum(), dy.signum(), dz.signum()) {
            (1, 0, 0) => Some(Direction::East),
            (-1, 0, 0) => Some(Direction::West),
            (0, 1, 0) => Some(Direction::Up),
            (0, -1, 0) => Some(Direction::Down),
            (0, 0, 1) => Some(Direction::North),
            (0, 0, -1) => Some(Direction::South),
            _ => None,
        }
    }

    /// This direction turned by `rotation` about the vertical axis.
    /// Vertical directions are unaffected.
    pub fn rotated(self, rotation: Rotation) -> Direction {
        let mut dir = self;
        for _ in 0..rotation.quarter_turns() {
            dir = match dir {
                Direction::North => Direction::East,
                Direction::East => Direction::South,
                Direction::South => Direction::West,
                Direction::West => Direction::North,
                vertical => vertical,
            };
        }
        dir
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Orientation of a block about the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90 degrees clockwise.
    Cw90,
    /// 180 degrees.
    Cw180,
    /// 270 degrees clockwise (90 degrees counter-clockwise).
    Cw270,
}

impl Rotation {
    /// All four rotation values.
    pub fn all() -> [Rotation; 4] {
        [
            Rotation::None,
            Rotation::Cw90,
            Rotation::Cw180,
            Rotation::Cw270,
        ]
    }

    /// Rotate 90 degrees clockwise.
    pub fn rotate_cw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw90,
            Rotation::Cw90 => Rotation::Cw180,
            Rotation::Cw180 => Rotation::Cw270,
            Rotation::Cw270 => Rotation::None,
        }
    }

    /// Rotate 90 degrees counter-clockwise.
    pub fn rotate_ccw(self) -> Self {
        match self {
            Rotation::None => Rotation::Cw270,
            Rotation::Cw90 => Rotation::None,
            Rotation::Cw180 => Rotation::Cw90,
            Rotation::Cw270 => Rotation::Cw180,
        }
    }

    /// Number of clockwise quarter turns from [`Rotation::None`].
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 1,
            Rotation::Cw180 => 2,
            Rotation::Cw270 => 3,
        }
    }

    /// Clockwise yaw in degrees, `0..360`.
    pub fn degrees(self) -> i32 {
        self.quarter_turns() as i32 * 90
    }
}
