//! # Geometry
//!
//! Pure value types describing where a connection's signal lines live in the
//! simulated 3-D world. Nothing in this module touches the world itself: a
//! [`Layout`] is only a recipe mapping a bit index to a physical position,
//! which keeps the geometry trivially testable in isolation.
//!
//! ## Coordinate Model
//!
//! - [`Position`] is an absolute world coordinate.
//! - [`BlockOffset`] is a relative vector. Offsets compose by addition and
//!   integer scaling, so "the Nth bit of a line" is always
//!   `origin + start + spacing * N`.
//!
//! ## Layouts
//!
//! A [`Layout`] holds two origin+spacing pairs, one for the address line and
//! one for the data line, both relative to the connection origin. The `flip_*`
//! transforms reverse which physical end of a line carries the most
//! significant bit; they are pure value transformations that recompute
//! origin+spacing rather than mutating enumeration order, so the *set* of
//! occupied positions never changes.
//!
//! Named layout presets (`line`, `towers`, `diag:*`) live in [`presets`].

pub mod presets;

pub use presets::{LayoutSpec, Layouts};

/// Offset from the connection origin to its strobe line. Shared by every
/// preset so the strobe never collides with an address or data position.
pub const STROBE_OFFSET: BlockOffset = BlockOffset::new(0, 1, 0);

/// Absolute position in the simulated world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Position displaced by `offset`.
    pub const fn offset(self, offset: BlockOffset) -> Self {
        Self {
            x: self.x + offset.dx,
            y: self.y + offset.dy,
            z: self.z + offset.dz,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Relative vector between world positions. Pure value type, no identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockOffset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl BlockOffset {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(dx: i32, dy: i32, dz: i32) -> Self {
        Self { dx, dy, dz }
    }

    /// Scale by an integer factor.
    pub const fn mul(self, factor: i32) -> Self {
        Self {
            dx: self.dx * factor,
            dy: self.dy * factor,
            dz: self.dz * factor,
        }
    }

    pub const fn add(self, other: Self) -> Self {
        Self {
            dx: self.dx + other.dx,
            dy: self.dy + other.dy,
            dz: self.dz + other.dz,
        }
    }

    /// Negation, pointing the opposite way.
    pub const fn inv(self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            dz: -self.dz,
        }
    }

    /// Step `steps` times from `base` along this offset.
    pub const fn walk(self, base: Position, steps: i32) -> Position {
        base.offset(self.mul(steps))
    }

    pub const fn is_zero(self) -> bool {
        self.dx == 0 && self.dy == 0 && self.dz == 0
    }
}

/// Cardinal direction a connection extends in. Round-trips through the
/// single-letter names used by host-side configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Unit offset for one step in this direction.
    pub const fn spacing(self) -> BlockOffset {
        match self {
            Direction::North => BlockOffset::new(0, 0, -1),
            Direction::South => BlockOffset::new(0, 0, 1),
            Direction::East => BlockOffset::new(1, 0, 0),
            Direction::West => BlockOffset::new(-1, 0, 0),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::South => "s",
            Direction::East => "e",
            Direction::West => "w",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "n" => Some(Direction::North),
            "s" => Some(Direction::South),
            "e" => Some(Direction::East),
            "w" => Some(Direction::West),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a connection's bus lines sit, relative to its origin.
///
/// `address` and `data` locate bit 0 of each line as enumerated physically;
/// whether that end carries the most significant bit is decided by the flip
/// transforms applied when the layout was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub address: BlockOffset,
    pub address_spacing: BlockOffset,
    pub data: BlockOffset,
    pub data_spacing: BlockOffset,
}

impl Layout {
    /// True when both spacings are nonzero. A degenerate spacing would
    /// collapse every bit of a line onto a single position.
    pub const fn has_valid_spacing(&self) -> bool {
        !self.address_spacing.is_zero() && !self.data_spacing.is_zero()
    }

    /// Reverse the physical bit order of the address line.
    pub const fn flip_address(self, address_bits: u32) -> Self {
        Self {
            address: self.address.add(self.address_spacing.mul(address_bits as i32 - 1)),
            address_spacing: self.address_spacing.inv(),
            data: self.data,
            data_spacing: self.data_spacing,
        }
    }

    /// Reverse the physical bit order of the data line.
    pub const fn flip_data(self, data_bits: u32) -> Self {
        Self {
            address: self.address,
            address_spacing: self.address_spacing,
            data: self.data.add(self.data_spacing.mul(data_bits as i32 - 1)),
            data_spacing: self.data_spacing.inv(),
        }
    }
}
