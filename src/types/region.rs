//! Spatial addressing: region keys and block positions.
//!
//! A region is a coarse grid cell of 16x16 blocks inside a world. Block
//! coordinates resolve to region coordinates with an arithmetic shift by 4,
//! so negative coordinates floor (block `-1` lives in region `-1`).

use super::WorldId;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Number of bits a block coordinate is shifted by to obtain its region cell.
pub const REGION_SHIFT: u32 = 4;

/// Identifies one region cell: `(world, x, z)`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionKey {
    /// The world the cell belongs to.
    pub world: WorldId,
    /// Region-grid X coordinate.
    pub x: i32,
    /// Region-grid Z coordinate.
    pub z: i32,
}

impl RegionKey {
    /// Creates a region key from region-grid coordinates.
    #[must_use]
    pub fn new(world: WorldId, x: i32, z: i32) -> Self {
        Self { world, x, z }
    }

    /// Returns the key of the region containing the given block coordinates.
    #[must_use]
    pub fn containing(world: WorldId, block_x: i32, block_z: i32) -> Self {
        Self {
            world,
            x: block_x >> REGION_SHIFT,
            z: block_z >> REGION_SHIFT,
        }
    }
}

impl fmt::Debug for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionKey({}, {}, {})", self.world, self.x, self.z)
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{},{}]", self.world, self.x, self.z)
    }
}

impl From<(WorldId, i32, i32)> for RegionKey {
    fn from((world, x, z): (WorldId, i32, i32)) -> Self {
        Self::new(world, x, z)
    }
}

impl From<&BlockPos> for RegionKey {
    fn from(pos: &BlockPos) -> Self {
        pos.region()
    }
}

impl From<BlockPos> for RegionKey {
    fn from(pos: BlockPos) -> Self {
        pos.region()
    }
}

/// A block position inside a world.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// The world of the position.
    pub world: WorldId,
    /// Block X coordinate.
    pub x: i32,
    /// Block Y coordinate (does not participate in region resolution).
    pub y: i32,
    /// Block Z coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Creates a block position.
    #[must_use]
    pub fn new(world: WorldId, x: i32, y: i32, z: i32) -> Self {
        Self { world, x, y, z }
    }

    /// Returns the region cell that owns this position.
    #[must_use]
    pub fn region(&self) -> RegionKey {
        RegionKey::containing(self.world.clone(), self.x, self.z)
    }
}

impl fmt::Debug for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BlockPos({}, {}, {}, {})",
            self.world, self.x, self.y, self.z
        )
    }
}
