//! Sharded composition with cascading overflow.
//!
//! Keys shard across an array of containers by an unseeded hash; inside a
//! container, allocation walks a stack of simple-table levels and takes the
//! first free slot, so a saturated bucket in level 0 is caught by level 1
//! and so on. The tiny pointer packs all three coordinates:
//!
//! ```text
//! bit 15..8   container index
//! bit  7..4   level
//! bit  3..0   slot
//! ```
//!
//! The field widths bound the geometry; [`VariableTable::create`] enforces
//! the bounds instead of letting handles truncate.

use log::debug;
use parking_lot::Mutex;

use crate::error::{Result, TableError};
use crate::hash;
use crate::table::simple::SimpleTable;
use crate::table::{AllocOps, TinyPtr};

/// Container index is an eight-bit handle field.
pub(crate) const MAX_CONTAINERS: usize = 256;

/// Level is a four-bit handle field.
pub(crate) const MAX_LEVELS: usize = 16;

/// Slot is a four-bit handle field, so sub-table buckets are capped at 16
/// slots instead of the simple table's 32.
const SUB_BUCKET_CAP: usize = 16;

#[inline]
fn encode(container: usize, level: usize, slot: TinyPtr) -> TinyPtr {
    ((container as TinyPtr) << 8) | ((level as TinyPtr) << 4) | (slot & 0xf)
}

#[inline]
fn decode(ptr: TinyPtr) -> (usize, usize, TinyPtr) {
    (
        ((ptr >> 8) & 0xff) as usize,
        ((ptr >> 4) & 0xf) as usize,
        ptr & 0xf,
    )
}

/// A stack of simple tables forming one overflow cascade.
#[derive(Debug)]
struct Container {
    levels: Vec<SimpleTable>,
}

impl Container {
    fn create(level_count: usize, level_capacity: usize, load_factor: f64) -> Result<Self> {
        let levels = (0..level_count)
            .map(|_| SimpleTable::with_bucket_cap(level_capacity, load_factor, SUB_BUCKET_CAP))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { levels })
    }

    fn len(&self) -> usize {
        self.levels.iter().map(|t| t.len()).sum()
    }
}

/// Container array with per-container level cascades.
#[derive(Debug)]
pub struct VariableTable {
    gate: Mutex<()>,
    containers: Vec<Container>,
    level_count: usize,
    total_capacity: usize,
}

impl VariableTable {
    /// Create `⌈total_capacity / container_capacity⌉` containers, each a
    /// cascade of `level_count` simple tables sized
    /// `max(container_capacity / level_count, 1)`.
    ///
    /// Geometries that do not fit the handle encoding (more than 256
    /// containers, more than 16 levels) fail with
    /// [`TableError::GeometryOverflow`].
    pub fn create(
        total_capacity: usize,
        container_capacity: usize,
        level_count: usize,
        load_factor: f64,
    ) -> Result<Self> {
        if total_capacity == 0 || container_capacity == 0 {
            return Err(TableError::InvalidCapacity);
        }
        if level_count == 0 || level_count > MAX_LEVELS {
            return Err(TableError::GeometryOverflow);
        }
        let container_count = (total_capacity + container_capacity - 1) / container_capacity;
        if container_count > MAX_CONTAINERS {
            return Err(TableError::GeometryOverflow);
        }
        let level_capacity = (container_capacity / level_count).max(1);
        let containers = (0..container_count)
            .map(|_| Container::create(level_count, level_capacity, load_factor))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "variable table: capacity={} containers={} levels={} level_capacity={}",
            total_capacity, container_count, level_count, level_capacity
        );
        Ok(Self {
            gate: Mutex::new(()),
            containers,
            level_count,
            total_capacity,
        })
    }

    /// Place `value` under `key` in the first level of its container with a
    /// free slot. Fails with [`TableError::Saturated`] once the whole
    /// cascade is exhausted for that key.
    pub fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        let _gate = self.gate.lock();
        let container = (hash::shard(key) as usize) % self.containers.len();
        for (level, table) in self.containers[container].levels.iter().enumerate() {
            match table.allocate(key, value) {
                Ok(slot) => return Ok(encode(container, level, slot)),
                Err(TableError::Saturated) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(TableError::Saturated)
    }

    /// Read the slot addressed by `key` and `ptr`.
    pub fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let (container, level, slot) = decode(ptr);
        let _gate = self.gate.lock();
        self.level_table(container, level)
            .ok_or(TableError::PointerOutOfRange(ptr))?
            .dereference(key, slot)
    }

    /// Checked variant of [`VariableTable::dereference`].
    pub fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let (container, level, slot) = decode(ptr);
        let _gate = self.gate.lock();
        self.level_table(container, level)
            .ok_or(TableError::PointerOutOfRange(ptr))?
            .dereference_checked(key, slot)
    }

    /// Release the slot addressed by `key` and `ptr`. Pointers naming a
    /// container or level that does not exist are ignored.
    pub fn free(&self, key: i32, ptr: TinyPtr) {
        let (container, level, slot) = decode(ptr);
        let _gate = self.gate.lock();
        if let Some(table) = self.level_table(container, level) {
            table.free(key, slot);
        }
    }

    #[inline]
    fn level_table(&self, container: usize, level: usize) -> Option<&SimpleTable> {
        self.containers.get(container).and_then(|c| c.levels.get(level))
    }

    /// Live entries across every container and level.
    pub fn len(&self) -> usize {
        let _gate = self.gate.lock();
        self.containers.iter().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items the table was asked to host.
    pub fn capacity(&self) -> usize {
        self.total_capacity
    }

    pub fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }
}

impl AllocOps for VariableTable {
    #[inline]
    fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        VariableTable::allocate(self, key, value)
    }
    #[inline]
    fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        VariableTable::dereference(self, key, ptr)
    }
    #[inline]
    fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        VariableTable::dereference_checked(self, key, ptr)
    }
    #[inline]
    fn free(&self, key: i32, ptr: TinyPtr) {
        VariableTable::free(self, key, ptr)
    }
}
