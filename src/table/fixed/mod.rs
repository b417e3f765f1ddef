//! Two-level composition: a large primary table backed by a small
//! secondary overflow table.
//!
//! Allocation tries the primary first and falls back to the secondary, so
//! a saturated primary bucket costs one extra hash instead of a failure.
//! The low bit of the tiny pointer records which sub-table hosts the slot;
//! with buckets capped at 32 slots the whole handle still fits in six bits.

use log::debug;
use parking_lot::Mutex;

use crate::error::{Result, TableError};
use crate::table::simple::SimpleTable;
use crate::table::{AllocOps, TinyPtr};

/// Share of the total capacity given to the primary table.
const PRIMARY_SHARE: f64 = 0.90;

const SECONDARY_FLAG: TinyPtr = 1;

#[inline]
fn encode(slot: TinyPtr, flag: TinyPtr) -> TinyPtr {
    (slot << 1) | flag
}

#[inline]
fn decode(ptr: TinyPtr) -> (TinyPtr, TinyPtr) {
    (ptr >> 1, ptr & 1)
}

/// Primary/secondary pair under a single tag-bit handle.
#[derive(Debug)]
pub struct FixedTable {
    gate: Mutex<()>,
    primary: SimpleTable,
    secondary: SimpleTable,
}

impl FixedTable {
    /// Split `total_capacity` 90/10 into a primary and a secondary table,
    /// both at `load_factor` occupancy.
    ///
    /// Capacities too small for both shares to stay non-zero fail with
    /// [`TableError::InvalidCapacity`], the same way either sub-table
    /// would.
    pub fn create(total_capacity: usize, load_factor: f64) -> Result<Self> {
        let primary_capacity = (total_capacity as f64 * PRIMARY_SHARE) as usize;
        let secondary_capacity = total_capacity - primary_capacity;
        let primary = SimpleTable::create(primary_capacity, load_factor)?;
        let secondary = SimpleTable::create(secondary_capacity, load_factor)?;
        debug!(
            "fixed table: capacity={} primary={} secondary={}",
            total_capacity, primary_capacity, secondary_capacity
        );
        Ok(Self {
            gate: Mutex::new(()),
            primary,
            secondary,
        })
    }

    /// Place `value` under `key`: primary first, secondary on saturation.
    /// Fails with [`TableError::Saturated`] only when both buckets are
    /// full.
    pub fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        let _gate = self.gate.lock();
        match self.primary.allocate(key, value) {
            Ok(slot) => Ok(encode(slot, 0)),
            Err(TableError::Saturated) => self
                .secondary
                .allocate(key, value)
                .map(|slot| encode(slot, SECONDARY_FLAG)),
            Err(e) => Err(e),
        }
    }

    /// Read the slot addressed by `key` and `ptr` from the sub-table the
    /// tag bit names.
    pub fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let (slot, flag) = decode(ptr);
        let _gate = self.gate.lock();
        if flag == 0 {
            self.primary.dereference(key, slot)
        } else {
            self.secondary.dereference(key, slot)
        }
    }

    /// Checked variant of [`FixedTable::dereference`].
    pub fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let (slot, flag) = decode(ptr);
        let _gate = self.gate.lock();
        if flag == 0 {
            self.primary.dereference_checked(key, slot)
        } else {
            self.secondary.dereference_checked(key, slot)
        }
    }

    /// Release the slot addressed by `key` and `ptr`.
    pub fn free(&self, key: i32, ptr: TinyPtr) {
        let (slot, flag) = decode(ptr);
        let _gate = self.gate.lock();
        if flag == 0 {
            self.primary.free(key, slot)
        } else {
            self.secondary.free(key, slot)
        }
    }

    /// Live entries across both sub-tables.
    pub fn len(&self) -> usize {
        let _gate = self.gate.lock();
        self.primary.len() + self.secondary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Combined requested capacity of both sub-tables.
    pub fn capacity(&self) -> usize {
        let _gate = self.gate.lock();
        self.primary.capacity() + self.secondary.capacity()
    }
}

impl AllocOps for FixedTable {
    #[inline]
    fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        FixedTable::allocate(self, key, value)
    }
    #[inline]
    fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        FixedTable::dereference(self, key, ptr)
    }
    #[inline]
    fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        FixedTable::dereference_checked(self, key, ptr)
    }
    #[inline]
    fn free(&self, key: i32, ptr: TinyPtr) {
        FixedTable::free(self, key, ptr)
    }
}
