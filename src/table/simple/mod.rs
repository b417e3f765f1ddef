//! Single-level bucketed slot allocator.
//!
//! Keys hash to exactly one bucket; a tiny pointer is the index of the slot
//! inside that bucket, so its width is bounded by the bucket size rather
//! than by the table size. A saturated bucket fails the allocation; there
//! is no probing into neighbouring buckets, that is what the fixed and
//! variable compositions are for.

use log::debug;
use parking_lot::Mutex;

use crate::error::{Result, TableError};
use crate::hash;
use crate::table::{AllocOps, TinyPtr};

/// Slots per bucket never exceed the width of the free mask.
pub(crate) const MAX_BUCKET_SIZE: usize = 32;

/// Stored in `keys` for released slots. Occupancy is decided by the free
/// masks alone, so a client key of the same value is still handled
/// correctly; the sentinel only keeps freed slots recognisable in a dump.
const EMPTY_KEY: i32 = -1;

/// Mask covering the low `n` bits.
#[inline]
fn low_bits(n: usize) -> u32 {
    debug_assert!(n >= 1 && n <= MAX_BUCKET_SIZE);
    u32::MAX >> (32 - n)
}

/// Slot arrays plus the geometry that addresses them.
///
/// Guarded as one unit by the table mutex: resize swaps the whole state,
/// including the seed, so geometry must never be read outside the lock.
#[derive(Debug)]
struct Core {
    requested_capacity: usize,
    bucket_size: usize,
    bucket_count: usize,
    store: Box<[i32]>,
    keys: Box<[i32]>,
    free_mask: Box<[u32]>,
    hash_seed: u32,
    load_factor: f64,
}

impl Core {
    fn with_geometry(capacity: usize, load_factor: f64, bucket_cap: usize) -> Result<Core> {
        if capacity == 0 {
            return Err(TableError::InvalidCapacity);
        }
        if !(load_factor > 0.0 && load_factor <= 1.0) {
            return Err(TableError::InvalidLoadFactor(load_factor));
        }
        let bucket_size = ((capacity.ilog2() / 2) as usize).clamp(8, bucket_cap);
        // Enough slots to keep occupancy at or below the load factor once
        // the bucket count is rounded up to a power of two.
        let min_slots = (capacity as f64 / load_factor).ceil() as usize;
        let bucket_count = ((min_slots + bucket_size - 1) / bucket_size).next_power_of_two();
        let total_slots = bucket_count * bucket_size;
        Ok(Core {
            requested_capacity: capacity,
            bucket_size,
            bucket_count,
            store: vec![0; total_slots].into_boxed_slice(),
            keys: vec![EMPTY_KEY; total_slots].into_boxed_slice(),
            free_mask: vec![low_bits(bucket_size); bucket_count].into_boxed_slice(),
            hash_seed: (capacity as u32) ^ 0x9e37_79b9,
            load_factor,
        })
    }

    #[inline]
    fn bucket_of(&self, key: i32) -> usize {
        (hash::mix(key, self.hash_seed) as usize) & (self.bucket_count - 1)
    }

    fn insert(&mut self, key: i32, value: i32) -> Result<TinyPtr> {
        let bucket = self.bucket_of(key);
        let mask = self.free_mask[bucket];
        if mask == 0 {
            return Err(TableError::Saturated);
        }
        // Lowest set bit: deterministic tie-break among free slots.
        let slot = mask.trailing_zeros() as usize;
        self.free_mask[bucket] &= !(1 << slot);
        let index = bucket * self.bucket_size + slot;
        self.keys[index] = key;
        self.store[index] = value;
        Ok(slot as TinyPtr)
    }

    fn read(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let slot = ptr as usize;
        if slot >= self.bucket_size {
            return Err(TableError::PointerOutOfRange(ptr));
        }
        let bucket = self.bucket_of(key);
        Ok(self.store[bucket * self.bucket_size + slot])
    }

    fn read_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        let slot = ptr as usize;
        if slot >= self.bucket_size {
            return Err(TableError::PointerOutOfRange(ptr));
        }
        let bucket = self.bucket_of(key);
        if self.free_mask[bucket] & (1 << slot) != 0 {
            return Err(TableError::KeyMismatch);
        }
        let index = bucket * self.bucket_size + slot;
        if self.keys[index] != key {
            return Err(TableError::KeyMismatch);
        }
        Ok(self.store[index])
    }

    fn release(&mut self, key: i32, ptr: TinyPtr) {
        let slot = ptr as usize;
        if slot >= self.bucket_size {
            return;
        }
        let bucket = self.bucket_of(key);
        let index = bucket * self.bucket_size + slot;
        self.keys[index] = EMPTY_KEY;
        self.store[index] = 0;
        self.free_mask[bucket] |= 1 << slot;
    }

    #[inline]
    fn total_slots(&self) -> usize {
        self.bucket_count * self.bucket_size
    }

    fn len(&self) -> usize {
        let free: usize = self.free_mask.iter().map(|m| m.count_ones() as usize).sum();
        self.total_slots() - free
    }

    /// Rehash every occupied slot into `next`.
    ///
    /// Occupancy is read off the free masks; the keys array only supplies
    /// the key to hash under the new seed.
    fn rehash_into(&self, next: &mut Core) -> Result<()> {
        for bucket in 0..self.bucket_count {
            let mut occupied = !self.free_mask[bucket] & low_bits(self.bucket_size);
            while occupied != 0 {
                let slot = occupied.trailing_zeros() as usize;
                occupied &= occupied - 1;
                let index = bucket * self.bucket_size + slot;
                next.insert(self.keys[index], self.store[index])?;
            }
        }
        Ok(())
    }
}

/// A hash-bucketed slot allocator handing out intra-bucket slot indexes.
///
/// The returned [`TinyPtr`] is only meaningful together with the key it was
/// allocated under: the key re-selects the bucket on every later operation,
/// the pointer picks the slot inside it.
#[derive(Debug)]
pub struct SimpleTable {
    core: Mutex<Core>,
}

impl SimpleTable {
    /// Create a table able to host `capacity` items at `load_factor`
    /// occupancy.
    pub fn create(capacity: usize, load_factor: f64) -> Result<Self> {
        Self::with_bucket_cap(capacity, load_factor, MAX_BUCKET_SIZE)
    }

    /// As [`SimpleTable::create`], with a caller-imposed ceiling on slots
    /// per bucket. The variable variant caps its sub-tables at 16 so slot
    /// indexes fit the four-bit field of its handle encoding.
    pub(crate) fn with_bucket_cap(
        capacity: usize,
        load_factor: f64,
        bucket_cap: usize,
    ) -> Result<Self> {
        let core = Core::with_geometry(capacity, load_factor, bucket_cap)?;
        debug!(
            "simple table: capacity={} buckets={} bucket_size={}",
            capacity, core.bucket_count, core.bucket_size
        );
        Ok(Self {
            core: Mutex::new(core),
        })
    }

    /// Place `value` under `key`, returning the slot offset inside the
    /// bucket `key` hashes to. Fails with [`TableError::Saturated`] when
    /// that bucket has no free slot left.
    pub fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        self.core.lock().insert(key, value)
    }

    /// Read the slot addressed by `key` and `ptr`.
    ///
    /// The slot's current contents are returned as-is: a released slot
    /// reads as 0, and no key check is performed. Use
    /// [`SimpleTable::dereference_checked`] to diagnose misuse.
    pub fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        self.core.lock().read(key, ptr)
    }

    /// Like [`SimpleTable::dereference`], but fails with
    /// [`TableError::KeyMismatch`] when the slot is free or was allocated
    /// under a different key.
    pub fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        self.core.lock().read_checked(key, ptr)
    }

    /// Release the slot addressed by `key` and `ptr`, zeroing its payload.
    ///
    /// Idempotent: releasing an already-free slot re-sets an already-set
    /// mask bit. Pointers outside the bucket are ignored.
    pub fn free(&self, key: i32, ptr: TinyPtr) {
        self.core.lock().release(key, ptr)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.core.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items the table was asked to host.
    pub fn capacity(&self) -> usize {
        self.core.lock().requested_capacity
    }

    /// Slots per bucket; every returned pointer is below this bound.
    pub fn bucket_size(&self) -> usize {
        self.core.lock().bucket_size
    }

    /// Rebuild the table for `new_capacity`, rehashing every live entry
    /// under the new seed.
    ///
    /// If any entry lands in a saturated bucket of the new geometry the
    /// resize fails and the table is left untouched. On success **every
    /// previously issued tiny pointer is invalidated**: the seed, bucket
    /// count and even the bucket size may change. Callers must quiesce
    /// outstanding pointers before resizing.
    pub fn resize(&self, new_capacity: usize) -> Result<()> {
        let mut core = self.core.lock();
        let mut next = Core::with_geometry(new_capacity, core.load_factor, MAX_BUCKET_SIZE)?;
        core.rehash_into(&mut next)?;
        debug!(
            "simple table resized: capacity={} -> {} buckets={} bucket_size={}",
            core.requested_capacity, new_capacity, next.bucket_count, next.bucket_size
        );
        *core = next;
        Ok(())
    }
}

impl AllocOps for SimpleTable {
    #[inline]
    fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        SimpleTable::allocate(self, key, value)
    }
    #[inline]
    fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        SimpleTable::dereference(self, key, ptr)
    }
    #[inline]
    fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        SimpleTable::dereference_checked(self, key, ptr)
    }
    #[inline]
    fn free(&self, key: i32, ptr: TinyPtr) {
        SimpleTable::free(self, key, ptr)
    }
}
