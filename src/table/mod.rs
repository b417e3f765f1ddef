pub mod fixed;
pub mod simple;
pub mod variable;

pub use fixed::FixedTable;
pub use simple::SimpleTable;
pub use variable::VariableTable;

use crate::config::TableConfig;
use crate::error::{Result, TableError};

/// Compact slot handle returned by `allocate`.
///
/// A tiny pointer is meaningful only together with the key it was
/// allocated under; the key re-selects the bucket on every later
/// operation, the pointer addresses the slot. Handles carry no ownership;
/// clients may copy them freely and are responsible for remembering which
/// key each one pairs with.
pub type TinyPtr = u32;

/// Operations shared by every table variant.
pub trait AllocOps {
    /// Place `value` under `key`, returning a tiny pointer to the hosting
    /// slot.
    fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr>;
    /// Read the slot addressed by `key` and `ptr`; released slots read as
    /// 0 and no key check is performed.
    fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32>;
    /// Like `dereference`, but fails with [`TableError::KeyMismatch`]
    /// unless the slot currently holds `key`.
    fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32>;
    /// Release the slot addressed by `key` and `ptr`. Idempotent.
    fn free(&self, key: i32, ptr: TinyPtr);
}

/// Table flavours selectable through [`TinyTable::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Simple,
    Fixed,
    Variable,
}

/// Tagged facade over the three table variants.
///
/// One arm per variant keeps dispatch exhaustive; adding a variant is a
/// compile error everywhere it is not handled.
#[derive(Debug)]
pub enum TinyTable {
    Simple(SimpleTable),
    Fixed(FixedTable),
    Variable(VariableTable),
}

impl TinyTable {
    /// Create a table of the given `variant` hosting `capacity` items at
    /// `load_factor` occupancy.
    ///
    /// The variable variant takes its geometry defaults from
    /// [`TableConfig`]: containers a quarter of the capacity each, four
    /// levels. Use [`TinyTable::with_config`] to pick those explicitly.
    pub fn create(capacity: usize, variant: Variant, load_factor: f64) -> Result<Self> {
        Self::with_config(
            capacity,
            variant,
            &TableConfig::new().with_load_factor(load_factor),
        )
    }

    /// Create a table of the given `variant` with every tuning knob taken
    /// from `config`.
    pub fn with_config(capacity: usize, variant: Variant, config: &TableConfig) -> Result<Self> {
        config.validate()?;
        match variant {
            Variant::Simple => {
                SimpleTable::create(capacity, config.load_factor()).map(TinyTable::Simple)
            }
            Variant::Fixed => {
                FixedTable::create(capacity, config.load_factor()).map(TinyTable::Fixed)
            }
            Variant::Variable => VariableTable::create(
                capacity,
                config.container_capacity(capacity),
                config.level_count(),
                config.load_factor(),
            )
            .map(TinyTable::Variable),
        }
    }

    #[inline]
    pub fn variant(&self) -> Variant {
        match self {
            TinyTable::Simple(_) => Variant::Simple,
            TinyTable::Fixed(_) => Variant::Fixed,
            TinyTable::Variable(_) => Variant::Variable,
        }
    }

    /// Rebuild a simple table for `new_capacity`; every other variant
    /// fails with [`TableError::ResizeUnsupported`] without modifying the
    /// table. A successful resize invalidates all outstanding tiny
    /// pointers.
    pub fn resize(&self, new_capacity: usize) -> Result<()> {
        match self {
            TinyTable::Simple(table) => table.resize(new_capacity),
            _ => Err(TableError::ResizeUnsupported),
        }
    }

    /// Live entries in the selected variant.
    pub fn len(&self) -> usize {
        match self {
            TinyTable::Simple(table) => table.len(),
            TinyTable::Fixed(table) => table.len(),
            TinyTable::Variable(table) => table.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items the table was asked to host.
    pub fn capacity(&self) -> usize {
        match self {
            TinyTable::Simple(table) => table.capacity(),
            TinyTable::Fixed(table) => table.capacity(),
            TinyTable::Variable(table) => table.capacity(),
        }
    }
}

impl AllocOps for TinyTable {
    fn allocate(&self, key: i32, value: i32) -> Result<TinyPtr> {
        match self {
            TinyTable::Simple(table) => table.allocate(key, value),
            TinyTable::Fixed(table) => table.allocate(key, value),
            TinyTable::Variable(table) => table.allocate(key, value),
        }
    }

    fn dereference(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        match self {
            TinyTable::Simple(table) => table.dereference(key, ptr),
            TinyTable::Fixed(table) => table.dereference(key, ptr),
            TinyTable::Variable(table) => table.dereference(key, ptr),
        }
    }

    fn dereference_checked(&self, key: i32, ptr: TinyPtr) -> Result<i32> {
        match self {
            TinyTable::Simple(table) => table.dereference_checked(key, ptr),
            TinyTable::Fixed(table) => table.dereference_checked(key, ptr),
            TinyTable::Variable(table) => table.dereference_checked(key, ptr),
        }
    }

    fn free(&self, key: i32, ptr: TinyPtr) {
        match self {
            TinyTable::Simple(table) => table.free(key, ptr),
            TinyTable::Fixed(table) => table.free(key, ptr),
            TinyTable::Variable(table) => table.free(key, ptr),
        }
    }
}
