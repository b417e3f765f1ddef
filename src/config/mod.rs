use crate::error::{Result, TableError};

/// Target occupancy used when the caller does not pick one.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.9;

/// Overflow levels per container in the variable variant.
pub const DEFAULT_LEVEL_COUNT: usize = 4;

/// Construction-time tuning for a table.
///
/// The defaults host `capacity` items at 90% occupancy and, for the
/// variable variant, shard them over containers a quarter of the total
/// capacity each with four overflow levels.
pub struct TableConfig {
    load_factor: f64,
    container_capacity: Option<usize>,
    level_count: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            load_factor: DEFAULT_LOAD_FACTOR,
            container_capacity: None,
            level_count: DEFAULT_LEVEL_COUNT,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_load_factor(mut self, load_factor: f64) -> Self {
        self.load_factor = load_factor;
        self
    }

    pub fn with_container_capacity(mut self, container_capacity: usize) -> Self {
        self.container_capacity = Some(container_capacity);
        self
    }

    pub fn with_level_count(mut self, level_count: usize) -> Self {
        self.level_count = level_count;
        self
    }

    #[inline(always)]
    pub fn load_factor(&self) -> f64 {
        self.load_factor
    }

    /// Container capacity for a table of `capacity` items.
    ///
    /// Defaults to a quarter of the total, never below one.
    #[inline]
    pub fn container_capacity(&self, capacity: usize) -> usize {
        self.container_capacity
            .unwrap_or_else(|| (capacity / 4).max(1))
    }

    #[inline(always)]
    pub fn level_count(&self) -> usize {
        self.level_count
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.load_factor > 0.0 && self.load_factor <= 1.0) {
            return Err(TableError::InvalidLoadFactor(self.load_factor));
        }
        Ok(())
    }
}
