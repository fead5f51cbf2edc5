use crate::error::ConfigError;

/// Slot count of a freshly created table. A small prime keeps the early
/// probe sequences spread out.
pub const DEFAULT_INITIAL_CAPACITY: usize = 11;

/// Load factor above which an insert grows the table first.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.7;

/// Construction parameters for a [`ProbingTable`](crate::ProbingTable).
///
/// # Examples
///
/// ```rust
/// # use quad_probe::TableConfig;
/// #
/// let config = TableConfig::default()
///     .with_initial_capacity(31)
///     .with_max_load_factor(0.5);
/// assert!(config.validate().is_ok());
///
/// assert!(TableConfig::default().with_max_load_factor(1.0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    /// Number of slots allocated up front.
    pub initial_capacity: usize,
    /// Upper bound on `live / capacity` after any insert completes.
    pub max_load_factor: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    /// Sets the number of slots allocated up front.
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the maximum load factor.
    pub fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Checks that the table can honor these parameters.
    ///
    /// A load factor of 1 or more would let the table fill completely, at
    /// which point an unsuccessful probe walk could never stop on an empty
    /// slot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        // Written so that NaN is rejected too.
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(ConfigError::InvalidLoadFactor(self.max_load_factor));
        }

        Ok(())
    }
}
