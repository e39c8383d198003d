//! Configuration of a node store.

use std::fmt;
use std::sync::Arc;

use super::header::{ByteOrder, SplitStrategy, TreeFlavor};
use super::store_constants::{DEFAULT_BUFFER_CAPACITY, FORMAT_VERSION};
use super::store_types::{StoreError, StoreResult};
use crate::crs::{BincodeCrsCodec, CrsCodec, CrsDescriptor};

/// Settings shared by the open and create paths.
///
/// Usage: start from `StoreConfig::new(flavor)` (or `default()` for a basic
/// R-Tree) and chain the `with_*` setters.
#[derive(Clone)]
pub struct StoreConfig {
    flavor: TreeFlavor,
    version: f64,
    buffer_capacity: usize,
    byte_order: ByteOrder,
    crs_codec: Arc<dyn CrsCodec>,
}

impl StoreConfig {
    pub fn new(flavor: TreeFlavor) -> Self {
        Self {
            flavor,
            version: FORMAT_VERSION,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            byte_order: ByteOrder::default(),
            crs_codec: Arc::new(BincodeCrsCodec),
        }
    }

    /// Format version written on create and required on open.
    pub fn with_version(mut self, version: f64) -> Self {
        self.version = version;
        self
    }

    /// Target window size in bytes; rounded down to whole records.
    pub fn with_buffer_capacity(mut self, buffer_capacity: usize) -> Self {
        self.buffer_capacity = buffer_capacity;
        self
    }

    /// Byte order used on create. On open the stored flag wins.
    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn with_crs_codec(mut self, codec: Arc<dyn CrsCodec>) -> Self {
        self.crs_codec = codec;
        self
    }

    pub fn flavor(&self) -> TreeFlavor {
        self.flavor
    }

    pub fn version(&self) -> f64 {
        self.version
    }

    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn crs_codec(&self) -> &dyn CrsCodec {
        self.crs_codec.as_ref()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(TreeFlavor::Basic)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("flavor", &self.flavor)
            .field("version", &self.version)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("byte_order", &self.byte_order)
            .finish_non_exhaustive()
    }
}

/// Tree parameters persisted in the header when a store is created.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSettings {
    pub max_elements: i32,
    pub hilbert_order: i32,
    pub split_strategy: SplitStrategy,
    pub crs: CrsDescriptor,
}

impl TreeSettings {
    pub fn new(crs: CrsDescriptor) -> Self {
        Self {
            max_elements: 8,
            hilbert_order: 0,
            split_strategy: SplitStrategy::default(),
            crs,
        }
    }

    pub fn with_max_elements(mut self, max_elements: i32) -> Self {
        self.max_elements = max_elements;
        self
    }

    pub fn with_hilbert_order(mut self, hilbert_order: i32) -> Self {
        self.hilbert_order = hilbert_order;
        self
    }

    pub fn with_split_strategy(mut self, split_strategy: SplitStrategy) -> Self {
        self.split_strategy = split_strategy;
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.max_elements < 2 {
            return Err(StoreError::InvalidArgument(format!(
                "max elements per node must be at least 2, got {}",
                self.max_elements
            )));
        }
        if self.hilbert_order < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "hilbert order must not be negative, got {}",
                self.hilbert_order
            )));
        }
        if self.crs.dimension() == 0 {
            return Err(StoreError::InvalidArgument(
                "CRS must have at least one axis".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self::new(CrsDescriptor::cartesian(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.flavor(), TreeFlavor::Basic);
        assert_eq!(config.version(), FORMAT_VERSION);
        assert_eq!(config.buffer_capacity(), DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.byte_order(), ByteOrder::Little);
    }

    #[test]
    fn test_config_setters() {
        let config = StoreConfig::new(TreeFlavor::Star)
            .with_version(2.5)
            .with_buffer_capacity(512)
            .with_byte_order(ByteOrder::Big);
        assert_eq!(config.flavor(), TreeFlavor::Star);
        assert_eq!(config.version(), 2.5);
        assert_eq!(config.buffer_capacity(), 512);
        assert_eq!(config.byte_order(), ByteOrder::Big);
        assert!(format!("{:?}", config).contains("Star"));
    }

    #[test]
    fn test_settings_validation() {
        assert!(TreeSettings::default().validate().is_ok());
        assert!(TreeSettings::default()
            .with_max_elements(1)
            .validate()
            .is_err());
        assert!(TreeSettings::default()
            .with_hilbert_order(-1)
            .validate()
            .is_err());
        assert!(TreeSettings::new(CrsDescriptor::new("none", vec![]))
            .validate()
            .is_err());
    }
}
