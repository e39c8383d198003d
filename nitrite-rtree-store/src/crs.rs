//! Coordinate reference system descriptor stored in the store header.
//!
//! The node store treats the descriptor as an opaque, length-prefixed blob.
//! The only thing it needs back from it is the dimension, which fixes the
//! size of every node record.

use crate::node_store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Describes the coordinate reference system of the indexed boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrsDescriptor {
    /// Human readable name, e.g. "WGS 84"
    pub name: String,
    /// Authority code, e.g. "EPSG:4326"
    pub code: Option<String>,
    /// One name per axis, in boundary order
    pub axes: Vec<String>,
}

impl CrsDescriptor {
    pub fn new(name: impl Into<String>, axes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            axes,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Geographic WGS 84 with longitude first.
    pub fn wgs84() -> Self {
        Self::new("WGS 84", vec!["longitude".into(), "latitude".into()]).with_code("EPSG:4326")
    }

    /// An engineering (cartesian) CRS with axes `x0..xn`.
    pub fn cartesian(dimension: usize) -> Self {
        Self::new(
            format!("Cartesian {}D", dimension),
            (0..dimension).map(|i| format!("x{}", i)).collect(),
        )
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }
}

/// Converts a [`CrsDescriptor`] to and from the bytes stored in the header.
pub trait CrsCodec: Send + Sync {
    fn encode(&self, crs: &CrsDescriptor) -> StoreResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> StoreResult<CrsDescriptor>;
}

/// Default codec: serde + bincode (legacy configuration).
#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCrsCodec;

impl CrsCodec for BincodeCrsCodec {
    fn encode(&self, crs: &CrsDescriptor) -> StoreResult<Vec<u8>> {
        bincode::serde::encode_to_vec(crs, bincode::config::legacy())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<CrsDescriptor> {
        bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
            .map(|(crs, _)| crs)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84() {
        let crs = CrsDescriptor::wgs84();
        assert_eq!(crs.dimension(), 2);
        assert_eq!(crs.code.as_deref(), Some("EPSG:4326"));
    }

    #[test]
    fn test_cartesian_axes() {
        let crs = CrsDescriptor::cartesian(3);
        assert_eq!(crs.axes, vec!["x0", "x1", "x2"]);
        assert_eq!(crs.name, "Cartesian 3D");
    }

    #[test]
    fn test_bincode_codec() {
        let codec = BincodeCrsCodec;
        let crs = CrsDescriptor::wgs84();
        let bytes = codec.encode(&crs).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(codec.decode(&bytes).unwrap(), crs);
    }

    #[test]
    fn test_bincode_codec_rejects_garbage() {
        let err = BincodeCrsCodec.decode(&[0xff, 0xff]).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
        assert!(err.is_format());
    }
}
