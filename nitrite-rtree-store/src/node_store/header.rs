//! Store header codec.
//!
//! The header sits at offset 0 of the backing stream:
//!
//! ```text
//! offset 0   : magic number (4 bytes, big-endian)
//! offset 4   : byte-order flag (1 = little-endian, 0 = big-endian)
//! offset 5   : version (f64)
//! offset 13  : max elements per node (i32)
//! offset 17  : Hilbert order (i32)
//! offset 21  : split-strategy tag (u8)
//! offset 22  : node-id counter (i32)
//! offset 26  : tree identifier (i32)
//! offset 30  : element count (i32)
//! offset 34  : CRS blob length (i32)
//! offset 38  : CRS blob
//! ```
//!
//! Everything after the byte-order flag uses the declared byte order. Only
//! the three counters at offset 22 change after creation; they are rewritten
//! on flush and close.

use std::fmt;

use super::store_constants::{
    BASIC_RTREE_MAGIC, BYTE_ORDER_OFFSET, COUNTERS_OFFSET, COUNTERS_SIZE, CRS_LENGTH_OFFSET,
    FIXED_HEADER_SIZE, HILBERT_ORDER_OFFSET, HILBERT_RTREE_MAGIC, MAGIC_OFFSET,
    MAX_ELEMENTS_OFFSET, SPLIT_TAG_OFFSET, STAR_RTREE_MAGIC, VERSION_OFFSET,
};
use super::store_types::{StoreError, StoreResult};
use super::stream::BackingStream;
use crate::crs::{CrsCodec, CrsDescriptor};

const MAGIC: usize = MAGIC_OFFSET as usize;
const BYTE_ORDER: usize = BYTE_ORDER_OFFSET as usize;
const VERSION: usize = VERSION_OFFSET as usize;
const MAX_ELEMENTS: usize = MAX_ELEMENTS_OFFSET as usize;
const HILBERT_ORDER: usize = HILBERT_ORDER_OFFSET as usize;
const SPLIT_TAG: usize = SPLIT_TAG_OFFSET as usize;
const COUNTERS: usize = COUNTERS_OFFSET as usize;
const CRS_LENGTH: usize = CRS_LENGTH_OFFSET as usize;

// ============================================================================
// Byte Order
// ============================================================================

/// Byte order of every multi-byte field after the byte-order flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::Big
        } else {
            ByteOrder::Little
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            ByteOrder::Little => 1,
            ByteOrder::Big => 0,
        }
    }

    pub fn from_flag(flag: u8) -> StoreResult<Self> {
        match flag {
            1 => Ok(ByteOrder::Little),
            0 => Ok(ByteOrder::Big),
            other => Err(StoreError::InvalidHeader(format!(
                "unknown byte order flag {}",
                other
            ))),
        }
    }

    pub(crate) fn write_i32(self, dst: &mut [u8], value: i32) {
        let bytes = match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        dst[..4].copy_from_slice(&bytes);
    }

    pub(crate) fn read_i32(self, src: &[u8]) -> i32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&src[..4]);
        match self {
            ByteOrder::Little => i32::from_le_bytes(bytes),
            ByteOrder::Big => i32::from_be_bytes(bytes),
        }
    }

    pub(crate) fn write_f64(self, dst: &mut [u8], value: f64) {
        let bytes = match self {
            ByteOrder::Little => value.to_le_bytes(),
            ByteOrder::Big => value.to_be_bytes(),
        };
        dst[..8].copy_from_slice(&bytes);
    }

    pub(crate) fn read_f64(self, src: &[u8]) -> f64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&src[..8]);
        match self {
            ByteOrder::Little => f64::from_le_bytes(bytes),
            ByteOrder::Big => f64::from_be_bytes(bytes),
        }
    }
}

// ============================================================================
// Tree Flavor
// ============================================================================

/// The R-Tree variant a stream was written for, identified by its magic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeFlavor {
    Basic,
    Star,
    Hilbert,
}

impl TreeFlavor {
    pub fn magic(self) -> u32 {
        match self {
            TreeFlavor::Basic => BASIC_RTREE_MAGIC,
            TreeFlavor::Star => STAR_RTREE_MAGIC,
            TreeFlavor::Hilbert => HILBERT_RTREE_MAGIC,
        }
    }

    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            BASIC_RTREE_MAGIC => Some(TreeFlavor::Basic),
            STAR_RTREE_MAGIC => Some(TreeFlavor::Star),
            HILBERT_RTREE_MAGIC => Some(TreeFlavor::Hilbert),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TreeFlavor::Basic => "Basic R-Tree",
            TreeFlavor::Star => "Star R-Tree",
            TreeFlavor::Hilbert => "Hilbert R-Tree",
        }
    }

    /// Names whatever flavor a raw magic number stands for.
    pub fn describe_magic(magic: u32) -> String {
        match TreeFlavor::from_magic(magic) {
            Some(flavor) => flavor.to_string(),
            None => format!("unknown flavor (magic {:#010x})", magic),
        }
    }
}

impl fmt::Display for TreeFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (magic {:#010x})", self.name(), self.magic())
    }
}

// ============================================================================
// Split Strategy
// ============================================================================

/// Split strategy tag. The store only persists it; splitting happens above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SplitStrategy {
    Linear,
    #[default]
    Quadratic,
    Hilbert,
}

impl SplitStrategy {
    pub fn tag(self) -> u8 {
        match self {
            SplitStrategy::Linear => 0,
            SplitStrategy::Quadratic => 1,
            SplitStrategy::Hilbert => 2,
        }
    }

    pub fn from_tag(tag: u8) -> StoreResult<Self> {
        match tag {
            0 => Ok(SplitStrategy::Linear),
            1 => Ok(SplitStrategy::Quadratic),
            2 => Ok(SplitStrategy::Hilbert),
            other => Err(StoreError::InvalidHeader(format!(
                "unknown split strategy tag {}",
                other
            ))),
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Decoded store header
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHeader {
    pub flavor: TreeFlavor,
    pub byte_order: ByteOrder,
    pub version: f64,
    pub max_elements: i32,
    pub hilbert_order: i32,
    pub split_strategy: SplitStrategy,
    pub node_id_counter: i32,
    pub tree_identifier: i32,
    pub element_count: i32,
    pub crs: CrsDescriptor,
}

impl StoreHeader {
    /// Encodes the full header, CRS blob included.
    pub fn encode(&self, codec: &dyn CrsCodec) -> StoreResult<Vec<u8>> {
        let blob = codec.encode(&self.crs)?;
        let blob_len = i32::try_from(blob.len()).map_err(|_| {
            StoreError::Serialization(format!("CRS blob too large: {} bytes", blob.len()))
        })?;

        let order = self.byte_order;
        let mut buf = vec![0u8; FIXED_HEADER_SIZE + blob.len()];
        buf[MAGIC..MAGIC + 4].copy_from_slice(&self.flavor.magic().to_be_bytes());
        buf[BYTE_ORDER] = order.flag();
        order.write_f64(&mut buf[VERSION..], self.version);
        order.write_i32(&mut buf[MAX_ELEMENTS..], self.max_elements);
        order.write_i32(&mut buf[HILBERT_ORDER..], self.hilbert_order);
        buf[SPLIT_TAG] = self.split_strategy.tag();
        order.write_i32(&mut buf[COUNTERS..], self.node_id_counter);
        order.write_i32(&mut buf[COUNTERS + 4..], self.tree_identifier);
        order.write_i32(&mut buf[COUNTERS + 8..], self.element_count);
        order.write_i32(&mut buf[CRS_LENGTH..], blob_len);
        buf[FIXED_HEADER_SIZE..].copy_from_slice(&blob);
        Ok(buf)
    }

    /// Writes the header at offset 0 and returns the offset of record 1.
    pub fn write_to<S: BackingStream>(
        &self,
        stream: &mut S,
        codec: &dyn CrsCodec,
    ) -> StoreResult<u64> {
        let bytes = self.encode(codec)?;
        stream.seek(0)?;
        stream.write_all(&bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Reads and validates the header at offset 0.
    ///
    /// Returns the header and the offset of record 1.
    pub fn read_from<S: BackingStream>(
        stream: &mut S,
        expected_flavor: TreeFlavor,
        expected_version: f64,
        codec: &dyn CrsCodec,
    ) -> StoreResult<(StoreHeader, u64)> {
        let mut fixed = [0u8; FIXED_HEADER_SIZE];
        stream.seek(0)?;
        let n = stream.read_fully(&mut fixed)?;

        if n >= 4 {
            let mut magic = [0u8; 4];
            magic.copy_from_slice(&fixed[MAGIC..MAGIC + 4]);
            let magic = u32::from_be_bytes(magic);
            if magic != expected_flavor.magic() {
                return Err(StoreError::FlavorMismatch {
                    expected: expected_flavor.to_string(),
                    found: TreeFlavor::describe_magic(magic),
                });
            }
        }
        if n < FIXED_HEADER_SIZE {
            return Err(StoreError::InvalidHeader(format!(
                "truncated header: {} of {} bytes",
                n, FIXED_HEADER_SIZE
            )));
        }

        let order = ByteOrder::from_flag(fixed[BYTE_ORDER])?;
        let version = order.read_f64(&fixed[VERSION..]);
        if version != expected_version {
            return Err(StoreError::VersionMismatch {
                expected: expected_version,
                found: version,
            });
        }

        let max_elements = order.read_i32(&fixed[MAX_ELEMENTS..]);
        let hilbert_order = order.read_i32(&fixed[HILBERT_ORDER..]);
        let split_strategy = SplitStrategy::from_tag(fixed[SPLIT_TAG])?;
        let node_id_counter = order.read_i32(&fixed[COUNTERS..]);
        let tree_identifier = order.read_i32(&fixed[COUNTERS + 4..]);
        let element_count = order.read_i32(&fixed[COUNTERS + 8..]);
        if node_id_counter == 0 {
            return Err(StoreError::IncompleteSession);
        }

        let blob_len = order.read_i32(&fixed[CRS_LENGTH..]);
        let blob_len = usize::try_from(blob_len).map_err(|_| {
            StoreError::InvalidHeader(format!("negative CRS blob length {}", blob_len))
        })?;
        let available = stream.size()?.saturating_sub(FIXED_HEADER_SIZE as u64);
        if blob_len as u64 > available {
            return Err(StoreError::InvalidHeader(format!(
                "truncated CRS blob: {} of {} bytes",
                available, blob_len
            )));
        }
        let mut blob = vec![0u8; blob_len];
        let read = stream.read_fully(&mut blob)?;
        if read < blob_len {
            return Err(StoreError::InvalidHeader(format!(
                "truncated CRS blob: {} of {} bytes",
                read, blob_len
            )));
        }
        let crs = codec.decode(&blob)?;

        let header = StoreHeader {
            flavor: expected_flavor,
            byte_order: order,
            version,
            max_elements,
            hilbert_order,
            split_strategy,
            node_id_counter,
            tree_identifier,
            element_count,
            crs,
        };
        Ok((header, (FIXED_HEADER_SIZE + blob_len) as u64))
    }

    /// Rewrites the three mutable counters in place.
    pub fn write_counters<S: BackingStream>(&self, stream: &mut S) -> StoreResult<()> {
        let order = self.byte_order;
        let mut buf = [0u8; COUNTERS_SIZE];
        order.write_i32(&mut buf[0..], self.node_id_counter);
        order.write_i32(&mut buf[4..], self.tree_identifier);
        order.write_i32(&mut buf[8..], self.element_count);
        stream.seek(COUNTERS_OFFSET)?;
        stream.write_all(&buf)
    }
}
