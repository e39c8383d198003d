//! Constants for the R-Tree node store.

/// Default target size of the buffer window in bytes. The real window is
/// rounded down to a whole number of records.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Minimum growth step of the in-memory stream (1 MiB)
pub const MIN_MEMORY_GROWTH: usize = 1024 * 1024;

/// Current file format version
pub const FORMAT_VERSION: f64 = 1.0;

/// Magic numbers identifying the tree flavor stored in a stream
pub const BASIC_RTREE_MAGIC: u32 = 0x4E52_5442; // "NRTB"
pub const STAR_RTREE_MAGIC: u32 = 0x4E52_5453; // "NRTS"
pub const HILBERT_RTREE_MAGIC: u32 = 0x4E52_5448; // "NRTH"

// Header layout
pub const MAGIC_OFFSET: u64 = 0;
pub const BYTE_ORDER_OFFSET: u64 = 4;
pub const VERSION_OFFSET: u64 = 5;
pub const MAX_ELEMENTS_OFFSET: u64 = 13;
pub const HILBERT_ORDER_OFFSET: u64 = 17;
pub const SPLIT_TAG_OFFSET: u64 = 21;
/// Start of the three mutable counters (node id counter, tree id, element count)
pub const COUNTERS_OFFSET: u64 = 22;
pub const CRS_LENGTH_OFFSET: u64 = 34;
/// Size of the header up to and including the CRS blob length
pub const FIXED_HEADER_SIZE: usize = 38;
/// Size of the counters block rewritten on flush
pub const COUNTERS_SIZE: usize = 12;

/// Bytes of the non-boundary part of a record: properties byte + 4 ints
pub const RECORD_FIXED_SIZE: usize = 1 + 4 * 4;

/// Size in bytes of one node record for the given dimension
pub const fn record_size(dimension: usize) -> usize {
    2 * dimension * 8 + RECORD_FIXED_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_size_matches_bit_formula() {
        for dim in 1..5usize {
            let bits = 2 * dim * 64 + 4 * 32;
            assert_eq!(record_size(dim), bits / 8 + 1);
        }
        assert_eq!(record_size(2), 49);
    }

    #[test]
    fn test_header_layout_is_contiguous() {
        assert_eq!(BYTE_ORDER_OFFSET, MAGIC_OFFSET + 4);
        assert_eq!(VERSION_OFFSET, BYTE_ORDER_OFFSET + 1);
        assert_eq!(MAX_ELEMENTS_OFFSET, VERSION_OFFSET + 8);
        assert_eq!(HILBERT_ORDER_OFFSET, MAX_ELEMENTS_OFFSET + 4);
        assert_eq!(SPLIT_TAG_OFFSET, HILBERT_ORDER_OFFSET + 4);
        assert_eq!(COUNTERS_OFFSET, SPLIT_TAG_OFFSET + 1);
        assert_eq!(CRS_LENGTH_OFFSET, COUNTERS_OFFSET + COUNTERS_SIZE as u64);
        assert_eq!(FIXED_HEADER_SIZE as u64, CRS_LENGTH_OFFSET + 4);
    }
}
