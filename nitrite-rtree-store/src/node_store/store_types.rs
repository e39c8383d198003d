//! Core types for the R-Tree node store.
//!
//! This module defines the fundamental types shared by every layer:
//! - Error and result types, with a coarse error classification
//! - The node value object and its property flags
//! - Statistics about window and stream activity

use crate::bounding_box::BoundingBox;
use std::fmt;
use std::io;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in node store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Channel closed")]
    ChannelClosed,

    #[error("Position {position} is out of range [0, {size}]")]
    OutOfRange { position: u64, size: u64 },

    #[error("Tree flavor mismatch: expected {expected} but the stream holds {found}")]
    FlavorMismatch { expected: String, found: String },

    #[error("Format version mismatch: expected {expected} but the stream holds {found}")]
    VersionMismatch { expected: f64, found: f64 },

    #[error("Incomplete session: node id counter is 0, the store was not closed after writing")]
    IncompleteSession,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid node id: {0}")]
    InvalidNodeId(NodeId),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Coarse classification of a [`StoreError`].
///
/// Format problems are recovered by recreating the index, I/O problems by
/// retrying at a higher layer, resource-state problems by reopening the
/// store. Invariant problems indicate a corrupted index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Format,
    Io,
    ResourceState,
    Invariant,
}

impl StoreError {
    /// Returns the class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::FlavorMismatch { .. }
            | StoreError::VersionMismatch { .. }
            | StoreError::IncompleteSession
            | StoreError::InvalidHeader(_)
            | StoreError::Serialization(_) => ErrorKind::Format,
            StoreError::Io(_) => ErrorKind::Io,
            StoreError::ChannelClosed
            | StoreError::OutOfRange { .. }
            | StoreError::InvalidNodeId(_)
            | StoreError::InvalidArgument(_) => ErrorKind::ResourceState,
            StoreError::InvariantViolation(_) => ErrorKind::Invariant,
        }
    }

    pub fn is_format(&self) -> bool {
        self.kind() == ErrorKind::Format
    }
}

/// Result type for node store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Node id. 1-based and derived from the record position; `0` means "no node".
///
/// Child ids are signed: a negative child id stores the identifier of a leaf
/// entry rather than a node.
pub type NodeId = i32;

// ============================================================================
// Node Properties
// ============================================================================

/// The single flag byte persisted with every node record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeProperties(u8);

impl NodeProperties {
    /// The node is a leaf: its children are data entries.
    pub const LEAF: NodeProperties = NodeProperties(0x01);
    /// The node is a data entry wrapper.
    pub const DATA: NodeProperties = NodeProperties(0x02);

    pub const fn empty() -> Self {
        NodeProperties(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        NodeProperties(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: NodeProperties) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: NodeProperties) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NodeProperties) {
        self.0 &= !other.0;
    }

    pub fn is_leaf(self) -> bool {
        self.contains(NodeProperties::LEAF)
    }

    pub fn is_data(self) -> bool {
        self.contains(NodeProperties::DATA)
    }
}

impl std::ops::BitOr for NodeProperties {
    type Output = NodeProperties;

    fn bitor(self, rhs: Self) -> Self::Output {
        NodeProperties(self.0 | rhs.0)
    }
}

impl fmt::Display for NodeProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

// ============================================================================
// Node
// ============================================================================

/// One node of the tree as persisted in a fixed-size record.
///
/// The id is not part of the record; it is implied by the record position
/// and set explicitly when a node is read back.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    /// `None` for an unset boundary (persisted as all-NaN).
    pub boundary: Option<BoundingBox>,
    pub properties: NodeProperties,
    pub parent_id: NodeId,
    pub sibling_id: NodeId,
    pub child_id: NodeId,
    pub child_count: i32,
}

impl Node {
    /// Creates a detached node with no boundary and no links.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            boundary: None,
            properties: NodeProperties::empty(),
            parent_id: 0,
            sibling_id: 0,
            child_id: 0,
            child_count: 0,
        }
    }

    /// Sets the boundary. An empty (all NaN) box leaves the node without
    /// one, which is how the store persists a missing boundary.
    pub fn with_boundary(mut self, boundary: BoundingBox) -> Self {
        self.boundary = if boundary.is_empty() {
            None
        } else {
            Some(boundary)
        };
        self
    }

    pub fn with_properties(mut self, properties: NodeProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_parent(mut self, parent_id: NodeId) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_sibling(mut self, sibling_id: NodeId) -> Self {
        self.sibling_id = sibling_id;
        self
    }

    pub fn with_child(mut self, child_id: NodeId) -> Self {
        self.child_id = child_id;
        self
    }

    pub fn with_child_count(mut self, child_count: i32) -> Self {
        self.child_count = child_count;
        self
    }

    /// Points this node at a leaf entry instead of a child node.
    pub fn with_entry(self, entry: NodeId) -> Self {
        self.with_child(-entry)
    }

    pub fn is_leaf(&self) -> bool {
        self.properties.is_leaf()
    }

    pub fn has_sibling(&self) -> bool {
        self.sibling_id != 0
    }

    /// Returns the leaf entry stored in this node, if any. A child id of
    /// `i32::MIN` has no entry counterpart and yields `None`.
    pub fn entry(&self) -> Option<NodeId> {
        if self.child_id < 0 {
            self.child_id.checked_neg()
        } else {
            None
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Statistics about window and stream activity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub window_hits: u64,
    pub window_misses: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub flushes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(StoreError::IncompleteSession.kind(), ErrorKind::Format);
        assert_eq!(
            StoreError::VersionMismatch {
                expected: 1.0,
                found: 2.0
            }
            .kind(),
            ErrorKind::Format
        );
        assert_eq!(
            StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk")).kind(),
            ErrorKind::Io
        );
        assert_eq!(StoreError::ChannelClosed.kind(), ErrorKind::ResourceState);
        assert_eq!(
            StoreError::OutOfRange { position: 9, size: 3 }.kind(),
            ErrorKind::ResourceState
        );
        assert_eq!(
            StoreError::InvariantViolation("child 0".into()).kind(),
            ErrorKind::Invariant
        );
    }

    #[test]
    fn test_error_messages() {
        let err = StoreError::FlavorMismatch {
            expected: "Hilbert R-Tree".into(),
            found: "Star R-Tree".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Hilbert R-Tree"));
        assert!(msg.contains("Star R-Tree"));
        assert_eq!(StoreError::ChannelClosed.to_string(), "Channel closed");
    }

    #[test]
    fn test_node_properties() {
        let mut props = NodeProperties::empty();
        assert!(!props.is_leaf());
        props.insert(NodeProperties::LEAF);
        assert!(props.is_leaf());
        assert!(!props.is_data());
        let both = props | NodeProperties::DATA;
        assert!(both.is_data());
        assert_eq!(both.bits(), 0x03);
        props.remove(NodeProperties::LEAF);
        assert_eq!(props, NodeProperties::empty());
    }

    #[test]
    fn test_node_builder() {
        let node = Node::new(4)
            .with_parent(1)
            .with_sibling(5)
            .with_entry(42)
            .with_properties(NodeProperties::LEAF);
        assert_eq!(node.child_id, -42);
        assert_eq!(node.entry(), Some(42));
        assert!(node.has_sibling());
        assert!(node.is_leaf());
        assert_eq!(Node::new(1).with_child(3).entry(), None);
        assert_eq!(Node::new(1).with_child(i32::MIN).entry(), None);
    }

    #[test]
    fn test_empty_boundary_is_no_boundary() {
        let node = Node::new(1).with_boundary(BoundingBox::empty(2));
        assert!(node.boundary.is_none());
        let node = Node::new(1).with_boundary(BoundingBox::new(&[0.0, 1.0, 0.0, 1.0]));
        assert!(node.boundary.is_some());
    }
}
