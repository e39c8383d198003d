//! # Nitrite R-Tree Store - Node Storage for Disk-Based R-Trees
//!
//! This crate provides the node storage engine underneath an R-Tree family
//! spatial index. Tree nodes are persisted as fixed-size binary records
//! behind a random-access byte stream, so the tree algorithms above it only
//! deal in node ids.
//!
//! ## Features
//!
//! - **Fixed-Size Records**: boundary, properties and links of a node in
//!   `16 * dimension + 17` bytes
//! - **Windowed Buffer**: one record-aligned window, flushed and reloaded on
//!   a miss
//! - **File or Memory**: any [`BackingStream`]; a file and a growable
//!   in-memory buffer are included
//! - **Self-Describing Header**: tree flavor, format version, tree
//!   parameters, counters and the coordinate reference system
//! - **Bounding-Box Search**: iterative traversal of the node graph
//!
//! ## Quick Start
//!
//! ```rust
//! use nitrite_rtree_store::{
//!     BoundingBox, Node, NodeProperties, NodeStore, StoreConfig, TreeFlavor, TreeSettings,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::new(TreeFlavor::Star);
//! let mut store = NodeStore::create_in_memory(&config, TreeSettings::default())?;
//!
//! let root_id = store.allocate_id()?;
//! let leaf_id = store.allocate_id()?;
//! store.write_node(
//!     &Node::new(root_id)
//!         .with_boundary(BoundingBox::from_2d(0.0, 0.0, 10.0, 10.0))
//!         .with_child(leaf_id)
//!         .with_child_count(1),
//! )?;
//! store.write_node(
//!     &Node::new(leaf_id)
//!         .with_boundary(BoundingBox::from_2d(2.0, 2.0, 3.0, 3.0))
//!         .with_properties(NodeProperties::LEAF)
//!         .with_parent(root_id)
//!         .with_entry(42),
//! )?;
//! store.set_tree_identifier(root_id)?;
//!
//! let found = store.search(root_id, &BoundingBox::from_2d(0.0, 0.0, 5.0, 5.0))?;
//! assert_eq!(found, vec![42]);
//!
//! // Closing writes the counters; the bytes can be opened again.
//! let bytes = store.into_stream()?.into_inner();
//! let reopened = NodeStore::open_in_memory(bytes, &config)?;
//! assert_eq!(reopened.root().map(|n| n.id), Some(root_id));
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod crs;
pub mod node_store;

pub use bounding_box::BoundingBox;
pub use crs::{BincodeCrsCodec, CrsCodec, CrsDescriptor};
pub use node_store::{
    BackingStream, ByteOrder, ErrorKind, FileStream, FreeList, MemoryStream, Node, NodeId,
    NodeProperties, NodeStore, ReuseOrder, SharedNodeStore, SplitStrategy, StoreConfig,
    StoreError, StoreHeader, StoreResult, StoreStats, TreeFlavor, TreeSettings,
};
