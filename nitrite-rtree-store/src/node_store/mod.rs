//! Node record storage for disk or memory backed R-Trees.
//!
//! The store persists tree nodes as fixed-size binary records behind a
//! random-access byte stream:
//! - A header at offset 0 identifies the tree flavor and format version and
//!   carries the tree parameters, three counters and a CRS blob
//! - Record `id` follows at `begin_position + (id - 1) * record_size`
//! - A single record-aligned window buffers reads and writes
//! - Removed ids are remembered in a session free-list for reuse
//!
//! The store is single-owner and does no locking of its own. Wrap it in a
//! [`SharedNodeStore`] to use it from several threads.

pub mod free_list;
pub mod header;
pub mod node_codec;
pub mod search;
pub mod store_config;
pub mod store_constants;
pub mod store_types;
pub mod stream;
pub mod window;
mod shared;
mod store_impl;

pub use free_list::{FreeList, ReuseOrder};
pub use header::{ByteOrder, SplitStrategy, StoreHeader, TreeFlavor};
pub use node_codec::NodeCodec;
pub use search::search_nodes;
pub use shared::SharedNodeStore;
pub use store_config::{StoreConfig, TreeSettings};
pub use store_constants::{DEFAULT_BUFFER_CAPACITY, FORMAT_VERSION};
pub use store_impl::NodeStore;
pub use store_types::{
    ErrorKind, Node, NodeId, NodeProperties, StoreError, StoreResult, StoreStats,
};
pub use stream::{BackingStream, FileStream, MemoryStream};
pub use window::NodeWindow;
