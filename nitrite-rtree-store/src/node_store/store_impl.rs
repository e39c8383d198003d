//! NodeStore implementation.

use std::path::Path;

use crate::bounding_box::BoundingBox;
use crate::crs::CrsDescriptor;

use super::free_list::FreeList;
use super::header::{StoreHeader, TreeFlavor};
use super::node_codec::NodeCodec;
use super::search::search_nodes;
use super::store_config::{StoreConfig, TreeSettings};
use super::store_types::{Node, NodeId, StoreError, StoreResult, StoreStats};
use super::stream::{BackingStream, FileStream, MemoryStream};
use super::window::NodeWindow;

/// Fixed-size node record store over a backing stream.
///
/// The store exclusively owns its stream and a single buffer window over the
/// record area. Node ids map directly to record offsets: record `id` lives
/// at `begin_position + (id - 1) * record_size`.
///
/// The three header counters (node id counter, tree identifier, element
/// count) are kept in memory and are authoritative on disk only after
/// [`flush`](NodeStore::flush) or [`close`](NodeStore::close). A crash in
/// between loses the counters, not the flushed records.
pub struct NodeStore<S: BackingStream> {
    stream: Option<S>,
    header: StoreHeader,
    codec: NodeCodec,
    window: NodeWindow,
    free_list: FreeList,
    root: Option<Node>,
    closed: bool,
}

impl<S: BackingStream> NodeStore<S> {
    /// Creates an empty store on `stream`, discarding anything it held.
    ///
    /// The on-disk node id counter stays 0 until the first flush or close,
    /// so a session that never completes is rejected on open.
    pub fn create(mut stream: S, config: &StoreConfig, settings: TreeSettings) -> StoreResult<Self> {
        settings.validate()?;
        stream.truncate(0)?;

        let mut header = StoreHeader {
            flavor: config.flavor(),
            byte_order: config.byte_order(),
            version: config.version(),
            max_elements: settings.max_elements,
            hilbert_order: settings.hilbert_order,
            split_strategy: settings.split_strategy,
            node_id_counter: 0,
            tree_identifier: 0,
            element_count: 0,
            crs: settings.crs,
        };
        let begin_position = header.write_to(&mut stream, config.crs_codec())?;
        header.node_id_counter = 1;

        let codec = NodeCodec::new(header.crs.dimension(), header.byte_order);
        let window = NodeWindow::open(
            &mut stream,
            begin_position,
            codec.record_size(),
            config.buffer_capacity(),
        )?;

        log::debug!(
            "Created {} store: {}D, record size {}, window {} bytes",
            header.flavor.name(),
            codec.dimension(),
            codec.record_size(),
            window.capacity()
        );

        Ok(Self {
            stream: Some(stream),
            header,
            codec,
            window,
            free_list: FreeList::new(),
            root: None,
            closed: false,
        })
    }

    /// Opens a store previously written to `stream`.
    ///
    /// Fails if the stream was written for another tree flavor or format
    /// version, or if its last session never flushed its counters.
    pub fn open(mut stream: S, config: &StoreConfig) -> StoreResult<Self> {
        let (header, begin_position) = StoreHeader::read_from(
            &mut stream,
            config.flavor(),
            config.version(),
            config.crs_codec(),
        )?;
        if header.crs.dimension() == 0 {
            return Err(StoreError::InvalidHeader("CRS has no axes".into()));
        }

        let codec = NodeCodec::new(header.crs.dimension(), header.byte_order);
        let window = NodeWindow::open(
            &mut stream,
            begin_position,
            codec.record_size(),
            config.buffer_capacity(),
        )?;

        let mut store = Self {
            stream: Some(stream),
            header,
            codec,
            window,
            free_list: FreeList::new(),
            root: None,
            closed: false,
        };
        if store.header.tree_identifier > 0 {
            let root = store.read_node(store.header.tree_identifier)?;
            store.root = Some(root);
        }

        log::debug!(
            "Opened {} store: {} elements, next node id {}",
            store.header.flavor.name(),
            store.header.element_count,
            store.header.node_id_counter
        );
        Ok(store)
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::ChannelClosed)
        } else {
            Ok(())
        }
    }

    /// Moves the window onto record `id` and returns nothing; the record is
    /// then reachable through the window cursor.
    fn prepare_access(&mut self, id: NodeId) -> StoreResult<()> {
        self.ensure_open()?;
        let offset = self.codec.record_offset(self.window.begin_position(), id)?;
        let stream = self.stream.as_mut().ok_or(StoreError::ChannelClosed)?;
        self.window.prepare_access(stream, offset)
    }

    /// Reads the node stored at `id`.
    pub fn read_node(&mut self, id: NodeId) -> StoreResult<Node> {
        self.prepare_access(id)?;
        Ok(self.codec.decode(id, self.window.record()))
    }

    /// Writes `node` at the record named by its id.
    pub fn write_node(&mut self, node: &Node) -> StoreResult<()> {
        self.codec.validate(node)?;
        self.prepare_access(node.id)?;
        self.codec.encode(node, self.window.record_mut());
        if node.id == self.header.tree_identifier {
            let mut root = node.clone();
            if root.boundary.as_ref().is_some_and(BoundingBox::is_empty) {
                root.boundary = None;
            }
            self.root = Some(root);
        }
        Ok(())
    }

    /// Marks `node` as removed. The record is left in place; only the id is
    /// recorded in the free-list. Returns false if it was already free.
    pub fn remove_node(&mut self, node: &Node) -> StoreResult<bool> {
        self.ensure_open()?;
        if node.id <= 0 {
            return Err(StoreError::InvalidNodeId(node.id));
        }
        Ok(self.free_list.record(node.id))
    }

    /// Returns the leaf entries under `root` whose path intersects `query`.
    pub fn search(&mut self, root: NodeId, query: &BoundingBox) -> StoreResult<Vec<NodeId>> {
        self.search_with(root, query, BoundingBox::intersects)
    }

    /// Like [`search`](NodeStore::search), with a caller supplied
    /// intersection predicate.
    pub fn search_with<P>(
        &mut self,
        root: NodeId,
        query: &BoundingBox,
        intersects: P,
    ) -> StoreResult<Vec<NodeId>>
    where
        P: Fn(&BoundingBox, &BoundingBox) -> bool,
    {
        self.ensure_open()?;
        if query.dimension() != self.codec.dimension() {
            return Err(StoreError::InvalidArgument(format!(
                "query is {}D but the store is {}D",
                query.dimension(),
                self.codec.dimension()
            )));
        }
        search_nodes(root, query, |id| self.read_node(id), intersects)
    }

    /// Flushes the window and moves it back to record 1, ready for a
    /// sequential pass from the root.
    pub fn rewind(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let stream = self.stream.as_mut().ok_or(StoreError::ChannelClosed)?;
        self.window.rewind(stream)
    }

    /// Writes the dirty window and the header counters, then reloads the
    /// window. The stream stays open.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let stream = self.stream.as_mut().ok_or(StoreError::ChannelClosed)?;
        self.window.flush(stream)?;
        self.header.write_counters(stream)?;
        stream.sync()?;
        self.window.reload(stream)
    }

    /// Writes the dirty window and the header counters and releases the
    /// stream. Every later operation fails with `ChannelClosed`.
    pub fn close(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        let stream = self.stream.as_mut().ok_or(StoreError::ChannelClosed)?;
        self.window.flush(stream)?;
        self.header.write_counters(stream)?;
        stream.close()?;
        self.closed = true;

        log::debug!(
            "Closed {} store: {} elements, next node id {}",
            self.header.flavor.name(),
            self.header.element_count,
            self.header.node_id_counter
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Closes the store if needed and hands back its stream.
    pub fn into_stream(mut self) -> StoreResult<S> {
        self.close()?;
        self.stream.take().ok_or(StoreError::ChannelClosed)
    }

    /// Drops every record and resets the counters and the free-list. The
    /// header itself is kept.
    pub fn clear(&mut self) -> StoreResult<()> {
        self.ensure_open()?;
        let begin_position = self.window.begin_position();
        let stream = self.stream.as_mut().ok_or(StoreError::ChannelClosed)?;
        self.window.discard();
        stream.truncate(begin_position)?;

        self.header.node_id_counter = 1;
        self.header.tree_identifier = 0;
        self.header.element_count = 0;
        self.free_list.clear();
        self.root = None;

        log::debug!("Cleared {} store", self.header.flavor.name());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------------

    /// Returns the next node id and advances the counter. Freed ids are not
    /// reissued here; see [`free_list_mut`](NodeStore::free_list_mut).
    pub fn allocate_id(&mut self) -> StoreResult<NodeId> {
        self.ensure_open()?;
        let id = self.header.node_id_counter;
        self.header.node_id_counter = id.checked_add(1).ok_or_else(|| {
            StoreError::InvariantViolation("node id space exhausted".into())
        })?;
        Ok(id)
    }

    /// The next id [`allocate_id`](NodeStore::allocate_id) will return.
    pub fn node_id_counter(&self) -> NodeId {
        self.header.node_id_counter
    }

    pub fn set_node_id_counter(&mut self, next_id: NodeId) -> StoreResult<()> {
        self.ensure_open()?;
        if next_id <= 0 {
            return Err(StoreError::InvalidNodeId(next_id));
        }
        self.header.node_id_counter = next_id;
        Ok(())
    }

    /// Id of the root node; 0 for an empty tree.
    pub fn tree_identifier(&self) -> NodeId {
        self.header.tree_identifier
    }

    /// Sets the root id and loads the root node.
    pub fn set_tree_identifier(&mut self, root_id: NodeId) -> StoreResult<()> {
        self.ensure_open()?;
        if root_id < 0 {
            return Err(StoreError::InvalidNodeId(root_id));
        }
        self.root = if root_id > 0 {
            Some(self.read_node(root_id)?)
        } else {
            None
        };
        self.header.tree_identifier = root_id;
        Ok(())
    }

    pub fn element_count(&self) -> i32 {
        self.header.element_count
    }

    pub fn set_element_count(&mut self, element_count: i32) -> StoreResult<()> {
        self.ensure_open()?;
        if element_count < 0 {
            return Err(StoreError::InvalidArgument(format!(
                "element count must not be negative, got {}",
                element_count
            )));
        }
        self.header.element_count = element_count;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The root node, loaded on open and refreshed whenever it is written.
    pub fn root(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn header(&self) -> &StoreHeader {
        &self.header
    }

    pub fn flavor(&self) -> TreeFlavor {
        self.header.flavor
    }

    pub fn crs(&self) -> &CrsDescriptor {
        &self.header.crs
    }

    pub fn dimension(&self) -> usize {
        self.codec.dimension()
    }

    pub fn record_size(&self) -> usize {
        self.codec.record_size()
    }

    /// Offset of record 1, right after the header.
    pub fn begin_position(&self) -> u64 {
        self.window.begin_position()
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn free_list(&self) -> &FreeList {
        &self.free_list
    }

    pub fn free_list_mut(&mut self) -> &mut FreeList {
        &mut self.free_list
    }

    pub fn stats(&self) -> StoreStats {
        self.window.stats().clone()
    }

    /// Number of record slots held by the stream and the dirty window.
    pub fn record_count(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        let stream = self.stream.as_ref().ok_or(StoreError::ChannelClosed)?;
        let end = stream
            .size()?
            .max(self.window.start() + self.window.dirty_len() as u64);
        let begin = self.window.begin_position();
        Ok(end.saturating_sub(begin) / self.codec.record_size() as u64)
    }
}

impl NodeStore<FileStream> {
    /// Creates (or truncates) the file at `path` and creates a store on it.
    pub fn create_file(
        path: impl AsRef<Path>,
        config: &StoreConfig,
        settings: TreeSettings,
    ) -> StoreResult<Self> {
        Self::create(FileStream::create(path.as_ref())?, config, settings)
    }

    pub fn open_file(path: impl AsRef<Path>, config: &StoreConfig) -> StoreResult<Self> {
        Self::open(FileStream::open(path.as_ref())?, config)
    }
}

impl NodeStore<MemoryStream> {
    pub fn create_in_memory(config: &StoreConfig, settings: TreeSettings) -> StoreResult<Self> {
        Self::create(MemoryStream::new(), config, settings)
    }

    /// Opens a store from bytes produced by a closed in-memory store.
    pub fn open_in_memory(bytes: Vec<u8>, config: &StoreConfig) -> StoreResult<Self> {
        Self::open(MemoryStream::from_bytes(bytes), config)
    }
}

impl<S: BackingStream> Drop for NodeStore<S> {
    fn drop(&mut self) {
        if !self.closed && self.stream.is_some() {
            if let Err(e) = self.close() {
                log::error!("Failed to close node store on drop: {}", e);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
