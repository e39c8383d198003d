use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use super::store_impl::NodeStore;
use super::store_types::{Node, NodeId, StoreResult, StoreStats};
use super::stream::BackingStream;
use crate::bounding_box::BoundingBox;

/// Cloneable handle to a [`NodeStore`] shared between threads.
///
/// Every call takes the store lock for its whole duration, so a search
/// never observes a half-written window. Use [`with`](SharedNodeStore::with)
/// to run several operations under one lock.
pub struct SharedNodeStore<S: BackingStream> {
    inner: Arc<Mutex<NodeStore<S>>>,
}

impl<S: BackingStream> Clone for SharedNodeStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: BackingStream> SharedNodeStore<S> {
    pub fn new(store: NodeStore<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, NodeStore<S>> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut NodeStore<S>) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut store)
    }

    pub fn read_node(&self, id: NodeId) -> StoreResult<Node> {
        self.inner.lock().read_node(id)
    }

    pub fn write_node(&self, node: &Node) -> StoreResult<()> {
        self.inner.lock().write_node(node)
    }

    pub fn remove_node(&self, node: &Node) -> StoreResult<bool> {
        self.inner.lock().remove_node(node)
    }

    pub fn search(&self, root: NodeId, query: &BoundingBox) -> StoreResult<Vec<NodeId>> {
        self.inner.lock().search(root, query)
    }

    pub fn allocate_id(&self) -> StoreResult<NodeId> {
        self.inner.lock().allocate_id()
    }

    pub fn flush(&self) -> StoreResult<()> {
        self.inner.lock().flush()
    }

    pub fn close(&self) -> StoreResult<()> {
        self.inner.lock().close()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_closed()
    }

    pub fn stats(&self) -> StoreStats {
        self.inner.lock().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_store::store_config::{StoreConfig, TreeSettings};
    use std::thread;

    #[test]
    fn test_concurrent_writers() {
        let config = StoreConfig::default().with_buffer_capacity(4 * 49);
        let store = SharedNodeStore::new(
            NodeStore::create_in_memory(&config, TreeSettings::default()).unwrap(),
        );

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let id = store.allocate_id().unwrap();
                        let f = id as f64;
                        let node = Node::new(id)
                            .with_boundary(BoundingBox::from_2d(f, f, f + 1.0, f + 1.0))
                            .with_entry(id + t * 1000);
                        store.write_node(&node).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.lock().node_id_counter(), 201);
        for id in 1..=200 {
            let node = store.read_node(id).unwrap();
            assert_eq!(node.id, id);
            assert_eq!(node.entry().map(|e| e % 1000), Some(id));
        }
        store.close().unwrap();
        assert!(store.is_closed());
    }

    #[test]
    fn test_with_runs_under_one_lock() {
        let store = SharedNodeStore::new(
            NodeStore::create_in_memory(&StoreConfig::default(), TreeSettings::default()).unwrap(),
        );
        let id = store
            .with(|s| -> StoreResult<NodeId> {
                let id = s.allocate_id()?;
                s.write_node(&Node::new(id).with_boundary(BoundingBox::from_2d(0.0, 0.0, 1.0, 1.0)))?;
                s.set_tree_identifier(id)?;
                Ok(id)
            })
            .unwrap();
        assert_eq!(store.lock().root().map(|r| r.id), Some(id));
    }
}
