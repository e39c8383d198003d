//! Fixed-size node record codec.
//!
//! A record holds, in order: `2 × dimension` boundary doubles, the
//! properties byte, parent id, sibling id, child id and child count. The node
//! id is not stored; it follows from the record position.

use super::header::ByteOrder;
use super::store_constants::record_size;
use super::store_types::{Node, NodeId, NodeProperties, StoreError, StoreResult};
use crate::bounding_box::BoundingBox;

/// Encodes and decodes node records of one store.
#[derive(Debug, Clone, Copy)]
pub struct NodeCodec {
    dimension: usize,
    byte_order: ByteOrder,
    record_size: usize,
}

impl NodeCodec {
    pub fn new(dimension: usize, byte_order: ByteOrder) -> Self {
        Self {
            dimension,
            byte_order,
            record_size: record_size(dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Byte offset of the record for `id`, given the offset of record 1.
    pub fn record_offset(&self, begin_position: u64, id: NodeId) -> StoreResult<u64> {
        if id <= 0 {
            return Err(StoreError::InvalidNodeId(id));
        }
        Ok(begin_position + (id as u64 - 1) * self.record_size as u64)
    }

    /// Checks that a node can be stored by this codec.
    pub fn validate(&self, node: &Node) -> StoreResult<()> {
        if node.id <= 0 {
            return Err(StoreError::InvalidNodeId(node.id));
        }
        if let Some(boundary) = &node.boundary {
            if boundary.dimension() != self.dimension {
                return Err(StoreError::InvalidArgument(format!(
                    "node {} has a {}D boundary but the store is {}D",
                    node.id,
                    boundary.dimension(),
                    self.dimension
                )));
            }
        }
        Ok(())
    }

    /// Writes `node` into `dst`, which must hold at least one record.
    pub fn encode(&self, node: &Node, dst: &mut [u8]) {
        let order = self.byte_order;
        let coords = 2 * self.dimension;
        let mut offset = 0;
        match &node.boundary {
            Some(boundary) => {
                for &c in boundary.coords() {
                    order.write_f64(&mut dst[offset..], c);
                    offset += 8;
                }
            }
            None => {
                for _ in 0..coords {
                    order.write_f64(&mut dst[offset..], f64::NAN);
                    offset += 8;
                }
            }
        }
        dst[offset] = node.properties.bits();
        offset += 1;
        for value in [node.parent_id, node.sibling_id, node.child_id, node.child_count] {
            order.write_i32(&mut dst[offset..], value);
            offset += 4;
        }
    }

    /// Reads the record in `src` back into a node carrying `id`.
    pub fn decode(&self, id: NodeId, src: &[u8]) -> Node {
        let order = self.byte_order;
        let coords: Vec<f64> = (0..2 * self.dimension)
            .map(|i| order.read_f64(&src[i * 8..]))
            .collect();
        let boundary = if coords.iter().all(|c| c.is_nan()) {
            None
        } else {
            Some(BoundingBox::new(&coords))
        };

        let mut offset = coords.len() * 8;
        let properties = NodeProperties::from_bits(src[offset]);
        offset += 1;
        let mut ints = [0i32; 4];
        for value in ints.iter_mut() {
            *value = order.read_i32(&src[offset..]);
            offset += 4;
        }

        Node {
            id,
            boundary,
            properties,
            parent_id: ints[0],
            sibling_id: ints[1],
            child_id: ints[2],
            child_count: ints[3],
        }
    }
}
