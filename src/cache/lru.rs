//! Index-addressed doubly linked recency list.
//!
//! Nodes live in a slot arena and link to each other by slot index, so
//! every node has exactly one owner (the arena) and a stale handle can at
//! worst observe an empty slot, never freed memory. Freed slots are
//! recycled through a free list.
//!
//! ```text
//!  head (MRU)                                   tail (LRU)
//!     │                                             │
//!     ▼                                             ▼
//!  [slot 3] ⇄ [slot 0] ⇄ [slot 5] ⇄ ... ⇄ [slot 1]
//! ```

use bytes::Bytes;

/// Handle to a node in an [`LruList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A cached response and its links.
#[derive(Debug)]
pub struct Node {
    pub key: String,
    pub payload: Bytes,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Recency-ordered list, most recently used at the head.
#[derive(Debug, Default)]
pub struct LruList {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl LruList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Least recently used node, if any.
    pub fn back(&self) -> Option<NodeId> {
        self.tail
    }

    /// Most recently used node, if any.
    pub fn front(&self) -> Option<NodeId> {
        self.head
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Insert a new node at the MRU end.
    pub fn push_front(&mut self, key: String, payload: Bytes) -> NodeId {
        let node = Node {
            key,
            payload,
            prev: None,
            next: None,
        };

        let id = match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(node);
                NodeId(index)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        };

        self.link_front(id);
        self.len += 1;
        id
    }

    /// Move an existing node to the MRU end. Returns false for a stale handle.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        if self.head != Some(id) {
            self.unlink(id);
            self.link_front(id);
        }
        true
    }

    /// Detach a node and release its slot.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.get(id)?;
        self.unlink(id);
        let node = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node)
    }

    /// Remove and return the LRU node.
    pub fn pop_back(&mut self) -> Option<Node> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Iterate from MRU to LRU.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.slots[id.0]
            .as_mut()
            .unwrap_or_else(|| unreachable!("linked slot {} is vacant", id.0))
    }

    fn unlink(&mut self, id: NodeId) {
        let (prev, next) = {
            let node = self.node_mut(id);
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, id: NodeId) {
        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.node_mut(h).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
    }
}

/// MRU → LRU iterator over an [`LruList`].
pub struct Iter<'a> {
    list: &'a LruList,
    cursor: Option<NodeId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.get(self.cursor?)?;
        self.cursor = node.next;
        Some(node)
    }
}
