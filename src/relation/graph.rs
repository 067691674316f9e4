use std::collections::{BTreeMap, HashSet};

use slotmap::SecondaryMap;
use smallvec::SmallVec;

use crate::foundation::core::ObjectId;
use crate::foundation::error::{KinemaError, KinemaResult};

#[derive(Clone, Debug, Default)]
struct Links {
    /// Non-owning back references.
    parents: SmallVec<[ObjectId; 2]>,
    /// Ordered, no duplicates.
    children: Vec<ObjectId>,
}

/// Which way [`RelationGraph::walk`] travels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Children, grandchildren, ...
    Descendants,
    /// Parents, grandparents, ...
    Ancestors,
}

/// Structural view of one node, used for before/after comparisons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeLinks {
    /// Parents in insertion order.
    pub parents: Vec<ObjectId>,
    /// Children in insertion order.
    pub children: Vec<ObjectId>,
}

/// Parent/child relation between objects.
///
/// The graph only records links; ownership of the nodes' data lives elsewhere (the scene).
/// A node may have several parents, so the same descendant can be reachable through multiple
/// paths. Traversals visit each node once.
#[derive(Clone, Debug, Default)]
pub struct RelationGraph {
    links: SecondaryMap<ObjectId, Links>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `id` as a node. Returns `false` if it already was one.
    pub fn insert(&mut self, id: ObjectId) -> bool {
        if self.links.contains_key(id) {
            return false;
        }
        self.links.insert(id, Links::default());
        true
    }

    /// Whether `id` is a node of this graph.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.links.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Direct parents of `id` (empty for unknown ids).
    pub fn parents(&self, id: ObjectId) -> &[ObjectId] {
        self.links.get(id).map_or(&[][..], |l| l.parents.as_slice())
    }

    /// Direct children of `id` (empty for unknown ids).
    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.links.get(id).map_or(&[][..], |l| l.children.as_slice())
    }

    /// Whether `ancestor` is reachable from `node` by following parent links (strictly above).
    pub fn is_ancestor(&self, ancestor: ObjectId, node: ObjectId) -> bool {
        self.walk(node, false, Direction::Ancestors)
            .any(|id| id == ancestor)
    }

    /// Append `child` to `parent`'s children.
    ///
    /// Returns `Ok(false)` when the link already existed. Fails with [`KinemaError::Cycle`] if
    /// `child` is `parent` itself or one of its ancestors; the graph is left untouched then.
    pub fn add_child(&mut self, parent: ObjectId, child: ObjectId) -> KinemaResult<bool> {
        self.require(parent)?;
        self.require(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(KinemaError::Cycle { parent, child });
        }

        let Some(plinks) = self.links.get_mut(parent) else {
            return Err(KinemaError::UnknownObject(parent));
        };
        if plinks.children.contains(&child) {
            return Ok(false);
        }
        plinks.children.push(child);

        if let Some(clinks) = self.links.get_mut(child) {
            if !clinks.parents.contains(&parent) {
                clinks.parents.push(parent);
            }
        }
        Ok(true)
    }

    /// Unlink `child` from `parent` in both directions. Returns `false` if they were not linked.
    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> KinemaResult<bool> {
        self.require(parent)?;
        self.require(child)?;

        let mut removed = false;
        if let Some(plinks) = self.links.get_mut(parent) {
            let before = plinks.children.len();
            plinks.children.retain(|c| *c != child);
            removed = plinks.children.len() != before;
        }
        if let Some(clinks) = self.links.get_mut(child) {
            clinks.parents.retain(|p| *p != parent);
        }
        Ok(removed)
    }

    /// Unlink `id` from all of its parents and children. Descendants are not removed.
    ///
    /// Returns the former neighbours (parents first, then children).
    pub fn detach(&mut self, id: ObjectId) -> KinemaResult<Vec<ObjectId>> {
        self.require(id)?;
        let parents: Vec<_> = self.parents(id).to_vec();
        let children: Vec<_> = self.children(id).to_vec();

        for &p in &parents {
            self.remove_child(p, id)?;
        }
        for &c in &children {
            self.remove_child(id, c)?;
        }

        let mut out = parents;
        out.extend(children);
        Ok(out)
    }

    /// Detach `id` and stop tracking it as a node.
    pub fn remove(&mut self, id: ObjectId) -> KinemaResult<Vec<ObjectId>> {
        let neighbours = self.detach(id)?;
        self.links.remove(id);
        Ok(neighbours)
    }

    /// Depth-first, pre-order traversal from `start`.
    ///
    /// Each node is produced once even when reachable through several paths. Unknown `start`
    /// ids produce an empty walk.
    pub fn walk(&self, start: ObjectId, include_self: bool, direction: Direction) -> Walk<'_> {
        let mut stack = Vec::new();
        let mut visited = HashSet::new();
        if self.contains(start) {
            if include_self {
                stack.push(start);
            } else {
                visited.insert(start);
                stack.extend(self.next_of(start, direction).iter().rev().copied());
            }
        }
        Walk {
            graph: self,
            direction,
            stack,
            visited,
        }
    }

    /// Snapshot of every node's links, ordered by id.
    pub fn structure(&self) -> BTreeMap<ObjectId, NodeLinks> {
        self.links
            .iter()
            .map(|(id, l)| {
                (
                    id,
                    NodeLinks {
                        parents: l.parents.to_vec(),
                        children: l.children.clone(),
                    },
                )
            })
            .collect()
    }

    fn next_of(&self, id: ObjectId, direction: Direction) -> &[ObjectId] {
        match direction {
            Direction::Descendants => self.children(id),
            Direction::Ancestors => self.parents(id),
        }
    }

    fn require(&self, id: ObjectId) -> KinemaResult<()> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(KinemaError::UnknownObject(id))
        }
    }
}

/// Lazy traversal returned by [`RelationGraph::walk`].
pub struct Walk<'a> {
    graph: &'a RelationGraph,
    direction: Direction,
    stack: Vec<ObjectId>,
    visited: HashSet<ObjectId>,
}

impl Iterator for Walk<'_> {
    type Item = ObjectId;

    fn next(&mut self) -> Option<ObjectId> {
        while let Some(id) = self.stack.pop() {
            if !self.visited.insert(id) {
                continue;
            }
            let next = self.graph.next_of(id, self.direction);
            self.stack.extend(next.iter().rev().copied());
            return Some(id);
        }
        None
    }
}

#[cfg(test)]
#[path = "../../tests/unit/relation/graph.rs"]
mod tests;
