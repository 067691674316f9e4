use std::collections::HashSet;

use crate::foundation::core::{ObjectId, Point, Rect, Vec2};
use crate::foundation::error::{KinemaError, KinemaResult};
use crate::foundation::fingerprint::{StableHasher, StateFingerprint};
use crate::item::data::ItemData;
use crate::item::scene::Scene;

/// One node of an [`ItemTree`].
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    /// Scene item this node was copied from, if any.
    pub origin: Option<ObjectId>,
    /// Index of the parent node; `None` only for the root.
    pub parent: Option<usize>,
    pub data: ItemData,
}

/// Detached copy of an item subtree.
///
/// Nodes are stored parents-first: every node's parent has a smaller index. Children of a node
/// keep their relative order.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemTree {
    nodes: Vec<TreeNode>,
}

impl ItemTree {
    /// Tree holding only `root`.
    pub fn new(root: ItemData) -> Self {
        Self {
            nodes: vec![TreeNode {
                origin: None,
                parent: None,
                data: root,
            }],
        }
    }

    /// Append a child under node `parent`. Returns the new node's index.
    pub fn push_child(&mut self, parent: usize, data: ItemData) -> KinemaResult<usize> {
        self.push_node(parent, None, data)
    }

    fn push_node(
        &mut self,
        parent: usize,
        origin: Option<ObjectId>,
        data: ItemData,
    ) -> KinemaResult<usize> {
        if parent >= self.nodes.len() {
            return Err(KinemaError::validation(format!(
                "tree has no node {parent}"
            )));
        }
        self.nodes.push(TreeNode {
            origin,
            parent: Some(parent),
            data,
        });
        Ok(self.nodes.len() - 1)
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Every node, parents first.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&TreeNode> {
        self.nodes.get(idx)
    }

    pub fn data_mut(&mut self, idx: usize) -> Option<&mut ItemData> {
        self.nodes.get_mut(idx).map(|n| &mut n.data)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of the direct children of `idx`, in order.
    pub fn children_of(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, n)| n.parent == Some(idx))
            .map(|(i, _)| i)
    }

    /// Index of the node copied from `origin`.
    pub fn index_of(&self, origin: ObjectId) -> Option<usize> {
        self.nodes.iter().position(|n| n.origin == Some(origin))
    }

    /// Translate every node.
    pub fn shift(&mut self, by: Vec2) {
        for n in &mut self.nodes {
            n.data.shift(by);
        }
    }

    /// Rotate every node by `angle` radians around `about`.
    pub fn rotate_about(&mut self, angle: f64, about: Point) {
        for n in &mut self.nodes {
            n.data.rotate_about(angle, about);
        }
    }

    /// Box around every node's points.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.nodes
            .iter()
            .filter_map(|n| n.data.bounding_box())
            .reduce(|a, b| a.union(b))
    }

    /// Center of [`ItemTree::bounding_box`].
    pub fn center(&self) -> Option<Point> {
        self.bounding_box().map(|r| r.center())
    }

    /// Stable digest of structure and data.
    pub fn fingerprint(&self) -> StateFingerprint {
        let mut h = StableHasher::new();
        h.write_u32(self.nodes.len() as u32);
        for n in &self.nodes {
            h.write_u32(n.parent.map_or(u32::MAX, |p| p as u32));
            n.data.hash_into(&mut h);
        }
        h.finish()
    }
}

impl Scene {
    /// Detached copy of `root` and its descendants, each node remembering its origin.
    ///
    /// A descendant reachable through several parents is copied once, under the first parent
    /// met in pre-order.
    pub fn copy_tree(&self, root: ObjectId) -> KinemaResult<ItemTree> {
        let mut tree = ItemTree::new(self.item(root)?.clone());
        tree.nodes[0].origin = Some(root);

        let mut seen = HashSet::from([root]);
        let mut stack: Vec<(ObjectId, usize)> = self
            .children(root)
            .iter()
            .rev()
            .map(|c| (*c, 0))
            .collect();
        while let Some((id, parent)) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let idx = tree.push_node(parent, Some(id), self.item(id)?.clone())?;
            stack.extend(self.children(id).iter().rev().map(|c| (*c, idx)));
        }
        Ok(tree)
    }

    /// Write every node's data back onto its origin item. Nodes without an origin are ignored.
    pub fn restore_tree(&mut self, tree: &ItemTree) -> KinemaResult<()> {
        for n in tree.nodes() {
            if let Some(origin) = n.origin {
                self.set_item(origin, n.data.clone())?;
            }
        }
        Ok(())
    }

    /// Make `target`'s subtree structurally match `tree`.
    ///
    /// Children are matched by position: existing ones are overwritten, missing ones are
    /// spawned, surplus ones are unlinked (not despawned). Returns the spawned items.
    pub fn become_tree(&mut self, target: ObjectId, tree: &ItemTree) -> KinemaResult<Vec<ObjectId>> {
        let mut spawned = Vec::new();
        self.become_node(target, tree, 0, &mut spawned)?;
        Ok(spawned)
    }

    fn become_node(
        &mut self,
        target: ObjectId,
        tree: &ItemTree,
        idx: usize,
        spawned: &mut Vec<ObjectId>,
    ) -> KinemaResult<()> {
        self.set_item(target, tree.nodes[idx].data.clone())?;
        let existing = self.children(target).to_vec();
        let wanted: Vec<usize> = tree.children_of(idx).collect();

        for (pos, &child_idx) in wanted.iter().enumerate() {
            let child = match existing.get(pos) {
                Some(&c) => c,
                None => {
                    let c = self.spawn(tree.nodes[child_idx].data.clone())?;
                    self.add_child(target, c)?;
                    spawned.push(c);
                    c
                }
            };
            self.become_node(child, tree, child_idx, spawned)?;
        }
        for &surplus in existing.iter().skip(wanted.len()) {
            self.remove_child(target, surplus)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/item/tree.rs"]
mod tests;
