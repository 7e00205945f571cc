//! A red-black tree map implementation.
#![warn(missing_docs)]

use std::borrow::Borrow;
use std::cmp::Ordering;

use log::trace;

mod rbtree_node;

use rbtree_node::{Arena, Color, NodeId};

/// An ordered map backed by a red-black tree.
///
/// Keys compare with their [`Ord`] implementation. Inserting a key that is
/// already present adds a second entry rather than overwriting it; `find` and
/// `remove` then resolve to the first match on the search path from the root,
/// which callers must treat as unspecified among equal keys.
///
/// Lookups report presence only; the stored value is reachable through
/// [`min`](RbTreeMap::min) and [`max`](RbTreeMap::max) but not by key. This
/// is a deliberate contract limitation, not an oversight.
///
/// Not thread-safe: callers sharing a map across threads must serialize
/// access externally.
pub struct RbTreeMap<K, V> {
    arena: Arena<K, V>,
    root: Option<NodeId>,
}

impl<K, V> RbTreeMap<K, V> {
    /// Creates a new empty map.
    pub fn new() -> Self {
        RbTreeMap {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Returns true if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of entries by walking the whole tree.
    ///
    /// This is O(n) on every call; the count is deliberately not cached.
    /// Callers that need it frequently should maintain their own counter.
    pub fn size(&self) -> usize {
        // explicit stack: whole-tree walks never rely on the tree being
        // balanced
        let mut count = 0;
        let mut stack = Vec::new();
        if let Some(root) = self.root {
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            count += 1;
            let node = self.arena.get(id);
            if let Some(left) = node.left {
                stack.push(left);
            }
            if let Some(right) = node.right {
                stack.push(right);
            }
        }
        count
    }

    /// Removes every entry from the map.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    /// Returns the entry with the smallest key, or `None` on an empty map.
    pub fn min(&self) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(left) = self.left(id) {
            id = left;
        }
        let node = self.arena.get(id);
        Some((&node.key, &node.value))
    }

    /// Returns the entry with the largest key, or `None` on an empty map.
    pub fn max(&self) -> Option<(&K, &V)> {
        let mut id = self.root?;
        while let Some(right) = self.right(id) {
            id = right;
        }
        let node = self.arena.get(id);
        Some((&node.key, &node.value))
    }
}

impl<K, V> Default for RbTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RbTreeMap<K, V>
where
    K: Ord,
{
    /// Inserts a key-value pair into the map.
    ///
    /// An equal key routes right during the descent, so a duplicate insert
    /// adds a second entry alongside the existing one.
    pub fn insert(&mut self, key: K, value: V) {
        let node = self.arena.alloc(key, value);
        let Some(root) = self.root else {
            self.arena.get_mut(node).color = Color::Black;
            self.root = Some(node);
            return;
        };
        let mut current = root;
        loop {
            if self.arena.get(node).key < self.arena.get(current).key {
                match self.left(current) {
                    Some(next) => current = next,
                    None => {
                        self.arena.get_mut(current).left = Some(node);
                        break;
                    }
                }
            } else {
                match self.right(current) {
                    Some(next) => current = next,
                    None => {
                        self.arena.get_mut(current).right = Some(node);
                        break;
                    }
                }
            }
        }
        self.arena.get_mut(node).parent = Some(current);
        self.insert_fixup(node);
    }

    /// Returns whether an entry matching the key is present.
    ///
    /// Presence only: the stored value is not exposed here.
    pub fn find<Q: ?Sized + Ord>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.locate(key).is_some()
    }

    /// Removes the first entry matching the key on the search path.
    ///
    /// Returns `false` when no entry matches; the tree is left untouched in
    /// that case.
    pub fn remove<Q: ?Sized + Ord>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        let Some(mut target) = self.locate(key) else {
            return false;
        };

        if let (Some(left), Some(right)) = (self.left(target), self.right(target)) {
            // Absorb a neighbor that has at most one child. A red
            // predecessor splices out without any further repair, so prefer
            // it; otherwise fall back to the successor.
            let mut neighbor = self.subtree_max(left);
            if self.arena.get(neighbor).color == Color::Black {
                neighbor = self.subtree_min(right);
            }
            self.arena.swap_payload(target, neighbor);
            target = neighbor;
        }

        // target now has at most one child
        let child = self.left(target).or(self.right(target));
        let parent = self.parent(target);
        self.replace_child(parent, target, child);
        let removed = self.arena.release(target);
        trace!("remove: spliced a {:?} node", removed.color);

        if removed.color == Color::Black {
            if self.color_of(child) == Color::Red {
                // paths through the replacement keep their black count
                let child = child.expect("a red replacement child is present");
                self.arena.get_mut(child).color = Color::Black;
            } else if self.root.is_some() {
                self.remove_fixup(child, parent);
            }
        }
        true
    }

    /// Returns the first node matching the key on the search path from the
    /// root; among duplicates this is the one closest to the root.
    fn locate<Q: ?Sized + Ord>(&self, key: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
    {
        let mut current = self.root;
        while let Some(id) = current {
            let node = self.arena.get(id);
            match key.cmp(node.key.borrow()) {
                Ordering::Equal => return Some(id),
                Ordering::Less => current = node.left,
                Ordering::Greater => current = node.right,
            }
        }
        None
    }
}

impl<K, V> RbTreeMap<K, V> {
    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).parent
    }

    fn left(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).left
    }

    fn right(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).right
    }

    /// Color of an optional node; an absent child counts as black.
    fn color_of(&self, id: Option<NodeId>) -> Color {
        id.map_or(Color::Black, |id| self.arena.get(id).color)
    }

    fn sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        if self.left(parent) == Some(id) {
            self.right(parent)
        } else {
            self.left(parent)
        }
    }

    fn grandparent(&self, id: NodeId) -> Option<NodeId> {
        self.parent(self.parent(id)?)
    }

    fn uncle(&self, id: NodeId) -> Option<NodeId> {
        self.sibling(self.parent(id)?)
    }

    fn both_children_black(&self, id: NodeId) -> bool {
        let node = self.arena.get(id);
        self.color_of(node.left) == Color::Black && self.color_of(node.right) == Color::Black
    }

    fn subtree_min(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.left(id) {
            id = left;
        }
        id
    }

    fn subtree_max(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.right(id) {
            id = right;
        }
        id
    }

    /// Points the parent's child slot (or the root slot when `parent` is
    /// `None`) at `new_child` and fixes the back link.
    fn replace_child(
        &mut self,
        parent: Option<NodeId>,
        old_child: NodeId,
        new_child: Option<NodeId>,
    ) {
        match parent {
            Some(parent) => {
                let node = self.arena.get_mut(parent);
                if node.left == Some(old_child) {
                    node.left = new_child;
                } else {
                    node.right = new_child;
                }
            }
            None => self.root = new_child,
        }
        if let Some(new_child) = new_child {
            self.arena.get_mut(new_child).parent = parent;
        }
    }

    /// Rotates left around `node`; its right child takes its place. The
    /// in-order key sequence is unchanged.
    fn rotate_left(&mut self, node: NodeId) {
        let pivot = self.right(node).expect("left rotation requires a right child");
        let inner = self.left(pivot);
        let parent = self.parent(node);

        self.arena.get_mut(node).right = inner;
        if let Some(inner) = inner {
            self.arena.get_mut(inner).parent = Some(node);
        }

        self.replace_child(parent, node, Some(pivot));

        self.arena.get_mut(pivot).left = Some(node);
        self.arena.get_mut(node).parent = Some(pivot);
    }

    /// Rotates right around `node`; its left child takes its place.
    fn rotate_right(&mut self, node: NodeId) {
        let pivot = self.left(node).expect("right rotation requires a left child");
        let inner = self.right(pivot);
        let parent = self.parent(node);

        self.arena.get_mut(node).left = inner;
        if let Some(inner) = inner {
            self.arena.get_mut(inner).parent = Some(node);
        }

        self.replace_child(parent, node, Some(pivot));

        self.arena.get_mut(pivot).right = Some(node);
        self.arena.get_mut(node).parent = Some(pivot);
    }

    /// Restores the coloring rules after `node` was attached as a red leaf.
    fn insert_fixup(&mut self, mut node: NodeId) {
        while let Some(parent) = self.parent(node) {
            if self.arena.get(parent).color == Color::Black {
                return;
            }
            // a red parent cannot be the root, so a grandparent exists
            let grandparent = self
                .grandparent(node)
                .expect("a red parent implies a grandparent");
            if let Some(uncle) = self
                .uncle(node)
                .filter(|&uncle| self.arena.get(uncle).color == Color::Red)
            {
                trace!("insert fixup: red uncle, recoloring and climbing");
                self.arena.get_mut(parent).color = Color::Black;
                self.arena.get_mut(uncle).color = Color::Black;
                self.arena.get_mut(grandparent).color = Color::Red;
                node = grandparent;
                continue;
            }
            trace!("insert fixup: restructuring at the grandparent");
            let parent_is_left = self.left(grandparent) == Some(parent);
            let middle = if parent_is_left {
                if self.right(parent) == Some(node) {
                    // inner grandchild: straighten the zig-zag first
                    self.rotate_left(parent);
                    node
                } else {
                    parent
                }
            } else if self.left(parent) == Some(node) {
                self.rotate_right(parent);
                node
            } else {
                parent
            };
            // terminal rotation: the middle node takes the grandparent's
            // place, black over red
            self.arena.get_mut(middle).color = Color::Black;
            self.arena.get_mut(grandparent).color = Color::Red;
            if parent_is_left {
                self.rotate_right(grandparent);
            } else {
                self.rotate_left(grandparent);
            }
            return;
        }
        self.arena.get_mut(node).color = Color::Black;
    }

    /// Restores the black-height after a black node was spliced out above
    /// the position `node`. The parent of that position is tracked
    /// separately because `node` may be an absent child.
    fn remove_fixup(&mut self, mut node: Option<NodeId>, mut parent: Option<NodeId>) {
        while node != self.root && self.color_of(node) == Color::Black {
            let Some(current_parent) = parent else {
                break;
            };
            if self.left(current_parent) == node {
                let mut sibling = self.right(current_parent);
                if self.color_of(sibling) == Color::Red {
                    trace!("remove fixup: rotating a red sibling into the parent");
                    let red_sibling = sibling.expect("a red sibling is present");
                    self.arena.get_mut(red_sibling).color = Color::Black;
                    self.arena.get_mut(current_parent).color = Color::Red;
                    self.rotate_left(current_parent);
                    sibling = self.right(current_parent);
                }
                let Some(mut sibling) = sibling else {
                    // nothing to borrow from on this side, push the
                    // deficiency upward
                    node = Some(current_parent);
                    parent = self.parent(current_parent);
                    continue;
                };
                if self.both_children_black(sibling) {
                    trace!("remove fixup: recoloring the sibling, deficiency moves up");
                    self.arena.get_mut(sibling).color = Color::Red;
                    node = Some(current_parent);
                    parent = self.parent(current_parent);
                    continue;
                }
                if self.color_of(self.right(sibling)) == Color::Black {
                    // the red child is the inner one; surface it outside
                    if let Some(inner) = self.left(sibling) {
                        self.arena.get_mut(inner).color = Color::Black;
                    }
                    self.arena.get_mut(sibling).color = Color::Red;
                    self.rotate_right(sibling);
                    sibling = self
                        .right(current_parent)
                        .expect("the rotated child is the new sibling");
                }
                trace!("remove fixup: terminal rotation at the parent");
                let parent_color = self.arena.get(current_parent).color;
                self.arena.get_mut(sibling).color = parent_color;
                self.arena.get_mut(current_parent).color = Color::Black;
                if let Some(outer) = self.right(sibling) {
                    self.arena.get_mut(outer).color = Color::Black;
                }
                self.rotate_left(current_parent);
                node = self.root;
                break;
            } else {
                // mirror of the branch above
                let mut sibling = self.left(current_parent);
                if self.color_of(sibling) == Color::Red {
                    trace!("remove fixup: rotating a red sibling into the parent");
                    let red_sibling = sibling.expect("a red sibling is present");
                    self.arena.get_mut(red_sibling).color = Color::Black;
                    self.arena.get_mut(current_parent).color = Color::Red;
                    self.rotate_right(current_parent);
                    sibling = self.left(current_parent);
                }
                let Some(mut sibling) = sibling else {
                    node = Some(current_parent);
                    parent = self.parent(current_parent);
                    continue;
                };
                if self.both_children_black(sibling) {
                    trace!("remove fixup: recoloring the sibling, deficiency moves up");
                    self.arena.get_mut(sibling).color = Color::Red;
                    node = Some(current_parent);
                    parent = self.parent(current_parent);
                    continue;
                }
                if self.color_of(self.left(sibling)) == Color::Black {
                    if let Some(inner) = self.right(sibling) {
                        self.arena.get_mut(inner).color = Color::Black;
                    }
                    self.arena.get_mut(sibling).color = Color::Red;
                    self.rotate_left(sibling);
                    sibling = self
                        .left(current_parent)
                        .expect("the rotated child is the new sibling");
                }
                trace!("remove fixup: terminal rotation at the parent");
                let parent_color = self.arena.get(current_parent).color;
                self.arena.get_mut(sibling).color = parent_color;
                self.arena.get_mut(current_parent).color = Color::Black;
                if let Some(outer) = self.left(sibling) {
                    self.arena.get_mut(outer).color = Color::Black;
                }
                self.rotate_right(current_parent);
                node = self.root;
                break;
            }
        }
        if let Some(node) = node {
            self.arena.get_mut(node).color = Color::Black;
        }
    }
}

impl<K, V> RbTreeMap<K, V> {
    #[cfg(test)]
    /// Collects every entry in key order for testing purposes.
    pub fn in_order(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        let mut out = Vec::new();
        let mut stack = Vec::new();
        let mut current = self.root;
        while current.is_some() || !stack.is_empty() {
            while let Some(id) = current {
                stack.push(id);
                current = self.arena.get(id).left;
            }
            let id = stack.pop().unwrap();
            let node = self.arena.get(id);
            out.push((node.key.clone(), node.value.clone()));
            current = node.right;
        }
        out
    }
}
