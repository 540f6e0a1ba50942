//! Tree storage: every node ever created, addressed by slot index
//!
//! Removing a node from the tree only unlinks it. The slot stays allocated,
//! so a detached node can be re-inserted later.
//!
//! ```text
//! nodes:    [0: #document][1: HTML][2: BODY][3: DIV]...
//! uuid_map: "5f0c…" → 3
//! ```

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};
use ahash::AHashMap;

#[derive(Debug)]
pub struct DomArena {
    nodes: Vec<DomNode>,

    /// Platform unique id → NodeId lookup
    uuid_map: AHashMap<String, NodeId>,
}

impl DomArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(256),
            uuid_map: AHashMap::with_capacity(256),
        }
    }

    /// Allocate a detached node, returns its ID
    pub fn alloc(&mut self, node_type: NodeType, node_name: &str) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        let node = DomNode::new(node_id, node_type, node_name.to_string());
        self.uuid_map.insert(node.uuid.clone(), node_id);
        self.nodes.push(node);
        node_id
    }

    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Slot of the node carrying a platform unique id
    pub fn get_by_uuid(&self, uuid: &str) -> Option<NodeId> {
        self.uuid_map.get(uuid).copied()
    }

    /// Number of allocated slots, detached nodes included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Child records in order, text and comments included
    pub fn children(&self, node_id: NodeId) -> Result<Vec<&DomNode>> {
        self.get(node_id)?
            .children_ids
            .iter()
            .map(|&child| self.get(child))
            .collect()
    }

    /// Ancestor chain, nearest first
    pub fn ancestors(&self, node_id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut current = self.get(node_id)?.parent_id;
        while let Some(id) = current {
            out.push(id);
            current = self.get(id)?.parent_id;
        }
        Ok(out)
    }

    /// Topmost ancestor (the node itself when detached)
    pub fn tree_root(&self, node_id: NodeId) -> Result<NodeId> {
        Ok(self.ancestors(node_id)?.last().copied().unwrap_or(node_id))
    }

    /// True when `other` is `node_id` or one of its descendants
    pub fn contains(&self, node_id: NodeId, other: NodeId) -> bool {
        let mut current = Some(other);
        while let Some(id) = current {
            if id == node_id {
                return true;
            }
            current = self.nodes.get(id as usize).and_then(|n| n.parent_id);
        }
        false
    }

    /// Position among the parent's children
    pub fn index_in_parent(&self, node_id: NodeId) -> Result<Option<usize>> {
        let node = self.get(node_id)?;
        match node.parent_id {
            Some(parent_id) => Ok(self
                .get(parent_id)?
                .children_ids
                .iter()
                .position(|&c| c == node_id)),
            None => Ok(None),
        }
    }

    /// Visit `start_id` and its subtree in document order
    pub fn traverse_df<F>(&self, start_id: NodeId, mut visit: F) -> Result<()>
    where
        F: FnMut(&DomNode) -> Result<()>,
    {
        let mut pending = vec![start_id];
        while let Some(id) = pending.pop() {
            let node = self.get(id)?;
            visit(node)?;
            pending.extend(node.children_ids.iter().rev().copied());
        }
        Ok(())
    }

    /// Descendants in document order, excluding the start node
    pub fn descendants(&self, start_id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        self.traverse_df(start_id, |node| {
            if node.node_id != start_id {
                out.push(node.node_id);
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Descendants of `start_id` accepted by `predicate`, document order
    pub fn find<F>(&self, start_id: NodeId, predicate: F) -> Result<Vec<NodeId>>
    where
        F: Fn(&DomNode) -> bool,
    {
        let mut out = Vec::new();
        self.traverse_df(start_id, |node| {
            if node.node_id != start_id && predicate(node) {
                out.push(node.node_id);
            }
            Ok(())
        })?;
        Ok(out)
    }

    /// Elements below `start_id` with a tag name (`*` matches any)
    pub fn find_by_tag(&self, start_id: NodeId, tag: &str) -> Result<Vec<NodeId>> {
        let any = tag == "*";
        self.find(start_id, |node| {
            node.is_element() && (any || node.node_name.eq_ignore_ascii_case(tag))
        })
    }

    /// First element below `start_id` whose `id` attribute matches
    pub fn find_by_id(&self, start_id: NodeId, id: &str) -> Result<Option<NodeId>> {
        Ok(self
            .find(start_id, |node| node.is_element() && node.attr("id") == Some(id))?
            .into_iter()
            .next())
    }

    /// Unlink a node from its parent; no-op when already detached
    pub fn detach(&mut self, node_id: NodeId) -> Result<()> {
        let parent_id = self.get(node_id)?.parent_id;
        if let Some(parent_id) = parent_id {
            let parent = self.get_mut(parent_id)?;
            parent.children_ids.retain(|c| *c != node_id);
            self.get_mut(node_id)?.parent_id = None;
        }
        Ok(())
    }

    /// Insert `child` under `parent` before `reference` (append when None).
    ///
    /// Fragments are emptied into the target, matching DOM semantics.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<NodeId> {
        if self.contains(child, parent) {
            return Err(DomError::HierarchyRequest {
                parent,
                node: child,
            });
        }
        if let Some(reference) = reference {
            if self.get(reference)?.parent_id != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }

        let incoming: Vec<NodeId> = if self.get(child)?.node_type == NodeType::DocumentFragment {
            self.get(child)?.children_ids.to_vec()
        } else {
            vec![child]
        };

        for id in incoming {
            if Some(id) == reference {
                continue;
            }
            self.detach(id)?;
            let position = match reference {
                Some(reference) => self
                    .get(parent)?
                    .children_ids
                    .iter()
                    .position(|&c| c == reference),
                None => None,
            };
            let parent_node = self.get_mut(parent)?;
            match position {
                Some(pos) => parent_node.children_ids.insert(pos, id),
                None => parent_node.children_ids.push(id),
            }
            self.get_mut(id)?.parent_id = Some(parent);
        }

        Ok(child)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        self.insert_before(parent, child, None)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        if self.get(child)?.parent_id != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)?;
        Ok(child)
    }

    /// Replace `old` with `new` under `parent`; returns `old`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<NodeId> {
        if self.get(old)?.parent_id != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new != old {
            self.insert_before(parent, new, Some(old))?;
            self.detach(old)?;
        }
        Ok(old)
    }

    /// Copy a node (and its subtree when `deep`). The copy is detached and
    /// carries the expando properties of the source, but a fresh platform id.
    pub fn clone_node(&mut self, node_id: NodeId, deep: bool) -> Result<NodeId> {
        let source = self.get(node_id)?.clone();
        let copy_id = self.alloc(source.node_type, &source.node_name);
        {
            let copy = self.get_mut(copy_id)?;
            copy.node_value = source.node_value;
            copy.attributes = source.attributes;
            copy.styles = source.styles;
            copy.properties = source.properties;
            copy.form_value = source.form_value;
            copy.checked = source.checked;
        }
        if deep {
            for child in source.children_ids {
                let child_copy = self.clone_node(child, true)?;
                self.append_child(copy_id, child_copy)?;
            }
        }
        Ok(copy_id)
    }
}

impl Default for DomArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (DomArena, NodeId, NodeId, NodeId) {
        let mut arena = DomArena::new();
        let root = arena.alloc(NodeType::Element, "DIV");
        let a = arena.alloc(NodeType::Element, "SPAN");
        let b = arena.alloc(NodeType::Element, "SPAN");
        arena.append_child(root, a).unwrap();
        arena.append_child(root, b).unwrap();
        (arena, root, a, b)
    }

    #[test]
    fn test_alloc_indexes_uuid() {
        let mut arena = DomArena::new();
        let id = arena.alloc(NodeType::Element, "DIV");
        let uuid = arena.get(id).unwrap().uuid.clone();
        assert_eq!(arena.get_by_uuid(&uuid), Some(id));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_descendants_in_document_order() {
        let (mut arena, root, a, b) = tree();
        let inner = arena.alloc(NodeType::Text, "#text");
        arena.append_child(a, inner).unwrap();
        assert_eq!(arena.descendants(root).unwrap(), vec![a, inner, b]);
        assert_eq!(arena.find_by_tag(root, "span").unwrap(), vec![a, b]);
    }

    #[test]
    fn test_children_include_text() {
        let (mut arena, root, a, b) = tree();
        let text = arena.alloc(NodeType::Text, "#text");
        arena.append_child(root, text).unwrap();
        let ids: Vec<NodeId> = arena.children(root).unwrap().iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![a, b, text]);
        assert!(arena.children(a).unwrap().is_empty());
    }

    #[test]
    fn test_insert_before_and_remove() {
        let (mut arena, root, a, b) = tree();
        let c = arena.alloc(NodeType::Element, "EM");
        arena.insert_before(root, c, Some(b)).unwrap();
        assert_eq!(arena.get(root).unwrap().children_ids.to_vec(), vec![a, c, b]);

        arena.remove_child(root, a).unwrap();
        assert_eq!(arena.get(a).unwrap().parent_id, None);
        assert!(matches!(
            arena.remove_child(root, a),
            Err(DomError::NotAChild { .. })
        ));
    }

    #[test]
    fn test_fragment_insert_moves_children() {
        let (mut arena, root, _, _) = tree();
        let frag = arena.alloc(NodeType::DocumentFragment, "#document-fragment");
        let x = arena.alloc(NodeType::Element, "I");
        let y = arena.alloc(NodeType::Element, "B");
        arena.append_child(frag, x).unwrap();
        arena.append_child(frag, y).unwrap();

        arena.append_child(root, frag).unwrap();
        assert!(arena.get(frag).unwrap().children_ids.is_empty());
        assert_eq!(arena.get(root).unwrap().children_ids.len(), 4);
        assert_eq!(arena.get(y).unwrap().parent_id, Some(root));
    }

    #[test]
    fn test_hierarchy_error() {
        let (mut arena, root, a, _) = tree();
        assert!(matches!(
            arena.append_child(a, root),
            Err(DomError::HierarchyRequest { .. })
        ));
    }

    #[test]
    fn test_clone_copies_properties() {
        let (mut arena, root, _, _) = tree();
        arena
            .get_mut(root)
            .unwrap()
            .properties
            .insert("_stamp".into(), "x".into());
        let copy = arena.clone_node(root, true).unwrap();
        let copied = arena.get(copy).unwrap();
        assert_eq!(
            copied.properties.get("_stamp"),
            Some(&serde_json::Value::from("x"))
        );
        assert_eq!(copied.children_ids.len(), 2);
        assert_ne!(copied.uuid, arena.get(root).unwrap().uuid);
        assert_eq!(copied.parent_id, None);
    }
}
