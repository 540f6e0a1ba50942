//! NodeList - an ordered collection of raw nodes
//!
//! The list stores raw handles, not wrappers. Per-element work uses the
//! registered wrapper of each node when there is one, and an unregistered
//! transient wrapper otherwise, so batch calls never grow the registry.

use crate::context::{Context, ListSource, Shared};
use crate::error::{NodeError, Result};
use crate::events::{EventFacade, Subscription};
use crate::host::RawNode;
use crate::node::{Node, NodeContent, Where};
use crate::value::Scrubbed;
use dom::NodeId;
use serde_json::Value;
use std::fmt;
use std::rc::{Rc, Weak};

/// Collected results of a batch call
#[derive(Debug, Clone, PartialEq)]
pub enum Batch {
    /// No element produced a value; the list itself, for chaining
    List(NodeList),
    /// Values other than empty results and the element itself
    Values(Vec<Scrubbed>),
}

impl Batch {
    pub fn is_list(&self) -> bool {
        matches!(self, Batch::List(_))
    }

    pub fn into_values(self) -> Vec<Scrubbed> {
        match self {
            Batch::List(_) => Vec::new(),
            Batch::Values(values) => values,
        }
    }

    /// Plain values, nodes and lists mapped to null
    pub fn into_json(self) -> Vec<Value> {
        self.into_values()
            .into_iter()
            .map(|v| match v {
                Scrubbed::Value(value) => value,
                _ => Value::Null,
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct NodeList {
    nodes: Vec<RawNode>,
    query: Option<String>,
    root: Option<RawNode>,
    ctx: Weak<Shared>,
}

impl NodeList {
    pub(crate) fn from_parts(ctx: Weak<Shared>, nodes: Vec<RawNode>, query: Option<String>, root: Option<RawNode>) -> Self {
        Self { nodes, query, root, ctx }
    }

    fn derived(&self, nodes: Vec<RawNode>) -> Self {
        Self::from_parts(self.ctx.clone(), nodes, None, None)
    }

    pub fn context(&self) -> Result<Context> {
        self.ctx
            .upgrade()
            .map(Context::from_shared)
            .ok_or(NodeError::ContextDropped)
    }

    /// Selector the list was built from
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[RawNode] {
        &self.nodes
    }

    pub(crate) fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().filter_map(|raw| raw.id()).collect()
    }

    /// Canonical wrapper of the element at `index`
    pub fn item(&self, index: usize) -> Option<Node> {
        let raw = *self.nodes.get(index)?;
        self.context().ok()?.one(raw)
    }

    /// Canonical wrappers, in order
    pub fn iter(&self) -> impl Iterator<Item = Node> + '_ {
        let ctx = self.context().ok();
        self.nodes
            .iter()
            .filter_map(move |&raw| ctx.as_ref().and_then(|ctx| ctx.one(raw)))
    }

    pub fn index_of(&self, node: &Node) -> Option<usize> {
        let raw = node.raw()?;
        self.nodes.iter().position(|&n| n == raw)
    }

    // ---------------------------------------------------------------
    // Iteration
    // ---------------------------------------------------------------

    /// Call `f` with each canonical wrapper, its index and the list
    pub fn each<F>(&self, mut f: F) -> Result<&Self>
    where
        F: FnMut(&Node, usize, &NodeList) -> Result<()>,
    {
        let ctx = self.context()?;
        for (index, &raw) in self.nodes.iter().enumerate() {
            if let Some(node) = ctx.one(raw) {
                f(&node, index, self)?;
            }
        }
        Ok(self)
    }

    /// True as soon as `f` returns true for an element
    pub fn some<F>(&self, mut f: F) -> bool
    where
        F: FnMut(&Node, usize, &NodeList) -> bool,
    {
        let Ok(ctx) = self.context() else {
            return false;
        };
        self.nodes
            .iter()
            .enumerate()
            .any(|(index, &raw)| ctx.one(raw).is_some_and(|node| f(&node, index, self)))
    }

    /// Like `each`, without registering wrappers for unwrapped nodes
    pub fn batch<F>(&self, mut f: F) -> Result<&Self>
    where
        F: FnMut(&Node, usize) -> Result<()>,
    {
        let ctx = self.context()?;
        for (index, &raw) in self.nodes.iter().enumerate() {
            f(&ctx.instance_for(raw), index)?;
        }
        Ok(self)
    }

    /// Run `f` on every element and keep the results that are neither
    /// empty nor the element itself
    pub fn apply<F>(&self, f: F) -> Result<Batch>
    where
        F: Fn(&Node) -> Result<Scrubbed>,
    {
        let ctx = self.context()?;
        let mut values = Vec::new();
        for &raw in &self.nodes {
            let instance = ctx.instance_for(raw);
            match f(&instance)? {
                Scrubbed::Empty => {}
                Scrubbed::Node(ref node) if *node == instance => {}
                other => values.push(other),
            }
        }
        if values.is_empty() {
            Ok(Batch::List(self.clone()))
        } else {
            Ok(Batch::Values(values))
        }
    }

    // ---------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------

    /// Elements matching the selector
    pub fn filter(&self, selector: &str) -> NodeList {
        let ids = self.node_ids();
        let matched = self
            .context()
            .map(|ctx| ctx.host(|h| h.filter(&ids, selector)))
            .unwrap_or(Ok(Vec::new()));
        match matched {
            Ok(ids) => self.derived(ids.into_iter().map(RawNode::Node).collect()),
            Err(e) => {
                tracing::warn!("[NodeList] filter {:?} failed: {}", selector, e);
                self.derived(Vec::new())
            }
        }
    }

    /// Elements whose index `i` satisfies `i % n == r`
    pub fn modulus(&self, n: usize, r: usize) -> NodeList {
        if n == 0 {
            return self.derived(Vec::new());
        }
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| i % n == r)
            .map(|(_, &raw)| raw)
            .collect();
        self.derived(nodes)
    }

    pub fn odd(&self) -> NodeList {
        self.modulus(2, 1)
    }

    pub fn even(&self) -> NodeList {
        self.modulus(2, 0)
    }

    /// Re-run the recorded query against its root (the document when none
    /// was recorded); lists not built from a selector are left as they are
    pub fn refresh(&mut self) -> Result<&mut Self> {
        let Some(selector) = self.query.clone() else {
            return Ok(self);
        };
        let ctx = self.context()?;
        let root = match self.root {
            Some(RawNode::Node(id)) if ctx.host(|h| h.exists(id)) => id,
            _ => ctx.host(|h| h.document_node()),
        };
        let found = ctx.host(|h| h.query(&selector, Some(root), false))?;
        tracing::trace!("[NodeList] refreshed {:?}: {} -> {} nodes", selector, self.nodes.len(), found.len());
        self.nodes = found.into_iter().map(RawNode::Node).collect();
        Ok(self)
    }

    /// Move every element into a new fragment
    pub fn to_frag(&self) -> Result<Node> {
        let ctx = self.context()?;
        let ids = self.node_ids();
        let frag = ctx.host_mut(|h| h.to_fragment(&ids))?;
        Ok(ctx.instance_for(RawNode::Node(frag)))
    }

    /// Attribute of every element: a list when the first value is a node,
    /// the values otherwise
    pub fn get(&self, name: &str) -> Result<Batch> {
        let ctx = self.context()?;
        let mut values = Vec::with_capacity(self.nodes.len());
        for &raw in &self.nodes {
            values.push(ctx.instance_for(raw).get(name)?);
        }
        if matches!(values.first(), Some(Scrubbed::Node(_))) {
            let nodes = values
                .iter()
                .filter_map(|v| v.as_node().and_then(Node::raw))
                .collect();
            return Ok(Batch::List(self.derived(nodes)));
        }
        Ok(Batch::Values(values))
    }

    // ---------------------------------------------------------------
    // Batch forms of the wrapper operations
    // ---------------------------------------------------------------

    fn for_each_instance<F>(&self, f: F) -> Result<&Self>
    where
        F: Fn(&Node) -> Result<()>,
    {
        self.batch(|node, _| f(node))
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<&Self> {
        let value = value.into();
        self.for_each_instance(|node| node.set(name, value.clone()).map(|_| ()))
    }

    pub fn show(&self) -> Result<&Self> {
        self.for_each_instance(|node| node.show().map(|_| ()))
    }

    pub fn hide(&self) -> Result<&Self> {
        self.for_each_instance(|node| node.hide().map(|_| ()))
    }

    pub fn toggle_view(&self, on: Option<bool>) -> Result<&Self> {
        self.for_each_instance(|node| node.toggle_view(on, None).map(|_| ()))
    }

    pub fn has_class(&self, class: &str) -> Result<Vec<bool>> {
        let mut found = Vec::with_capacity(self.nodes.len());
        self.batch(|node, _| {
            found.push(node.has_class(class)?);
            Ok(())
        })?;
        Ok(found)
    }

    pub fn add_class(&self, class: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.add_class(class).map(|_| ()))
    }

    pub fn remove_class(&self, class: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.remove_class(class).map(|_| ()))
    }

    pub fn replace_class(&self, old: &str, new: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.replace_class(old, new).map(|_| ()))
    }

    pub fn toggle_class(&self, class: &str, force: Option<bool>) -> Result<&Self> {
        self.for_each_instance(|node| node.toggle_class(class, force).map(|_| ()))
    }

    pub fn get_style(&self, property: &str) -> Result<Vec<String>> {
        let mut styles = Vec::with_capacity(self.nodes.len());
        self.batch(|node, _| {
            styles.push(node.get_style(property)?);
            Ok(())
        })?;
        Ok(styles)
    }

    pub fn get_computed_style(&self, property: &str) -> Result<Vec<String>> {
        let mut styles = Vec::with_capacity(self.nodes.len());
        self.batch(|node, _| {
            styles.push(node.get_computed_style(property)?);
            Ok(())
        })?;
        Ok(styles)
    }

    pub fn set_style(&self, property: &str, value: impl Into<Value>) -> Result<&Self> {
        let value = value.into();
        self.for_each_instance(|node| node.set_style(property, value.clone()).map(|_| ()))
    }

    pub fn set_styles(&self, styles: &[(&str, Value)]) -> Result<&Self> {
        self.for_each_instance(|node| node.set_styles(styles.iter().cloned()).map(|_| ()))
    }

    pub fn get_attribute(&self, name: &str) -> Result<Vec<String>> {
        let mut values = Vec::with_capacity(self.nodes.len());
        self.batch(|node, _| {
            values.push(node.get_attribute(name)?);
            Ok(())
        })?;
        Ok(values)
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.set_attribute(name, value).map(|_| ()))
    }

    pub fn remove_attribute(&self, name: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.remove_attribute(name).map(|_| ()))
    }

    pub fn wrap(&self, html: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.wrap(html).map(|_| ()))
    }

    pub fn unwrap(&self) -> Result<&Self> {
        self.for_each_instance(|node| node.unwrap().map(|_| ()))
    }

    pub fn generate_id(&self) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        self.batch(|node, _| {
            ids.push(node.generate_id()?);
            Ok(())
        })?;
        Ok(ids)
    }

    pub fn append(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Append)
    }

    pub fn prepend(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Index(0))
    }

    pub fn insert(&self, content: impl Into<NodeContent>, at: Where) -> Result<&Self> {
        let content = content.into();
        self.for_each_instance(|node| node.insert(content.clone(), at.clone()).map(|_| ()))
    }

    pub fn set_content(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Replace)
    }

    pub fn remove(&self, destroy: bool) -> Result<&Self> {
        self.for_each_instance(|node| node.remove(destroy).map(|_| ()))
    }

    pub fn empty(&self) -> Result<&Self> {
        self.for_each_instance(|node| node.empty().map(|_| ()))
    }

    /// Destroy the registered wrappers of every element
    pub fn destroy(&self, recursive: bool) -> Result<&Self> {
        let ctx = self.context()?;
        for &raw in &self.nodes {
            match (ctx.registered_for(raw), raw) {
                (Some(node), _) => node.destroy(recursive)?,
                (None, RawNode::Node(id)) if recursive => ctx.destroy_subtree(id)?,
                _ => {}
            }
        }
        Ok(self)
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    fn subscribe_all<S>(&self, f: impl Fn(&EventFacade) + 'static, subscribe: S) -> Result<Subscription>
    where
        S: Fn(&Node, Rc<dyn Fn(&EventFacade)>) -> Result<Subscription>,
    {
        let f: Rc<dyn Fn(&EventFacade)> = Rc::new(f);
        let mut subscription = Subscription::default();
        self.each(|node, _, _| {
            subscription.merge(subscribe(node, f.clone())?);
            Ok(())
        })?;
        Ok(subscription)
    }

    /// Subscribe every element; one handle detaches them all
    pub fn on(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe_all(f, |node, f| node.on(kind, move |e| f(e)))
    }

    pub fn once(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe_all(f, |node, f| node.once(kind, move |e| f(e)))
    }

    pub fn after(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe_all(f, |node, f| node.after(kind, move |e| f(e)))
    }

    pub fn detach(&self, kind: &str) -> Result<&Self> {
        self.for_each_instance(|node| node.detach(kind).map(|_| ()))
    }

    pub fn detach_all(&self) -> Result<&Self> {
        self.for_each_instance(|node| node.detach_all().map(|_| ()))
    }

    // ---------------------------------------------------------------
    // Array-like operations on the raw sequence
    // ---------------------------------------------------------------

    fn raws(&self, items: impl Into<ListSource>) -> Vec<RawNode> {
        match self.context() {
            Ok(ctx) => ctx.all(items).nodes,
            Err(_) => Vec::new(),
        }
    }

    /// Append nodes; returns the new length
    pub fn push(&mut self, items: impl Into<ListSource>) -> usize {
        let raws = self.raws(items);
        self.nodes.extend(raws);
        self.nodes.len()
    }

    pub fn pop(&mut self) -> Option<Node> {
        let raw = self.nodes.pop()?;
        self.context().ok()?.one(raw)
    }

    pub fn shift(&mut self) -> Option<Node> {
        if self.nodes.is_empty() {
            return None;
        }
        let raw = self.nodes.remove(0);
        self.context().ok()?.one(raw)
    }

    /// Prepend nodes; returns the new length
    pub fn unshift(&mut self, items: impl Into<ListSource>) -> usize {
        let mut nodes = self.raws(items);
        nodes.append(&mut self.nodes);
        self.nodes = nodes;
        self.nodes.len()
    }

    /// New list with the items appended
    pub fn concat(&self, items: impl Into<ListSource>) -> NodeList {
        let mut nodes = self.nodes.clone();
        nodes.extend(self.raws(items));
        self.derived(nodes)
    }

    /// Elements in `start..end`; negative positions count from the end
    pub fn slice(&self, start: isize, end: Option<isize>) -> NodeList {
        let len = self.nodes.len();
        let start = clamp_index(start, len);
        let end = end.map(|end| clamp_index(end, len)).unwrap_or(len);
        let nodes = if start < end { self.nodes[start..end].to_vec() } else { Vec::new() };
        self.derived(nodes)
    }

    /// Remove `delete` elements from `start`, insert `items` there, and
    /// return the removed elements
    pub fn splice(&mut self, start: isize, delete: usize, items: impl Into<ListSource>) -> NodeList {
        let start = clamp_index(start, self.nodes.len());
        let end = start.saturating_add(delete).min(self.nodes.len());
        let raws = self.raws(items);
        let removed: Vec<RawNode> = self.nodes.splice(start..end, raws).collect();
        self.derived(removed)
    }
}

fn clamp_index(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

impl PartialEq for NodeList {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes
    }
}

impl fmt::Display for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(&first) = self.nodes.first() else {
            return f.write_str("not bound to any nodes");
        };
        match first {
            RawNode::Window => f.write_str("window")?,
            RawNode::Node(id) => {
                let Some(shared) = self.ctx.upgrade() else {
                    return f.write_str("not bound to any nodes");
                };
                let Ok(host) = shared.host.try_borrow() else {
                    return write!(f, "[{} items]", self.nodes.len());
                };
                f.write_str(&host.node_name(id).unwrap_or_default())?;
                if let Ok(Some(dom_id)) = host.get_attribute(id, "id") {
                    if !dom_id.is_empty() {
                        write!(f, "#{}", dom_id)?;
                    }
                }
                if let Ok(Some(class)) = host.get_attribute(id, "class") {
                    for class in class.split_whitespace() {
                        write!(f, ".{}", class)?;
                    }
                }
            }
        }
        if self.nodes.len() > 1 {
            write!(f, "...[{} items]", self.nodes.len())?;
        }
        Ok(())
    }
}

impl fmt::Debug for NodeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeList")
            .field("nodes", &self.nodes)
            .field("query", &self.query)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Document;

    fn ctx() -> Context {
        Context::new(
            Document::from_html(r#"<ul><li id="a" class="x">0</li><li>1</li><li class="x">2</li><li>3</li><li>4</li></ul>"#)
                .unwrap(),
        )
    }

    #[test]
    fn test_clamp_index() {
        assert_eq!(clamp_index(-1, 5), 4);
        assert_eq!(clamp_index(-9, 5), 0);
        assert_eq!(clamp_index(7, 5), 5);
    }

    #[test]
    fn test_modulus_zero_is_empty() {
        let ctx = ctx();
        assert!(ctx.all("li").modulus(0, 0).is_empty());
        assert_eq!(ctx.all("li").modulus(3, 2).size(), 1);
    }

    #[test]
    fn test_array_ops() {
        let ctx = ctx();
        let mut list = ctx.all("li");
        let last = list.pop().unwrap();
        assert_eq!(list.size(), 4);
        assert_eq!(list.unshift(&last), 5);
        assert_eq!(list.item(0), Some(last.clone()));

        assert_eq!(list.slice(-2, None).size(), 2);
        assert_eq!(list.slice(1, Some(-1)).size(), 3);

        let removed = list.splice(1, 2, ListSource::Empty);
        assert_eq!(removed.size(), 2);
        assert_eq!(list.size(), 3);
        assert_eq!(list.shift(), Some(last));
        assert_eq!(list.concat("li").size(), 7);
    }

    #[test]
    fn test_splice_to_the_end() {
        let ctx = ctx();
        let mut list = ctx.all("li").slice(0, Some(3));
        let removed = list.splice(1, usize::MAX, ListSource::Empty);
        assert_eq!(removed.size(), 2);
        assert_eq!(list.size(), 1);
        assert_eq!(list.item(0), ctx.one("#a"));

        let removed = list.splice(-1, usize::MAX, "li:last-child");
        assert_eq!(removed.size(), 1);
        assert_eq!(list.size(), 1);
        assert_eq!(list.item(0).unwrap().get_content().unwrap(), "4");
    }

    #[test]
    fn test_filter_and_display() {
        let ctx = ctx();
        let list = ctx.all("li");
        assert_eq!(list.filter(".x").size(), 2);
        assert!(list.filter("[").is_empty());
        assert_eq!(list.to_string(), "LI#a.x...[5 items]");
        assert_eq!(list.filter("#a").to_string(), "LI#a.x");
    }

    #[test]
    fn test_batch_does_not_register() {
        let ctx = ctx();
        let before = ctx.registered();
        ctx.all("li").add_class("y").unwrap();
        assert_eq!(ctx.registered(), before);
        assert_eq!(ctx.all(".y").size(), 5);
    }
}
