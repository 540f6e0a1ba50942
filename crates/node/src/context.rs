//! Context - owner of the host, the identity registry and the attribute table
//!
//! Every wrapper is created through a context. Wrappers only hold a weak
//! reference back, so dropping the last `Context` clone releases the host and
//! every registered wrapper; operations on surviving wrappers then fail with
//! `ContextDropped`.

use crate::attrs::{AttrConfig, AttrTable};
use crate::config::NodeConfig;
use crate::error::{NodeError, Result};
use crate::events::EventHub;
use crate::host::{DomHost, HostValue, RawNode};
use crate::list::NodeList;
use crate::node::Node;
use crate::registry::Registry;
use crate::value::Scrubbed;
use dom::{DomError, NodeId};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub(crate) struct Shared {
    pub(crate) host: RefCell<Box<dyn DomHost>>,
    pub(crate) registry: RefCell<Registry>,
    pub(crate) attrs: RefCell<AttrTable>,
    pub(crate) hub: EventHub,
    pub(crate) config: NodeConfig,
}

/// Input accepted by [`Context::one`]
#[derive(Clone)]
pub enum Wrap {
    None,
    /// Selector, or the `doc…` / `win…` aliases
    Selector(String),
    Raw(RawNode),
    Node(Node),
}

impl From<&str> for Wrap {
    fn from(s: &str) -> Self {
        Wrap::Selector(s.to_string())
    }
}

impl From<String> for Wrap {
    fn from(s: String) -> Self {
        Wrap::Selector(s)
    }
}

impl From<&String> for Wrap {
    fn from(s: &String) -> Self {
        Wrap::Selector(s.clone())
    }
}

impl From<RawNode> for Wrap {
    fn from(raw: RawNode) -> Self {
        Wrap::Raw(raw)
    }
}

impl From<NodeId> for Wrap {
    fn from(id: NodeId) -> Self {
        Wrap::Raw(RawNode::Node(id))
    }
}

impl From<Node> for Wrap {
    fn from(node: Node) -> Self {
        Wrap::Node(node)
    }
}

impl From<&Node> for Wrap {
    fn from(node: &Node) -> Self {
        Wrap::Node(node.clone())
    }
}

impl<T: Into<Wrap>> From<Option<T>> for Wrap {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Wrap::None)
    }
}

/// Input accepted by [`Context::all`]
///
/// Wrappers and raw handles cannot be mixed in one sequence: a sequence is
/// either `Nodes` or `Raws`.
#[derive(Clone)]
pub enum ListSource {
    Empty,
    Selector(String),
    Raw(RawNode),
    Node(Node),
    Nodes(Vec<Node>),
    Raws(Vec<RawNode>),
    List(NodeList),
}

impl From<&str> for ListSource {
    fn from(s: &str) -> Self {
        ListSource::Selector(s.to_string())
    }
}

impl From<String> for ListSource {
    fn from(s: String) -> Self {
        ListSource::Selector(s)
    }
}

impl From<RawNode> for ListSource {
    fn from(raw: RawNode) -> Self {
        ListSource::Raw(raw)
    }
}

impl From<NodeId> for ListSource {
    fn from(id: NodeId) -> Self {
        ListSource::Raw(RawNode::Node(id))
    }
}

impl From<Node> for ListSource {
    fn from(node: Node) -> Self {
        ListSource::Node(node)
    }
}

impl From<&Node> for ListSource {
    fn from(node: &Node) -> Self {
        ListSource::Node(node.clone())
    }
}

impl From<Vec<Node>> for ListSource {
    fn from(nodes: Vec<Node>) -> Self {
        ListSource::Nodes(nodes)
    }
}

impl From<&[Node]> for ListSource {
    fn from(nodes: &[Node]) -> Self {
        ListSource::Nodes(nodes.to_vec())
    }
}

impl From<Vec<RawNode>> for ListSource {
    fn from(raws: Vec<RawNode>) -> Self {
        ListSource::Raws(raws)
    }
}

impl From<Vec<NodeId>> for ListSource {
    fn from(ids: Vec<NodeId>) -> Self {
        ListSource::Raws(ids.into_iter().map(RawNode::Node).collect())
    }
}

impl From<NodeList> for ListSource {
    fn from(list: NodeList) -> Self {
        ListSource::List(list)
    }
}

impl From<&NodeList> for ListSource {
    fn from(list: &NodeList) -> Self {
        ListSource::List(list.clone())
    }
}

/// Owner of the wrapper layer state for one document
#[derive(Clone)]
pub struct Context {
    pub(crate) inner: Rc<Shared>,
}

impl Context {
    pub fn new<H: DomHost + 'static>(host: H) -> Self {
        Self::with_config(host, NodeConfig::default())
    }

    pub fn with_config<H: DomHost + 'static>(host: H, config: NodeConfig) -> Self {
        Self {
            inner: Rc::new(Shared {
                host: RefCell::new(Box::new(host)),
                registry: RefCell::new(Registry::new()),
                attrs: RefCell::new(AttrTable::builtin()),
                hub: EventHub::default(),
                config,
            }),
        }
    }

    pub(crate) fn from_shared(inner: Rc<Shared>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Shared> {
        Rc::downgrade(&self.inner)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// Read access to the host; keep the closure free of wrapper calls
    pub fn host<R>(&self, f: impl FnOnce(&dyn DomHost) -> R) -> R {
        f(self.inner.host.borrow().as_ref())
    }

    /// Write access to the host; keep the closure free of wrapper calls
    pub fn host_mut<R>(&self, f: impl FnOnce(&mut dyn DomHost) -> R) -> R {
        f(self.inner.host.borrow_mut().as_mut())
    }

    /// Register (or replace) an attribute override
    pub fn register_attr(&self, name: &str, config: AttrConfig) {
        self.inner.attrs.borrow_mut().insert(name, config);
    }

    /// Number of live registered wrappers
    pub fn registered(&self) -> usize {
        self.inner.registry.borrow().len()
    }

    /// Registered wrapper for an identifier
    pub fn lookup(&self, uid: &str) -> Option<Node> {
        self.inner.registry.borrow().lookup(uid)
    }

    /// Canonical wrapper for the input; None when nothing resolves
    pub fn one(&self, input: impl Into<Wrap>) -> Option<Node> {
        match input.into() {
            Wrap::None => None,
            Wrap::Node(node) => Some(node),
            Wrap::Raw(raw) => self.wrap_raw(raw),
            Wrap::Selector(selector) => self
                .resolve_selector(&selector)
                .and_then(|raw| self.wrap_raw(raw)),
        }
    }

    /// Collection for the input; empty when nothing resolves
    pub fn all(&self, input: impl Into<ListSource>) -> NodeList {
        let (nodes, query) = match input.into() {
            ListSource::Empty => (Vec::new(), None),
            ListSource::List(list) => return list,
            ListSource::Selector(selector) => {
                let found = self.host(|h| h.query(&selector, None, false));
                let nodes = match found {
                    Ok(ids) => ids.into_iter().map(RawNode::Node).collect(),
                    Err(e) => {
                        tracing::warn!("[Factory] query {:?} failed: {}", selector, e);
                        Vec::new()
                    }
                };
                (nodes, Some(selector))
            }
            ListSource::Raw(raw) => (vec![raw], None),
            ListSource::Node(node) => (node.raw().into_iter().collect(), None),
            ListSource::Nodes(nodes) => (nodes.iter().filter_map(Node::raw).collect(), None),
            ListSource::Raws(raws) => (raws, None),
        };
        NodeList::from_parts(self.downgrade(), nodes, query, None)
    }

    /// Build nodes from markup (a fragment when there are several)
    pub fn create(&self, html: &str) -> Result<Node> {
        let id = self.host_mut(|h| h.create(html))?;
        self.wrap_raw(RawNode::Node(id))
            .ok_or(NodeError::Dom(DomError::NodeNotFound(id)))
    }

    pub fn document(&self) -> Node {
        let raw = RawNode::Node(self.host(|h| h.document_node()));
        self.wrap_raw(raw).unwrap_or_else(|| self.transient(raw))
    }

    pub fn window(&self) -> Node {
        self.wrap_raw(RawNode::Window)
            .unwrap_or_else(|| self.transient(RawNode::Window))
    }

    fn resolve_selector(&self, selector: &str) -> Option<RawNode> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        if selector.starts_with("doc") {
            return Some(RawNode::Node(self.host(|h| h.document_node())));
        }
        if selector.starts_with("win") {
            return Some(RawNode::Window);
        }
        match self.host(|h| h.query(selector, None, true)) {
            Ok(ids) => ids.first().copied().map(RawNode::Node),
            Err(e) => {
                tracing::warn!("[Factory] query {:?} failed: {}", selector, e);
                None
            }
        }
    }

    /// Identifier currently carried by a raw handle
    pub(crate) fn identifier(&self, raw: RawNode) -> Option<String> {
        let host = self.inner.host.borrow();
        if let RawNode::Node(id) = raw {
            if id != host.document_node() {
                if let Some(uid) = host.unique_id(id) {
                    return Some(uid);
                }
            }
        }
        match host.property(raw, &self.inner.config.uid_property) {
            Ok(HostValue::Value(Value::String(uid))) if !uid.is_empty() => Some(uid),
            _ => None,
        }
    }

    fn stamp(&self, raw: RawNode) -> String {
        let uid = self.inner.config.next_uid();
        let stamped = self.host_mut(|h| {
            h.set_property(raw, &self.inner.config.uid_property, Value::String(uid.clone()))
        });
        if let Err(e) = stamped {
            tracing::debug!("[Factory] could not stamp {:?}: {}", raw, e);
        }
        uid
    }

    fn clear_stamp(&self, raw: RawNode) {
        let cleared = self.host_mut(|h| h.remove_property(raw, &self.inner.config.uid_property));
        if let Err(e) = cleared {
            tracing::debug!("[Factory] could not clear stamp on {:?}: {}", raw, e);
        }
    }

    /// Canonical wrapper for a raw handle, creating and registering one
    pub(crate) fn wrap_raw(&self, raw: RawNode) -> Option<Node> {
        if let RawNode::Node(id) = raw {
            if !self.host(|h| h.exists(id)) {
                return None;
            }
        }

        let mut uid = self.identifier(raw);
        if let Some(existing) = uid.as_deref() {
            let cached = self.inner.registry.borrow().lookup(existing);
            if let Some(cached) = cached {
                if cached.raw() == Some(raw) {
                    return Some(cached);
                }
                // identifier copied by a clone, or a recycled node
                tracing::debug!(
                    "[Factory] stale identifier {} on {:?}, issuing a new one",
                    existing,
                    raw
                );
                self.clear_stamp(raw);
                uid = None;
            }
        }

        let uid = match uid {
            Some(uid) => uid,
            None => self.stamp(raw),
        };
        let node = Node::bind(self, raw, uid.clone());
        self.inner.registry.borrow_mut().register(&uid, node.clone());
        Some(node)
    }

    /// The registered wrapper for a raw handle, without creating one
    pub(crate) fn registered_for(&self, raw: RawNode) -> Option<Node> {
        let uid = self.identifier(raw)?;
        self.inner
            .registry
            .borrow()
            .lookup(&uid)
            .filter(|node| node.raw() == Some(raw))
    }

    /// Unregistered wrapper used for one-off batch calls
    pub(crate) fn transient(&self, raw: RawNode) -> Node {
        let uid = self.identifier(raw).unwrap_or_default();
        Node::bind(self, raw, uid)
    }

    /// Registered wrapper, or a transient one when none exists
    pub(crate) fn instance_for(&self, raw: RawNode) -> Node {
        self.registered_for(raw)
            .unwrap_or_else(|| self.transient(raw))
    }

    /// Replace raw handles in a host value with wrappers
    pub(crate) fn scrub(&self, value: HostValue) -> Scrubbed {
        match value {
            HostValue::Undefined => Scrubbed::Empty,
            HostValue::Null => Scrubbed::Null,
            HostValue::Node(raw) => self
                .wrap_raw(raw)
                .map(Scrubbed::Node)
                .unwrap_or(Scrubbed::Null),
            HostValue::Nodes(raws) => {
                Scrubbed::List(NodeList::from_parts(self.downgrade(), raws, None, None))
            }
            HostValue::Value(value) => Scrubbed::Value(value),
        }
    }

    /// Destroy the registered wrappers of a subtree (the root included)
    pub(crate) fn destroy_subtree(&self, root: NodeId) -> Result<()> {
        let mut ids = vec![root];
        ids.extend(self.host(|h| h.query("*", Some(root), false))?);
        for id in ids {
            if let Some(node) = self.registered_for(RawNode::Node(id)) {
                node.destroy(false)?;
            }
        }
        Ok(())
    }
}
