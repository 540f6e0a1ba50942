//! Node - the wrapper around one raw DOM node (or the window)
//!
//! A `Node` is a cheap handle (`Rc`) onto shared wrapper state. Clones of a
//! handle are the same wrapper: equality is identity. The wrapper reaches
//! the document through a weak reference to its `Context`.

use crate::attrs;
use crate::context::{Context, Shared, Wrap};
use crate::error::{NodeError, Result};
use crate::events::Listeners;
use crate::host::{DomHost, HostValue, RawNode};
use crate::list::NodeList;
use crate::method::{Arg, DomMethod};
use crate::plugin::PluginHost;
use crate::value::Scrubbed;
use ahash::AHashMap;
use dom::{Content, DomError, InsertAt, NodeId, NodeType};
use serde_json::{Map, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

pub(crate) struct NodeState {
    uid: String,
    raw: Cell<Option<RawNode>>,
    ctx: Weak<Shared>,
    data: RefCell<Map<String, Value>>,
    events: Rc<Listeners>,
    plugins: PluginHost,
    input_type: RefCell<Option<String>>,
}

/// Wrapper around one raw node
#[derive(Clone)]
pub struct Node(pub(crate) Rc<NodeState>);

/// Traversal filter
#[derive(Clone, Default)]
pub enum Filter {
    #[default]
    Any,
    Selector(String),
    Predicate(Rc<dyn Fn(&Node) -> bool>),
}

impl Filter {
    pub fn predicate(f: impl Fn(&Node) -> bool + 'static) -> Self {
        Filter::Predicate(Rc::new(f))
    }
}

impl From<&str> for Filter {
    fn from(selector: &str) -> Self {
        Filter::Selector(selector.to_string())
    }
}

impl From<String> for Filter {
    fn from(selector: String) -> Self {
        Filter::Selector(selector)
    }
}

/// Content accepted by the insertion methods
#[derive(Clone)]
pub enum NodeContent {
    /// Markup, parsed by the host
    Html(String),
    Node(Node),
    Raw(RawNode),
    /// Every node of the list, moved together
    List(NodeList),
}

impl From<&str> for NodeContent {
    fn from(html: &str) -> Self {
        NodeContent::Html(html.to_string())
    }
}

impl From<String> for NodeContent {
    fn from(html: String) -> Self {
        NodeContent::Html(html)
    }
}

impl From<Node> for NodeContent {
    fn from(node: Node) -> Self {
        NodeContent::Node(node)
    }
}

impl From<&Node> for NodeContent {
    fn from(node: &Node) -> Self {
        NodeContent::Node(node.clone())
    }
}

impl From<RawNode> for NodeContent {
    fn from(raw: RawNode) -> Self {
        NodeContent::Raw(raw)
    }
}

impl From<NodeId> for NodeContent {
    fn from(id: NodeId) -> Self {
        NodeContent::Raw(RawNode::Node(id))
    }
}

impl From<NodeList> for NodeContent {
    fn from(list: NodeList) -> Self {
        NodeContent::List(list)
    }
}

impl From<&NodeList> for NodeContent {
    fn from(list: &NodeList) -> Self {
        NodeContent::List(list.clone())
    }
}

/// Where `insert` places content
#[derive(Clone)]
pub enum Where {
    /// Last child
    Append,
    /// Before the child at this index (appended when out of range)
    Index(usize),
    /// Sibling before this node
    Before,
    /// Sibling after this node
    After,
    /// Before the given child
    BeforeNode(Node),
    /// Replace all children
    Replace,
}

impl Node {
    pub(crate) fn bind(ctx: &Context, raw: RawNode, uid: String) -> Self {
        Node(Rc::new(NodeState {
            uid,
            raw: Cell::new(Some(raw)),
            ctx: ctx.downgrade(),
            data: RefCell::new(Map::new()),
            events: Rc::new(Listeners::default()),
            plugins: PluginHost::default(),
            input_type: RefCell::new(None),
        }))
    }

    /// Wrapper identifier
    pub fn uid(&self) -> &str {
        &self.0.uid
    }

    /// The wrapped handle; None once destroyed
    pub fn raw(&self) -> Option<RawNode> {
        self.0.raw.get()
    }

    /// The wrapped handle, or `Destroyed`
    pub fn dom_node(&self) -> Result<RawNode> {
        self.raw().ok_or_else(|| NodeError::Destroyed(self.0.uid.clone()))
    }

    /// The wrapped DOM node id; the window has none
    pub fn node_id(&self) -> Result<NodeId> {
        match self.dom_node()? {
            RawNode::Node(id) => Ok(id),
            RawNode::Window => Err(NodeError::Dom(DomError::InvalidNodeType {
                expected: "node".to_string(),
                actual: "window".to_string(),
            })),
        }
    }

    pub fn context(&self) -> Result<Context> {
        self.0
            .ctx
            .upgrade()
            .map(Context::from_shared)
            .ok_or(NodeError::ContextDropped)
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&dyn DomHost) -> R) -> Result<R> {
        Ok(self.context()?.host(f))
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut dyn DomHost) -> R) -> Result<R> {
        Ok(self.context()?.host_mut(f))
    }

    pub(crate) fn events(&self) -> Rc<Listeners> {
        self.0.events.clone()
    }

    pub(crate) fn plugins(&self) -> &PluginHost {
        &self.0.plugins
    }

    pub(crate) fn input_type(&self) -> Option<String> {
        self.0.input_type.borrow().clone()
    }

    pub(crate) fn set_input_type(&self, value: Option<String>) {
        *self.0.input_type.borrow_mut() = value;
    }

    pub fn is_destroyed(&self) -> bool {
        self.raw().is_none()
    }

    pub fn is_window(&self) -> bool {
        self.raw() == Some(RawNode::Window)
    }

    pub fn is_document(&self) -> bool {
        matches!(self.node_type(), Ok(NodeType::Document))
    }

    pub fn is_fragment(&self) -> bool {
        matches!(self.node_type(), Ok(NodeType::DocumentFragment))
    }

    pub fn node_type(&self) -> Result<NodeType> {
        let id = self.node_id()?;
        Ok(self.with_host(|h| h.node_type(id))??)
    }

    pub fn node_name(&self) -> Result<String> {
        match self.dom_node()? {
            RawNode::Window => Ok("window".to_string()),
            RawNode::Node(id) => Ok(self.with_host(|h| h.node_name(id))??),
        }
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    /// Read an attribute through the resolver; raw nodes come back wrapped
    pub fn get(&self, name: &str) -> Result<Scrubbed> {
        let value = self.resolve(name)?;
        Ok(self.context()?.scrub(value))
    }

    pub(crate) fn resolve(&self, name: &str) -> Result<HostValue> {
        let ctx = self.context()?;
        let getter = ctx.inner.attrs.borrow().getter(name);
        if let Some(getter) = getter {
            return getter(self);
        }
        if attrs::is_aria(name) {
            let id = self.node_id()?;
            return Ok(match ctx.host(|h| h.get_attribute(id, name))? {
                Some(value) => Value::from(value).into(),
                None => HostValue::Null,
            });
        }
        attrs::default_getter(self, name)
    }

    /// Write an attribute through the resolver
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<&Self> {
        let value = value.into();
        let ctx = self.context()?;
        let setter = ctx.inner.attrs.borrow().setter(name);
        if let Some(setter) = setter {
            setter(self, value)?;
        } else if attrs::is_aria(name) {
            let id = self.node_id()?;
            let text = dom::document::value_to_string(&value);
            ctx.host_mut(|h| h.set_attribute(id, name, &text))?;
        } else {
            attrs::default_setter(self, name, value)?;
        }
        Ok(self)
    }

    pub fn get_attrs(&self, names: &[&str]) -> Result<AHashMap<String, Scrubbed>> {
        names
            .iter()
            .map(|name| Ok((name.to_string(), self.get(name)?)))
            .collect()
    }

    pub fn set_attrs<I, K, V>(&self, attrs: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in attrs {
            self.set(name.as_ref(), value)?;
        }
        Ok(self)
    }

    /// Whether both wrappers hold the same raw node
    pub fn compare_to(&self, other: &Node) -> bool {
        self.raw().is_some() && self.raw() == other.raw()
    }

    /// Whether the node is inside `doc` (the owning document when None)
    pub fn in_doc(&self, doc: Option<&Node>) -> Result<bool> {
        let id = self.node_id()?;
        let root = match doc {
            Some(doc) => doc.node_id()?,
            None => self.with_host(|h| h.document_node())?,
        };
        Ok(self.with_host(|h| h.contains(root, id))?)
    }

    /// Element with this id, when it lives inside this node
    pub fn get_by_id(&self, id: &str) -> Result<Option<Node>> {
        let ctx = self.context()?;
        let root = self.node_id()?;
        let found = ctx.host(|h| h.by_id(id).filter(|&found| h.contains(root, found)));
        Ok(found.and_then(|found| ctx.one(found)))
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    fn accepts(&self, ctx: &Context, id: NodeId, filter: &Filter) -> bool {
        match filter {
            Filter::Any => true,
            Filter::Selector(selector) => {
                let tested = ctx.host(|h| match h.node_type(id) {
                    Ok(NodeType::Element) => h.test(id, selector),
                    _ => Ok(false),
                });
                tested.unwrap_or_else(|e| {
                    tracing::warn!("[Node] filter {:?} failed: {}", selector, e);
                    false
                })
            }
            Filter::Predicate(f) => ctx.one(id).map(|node| f(&node)).unwrap_or(false),
        }
    }

    /// Nearest ancestor passing the filter (this node first when `test_self`)
    pub fn ancestor(&self, filter: impl Into<Filter>, test_self: bool) -> Result<Option<Node>> {
        let filter = filter.into();
        let ctx = self.context()?;
        let mut current = if test_self {
            Some(self.node_id()?)
        } else {
            let id = self.node_id()?;
            ctx.host(|h| h.parent(id))?
        };
        while let Some(id) = current {
            if self.accepts(&ctx, id, &filter) {
                return Ok(ctx.one(id));
            }
            current = ctx.host(|h| h.parent(id))?;
        }
        Ok(None)
    }

    /// Every ancestor passing the filter, outermost first
    pub fn ancestors(&self, filter: impl Into<Filter>, test_self: bool) -> Result<NodeList> {
        let filter = filter.into();
        let ctx = self.context()?;
        let id = self.node_id()?;
        let mut found = Vec::new();
        let mut current = if test_self { Some(id) } else { ctx.host(|h| h.parent(id))? };
        while let Some(id) = current {
            if self.accepts(&ctx, id, &filter) {
                found.push(RawNode::Node(id));
            }
            current = ctx.host(|h| h.parent(id))?;
        }
        found.reverse();
        Ok(ctx.all(found))
    }

    fn sibling_by(&self, forward: bool, filter: Filter, all: bool) -> Result<Option<Node>> {
        let ctx = self.context()?;
        let mut current = self.node_id()?;
        while let Some(next) = ctx.host(|h| h.sibling(current, forward, !all))? {
            if self.accepts(&ctx, next, &filter) {
                return Ok(ctx.one(next));
            }
            current = next;
        }
        Ok(None)
    }

    /// Previous element sibling passing the filter; any node type when `all`
    pub fn previous(&self, filter: impl Into<Filter>, all: bool) -> Result<Option<Node>> {
        self.sibling_by(false, filter.into(), all)
    }

    /// Next element sibling passing the filter; any node type when `all`
    pub fn next(&self, filter: impl Into<Filter>, all: bool) -> Result<Option<Node>> {
        self.sibling_by(true, filter.into(), all)
    }

    /// Element siblings passing the filter, in document order
    pub fn siblings(&self, filter: impl Into<Filter>) -> Result<NodeList> {
        let filter = filter.into();
        let ctx = self.context()?;
        let id = self.node_id()?;
        let Some(parent) = ctx.host(|h| h.parent(id))? else {
            return Ok(ctx.all(Vec::<RawNode>::new()));
        };
        let found: Vec<RawNode> = ctx
            .host(|h| h.children(parent))?
            .into_iter()
            .filter(|&sibling| sibling != id && self.accepts(&ctx, sibling, &filter))
            .map(RawNode::Node)
            .collect();
        Ok(ctx.all(found))
    }

    // ---------------------------------------------------------------
    // Scoped queries
    // ---------------------------------------------------------------

    /// First descendant matching the selector
    pub fn one(&self, selector: &str) -> Option<Node> {
        let (Ok(ctx), Ok(root)) = (self.context(), self.node_id()) else {
            return None;
        };
        match ctx.host(|h| h.query(selector, Some(root), true)) {
            Ok(found) => found.first().and_then(|&id| ctx.one(id)),
            Err(e) => {
                tracing::warn!("[Node] query {:?} on {} failed: {}", selector, self, e);
                None
            }
        }
    }

    /// Every descendant matching the selector; the list remembers the query
    pub fn all(&self, selector: &str) -> NodeList {
        let (Ok(ctx), Ok(root)) = (self.context(), self.node_id()) else {
            return NodeList::from_parts(self.0.ctx.clone(), Vec::new(), Some(selector.to_string()), None);
        };
        let nodes = match ctx.host(|h| h.query(selector, Some(root), false)) {
            Ok(found) => found.into_iter().map(RawNode::Node).collect(),
            Err(e) => {
                tracing::warn!("[Node] query {:?} on {} failed: {}", selector, self, e);
                Vec::new()
            }
        };
        NodeList::from_parts(
            ctx.downgrade(),
            nodes,
            Some(selector.to_string()),
            Some(RawNode::Node(root)),
        )
    }

    /// Whether this node matches the selector
    pub fn test(&self, selector: &str) -> Result<bool> {
        let id = self.node_id()?;
        Ok(self.with_host(|h| h.test(id, selector))??)
    }

    // ---------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------

    /// Resolve content to one host node, creating it from markup if needed
    fn content_node(&self, ctx: &Context, content: NodeContent) -> Result<NodeId> {
        match content {
            NodeContent::Html(html) => Ok(ctx.host_mut(|h| h.create(&html))?),
            NodeContent::Node(node) => node.node_id(),
            NodeContent::Raw(raw) => raw.id().ok_or_else(|| {
                NodeError::Dom(DomError::InvalidNodeType {
                    expected: "node".to_string(),
                    actual: "window".to_string(),
                })
            }),
            NodeContent::List(list) => {
                let ids = list.node_ids();
                Ok(ctx.host_mut(|h| h.to_fragment(&ids))?)
            }
        }
    }

    fn host_content(content: NodeContent) -> Content {
        match content {
            NodeContent::Html(html) => Content::Html(html),
            NodeContent::Node(node) => Content::Nodes(node.raw().and_then(RawNode::id).into_iter().collect()),
            NodeContent::Raw(raw) => Content::Nodes(raw.id().into_iter().collect()),
            NodeContent::List(list) => Content::Nodes(list.node_ids()),
        }
    }

    /// Insert content relative to this node
    pub fn insert(&self, content: impl Into<NodeContent>, at: Where) -> Result<&Self> {
        let ctx = self.context()?;
        let id = self.node_id()?;
        let content = Self::host_content(content.into());
        if matches!(&content, Content::Nodes(nodes) if nodes.is_empty()) {
            return Ok(self);
        }
        let reference = match &at {
            Where::BeforeNode(node) => Some(node.node_id()?),
            _ => None,
        };

        ctx.host_mut(|h| -> dom::Result<()> {
            match at {
                Where::Append => {
                    h.add_html(id, content, InsertAt::Append)?;
                }
                Where::Replace => {
                    h.add_html(id, content, InsertAt::Replace)?;
                }
                Where::Index(index) => match h.child_nodes(id)?.get(index) {
                    Some(&child) => {
                        h.add_html(id, content, InsertAt::Before(child))?;
                    }
                    None => {
                        h.add_html(id, content, InsertAt::Append)?;
                    }
                },
                Where::BeforeNode(_) => {
                    let at = reference.map(InsertAt::Before).unwrap_or(InsertAt::Append);
                    h.add_html(id, content, at)?;
                }
                Where::Before => {
                    if let Some(parent) = h.parent(id)? {
                        h.add_html(parent, content, InsertAt::Before(id))?;
                    }
                }
                Where::After => {
                    if let Some(parent) = h.parent(id)? {
                        match h.sibling(id, true, false)? {
                            Some(next) => h.add_html(parent, content, InsertAt::Before(next))?,
                            None => h.add_html(parent, content, InsertAt::Append)?,
                        };
                    }
                }
            }
            Ok(())
        })?;
        Ok(self)
    }

    pub fn prepend(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Index(0))
    }

    pub fn append(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Append)
    }

    /// Append this node to the target; a target that does not resolve is a no-op
    pub fn append_to(&self, target: impl Into<Wrap>) -> Result<&Self> {
        let ctx = self.context()?;
        if let Some(target) = ctx.one(target) {
            target.append(self)?;
        }
        Ok(self)
    }

    /// Replace every child with the content
    pub fn set_content(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        self.insert(content, Where::Replace)
    }

    /// Markup of the children
    pub fn get_content(&self) -> Result<String> {
        let id = self.node_id()?;
        Ok(self.with_host(|h| h.inner_html(id))??)
    }

    /// Detach from the parent; optionally destroy the wrapper (and its subtree's)
    pub fn remove(&self, destroy: bool) -> Result<&Self> {
        let id = self.node_id()?;
        let ctx = self.context()?;
        ctx.host_mut(|h| -> dom::Result<()> {
            if let Some(parent) = h.parent(id)? {
                h.remove_child(parent, id)?;
            }
            Ok(())
        })?;
        if destroy {
            self.destroy(true)?;
        }
        Ok(self)
    }

    /// Put the content in this node's place
    pub fn replace(&self, content: impl Into<NodeContent>) -> Result<&Self> {
        let ctx = self.context()?;
        let id = self.node_id()?;
        let new = self.content_node(&ctx, content.into())?;
        ctx.host_mut(|h| -> dom::Result<()> {
            if let Some(parent) = h.parent(id)? {
                h.replace_child(parent, new, id)?;
            }
            Ok(())
        })?;
        Ok(self)
    }

    /// Replace the child `old` with `new`; returns the removed child
    pub fn replace_child(&self, new: impl Into<NodeContent>, old: &Node) -> Result<Option<Node>> {
        let ctx = self.context()?;
        let new = self.content_node(&ctx, new.into())?;
        let removed = self.call(DomMethod::ReplaceChild, &[Arg::Raw(RawNode::Node(new)), Arg::from(old)])?;
        Ok(removed.into_node())
    }

    /// Append a child; returns the appended node
    pub fn append_child(&self, child: impl Into<NodeContent>) -> Result<Option<Node>> {
        let ctx = self.context()?;
        let child = self.content_node(&ctx, child.into())?;
        Ok(self.call(DomMethod::AppendChild, &[Arg::Raw(RawNode::Node(child))])?.into_node())
    }

    /// Insert a child before `reference` (appended when None)
    pub fn insert_before(&self, child: impl Into<NodeContent>, reference: Option<&Node>) -> Result<Option<Node>> {
        let ctx = self.context()?;
        let child = self.content_node(&ctx, child.into())?;
        let mut args = vec![Arg::Raw(RawNode::Node(child))];
        if let Some(reference) = reference {
            args.push(Arg::from(reference));
        }
        Ok(self.call(DomMethod::InsertBefore, &args)?.into_node())
    }

    /// Exchange tree positions with another node
    pub fn swap(&self, other: &Node) -> Result<&Self> {
        let a = self.node_id()?;
        let b = other.node_id()?;
        if a == b {
            return Ok(self);
        }
        self.with_host_mut(|h| -> dom::Result<()> {
            let (Some(pa), Some(pb)) = (h.parent(a)?, h.parent(b)?) else {
                return Ok(());
            };
            let next_a = h.sibling(a, true, false)?;
            let next_b = h.sibling(b, true, false)?;
            if next_a == Some(b) {
                h.insert_before(pb, b, Some(a))?;
            } else if next_b == Some(a) {
                h.insert_before(pa, a, Some(b))?;
            } else {
                h.insert_before(pb, a, next_b)?;
                h.insert_before(pa, b, next_a)?;
            }
            Ok(())
        })??;
        Ok(self)
    }

    /// Remove every child, destroying wrappers in the removed subtrees
    pub fn empty(&self) -> Result<&Self> {
        let ctx = self.context()?;
        let id = self.node_id()?;
        let children = ctx.host(|h| h.child_nodes(id))?;
        for child in children {
            ctx.host_mut(|h| h.remove_child(id, child))?;
            ctx.destroy_subtree(child)?;
        }
        Ok(self)
    }

    // ---------------------------------------------------------------
    // Side data
    // ---------------------------------------------------------------

    /// Stored value, falling back to the `data-*` attribute
    pub fn get_data(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.0.data.borrow().get(key) {
            return Some(value.clone());
        }
        let id = self.node_id().ok()?;
        self.with_host(|h| h.get_attribute(id, &format!("data-{}", key)))
            .ok()?
            .ok()
            .flatten()
            .map(Value::String)
    }

    /// Copy of the whole side table
    pub fn data(&self) -> Map<String, Value> {
        self.0.data.borrow().clone()
    }

    pub fn set_data(&self, key: &str, value: impl Into<Value>) -> &Self {
        self.0.data.borrow_mut().insert(key.to_string(), value.into());
        self
    }

    /// Drop one key, or the whole table when `key` is None
    pub fn clear_data(&self, key: Option<&str>) -> &Self {
        let mut data = self.0.data.borrow_mut();
        match key {
            Some(key) => {
                data.remove(key);
            }
            None => data.clear(),
        }
        self
    }

    // ---------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------

    /// Release the wrapper: listeners, plugins and data are dropped, the
    /// raw node is unbound and the registry entry removed. With
    /// `recursive`, registered wrappers of every descendant go too.
    /// Destroying twice is a no-op.
    pub fn destroy(&self, recursive: bool) -> Result<()> {
        let Some(raw) = self.raw() else {
            return Ok(());
        };
        tracing::debug!("[Node] destroy {}", self);

        self.unplug(None);
        self.0.events.clear(None);
        let ctx = self.context().ok();
        if let Some(ctx) = &ctx {
            ctx.inner.hub.purge(raw, None);
            if let (true, RawNode::Node(id)) = (recursive, raw) {
                let descendants = ctx.host(|h| h.query("*", Some(id), false))?;
                for descendant in descendants {
                    if let Some(node) = ctx.registered_for(RawNode::Node(descendant)) {
                        node.destroy(false)?;
                    }
                }
            }
        }
        self.clear_data(None);
        self.set_input_type(None);
        self.0.raw.set(None);

        if let Some(ctx) = ctx {
            let mut registry = ctx.inner.registry.borrow_mut();
            if registry.lookup(&self.0.uid).is_some_and(|n| n == *self) {
                registry.unregister(&self.0.uid);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Visibility
    // ---------------------------------------------------------------

    pub fn is_hidden(&self) -> Result<bool> {
        Ok(self.get_style("display")? == "none")
    }

    pub fn show(&self) -> Result<&Self> {
        self.set_style("display", "")
    }

    pub fn hide(&self) -> Result<&Self> {
        self.set_style("display", "none")
    }

    /// Show when `on` (or when hidden, if None), otherwise hide; then run
    /// the callback
    pub fn toggle_view(&self, on: Option<bool>, callback: Option<&dyn Fn(&Node)>) -> Result<&Self> {
        let on = match on {
            Some(on) => on,
            None => self.is_hidden()?,
        };
        if on {
            self.show()?;
        } else {
            self.hide()?;
        }
        if let Some(callback) = callback {
            callback(self);
        }
        Ok(self)
    }

    // ---------------------------------------------------------------
    // Style and classes
    // ---------------------------------------------------------------

    fn call_value(&self, method: DomMethod, args: &[Arg]) -> Result<Value> {
        Ok(match self.call(method, args)? {
            Scrubbed::Value(value) => value,
            _ => Value::Null,
        })
    }

    fn call_string(&self, method: DomMethod, args: &[Arg]) -> Result<String> {
        Ok(match self.call_value(method, args)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    fn call_bool(&self, method: DomMethod, args: &[Arg]) -> Result<bool> {
        Ok(self.call_value(method, args)?.as_bool().unwrap_or(false))
    }

    fn call_self(&self, method: DomMethod, args: &[Arg]) -> Result<&Self> {
        self.call(method, args)?;
        Ok(self)
    }

    /// Inline style value
    pub fn get_style(&self, property: &str) -> Result<String> {
        self.call_string(DomMethod::GetStyle, &[property.into()])
    }

    pub fn get_computed_style(&self, property: &str) -> Result<String> {
        self.call_string(DomMethod::GetComputedStyle, &[property.into()])
    }

    /// Set an inline style; numbers get `px` unless the property is unitless
    pub fn set_style(&self, property: &str, value: impl Into<Value>) -> Result<&Self> {
        self.call_self(DomMethod::SetStyle, &[property.into(), Arg::Value(value.into())])
    }

    pub fn set_styles<I, K, V>(&self, styles: I) -> Result<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (property, value) in styles {
            self.set_style(property.as_ref(), value)?;
        }
        Ok(self)
    }

    pub fn has_class(&self, class: &str) -> Result<bool> {
        self.call_bool(DomMethod::HasClass, &[class.into()])
    }

    pub fn add_class(&self, class: &str) -> Result<&Self> {
        self.call_self(DomMethod::AddClass, &[class.into()])
    }

    pub fn remove_class(&self, class: &str) -> Result<&Self> {
        self.call_self(DomMethod::RemoveClass, &[class.into()])
    }

    pub fn replace_class(&self, old: &str, new: &str) -> Result<&Self> {
        self.call_self(DomMethod::ReplaceClass, &[old.into(), new.into()])
    }

    pub fn toggle_class(&self, class: &str, force: Option<bool>) -> Result<&Self> {
        let mut args = vec![Arg::from(class)];
        if let Some(force) = force {
            args.push(force.into());
        }
        self.call_self(DomMethod::ToggleClass, &args)
    }

    // ---------------------------------------------------------------
    // Delegated host methods
    // ---------------------------------------------------------------

    /// Attribute value; empty string when absent
    pub fn get_attribute(&self, name: &str) -> Result<String> {
        self.call_string(DomMethod::GetAttribute, &[name.into()])
    }

    pub fn set_attribute(&self, name: &str, value: &str) -> Result<&Self> {
        self.call_self(DomMethod::SetAttribute, &[name.into(), value.into()])
    }

    pub fn remove_attribute(&self, name: &str) -> Result<&Self> {
        self.call_self(DomMethod::RemoveAttribute, &[name.into()])
    }

    pub fn has_attribute(&self, name: &str) -> Result<bool> {
        self.call_bool(DomMethod::HasAttribute, &[name.into()])
    }

    /// Wrap the node in the given markup
    pub fn wrap(&self, html: &str) -> Result<&Self> {
        self.call_self(DomMethod::Wrap, &[html.into()])
    }

    /// Remove the node's parent, keeping its siblings in place
    pub fn unwrap(&self) -> Result<&Self> {
        self.call_self(DomMethod::Unwrap, &[])
    }

    /// The id attribute, generated when missing
    pub fn generate_id(&self) -> Result<String> {
        self.call_string(DomMethod::GenerateId, &[])
    }

    pub fn contains(&self, other: &Node) -> Result<bool> {
        self.call_bool(DomMethod::Contains, &[other.into()])
    }

    pub fn remove_child(&self, child: &Node) -> Result<Option<Node>> {
        Ok(self.call(DomMethod::RemoveChild, &[child.into()])?.into_node())
    }

    pub fn has_child_nodes(&self) -> Result<bool> {
        self.call_bool(DomMethod::HasChildNodes, &[])
    }

    pub fn clone_node(&self, deep: bool) -> Result<Option<Node>> {
        Ok(self.call(DomMethod::CloneNode, &[deep.into()])?.into_node())
    }

    pub fn get_elements_by_tag_name(&self, tag: &str) -> Result<NodeList> {
        match self.call(DomMethod::GetElementsByTagName, &[tag.into()])? {
            Scrubbed::List(list) => Ok(list),
            _ => Ok(self.context()?.all(Vec::<RawNode>::new())),
        }
    }

    pub fn scroll_into_view(&self) -> Result<&Self> {
        self.call_self(DomMethod::ScrollIntoView, &[])
    }

    /// Best effort: the host may refuse focus (hidden or disabled nodes)
    pub fn focus(&self) -> &Self {
        if let Err(e) = self.call(DomMethod::Focus, &[]) {
            tracing::debug!("[Node] focus on {} refused: {}", self, e);
        }
        self
    }

    pub fn blur(&self) -> Result<&Self> {
        self.call_self(DomMethod::Blur, &[])
    }

    pub fn submit(&self) -> Result<&Self> {
        self.call_self(DomMethod::Submit, &[])
    }

    pub fn reset(&self) -> Result<&Self> {
        self.call_self(DomMethod::Reset, &[])
    }

    pub fn select(&self) -> Result<&Self> {
        self.call_self(DomMethod::Select, &[])
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uid = &self.0.uid;
        let id = match self.raw() {
            None => return write!(f, "{}: not bound to a node", uid),
            Some(RawNode::Window) => return write!(f, "window {}", uid),
            Some(RawNode::Node(id)) => id,
        };
        let Some(shared) = self.0.ctx.upgrade() else {
            return write!(f, "{}: not bound to a node", uid);
        };
        // the host may be mid-mutation when a log line formats this node
        let Ok(host) = shared.host.try_borrow() else {
            return f.write_str(uid);
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
        write!(f, " {}", uid)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("uid", &self.0.uid)
            .field("raw", &self.raw())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dom::Document;

    fn ctx(html: &str) -> Context {
        Context::new(Document::from_html(html).unwrap())
    }

    #[test]
    fn test_display() {
        let ctx = ctx(r#"<div id="main" class="a b"></div>"#);
        let node = ctx.one("#main").unwrap();
        assert_eq!(node.to_string(), format!("DIV#main.a.b {}", node.uid()));
        assert!(ctx.window().to_string().starts_with("window "));

        node.destroy(false).unwrap();
        assert!(node.to_string().ends_with(": not bound to a node"));
    }

    #[test]
    fn test_traversal() {
        let ctx = ctx(r#"<ul id="l"><li id="a">a</li>text<li id="b" class="x">b</li><li id="c">c</li></ul>"#);
        let a = ctx.one("#a").unwrap();
        let b = ctx.one("#b").unwrap();

        assert_eq!(a.next(Filter::Any, false).unwrap(), Some(b.clone()));
        assert!(a.next(Filter::Any, true).unwrap().unwrap().node_name().unwrap() == "#text");
        assert_eq!(a.next(".x", false).unwrap(), Some(b.clone()));
        assert_eq!(b.previous(Filter::Any, false).unwrap(), Some(a.clone()));
        assert_eq!(b.siblings(Filter::Any).unwrap().size(), 2);
        assert_eq!(a.ancestor("ul", false).unwrap(), ctx.one("#l"));
        assert_eq!(a.ancestor("li", true).unwrap(), Some(a.clone()));
        assert!(a.ancestor("table", false).unwrap().is_none());

        let chain = a.ancestors(Filter::Any, false).unwrap();
        assert!(chain.item(0).unwrap().is_document());
        assert_eq!(chain.item(chain.size() - 1), ctx.one("#l"));
    }

    #[test]
    fn test_predicate_filter() {
        let ctx = ctx(r#"<p id="a"></p><p id="b" title="t"></p>"#);
        let a = ctx.one("#a").unwrap();
        let titled = Filter::predicate(|n| n.has_attribute("title").unwrap_or(false));
        assert_eq!(a.next(titled, false).unwrap(), ctx.one("#b"));
    }

    #[test]
    fn test_insert_positions() {
        let ctx = ctx(r#"<div id="box"><span id="s"></span></div>"#);
        let div = ctx.one("#box").unwrap();
        let span = ctx.one("#s").unwrap();

        div.append("<i></i>").unwrap();
        div.prepend("<b></b>").unwrap();
        div.insert("<em></em>", Where::BeforeNode(span.clone())).unwrap();
        span.insert("<u></u>", Where::After).unwrap();
        assert_eq!(div.get_content().unwrap(), r#"<b></b><em></em><span id="s"></span><u></u><i></i>"#);

        div.set_content("plain").unwrap();
        assert_eq!(div.get_content().unwrap(), "plain");
    }

    #[test]
    fn test_swap_adjacent_and_distant() {
        let ctx = ctx(r#"<p id="a"></p><p id="b"></p><div><p id="c"></p></div>"#);
        let a = ctx.one("#a").unwrap();
        let b = ctx.one("#b").unwrap();
        let c = ctx.one("#c").unwrap();

        a.swap(&b).unwrap();
        assert_eq!(b.next(Filter::Any, false).unwrap(), Some(a.clone()));

        a.swap(&c).unwrap();
        assert_eq!(c.previous(Filter::Any, false).unwrap(), Some(b.clone()));
        assert!(a.ancestor("div", false).unwrap().is_some());
    }

    #[test]
    fn test_data_falls_back_to_attribute() {
        let ctx = ctx(r#"<div id="a" data-role="panel"></div>"#);
        let a = ctx.one("#a").unwrap();
        assert_eq!(a.get_data("role"), Some(Value::from("panel")));
        a.set_data("role", 3);
        assert_eq!(a.get_data("role"), Some(Value::from(3)));
        a.clear_data(None);
        assert!(a.data().is_empty());
    }

    #[test]
    fn test_focus_is_best_effort() {
        let ctx = ctx(r#"<input id="i" disabled>"#);
        let input = ctx.one("#i").unwrap();
        assert_eq!(input.focus(), &input);
        assert!(input.set("disabled", false).is_ok());
        assert_eq!(input.focus(), &input);
    }

    #[test]
    fn test_use_after_destroy_errors() {
        let ctx = ctx(r#"<div id="a"></div>"#);
        let a = ctx.one("#a").unwrap();
        a.destroy(false).unwrap();
        a.destroy(false).unwrap();
        assert!(matches!(a.get("id"), Err(NodeError::Destroyed(_))));
    }
}
