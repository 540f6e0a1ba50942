//! Document - the in-memory page the wrapper layer talks to
//!
//! Owns the node arena plus the window state (viewport, scroll, expandos) and
//! exposes the primitives a script-facing layer needs: property and attribute
//! access, inline/computed style, tree mutation, queries, geometry and the
//! few element actions (focus, form submit/reset, select).

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::markup;
use crate::selector::{self, SelectorList};
use crate::serializer::DomSerializer;
use crate::types::*;
use crate::utils;
use serde_json::{Map, Value};

/// Configuration for a document
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub url: String,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Refuse changing `type` on an `<input>` once it is in the tree, the way
    /// some engines bind the widget at insertion time
    pub restrict_type_change: bool,
    /// Publish a platform unique id per node (`uniqueID` property)
    pub expose_unique_id: bool,
    /// Prefix for ids handed out by `generate_id`
    pub id_prefix: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            viewport_width: 1024.0,
            viewport_height: 768.0,
            restrict_type_change: false,
            expose_unique_id: false,
            id_prefix: "yui_gen".to_string(),
        }
    }
}

/// Typed result of a property read
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Property not defined on this object
    Undefined,
    Null,
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Window,
    Value(Value),
}

impl PropertyValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, PropertyValue::Undefined)
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Value(value)
    }
}

/// Window state
#[derive(Debug, Clone, Default)]
pub struct Window {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub properties: Map<String, Value>,
}

/// Content handed to `add_html`
#[derive(Debug, Clone)]
pub enum Content {
    Html(String),
    Nodes(Vec<NodeId>),
}

/// Where `add_html` puts new content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    Append,
    /// Before the given node, inside that node's parent
    Before(NodeId),
    /// Replace all existing children
    Replace,
}

/// Attribute-reflecting string properties and the attribute they map to
const REFLECTED: &[(&str, &str)] = &[
    ("id", "id"),
    ("className", "class"),
    ("title", "title"),
    ("name", "name"),
    ("href", "href"),
    ("src", "src"),
    ("lang", "lang"),
    ("dir", "dir"),
    ("htmlFor", "for"),
    ("rel", "rel"),
    ("alt", "alt"),
    ("placeholder", "placeholder"),
];

const READ_ONLY: &[&str] = &[
    "nodeName",
    "nodeType",
    "tagName",
    "parentNode",
    "childNodes",
    "children",
    "firstChild",
    "lastChild",
    "previousSibling",
    "nextSibling",
    "ownerDocument",
    "documentElement",
    "body",
    "head",
    "defaultView",
    "offsetWidth",
    "offsetHeight",
    "offsetLeft",
    "offsetTop",
    "outerHTML",
    "uniqueID",
    "elements",
];

/// Properties inherited from the parent when not set inline
const INHERITED_STYLES: &[&str] = &[
    "color",
    "visibility",
    "font-size",
    "font-family",
    "font-weight",
    "line-height",
    "text-align",
];

/// HTML document
#[derive(Debug)]
pub struct Document {
    config: DocumentConfig,
    arena: DomArena,
    root: NodeId,
    html: NodeId,
    head: NodeId,
    body: NodeId,
    window: Window,
    active_element: Option<NodeId>,
    generated_ids: u64,
    submissions: usize,
}

impl Document {
    /// Create an empty `<html><head></head><body></body></html>` document
    pub fn new() -> Self {
        Self::with_config(DocumentConfig::default())
    }

    pub fn with_config(config: DocumentConfig) -> Self {
        let mut arena = DomArena::new();
        let root = arena.alloc(NodeType::Document, "#document");
        let html = arena.alloc(NodeType::Element, "HTML");
        let head = arena.alloc(NodeType::Element, "HEAD");
        let body = arena.alloc(NodeType::Element, "BODY");

        // Freshly allocated nodes cannot violate the hierarchy rules
        let _ = arena.append_child(root, html);
        let _ = arena.append_child(html, head);
        let _ = arena.append_child(html, body);

        Self {
            config,
            arena,
            root,
            html,
            head,
            body,
            window: Window::default(),
            active_element: None,
            generated_ids: 0,
            submissions: 0,
        }
    }

    /// Document whose body holds the given markup
    pub fn from_html(body_html: &str) -> Result<Self> {
        Self::from_html_with_config(body_html, DocumentConfig::default())
    }

    pub fn from_html_with_config(body_html: &str, config: DocumentConfig) -> Result<Self> {
        let mut doc = Self::with_config(config);
        let body = doc.body;
        doc.set_inner_html(body, body_html)?;
        Ok(doc)
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn arena(&self) -> &DomArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut DomArena {
        &mut self.arena
    }

    pub fn node(&self, id: NodeId) -> Result<&DomNode> {
        self.arena.get(id)
    }

    pub fn document_node(&self) -> NodeId {
        self.root
    }

    pub fn document_element(&self) -> NodeId {
        self.html
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Number of successful form submissions
    pub fn submissions(&self) -> usize {
        self.submissions
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.arena
            .alloc(NodeType::Element, &tag.to_ascii_uppercase())
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = self.arena.alloc(NodeType::Text, "#text");
        if let Ok(node) = self.arena.get_mut(id) {
            node.node_value = text.to_string();
        }
        id
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.arena
            .alloc(NodeType::DocumentFragment, "#document-fragment")
    }

    /// Build nodes from markup: the single top-level node, or a fragment
    /// holding all of them
    pub fn create(&mut self, html: &str) -> Result<NodeId> {
        let roots = markup::parse_fragment(&mut self.arena, html.trim())?;
        if roots.len() == 1 {
            return Ok(roots[0]);
        }
        let frag = self.create_fragment();
        for id in roots {
            self.arena.append_child(frag, id)?;
        }
        Ok(frag)
    }

    // ---------------------------------------------------------------
    // Tree
    // ---------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(id)?.parent_id)
    }

    pub fn child_nodes(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.children_ids.to_vec())
    }

    /// Element children only
    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .arena
            .children(id)?
            .into_iter()
            .filter(|n| n.is_element())
            .map(|n| n.node_id)
            .collect())
    }

    /// Sibling in either direction; `elements_only` skips text and comments
    pub fn sibling(&self, id: NodeId, forward: bool, elements_only: bool) -> Result<Option<NodeId>> {
        if elements_only {
            return Ok(selector::element_sibling(&self.arena, id, forward));
        }
        let Some(parent) = self.node(id)?.parent_id else {
            return Ok(None);
        };
        let siblings = &self.node(parent)?.children_ids;
        let pos = siblings.iter().position(|&c| c == id);
        Ok(pos.and_then(|pos| {
            if forward {
                siblings.get(pos + 1).copied()
            } else {
                pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
            }
        }))
    }

    pub fn contains(&self, id: NodeId, other: NodeId) -> bool {
        self.arena.contains(id, other)
    }

    /// True when the node is attached to this document's tree
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.arena.contains(self.root, id)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        self.arena.append_child(parent, child)
    }

    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<NodeId> {
        self.arena.insert_before(parent, child, reference)
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        let removed = self.arena.remove_child(parent, child)?;
        if let Some(active) = self.active_element {
            if self.arena.contains(removed, active) {
                self.active_element = None;
            }
        }
        Ok(removed)
    }

    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> Result<NodeId> {
        self.arena.replace_child(parent, new, old)
    }

    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> Result<NodeId> {
        self.arena.clone_node(id, deep)
    }

    fn clear_children(&mut self, id: NodeId) -> Result<()> {
        for child in self.child_nodes(id)? {
            self.remove_child(id, child)?;
        }
        Ok(())
    }

    /// Insert markup or existing nodes; returns the inserted node (a
    /// fragment, now emptied, when several nodes went in)
    pub fn add_html(&mut self, id: NodeId, content: Content, at: InsertAt) -> Result<NodeId> {
        let new_node = match content {
            Content::Html(html) => self.create(&html)?,
            Content::Nodes(nodes) if nodes.len() == 1 => nodes[0],
            Content::Nodes(nodes) => self.to_fragment(&nodes)?,
        };

        match at {
            InsertAt::Append => {
                self.append_child(id, new_node)?;
            }
            InsertAt::Before(reference) => {
                let parent = self.parent(reference)?.unwrap_or(id);
                self.insert_before(parent, new_node, Some(reference))?;
            }
            InsertAt::Replace => {
                self.clear_children(id)?;
                self.append_child(id, new_node)?;
            }
        }
        Ok(new_node)
    }

    /// Move nodes into a new fragment
    pub fn to_fragment(&mut self, nodes: &[NodeId]) -> Result<NodeId> {
        let frag = self.create_fragment();
        for &id in nodes {
            self.append_child(frag, id)?;
        }
        Ok(frag)
    }

    /// Wrap the node in the (deepest first element of the) given markup
    pub fn wrap(&mut self, id: NodeId, html: &str) -> Result<()> {
        let mut wrapper = self.create(html)?;
        if self.node(wrapper)?.node_type == NodeType::DocumentFragment {
            match self.children(wrapper)?.first() {
                Some(&first) => wrapper = first,
                None => return Ok(()),
            }
            self.arena.detach(wrapper)?;
        }
        let mut innermost = wrapper;
        while let Some(&first) = self.children(innermost)?.first() {
            innermost = first;
        }
        if let Some(parent) = self.parent(id)? {
            self.insert_before(parent, wrapper, Some(id))?;
        }
        self.append_child(innermost, id)?;
        Ok(())
    }

    /// Remove the node's parent, keeping the parent's children in place
    pub fn unwrap(&mut self, id: NodeId) -> Result<()> {
        let Some(parent) = self.parent(id)? else {
            return Ok(());
        };
        let Some(grandparent) = self.parent(parent)? else {
            return Ok(());
        };
        for child in self.child_nodes(parent)? {
            self.insert_before(grandparent, child, Some(parent))?;
        }
        self.remove_child(grandparent, parent)?;
        Ok(())
    }

    /// Ensure the element has an id attribute and return it
    pub fn generate_id(&mut self, id: NodeId) -> Result<String> {
        if let Some(existing) = self.node(id)?.attr("id").filter(|v| !v.is_empty()) {
            return Ok(existing.to_string());
        }
        self.generated_ids += 1;
        let generated = format!("{}_{}", self.config.id_prefix, self.generated_ids);
        self.set_attribute(id, "id", &generated)?;
        Ok(generated)
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Run a selector below `root` (the whole document when None)
    pub fn query(&self, selector: &str, root: Option<NodeId>, first_only: bool) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        let root = root.unwrap_or(self.root);
        let mut out = Vec::new();
        for id in self.arena.descendants(root)? {
            if list.matches(&self.arena, id) {
                out.push(id);
                if first_only {
                    break;
                }
            }
        }
        Ok(out)
    }

    pub fn matches(&self, id: NodeId, selector: &str) -> Result<bool> {
        Ok(SelectorList::parse(selector)?.matches(&self.arena, id))
    }

    pub fn filter(&self, ids: &[NodeId], selector: &str) -> Result<Vec<NodeId>> {
        let list = SelectorList::parse(selector)?;
        Ok(ids
            .iter()
            .copied()
            .filter(|&id| list.matches(&self.arena, id))
            .collect())
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.arena.find_by_id(self.root, id).ok().flatten()
    }

    pub fn elements_by_tag_name(&self, id: NodeId, tag: &str) -> Result<Vec<NodeId>> {
        self.arena.find_by_tag(id, tag)
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    fn attr_name(name: &str) -> &str {
        match name {
            "className" => "class",
            "htmlFor" => "for",
            other => other,
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Result<Option<String>> {
        let node = self.node(id)?;
        let name = Self::attr_name(name);
        if name == "style" {
            return Ok((!node.styles.is_empty()).then(|| node.style_text()));
        }
        Ok(node.attr(name).map(str::to_string))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        let name = Self::attr_name(name).to_ascii_lowercase();
        if name == "type" {
            self.check_type_change(id)?;
        }
        let node = self.arena.get_mut(id)?;
        if name == "style" {
            node.set_style_text(value);
            return Ok(());
        }
        if name == "checked" {
            node.checked = true;
        }
        node.attributes.insert(name, value.to_string());
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        let name = Self::attr_name(name);
        let node = self.arena.get_mut(id)?;
        match name {
            "style" => node.styles.clear(),
            "checked" => {
                node.checked = false;
                node.attributes.remove(name);
            }
            _ => {
                node.attributes.remove(name);
            }
        }
        Ok(())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> Result<bool> {
        Ok(self.get_attribute(id, name)?.is_some())
    }

    fn check_type_change(&self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if self.config.restrict_type_change && node.is_tag("INPUT") && self.is_connected(id) {
            return Err(DomError::Restricted(format!(
                "cannot change type of inserted {}",
                node.node_name
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    /// Read a script-visible property
    pub fn property(&self, id: NodeId, name: &str) -> Result<PropertyValue> {
        let node = self.node(id)?;
        let element = node.is_element();
        let is_doc = node.node_type == NodeType::Document;
        let container = element || is_doc || node.node_type == NodeType::DocumentFragment;
        let opt_node = |v: Option<NodeId>| v.map(PropertyValue::Node).unwrap_or(PropertyValue::Null);

        if let Some(&(_, attr)) = REFLECTED.iter().find(|(prop, _)| *prop == name) {
            if element {
                return Ok(Value::from(node.attr(attr).unwrap_or("")).into());
            }
        }

        let value = match name {
            "nodeName" => Value::from(node.node_name.as_str()).into(),
            "nodeType" => Value::from(node.node_type.as_u8()).into(),
            "nodeValue" => match node.node_type {
                NodeType::Text | NodeType::Comment | NodeType::CdataSection => {
                    Value::from(node.node_value.as_str()).into()
                }
                _ => PropertyValue::Null,
            },
            "tagName" if element => Value::from(node.node_name.as_str()).into(),
            "type" if element => match node.attr("type") {
                Some(t) => Value::from(t).into(),
                None if node.is_tag("INPUT") => Value::from("text").into(),
                None if node.is_tag("BUTTON") => Value::from("submit").into(),
                None => PropertyValue::Undefined,
            },
            "value" if element && node.is_form_control() => Value::from(self.value(id)?).into(),
            "checked" if element && node.is_form_control() => Value::from(node.checked).into(),
            "disabled" if element && node.is_form_control() => {
                Value::from(node.attr("disabled").is_some()).into()
            }
            "innerHTML" if container && !is_doc => {
                Value::from(DomSerializer::new().inner_html(&self.arena, id)?).into()
            }
            "outerHTML" if element => {
                Value::from(DomSerializer::new().outer_html(&self.arena, id)?).into()
            }
            "textContent" if is_doc => PropertyValue::Null,
            "textContent" => Value::from(self.text(id)?).into(),
            "parentNode" => opt_node(node.parent_id),
            "childNodes" => PropertyValue::Nodes(node.children_ids.to_vec()),
            "children" if container => PropertyValue::Nodes(self.children(id)?),
            "firstChild" => opt_node(node.children_ids.first().copied()),
            "lastChild" => opt_node(node.children_ids.last().copied()),
            "previousSibling" => opt_node(self.sibling(id, false, false)?),
            "nextSibling" => opt_node(self.sibling(id, true, false)?),
            "ownerDocument" if is_doc => PropertyValue::Null,
            "ownerDocument" => PropertyValue::Node(self.root),
            "documentElement" if is_doc => PropertyValue::Node(self.html),
            "body" if is_doc => PropertyValue::Node(self.body),
            "head" if is_doc => PropertyValue::Node(self.head),
            "defaultView" if is_doc => PropertyValue::Window,
            "URL" if is_doc => Value::from(self.config.url.as_str()).into(),
            "style" if element => Value::Object(
                node.styles
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                    .collect(),
            )
            .into(),
            "offsetWidth" | "offsetHeight" | "offsetLeft" | "offsetTop" if element => {
                let rect = self.region(id)?.unwrap_or(DomRect::new(0.0, 0.0, 0.0, 0.0));
                let v = match name {
                    "offsetWidth" => rect.width,
                    "offsetHeight" => rect.height,
                    "offsetLeft" => rect.x,
                    _ => rect.y,
                };
                Value::from(v).into()
            }
            "scrollLeft" if element => Value::from(node.scroll_left).into(),
            "scrollTop" if element => Value::from(node.scroll_top).into(),
            "elements" if node.is_tag("FORM") => PropertyValue::Nodes(self.arena.find(id, |n| {
                ["INPUT", "TEXTAREA", "SELECT", "BUTTON"]
                    .iter()
                    .any(|t| n.is_tag(t))
            })?),
            "uniqueID" if self.config.expose_unique_id && !is_doc => {
                Value::from(node.uuid.as_str()).into()
            }
            _ => match node.properties.get(name) {
                Some(Value::Null) => PropertyValue::Null,
                Some(v) => PropertyValue::Value(v.clone()),
                None => PropertyValue::Undefined,
            },
        };
        Ok(value)
    }

    pub fn has_property(&self, id: NodeId, name: &str) -> Result<bool> {
        Ok(!self.property(id, name)?.is_undefined())
    }

    /// Assign a script-visible property; unknown names become expandos
    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) -> Result<()> {
        if READ_ONLY.contains(&name) {
            return Err(DomError::ReadOnly(name.to_string()));
        }
        let (element, form_control, node_type) = {
            let node = self.node(id)?;
            (node.is_element(), node.is_form_control(), node.node_type)
        };

        if element {
            if let Some(&(_, attr)) = REFLECTED.iter().find(|(prop, _)| *prop == name) {
                return self.set_attribute(id, attr, &value_to_string(&value));
            }
        }

        match name {
            "type" if element => self.set_attribute(id, "type", &value_to_string(&value)),
            "value" if form_control => self.set_value(id, &value_to_string(&value)),
            "checked" if form_control => {
                self.arena.get_mut(id)?.checked = truthy(&value);
                Ok(())
            }
            "disabled" if form_control => {
                if truthy(&value) {
                    self.set_attribute(id, "disabled", "")
                } else {
                    self.remove_attribute(id, "disabled")
                }
            }
            "innerHTML" if element || node_type == NodeType::DocumentFragment => {
                self.set_inner_html(id, &value_to_string(&value))
            }
            "textContent" if node_type != NodeType::Document => {
                self.set_text(id, &value_to_string(&value))
            }
            "nodeValue" if matches!(node_type, NodeType::Text | NodeType::Comment) => {
                self.arena.get_mut(id)?.node_value = value_to_string(&value);
                Ok(())
            }
            "style" if element => {
                let node = self.arena.get_mut(id)?;
                match value {
                    Value::Object(map) => {
                        node.styles = map
                            .iter()
                            .filter(|(_, v)| !value_to_string(v).is_empty())
                            .map(|(k, v)| (utils::css_name(k), value_to_string(v)))
                            .collect();
                    }
                    other => node.set_style_text(&value_to_string(&other)),
                }
                Ok(())
            }
            "scrollLeft" | "scrollTop" if element => {
                let amount = value.as_f64().ok_or_else(|| DomError::InvalidValue {
                    name: name.to_string(),
                    value: value.to_string(),
                })?;
                let node = self.arena.get_mut(id)?;
                if name == "scrollLeft" {
                    node.scroll_left = amount.max(0.0);
                } else {
                    node.scroll_top = amount.max(0.0);
                }
                Ok(())
            }
            _ => {
                self.arena
                    .get_mut(id)?
                    .properties
                    .insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    /// Delete an expando property
    pub fn remove_property(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.arena.get_mut(id)?.properties.remove(name);
        Ok(())
    }

    pub fn window_property(&self, name: &str) -> PropertyValue {
        match name {
            "document" => PropertyValue::Node(self.root),
            "innerWidth" => Value::from(self.config.viewport_width).into(),
            "innerHeight" => Value::from(self.config.viewport_height).into(),
            "scrollX" | "pageXOffset" => Value::from(self.window.scroll_x).into(),
            "scrollY" | "pageYOffset" => Value::from(self.window.scroll_y).into(),
            _ => match self.window.properties.get(name) {
                Some(Value::Null) => PropertyValue::Null,
                Some(v) => PropertyValue::Value(v.clone()),
                None => PropertyValue::Undefined,
            },
        }
    }

    pub fn set_window_property(&mut self, name: &str, value: Value) -> Result<()> {
        match name {
            "document" | "innerWidth" | "innerHeight" => Err(DomError::ReadOnly(name.to_string())),
            "scrollX" | "pageXOffset" => {
                self.scroll_to(value.as_f64().unwrap_or(0.0), self.window.scroll_y);
                Ok(())
            }
            "scrollY" | "pageYOffset" => {
                self.scroll_to(self.window.scroll_x, value.as_f64().unwrap_or(0.0));
                Ok(())
            }
            _ => {
                self.window.properties.insert(name.to_string(), value);
                Ok(())
            }
        }
    }

    // ---------------------------------------------------------------
    // Text, markup, values
    // ---------------------------------------------------------------

    pub fn text(&self, id: NodeId) -> Result<String> {
        utils::get_text_content(&self.arena, id)
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        if self.node(id)?.is_text() {
            self.arena.get_mut(id)?.node_value = text.to_string();
            return Ok(());
        }
        self.clear_children(id)?;
        if !text.is_empty() {
            let text_node = self.create_text(text);
            self.append_child(id, text_node)?;
        }
        Ok(())
    }

    pub fn inner_html(&self, id: NodeId) -> Result<String> {
        DomSerializer::new().inner_html(&self.arena, id)
    }

    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<()> {
        self.clear_children(id)?;
        for child in markup::parse_fragment(&mut self.arena, html)? {
            self.append_child(id, child)?;
        }
        Ok(())
    }

    /// Current value of a form control (`""` for everything else)
    pub fn value(&self, id: NodeId) -> Result<String> {
        let node = self.node(id)?;
        if let Some(v) = &node.form_value {
            return Ok(v.clone());
        }
        if node.is_tag("TEXTAREA") {
            return self.text(id);
        }
        if node.is_tag("OPTION") {
            return match node.attr("value") {
                Some(v) => Ok(v.to_string()),
                None => Ok(self.text(id)?.trim().to_string()),
            };
        }
        if node.is_tag("SELECT") {
            let options = self.arena.find_by_tag(id, "OPTION")?;
            let selected = options
                .iter()
                .copied()
                .find(|&o| self.arena.get(o).map(|n| n.attr("selected").is_some()).unwrap_or(false))
                .or_else(|| options.first().copied());
            return match selected {
                Some(option) => self.value(option),
                None => Ok(String::new()),
            };
        }
        Ok(node.attr("value").unwrap_or("").to_string())
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) -> Result<()> {
        if self.node(id)?.is_tag("SELECT") {
            let options = self.arena.find_by_tag(id, "OPTION")?;
            let mut matched = None;
            for &option in &options {
                if matched.is_none() && self.value(option)? == value {
                    matched = Some(option);
                }
            }
            if let Some(chosen) = matched {
                for option in options {
                    let node = self.arena.get_mut(option)?;
                    if option == chosen {
                        node.attributes.insert("selected".to_string(), String::new());
                    } else {
                        node.attributes.remove("selected");
                    }
                }
            }
            return Ok(());
        }
        self.arena.get_mut(id)?.form_value = Some(value.to_string());
        Ok(())
    }

    // ---------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------

    pub fn has_class(&self, id: NodeId, class: &str) -> Result<bool> {
        Ok(self.node(id)?.has_class(class))
    }

    fn write_classes(&mut self, id: NodeId, classes: Vec<String>) -> Result<()> {
        self.arena
            .get_mut(id)?
            .attributes
            .insert("class".to_string(), classes.join(" "));
        Ok(())
    }

    fn class_list(&self, id: NodeId) -> Result<Vec<String>> {
        Ok(self.node(id)?.classes().map(str::to_string).collect())
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let mut classes = self.class_list(id)?;
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.write_classes(id, classes)?;
        }
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        let mut classes = self.class_list(id)?;
        let before = classes.len();
        classes.retain(|c| c != class);
        if classes.len() != before {
            self.write_classes(id, classes)?;
        }
        Ok(())
    }

    pub fn replace_class(&mut self, id: NodeId, old: &str, new: &str) -> Result<()> {
        self.remove_class(id, new)?;
        self.remove_class(id, old)?;
        self.add_class(id, new)
    }

    /// Toggle; `force` pins the outcome. Returns whether the class is now set.
    pub fn toggle_class(&mut self, id: NodeId, class: &str, force: Option<bool>) -> Result<bool> {
        let add = force.unwrap_or(!self.has_class(id, class)?);
        if add {
            self.add_class(id, class)?;
        } else {
            self.remove_class(id, class)?;
        }
        Ok(add)
    }

    // ---------------------------------------------------------------
    // Style
    // ---------------------------------------------------------------

    /// Inline style value (`""` when unset)
    pub fn style(&self, id: NodeId, property: &str) -> Result<String> {
        let name = utils::css_name(property);
        Ok(self
            .node(id)?
            .styles
            .get(&name)
            .cloned()
            .unwrap_or_default())
    }

    /// Set an inline style; an empty value removes the declaration
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> Result<()> {
        let name = utils::css_name(property);
        let node = self.arena.get_mut(id)?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType {
                expected: "element".to_string(),
                actual: node.node_name.clone(),
            });
        }
        let value = value.trim();
        if value.is_empty() {
            node.styles.remove(&name);
        } else {
            node.styles.insert(name, value.to_string());
        }
        Ok(())
    }

    /// Resolved style: inline, then inherited, then defaults
    pub fn computed_style(&self, id: NodeId, property: &str) -> Result<String> {
        let name = utils::css_name(property);
        let node = self.node(id)?;
        if let Some(v) = node.styles.get(&name) {
            return Ok(v.clone());
        }
        if INHERITED_STYLES.contains(&name.as_str()) {
            for ancestor in self.arena.ancestors(id)? {
                if let Some(v) = self.node(ancestor)?.styles.get(&name) {
                    return Ok(v.clone());
                }
            }
        }
        let tag = node.node_name.to_ascii_lowercase();
        let value = match name.as_str() {
            "display" if HIDDEN_ELEMENTS.contains(&tag.as_str()) => "none".to_string(),
            "display" if BLOCK_ELEMENTS.contains(&tag.as_str()) => "block".to_string(),
            "display" if tag == "li" => "list-item".to_string(),
            "display" => "inline".to_string(),
            "visibility" => "visible".to_string(),
            "position" => "static".to_string(),
            "opacity" => "1".to_string(),
            "color" => "rgb(0, 0, 0)".to_string(),
            "width" | "height" => match node.layout {
                Some(rect) => {
                    let v = if name == "width" { rect.width } else { rect.height };
                    format!("{}px", v)
                }
                None => "auto".to_string(),
            },
            "left" | "top" | "right" | "bottom" => "auto".to_string(),
            _ => String::new(),
        };
        Ok(value)
    }

    /// Rendered: connected, and neither it nor an ancestor is `display: none`
    pub fn is_displayed(&self, id: NodeId) -> Result<bool> {
        if !self.is_connected(id) {
            return Ok(false);
        }
        let mut chain = vec![id];
        chain.extend(self.arena.ancestors(id)?);
        for node_id in chain {
            if self.node(node_id)?.is_element() && self.computed_style(node_id, "display")? == "none" {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // ---------------------------------------------------------------
    // Geometry
    // ---------------------------------------------------------------

    /// Record the layout box computed for a node
    pub fn set_layout(&mut self, id: NodeId, rect: DomRect) -> Result<()> {
        self.arena.get_mut(id)?.layout = Some(rect);
        Ok(())
    }

    /// Box of a rendered node in document coordinates
    pub fn region(&self, id: NodeId) -> Result<Option<DomRect>> {
        if !self.is_displayed(id)? {
            return Ok(None);
        }
        Ok(self.node(id)?.layout)
    }

    /// Move a rendered node to page coordinates via relative offsets
    pub fn set_xy(&mut self, id: NodeId, x: Option<f64>, y: Option<f64>) -> Result<()> {
        let Some(current) = self.region(id)? else {
            tracing::debug!(node = id, "set_xy on a node that is not rendered");
            return Ok(());
        };
        if self.computed_style(id, "position")? == "static" {
            self.set_style(id, "position", "relative")?;
        }
        let mut rect = current;
        if let Some(x) = x {
            let left = utils::parse_px(&self.style(id, "left")?).unwrap_or(0.0);
            self.set_style(id, "left", &format!("{}px", left + x - current.x))?;
            rect.x = x;
        }
        if let Some(y) = y {
            let top = utils::parse_px(&self.style(id, "top")?).unwrap_or(0.0);
            self.set_style(id, "top", &format!("{}px", top + y - current.y))?;
            rect.y = y;
        }
        self.set_layout(id, rect)
    }

    pub fn set_width(&mut self, id: NodeId, width: f64) -> Result<()> {
        let width = width.max(0.0);
        self.set_style(id, "width", &format!("{}px", width))?;
        if let Some(rect) = self.node(id)?.layout {
            self.set_layout(id, DomRect { width, ..rect })?;
        }
        Ok(())
    }

    pub fn set_height(&mut self, id: NodeId, height: f64) -> Result<()> {
        let height = height.max(0.0);
        self.set_style(id, "height", &format!("{}px", height))?;
        if let Some(rect) = self.node(id)?.layout {
            self.set_layout(id, DomRect { height, ..rect })?;
        }
        Ok(())
    }

    pub fn viewport_region(&self) -> DomRect {
        DomRect::new(
            self.window.scroll_x,
            self.window.scroll_y,
            self.config.viewport_width,
            self.config.viewport_height,
        )
    }

    pub fn win_width(&self) -> f64 {
        self.config.viewport_width
    }

    pub fn win_height(&self) -> f64 {
        self.config.viewport_height
    }

    /// Scrollable width of the page (never less than the viewport)
    pub fn doc_width(&self) -> f64 {
        [self.html, self.body]
            .iter()
            .filter_map(|&id| self.arena.get(id).ok().and_then(|n| n.layout))
            .map(|r| r.right())
            .fold(self.config.viewport_width, f64::max)
    }

    pub fn doc_height(&self) -> f64 {
        [self.html, self.body]
            .iter()
            .filter_map(|&id| self.arena.get(id).ok().and_then(|n| n.layout))
            .map(|r| r.bottom())
            .fold(self.config.viewport_height, f64::max)
    }

    pub fn doc_scroll_x(&self) -> f64 {
        self.window.scroll_x
    }

    pub fn doc_scroll_y(&self) -> f64 {
        self.window.scroll_y
    }

    /// Scroll the window, clamped to the scrollable area
    pub fn scroll_to(&mut self, x: f64, y: f64) {
        let max_x = (self.doc_width() - self.config.viewport_width).max(0.0);
        let max_y = (self.doc_height() - self.config.viewport_height).max(0.0);
        self.window.scroll_x = x.clamp(0.0, max_x);
        self.window.scroll_y = y.clamp(0.0, max_y);
    }

    pub fn scroll_into_view(&mut self, id: NodeId) -> Result<()> {
        if let Some(rect) = self.region(id)? {
            self.scroll_to(self.window.scroll_x, rect.top());
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Element actions
    // ---------------------------------------------------------------

    /// Focus an element; the platform refuses hidden or disabled ones
    pub fn focus(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id)?;
        if !node.is_element() {
            return Err(DomError::InvalidNodeType {
                expected: "element".to_string(),
                actual: node.node_name.clone(),
            });
        }
        if node.attr("disabled").is_some() || !self.is_displayed(id)? {
            return Err(DomError::Restricted(format!(
                "{} cannot receive focus",
                node.node_name
            )));
        }
        self.active_element = Some(id);
        Ok(())
    }

    pub fn blur(&mut self, id: NodeId) -> Result<()> {
        self.node(id)?;
        if self.active_element == Some(id) {
            self.active_element = None;
        }
        Ok(())
    }

    fn expect_tag(&self, id: NodeId, tags: &[&str]) -> Result<()> {
        let node = self.node(id)?;
        if tags.iter().any(|t| node.is_tag(t)) {
            Ok(())
        } else {
            Err(DomError::InvalidNodeType {
                expected: tags.join("|"),
                actual: node.node_name.clone(),
            })
        }
    }

    pub fn submit(&mut self, id: NodeId) -> Result<()> {
        self.expect_tag(id, &["FORM"])?;
        self.submissions += 1;
        tracing::debug!(node = id, "form submitted");
        Ok(())
    }

    /// Restore every control in the form to its markup defaults
    pub fn reset(&mut self, id: NodeId) -> Result<()> {
        self.expect_tag(id, &["FORM"])?;
        for control in self.arena.find(id, |n| n.is_form_control())? {
            let node = self.arena.get_mut(control)?;
            node.form_value = None;
            node.checked = node.attributes.contains_key("checked");
        }
        Ok(())
    }

    /// Select the full text of an input or textarea
    pub fn select(&mut self, id: NodeId) -> Result<()> {
        self.expect_tag(id, &["INPUT", "TEXTAREA"])?;
        let len = self.value(id)?.chars().count();
        let node = self.arena.get_mut(id)?;
        node.properties
            .insert("selectionStart".to_string(), Value::from(0));
        node.properties
            .insert("selectionEnd".to_string(), Value::from(len));
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// String form of a JSON value as the DOM would coerce it
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JavaScript-style truthiness
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Document {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
        Document::from_html(
            r#"<div id="main" class="box"><p id="p1">Hello <b>world</b></p><input id="field" value="x"><form id="f"><input id="c" type="checkbox" checked><textarea id="t">note</textarea></form></div>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_structure() {
        let doc = doc();
        assert_eq!(doc.node(doc.body()).unwrap().children_ids.len(), 1);
        let main = doc.by_id("main").unwrap();
        assert!(doc.contains(doc.body(), main));
        assert!(doc.is_connected(main));
    }

    #[test]
    fn test_query_scoped_and_first() {
        let doc = doc();
        let main = doc.by_id("main").unwrap();
        assert_eq!(doc.query("input", Some(main), false).unwrap().len(), 2);
        assert_eq!(
            doc.query("input", None, true).unwrap(),
            vec![doc.by_id("field").unwrap()]
        );
        assert!(doc.query("div[", None, false).is_err());
    }

    #[test]
    fn test_properties() {
        let mut doc = doc();
        let p = doc.by_id("p1").unwrap();
        assert_eq!(doc.property(p, "nodeName").unwrap(), json!("P").into());
        assert_eq!(doc.property(p, "textContent").unwrap(), json!("Hello world").into());
        assert_eq!(doc.property(p, "ownerDocument").unwrap(), PropertyValue::Node(doc.document_node()));
        assert!(doc.property(p, "nope").unwrap().is_undefined());

        doc.set_property(p, "title", json!("tip")).unwrap();
        assert_eq!(doc.get_attribute(p, "title").unwrap().as_deref(), Some("tip"));

        doc.set_property(p, "custom", json!({"a": 1})).unwrap();
        assert_eq!(doc.property(p, "custom").unwrap(), json!({"a": 1}).into());

        assert!(matches!(
            doc.set_property(p, "nodeName", json!("X")),
            Err(DomError::ReadOnly(_))
        ));
    }

    #[test]
    fn test_values() {
        let mut doc = doc();
        let field = doc.by_id("field").unwrap();
        let t = doc.by_id("t").unwrap();
        assert_eq!(doc.value(field).unwrap(), "x");
        assert_eq!(doc.value(t).unwrap(), "note");

        doc.set_value(field, "typed").unwrap();
        assert_eq!(doc.value(field).unwrap(), "typed");
        assert_eq!(doc.get_attribute(field, "value").unwrap().as_deref(), Some("x"));

        let form = doc.by_id("f").unwrap();
        let c = doc.by_id("c").unwrap();
        doc.set_property(c, "checked", json!(false)).unwrap();
        doc.reset(form).unwrap();
        assert!(doc.node(c).unwrap().checked);
    }

    #[test]
    fn test_select_value() {
        let mut doc = Document::from_html(
            r#"<select id="s"><option value="a">A</option><option>B</option></select>"#,
        )
        .unwrap();
        let s = doc.by_id("s").unwrap();
        assert_eq!(doc.value(s).unwrap(), "a");
        doc.set_value(s, "B").unwrap();
        assert_eq!(doc.value(s).unwrap(), "B");
    }

    #[test]
    fn test_type_restriction() {
        let config = DocumentConfig {
            restrict_type_change: true,
            ..DocumentConfig::default()
        };
        let mut doc = Document::from_html_with_config(r#"<input id="i">"#, config).unwrap();
        let input = doc.by_id("i").unwrap();
        assert!(matches!(
            doc.set_property(input, "type", json!("hidden")),
            Err(DomError::Restricted(_))
        ));

        // detached inputs may still change
        let detached = doc.create_element("input");
        doc.set_property(detached, "type", json!("hidden")).unwrap();
        assert_eq!(doc.property(detached, "type").unwrap(), json!("hidden").into());
    }

    #[test]
    fn test_classes_and_styles() {
        let mut doc = doc();
        let main = doc.by_id("main").unwrap();
        doc.add_class(main, "on").unwrap();
        doc.replace_class(main, "box", "panel").unwrap();
        assert_eq!(doc.get_attribute(main, "class").unwrap().as_deref(), Some("on panel"));
        assert!(!doc.toggle_class(main, "on", None).unwrap());

        doc.set_style(main, "backgroundColor", "red").unwrap();
        assert_eq!(doc.style(main, "background-color").unwrap(), "red");
        assert_eq!(doc.computed_style(main, "display").unwrap(), "block");

        let b = doc.query("b", None, true).unwrap()[0];
        doc.set_style(main, "color", "blue").unwrap();
        assert_eq!(doc.computed_style(b, "color").unwrap(), "blue");

        doc.set_style(main, "display", "none").unwrap();
        assert!(!doc.is_displayed(b).unwrap());
    }

    #[test]
    fn test_wrap_unwrap() {
        let mut doc = doc();
        let p = doc.by_id("p1").unwrap();
        doc.wrap(p, r#"<section><div class="inner"></div></section>"#).unwrap();
        let parent = doc.parent(p).unwrap().unwrap();
        assert!(doc.node(parent).unwrap().has_class("inner"));

        doc.unwrap(p).unwrap();
        let parent = doc.parent(p).unwrap().unwrap();
        assert!(doc.node(parent).unwrap().is_tag("SECTION"));
    }

    #[test]
    fn test_geometry() {
        let mut doc = doc();
        let main = doc.by_id("main").unwrap();
        doc.set_layout(main, DomRect::new(10.0, 20.0, 100.0, 50.0)).unwrap();
        doc.set_xy(main, Some(30.0), None).unwrap();
        assert_eq!(doc.style(main, "left").unwrap(), "20px");
        assert_eq!(doc.style(main, "position").unwrap(), "relative");
        assert_eq!(doc.region(main).unwrap().unwrap().x, 30.0);

        doc.set_layout(doc.body(), DomRect::new(0.0, 0.0, 1024.0, 3000.0)).unwrap();
        doc.scroll_to(0.0, 5000.0);
        assert_eq!(doc.doc_scroll_y(), 3000.0 - 768.0);
    }

    #[test]
    fn test_focus_rules() {
        let mut doc = doc();
        let field = doc.by_id("field").unwrap();
        doc.focus(field).unwrap();
        assert_eq!(doc.active_element(), Some(field));

        doc.set_attribute(field, "disabled", "").unwrap();
        assert!(matches!(doc.focus(field), Err(DomError::Restricted(_))));
    }

    #[test]
    fn test_generate_id() {
        let mut doc = doc();
        let b = doc.query("b", None, true).unwrap()[0];
        let id = doc.generate_id(b).unwrap();
        assert_eq!(id, "yui_gen_1");
        assert_eq!(doc.generate_id(b).unwrap(), id);
        assert_eq!(doc.by_id(&id), Some(b));
    }
}
