//! Host boundary - the primitives the wrapper layer consumes
//!
//! `DomHost` lists every operation the wrappers delegate to the platform.
//! Results come back as tagged `HostValue`s so the wrapper side never has to
//! guess whether a value is a node, a node list or plain data.

use dom::{Content, Document, DomRect, InsertAt, NodeId, NodeType, PropertyValue};
use serde_json::Value;

/// A raw platform handle: a DOM node or the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawNode {
    Node(NodeId),
    Window,
}

impl RawNode {
    /// The DOM node id (None for the window)
    pub fn id(self) -> Option<NodeId> {
        match self {
            RawNode::Node(id) => Some(id),
            RawNode::Window => None,
        }
    }

    pub fn is_window(self) -> bool {
        matches!(self, RawNode::Window)
    }
}

impl From<NodeId> for RawNode {
    fn from(id: NodeId) -> Self {
        RawNode::Node(id)
    }
}

/// Value produced by a host primitive
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// Nothing returned / property not defined
    Undefined,
    Null,
    Node(RawNode),
    Nodes(Vec<RawNode>),
    Value(Value),
}

impl From<PropertyValue> for HostValue {
    fn from(value: PropertyValue) -> Self {
        match value {
            PropertyValue::Undefined => HostValue::Undefined,
            PropertyValue::Null => HostValue::Null,
            PropertyValue::Node(id) => HostValue::Node(RawNode::Node(id)),
            PropertyValue::Nodes(ids) => HostValue::nodes(ids),
            PropertyValue::Window => HostValue::Node(RawNode::Window),
            PropertyValue::Value(v) => HostValue::Value(v),
        }
    }
}

impl From<Value> for HostValue {
    fn from(value: Value) -> Self {
        HostValue::Value(value)
    }
}

impl From<Option<NodeId>> for HostValue {
    fn from(value: Option<NodeId>) -> Self {
        value
            .map(|id| HostValue::Node(RawNode::Node(id)))
            .unwrap_or(HostValue::Null)
    }
}

impl HostValue {
    pub fn nodes(ids: Vec<NodeId>) -> Self {
        HostValue::Nodes(ids.into_iter().map(RawNode::Node).collect())
    }
}

/// Platform primitives consumed by the wrapper layer
pub trait DomHost {
    // identity
    fn document_node(&self) -> NodeId;
    fn exists(&self, node: NodeId) -> bool;
    fn node_type(&self, node: NodeId) -> dom::Result<NodeType>;
    fn node_name(&self, node: NodeId) -> dom::Result<String>;
    /// Platform-provided unique id, when the platform publishes one
    fn unique_id(&self, node: NodeId) -> Option<String>;

    // properties
    fn property(&self, node: RawNode, name: &str) -> dom::Result<HostValue>;
    fn set_property(&mut self, node: RawNode, name: &str, value: Value) -> dom::Result<()>;
    fn remove_property(&mut self, node: RawNode, name: &str) -> dom::Result<()>;

    // attributes
    fn get_attribute(&self, node: NodeId, name: &str) -> dom::Result<Option<String>>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> dom::Result<()>;
    fn remove_attribute(&mut self, node: NodeId, name: &str) -> dom::Result<()>;
    fn has_attribute(&self, node: NodeId, name: &str) -> dom::Result<bool>;

    // query engine
    fn query(&self, selector: &str, root: Option<NodeId>, first_only: bool) -> dom::Result<Vec<NodeId>>;
    fn test(&self, node: NodeId, selector: &str) -> dom::Result<bool>;
    fn filter(&self, nodes: &[NodeId], selector: &str) -> dom::Result<Vec<NodeId>>;
    fn by_id(&self, id: &str) -> Option<NodeId>;
    fn elements_by_tag_name(&self, node: NodeId, tag: &str) -> dom::Result<Vec<NodeId>>;

    // tree
    fn create(&mut self, html: &str) -> dom::Result<NodeId>;
    fn parent(&self, node: NodeId) -> dom::Result<Option<NodeId>>;
    fn child_nodes(&self, node: NodeId) -> dom::Result<Vec<NodeId>>;
    fn children(&self, node: NodeId) -> dom::Result<Vec<NodeId>>;
    fn sibling(&self, node: NodeId, forward: bool, elements_only: bool) -> dom::Result<Option<NodeId>>;
    fn contains(&self, node: NodeId, other: NodeId) -> bool;
    fn is_connected(&self, node: NodeId) -> bool;
    fn append_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<NodeId>;
    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> dom::Result<NodeId>;
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<NodeId>;
    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> dom::Result<NodeId>;
    fn clone_node(&mut self, node: NodeId, deep: bool) -> dom::Result<NodeId>;
    fn add_html(&mut self, node: NodeId, content: Content, at: InsertAt) -> dom::Result<NodeId>;
    fn to_fragment(&mut self, nodes: &[NodeId]) -> dom::Result<NodeId>;
    fn wrap(&mut self, node: NodeId, html: &str) -> dom::Result<()>;
    fn unwrap(&mut self, node: NodeId) -> dom::Result<()>;
    fn generate_id(&mut self, node: NodeId) -> dom::Result<String>;

    // content
    fn text(&self, node: NodeId) -> dom::Result<String>;
    fn set_text(&mut self, node: NodeId, text: &str) -> dom::Result<()>;
    fn inner_html(&self, node: NodeId) -> dom::Result<String>;
    fn set_inner_html(&mut self, node: NodeId, html: &str) -> dom::Result<()>;
    fn value(&self, node: NodeId) -> dom::Result<String>;
    fn set_value(&mut self, node: NodeId, value: &str) -> dom::Result<()>;

    // classes
    fn has_class(&self, node: NodeId, class: &str) -> dom::Result<bool>;
    fn add_class(&mut self, node: NodeId, class: &str) -> dom::Result<()>;
    fn remove_class(&mut self, node: NodeId, class: &str) -> dom::Result<()>;
    fn replace_class(&mut self, node: NodeId, old: &str, new: &str) -> dom::Result<()>;
    fn toggle_class(&mut self, node: NodeId, class: &str, force: Option<bool>) -> dom::Result<bool>;

    // style
    fn style(&self, node: NodeId, property: &str) -> dom::Result<String>;
    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> dom::Result<()>;
    fn computed_style(&self, node: NodeId, property: &str) -> dom::Result<String>;

    // geometry
    fn region(&self, node: NodeId) -> dom::Result<Option<DomRect>>;
    fn set_xy(&mut self, node: NodeId, x: Option<f64>, y: Option<f64>) -> dom::Result<()>;
    fn set_width(&mut self, node: NodeId, width: f64) -> dom::Result<()>;
    fn set_height(&mut self, node: NodeId, height: f64) -> dom::Result<()>;
    fn viewport_region(&self) -> DomRect;
    fn win_width(&self) -> f64;
    fn win_height(&self) -> f64;
    fn doc_width(&self) -> f64;
    fn doc_height(&self) -> f64;
    fn doc_scroll_x(&self) -> f64;
    fn doc_scroll_y(&self) -> f64;
    fn scroll_to(&mut self, x: f64, y: f64);
    fn scroll_into_view(&mut self, node: NodeId) -> dom::Result<()>;

    // element actions
    fn focus(&mut self, node: NodeId) -> dom::Result<()>;
    fn blur(&mut self, node: NodeId) -> dom::Result<()>;
    fn submit(&mut self, node: NodeId) -> dom::Result<()>;
    fn reset(&mut self, node: NodeId) -> dom::Result<()>;
    fn select(&mut self, node: NodeId) -> dom::Result<()>;
}

impl DomHost for Document {
    fn document_node(&self) -> NodeId {
        Document::document_node(self)
    }

    fn exists(&self, node: NodeId) -> bool {
        self.node(node).is_ok()
    }

    fn node_type(&self, node: NodeId) -> dom::Result<NodeType> {
        Ok(self.node(node)?.node_type)
    }

    fn node_name(&self, node: NodeId) -> dom::Result<String> {
        Ok(self.node(node)?.node_name.clone())
    }

    fn unique_id(&self, node: NodeId) -> Option<String> {
        if !self.config().expose_unique_id {
            return None;
        }
        self.node(node).ok().map(|n| n.uuid.clone())
    }

    fn property(&self, node: RawNode, name: &str) -> dom::Result<HostValue> {
        match node {
            RawNode::Node(id) => Ok(Document::property(self, id, name)?.into()),
            RawNode::Window => Ok(self.window_property(name).into()),
        }
    }

    fn set_property(&mut self, node: RawNode, name: &str, value: Value) -> dom::Result<()> {
        match node {
            RawNode::Node(id) => Document::set_property(self, id, name, value),
            RawNode::Window => self.set_window_property(name, value),
        }
    }

    fn remove_property(&mut self, node: RawNode, name: &str) -> dom::Result<()> {
        match node {
            RawNode::Node(id) => Document::remove_property(self, id, name),
            RawNode::Window => {
                self.window_mut().properties.remove(name);
                Ok(())
            }
        }
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> dom::Result<Option<String>> {
        Document::get_attribute(self, node, name)
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> dom::Result<()> {
        Document::set_attribute(self, node, name, value)
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> dom::Result<()> {
        Document::remove_attribute(self, node, name)
    }

    fn has_attribute(&self, node: NodeId, name: &str) -> dom::Result<bool> {
        Document::has_attribute(self, node, name)
    }

    fn query(&self, selector: &str, root: Option<NodeId>, first_only: bool) -> dom::Result<Vec<NodeId>> {
        Document::query(self, selector, root, first_only)
    }

    fn test(&self, node: NodeId, selector: &str) -> dom::Result<bool> {
        self.matches(node, selector)
    }

    fn filter(&self, nodes: &[NodeId], selector: &str) -> dom::Result<Vec<NodeId>> {
        Document::filter(self, nodes, selector)
    }

    fn by_id(&self, id: &str) -> Option<NodeId> {
        Document::by_id(self, id)
    }

    fn elements_by_tag_name(&self, node: NodeId, tag: &str) -> dom::Result<Vec<NodeId>> {
        Document::elements_by_tag_name(self, node, tag)
    }

    fn create(&mut self, html: &str) -> dom::Result<NodeId> {
        Document::create(self, html)
    }

    fn parent(&self, node: NodeId) -> dom::Result<Option<NodeId>> {
        Document::parent(self, node)
    }

    fn child_nodes(&self, node: NodeId) -> dom::Result<Vec<NodeId>> {
        Document::child_nodes(self, node)
    }

    fn children(&self, node: NodeId) -> dom::Result<Vec<NodeId>> {
        Document::children(self, node)
    }

    fn sibling(&self, node: NodeId, forward: bool, elements_only: bool) -> dom::Result<Option<NodeId>> {
        Document::sibling(self, node, forward, elements_only)
    }

    fn contains(&self, node: NodeId, other: NodeId) -> bool {
        Document::contains(self, node, other)
    }

    fn is_connected(&self, node: NodeId) -> bool {
        Document::is_connected(self, node)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<NodeId> {
        Document::append_child(self, parent, child)
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> dom::Result<NodeId> {
        Document::insert_before(self, parent, child, reference)
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> dom::Result<NodeId> {
        Document::remove_child(self, parent, child)
    }

    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> dom::Result<NodeId> {
        Document::replace_child(self, parent, new, old)
    }

    fn clone_node(&mut self, node: NodeId, deep: bool) -> dom::Result<NodeId> {
        Document::clone_node(self, node, deep)
    }

    fn add_html(&mut self, node: NodeId, content: Content, at: InsertAt) -> dom::Result<NodeId> {
        Document::add_html(self, node, content, at)
    }

    fn to_fragment(&mut self, nodes: &[NodeId]) -> dom::Result<NodeId> {
        Document::to_fragment(self, nodes)
    }

    fn wrap(&mut self, node: NodeId, html: &str) -> dom::Result<()> {
        Document::wrap(self, node, html)
    }

    fn unwrap(&mut self, node: NodeId) -> dom::Result<()> {
        Document::unwrap(self, node)
    }

    fn generate_id(&mut self, node: NodeId) -> dom::Result<String> {
        Document::generate_id(self, node)
    }

    fn text(&self, node: NodeId) -> dom::Result<String> {
        Document::text(self, node)
    }

    fn set_text(&mut self, node: NodeId, text: &str) -> dom::Result<()> {
        Document::set_text(self, node, text)
    }

    fn inner_html(&self, node: NodeId) -> dom::Result<String> {
        Document::inner_html(self, node)
    }

    fn set_inner_html(&mut self, node: NodeId, html: &str) -> dom::Result<()> {
        Document::set_inner_html(self, node, html)
    }

    fn value(&self, node: NodeId) -> dom::Result<String> {
        Document::value(self, node)
    }

    fn set_value(&mut self, node: NodeId, value: &str) -> dom::Result<()> {
        Document::set_value(self, node, value)
    }

    fn has_class(&self, node: NodeId, class: &str) -> dom::Result<bool> {
        Document::has_class(self, node, class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) -> dom::Result<()> {
        Document::add_class(self, node, class)
    }

    fn remove_class(&mut self, node: NodeId, class: &str) -> dom::Result<()> {
        Document::remove_class(self, node, class)
    }

    fn replace_class(&mut self, node: NodeId, old: &str, new: &str) -> dom::Result<()> {
        Document::replace_class(self, node, old, new)
    }

    fn toggle_class(&mut self, node: NodeId, class: &str, force: Option<bool>) -> dom::Result<bool> {
        Document::toggle_class(self, node, class, force)
    }

    fn style(&self, node: NodeId, property: &str) -> dom::Result<String> {
        Document::style(self, node, property)
    }

    fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> dom::Result<()> {
        Document::set_style(self, node, property, value)
    }

    fn computed_style(&self, node: NodeId, property: &str) -> dom::Result<String> {
        Document::computed_style(self, node, property)
    }

    fn region(&self, node: NodeId) -> dom::Result<Option<DomRect>> {
        Document::region(self, node)
    }

    fn set_xy(&mut self, node: NodeId, x: Option<f64>, y: Option<f64>) -> dom::Result<()> {
        Document::set_xy(self, node, x, y)
    }

    fn set_width(&mut self, node: NodeId, width: f64) -> dom::Result<()> {
        Document::set_width(self, node, width)
    }

    fn set_height(&mut self, node: NodeId, height: f64) -> dom::Result<()> {
        Document::set_height(self, node, height)
    }

    fn viewport_region(&self) -> DomRect {
        Document::viewport_region(self)
    }

    fn win_width(&self) -> f64 {
        Document::win_width(self)
    }

    fn win_height(&self) -> f64 {
        Document::win_height(self)
    }

    fn doc_width(&self) -> f64 {
        Document::doc_width(self)
    }

    fn doc_height(&self) -> f64 {
        Document::doc_height(self)
    }

    fn doc_scroll_x(&self) -> f64 {
        Document::doc_scroll_x(self)
    }

    fn doc_scroll_y(&self) -> f64 {
        Document::doc_scroll_y(self)
    }

    fn scroll_to(&mut self, x: f64, y: f64) {
        Document::scroll_to(self, x, y)
    }

    fn scroll_into_view(&mut self, node: NodeId) -> dom::Result<()> {
        Document::scroll_into_view(self, node)
    }

    fn focus(&mut self, node: NodeId) -> dom::Result<()> {
        Document::focus(self, node)
    }

    fn blur(&mut self, node: NodeId) -> dom::Result<()> {
        Document::blur(self, node)
    }

    fn submit(&mut self, node: NodeId) -> dom::Result<()> {
        Document::submit(self, node)
    }

    fn reset(&mut self, node: NodeId) -> dom::Result<()> {
        Document::reset(self, node)
    }

    fn select(&mut self, node: NodeId) -> dom::Result<()> {
        Document::select(self, node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_values_are_tagged() {
        let doc = Document::from_html(r#"<ul id="l"><li>a</li><li>b</li></ul>"#).unwrap();
        let host: &dyn DomHost = &doc;
        let list = host.by_id("l").unwrap();

        assert!(matches!(
            host.property(RawNode::Node(list), "children").unwrap(),
            HostValue::Nodes(ref nodes) if nodes.len() == 2
        ));
        assert_eq!(
            host.property(RawNode::Node(list), "parentNode").unwrap(),
            HostValue::Node(RawNode::Node(doc.body()))
        );
        assert_eq!(
            host.property(RawNode::Node(doc.document_node()), "defaultView").unwrap(),
            HostValue::Node(RawNode::Window)
        );
        assert_eq!(
            host.property(RawNode::Node(list), "missing").unwrap(),
            HostValue::Undefined
        );
    }

    #[test]
    fn test_unique_id_only_when_exposed() {
        let doc = Document::new();
        assert_eq!(DomHost::unique_id(&doc, doc.body()), None);

        let doc = Document::with_config(dom::DocumentConfig {
            expose_unique_id: true,
            ..Default::default()
        });
        assert!(DomHost::unique_id(&doc, doc.body()).is_some());
    }
}
