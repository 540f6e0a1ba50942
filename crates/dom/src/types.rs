//! Node records, layout rectangles and element tables for the in-memory document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

/// Arena slot of a node
pub type NodeId = u32;

/// Numeric `nodeType` as scripts see it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Rectangle with coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn intersects(&self, other: &DomRect) -> bool {
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

    /// Overlapping area of two rectangles, if any
    pub fn intersection(&self, other: &DomRect) -> Option<DomRect> {
        if !self.intersects(other) {
            return None;
        }
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(DomRect::new(left, top, right - left, bottom - top))
    }

    /// True when `other` lies entirely inside this rectangle
    pub fn contains(&self, other: &DomRect) -> bool {
        other.left() >= self.left()
            && other.top() >= self.top()
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Region object handed to script-facing code (edges instead of origin + size)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl From<DomRect> for Region {
    fn from(rect: DomRect) -> Self {
        Self {
            top: rect.top(),
            right: rect.right(),
            bottom: rect.bottom(),
            left: rect.left(),
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Region> for DomRect {
    fn from(region: Region) -> Self {
        DomRect::new(region.left, region.top, region.width, region.height)
    }
}

/// Result of intersecting two regions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intersection {
    pub region: Option<Region>,
    pub area: f64,
    /// True when the first region lies entirely inside the second
    pub in_region: bool,
}

/// One node of the tree, with the state scripts can observe on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub node_type: NodeType,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    pub node_name: String,
    pub node_value: String,
    pub attributes: HashMap<String, String>,

    /// Inline style declarations, `style` attribute is derived from these
    pub styles: BTreeMap<String, String>,

    /// Expando properties assigned by script
    pub properties: Map<String, Value>,

    /// Form control state
    pub form_value: Option<String>,
    pub checked: bool,

    /// Layout box in document coordinates, computed by the embedder
    pub layout: Option<DomRect>,
    pub scroll_left: f64,
    pub scroll_top: f64,

    /// Platform unique id
    pub uuid: String,
}

impl DomNode {
    pub fn new(node_id: NodeId, node_type: NodeType, node_name: String) -> Self {
        Self {
            node_id,
            node_type,
            node_name,
            node_value: String::new(),
            attributes: HashMap::new(),
            styles: BTreeMap::new(),
            properties: Map::new(),
            form_value: None,
            checked: false,
            parent_id: None,
            children_ids: SmallVec::new(),
            layout: None,
            scroll_left: 0.0,
            scroll_top: 0.0,
            uuid: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    /// Case-insensitive tag comparison
    pub fn is_tag(&self, tag: &str) -> bool {
        self.is_element() && self.node_name.eq_ignore_ascii_case(tag)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Whitespace-separated class tokens
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Serialized inline style (`display: none; color: red`)
    pub fn style_text(&self) -> String {
        self.styles
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Replace inline styles from `style` attribute text
    pub fn set_style_text(&mut self, text: &str) {
        self.styles.clear();
        for decl in text.split(';') {
            if let Some((name, value)) = decl.split_once(':') {
                let name = name.trim();
                let value = value.trim();
                if !name.is_empty() && !value.is_empty() {
                    self.styles.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    pub fn is_form_control(&self) -> bool {
        ["INPUT", "TEXTAREA", "SELECT", "BUTTON", "OPTION"]
            .iter()
            .any(|t| self.is_tag(t))
    }
}

/// Elements without closing tags
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Elements rendered as blocks by the default stylesheet
pub const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "div", "dl", "dd", "dt", "fieldset",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "main",
    "nav", "ol", "p", "pre", "section", "table", "ul",
];

/// Elements never rendered
pub const HIDDEN_ELEMENTS: &[&str] = &[
    "head", "link", "meta", "script", "style", "template", "title",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_intersection() {
        let a = DomRect::new(0.0, 0.0, 100.0, 100.0);
        let b = DomRect::new(50.0, 50.0, 100.0, 100.0);
        let overlap = a.intersection(&b).unwrap();
        assert_eq!(overlap, DomRect::new(50.0, 50.0, 50.0, 50.0));
        assert!(a.intersection(&DomRect::new(200.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_rect_contains() {
        let outer = DomRect::new(0.0, 0.0, 100.0, 100.0);
        assert!(outer.contains(&DomRect::new(10.0, 10.0, 20.0, 20.0)));
        assert!(!outer.contains(&DomRect::new(90.0, 90.0, 20.0, 20.0)));
    }

    #[test]
    fn test_style_text_roundtrip() {
        let mut node = DomNode::new(0, NodeType::Element, "DIV".to_string());
        node.set_style_text("color: red; display:none;;");
        assert_eq!(node.styles.get("display").map(String::as_str), Some("none"));
        assert_eq!(node.style_text(), "color: red; display: none");
    }

    #[test]
    fn test_classes() {
        let mut node = DomNode::new(0, NodeType::Element, "DIV".to_string());
        node.attributes
            .insert("class".to_string(), " a  b ".to_string());
        assert!(node.has_class("b"));
        assert!(!node.has_class("c"));
    }
}
