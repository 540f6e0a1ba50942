//! Attribute resolution for `Node::get` / `Node::set`
//!
//! Order of precedence: a configured getter/setter, then ARIA passthrough
//! (`role`, `aria-*`) via the attribute primitives, then the default
//! property passthrough (with dotted paths for nested values).

use crate::error::{NodeError, Result};
use crate::host::{HostValue, RawNode};
use crate::node::Node;
use ahash::AHashMap;
use dom::document::value_to_string;
use dom::{DomError, NodeType, Region};
use serde_json::Value;
use std::rc::Rc;

pub type Getter = Rc<dyn Fn(&Node) -> Result<HostValue>>;
pub type Setter = Rc<dyn Fn(&Node, Value) -> Result<()>>;

/// Override for one attribute name
#[derive(Clone, Default)]
pub struct AttrConfig {
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
}

impl AttrConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn getter(mut self, f: impl Fn(&Node) -> Result<HostValue> + 'static) -> Self {
        self.getter = Some(Rc::new(f));
        self
    }

    pub fn setter(mut self, f: impl Fn(&Node, Value) -> Result<()> + 'static) -> Self {
        self.setter = Some(Rc::new(f));
        self
    }
}

/// Name → override table
#[derive(Clone, Default)]
pub struct AttrTable {
    entries: AHashMap<String, AttrConfig>,
}

impl AttrTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in overrides
    pub fn builtin() -> Self {
        let mut table = Self::new();

        table.insert(
            "text",
            AttrConfig::new()
                .getter(|node| {
                    let id = node.node_id()?;
                    Ok(Value::from(node.with_host(|h| h.text(id))??).into())
                })
                .setter(|node, value| {
                    let id = node.node_id()?;
                    node.with_host_mut(|h| h.set_text(id, &value_to_string(&value)))??;
                    Ok(())
                }),
        );

        table.insert(
            "for",
            AttrConfig::new()
                .getter(|node| {
                    let id = node.node_id()?;
                    let value = node.with_host(|h| h.get_attribute(id, "for"))??;
                    Ok(Value::from(value.unwrap_or_default()).into())
                })
                .setter(|node, value| {
                    let id = node.node_id()?;
                    node.with_host_mut(|h| h.set_attribute(id, "for", &value_to_string(&value)))??;
                    Ok(())
                }),
        );

        table.insert(
            "options",
            AttrConfig::new().getter(|node| {
                let id = node.node_id()?;
                Ok(HostValue::nodes(
                    node.with_host(|h| h.elements_by_tag_name(id, "option"))??,
                ))
            }),
        );

        table.insert(
            "children",
            AttrConfig::new().getter(|node| {
                let id = node.node_id()?;
                Ok(HostValue::nodes(node.with_host(|h| h.children(id))??))
            }),
        );

        table.insert(
            "value",
            AttrConfig::new()
                .getter(|node| {
                    let id = node.node_id()?;
                    Ok(Value::from(node.with_host(|h| h.value(id))??).into())
                })
                .setter(|node, value| {
                    let id = node.node_id()?;
                    node.with_host_mut(|h| h.set_value(id, &value_to_string(&value)))??;
                    Ok(())
                }),
        );

        table.insert(
            "type",
            AttrConfig::new().getter(type_getter).setter(type_setter),
        );

        table.insert(
            "offsetWidth",
            AttrConfig::new()
                .getter(|node| default_getter(node, "offsetWidth"))
                .setter(|node, value| {
                    let id = node.node_id()?;
                    let width = number(&value, "offsetWidth")?;
                    node.with_host_mut(|h| h.set_width(id, width))??;
                    Ok(())
                }),
        );

        table.insert(
            "offsetHeight",
            AttrConfig::new()
                .getter(|node| default_getter(node, "offsetHeight"))
                .setter(|node, value| {
                    let id = node.node_id()?;
                    let height = number(&value, "offsetHeight")?;
                    node.with_host_mut(|h| h.set_height(id, height))??;
                    Ok(())
                }),
        );

        table.insert("winWidth", AttrConfig::new().getter(|n| metric(n, |h| h.win_width())));
        table.insert("winHeight", AttrConfig::new().getter(|n| metric(n, |h| h.win_height())));
        table.insert("docWidth", AttrConfig::new().getter(|n| metric(n, |h| h.doc_width())));
        table.insert("docHeight", AttrConfig::new().getter(|n| metric(n, |h| h.doc_height())));
        table.insert("docScrollX", AttrConfig::new().getter(|n| metric(n, |h| h.doc_scroll_x())));
        table.insert("docScrollY", AttrConfig::new().getter(|n| metric(n, |h| h.doc_scroll_y())));

        table.insert(
            "scrollLeft",
            AttrConfig::new()
                .getter(|node| scroll_getter(node, true))
                .setter(|node, value| scroll_setter(node, value, true)),
        );
        table.insert(
            "scrollTop",
            AttrConfig::new()
                .getter(|node| scroll_getter(node, false))
                .setter(|node, value| scroll_setter(node, value, false)),
        );

        table.insert(
            "region",
            AttrConfig::new().getter(|node| {
                let rect = match node.dom_node()? {
                    RawNode::Window => Some(node.with_host(|h| h.viewport_region())?),
                    RawNode::Node(id) => node.with_host(|h| {
                        let target = if h.node_type(id)? == NodeType::Document {
                            h.query("html", Some(id), true)?.first().copied().unwrap_or(id)
                        } else {
                            id
                        };
                        h.region(target)
                    })??,
                };
                region_value(rect)
            }),
        );

        table.insert(
            "viewportRegion",
            AttrConfig::new().getter(|node| region_value(Some(node.with_host(|h| h.viewport_region())?))),
        );

        table
    }

    pub fn insert(&mut self, name: &str, config: AttrConfig) {
        self.entries.insert(name.to_string(), config);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn getter(&self, name: &str) -> Option<Getter> {
        self.entries.get(name).and_then(|c| c.getter.clone())
    }

    pub fn setter(&self, name: &str) -> Option<Setter> {
        self.entries.get(name).and_then(|c| c.setter.clone())
    }
}

/// `role` or `aria-*`
pub fn is_aria(name: &str) -> bool {
    name == "role" || name.starts_with("aria-")
}

/// Property passthrough; dotted names walk into nested values
pub fn default_getter(node: &Node, name: &str) -> Result<HostValue> {
    let raw = node.dom_node()?;
    let mut segments = name.split('.');
    let first = segments.next().unwrap_or(name);
    let mut current = node.with_host(|h| h.property(raw, first))??;

    for segment in segments {
        current = match current {
            HostValue::Node(raw) => node.with_host(|h| h.property(raw, segment))??,
            HostValue::Nodes(raws) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| raws.get(i).copied())
                .map(HostValue::Node)
                .unwrap_or(HostValue::Undefined),
            HostValue::Value(value) => match child_value(&value, segment) {
                Some(Value::Null) => HostValue::Null,
                Some(v) => HostValue::Value(v.clone()),
                None => HostValue::Undefined,
            },
            HostValue::Undefined | HostValue::Null => return Ok(HostValue::Undefined),
        };
    }
    Ok(current)
}

/// Property passthrough; only assigns properties that are already defined.
/// Returns the value it was given.
pub fn default_setter(node: &Node, name: &str, value: Value) -> Result<Value> {
    let raw = node.dom_node()?;
    let segments: Vec<&str> = name.split('.').collect();

    if segments.len() == 1 {
        let defined = !matches!(node.with_host(|h| h.property(raw, name))??, HostValue::Undefined);
        if defined {
            node.with_host_mut(|h| h.set_property(raw, name, value.clone()))??;
        }
        return Ok(value);
    }

    // walk through node-valued properties as far as they go
    let mut target = raw;
    let mut index = 0;
    while index < segments.len() - 1 {
        match node.with_host(|h| h.property(target, segments[index]))?? {
            HostValue::Node(next) => {
                target = next;
                index += 1;
            }
            HostValue::Value(_) => break,
            _ => return Ok(value),
        }
    }

    if index == segments.len() - 1 {
        let last = segments[index];
        let defined = !matches!(node.with_host(|h| h.property(target, last))??, HostValue::Undefined);
        if defined {
            node.with_host_mut(|h| h.set_property(target, last, value.clone()))??;
        }
        return Ok(value);
    }

    // the rest of the path lives inside a plain value
    let head = segments[index];
    let HostValue::Value(mut object) = node.with_host(|h| h.property(target, head))?? else {
        return Ok(value);
    };
    if set_nested(&mut object, &segments[index + 1..], value.clone()) {
        node.with_host_mut(|h| h.set_property(target, head, object))??;
    }
    Ok(value)
}

fn child_value<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_value_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Assign at `path` when every step up to it exists
fn set_nested(root: &mut Value, path: &[&str], value: Value) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let mut current = root;
    for segment in parents {
        match child_value_mut(current, segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => match last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        },
        _ => false,
    }
}

fn number(value: &Value, name: &str) -> Result<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(dom::utils::parse_px))
        .ok_or_else(|| {
            NodeError::Dom(DomError::InvalidValue {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
}

fn metric(node: &Node, f: impl FnOnce(&dyn crate::host::DomHost) -> f64) -> Result<HostValue> {
    Ok(Value::from(node.with_host(f)?).into())
}

fn region_value(rect: Option<dom::DomRect>) -> Result<HostValue> {
    match rect {
        Some(rect) => {
            let value = serde_json::to_value(Region::from(rect))
                .map_err(|e| NodeError::Dom(DomError::InvalidValue {
                    name: "region".to_string(),
                    value: e.to_string(),
                }))?;
            Ok(value.into())
        }
        None => Ok(HostValue::Null),
    }
}

/// Elements scroll themselves; the document and window scroll the viewport
fn scrolls_viewport(node: &Node) -> Result<bool> {
    match node.dom_node()? {
        RawNode::Window => Ok(true),
        RawNode::Node(id) => Ok(node.with_host(|h| h.node_type(id))?? == NodeType::Document),
    }
}

fn scroll_getter(node: &Node, horizontal: bool) -> Result<HostValue> {
    if scrolls_viewport(node)? {
        return metric(node, |h| if horizontal { h.doc_scroll_x() } else { h.doc_scroll_y() });
    }
    default_getter(node, if horizontal { "scrollLeft" } else { "scrollTop" })
}

fn scroll_setter(node: &Node, value: Value, horizontal: bool) -> Result<()> {
    let name = if horizontal { "scrollLeft" } else { "scrollTop" };
    let amount = number(&value, name)?;
    if scrolls_viewport(node)? {
        node.with_host_mut(|h| {
            let (x, y) = (h.doc_scroll_x(), h.doc_scroll_y());
            if horizontal {
                h.scroll_to(amount, y)
            } else {
                h.scroll_to(x, amount)
            }
        })?;
        return Ok(());
    }
    let raw = node.dom_node()?;
    node.with_host_mut(|h| h.set_property(raw, name, Value::from(amount)))??;
    Ok(())
}

fn type_getter(node: &Node) -> Result<HostValue> {
    if let Some(tracked) = node.input_type() {
        return Ok(Value::from(tracked).into());
    }
    default_getter(node, "type")
}

/// Some platforms refuse `type` changes on inserted inputs; `hidden` is then
/// approximated by hiding the control and remembering the logical type.
fn type_setter(node: &Node, value: Value) -> Result<()> {
    let raw = node.dom_node()?;
    let requested = value_to_string(&value);
    let result = node.with_host_mut(|h| h.set_property(raw, "type", value))?;
    match result {
        Ok(()) => Ok(()),
        Err(e) if requested == "hidden" => {
            tracing::debug!("[Node] type change refused ({}), hiding {} instead", e, node);
            node.set_style("display", "none")?;
            node.set_input_type(Some(requested));
            Ok(())
        }
        Err(e) => {
            tracing::debug!("[Node] type change to {:?} refused: {}", requested, e);
            Ok(())
        }
    }
}
