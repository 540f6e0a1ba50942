//! Delegated host methods
//!
//! Every operation a wrapper forwards to the host is a `DomMethod`. A call
//! goes through one path: unwrap wrapper arguments (first two positions),
//! run the host primitive, scrub the result.

use crate::error::{NodeError, Result};
use crate::host::{DomHost, HostValue, RawNode};
use crate::list::NodeList;
use crate::node::Node;
use dom::{DomError, DomRect, NodeId, NodeType};
use serde_json::{json, Value};
use std::fmt;

/// Host operations available through `Node::call` / `Node::invoke`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomMethod {
    GetAttribute,
    SetAttribute,
    RemoveAttribute,
    HasAttribute,
    HasClass,
    AddClass,
    RemoveClass,
    ReplaceClass,
    ToggleClass,
    GetStyle,
    SetStyle,
    GetComputedStyle,
    Wrap,
    Unwrap,
    GenerateId,
    Contains,
    AppendChild,
    InsertBefore,
    RemoveChild,
    ReplaceChild,
    HasChildNodes,
    CloneNode,
    GetElementsByTagName,
    ScrollIntoView,
    Focus,
    Blur,
    Submit,
    Reset,
    Select,
    GetXY,
    SetXY,
    SwapXY,
    InViewportRegion,
}

impl DomMethod {
    pub const ALL: &'static [DomMethod] = &[
        DomMethod::GetAttribute,
        DomMethod::SetAttribute,
        DomMethod::RemoveAttribute,
        DomMethod::HasAttribute,
        DomMethod::HasClass,
        DomMethod::AddClass,
        DomMethod::RemoveClass,
        DomMethod::ReplaceClass,
        DomMethod::ToggleClass,
        DomMethod::GetStyle,
        DomMethod::SetStyle,
        DomMethod::GetComputedStyle,
        DomMethod::Wrap,
        DomMethod::Unwrap,
        DomMethod::GenerateId,
        DomMethod::Contains,
        DomMethod::AppendChild,
        DomMethod::InsertBefore,
        DomMethod::RemoveChild,
        DomMethod::ReplaceChild,
        DomMethod::HasChildNodes,
        DomMethod::CloneNode,
        DomMethod::GetElementsByTagName,
        DomMethod::ScrollIntoView,
        DomMethod::Focus,
        DomMethod::Blur,
        DomMethod::Submit,
        DomMethod::Reset,
        DomMethod::Select,
        DomMethod::GetXY,
        DomMethod::SetXY,
        DomMethod::SwapXY,
        DomMethod::InViewportRegion,
    ];

    /// Script-facing method name
    pub fn name(self) -> &'static str {
        match self {
            DomMethod::GetAttribute => "getAttribute",
            DomMethod::SetAttribute => "setAttribute",
            DomMethod::RemoveAttribute => "removeAttribute",
            DomMethod::HasAttribute => "hasAttribute",
            DomMethod::HasClass => "hasClass",
            DomMethod::AddClass => "addClass",
            DomMethod::RemoveClass => "removeClass",
            DomMethod::ReplaceClass => "replaceClass",
            DomMethod::ToggleClass => "toggleClass",
            DomMethod::GetStyle => "getStyle",
            DomMethod::SetStyle => "setStyle",
            DomMethod::GetComputedStyle => "getComputedStyle",
            DomMethod::Wrap => "wrap",
            DomMethod::Unwrap => "unwrap",
            DomMethod::GenerateId => "generateID",
            DomMethod::Contains => "contains",
            DomMethod::AppendChild => "appendChild",
            DomMethod::InsertBefore => "insertBefore",
            DomMethod::RemoveChild => "removeChild",
            DomMethod::ReplaceChild => "replaceChild",
            DomMethod::HasChildNodes => "hasChildNodes",
            DomMethod::CloneNode => "cloneNode",
            DomMethod::GetElementsByTagName => "getElementsByTagName",
            DomMethod::ScrollIntoView => "scrollIntoView",
            DomMethod::Focus => "focus",
            DomMethod::Blur => "blur",
            DomMethod::Submit => "submit",
            DomMethod::Reset => "reset",
            DomMethod::Select => "select",
            DomMethod::GetXY => "getXY",
            DomMethod::SetXY => "setXY",
            DomMethod::SwapXY => "swapXY",
            DomMethod::InViewportRegion => "inViewportRegion",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Whether a node of this kind exposes the method
    pub fn supported_by(self, node_type: NodeType, node_name: &str) -> bool {
        match self {
            DomMethod::Submit | DomMethod::Reset => node_name.eq_ignore_ascii_case("FORM"),
            DomMethod::Select => {
                node_name.eq_ignore_ascii_case("INPUT") || node_name.eq_ignore_ascii_case("TEXTAREA")
            }
            DomMethod::AppendChild
            | DomMethod::InsertBefore
            | DomMethod::RemoveChild
            | DomMethod::ReplaceChild
            | DomMethod::HasChildNodes
            | DomMethod::CloneNode
            | DomMethod::Contains => true,
            DomMethod::GetElementsByTagName => matches!(
                node_type,
                NodeType::Element | NodeType::Document | NodeType::DocumentFragment
            ),
            _ => node_type == NodeType::Element,
        }
    }
}

impl fmt::Display for DomMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Argument to a delegated method
#[derive(Clone)]
pub enum Arg {
    Node(Node),
    Raw(RawNode),
    Value(Value),
}

impl From<Node> for Arg {
    fn from(node: Node) -> Self {
        Arg::Node(node)
    }
}

impl From<&Node> for Arg {
    fn from(node: &Node) -> Self {
        Arg::Node(node.clone())
    }
}

impl From<RawNode> for Arg {
    fn from(raw: RawNode) -> Self {
        Arg::Raw(raw)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(Value::from(value))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(Value::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Value(Value::from(value))
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Value(Value::from(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Value(Value::from(value))
    }
}

/// Argument after unwrapping
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum HostArg {
    Node(RawNode),
    Value(Value),
}

/// Wrappers are unwrapped in the first two positions only
pub(crate) fn unwrap_args(method: DomMethod, args: &[Arg]) -> Result<Vec<HostArg>> {
    args.iter()
        .enumerate()
        .map(|(index, arg)| match arg {
            Arg::Node(node) if index < 2 => Ok(HostArg::Node(node.dom_node()?)),
            Arg::Node(_) => Err(invalid(method, index, "wrapper arguments are only accepted in the first two positions")),
            Arg::Raw(raw) => Ok(HostArg::Node(*raw)),
            Arg::Value(value) => Ok(HostArg::Value(value.clone())),
        })
        .collect()
}

fn invalid(method: DomMethod, index: usize, reason: &str) -> NodeError {
    NodeError::InvalidArgument {
        method: method.name(),
        index,
        reason: reason.to_string(),
    }
}

fn str_arg(method: DomMethod, args: &[HostArg], index: usize) -> Result<String> {
    match args.get(index) {
        Some(HostArg::Value(Value::String(s))) => Ok(s.clone()),
        Some(HostArg::Value(Value::Null)) | None => Err(invalid(method, index, "expected a string")),
        Some(HostArg::Value(other)) => Ok(other.to_string()),
        Some(HostArg::Node(_)) => Err(invalid(method, index, "expected a string, got a node")),
    }
}

fn node_arg(method: DomMethod, args: &[HostArg], index: usize) -> Result<NodeId> {
    match args.get(index) {
        Some(HostArg::Node(RawNode::Node(id))) => Ok(*id),
        _ => Err(invalid(method, index, "expected a node")),
    }
}

fn opt_node_arg(args: &[HostArg], index: usize) -> Option<NodeId> {
    match args.get(index) {
        Some(HostArg::Node(raw)) => raw.id(),
        _ => None,
    }
}

fn opt_bool_arg(args: &[HostArg], index: usize) -> Option<bool> {
    match args.get(index) {
        Some(HostArg::Value(value)) => Some(dom::document::truthy(value)),
        _ => None,
    }
}

fn xy_value(rect: Option<DomRect>) -> HostValue {
    match rect {
        Some(rect) => json!([rect.x, rect.y]).into(),
        None => HostValue::Null,
    }
}

/// Run one delegated method against the host
pub(crate) fn dispatch(host: &mut dyn DomHost, target: RawNode, method: DomMethod, args: &[HostArg]) -> Result<HostValue> {
    let id = target.id().ok_or_else(|| {
        NodeError::Dom(DomError::InvalidNodeType {
            expected: "node".to_string(),
            actual: "window".to_string(),
        })
    })?;
    let undefined = |_| HostValue::Undefined;

    let value = match method {
        DomMethod::GetAttribute => {
            let name = str_arg(method, args, 0)?;
            Value::from(host.get_attribute(id, &name)?.unwrap_or_default()).into()
        }
        DomMethod::SetAttribute => {
            let name = str_arg(method, args, 0)?;
            let value = str_arg(method, args, 1).unwrap_or_default();
            host.set_attribute(id, &name, &value).map(undefined)?
        }
        DomMethod::RemoveAttribute => host.remove_attribute(id, &str_arg(method, args, 0)?).map(undefined)?,
        DomMethod::HasAttribute => Value::from(host.has_attribute(id, &str_arg(method, args, 0)?)?).into(),
        DomMethod::HasClass => Value::from(host.has_class(id, &str_arg(method, args, 0)?)?).into(),
        DomMethod::AddClass => host.add_class(id, &str_arg(method, args, 0)?).map(undefined)?,
        DomMethod::RemoveClass => host.remove_class(id, &str_arg(method, args, 0)?).map(undefined)?,
        DomMethod::ReplaceClass => {
            let old = str_arg(method, args, 0)?;
            let new = str_arg(method, args, 1)?;
            host.replace_class(id, &old, &new).map(undefined)?
        }
        DomMethod::ToggleClass => {
            let class = str_arg(method, args, 0)?;
            host.toggle_class(id, &class, opt_bool_arg(args, 1)).map(|_| HostValue::Undefined)?
        }
        DomMethod::GetStyle => Value::from(host.style(id, &str_arg(method, args, 0)?)?).into(),
        DomMethod::SetStyle => {
            let property = str_arg(method, args, 0)?;
            let value = match args.get(1) {
                Some(HostArg::Value(Value::Null)) | None => String::new(),
                Some(HostArg::Value(Value::Number(n))) if !unitless(&property) => format!("{}px", n),
                _ => str_arg(method, args, 1)?,
            };
            host.set_style(id, &property, &value).map(undefined)?
        }
        DomMethod::GetComputedStyle => Value::from(host.computed_style(id, &str_arg(method, args, 0)?)?).into(),
        DomMethod::Wrap => host.wrap(id, &str_arg(method, args, 0)?).map(undefined)?,
        DomMethod::Unwrap => host.unwrap(id).map(undefined)?,
        DomMethod::GenerateId => Value::from(host.generate_id(id)?).into(),
        DomMethod::Contains => {
            let other = node_arg(method, args, 0)?;
            Value::from(host.contains(id, other)).into()
        }
        DomMethod::AppendChild => {
            let child = node_arg(method, args, 0)?;
            host.append_child(id, child)?;
            HostValue::Node(RawNode::Node(child))
        }
        DomMethod::InsertBefore => {
            let child = node_arg(method, args, 0)?;
            host.insert_before(id, child, opt_node_arg(args, 1))?;
            HostValue::Node(RawNode::Node(child))
        }
        DomMethod::RemoveChild => {
            let child = node_arg(method, args, 0)?;
            HostValue::Node(RawNode::Node(host.remove_child(id, child)?))
        }
        DomMethod::ReplaceChild => {
            let new = node_arg(method, args, 0)?;
            let old = node_arg(method, args, 1)?;
            HostValue::Node(RawNode::Node(host.replace_child(id, new, old)?))
        }
        DomMethod::HasChildNodes => Value::from(!host.child_nodes(id)?.is_empty()).into(),
        DomMethod::CloneNode => {
            let deep = opt_bool_arg(args, 0).unwrap_or(false);
            HostValue::Node(RawNode::Node(host.clone_node(id, deep)?))
        }
        DomMethod::GetElementsByTagName => {
            let tag = str_arg(method, args, 0)?;
            HostValue::nodes(host.elements_by_tag_name(id, &tag)?)
        }
        DomMethod::ScrollIntoView => host.scroll_into_view(id).map(undefined)?,
        DomMethod::Focus => host.focus(id).map(undefined)?,
        DomMethod::Blur => host.blur(id).map(undefined)?,
        DomMethod::Submit => host.submit(id).map(undefined)?,
        DomMethod::Reset => host.reset(id).map(undefined)?,
        DomMethod::Select => host.select(id).map(undefined)?,
        DomMethod::GetXY => xy_value(host.region(id)?),
        DomMethod::SetXY => {
            let (x, y) = match args.first() {
                Some(HostArg::Value(Value::Array(xy))) => (
                    xy.first().and_then(Value::as_f64),
                    xy.get(1).and_then(Value::as_f64),
                ),
                _ => return Err(invalid(method, 0, "expected [x, y]")),
            };
            host.set_xy(id, x, y).map(undefined)?
        }
        DomMethod::SwapXY => {
            let other = node_arg(method, args, 0)?;
            let (Some(mine), Some(theirs)) = (host.region(id)?, host.region(other)?) else {
                return Ok(HostValue::Undefined);
            };
            host.set_xy(id, Some(theirs.x), Some(theirs.y))?;
            host.set_xy(other, Some(mine.x), Some(mine.y))?;
            HostValue::Undefined
        }
        DomMethod::InViewportRegion => {
            let all = opt_bool_arg(args, 0).unwrap_or(false);
            let viewport = host.viewport_region();
            let inside = host
                .region(id)?
                .map(|rect| dom::utils::in_region(&rect, &viewport, all))
                .unwrap_or(false);
            Value::from(inside).into()
        }
    };
    Ok(value)
}

/// CSS properties that take bare numbers
fn unitless(property: &str) -> bool {
    matches!(
        dom::utils::css_name(property).as_str(),
        "opacity" | "z-index" | "zoom" | "font-weight" | "line-height"
    )
}

impl Node {
    /// Run a delegated method; an empty result yields this node
    pub fn call(&self, method: DomMethod, args: &[Arg]) -> Result<crate::Scrubbed> {
        let ctx = self.context()?;
        let target = self.dom_node()?;
        let args = unwrap_args(method, args)?;
        let result = ctx.host_mut(|host| dispatch(host, target, method, &args))?;
        Ok(match ctx.scrub(result) {
            crate::Scrubbed::Empty => crate::Scrubbed::Node(self.clone()),
            other => other,
        })
    }

    /// Run a delegated method by name
    pub fn invoke(&self, name: &str, args: &[Arg]) -> Result<crate::Scrubbed> {
        let method = DomMethod::from_name(name).ok_or_else(|| NodeError::UnknownMethod(name.to_string()))?;
        self.call(method, args)
    }

    /// Whether the wrapped node exposes a method of this name
    pub fn has_method(&self, name: &str) -> bool {
        let Some(method) = DomMethod::from_name(name) else {
            return false;
        };
        let Ok(id) = self.node_id() else {
            return false;
        };
        self.with_host(|h| {
            match (h.node_type(id), h.node_name(id)) {
                (Ok(node_type), Ok(node_name)) => method.supported_by(node_type, &node_name),
                _ => false,
            }
        })
        .unwrap_or(false)
    }
}

impl NodeList {
    /// Run a delegated method on every node
    pub fn call(&self, method: DomMethod, args: &[Arg]) -> Result<crate::list::Batch> {
        self.apply(|node| node.call(method, args))
    }

    /// Run a delegated method by name on every node
    pub fn invoke(&self, name: &str, args: &[Arg]) -> Result<crate::list::Batch> {
        let method = DomMethod::from_name(name).ok_or_else(|| NodeError::UnknownMethod(name.to_string()))?;
        self.call(method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_lookup() {
        for &method in DomMethod::ALL {
            assert_eq!(DomMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(DomMethod::from_name("explode"), None);
    }

    #[test]
    fn test_support_by_node_kind() {
        assert!(DomMethod::Submit.supported_by(NodeType::Element, "FORM"));
        assert!(!DomMethod::Submit.supported_by(NodeType::Element, "DIV"));
        assert!(DomMethod::Select.supported_by(NodeType::Element, "TEXTAREA"));
        assert!(!DomMethod::Focus.supported_by(NodeType::Text, "#text"));
        assert!(DomMethod::AppendChild.supported_by(NodeType::DocumentFragment, "#document-fragment"));
    }

    #[test]
    fn test_raw_arguments_pass_through_any_position() {
        let args = vec![
            Arg::from("a"),
            Arg::from("b"),
            Arg::Raw(RawNode::Window),
        ];
        assert_eq!(unwrap_args(DomMethod::SetAttribute, &args).unwrap().len(), 3);
    }
}
