//! Scrubbed results - what wrapper operations hand back to callers

use crate::list::NodeList;
use crate::node::Node;
use serde_json::Value;
use std::fmt;

/// A host value after raw nodes were replaced by wrappers
#[derive(Clone, PartialEq)]
pub enum Scrubbed {
    /// Absent / undefined
    Empty,
    /// Explicit null, kept distinct from `Empty`
    Null,
    Node(Node),
    List(NodeList),
    Value(Value),
}

impl Scrubbed {
    pub fn is_empty(&self) -> bool {
        matches!(self, Scrubbed::Empty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scrubbed::Null)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Scrubbed::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Scrubbed::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&NodeList> {
        match self {
            Scrubbed::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<NodeList> {
        match self {
            Scrubbed::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Scrubbed::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }
}

impl From<Value> for Scrubbed {
    fn from(value: Value) -> Self {
        Scrubbed::Value(value)
    }
}

impl From<Node> for Scrubbed {
    fn from(node: Node) -> Self {
        Scrubbed::Node(node)
    }
}

impl From<NodeList> for Scrubbed {
    fn from(list: NodeList) -> Self {
        Scrubbed::List(list)
    }
}

impl fmt::Debug for Scrubbed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scrubbed::Empty => f.write_str("Empty"),
            Scrubbed::Null => f.write_str("Null"),
            Scrubbed::Node(node) => write!(f, "Node({})", node),
            Scrubbed::List(list) => write!(f, "List({})", list),
            Scrubbed::Value(value) => write!(f, "Value({})", value),
        }
    }
}
