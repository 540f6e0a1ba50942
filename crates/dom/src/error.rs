//! Failures raised by document primitives

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomError>;

#[derive(Debug, Error)]
pub enum DomError {
    #[error("Node not found: {0}")]
    NodeNotFound(u32),

    #[error("Invalid node type: expected {expected}, got {actual}")]
    InvalidNodeType { expected: String, actual: String },

    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: u32, child: u32 },

    #[error("Hierarchy request error: cannot insert {node} into {parent}")]
    HierarchyRequest { parent: u32, node: u32 },

    #[error("Selector syntax error in {selector:?}: {reason}")]
    SelectorSyntax { selector: String, reason: String },

    #[error("Property is read-only: {0}")]
    ReadOnly(String),

    #[error("Operation refused by the platform: {0}")]
    Restricted(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: String, value: String },
}
