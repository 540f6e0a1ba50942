//! Error types for the wrapper layer
//!
//! "Not found" is never an error here: lookups return `Option` or an empty
//! list. Errors are host failures or misuse of a wrapper.

use dom::DomError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeError>;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Dom(#[from] DomError),

    #[error("{0}: not bound to a node")]
    Destroyed(String),

    #[error("Owning context has been dropped")]
    ContextDropped,

    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Invalid argument {index} for {method}: {reason}")]
    InvalidArgument {
        method: &'static str,
        index: usize,
        reason: String,
    },
}

impl NodeError {
    /// True for errors the platform raises to refuse an action
    pub fn is_restricted(&self) -> bool {
        matches!(self, NodeError::Dom(DomError::Restricted(_)))
    }
}
