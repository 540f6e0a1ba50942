//! In-memory HTML document model
//!
//! The host side of the node wrapper layer: an arena-backed tree with the
//! property, attribute, style, query and geometry primitives a page script
//! would reach through the browser.
//!
//! ```text
//! markup → DomArena (owned) → Document (properties, styles, geometry)
//!                 ↓
//!          NodeId (u32 index)
//! ```

pub mod arena;
pub mod document;
pub mod error;
pub mod markup;
pub mod selector;
pub mod serializer;
pub mod types;
pub mod utils;

pub use arena::DomArena;
pub use document::{Content, Document, DocumentConfig, InsertAt, PropertyValue, Window};
pub use error::{DomError, Result};
pub use selector::SelectorList;
pub use serializer::{DomSerializer, SerializerConfig};
pub use types::*;
