//! Node wrapper layer
//!
//! Uniform wrappers over raw DOM nodes (`Node`) and node collections
//! (`NodeList`), with one canonical wrapper per node.
//!
//! ```text
//! Context ──owns──→ DomHost (the document)
//!    │      ──owns──→ Registry (uid → Node)
//!    │      ──owns──→ AttrTable, EventHub
//!    ↓
//! Node / NodeList ──weak──→ Context
//! ```
//!
//! Every delegated operation takes the same path: unwrap wrapper arguments,
//! run the `DomHost` primitive, scrub the result (raw nodes become wrappers,
//! node lists become `NodeList`s, an empty result becomes the wrapper itself).

pub mod attrs;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod host;
pub mod list;
pub mod method;
pub mod node;
pub mod plugin;
mod registry;
mod screen;
pub mod value;

pub use attrs::{AttrConfig, AttrTable};
pub use config::NodeConfig;
pub use context::{Context, ListSource, Wrap};
pub use error::{NodeError, Result};
pub use events::{EventFacade, Phase, Subscription, DOM_EVENTS};
pub use host::{DomHost, HostValue, RawNode};
pub use list::{Batch, NodeList};
pub use method::{Arg, DomMethod};
pub use node::{Filter, Node, NodeContent, Where};
pub use plugin::Plugin;
pub use value::Scrubbed;
