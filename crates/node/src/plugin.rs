//! Plugin host - named extensions attached to a wrapper
//!
//! A wrapper owns a `PluginHost` (composition, no mixins). Plugins are
//! addressed by namespace; plugging a namespace that is already taken
//! replaces the previous plugin.

use crate::error::Result;
use crate::list::NodeList;
use crate::node::Node;
use std::any::Any;
use std::cell::RefCell;

/// Extension attached to one wrapper
pub trait Plugin {
    /// Namespace the plugin is reachable under
    fn namespace(&self) -> &str;

    /// Called once when the plugin is plugged into `host`
    fn initialize(&mut self, host: &Node) -> Result<()> {
        let _ = host;
        Ok(())
    }

    /// Called when the plugin is unplugged or the host is destroyed
    fn destroy(&mut self, host: &Node) {
        let _ = host;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Plugins of one wrapper, in plug order
#[derive(Default)]
pub(crate) struct PluginHost {
    plugins: RefCell<Vec<Box<dyn Plugin>>>,
}

impl PluginHost {
    fn insert(&self, plugin: Box<dyn Plugin>) {
        self.plugins.borrow_mut().push(plugin);
    }

    fn take(&self, namespace: &str) -> Option<Box<dyn Plugin>> {
        let mut plugins = self.plugins.borrow_mut();
        let pos = plugins.iter().position(|p| p.namespace() == namespace)?;
        Some(plugins.remove(pos))
    }

    fn take_all(&self) -> Vec<Box<dyn Plugin>> {
        std::mem::take(&mut *self.plugins.borrow_mut())
    }

    fn contains(&self, namespace: &str) -> bool {
        self.plugins.borrow().iter().any(|p| p.namespace() == namespace)
    }

    fn namespaces(&self) -> Vec<String> {
        self.plugins.borrow().iter().map(|p| p.namespace().to_string()).collect()
    }
}

impl Node {
    /// Attach a plugin; replaces any plugin under the same namespace
    pub fn plug(&self, mut plugin: Box<dyn Plugin>) -> Result<&Self> {
        self.dom_node()?;
        let namespace = plugin.namespace().to_string();
        if let Some(mut previous) = self.plugins().take(&namespace) {
            previous.destroy(self);
        }
        plugin.initialize(self)?;
        self.plugins().insert(plugin);
        tracing::debug!("[Plugin] plugged {} into {}", namespace, self);
        Ok(self)
    }

    /// Detach one plugin, or every plugin when `namespace` is None
    pub fn unplug(&self, namespace: Option<&str>) -> &Self {
        let removed = match namespace {
            Some(ns) => self.plugins().take(ns).into_iter().collect(),
            None => self.plugins().take_all(),
        };
        for mut plugin in removed {
            tracing::debug!("[Plugin] unplugged {} from {}", plugin.namespace(), self);
            plugin.destroy(self);
        }
        self
    }

    pub fn has_plugin(&self, namespace: &str) -> bool {
        self.plugins().contains(namespace)
    }

    /// Namespaces currently plugged, in plug order
    pub fn plugins_plugged(&self) -> Vec<String> {
        self.plugins().namespaces()
    }

    /// Run `f` against the plugin under `namespace` when it is a `P`.
    /// Returns None when no such plugin is plugged, or when the plugin is
    /// already in use further up the stack.
    pub fn with_plugin<P: Plugin + 'static, R>(&self, namespace: &str, f: impl FnOnce(&mut P) -> R) -> Option<R> {
        let mut plugins = self.plugins().plugins.try_borrow_mut().ok()?;
        let plugin = plugins.iter_mut().find(|p| p.namespace() == namespace)?;
        plugin.as_any_mut().downcast_mut::<P>().map(f)
    }
}

impl NodeList {
    /// Plug a fresh plugin into every node
    pub fn plug<F>(&self, make: F) -> Result<&Self>
    where
        F: Fn() -> Box<dyn Plugin>,
    {
        self.each(|node, _, _| {
            node.plug(make())?;
            Ok(())
        })?;
        Ok(self)
    }

    pub fn unplug(&self, namespace: Option<&str>) -> Result<&Self> {
        self.each(|node, _, _| {
            node.unplug(namespace);
            Ok(())
        })?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;
    use dom::Document;
    use std::rc::Rc;
    use std::cell::Cell;

    struct Counter {
        hits: usize,
        destroyed: Rc<Cell<bool>>,
    }

    impl Plugin for Counter {
        fn namespace(&self) -> &str {
            "counter"
        }

        fn destroy(&mut self, _host: &Node) {
            self.destroyed.set(true);
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_plug_and_unplug() {
        let ctx = Context::new(Document::from_html(r#"<div id="a"></div>"#).unwrap());
        let node = ctx.one("#a").unwrap();
        let destroyed = Rc::new(Cell::new(false));

        node.plug(Box::new(Counter { hits: 0, destroyed: destroyed.clone() })).unwrap();
        assert!(node.has_plugin("counter"));

        let hits = node.with_plugin("counter", |c: &mut Counter| {
            c.hits += 1;
            c.hits
        });
        assert_eq!(hits, Some(1));

        node.unplug(Some("counter"));
        assert!(!node.has_plugin("counter"));
        assert!(destroyed.get());
        assert_eq!(node.with_plugin("counter", |c: &mut Counter| c.hits), None);
    }

    #[test]
    fn test_replug_replaces_previous() {
        let ctx = Context::new(Document::from_html(r#"<div id="a"></div>"#).unwrap());
        let node = ctx.one("#a").unwrap();
        let first = Rc::new(Cell::new(false));

        node.plug(Box::new(Counter { hits: 5, destroyed: first.clone() })).unwrap();
        node.plug(Box::new(Counter { hits: 0, destroyed: Rc::new(Cell::new(false)) })).unwrap();

        assert!(first.get());
        assert_eq!(node.plugins_plugged(), vec!["counter".to_string()]);
        assert_eq!(node.with_plugin("counter", |c: &mut Counter| c.hits), Some(0));
    }
}
