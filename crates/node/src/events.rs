//! Event subscription and dispatch
//!
//! DOM event names (`DOM_EVENTS`) are routed to the context's hub, keyed by
//! raw node, and reach listeners through `simulate` with bubbling. Any other
//! name is a custom event on the wrapper's own target and is only reached
//! through `fire`.

use crate::error::Result;
use crate::host::RawNode;
use crate::node::Node;
use ahash::AHashMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// Event names delivered by the platform
pub const DOM_EVENTS: &[&str] = &[
    "abort",
    "beforeunload",
    "blur",
    "change",
    "click",
    "close",
    "command",
    "contextmenu",
    "dblclick",
    "DOMMouseScroll",
    "drag",
    "dragstart",
    "dragenter",
    "dragover",
    "dragleave",
    "dragend",
    "drop",
    "error",
    "focus",
    "key",
    "keydown",
    "keypress",
    "keyup",
    "load",
    "message",
    "mousedown",
    "mouseenter",
    "mouseleave",
    "mousemove",
    "mousemultiwheel",
    "mouseout",
    "mouseover",
    "mouseup",
    "mousewheel",
    "orientationchange",
    "reset",
    "resize",
    "select",
    "selectstart",
    "submit",
    "scroll",
    "textInput",
    "unload",
];

pub fn is_dom_event(kind: &str) -> bool {
    DOM_EVENTS.contains(&kind)
}

/// Listener callback
pub type EventCallback = Rc<dyn Fn(&EventFacade)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    On,
    After,
}

/// Event object handed to listeners
pub struct EventFacade {
    kind: String,
    target: Node,
    current_target: RefCell<Node>,
    stopped: Cell<bool>,
    prevented: Cell<bool>,
}

impl EventFacade {
    pub(crate) fn new(kind: &str, target: Node) -> Self {
        Self {
            kind: kind.to_string(),
            current_target: RefCell::new(target.clone()),
            target,
            stopped: Cell::new(false),
            prevented: Cell::new(false),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Node the event was dispatched to
    pub fn target(&self) -> &Node {
        &self.target
    }

    /// Node whose listener is running (the matched node for delegates)
    pub fn current_target(&self) -> Node {
        self.current_target.borrow().clone()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn prevent_default(&self) {
        self.prevented.set(true);
    }

    /// Stop propagation and prevent the default action
    pub fn halt(&self) {
        self.stop_propagation();
        self.prevent_default();
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }

    pub fn is_default_prevented(&self) -> bool {
        self.prevented.get()
    }

    fn set_current(&self, node: Node) {
        *self.current_target.borrow_mut() = node;
    }
}

#[derive(Clone)]
pub(crate) struct Listener {
    id: u64,
    phase: Phase,
    once: bool,
    pub(crate) selector: Option<String>,
    pub(crate) callback: EventCallback,
}

/// Listener table for one target, keyed by event name
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: Cell<u64>,
    by_kind: RefCell<AHashMap<String, Vec<Listener>>>,
}

impl Listeners {
    pub(crate) fn add(&self, kind: &str, phase: Phase, once: bool, selector: Option<String>, callback: EventCallback) -> u64 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.by_kind
            .borrow_mut()
            .entry(kind.to_string())
            .or_default()
            .push(Listener {
                id,
                phase,
                once,
                selector,
                callback,
            });
        id
    }

    pub(crate) fn remove(&self, id: u64) -> bool {
        let mut by_kind = self.by_kind.borrow_mut();
        for listeners in by_kind.values_mut() {
            if let Some(pos) = listeners.iter().position(|l| l.id == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    /// Drop listeners of one kind, or all of them
    pub(crate) fn clear(&self, kind: Option<&str>) -> usize {
        let mut by_kind = self.by_kind.borrow_mut();
        match kind {
            Some(kind) => by_kind.remove(kind).map(|l| l.len()).unwrap_or(0),
            None => {
                let count = by_kind.values().map(Vec::len).sum();
                by_kind.clear();
                count
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.by_kind.borrow().values().all(Vec::is_empty)
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.by_kind.borrow().get(kind).map(Vec::len).unwrap_or(0)
    }

    /// Copy of the listeners to run; `once` listeners are removed here
    pub(crate) fn take_phase(&self, kind: &str, phase: Phase) -> Vec<Listener> {
        let mut by_kind = self.by_kind.borrow_mut();
        let Some(listeners) = by_kind.get_mut(kind) else {
            return Vec::new();
        };
        let selected: Vec<Listener> = listeners.iter().filter(|l| l.phase == phase).cloned().collect();
        listeners.retain(|l| !(l.phase == phase && l.once));
        selected
    }
}

/// DOM listener tables, keyed by raw node
#[derive(Default)]
pub(crate) struct EventHub {
    targets: RefCell<AHashMap<RawNode, Rc<Listeners>>>,
}

impl EventHub {
    pub(crate) fn target(&self, raw: RawNode) -> Rc<Listeners> {
        self.targets.borrow_mut().entry(raw).or_default().clone()
    }

    pub(crate) fn existing(&self, raw: RawNode) -> Option<Rc<Listeners>> {
        self.targets.borrow().get(&raw).cloned()
    }

    /// Drop listeners of the node; the table entry goes once none remain
    pub(crate) fn purge(&self, raw: RawNode, kind: Option<&str>) -> usize {
        let mut targets = self.targets.borrow_mut();
        let Some(listeners) = targets.get(&raw) else {
            return 0;
        };
        let removed = listeners.clear(kind);
        if listeners.is_empty() {
            targets.remove(&raw);
        }
        removed
    }

    pub(crate) fn len(&self) -> usize {
        self.targets.borrow().len()
    }
}

/// Handle returned by subscriptions; `detach` removes exactly the listeners
/// it created. Dropping the handle leaves them attached.
#[derive(Clone, Default)]
pub struct Subscription {
    handles: Vec<(Weak<Listeners>, u64)>,
}

impl Subscription {
    pub(crate) fn single(listeners: &Rc<Listeners>, id: u64) -> Self {
        Self {
            handles: vec![(Rc::downgrade(listeners), id)],
        }
    }

    pub(crate) fn merge(&mut self, other: Subscription) {
        self.handles.extend(other.handles);
    }

    /// Number of listeners this handle covers
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn detach(&self) {
        for (listeners, id) in &self.handles {
            if let Some(listeners) = listeners.upgrade() {
                listeners.remove(*id);
            }
        }
        tracing::trace!("[Events] detached {} listener(s)", self.handles.len());
    }
}

impl Node {
    fn listeners_for(&self, kind: &str) -> Result<Rc<Listeners>> {
        if is_dom_event(kind) {
            let raw = self.dom_node()?;
            Ok(self.context()?.inner.hub.target(raw))
        } else {
            Ok(self.events())
        }
    }

    fn subscribe(&self, kind: &str, phase: Phase, once: bool, selector: Option<String>, callback: EventCallback) -> Result<Subscription> {
        let listeners = self.listeners_for(kind)?;
        let id = listeners.add(kind, phase, once, selector, callback);
        tracing::trace!("[Events] {} listening for {} ({:?})", self, kind, phase);
        Ok(Subscription::single(&listeners, id))
    }

    pub fn on(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe(kind, Phase::On, false, None, Rc::new(f))
    }

    /// Listener removed after its first call
    pub fn once(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe(kind, Phase::On, true, None, Rc::new(f))
    }

    /// Listener run after all `on` listeners, unless the default was prevented
    pub fn after(&self, kind: &str, f: impl Fn(&EventFacade) + 'static) -> Result<Subscription> {
        self.subscribe(kind, Phase::After, false, None, Rc::new(f))
    }

    /// Listener on this container for events whose target (or an ancestor
    /// of it inside the container) matches `selector`
    pub fn delegate(&self, kind: &str, f: impl Fn(&EventFacade) + 'static, selector: &str) -> Result<Subscription> {
        let raw = self.dom_node()?;
        let listeners = self.context()?.inner.hub.target(raw);
        let id = listeners.add(kind, Phase::On, false, Some(selector.to_string()), Rc::new(f));
        tracing::trace!("[Events] {} delegating {} to {:?}", self, kind, selector);
        Ok(Subscription::single(&listeners, id))
    }

    /// Remove every listener of this kind from the node
    pub fn detach(&self, kind: &str) -> Result<&Self> {
        let removed = self.listeners_for(kind)?.clear(Some(kind));
        tracing::trace!("[Events] {} detached {} {} listener(s)", self, removed, kind);
        Ok(self)
    }

    /// Remove every listener from the node
    pub fn detach_all(&self) -> Result<&Self> {
        self.events().clear(None);
        self.purge(false, None)
    }

    /// Remove DOM listeners from the node, and from its subtree when `recurse`
    pub fn purge(&self, recurse: bool, kind: Option<&str>) -> Result<&Self> {
        let ctx = self.context()?;
        let raw = self.dom_node()?;
        let mut removed = ctx.inner.hub.purge(raw, kind);
        if recurse {
            if let RawNode::Node(id) = raw {
                for child in ctx.host(|h| h.query("*", Some(id), false))? {
                    removed += ctx.inner.hub.purge(RawNode::Node(child), kind);
                }
            }
        }
        tracing::trace!("[Events] purged {} listener(s) from {}", removed, self);
        Ok(self)
    }

    /// Fire a custom event on this node's own target; returns false when a
    /// listener prevented the default
    pub fn fire(&self, kind: &str) -> Result<bool> {
        let facade = EventFacade::new(kind, self.clone());
        let events = self.events();
        for listener in events.take_phase(kind, Phase::On) {
            (listener.callback)(&facade);
            if facade.is_propagation_stopped() {
                break;
            }
        }
        if facade.is_default_prevented() {
            return Ok(false);
        }
        for listener in events.take_phase(kind, Phase::After) {
            (listener.callback)(&facade);
        }
        Ok(true)
    }

    /// Dispatch a DOM event at this node: `on` listeners along the node, its
    /// ancestors, the document and the window, then `after` listeners along
    /// the same path unless the default was prevented. The host's default
    /// action runs last. Returns false when the default was prevented.
    pub fn simulate(&self, kind: &str) -> Result<bool> {
        let ctx = self.context()?;
        let target = self.dom_node()?;

        let mut path = vec![target];
        if let RawNode::Node(id) = target {
            let mut current = id;
            while let Some(parent) = ctx.host(|h| h.parent(current))? {
                path.push(RawNode::Node(parent));
                current = parent;
            }
            if current == ctx.host(|h| h.document_node()) {
                path.push(RawNode::Window);
            }
        }

        let facade = EventFacade::new(kind, self.clone());
        let mut reached = 0;
        for &raw in &path {
            reached += 1;
            self.notify(&ctx, raw, target, kind, Phase::On, &facade)?;
            if facade.is_propagation_stopped() {
                break;
            }
        }

        if facade.is_default_prevented() {
            tracing::trace!("[Events] {} default prevented on {}", kind, self);
            return Ok(false);
        }

        for &raw in &path[..reached] {
            self.notify(&ctx, raw, target, kind, Phase::After, &facade)?;
        }

        if let RawNode::Node(id) = target {
            let outcome = ctx.host_mut(|h| match kind {
                "submit" => h.submit(id),
                "reset" => h.reset(id),
                "focus" => h.focus(id),
                "blur" => h.blur(id),
                "select" => h.select(id),
                _ => Ok(()),
            });
            if let Err(e) = outcome {
                tracing::debug!("[Events] default action for {} on {} failed: {}", kind, self, e);
            }
        }
        Ok(true)
    }

    fn notify(&self, ctx: &crate::Context, at: RawNode, target: RawNode, kind: &str, phase: Phase, facade: &EventFacade) -> Result<()> {
        let Some(listeners) = ctx.inner.hub.existing(at) else {
            return Ok(());
        };
        for listener in listeners.take_phase(kind, phase) {
            let current = match &listener.selector {
                Some(selector) => match delegate_match(ctx, at, target, selector)? {
                    Some(matched) => matched,
                    None => continue,
                },
                None => at,
            };
            if let Some(node) = ctx.one(current) {
                facade.set_current(node);
            }
            (listener.callback)(facade);
        }
        Ok(())
    }
}

/// Nearest node from `target` up to (not including) `container` that
/// matches the delegate selector
fn delegate_match(ctx: &crate::Context, container: RawNode, target: RawNode, selector: &str) -> Result<Option<RawNode>> {
    let (RawNode::Node(container), RawNode::Node(mut current)) = (container, target) else {
        return Ok(None);
    };
    if !ctx.host(|h| h.contains(container, current)) {
        return Ok(None);
    }
    while current != container {
        let is_element = ctx.host(|h| h.node_type(current))? == dom::NodeType::Element;
        if is_element && ctx.host(|h| h.test(current, selector))? {
            return Ok(Some(RawNode::Node(current)));
        }
        match ctx.host(|h| h.parent(current))? {
            Some(parent) => current = parent,
            None => break,
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listeners_once_and_remove() {
        let listeners = Rc::new(Listeners::default());
        let noop: EventCallback = Rc::new(|_| {});
        let a = listeners.add("x", Phase::On, true, None, noop.clone());
        listeners.add("x", Phase::After, false, None, noop.clone());
        let c = listeners.add("x", Phase::On, false, None, noop);

        assert_eq!(listeners.take_phase("x", Phase::On).len(), 2);
        // the once listener is gone after one dispatch
        assert_eq!(listeners.take_phase("x", Phase::On).len(), 1);
        assert!(!listeners.remove(a));
        assert!(listeners.remove(c));
        assert_eq!(listeners.count("x"), 1);
        assert_eq!(listeners.clear(None), 1);
    }

    #[test]
    fn test_subscription_detach_survives_dropped_target() {
        let listeners = Rc::new(Listeners::default());
        let id = listeners.add("x", Phase::On, false, None, Rc::new(|_| {}));
        let sub = Subscription::single(&listeners, id);
        drop(listeners);
        sub.detach();
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn test_hub_entries_released_on_purge_and_destroy() {
        let ctx = crate::Context::new(
            dom::Document::from_html(r#"<div id="a"><p id="p"></p></div>"#).unwrap(),
        );
        let a = ctx.one("#a").unwrap();
        let p = ctx.one("#p").unwrap();
        a.on("click", |_| {}).unwrap();
        a.on("keydown", |_| {}).unwrap();
        p.on("click", |_| {}).unwrap();
        assert_eq!(ctx.inner.hub.len(), 2);

        a.purge(false, Some("click")).unwrap();
        assert_eq!(ctx.inner.hub.len(), 2);
        a.purge(false, Some("keydown")).unwrap();
        assert_eq!(ctx.inner.hub.len(), 1);

        p.destroy(false).unwrap();
        assert_eq!(ctx.inner.hub.len(), 0);
    }

    #[test]
    fn test_dom_event_names() {
        assert!(is_dom_event("click"));
        assert!(is_dom_event("DOMMouseScroll"));
        assert!(!is_dom_event("custom:change"));
    }
}
