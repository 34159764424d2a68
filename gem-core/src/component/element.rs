//! Element host.
//!
//! [`Element`] wraps a user [`Component`] and drives it through the custom
//! element lifecycle:
//!
//! 1. Construction subscribes the element to every injected store and fills
//!    reactive fields with their defaults.
//! 2. [`connected_callback`](Element::connected_callback) runs `will_mount`,
//!    the first render, then `mounted`.
//! 3. Store notifications, attribute changes and property writes call
//!    [`update`](Element::update), which consults `should_update` and then
//!    re-renders and runs `updated`.
//! 4. [`disconnected_callback`](Element::disconnected_callback) unsubscribes,
//!    runs `unmounted` and stops attribute callbacks.
//!
//! In [`RenderMode::Async`] steps 2 and 3 queue their render into a
//! [`RenderPool`] instead of running on the caller's stack. A queued render
//! always runs, even if the element is disconnected first; it then renders
//! into the detached root.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, MutexGuard};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::definition::{ElementDefinition, FieldBinding};
use super::lifecycle::Lifecycle;
use crate::error::{GemError, Result};
use crate::reactive::{merge_values, Store, SubscriberId};
use crate::scheduler::RenderPool;

/// Behaviour of a custom element.
///
/// Only `render` is required. Hooks receive `&mut self` and run with no
/// element locks held other than the component itself.
pub trait Component: Send + 'static {
    /// Produce the markup for the element's render root.
    fn render(&self, ctx: &RenderContext<'_>) -> String;

    fn will_mount(&mut self) {}

    fn mounted(&mut self) {}

    /// Return `false` to skip a re-render.
    fn should_update(&self) -> bool {
        true
    }

    fn updated(&mut self) {}

    fn unmounted(&mut self) {}

    fn attribute_changed(&mut self, _name: &str, _old: Option<&str>, _new: Option<&str>) {}
}

/// Read-only view of the element handed to [`Component::render`].
pub struct RenderContext<'a> {
    tag: &'a str,
    props: &'a Map<String, Value>,
    attributes: &'a IndexMap<String, String>,
    state: &'a Value,
}

impl<'a> RenderContext<'a> {
    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Current value of a reactive field.
    pub fn prop(&self, name: &str) -> Option<&'a Value> {
        self.props.get(name)
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Element-local state built with [`Element::set_state`].
    pub fn state(&self) -> &'a Value {
        self.state
    }
}

/// How an element schedules its renders.
#[derive(Debug, Clone, Default)]
pub enum RenderMode {
    /// Render on the calling stack.
    #[default]
    Sync,
    /// Queue renders into the pool.
    Async(RenderPool),
}

/// Construction options for an [`Element`].
#[derive(Debug, Clone, Default)]
pub struct ElementOptions {
    stores: Vec<Store>,
    mode: RenderMode,
}

impl ElementOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-render whenever `store` updates.
    pub fn observe(mut self, store: &Store) -> Self {
        self.stores.push(store.clone());
        self
    }

    /// Render through `pool`.
    pub fn asynchronous(mut self, pool: &RenderPool) -> Self {
        self.mode = RenderMode::Async(pool.clone());
        self
    }
}

/// Where rendered markup lands.
#[derive(Debug, Default)]
pub struct RenderRoot {
    html: Mutex<Option<String>>,
    renders: AtomicUsize,
}

impl RenderRoot {
    /// Last rendered markup, if any render happened.
    pub fn html(&self) -> Option<String> {
        self.html.lock().clone()
    }

    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    fn write(&self, html: String) {
        *self.html.lock() = Some(html);
        self.renders.fetch_add(1, Ordering::SeqCst);
    }
}

thread_local! {
    /// Elements whose component is locked on this thread.
    static HELD_COMPONENTS: RefCell<SmallVec<[SubscriberId; 4]>> = RefCell::new(SmallVec::new());
}

/// Component lock that records its holder in [`HELD_COMPONENTS`].
struct ComponentGuard<'a, C> {
    guard: MutexGuard<'a, C>,
    id: SubscriberId,
}

impl<C> Deref for ComponentGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.guard
    }
}

impl<C> DerefMut for ComponentGuard<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.guard
    }
}

impl<C> Drop for ComponentGuard<'_, C> {
    fn drop(&mut self) {
        let id = self.id;
        HELD_COMPONENTS.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(index) = held.iter().rposition(|held_id| *held_id == id) {
                held.remove(index);
            }
        });
    }
}

struct HostState {
    lifecycle: Lifecycle,
    props: Map<String, Value>,
    attributes: IndexMap<String, String>,
    state: Value,
}

struct ElementInner<C: Component> {
    id: SubscriberId,
    definition: Arc<ElementDefinition>,
    component: Mutex<C>,
    host: Mutex<HostState>,
    root: RenderRoot,
    stores: Vec<Store>,
    mode: RenderMode,
}

/// A live element instance. Cloning shares the instance.
pub struct Element<C: Component> {
    inner: Arc<ElementInner<C>>,
}

impl<C: Component> Clone for Element<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Component> Element<C> {
    /// Construct an element of a registered type.
    pub fn new(definition: Arc<ElementDefinition>, component: C, options: ElementOptions) -> Result<Self> {
        definition.acquire_instance()?;

        let props = definition
            .fields()
            .iter()
            .map(|field| (field.name().to_string(), field.default_value()))
            .collect();

        let inner = Arc::new(ElementInner {
            id: SubscriberId::new(),
            definition,
            component: Mutex::new(component),
            host: Mutex::new(HostState {
                lifecycle: Lifecycle::Constructed,
                props,
                attributes: IndexMap::new(),
                state: Value::Object(Map::new()),
            }),
            root: RenderRoot::default(),
            stores: options.stores,
            mode: options.mode,
        });

        inner.connect_stores();
        tracing::debug!(
            tag = %inner.definition.tag(),
            subscriber = %inner.id,
            stores = inner.stores.len(),
            "element constructed"
        );
        Ok(Self { inner })
    }

    pub fn tag(&self) -> &str {
        self.inner.definition.tag()
    }

    pub fn definition(&self) -> &Arc<ElementDefinition> {
        &self.inner.definition
    }

    /// Id this element subscribes to stores with.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.id
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.host.lock().lifecycle
    }

    pub fn is_mounted(&self) -> bool {
        self.lifecycle().is_mounted()
    }

    pub fn root(&self) -> &RenderRoot {
        &self.inner.root
    }

    pub fn html(&self) -> Option<String> {
        self.inner.root.html()
    }

    pub fn prop(&self, name: &str) -> Option<Value> {
        self.inner.host.lock().props.get(name).cloned()
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.host.lock().attributes.get(name).cloned()
    }

    pub fn state(&self) -> Value {
        self.inner.host.lock().state.clone()
    }

    /// Borrow the component, waiting for any render on another thread.
    ///
    /// Must not be called from the component's own hooks.
    pub fn with_component<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.hold_component())
    }

    /// The element was attached to a document.
    pub fn connected_callback(&self) {
        let inner = &self.inner;
        inner.connect_stores();
        inner.transition(Lifecycle::WillMount);
        if let Some(mut component) = inner.lock_component() {
            component.will_mount();
        }

        match &inner.mode {
            RenderMode::Sync => inner.mount(),
            RenderMode::Async(pool) => {
                let inner = Arc::clone(inner);
                pool.enqueue(move || inner.mount());
            }
        }
    }

    /// The element was detached.
    pub fn disconnected_callback(&self) {
        let inner = &self.inner;
        inner.disconnect_stores();
        if let Some(mut component) = inner.lock_component() {
            component.unmounted();
        }
        inner.transition(Lifecycle::Unmounted);
    }

    /// Re-render if `should_update` allows it.
    pub fn update(&self) {
        ElementInner::schedule_update(&self.inner);
    }

    /// Deliver an attribute change.
    ///
    /// The attribute value is always recorded. Hooks and the re-render only
    /// run for observed attributes while the element is mounted.
    pub fn attribute_changed_callback(&self, name: &str, old: Option<&str>, new: Option<&str>) -> Result<()> {
        let inner = &self.inner;
        let value = match inner.definition.field_for_attribute(name) {
            Some(field) => match field.binding() {
                FieldBinding::Attribute { kind, .. } => {
                    Some((field.name().to_string(), kind.read(name, new)?))
                }
                FieldBinding::Property => None,
            },
            None => None,
        };

        let mounted = {
            let mut host = inner.host.lock();
            match new {
                Some(new) => {
                    host.attributes.insert(name.to_string(), new.to_string());
                }
                None => {
                    host.attributes.shift_remove(name);
                }
            }
            if let Some((property, value)) = &value {
                host.props.insert(property.clone(), value.clone());
            }
            host.lifecycle.is_mounted()
        };

        if !mounted || value.is_none() {
            tracing::trace!(tag = %inner.definition.tag(), attribute = name, mounted, "attribute change not delivered");
            return Ok(());
        }

        if let Some(mut component) = inner.lock_component() {
            component.attribute_changed(name, old, new);
        }
        self.update();
        Ok(())
    }

    /// Set or remove an attribute, firing the attribute callback.
    pub fn set_attribute(&self, name: &str, value: Option<&str>) -> Result<()> {
        let old = self.attribute(name);
        self.attribute_changed_callback(name, old.as_deref(), value)
    }

    /// Write a reactive field. Re-renders only when the value changed.
    pub fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let inner = &self.inner;
        if inner.definition.field_named(name).is_none() {
            return Err(GemError::UnknownProperty {
                tag: inner.definition.tag().to_string(),
                property: name.to_string(),
            });
        }

        {
            let mut host = inner.host.lock();
            if host.props.get(name) == Some(&value) {
                return Ok(());
            }
            host.props.insert(name.to_string(), value);
        }
        self.update();
        Ok(())
    }

    /// Deep-merge `partial` into the element-local state and re-render.
    pub fn set_state(&self, partial: Value) -> Result<()> {
        if !partial.is_object() {
            return Err(GemError::not_an_object(&partial));
        }
        merge_values(&mut self.inner.host.lock().state, partial);
        self.update();
        Ok(())
    }
}

impl<C: Component> fmt::Debug for Element<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag", &self.tag())
            .field("lifecycle", &self.lifecycle())
            .field("renders", &self.inner.root.render_count())
            .finish()
    }
}

impl<C: Component> ElementInner<C> {
    fn connect_stores(self: &Arc<Self>) {
        for store in &self.stores {
            let weak: Weak<Self> = Arc::downgrade(self);
            store.connect(self.id, move || {
                if let Some(inner) = weak.upgrade() {
                    ElementInner::schedule_update(&inner);
                }
            });
        }
    }

    fn disconnect_stores(&self) {
        for store in &self.stores {
            store.disconnect(self.id);
        }
    }

    fn schedule_update(self: &Arc<Self>) {
        match &self.mode {
            RenderMode::Sync => self.render_update(),
            RenderMode::Async(pool) => {
                let inner = Arc::clone(self);
                pool.enqueue(move || inner.render_update());
            }
        }
    }

    /// Lock the component, refusing re-entrant access from its own hooks.
    ///
    /// Only a lock held further up this thread's stack counts as re-entrant;
    /// a lock held by another thread is waited for.
    fn lock_component(&self) -> Option<ComponentGuard<'_, C>> {
        if HELD_COMPONENTS.with(|held| held.borrow().contains(&self.id)) {
            tracing::warn!(tag = %self.definition.tag(), "re-entrant element update skipped");
            return None;
        }
        Some(self.hold_component())
    }

    fn hold_component(&self) -> ComponentGuard<'_, C> {
        let guard = self.component.lock();
        HELD_COMPONENTS.with(|held| held.borrow_mut().push(self.id));
        ComponentGuard { guard, id: self.id }
    }

    fn render_with(&self, component: &C) -> String {
        let host = self.host.lock();
        let ctx = RenderContext {
            tag: self.definition.tag(),
            props: &host.props,
            attributes: &host.attributes,
            state: &host.state,
        };
        component.render(&ctx)
    }

    fn mount(&self) {
        let Some(mut component) = self.lock_component() else {
            return;
        };
        let html = self.render_with(&component);
        self.root.write(html);
        component.mounted();
        drop(component);
        // A render queued before disconnection still runs but does not
        // bring the element back to life.
        let mut host = self.host.lock();
        if host.lifecycle == Lifecycle::WillMount {
            host.lifecycle = Lifecycle::Mounted;
            drop(host);
            tracing::debug!(tag = %self.definition.tag(), "element mounted");
        }
    }

    fn render_update(&self) {
        let Some(mut component) = self.lock_component() else {
            return;
        };
        if !component.should_update() {
            return;
        }
        let html = self.render_with(&component);
        self.root.write(html);
        component.updated();
    }

    fn transition(&self, to: Lifecycle) {
        let from = std::mem::replace(&mut self.host.lock().lifecycle, to);
        if from != to {
            tracing::debug!(tag = %self.definition.tag(), %from, %to, "lifecycle transition");
        }
    }
}

impl<C: Component> Drop for ElementInner<C> {
    fn drop(&mut self) {
        self.disconnect_stores();
        self.definition.release_instance();
    }
}
