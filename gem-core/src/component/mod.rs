//! Element Components
//!
//! The custom element layer: a [`Component`] supplies `render` and lifecycle
//! hooks, an [`ElementDefinition`] declares its tag and reactive fields, and
//! an [`Element`] hosts one instance, subscribing it to stores and
//! re-rendering it synchronously or through the render pool.
//!
//! Reactive fields are declared as a table rather than discovered at runtime:
//!
//! ```rust,ignore
//! let definition = registry.define(
//!     ElementDefinition::new("todo-item")
//!         .field(ReactiveField::attribute("doneAt", FieldKind::Number))
//!         .field(ReactiveField::property("todo")),
//! )?;
//! let element = Element::new(definition, TodoItem::default(), ElementOptions::new().observe(&todos))?;
//! element.connected_callback();
//! ```

mod definition;
mod element;
mod lifecycle;

pub use definition::{
    camel_to_kebab, ElementDefinition, ElementRegistry, FieldBinding, FieldKind, ReactiveField,
};
pub use element::{Component, Element, ElementOptions, RenderContext, RenderMode, RenderRoot};
pub use lifecycle::Lifecycle;
