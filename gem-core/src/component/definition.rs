//! Element definitions and the element registry.
//!
//! An [`ElementDefinition`] is the declarative table of an element type: its
//! tag, its reactive fields and whether only one instance may exist. The
//! table is processed once, when [`ElementRegistry::define`] registers it,
//! into an attribute lookup used by every instance.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::{GemError, Result};

/// Hyphenated names the HTML standard reserves for its own elements.
const RESERVED_TAGS: [&str; 8] = [
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// How an attribute string maps onto a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Attribute text as-is; absent reads as `""`.
    String,
    /// Attribute parsed as a number; absent reads as `0`.
    Number,
    /// Attribute presence; absent reads as `false`.
    Boolean,
}

impl FieldKind {
    fn name(self) -> &'static str {
        match self {
            FieldKind::String => "a string",
            FieldKind::Number => "a number",
            FieldKind::Boolean => "a boolean",
        }
    }

    /// Property value used before the attribute is ever set.
    pub fn default_value(self) -> Value {
        match self {
            FieldKind::String => Value::String(String::new()),
            FieldKind::Number => Value::from(0),
            FieldKind::Boolean => Value::Bool(false),
        }
    }

    /// Convert an attribute value into a property value.
    pub fn read(self, attribute: &str, raw: Option<&str>) -> Result<Value> {
        let Some(raw) = raw else {
            return Ok(self.default_value());
        };
        match self {
            FieldKind::String => Ok(Value::String(raw.to_string())),
            FieldKind::Boolean => Ok(Value::Bool(true)),
            FieldKind::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Ok(Value::from(0));
                }
                if let Ok(integer) = trimmed.parse::<i64>() {
                    return Ok(Value::from(integer));
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| GemError::InvalidAttribute {
                        attribute: attribute.to_string(),
                        expected: self.name(),
                        value: raw.to_string(),
                    })
            }
        }
    }
}

/// Where a reactive field's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBinding {
    /// Mirrored from an observed attribute.
    Attribute { name: String, kind: FieldKind },
    /// Set only through [`Element::set_property`](super::Element::set_property).
    Property,
}

/// One reactive field of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactiveField {
    property: String,
    binding: FieldBinding,
}

impl ReactiveField {
    /// A field backed by the kebab-case attribute of `property`.
    pub fn attribute(property: impl Into<String>, kind: FieldKind) -> Self {
        let property = property.into();
        let name = camel_to_kebab(&property);
        Self {
            property,
            binding: FieldBinding::Attribute { name, kind },
        }
    }

    /// A property-only field (no attribute).
    pub fn property(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            binding: FieldBinding::Property,
        }
    }

    pub fn name(&self) -> &str {
        &self.property
    }

    pub fn binding(&self) -> &FieldBinding {
        &self.binding
    }

    pub fn attribute_name(&self) -> Option<&str> {
        match &self.binding {
            FieldBinding::Attribute { name, .. } => Some(name),
            FieldBinding::Property => None,
        }
    }

    pub(crate) fn default_value(&self) -> Value {
        match &self.binding {
            FieldBinding::Attribute { kind, .. } => kind.default_value(),
            FieldBinding::Property => Value::Null,
        }
    }
}

/// Declarative description of an element type.
pub struct ElementDefinition {
    tag: String,
    fields: Vec<ReactiveField>,
    single_instance: bool,
    /// attribute name -> index into `fields`; filled by `define`.
    attributes: HashMap<String, usize>,
    live_instances: AtomicUsize,
}

impl ElementDefinition {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: Vec::new(),
            single_instance: false,
            attributes: HashMap::new(),
            live_instances: AtomicUsize::new(0),
        }
    }

    pub fn field(mut self, field: ReactiveField) -> Self {
        self.fields.push(field);
        self
    }

    /// Allow at most one live instance.
    pub fn single_instance(mut self) -> Self {
        self.single_instance = true;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn fields(&self) -> &[ReactiveField] {
        &self.fields
    }

    pub fn is_single_instance(&self) -> bool {
        self.single_instance
    }

    /// Attributes whose changes reach the element.
    pub fn observed_attributes(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter_map(ReactiveField::attribute_name)
    }

    pub fn field_for_attribute(&self, attribute: &str) -> Option<&ReactiveField> {
        self.attributes.get(attribute).map(|&index| &self.fields[index])
    }

    pub fn field_named(&self, property: &str) -> Option<&ReactiveField> {
        self.fields.iter().find(|field| field.property == property)
    }

    pub(crate) fn acquire_instance(&self) -> Result<()> {
        if !self.single_instance {
            return Ok(());
        }
        self.live_instances
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| GemError::MultipleInstances(self.tag.clone()))
    }

    pub(crate) fn release_instance(&self) {
        if self.single_instance {
            self.live_instances.store(0, Ordering::SeqCst);
        }
    }

    fn build_index(&mut self) {
        self.attributes = self
            .fields
            .iter()
            .enumerate()
            .filter_map(|(index, field)| field.attribute_name().map(|name| (name.to_string(), index)))
            .collect();
    }
}

impl fmt::Debug for ElementDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("tag", &self.tag)
            .field("fields", &self.fields)
            .field("single_instance", &self.single_instance)
            .finish()
    }
}

/// Registry of defined element types, keyed by tag.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    definitions: DashMap<String, Arc<ElementDefinition>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and register a definition.
    pub fn define(&self, mut definition: ElementDefinition) -> Result<Arc<ElementDefinition>> {
        validate_tag(&definition.tag)?;
        definition.build_index();

        match self.definitions.entry(definition.tag.clone()) {
            Entry::Occupied(entry) => Err(GemError::AlreadyDefined(entry.key().clone())),
            Entry::Vacant(entry) => {
                let definition = Arc::new(definition);
                tracing::debug!(
                    tag = %definition.tag,
                    fields = definition.fields.len(),
                    "element defined"
                );
                entry.insert(Arc::clone(&definition));
                Ok(definition)
            }
        }
    }

    pub fn get(&self, tag: &str) -> Option<Arc<ElementDefinition>> {
        self.definitions.get(tag).map(|entry| Arc::clone(entry.value()))
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn validate_tag(tag: &str) -> Result<()> {
    let starts_with_letter = tag.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    let valid_chars = tag
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.' | '_'));

    if starts_with_letter && valid_chars && tag.contains('-') && !RESERVED_TAGS.contains(&tag) {
        Ok(())
    } else {
        Err(GemError::InvalidTagName(tag.to_string()))
    }
}

/// `fooBar` -> `foo-bar`.
pub fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kebab_case_attribute_names() {
        assert_eq!(camel_to_kebab("fooBarBaz"), "foo-bar-baz");
        assert_eq!(camel_to_kebab("plain"), "plain");
        let field = ReactiveField::attribute("maxCount", FieldKind::Number);
        assert_eq!(field.attribute_name(), Some("max-count"));
        assert_eq!(ReactiveField::property("items").attribute_name(), None);
    }

    #[test]
    fn field_kinds_read_attributes() {
        assert_eq!(FieldKind::String.read("a", Some("x")).unwrap(), json!("x"));
        assert_eq!(FieldKind::String.read("a", None).unwrap(), json!(""));
        assert_eq!(FieldKind::Number.read("a", Some(" 2.5 ")).unwrap(), json!(2.5));
        assert_eq!(FieldKind::Number.read("a", Some("")).unwrap(), json!(0));
        assert_eq!(FieldKind::Boolean.read("a", Some("")).unwrap(), json!(true));
        assert_eq!(FieldKind::Boolean.read("a", None).unwrap(), json!(false));
        assert!(matches!(
            FieldKind::Number.read("count", Some("ten")),
            Err(GemError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn define_validates_tag_names() {
        let registry = ElementRegistry::new();
        for bad in ["nohyphen", "Upper-case", "1-digit", "font-face", "", "bad tag-x"] {
            assert!(
                matches!(
                    registry.define(ElementDefinition::new(bad)),
                    Err(GemError::InvalidTagName(_))
                ),
                "{bad} should be rejected"
            );
        }
        assert!(registry.define(ElementDefinition::new("app-root")).is_ok());
        assert!(registry.is_defined("app-root"));
    }

    #[test]
    fn define_rejects_duplicates() {
        let registry = ElementRegistry::new();
        registry.define(ElementDefinition::new("x-a")).unwrap();
        assert!(matches!(
            registry.define(ElementDefinition::new("x-a")),
            Err(GemError::AlreadyDefined(tag)) if tag == "x-a"
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn define_indexes_observed_attributes() {
        let registry = ElementRegistry::new();
        let definition = registry
            .define(
                ElementDefinition::new("x-card")
                    .field(ReactiveField::attribute("title", FieldKind::String))
                    .field(ReactiveField::property("items"))
                    .field(ReactiveField::attribute("isOpen", FieldKind::Boolean)),
            )
            .unwrap();

        let observed: Vec<&str> = definition.observed_attributes().collect();
        assert_eq!(observed, vec!["title", "is-open"]);
        assert_eq!(
            definition.field_for_attribute("is-open").map(ReactiveField::name),
            Some("isOpen")
        );
        assert!(definition.field_for_attribute("items").is_none());
        assert!(definition.field_named("items").is_some());
        assert!(Arc::ptr_eq(&registry.get("x-card").unwrap(), &definition));
    }

    #[test]
    fn single_instance_slot() {
        let definition = ElementDefinition::new("x-one").single_instance();
        definition.acquire_instance().unwrap();
        assert!(matches!(
            definition.acquire_instance(),
            Err(GemError::MultipleInstances(_))
        ));
        definition.release_instance();
        assert!(definition.acquire_instance().is_ok());
    }
}
