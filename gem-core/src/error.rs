//! Error types shared by every Gem subsystem.
//!
//! All failures in this crate are programmer errors surfaced immediately
//! (calling an API with a value it cannot accept). Nothing here is retried.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GemError>;

/// Errors raised by stores, components and history navigation.
#[derive(Debug, Error)]
pub enum GemError {
    /// A store was created or updated with something other than a JSON object.
    #[error("gem: store values must be JSON objects, got {found}")]
    NotAnObject { found: &'static str },

    /// A named store was registered twice.
    #[error("gem: store `{0}` is already registered")]
    DuplicateStore(String),

    /// Navigation data tried to set a key used for history bookkeeping.
    #[error("gem: `{0}` is not allowed")]
    ReservedStateKey(String),

    /// A second instance of a single-instance element was constructed.
    #[error("gem: multiple instances of `{0}` are not allowed")]
    MultipleInstances(String),

    /// The tag does not satisfy the custom element naming rules.
    #[error("gem: `{0}` is not a valid custom element name")]
    InvalidTagName(String),

    /// The tag is already registered.
    #[error("gem: `{0}` has already been defined")]
    AlreadyDefined(String),

    /// The property is not declared as a reactive field.
    #[error("gem: `{property}` is not a reactive field of `{tag}`")]
    UnknownProperty { tag: String, property: String },

    /// An attribute value could not be converted by its field serializer.
    #[error("gem: attribute `{attribute}` cannot be read as {expected}: {value:?}")]
    InvalidAttribute {
        attribute: String,
        expected: &'static str,
        value: String,
    },

    /// A navigation path could not be resolved.
    #[error("gem: invalid location `{0}`")]
    InvalidLocation(String),

    /// JSON (de)serialization failed.
    #[error("gem: serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GemError {
    /// Build a [`GemError::NotAnObject`] describing the offending value.
    pub(crate) fn not_an_object(value: &serde_json::Value) -> Self {
        let found = match value {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "a boolean",
            serde_json::Value::Number(_) => "a number",
            serde_json::Value::String(_) => "a string",
            serde_json::Value::Array(_) => "an array",
            serde_json::Value::Object(_) => "an object",
        };
        Self::NotAnObject { found }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn messages_carry_prefix() {
        let err = GemError::ReservedStateKey("$key".into());
        assert_eq!(err.to_string(), "gem: `$key` is not allowed");

        let err = GemError::not_an_object(&json!([1, 2]));
        assert_eq!(
            err.to_string(),
            "gem: store values must be JSON objects, got an array"
        );
    }
}
