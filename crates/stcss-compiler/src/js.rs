//! Values exported by non-stylesheet modules.
//!
//! Formatters, mixins, plain values and custom value types all reach the
//! compiler as [`JsValue`]s, either registered programmatically on the host
//! or loaded from `.json` files.

use crate::custom_values::CustomValueExtension;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// A callable module export.
///
/// Formatters receive their resolved arguments and return a string or
/// number. Mixins return an object describing declarations and nested rules.
/// An `Err` carries the message reported in the diagnostic.
#[derive(Clone)]
pub struct JsFunction(Rc<dyn Fn(&[String]) -> Result<JsValue, String>>);

impl JsFunction {
    /// Wraps a closure.
    pub fn new(f: impl Fn(&[String]) -> Result<JsValue, String> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the function.
    pub fn call(&self, args: &[String]) -> Result<JsValue, String> {
        (self.0)(args)
    }
}

impl fmt::Debug for JsFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsFunction")
    }
}

/// A module export.
#[derive(Clone, Default)]
pub enum JsValue {
    #[default]
    Undefined,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsValue>),
    Object(IndexMap<String, JsValue>),
    Function(JsFunction),
    /// A custom value type usable as `name(...)` in declarations.
    CustomValue(Rc<dyn CustomValueExtension>),
}

impl JsValue {
    /// Creates a function value.
    pub fn function(f: impl Fn(&[String]) -> Result<JsValue, String> + 'static) -> Self {
        JsValue::Function(JsFunction::new(f))
    }

    /// Creates an object value from key/value pairs.
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, JsValue)>) -> Self {
        JsValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns the kind as used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            JsValue::Undefined => "undefined",
            JsValue::Bool(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::String(_) => "string",
            JsValue::Array(_) => "array",
            JsValue::Object(_) => "object",
            JsValue::Function(_) => "function",
            JsValue::CustomValue(_) => "custom value",
        }
    }

    /// Looks up an object key.
    pub fn get(&self, key: &str) -> Option<&JsValue> {
        match self {
            JsValue::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Returns the module's `default` key, or the module itself.
    pub fn default_export(&self) -> &JsValue {
        self.get("default").unwrap_or(self)
    }

    /// Returns the string form of strings and numbers.
    pub fn as_css_string(&self) -> Option<String> {
        match self {
            JsValue::String(s) => Some(s.clone()),
            JsValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Converts parsed JSON.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsValue::Undefined,
            serde_json::Value::Bool(b) => JsValue::Bool(b),
            serde_json::Value::Number(n) => JsValue::Number(n.as_f64().unwrap_or_default()),
            serde_json::Value::String(s) => JsValue::String(s),
            serde_json::Value::Array(items) => {
                JsValue::Array(items.into_iter().map(JsValue::from_json).collect())
            }
            serde_json::Value::Object(map) => JsValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, JsValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl fmt::Debug for JsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsValue::Undefined => f.write_str("Undefined"),
            JsValue::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            JsValue::Number(n) => f.debug_tuple("Number").field(n).finish(),
            JsValue::String(s) => f.debug_tuple("String").field(s).finish(),
            JsValue::Array(items) => f.debug_tuple("Array").field(items).finish(),
            JsValue::Object(map) => f.debug_tuple("Object").field(map).finish(),
            JsValue::Function(func) => fmt::Debug::fmt(func, f),
            JsValue::CustomValue(ext) => f.debug_tuple("CustomValue").field(&ext.name()).finish(),
        }
    }
}

impl From<&str> for JsValue {
    fn from(value: &str) -> Self {
        JsValue::String(value.to_string())
    }
}

impl From<String> for JsValue {
    fn from(value: String) -> Self {
        JsValue::String(value)
    }
}

impl From<f64> for JsValue {
    fn from(value: f64) -> Self {
        JsValue::Number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"z": "last", "a": 1, "nested": [true, null]}"#).unwrap();
        let value = JsValue::from_json(json);
        assert_eq!(value.get("a").and_then(JsValue::as_css_string).as_deref(), Some("1"));
        assert_eq!(value.get("z").map(JsValue::kind_name), Some("string"));
        assert!(matches!(
            value.get("nested"),
            Some(JsValue::Array(items)) if matches!(items[1], JsValue::Undefined)
        ));
    }

    #[test]
    fn test_default_export() {
        let module = JsValue::object([("default", JsValue::from("x"))]);
        assert_eq!(module.default_export().as_css_string().as_deref(), Some("x"));
        let plain = JsValue::from("y");
        assert_eq!(plain.default_export().as_css_string().as_deref(), Some("y"));
    }

    #[test]
    fn test_function_call() {
        let upper = JsValue::function(|args| Ok(JsValue::from(args.join("-").to_uppercase())));
        let JsValue::Function(f) = upper else {
            panic!("expected function");
        };
        assert_eq!(
            f.call(&["a".into(), "b".into()]).unwrap().as_css_string().as_deref(),
            Some("A-B")
        );
    }
}
