//! Custom value types: structured variables with path lookup.
//!
//! A custom value call such as `st-map(a 1, b st-array(x, y))` evaluates to a
//! [`CustomBox`]. Boxes nest arbitrarily, and `value(name, b, 1)` walks into
//! them one path segment per level, delegating each step to the extension
//! that built that level.

use crate::exports::ExportValue;
use indexmap::IndexMap;
use smol_str::SmolStr;
use stcss_parser::{split_args, stringify_value, trim_nodes, ValueNode};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// A failure while building a custom value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct CustomValueError {
    pub message: String,
}

impl CustomValueError {
    /// Creates an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The result of evaluating a value: a plain string or a structured box.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Str(String),
    Box(CustomBox),
}

impl Evaluated {
    /// Returns the string form used in declarations.
    pub fn flatten(&self) -> String {
        match self {
            Evaluated::Str(s) => s.clone(),
            Evaluated::Box(b) => b.extension.flatten_value(&b.value),
        }
    }

    /// Walks `path` into nested boxes.
    ///
    /// On failure returns the index of the first segment that did not resolve.
    pub fn get_path(&self, path: &[String]) -> Result<&Evaluated, usize> {
        let mut current = self;
        for (index, segment) in path.iter().enumerate() {
            current = match current {
                Evaluated::Box(b) => b
                    .extension
                    .get_value(segment, &b.value)
                    .ok_or(index)?,
                Evaluated::Str(_) => return Err(index),
            };
        }
        Ok(current)
    }

    /// Converts to the exported shape: strings, arrays and objects.
    pub fn to_export(&self) -> ExportValue {
        match self {
            Evaluated::Str(s) => ExportValue::String(s.clone()),
            Evaluated::Box(b) => match &b.value {
                BoxValue::List(items) => {
                    ExportValue::List(items.iter().map(Evaluated::to_export).collect())
                }
                BoxValue::Map(entries) => ExportValue::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_export()))
                        .collect(),
                ),
                BoxValue::Scalar(s) => ExportValue::String(s.clone()),
            },
        }
    }
}

/// A structured value built by a custom value type.
#[derive(Clone)]
pub struct CustomBox {
    /// Name the type was called by.
    pub type_name: SmolStr,
    pub extension: Rc<dyn CustomValueExtension>,
    pub value: BoxValue,
}

impl fmt::Debug for CustomBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomBox")
            .field("type_name", &self.type_name)
            .field("value", &self.value)
            .finish()
    }
}

impl PartialEq for CustomBox {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && self.value == other.value
    }
}

/// The payload of a box.
#[derive(Debug, Clone, PartialEq)]
pub enum BoxValue {
    List(Vec<Evaluated>),
    Map(IndexMap<String, Evaluated>),
    Scalar(String),
}

/// Resolves custom value arguments (nested calls and `value()` references).
pub trait ArgResolver {
    /// Evaluates one argument.
    fn resolve_arg(&mut self, nodes: &[ValueNode]) -> Evaluated;
}

/// A custom value type.
///
/// Only [`process_args`](Self::process_args) is required; the remaining
/// methods have list/map defaults matching the built-in types.
pub trait CustomValueExtension {
    /// The type name, e.g. `st-map`.
    fn name(&self) -> &str;

    /// Turns call arguments into a value, resolving each argument first.
    fn process_args(
        &self,
        args: &[ValueNode],
        resolver: &mut dyn ArgResolver,
    ) -> Result<BoxValue, CustomValueError>;

    /// Post-processes the value built from the arguments.
    fn create_value(&self, value: BoxValue) -> Result<BoxValue, CustomValueError> {
        Ok(value)
    }

    /// Looks up one path segment.
    fn get_value<'v>(&self, key: &str, value: &'v BoxValue) -> Option<&'v Evaluated> {
        match value {
            BoxValue::List(items) => key.trim().parse::<usize>().ok().and_then(|i| items.get(i)),
            BoxValue::Map(entries) => entries.get(key.trim()),
            BoxValue::Scalar(_) => None,
        }
    }

    /// The string form used when the value lands in a declaration.
    fn flatten_value(&self, value: &BoxValue) -> String {
        match value {
            BoxValue::List(items) => items
                .iter()
                .map(Evaluated::flatten)
                .collect::<Vec<_>>()
                .join(", "),
            BoxValue::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{k} {}", v.flatten()))
                .collect::<Vec<_>>()
                .join(", "),
            BoxValue::Scalar(s) => s.clone(),
        }
    }
}

/// `st-array(a, b, ...)`, indexed by position.
#[derive(Debug, Default)]
pub struct StArray;

impl CustomValueExtension for StArray {
    fn name(&self) -> &str {
        "st-array"
    }

    fn process_args(
        &self,
        args: &[ValueNode],
        resolver: &mut dyn ArgResolver,
    ) -> Result<BoxValue, CustomValueError> {
        let items = split_args(args)
            .iter()
            .map(|arg| resolver.resolve_arg(trim_nodes(arg)))
            .collect();
        Ok(BoxValue::List(items))
    }
}

/// `st-map(key value, ...)`, indexed by key.
#[derive(Debug, Default)]
pub struct StMap;

impl CustomValueExtension for StMap {
    fn name(&self) -> &str {
        "st-map"
    }

    fn process_args(
        &self,
        args: &[ValueNode],
        resolver: &mut dyn ArgResolver,
    ) -> Result<BoxValue, CustomValueError> {
        let mut entries = IndexMap::new();
        for arg in split_args(args) {
            let pair = trim_nodes(&arg);
            let Some((key_node, rest)) = pair.split_first() else {
                return Err(CustomValueError::new("st-map: empty entry"));
            };
            let key = match key_node {
                ValueNode::Word(word) => word.clone(),
                ValueNode::String { value, .. } => value.clone(),
                other => {
                    return Err(CustomValueError::new(format!(
                        "st-map: invalid key \"{other}\""
                    )))
                }
            };
            let value = trim_nodes(rest);
            if value.is_empty() {
                return Err(CustomValueError::new(format!(
                    "st-map: missing value for key \"{key}\""
                )));
            }
            entries.insert(key, resolver.resolve_arg(value));
        }
        Ok(BoxValue::Map(entries))
    }
}

/// Custom value types available without an import.
#[derive(Clone)]
pub struct CustomValueRegistry {
    types: IndexMap<SmolStr, Rc<dyn CustomValueExtension>>,
}

impl CustomValueRegistry {
    /// Creates a registry with `st-array` and `st-map`.
    pub fn new() -> Self {
        let mut registry = Self {
            types: IndexMap::new(),
        };
        registry.register(Rc::new(StArray));
        registry.register(Rc::new(StMap));
        registry
    }

    /// Adds a global custom value type.
    pub fn register(&mut self, extension: Rc<dyn CustomValueExtension>) {
        self.types.insert(SmolStr::new(extension.name()), extension);
    }

    /// Looks up a type by name.
    pub fn get(&self, name: &str) -> Option<Rc<dyn CustomValueExtension>> {
        self.types.get(name).cloned()
    }
}

impl Default for CustomValueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CustomValueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.types.keys()).finish()
    }
}

/// Builds a box by calling `extension` on `args`.
pub fn build_box(
    type_name: &str,
    extension: Rc<dyn CustomValueExtension>,
    args: &[ValueNode],
    resolver: &mut dyn ArgResolver,
) -> Result<CustomBox, CustomValueError> {
    let value = extension.process_args(args, resolver)?;
    let value = extension.create_value(value)?;
    Ok(CustomBox {
        type_name: SmolStr::new(type_name),
        extension,
        value,
    })
}

/// Literal text of a call, used when evaluation fails.
pub(crate) fn call_text(name: &str, args: &[ValueNode]) -> String {
    format!("{name}({})", stringify_value(args))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stcss_parser::parse_value;

    /// Resolves nested built-in calls and keeps everything else as text.
    struct Literal<'r>(&'r CustomValueRegistry);

    impl ArgResolver for Literal<'_> {
        fn resolve_arg(&mut self, nodes: &[ValueNode]) -> Evaluated {
            if let [ValueNode::Function { name, nodes: args }] = nodes {
                if let Some(ext) = self.0.get(name) {
                    let registry = self.0;
                    return build_box(name, ext, args, &mut Literal(registry))
                        .map(Evaluated::Box)
                        .unwrap_or_else(|_| Evaluated::Str(stringify_value(nodes)));
                }
            }
            Evaluated::Str(stringify_value(nodes))
        }
    }

    fn eval(registry: &CustomValueRegistry, text: &str) -> Evaluated {
        Literal(registry).resolve_arg(trim_nodes(&parse_value(text)))
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_nested_path() {
        let registry = CustomValueRegistry::new();
        let deep = eval(&registry, "st-array(st-map(idx st-array(a,b)))");
        let found = deep.get_path(&path(&["0", "idx", "1"]));
        assert_eq!(found, Ok(&Evaluated::Str("b".into())));
    }

    #[test]
    fn test_bad_path_reports_segment() {
        let registry = CustomValueRegistry::new();
        let deep = eval(&registry, "st-array(st-map(idx st-array(a,b)))");
        assert_eq!(deep.get_path(&path(&["0", "nope"])), Err(1));
        assert_eq!(deep.get_path(&path(&["5"])), Err(0));
        assert_eq!(deep.get_path(&path(&["0", "idx", "0", "x"])), Err(3));
    }

    #[test]
    fn test_flatten_and_export() {
        let registry = CustomValueRegistry::new();
        let map = eval(&registry, "st-map(a 1px solid, b st-array(x, y))");
        assert_eq!(map.flatten(), "a 1px solid, b x, y");
        let export = serde_json::to_string(&map.to_export()).unwrap();
        assert_eq!(export, r#"{"a":"1px solid","b":["x","y"]}"#);
    }

    #[test]
    fn test_map_entry_without_value() {
        let registry = CustomValueRegistry::new();
        let ext = registry.get("st-map").unwrap();
        let nodes = parse_value("a 1, b");
        let err = build_box("st-map", ext, &nodes, &mut Literal(&registry)).unwrap_err();
        assert_eq!(err.message, "st-map: missing value for key \"b\"");
    }

    #[test]
    fn test_create_value_hook_can_fail() {
        struct Even;
        impl CustomValueExtension for Even {
            fn name(&self) -> &str {
                "even"
            }
            fn process_args(
                &self,
                args: &[ValueNode],
                _resolver: &mut dyn ArgResolver,
            ) -> Result<BoxValue, CustomValueError> {
                Ok(BoxValue::Scalar(stringify_value(args)))
            }
            fn create_value(&self, value: BoxValue) -> Result<BoxValue, CustomValueError> {
                match &value {
                    BoxValue::Scalar(s) if s.parse::<u32>().is_ok_and(|n| n % 2 == 0) => Ok(value),
                    _ => Err(CustomValueError::new("not even")),
                }
            }
        }
        let registry = CustomValueRegistry::new();
        let ok = build_box("even", Rc::new(Even), &parse_value("4"), &mut Literal(&registry));
        assert_eq!(ok.map(|b| Evaluated::Box(b).flatten()), Ok("4".to_string()));
        let err = build_box("even", Rc::new(Even), &parse_value("3"), &mut Literal(&registry));
        assert_eq!(err.map(|_| ()), Err(CustomValueError::new("not even")));
    }
}
