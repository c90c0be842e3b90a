//! Native CSS names that pass through scoping untouched.

const NATIVE_PSEUDO_CLASSES: &[&str] = &[
    "active",
    "any-link",
    "blank",
    "checked",
    "current",
    "default",
    "defined",
    "dir",
    "disabled",
    "empty",
    "enabled",
    "first",
    "first-child",
    "first-of-type",
    "focus",
    "focus-visible",
    "focus-within",
    "fullscreen",
    "future",
    "has",
    "host",
    "host-context",
    "hover",
    "in-range",
    "indeterminate",
    "invalid",
    "is",
    "lang",
    "last-child",
    "last-of-type",
    "left",
    "link",
    "local-link",
    "matches",
    "not",
    "nth-child",
    "nth-col",
    "nth-last-child",
    "nth-last-col",
    "nth-last-of-type",
    "nth-of-type",
    "only-child",
    "only-of-type",
    "optional",
    "out-of-range",
    "past",
    "placeholder-shown",
    "read-only",
    "read-write",
    "required",
    "right",
    "root",
    "scope",
    "target",
    "target-within",
    "user-invalid",
    "valid",
    "visited",
    "where",
];

const NATIVE_PSEUDO_ELEMENTS: &[&str] = &[
    "after",
    "backdrop",
    "before",
    "cue",
    "file-selector-button",
    "first-letter",
    "first-line",
    "grammar-error",
    "marker",
    "placeholder",
    "selection",
    "slotted",
    "spelling-error",
];

/// Returns true for pseudo-classes defined by CSS itself.
pub fn is_native_pseudo_class(name: &str) -> bool {
    NATIVE_PSEUDO_CLASSES.contains(&name.to_ascii_lowercase().as_str())
}

/// Returns true for pseudo-elements defined by CSS itself.
pub fn is_native_pseudo_element(name: &str) -> bool {
    NATIVE_PSEUDO_ELEMENTS.contains(&name.to_ascii_lowercase().as_str())
}

/// Returns true for `-webkit-`, `-moz-` style names.
pub fn is_vendor_prefixed(name: &str) -> bool {
    name.starts_with('-') && !name.starts_with("--") && name[1..].contains('-')
}

/// Returns true for type selectors that name a component.
pub fn is_component_element(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}
