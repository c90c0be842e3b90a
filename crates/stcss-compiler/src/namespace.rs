//! Namespace selection for stylesheets.

use camino::Utf8Path;
use smol_str::SmolStr;
use std::rc::Rc;

/// Picks the namespace of a stylesheet.
///
/// Receives the `@namespace` value, if the file declares one, and the
/// stylesheet path.
pub type NamespaceResolver = Rc<dyn Fn(Option<&str>, &Utf8Path) -> SmolStr>;

/// Uses an explicit namespace verbatim and otherwise derives one from the path.
pub fn default_namespace(explicit: Option<&str>, source: &Utf8Path) -> SmolStr {
    match explicit {
        Some(namespace) => SmolStr::new(namespace),
        None => namespace_from_path(source),
    }
}

/// Builds `<stem><hash>` where the hash is a decimal number derived from the
/// full path, so equally named files in different folders never collide.
pub fn namespace_from_path(source: &Utf8Path) -> SmolStr {
    let file_name = source.file_name().unwrap_or("style");
    let stem = file_name
        .strip_suffix(".st.css")
        .or_else(|| file_name.strip_suffix(".css"))
        .unwrap_or(file_name);
    let mut ident: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, 's');
    }
    let hash = blake3::hash(source.as_str().as_bytes());
    let bytes = hash.as_bytes();
    let number = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    SmolStr::new(format!("{ident}{number}"))
}

/// Returns true if `namespace` is a valid CSS identifier.
pub fn is_valid_namespace(namespace: &str) -> bool {
    let rest = namespace.strip_prefix('-').unwrap_or(namespace);
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || !c.is_ascii() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || !c.is_ascii())
}
