//! Parsers for directive values: imports, states, mixins and compose lists.

use crate::meta::{MixinRef, StateDef, StateParamType, StateValidator, StatesMap, TypedState};
use smol_str::SmolStr;
use stcss_parser::{parse_value, split_args, stringify_value, trim_nodes, Span, ValueNode};

/// The pieces of an `@st-import` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StImport {
    pub request: String,
    pub default_export: Option<SmolStr>,
    /// `(local, exported)` pairs.
    pub named: Vec<(SmolStr, SmolStr)>,
}

/// Removes one pair of matching quotes.
pub fn strip_quotes(text: &str) -> &str {
    let text = text.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty()
        && text
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '\\' || c == '.')
}

/// Parses `a, b as c` into `(local, exported)` pairs.
pub fn parse_named(value: &str) -> Result<Vec<(SmolStr, SmolStr)>, String> {
    let mut named = Vec::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let words: Vec<&str> = part.split_whitespace().collect();
        match words.as_slice() {
            [name] if is_identifier(name) => named.push((SmolStr::new(name), SmolStr::new(name))),
            [exported, "as", local] if is_identifier(exported) && is_identifier(local) => {
                named.push((SmolStr::new(local), SmolStr::new(exported)))
            }
            _ => return Err(format!("invalid named import \"{part}\"")),
        }
    }
    Ok(named)
}

/// Parses `Default, [a, b as c] from "./x.st.css"`.
pub fn parse_st_import(params: &str) -> Result<StImport, String> {
    let params = params.trim();
    let quote = params
        .chars()
        .last()
        .filter(|c| *c == '"' || *c == '\'')
        .ok_or_else(|| "missing import request".to_string())?;
    let body = &params[..params.len() - 1];
    let open = body
        .rfind(quote)
        .ok_or_else(|| "unterminated import request".to_string())?;
    let request = body[open + 1..].to_string();
    if request.trim().is_empty() {
        return Err("empty import request".to_string());
    }

    let head = params[..open].trim();
    if head.is_empty() {
        return Ok(StImport {
            request,
            default_export: None,
            named: Vec::new(),
        });
    }
    let head = head
        .strip_suffix("from")
        .ok_or_else(|| "expected \"from\" before the import request".to_string())?
        .trim();

    let (default_part, named) = match head.find('[') {
        Some(start) => {
            let end = head
                .rfind(']')
                .filter(|end| *end > start)
                .ok_or_else(|| "unterminated named import list".to_string())?;
            if !head[end + 1..].trim().is_empty() {
                return Err(format!("unexpected \"{}\"", head[end + 1..].trim()));
            }
            (&head[..start], parse_named(&head[start + 1..end])?)
        }
        None => (head, Vec::new()),
    };
    let default_part = default_part.trim().trim_end_matches(',').trim();
    let default_export = match default_part {
        "" => None,
        name if is_identifier(name) => Some(SmolStr::new(name)),
        other => return Err(format!("invalid default import \"{other}\"")),
    };
    if default_export.is_none() && named.is_empty() {
        return Err("nothing imported".to_string());
    }
    Ok(StImport {
        request,
        default_export,
        named,
    })
}

/// Parses a `-st-states` value.
///
/// Invalid entries are skipped and reported in the returned error list.
pub fn parse_states(value: &str) -> (StatesMap, Vec<String>) {
    let mut states = StatesMap::new();
    let mut errors = Vec::new();
    for arg in split_args(&parse_value(value)) {
        let nodes = trim_nodes(&arg);
        match nodes.split_first() {
            Some((ValueNode::Word(name), [])) => {
                states.insert(SmolStr::new(name), StateDef::Boolean);
            }
            Some((ValueNode::Function { name, nodes: inner }, rest)) if !name.is_empty() => {
                match parse_state_param(inner, rest) {
                    Ok(def) => {
                        states.insert(SmolStr::new(name), def);
                    }
                    Err(message) => errors.push(format!("state \"{name}\": {message}")),
                }
            }
            Some(_) => errors.push(format!(
                "invalid state definition \"{}\"",
                stringify_value(nodes)
            )),
            None => {}
        }
    }
    (states, errors)
}

fn parse_state_param(inner: &[ValueNode], rest: &[ValueNode]) -> Result<StateDef, String> {
    let inner = trim_nodes(inner);
    let (type_name, type_args) = match inner {
        [ValueNode::String { value, .. }] => return Ok(StateDef::Mapped(value.clone())),
        [ValueNode::Word(word)] => (word.as_str(), &[][..]),
        [ValueNode::Function { name, nodes }] => (name.as_str(), nodes.as_slice()),
        [] => return Err("missing state type".to_string()),
        other => return Err(format!("invalid state type \"{}\"", stringify_value(other))),
    };
    let param_type = StateParamType::from_name(type_name)
        .ok_or_else(|| format!("unknown state type \"{type_name}\""))?;

    let mut arguments = Vec::new();
    let mut validators = Vec::new();
    for arg in split_args(type_args) {
        let arg = trim_nodes(&arg);
        match (param_type, arg) {
            (StateParamType::Enum, _) => {
                arguments.push(strip_quotes(&stringify_value(arg)).to_string());
            }
            (_, [ValueNode::Function { name, nodes }]) => validators.push(StateValidator {
                name: SmolStr::new(name),
                argument: strip_quotes(&stringify_value(trim_nodes(nodes))).to_string(),
            }),
            (_, []) => {}
            (_, other) => {
                return Err(format!("invalid validator \"{}\"", stringify_value(other)));
            }
        }
    }
    if param_type == StateParamType::Enum && arguments.is_empty() {
        return Err("enum state without options".to_string());
    }

    let default = trim_nodes(rest);
    let default_value = if default.is_empty() {
        None
    } else {
        Some(strip_quotes(&stringify_value(default)).to_string())
    };
    Ok(StateDef::Typed(TypedState {
        param_type,
        arguments,
        validators,
        default_value,
    }))
}

/// Parses a `-st-mixin` value into ordered mixin references.
pub fn parse_mixins(value: &str, span: Span) -> Result<Vec<MixinRef>, String> {
    let mut mixins = Vec::new();
    for arg in split_args(&parse_value(value)) {
        match trim_nodes(&arg) {
            [ValueNode::Word(name)] => mixins.push(MixinRef {
                name: SmolStr::new(name),
                args: Vec::new(),
                span,
            }),
            [ValueNode::Function { name, nodes }] if !name.is_empty() => mixins.push(MixinRef {
                name: SmolStr::new(name),
                args: split_args(nodes)
                    .iter()
                    .map(|a| stringify_value(trim_nodes(a)))
                    .collect(),
                span,
            }),
            [] => {}
            other => return Err(format!("invalid mixin \"{}\"", stringify_value(other))),
        }
    }
    Ok(mixins)
}

/// Splits a comma-separated list of names.
pub fn parse_name_list(value: &str) -> Vec<SmolStr> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SmolStr::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_st_import() {
        let import = parse_st_import(r#"Button, [icon, label as text] from "./button.st.css""#)
            .expect("valid import");
        assert_eq!(
            import,
            StImport {
                request: "./button.st.css".into(),
                default_export: Some("Button".into()),
                named: vec![("icon".into(), "icon".into()), ("text".into(), "label".into())],
            }
        );
        let named_only = parse_st_import("[color] from './vars.st.css'").unwrap();
        assert_eq!(named_only.default_export, None);
        assert_eq!(named_only.request, "./vars.st.css");
    }

    #[test]
    fn test_parse_st_import_errors() {
        assert!(parse_st_import("Button from").is_err());
        assert!(parse_st_import(r#"Button "./a.st.css""#).is_err());
        assert!(parse_st_import(r#"[a from "./a.st.css""#).is_err());
        assert!(parse_st_import(r#"from "./a.st.css""#).is_err());
    }

    #[test]
    fn test_parse_states() {
        let (states, errors) = parse_states(
            r#"toggled, size(enum(small, big)) small, label(string(minLength(2))), on(":checked"), bogus(float)"#,
        );
        assert_eq!(errors, vec!["state \"bogus\": unknown state type \"float\"".to_string()]);
        assert_eq!(states.get("toggled"), Some(&StateDef::Boolean));
        assert_eq!(states.get("on"), Some(&StateDef::Mapped(":checked".into())));
        let Some(StateDef::Typed(size)) = states.get("size") else {
            panic!("expected typed state");
        };
        assert_eq!(size.param_type, StateParamType::Enum);
        assert_eq!(size.arguments, vec!["small".to_string(), "big".to_string()]);
        assert_eq!(size.default_value.as_deref(), Some("small"));
        let Some(StateDef::Typed(label)) = states.get("label") else {
            panic!("expected typed state");
        };
        assert_eq!(
            label.validators,
            vec![StateValidator {
                name: "minLength".into(),
                argument: "2".into()
            }]
        );
    }

    #[test]
    fn test_parse_mixins() {
        let mixins = parse_mixins("base, shadow(color red, size 2px), fmt()", Span::default())
            .expect("valid mixins");
        let names: Vec<&str> = mixins.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["base", "shadow", "fmt"]);
        assert_eq!(mixins[1].args, vec!["color red".to_string(), "size 2px".to_string()]);
        assert!(mixins[2].args.is_empty());
        assert!(parse_mixins("a b", Span::default()).is_err());
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(
            parse_named("a, b as c").unwrap(),
            vec![("a".into(), "a".into()), ("c".into(), "b".into())]
        );
        assert!(parse_named("a as").is_err());
    }
}
