//! Pseudo-state output and parameter validation.

use crate::directives::strip_quotes;
use crate::meta::{StateDef, StateParamType, TypedState};
use stcss_diagnostics::DiagnosticCode;
use stcss_parser::SelectorNode;

/// A problem found while compiling a state use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateIssue {
    pub code: DiagnosticCode,
    pub message: String,
}

/// The attribute name a state compiles to.
pub fn state_attribute(namespace: &str, state: &str) -> String {
    format!(
        "data-{}-{}",
        namespace.to_lowercase(),
        state.to_lowercase()
    )
}

/// Compiles a state use to a selector node.
///
/// `content` is the argument of `:state(arg)`. Issues are returned
/// alongside the node because output is produced either way.
pub fn state_selector(
    namespace: &str,
    name: &str,
    def: &StateDef,
    content: Option<&str>,
) -> (SelectorNode, Option<StateIssue>) {
    let attribute = state_attribute(namespace, name);
    match def {
        StateDef::Boolean => (SelectorNode::Attribute(attribute), None),
        StateDef::Mapped(selector) => (SelectorNode::Raw(selector.trim().to_string()), None),
        StateDef::Typed(typed) => {
            let value = content
                .map(|c| strip_quotes(c).to_string())
                .filter(|c| !c.is_empty())
                .or_else(|| typed.default_value.clone());
            let Some(value) = value else {
                return (
                    SelectorNode::Attribute(attribute),
                    Some(StateIssue {
                        code: DiagnosticCode::MissingStateParam,
                        message: format!("pseudo-state \"{name}\" expects a parameter"),
                    }),
                );
            };
            let issue = validate_state(typed, &value).err().map(|errors| StateIssue {
                code: DiagnosticCode::StateValidationFailed,
                message: format!(
                    "pseudo-state \"{name}\" with parameter \"{value}\" failed validation: {}",
                    errors.join(", ")
                ),
            });
            let operator = match typed.param_type {
                StateParamType::Tag => "~=",
                _ => "=",
            };
            let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
            (
                SelectorNode::Attribute(format!("{attribute}{operator}\"{escaped}\"")),
                issue,
            )
        }
    }
}

/// Checks a state parameter against its type and validators.
pub fn validate_state(state: &TypedState, value: &str) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    match state.param_type {
        StateParamType::Enum => {
            if !state.arguments.iter().any(|option| option == value) {
                let options: Vec<String> =
                    state.arguments.iter().map(|o| format!("\"{o}\"")).collect();
                errors.push(format!("expected one of {}", options.join(", ")));
            }
        }
        StateParamType::Tag => {
            if value.chars().any(char::is_whitespace) {
                errors.push("tag value cannot contain whitespace".to_string());
            }
        }
        StateParamType::String => {
            for validator in &state.validators {
                if let Err(message) = check_string(&validator.name, &validator.argument, value) {
                    errors.push(message);
                }
            }
        }
        StateParamType::Number => match value.parse::<f64>() {
            Ok(number) => {
                for validator in &state.validators {
                    if let Err(message) =
                        check_number(&validator.name, &validator.argument, number)
                    {
                        errors.push(message);
                    }
                }
            }
            Err(_) => errors.push(format!("expected a number, got \"{value}\"")),
        },
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_limit(validator: &str, argument: &str) -> Result<f64, String> {
    argument
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("{validator} expects a number, got \"{argument}\""))
}

fn check_string(validator: &str, argument: &str, value: &str) -> Result<(), String> {
    let length = value.chars().count() as f64;
    match validator {
        "minLength" => {
            let min = parse_limit(validator, argument)?;
            if length < min {
                return Err(format!("length must be at least {argument}"));
            }
        }
        "maxLength" => {
            let max = parse_limit(validator, argument)?;
            if length > max {
                return Err(format!("length must be at most {argument}"));
            }
        }
        "contains" => {
            if !value.contains(argument) {
                return Err(format!("must contain \"{argument}\""));
            }
        }
        other => return Err(format!("unknown string validator \"{other}\"")),
    }
    Ok(())
}

fn check_number(validator: &str, argument: &str, value: f64) -> Result<(), String> {
    let limit = parse_limit(validator, argument)?;
    let ok = match validator {
        "min" => value >= limit,
        "max" => value <= limit,
        "multipleOf" => limit != 0.0 && (value % limit).abs() < f64::EPSILON,
        other => return Err(format!("unknown number validator \"{other}\"")),
    };
    if ok {
        Ok(())
    } else {
        Err(format!("{validator}({argument}) not satisfied by {value}"))
    }
}
