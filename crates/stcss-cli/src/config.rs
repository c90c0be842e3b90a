//! Configuration loading.

use crate::cli::Args;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use tracing::{debug, warn};

/// File name looked up in the workspace root.
pub const CONFIG_FILE: &str = "stcss.config.json";

const DEFAULT_OUT_DIR: &str = "dist";
const DEFAULT_DELIMITER: &str = "__";

/// Contents of `stcss.config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StcssConfig {
    /// Separator between namespace and local name.
    pub delimiter: Option<String>,

    /// Output directory, relative to the workspace.
    pub out_dir: Option<Utf8PathBuf>,

    /// Glob patterns to skip.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl StcssConfig {
    /// Loads `stcss.config.json` from a workspace, falling back to defaults.
    pub fn load(workspace: &Utf8Path) -> Self {
        let path = workspace.join(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }
        match Self::parse(&path) {
            Ok(config) => {
                debug!(path = %path, "loaded config");
                config
            }
            Err(e) => {
                warn!(path = %path, error = %e, "failed to parse config, using defaults");
                Self::default()
            }
        }
    }

    fn parse(path: &Utf8Path) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        let content = remove_json_comments(&content);
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }
}

/// Effective build settings: flags first, then the config file, then defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    pub workspace: Utf8PathBuf,
    pub out_dir: Utf8PathBuf,
    pub delimiter: String,
    pub ignore: Vec<String>,
    pub emit: bool,
}

impl BuildSettings {
    /// Merges CLI flags over a loaded config.
    pub fn resolve(args: &Args, workspace: Utf8PathBuf, config: StcssConfig) -> Self {
        let out_dir = args
            .out_dir
            .clone()
            .or(config.out_dir)
            .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUT_DIR));
        let out_dir = if out_dir.is_relative() {
            workspace.join(out_dir)
        } else {
            out_dir
        };
        let delimiter = args
            .delimiter
            .clone()
            .or(config.delimiter)
            .unwrap_or_else(|| DEFAULT_DELIMITER.to_string());

        let mut ignore = config.ignore;
        ignore.extend(args.ignore.iter().cloned());

        Self {
            workspace,
            out_dir,
            delimiter,
            ignore,
            emit: !args.no_emit,
        }
    }
}

/// Strips `//` and `/* */` comments outside of strings.
fn remove_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            match c {
                '"' => in_string = false,
                '\\' => result.extend(chars.next()),
                _ => {}
            }
            continue;
        }
        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                while chars.next_if(|&next| next != '\n').is_some() {}
            }
            ('/', Some('*')) => {
                chars.next();
                while let Some(next) = chars.next() {
                    if next == '*' && chars.next_if_eq(&'/').is_some() {
                        break;
                    }
                }
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_remove_comments() {
        let json = r#"{
            // output folder
            "outDir": "lib", /* inline */
            "delimiter": "//"
        }"#;

        let config: StcssConfig =
            serde_json::from_str(&remove_json_comments(json)).expect("valid config");
        assert_eq!(config.out_dir.as_deref().map(|p| p.as_str()), Some("lib"));
        assert_eq!(config.delimiter.as_deref(), Some("//"));
    }

    #[test]
    fn test_missing_config_is_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let workspace = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 path");
        assert_eq!(StcssConfig::load(&workspace), StcssConfig::default());
    }

    #[test]
    fn test_invalid_config_is_default() {
        let dir = tempfile::tempdir().expect("temp dir");
        let workspace = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("utf-8 path");
        fs::write(workspace.join(CONFIG_FILE), r#"{ "outdir": 3 }"#).expect("write config");
        assert_eq!(StcssConfig::load(&workspace), StcssConfig::default());
    }

    #[test]
    fn test_flags_win_over_config() {
        let args = Args::parse_from(["stcss", "--delimiter", "_", "--ignore", "b/**"]);
        let config = StcssConfig {
            delimiter: Some("--".to_string()),
            out_dir: Some(Utf8PathBuf::from("lib")),
            ignore: vec!["a/**".to_string()],
        };

        let settings = BuildSettings::resolve(&args, Utf8PathBuf::from("/work"), config);
        assert_eq!(settings.delimiter, "_");
        assert_eq!(settings.out_dir, Utf8PathBuf::from("/work/lib"));
        assert_eq!(settings.ignore, vec!["a/**".to_string(), "b/**".to_string()]);
        assert!(settings.emit);
    }

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["stcss", "--no-emit"]);
        let settings =
            BuildSettings::resolve(&args, Utf8PathBuf::from("/work"), StcssConfig::default());
        assert_eq!(settings.delimiter, "__");
        assert_eq!(settings.out_dir, Utf8PathBuf::from("/work/dist"));
        assert!(!settings.emit);
    }
}
