//! End-to-end tests running the `stcss` binary over temporary workspaces.

use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(full, content).expect("write fixture");
    }
    dir
}

fn stcss(dir: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stcss"))
        .arg("--workspace")
        .arg(dir)
        .args(extra)
        .env_remove("STCSS_LOG")
        .output()
        .expect("run stcss")
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("exports file");
    serde_json::from_str(&text).expect("valid json")
}

#[test]
fn test_writes_css_and_exports() {
    let dir = workspace(&[
        (
            "src/button.st.css",
            "@namespace \"btn\";\n:vars { color: red; }\n.root { color: value(color); }\n.icon {}\n",
        ),
        ("node_modules/pkg/skip.st.css", ".root {}"),
    ]);

    let output = stcss(dir.path(), &[]);
    assert!(output.status.success(), "{output:?}");

    let css = fs::read_to_string(dir.path().join("dist/src/button.css")).expect("css output");
    assert!(css.contains(".btn__root {"));
    assert!(css.contains("color: red;"));
    assert!(css.contains(".btn__root .btn__icon {}"));

    let exports = read_json(&dir.path().join("dist/src/button.json"));
    assert_eq!(exports["root"], "btn__root");
    assert_eq!(exports["icon"], "btn__icon");
    assert_eq!(exports["color"], "red");

    assert!(!dir.path().join("dist/node_modules").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("stcss found 0 errors and 0 warnings in 1 file"));
}

#[test]
fn test_config_file_and_flags() {
    let dir = workspace(&[
        (
            "stcss.config.json",
            r#"{
                // build settings
                "outDir": "lib",
                "delimiter": "-",
                "ignore": ["legacy/**"]
            }"#,
        ),
        ("a.st.css", "@namespace \"a\";\n.part {}\n"),
        ("legacy/old.st.css", ".root {}"),
    ]);

    let output = stcss(dir.path(), &[]);
    assert!(output.status.success(), "{output:?}");
    let exports = read_json(&dir.path().join("lib/a.json"));
    assert_eq!(exports["part"], "a-part");
    assert!(!dir.path().join("lib/legacy").exists());

    let output = stcss(dir.path(), &["--delimiter", "_", "--out-dir", "out"]);
    assert!(output.status.success(), "{output:?}");
    let exports = read_json(&dir.path().join("out/a.json"));
    assert_eq!(exports["part"], "a_part");
}

#[test]
fn test_reports_errors_as_json() {
    let dir = workspace(&[(
        "broken.st.css",
        ":import { -st-from: \"./missing.st.css\"; -st-named: gone; }\n.root {}\n",
    )]);

    let output = stcss(dir.path(), &["--output", "json", "--no-emit"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let diagnostics: Value = serde_json::from_str(&stdout).expect("json diagnostics");
    let codes: Vec<&str> = diagnostics
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|d| d["code"].as_str())
        .collect();
    assert!(codes.contains(&"unknown-import"), "{codes:?}");
    assert_eq!(diagnostics[0]["filename"], "broken.st.css");
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_exit_status() {
    let dir = workspace(&[(
        "a.st.css",
        ":import { -st-from: \"./missing.st.css\"; -st-default: Missing; }\n.root {}\n",
    )]);

    let output = stcss(dir.path(), &["--output", "machine", "--no-emit"]);
    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("WARNING a.st.css:1:"), "{stdout}");

    let strict = stcss(dir.path(), &["--no-emit", "--fail-on-warnings"]);
    assert!(!strict.status.success());

    let dir = workspace(&[("b.st.css", ".root { color: value(nope); }\n")]);
    let output = stcss(dir.path(), &["--no-emit"]);
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(unknown-var)"), "{stdout}");
}
