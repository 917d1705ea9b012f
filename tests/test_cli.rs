use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::{TempDir, tempdir};

const ITEMS: &str = r#"[
    {name: "ubuntu-24.04-desktop-amd64.iso", size: 6000000000, done: 100.0, is_complete: true, tagged: "linux", alias: "UBU"},
    {name: "debian-12-netinst.iso", size: 650000000, done: 40.0, is_complete: false, tagged: "linux", alias: "DEB"},
    {name: "Some.Show.S01E02.720p.mkv", size: 1200000000, done: 100.0, is_complete: true, tagged: "tv", alias: "TV"},
]"#;

fn bin() -> &'static str {
    env!("CARGO_BIN_EXE_rtquery")
}

fn write_file(path: &Path, content: &str) {
    fs::write(path, content).expect("failed to write test file");
}

fn items_file(content: &str) -> (TempDir, PathBuf) {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("items.json5");
    write_file(&path, content);
    (dir, path)
}

fn run(args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .env_remove("RTQUERY_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_text_output_lists_matching_items() {
    let (_dir, items) = items_file(ITEMS);
    let output = run(&[items.to_str().expect("utf8 path"), "size>1g"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("ubuntu-24.04"), "{text}");
    assert!(text.contains("Some.Show"), "{text}");
    assert!(!text.contains("debian"), "{text}");
    assert!(text.trim_end().ends_with("(2 items)"), "{text}");
}

#[test]
fn test_json_output_with_selected_fields() {
    let (_dir, items) = items_file(ITEMS);
    let output = run(&[
        "-O",
        "json",
        "-o",
        "name,alias",
        items.to_str().expect("utf8 path"),
        "tagged=linux",
        "is_complete=no",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    assert_eq!(
        parsed,
        serde_json::json!([{"name": "debian-12-netinst.iso", "alias": "DEB"}])
    );
}

#[test]
fn test_grouped_conditions_and_show_filter() {
    let (_dir, items) = items_file(ITEMS);
    let output = run(&[
        "--show-filter",
        "-O",
        "json",
        "-o",
        "alias",
        items.to_str().expect("utf8 path"),
        "[",
        "alias=TV",
        "OR",
        "done<50",
        "]",
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("[ alias=TV OR done=-50 ]"), "{}", stderr(&output));
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    assert_eq!(parsed, serde_json::json!([{"alias": "DEB"}, {"alias": "TV"}]));
}

#[test]
fn test_bare_words_use_the_default_field() {
    let (_dir, items) = items_file(ITEMS);
    let path = items.to_str().expect("utf8 path");
    let output = run(&["-O", "json", "-o", "alias", path, "*netinst*"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    assert_eq!(parsed, serde_json::json!([{"alias": "DEB"}]));

    let output = run(&[
        "-d",
        "alias",
        "-O",
        "json",
        "-o",
        "alias",
        items.to_str().expect("utf8 path"),
        "U*",
    ]);
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    assert_eq!(parsed, serde_json::json!([{"alias": "UBU"}]));
}

#[test]
fn test_invalid_condition_fails() {
    let (_dir, items) = items_file(ITEMS);
    let output = run(&[items.to_str().expect("utf8 path"), "nosuchfield=1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown field 'nosuchfield'"), "{}", stderr(&output));

    let output = run(&[items.to_str().expect("utf8 path"), "[", "alias=TV"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("too many open"), "{}", stderr(&output));
}

#[test]
fn test_unreadable_items_are_skipped_unless_strict() {
    let (_dir, items) =
        items_file(r#"[{name: "a", size: 10}, {name: "b", size: "huge"}, {name: "c", size: 30}]"#);
    let path = items.to_str().expect("utf8 path");

    let output = run(&["-O", "json", "-o", "name", path, "size=+5"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Skipped 1 item(s)"), "{}", stderr(&output));
    let parsed: Value = serde_json::from_str(&stdout(&output)).expect("JSON output");
    assert_eq!(parsed, serde_json::json!([{"name": "a"}, {"name": "c"}]));

    let output = run(&["--strict", path, "size=+5"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Item #1"), "{}", stderr(&output));
}

#[test]
fn test_list_fields_with_custom_config() {
    let dir = tempdir().expect("temp dir");
    let config = dir.path().join("rtquery.toml");
    write_file(
        &config,
        "[[custom_fields]]\nname = \"category\"\nmatcher = \"text\"\ndoc = \"content category\"\n",
    );

    let output = run(&["--list-fields", "-c", config.to_str().expect("utf8 path")]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let listing = stdout(&output);
    for name in ["category", "content category", "is_complete", "kind", "traits"] {
        assert!(listing.contains(name), "missing {name}");
    }
}

#[test]
fn test_missing_items_file() {
    let dir = tempdir().expect("temp dir");
    let output = run(&[dir.path().join("absent.json").to_str().expect("utf8 path")]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("absent.json"), "{}", stderr(&output));
}
