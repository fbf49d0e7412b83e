use docs_build::load_config::{load_settings, Settings};
use std::fs::write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[test]
fn missing_settings_file_yields_stock_layout() {
    let dir = tempfile::tempdir().unwrap();
    let settings = load_settings(dir.path().join("docs-build.yaml")).expect("defaults");
    assert_eq!(settings, Settings::default());

    let tools = settings.toolchain();
    assert_eq!(tools.render.program, "node");
    assert_eq!(tools.render.args, vec!["files/generate.js"]);
    assert_eq!(tools.parse.args, vec!["files/jsdoc-parser.js"]);
    assert_eq!(tools.update_pages.args, vec!["files/updatePages.js"]);
    assert_eq!(tools.markdown_gen.args, vec!["files/markdown-generator.js"]);
    assert_eq!(
        settings.config_path(Path::new("/docs")),
        PathBuf::from("/docs/files/conf.json")
    );
    assert_eq!(settings.upload.settings_file, "upload.json");
    assert_eq!(settings.upload.concurrency, 10);
}

#[test]
fn partial_settings_keep_remaining_defaults() {
    let yaml = r#"
interpreter: /usr/local/bin/node
tools:
  render: scripts/generate.js
upload:
  concurrency: 4
  output_dir: out/docs
"#;
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();

    let settings = load_settings(file.path()).expect("Settings should load");
    assert_eq!(settings.interpreter.as_deref(), Some("/usr/local/bin/node"));
    assert_eq!(settings.tools.render, PathBuf::from("scripts/generate.js"));
    assert_eq!(settings.tools.parse, PathBuf::from("files/jsdoc-parser.js"));
    assert_eq!(settings.upload.concurrency, 4);
    assert_eq!(settings.upload.output_dir, PathBuf::from("out/docs"));
    assert_eq!(settings.upload.settings_file, "upload.json");
}

#[test]
fn null_interpreter_runs_scripts_directly() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), "interpreter: null\ntools:\n  parse: bin/parse\n").unwrap();

    let tools = load_settings(file.path()).unwrap().toolchain();
    assert_eq!(tools.parse.program, "bin/parse");
    assert!(tools.parse.args.is_empty());
}

#[test]
fn empty_settings_file_is_allowed() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), "\n").unwrap();
    assert_eq!(load_settings(file.path()).unwrap(), Settings::default());
}

#[test]
fn malformed_settings_fail_with_context() {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), "upload:\n  concurrency: many\n").unwrap();

    let err = load_settings(file.path()).unwrap_err();
    assert!(
        err.to_string().contains("Failed to parse settings YAML"),
        "unexpected error: {err}"
    );
}
