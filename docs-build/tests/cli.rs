use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CONF_JSON: &str = r#"{
    "langs": { "en": "English", "de": "Deutsch" },
    "vers": ["v257", "v256"],
    "scopes": { "app": "Reference", "ui": "UI Components" },
    "tname": { "num": "Number" },
    "tdesc": { "num_int": "integer" }
}"#;

/// A docs root whose tools are shell scripts appending their arguments to
/// `<tool>.args`.
fn docs_root(parse_exit: i32) -> TempDir {
    let dir = tempfile::tempdir().expect("temp docs root");
    let root = dir.path();
    fs::create_dir_all(root.join("files")).unwrap();
    fs::write(root.join("files/conf.json"), CONF_JSON).unwrap();
    for tool in ["render", "parse", "pages", "markdown"] {
        let exit = if tool == "parse" { parse_exit } else { 0 };
        fs::write(
            root.join(format!("files/{tool}.sh")),
            format!("printf '%s\\n' \"$*\" >> {tool}.args\necho {tool} ran\nexit {exit}\n"),
        )
        .unwrap();
    }
    fs::write(
        root.join("docs-build.yaml"),
        "interpreter: sh\ntools:\n  render: files/render.sh\n  parse: files/parse.sh\n  update_pages: files/pages.sh\n  markdown_gen: files/markdown.sh\n",
    )
    .unwrap();
    dir
}

fn docs_build(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docs-build").expect("Binary exists");
    cmd.arg("--root").arg(root).env_remove("DOCS_SERVER");
    cmd
}

fn recorded(root: &Path, tool: &str) -> Option<String> {
    fs::read_to_string(root.join(format!("{tool}.args"))).ok()
}

#[test]
fn filter_choices_are_listed() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["filter", "--choices", "language"])
        .assert()
        .success()
        .stdout("en (English)\nde (Deutsch)\n* (all)\n");
}

#[test]
fn filter_target_and_options_combine() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["filter", "de.app", "--version", "v256", "--name", "Create.*"])
        .assert()
        .success()
        .stdout("language: de\nversion: v256\nscope: app\nname: Create.*\n");
}

#[test]
fn invalid_filter_value_fails() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["filter", "--scope", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid scope filter value 'nope'"));
}

#[cfg(unix)]
#[test]
fn generate_parses_then_renders() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["generate", "--language", "de", "--scope", "ui"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$ sh files/parse.sh"))
        .stdout(predicate::str::contains("render ran"))
        .stdout(predicate::str::contains("generateDocs: Done"));

    assert_eq!(recorded(dir.path(), "parse").as_deref(), Some("\n"));
    assert_eq!(recorded(dir.path(), "render").as_deref(), Some("-c de.ui\n"));
}

#[cfg(unix)]
#[test]
fn failed_parse_stops_before_rendering() {
    let dir = docs_root(1);
    docs_build(dir.path())
        .arg("update")
        .assert()
        .failure()
        .stdout(predicate::str::contains("$ Exit Code: 1"))
        .stdout(predicate::str::contains("update: parse step failed (exit code 1)"));

    assert_eq!(recorded(dir.path(), "render"), None);
}

#[cfg(unix)]
#[test]
fn add_variant_renders_without_generating() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["add-variant", "language", "fr (Francais)"])
        .assert()
        .success();

    assert_eq!(
        recorded(dir.path(), "render").as_deref(),
        Some("-n -al=fr=Francais\n")
    );
}

#[test]
fn invalid_variant_is_rejected_before_any_tool_runs() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["add-variant", "language", "french"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Language code must have 2 lower case letters",
        ));

    assert_eq!(recorded(dir.path(), "render"), None);
}

#[cfg(unix)]
#[test]
fn generate_file_targets_one_member() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .args(["generate-file", "files/markup/en/app/CreateButton.md"])
        .assert()
        .success();

    assert_eq!(
        recorded(dir.path(), "parse").as_deref(),
        Some("-p=app.CreateButton\n")
    );
    assert_eq!(
        recorded(dir.path(), "render").as_deref(),
        Some("-c app.CreateButton*\n")
    );
}

#[cfg(unix)]
#[test]
fn update_pages_runs_its_script() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .arg("update-pages")
        .assert()
        .success()
        .stdout(predicate::str::contains("pages ran"));
}

#[test]
fn preview_prints_the_matching_page() {
    let dir = docs_root(0);
    let page = dir.path().join("out/docs/v257/Reference.htm");
    fs::create_dir_all(page.parent().unwrap()).unwrap();
    fs::write(&page, "<html></html>").unwrap();

    docs_build(dir.path())
        .args(["preview", "--scope", "app"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference.htm"));
}

#[test]
fn terms_print_hints() {
    let dir = docs_root(0);
    docs_build(dir.path())
        .arg("terms")
        .assert()
        .success()
        .stdout("num\tNumber\nnum_int\tNumber: integer\n");
}

#[test]
fn missing_conf_json_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    docs_build(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load documentation config"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Layer collecting the debug form of every event.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use docs_build::cli::{run, Cli, Commands};

    let cli = Cli {
        root: std::path::PathBuf::from("does-not-exist"),
        settings: std::path::PathBuf::from("docs-build.yaml"),
        command: Commands::UpdatePages,
    };

    let _ = run(cli).await;

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
