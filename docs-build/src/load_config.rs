/// `load_config` module: reads the workspace settings file (`docs-build.yaml`) and
/// turns it into the toolchain and paths the CLI hands to `docs-build-core`.
///
/// Every field is optional. A missing file yields the stock layout of a docs
/// checkout: generator scripts under `files/`, run with `node`, `conf.json` next
/// to them and generated pages under `out/`.
///
/// # Errors
/// A file that exists but cannot be read or parsed is an `anyhow::Error` with the
/// path in its message; the CLI surfaces it unchanged.
use anyhow::Result;
use docs_build_core::orchestrator::{ToolCommand, Toolchain};
use docs_build_core::upload::DEFAULT_UPLOAD_CONCURRENCY;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Name of the settings file looked up in the docs root.
pub const SETTINGS_FILE: &str = "docs-build.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Program used to run the tool scripts. `null` runs them directly.
    pub interpreter: Option<String>,
    /// Documentation tables, relative to the docs root.
    pub config: PathBuf,
    pub tools: ToolPaths,
    pub upload: UploadSection,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interpreter: Some("node".to_string()),
            config: PathBuf::from("files/conf.json"),
            tools: ToolPaths::default(),
            upload: UploadSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub render: PathBuf,
    pub parse: PathBuf,
    pub update_pages: PathBuf,
    pub markdown_gen: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            render: PathBuf::from("files/generate.js"),
            parse: PathBuf::from("files/jsdoc-parser.js"),
            update_pages: PathBuf::from("files/updatePages.js"),
            markdown_gen: PathBuf::from("files/markdown-generator.js"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    /// JSON file holding `serverIP` and `PORT`; `~/` is expanded.
    pub settings_file: String,
    /// Folder whose files are uploaded.
    pub output_dir: PathBuf,
    pub concurrency: usize,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            settings_file: "upload.json".to_string(),
            output_dir: PathBuf::from("out"),
            concurrency: DEFAULT_UPLOAD_CONCURRENCY,
        }
    }
}

impl Settings {
    /// Tool invocations for the orchestrator. Script paths stay relative; tools
    /// run with the docs root as their working directory.
    pub fn toolchain(&self) -> Toolchain {
        let interpreter = self.interpreter.as_deref().filter(|i| !i.is_empty());
        Toolchain {
            render: ToolCommand::script(interpreter, &self.tools.render),
            parse: ToolCommand::script(interpreter, &self.tools.parse),
            update_pages: ToolCommand::script(interpreter, &self.tools.update_pages),
            markdown_gen: ToolCommand::script(interpreter, &self.tools.markdown_gen),
        }
    }

    pub fn config_path(&self, root: &Path) -> PathBuf {
        root.join(&self.config)
    }
}

/// Loads settings from `path`, falling back to [`Settings::default`] when the
/// file does not exist.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!(settings_path = ?path_ref, "No settings file, using defaults");
        return Ok(Settings::default());
    }
    info!(settings_path = ?path_ref, "Loading settings from file");

    let content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, settings_path = ?path_ref, "Failed to read settings file");
            return Err(anyhow::anyhow!(
                "Failed to read settings file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty document deserialises as unit, not as a map.
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }

    match serde_yaml::from_str::<Settings>(&content) {
        Ok(settings) => {
            info!(settings_path = ?path_ref, ?settings, "Parsed settings YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, settings_path = ?path_ref, "Failed to parse settings YAML");
            Err(anyhow::anyhow!("Failed to parse settings YAML: {e}"))
        }
    }
}
