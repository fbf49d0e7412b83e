///
/// This module implements the CLI interface for docs-build: command parsing,
/// filter arguments and the async `run` entrypoint.
///
/// All business logic (filter state, generator arguments, process streaming,
/// batching and uploads) lives in the [`docs-build-core`] crate. This module only
/// maps arguments onto it and prints results.
///
/// ## How To Use
/// - From a shell: `docs-build --root <docs checkout> <command>`; see `--help`.
/// - Programmatically and in integration tests: call [`run`] with a constructed [`Cli`].
///
/// Build commands (`generate`, `update`, `clean`, `render`, `add-variant`,
/// `generate-file`, `update-pages`, `markdown-gen`) exit non-zero when a tool fails.
///
/// [`docs-build-core`]: ../../docs-build-core/
use crate::console::{PreviewHook, StdoutSink};
use crate::load_config::{load_settings, Settings, SETTINGS_FILE};
use crate::upload::{remember_server, resolve_server, HttpUploader};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docs_build_core::command::BuildOptions;
use docs_build_core::config::DocsConfig;
use docs_build_core::filter::{Dimension, FilterState};
use docs_build_core::orchestrator::{Action, BuildOrchestrator};
use docs_build_core::process::ProcessRunner;
use docs_build_core::upload::{collect_upload_files, upload_many};
use docs_build_core::variant::{validate_variant, VariantKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// CLI for docs-build: filter, generate, preview and upload documentation.
#[derive(Parser, Debug)]
#[clap(
    name = "docs-build",
    about = "Drive the documentation generator for a filtered subset and upload the result",
    disable_version_flag = true
)]
pub struct Cli {
    /// Root of the docs checkout; tools run from here.
    #[clap(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings file, relative to the root.
    #[clap(long, global = true, default_value = SETTINGS_FILE)]
    pub settings: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Narrowing of the documentation set. Options override the positional target.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// `<lang>.<scope>.<name>` shorthand, e.g. `en.app.Create.*`.
    pub target: Option<String>,
    #[clap(long, short = 'l')]
    pub language: Option<String>,
    #[clap(long = "version", short = 'v')]
    pub version: Option<String>,
    #[clap(long, short = 's')]
    pub scope: Option<String>,
    /// Regular expression matched against member names.
    #[clap(long, short = 'n')]
    pub name: Option<String>,
}

impl FilterArgs {
    pub fn to_state(&self, config: &DocsConfig) -> Result<FilterState> {
        let mut state = FilterState::new();
        if let Some(target) = &self.target {
            state.apply_target(config, target)?;
        }
        let explicit = [
            (Dimension::Language, &self.language),
            (Dimension::Version, &self.version),
            (Dimension::Scope, &self.scope),
            (Dimension::Name, &self.name),
        ];
        for (dimension, value) in explicit {
            if let Some(value) = value {
                state.set_filter(config, dimension, value)?;
            }
        }
        Ok(state)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse the sources, then fully regenerate the filtered pages
    Generate {
        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Parse the sources, then regenerate only changed pages
    Update {
        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Remove previously generated output for the filter
    Clean {
        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Run the generator with explicit options and no parse step
    Render {
        #[clap(flatten)]
        filter: FilterArgs,
        #[clap(long)]
        clean: bool,
        #[clap(long)]
        clear: bool,
        #[clap(long)]
        update: bool,
        #[clap(long)]
        no_generate: bool,
        /// Register a variant first, as `KIND:VALUE` (e.g. `language:de (Deutsch)`)
        #[clap(long)]
        add_variant: Option<String>,
    },
    /// Register a new language, version or scope
    AddVariant {
        /// `language`, `version` or `scope`
        kind: VariantKind,
        /// e.g. `de (Deutsch)`, `v258`, `MUI (Material UI)`
        value: String,
    },
    /// Run the page update script
    UpdatePages,
    /// Run the markdown generator script
    MarkdownGen,
    /// Re-parse and regenerate the member documented by one markup file
    GenerateFile { path: PathBuf },
    /// Print the generated page matching the filter
    Preview {
        #[clap(flatten)]
        filter: FilterArgs,
    },
    /// Show the filter, or the values one dimension accepts
    Filter {
        #[clap(flatten)]
        filter: FilterArgs,
        /// List choices for `language`, `version`, `scope` or `name`
        #[clap(long)]
        choices: Option<Dimension>,
    },
    /// Upload generated files to the documentation server
    Upload {
        /// `host[:port]`; defaults to DOCS_SERVER or the upload settings file
        #[clap(long)]
        server: Option<String>,
        /// Folder to upload, relative to the root
        #[clap(long)]
        dir: Option<PathBuf>,
        #[clap(long)]
        concurrency: Option<usize>,
        /// Save --server to the upload settings file
        #[clap(long, requires = "server")]
        remember: bool,
    },
    /// List glossary terms with their hints
    Terms { term: Option<String> },
}

fn parse_variant_arg(raw: &str) -> Result<(VariantKind, String)> {
    let (kind, value) = raw
        .split_once(':')
        .with_context(|| format!("Expected KIND:VALUE, got '{raw}'"))?;
    let kind: VariantKind = kind.parse().map_err(anyhow::Error::msg)?;
    Ok((kind, value.to_string()))
}

/// Turns a build subcommand into an action and its starting filter.
fn build_action(command: Commands, config: &DocsConfig) -> Result<(Action, FilterState)> {
    let plain = FilterState::new();
    Ok(match command {
        Commands::Generate { filter } => (Action::GenerateDocs, filter.to_state(config)?),
        Commands::Update { filter } => (Action::Update, filter.to_state(config)?),
        Commands::Clean { filter } => (Action::Clean, filter.to_state(config)?),
        Commands::Preview { filter } => (Action::Preview, filter.to_state(config)?),
        Commands::Render {
            filter,
            clean,
            clear,
            update,
            no_generate,
            add_variant,
        } => {
            let add = match add_variant {
                Some(raw) => {
                    let (kind, value) = parse_variant_arg(&raw)?;
                    Some(validate_variant(kind, &value)?)
                }
                None => None,
            };
            let options = BuildOptions {
                clean,
                clear,
                update,
                generate: !no_generate,
                add,
            };
            (Action::Render(options), filter.to_state(config)?)
        }
        Commands::AddVariant { kind, value } => {
            (Action::AddVariant(validate_variant(kind, &value)?), plain)
        }
        Commands::UpdatePages => (Action::UpdatePages, plain),
        Commands::MarkdownGen => (Action::MarkdownGen, plain),
        Commands::GenerateFile { path } => (Action::GenerateFile(path), plain),
        Commands::Filter { .. } | Commands::Upload { .. } | Commands::Terms { .. } => {
            anyhow::bail!("not a build command")
        }
    })
}

/// Async CLI entrypoint for `main()` and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let root = cli.root;
    let settings = load_settings(root.join(&cli.settings))?;

    match cli.command {
        Commands::Upload {
            server,
            dir,
            concurrency,
            remember,
        } => run_upload(&root, &settings, server, dir, concurrency, remember).await,
        command => {
            let config = DocsConfig::load(settings.config_path(&root))
                .context("Failed to load documentation config")?;
            match command {
                Commands::Filter { filter, choices } => {
                    match choices {
                        Some(dimension) => {
                            for choice in FilterState::choices(&config, dimension) {
                                println!("{choice}");
                            }
                        }
                        None => println!("{}", filter.to_state(&config)?.describe()),
                    }
                    Ok(())
                }
                Commands::Terms { term } => {
                    let glossary = config.glossary();
                    let terms: Vec<String> = match term {
                        Some(term) => vec![term],
                        None => glossary.terms().map(str::to_string).collect(),
                    };
                    for term in terms {
                        match glossary.hint(&term) {
                            Some(hint) => println!("{term}\t{hint}"),
                            None => anyhow::bail!("Unknown glossary term '{term}'"),
                        }
                    }
                    Ok(())
                }
                command => run_build(&root, &settings, config, command).await,
            }
        }
    }
}

async fn run_build(
    root: &Path,
    settings: &Settings,
    config: DocsConfig,
    command: Commands,
) -> Result<()> {
    let (action, mut filter) = build_action(command, &config)?;
    let title = action.title();
    tracing::info!(command = title, "Starting build");

    let runner = ProcessRunner::new(Arc::new(StdoutSink)).with_current_dir(root);
    let hooks = PreviewHook::new(root.to_path_buf(), config.clone());
    let mut orchestrator = BuildOrchestrator::new(runner, hooks, settings.toolchain());
    let report = orchestrator.execute(action, &mut filter, &config).await?;

    println!("{}", report.summary());
    if report.is_success() {
        tracing::info!(command = title, "Build complete");
        Ok(())
    } else {
        tracing::error!(command = title, summary = %report.summary(), "Build failed");
        Err(anyhow::anyhow!(report.summary()))
    }
}

async fn run_upload(
    root: &Path,
    settings: &Settings,
    server: Option<String>,
    dir: Option<PathBuf>,
    concurrency: Option<usize>,
    remember: bool,
) -> Result<()> {
    let upload = &settings.upload;
    let server = resolve_server(server.as_deref(), root, &upload.settings_file)?;
    if remember {
        remember_server(&server, root, &upload.settings_file)?;
    }

    let dir = root.join(dir.as_ref().unwrap_or(&upload.output_dir));
    let default_field = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "docs".to_string());
    let files = collect_upload_files(&dir, &default_field)
        .with_context(|| format!("Failed to collect files from {}", dir.display()))?;

    let uploader = HttpUploader::new();
    let concurrency = concurrency.unwrap_or(upload.concurrency);
    let report = upload_many(&uploader, &server, files, concurrency).await;

    for (file_name, reason) in report.failures() {
        eprintln!("{file_name}: {reason}");
    }
    println!("{}", report.summary());
    match report.batch.into_result() {
        Ok(_) => Ok(()),
        Err(failure) => Err(failure.into()),
    }
}
