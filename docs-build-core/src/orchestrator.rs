//! Build orchestration: parse, then render, then hooks.
//!
//! [`BuildOrchestrator`] turns an [`Action`] into one or two tool runs:
//!   - Generate and update run the parser first; a non-zero exit or launch
//!     failure ends the run there and the render tool never starts.
//!   - The render tool gets its arguments from [`render_command`].
//!   - With no name filter, a successful generate/update ends any running preview
//!     after parsing and opens one after rendering.
//!
//! Phases move `Idle -> Parsing -> Rendering -> Idle`. Nothing is retried.
//! Tool output goes to whatever sink the [`CommandRunner`] was built with;
//! the returned [`BuildReport`] carries the outcome and a short summary.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::{error, info, warn};

use crate::command::{parse_command, render_command, BuildOptions, CommandLine};
use crate::config::DocsConfig;
use crate::contract::{CommandRunner, HookId, PostBuildHook};
use crate::filter::{Dimension, FilterError, FilterState};
use crate::process::ProcessError;
use crate::variant::Variant;

/// An external tool: a program plus leading arguments, usually an interpreter
/// and a script path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// `interpreter script` or just `script` when no interpreter is set.
    pub fn script(interpreter: Option<&str>, script: &Path) -> Self {
        let script = script.to_string_lossy().into_owned();
        match interpreter {
            Some(interpreter) => Self {
                program: interpreter.to_string(),
                args: vec![script],
            },
            None => Self::new(script),
        }
    }

    fn argv_with(&self, command: &CommandLine) -> Vec<String> {
        self.args.iter().cloned().chain(command.argv()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Page generator (`generate.js`).
    pub render: ToolCommand,
    /// Source parser (`jsdoc-parser.js`).
    pub parse: ToolCommand,
    pub update_pages: ToolCommand,
    pub markdown_gen: ToolCommand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    GenerateDocs,
    Clean,
    Update,
    UpdatePages,
    MarkdownGen,
    AddVariant(Variant),
    /// Filter-only re-render with explicit options; no parse step.
    Render(BuildOptions),
    /// Re-parse and regenerate one markup file.
    GenerateFile(PathBuf),
    Preview,
}

impl Action {
    pub fn id(&self) -> &'static str {
        match self {
            Action::GenerateDocs => "generateDocs",
            Action::Clean => "clean",
            Action::Update => "update",
            Action::UpdatePages => "updatePages",
            Action::MarkdownGen => "markdownGen",
            Action::AddVariant(_) => "addVariant",
            Action::Render(_) => "filter",
            Action::GenerateFile(_) => "generateFile",
            Action::Preview => "preview",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Action::GenerateDocs => "Generate Docs",
            Action::Clean => "Clean",
            Action::Update => "Update",
            Action::UpdatePages => "Update Pages",
            Action::MarkdownGen => "Generate Markdown",
            Action::AddVariant(_) => "Add Variant",
            Action::Render(_) => "Render Filter",
            Action::GenerateFile(_) => "Generate File",
            Action::Preview => "Preview",
        }
    }

    /// Generate and update parse the sources before rendering.
    pub fn requires_parse(&self) -> bool {
        matches!(self, Action::GenerateDocs | Action::Update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Parsing,
    Rendering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Parse,
    Render,
    Script,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStep::Parse => f.write_str("parse"),
            BuildStep::Render => f.write_str("render"),
            BuildStep::Script => f.write_str("script"),
        }
    }
}

#[derive(Debug)]
pub enum FailureReason {
    AbnormalExit { exit_code: i32 },
    Process(ProcessError),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::AbnormalExit { exit_code } => write!(f, "exit code {exit_code}"),
            FailureReason::Process(e) => write!(f, "{e}"),
        }
    }
}

#[derive(Debug)]
pub enum BuildOutcome {
    Success,
    Failed { step: BuildStep, reason: FailureReason },
}

/// One tool run within a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub step: BuildStep,
    pub command: String,
    pub exit_code: Option<i32>,
}

#[derive(Debug)]
pub struct BuildReport {
    pub action: &'static str,
    /// Phases entered during the run, ending with `Idle`.
    pub phases: Vec<BuildPhase>,
    pub steps: Vec<StepRecord>,
    pub hooks: Vec<HookId>,
    pub outcome: BuildOutcome,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, BuildOutcome::Success)
    }

    /// Short human-readable result, distinct from the tool log.
    pub fn summary(&self) -> String {
        match &self.outcome {
            BuildOutcome::Success => format!("{}: Done", self.action),
            BuildOutcome::Failed { step, reason } => {
                format!("{}: {step} step failed ({reason})", self.action)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{0} is not a markup file (expected files/markup/<lang>/<scope>/<member>.<ext>)")]
    NotMarkupFile(PathBuf),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

/// Position of a markup source file: `files/markup/<lang>/<scope>/<member>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupTarget {
    pub language: String,
    pub scope: String,
    pub member: String,
}

pub fn markup_target(path: &Path) -> Option<MarkupTarget> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    let start = parts
        .windows(2)
        .rposition(|w| w[0] == "files" && w[1] == "markup")?
        + 2;
    match &parts[start..] {
        [language, scope, file] => {
            let member = file.split('.').next().unwrap_or_default();
            if member.is_empty() {
                return None;
            }
            Some(MarkupTarget {
                language: language.clone(),
                scope: scope.clone(),
                member: member.to_string(),
            })
        }
        _ => None,
    }
}

pub struct BuildOrchestrator<R, H> {
    runner: R,
    hooks: H,
    tools: Toolchain,
    phase: BuildPhase,
}

impl<R, H> BuildOrchestrator<R, H>
where
    R: CommandRunner,
    H: PostBuildHook,
{
    pub fn new(runner: R, hooks: H, tools: Toolchain) -> Self {
        Self {
            runner,
            hooks,
            tools,
            phase: BuildPhase::Idle,
        }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn tools(&self) -> &Toolchain {
        &self.tools
    }

    /// Runs `action` against the current filter. Input errors (a bad markup path,
    /// a scope outside the configuration) are returned before any tool starts;
    /// tool failures are reported in the [`BuildReport`].
    pub async fn execute(
        &mut self,
        action: Action,
        filter: &mut FilterState,
        config: &DocsConfig,
    ) -> Result<BuildReport, BuildError> {
        filter.set_last_action(action.id());
        info!(action = action.id(), filter = %filter.describe().replace('\n', ", "), "[BUILD] Starting");

        let mut report = BuildReport {
            action: action.id(),
            phases: Vec::new(),
            steps: Vec::new(),
            hooks: Vec::new(),
            outcome: BuildOutcome::Success,
        };

        match &action {
            Action::UpdatePages => {
                let tool = &self.tools.update_pages;
                self.run_step(&mut report, BuildStep::Script, tool, &CommandLine::default())
                    .await;
            }
            Action::MarkdownGen => {
                let tool = &self.tools.markdown_gen;
                self.run_step(&mut report, BuildStep::Script, tool, &CommandLine::default())
                    .await;
            }
            Action::Preview => {
                self.fire_hook(&mut report, HookId::OpenPreview, filter).await;
            }
            Action::GenerateFile(path) => {
                let target =
                    markup_target(path).ok_or_else(|| BuildError::NotMarkupFile(path.clone()))?;
                let mut next = filter.clone();
                next.set_filter(config, Dimension::Scope, &target.scope)?;
                next.set_name_pattern(&target.member)?;
                let single = parse_command(Some((next.scope(), next.name())));
                next.set_name_pattern(&format!("{}*", target.member))?;
                *filter = next;

                if self.parse(&mut report, &single).await {
                    self.render(&mut report, filter, &BuildOptions::clear()).await;
                }
            }
            _ => {
                let options = match &action {
                    Action::GenerateDocs => BuildOptions::clear(),
                    Action::Clean => BuildOptions::clean(),
                    Action::Update => BuildOptions::update(),
                    Action::AddVariant(variant) => BuildOptions::add_variant(variant.clone()),
                    Action::Render(options) => options.clone(),
                    _ => BuildOptions::default(),
                };
                let previewing = action.requires_parse() && !filter.has_name_filter();

                if action.requires_parse() {
                    if !self.parse(&mut report, &parse_command(None)).await {
                        return Ok(self.finish(report));
                    }
                    if previewing {
                        self.fire_hook(&mut report, HookId::EndPreview, filter).await;
                    }
                }
                if self.render(&mut report, filter, &options).await && previewing {
                    self.fire_hook(&mut report, HookId::OpenPreview, filter).await;
                }
            }
        }

        Ok(self.finish(report))
    }

    async fn parse(&mut self, report: &mut BuildReport, command: &CommandLine) -> bool {
        self.enter(report, BuildPhase::Parsing);
        self.run_step(report, BuildStep::Parse, &self.tools.parse, command)
            .await
    }

    async fn render(&mut self, report: &mut BuildReport, filter: &FilterState, options: &BuildOptions) -> bool {
        self.enter(report, BuildPhase::Rendering);
        let command = render_command(filter, options);
        self.run_step(report, BuildStep::Render, &self.tools.render, &command)
            .await
    }

    /// Runs one tool; records it and, on failure, the outcome. Returns whether
    /// the step succeeded.
    async fn run_step(
        &self,
        report: &mut BuildReport,
        step: BuildStep,
        tool: &ToolCommand,
        command: &CommandLine,
    ) -> bool {
        let args = tool.argv_with(command);
        info!(%step, program = %tool.program, command = %command, "[BUILD] Running step");
        let result = self.runner.run(&tool.program, &args).await;
        let (exit_code, failure) = match result {
            Ok(r) if r.success() => (Some(0), None),
            Ok(r) => (
                Some(r.exit_code),
                Some(FailureReason::AbnormalExit {
                    exit_code: r.exit_code,
                }),
            ),
            Err(e) => (None, Some(FailureReason::Process(e))),
        };
        report.steps.push(StepRecord {
            step,
            command: command.to_string(),
            exit_code,
        });
        match failure {
            None => true,
            Some(reason) => {
                error!(%step, %reason, "[BUILD] Step failed");
                report.outcome = BuildOutcome::Failed { step, reason };
                false
            }
        }
    }

    async fn fire_hook(&self, report: &mut BuildReport, hook: HookId, filter: &FilterState) {
        report.hooks.push(hook);
        if let Err(e) = self.hooks.invoke(hook, filter).await {
            warn!(%hook, error = %e, "[BUILD] Hook failed");
        }
    }

    fn enter(&mut self, report: &mut BuildReport, phase: BuildPhase) {
        self.phase = phase;
        report.phases.push(phase);
    }

    fn finish(&mut self, mut report: BuildReport) -> BuildReport {
        self.enter(&mut report, BuildPhase::Idle);
        info!(summary = %report.summary(), "[BUILD] Finished");
        report
    }
}
