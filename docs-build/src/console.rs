//! Terminal-facing collaborators: the tool log sink and the preview hook.

use async_trait::async_trait;
use docs_build_core::config::DocsConfig;
use docs_build_core::contract::{HookId, LogSink, PostBuildHook};
use docs_build_core::filter::FilterState;
use docs_build_core::preview::resolve_preview_path;
use docs_build_core::process::{LogChunk, OutputStream};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Streams tool output to the terminal as it arrives. Tool stderr goes to the
/// process's stderr; everything else to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn append(&self, chunk: &LogChunk) {
        let written = match chunk.stream {
            OutputStream::Stderr => {
                let mut err = std::io::stderr().lock();
                err.write_all(chunk.text.as_bytes()).and_then(|_| err.flush())
            }
            OutputStream::Stdout | OutputStream::Runner => {
                let mut out = std::io::stdout().lock();
                out.write_all(chunk.text.as_bytes()).and_then(|_| out.flush())
            }
        };
        if let Err(e) = written {
            warn!(error = %e, "Failed to write tool output");
        }
    }
}

/// Reports the generated page matching the filter. There is no long-running
/// preview server in the CLI, so ending a preview is a no-op.
pub struct PreviewHook {
    root: PathBuf,
    config: DocsConfig,
}

impl PreviewHook {
    pub fn new(root: PathBuf, config: DocsConfig) -> Self {
        Self { root, config }
    }
}

#[async_trait]
impl PostBuildHook for PreviewHook {
    async fn invoke(
        &self,
        hook: HookId,
        filter: &FilterState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        match hook {
            HookId::EndPreview => {
                info!(%hook, "Nothing to end, no preview server is managed by the CLI");
                Ok(())
            }
            HookId::OpenPreview => match resolve_preview_path(&self.root, &self.config, filter) {
                Some(page) => {
                    println!("Preview: {}", page.display());
                    Ok(())
                }
                None => Err(format!(
                    "no generated page under {} for the current filter",
                    self.root.join("out").display()
                )
                .into()),
            },
        }
    }
}
