//! # contract: seams between the core and its collaborators
//!
//! The orchestrator and upload pipeline talk to the outside world only through
//! the traits in this module:
//! - [`CommandRunner`] runs an external tool and reports its exit code.
//! - [`LogSink`] receives ANSI-stripped output chunks as they are produced.
//! - [`PostBuildHook`] is told, by identifier, when to end or open a preview.
//! - [`Uploader`] pushes one file to the documentation server.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so tests can script runs, hooks and
//!   uploads without child processes or a network.

use async_trait::async_trait;
use std::fmt;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::filter::FilterState;
use crate::process::{LogChunk, ProcessError, ProcessResult};
use crate::upload::{ServerAddress, UploadError};

/// Runs one external command to completion.
///
/// A non-zero exit code is a successful run with data the caller branches on;
/// errors are reserved for commands that could not be started or were killed.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String]) -> Result<ProcessResult, ProcessError>;
}

/// Destination for process output.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait LogSink: Send + Sync {
    fn append(&self, chunk: &LogChunk);
}

/// Side effects owned by the host, triggered around a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookId {
    /// Stop any running preview before pages are regenerated.
    EndPreview,
    /// Open the preview for the current filter.
    OpenPreview,
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookId::EndPreview => f.write_str("end-preview"),
            HookId::OpenPreview => f.write_str("open-preview"),
        }
    }
}

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait PostBuildHook: Send + Sync {
    /// Invoke the hook. Failures are reported but never change a build outcome.
    async fn invoke(
        &self,
        hook: HookId,
        filter: &FilterState,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Pushes a single file to the documentation server.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Uploader: Send + Sync {
    /// Upload `content` as multipart field `field` with file name `file_name`.
    /// Succeeds only when the server acknowledges with an "ok" status.
    async fn upload_one(
        &self,
        server: &ServerAddress,
        field: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), UploadError>;
}
