//! Upload pipeline: server addresses, upload settings and batched uploads.
//!
//! The transport lives behind [`Uploader`](crate::contract::Uploader); this module
//! only decides what to send and fans it out through [`BoundedBatchScheduler`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::{error, info};

use crate::batch::{BatchReport, BoundedBatchScheduler};
use crate::contract::Uploader;

/// Concurrency used when none is configured.
pub const DEFAULT_UPLOAD_CONCURRENCY: usize = 10;

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}$").unwrap());
static IPV4_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}){3}:\d+$").unwrap());
static HOST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]*(\.[A-Za-z0-9-]+)*(:\d+)?$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid server address '{0}'")]
    InvalidAddress(String),
    #[error("upload of {file_name} failed: {reason}")]
    Network { file_name: String, reason: String },
    #[error("server rejected {file_name} (HTTP {status}): {body}")]
    Rejected {
        file_name: String,
        status: u16,
        body: String,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `host[:port]` of the documentation server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress(String);

impl ServerAddress {
    pub fn parse(raw: &str) -> Result<Self, UploadError> {
        let raw = raw.trim();
        if IPV4_RE.is_match(raw) || IPV4_PORT_RE.is_match(raw) || HOST_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(UploadError::InvalidAddress(raw.to_string()))
        }
    }

    /// Combines an address without port and a separate port, as stored in
    /// `upload.json`.
    pub fn with_port(host: &str, port: Option<&str>) -> Result<Self, UploadError> {
        match port.map(str::trim).filter(|p| !p.is_empty()) {
            Some(port) if !host.contains(':') => Self::parse(&format!("{host}:{port}")),
            _ => Self::parse(host),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn upload_url(&self) -> String {
        format!("http://{}/upload", self.0)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServerAddress {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Contents of `upload.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    #[serde(rename = "serverIP", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(rename = "PORT", default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

impl UploadSettings {
    pub fn server(&self) -> Result<Option<ServerAddress>, UploadError> {
        self.server_ip
            .as_deref()
            .map(|ip| ServerAddress::with_port(ip, self.port.as_deref()))
            .transpose()
    }
}

/// One file to push: the multipart field is the folder/category it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug)]
pub struct UploadReport {
    pub file_names: Vec<String>,
    pub batch: BatchReport<(), UploadError>,
}

impl UploadReport {
    pub fn uploaded(&self) -> usize {
        self.batch.success_count()
    }

    /// `(file name, reason)` for every failed upload.
    pub fn failures(&self) -> Vec<(&str, String)> {
        self.batch
            .failures()
            .map(|(i, e)| (self.file_names[i].as_str(), e.to_string()))
            .collect()
    }

    pub fn summary(&self) -> String {
        let failed = self.batch.len() - self.uploaded();
        if failed == 0 {
            format!("Uploaded {} files", self.uploaded())
        } else {
            format!(
                "Uploaded {} of {} files, {} failed",
                self.uploaded(),
                self.batch.len(),
                failed
            )
        }
    }
}

/// Pushes every file with at most `concurrency` requests in flight. A failed file
/// is recorded and the rest continue.
pub async fn upload_many<U>(
    uploader: &U,
    server: &ServerAddress,
    files: Vec<UploadFile>,
    concurrency: usize,
) -> UploadReport
where
    U: Uploader + ?Sized,
{
    info!(server = %server, files = files.len(), concurrency, "[UPLOAD] Starting batch upload");
    let file_names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
    let batch = BoundedBatchScheduler::new(concurrency)
        .run(files, |file, index| async move {
            let result = uploader
                .upload_one(server, &file.field, &file.file_name, file.content)
                .await;
            if let Err(e) = &result {
                error!(index, file = %file.file_name, error = %e, "[UPLOAD] File failed");
            }
            result
        })
        .await;
    let report = UploadReport { file_names, batch };
    info!(summary = %report.summary(), "[UPLOAD] Batch upload finished");
    report
}

/// Collects every file below `dir`, using each file's parent folder name as its
/// multipart field. Files directly in `dir` use `default_field`.
pub fn collect_upload_files(dir: &Path, default_field: &str) -> Result<Vec<UploadFile>, UploadError> {
    let mut files = Vec::new();
    collect_into(dir, dir, default_field, &mut files)?;
    files.sort_by(|a, b| (&a.field, &a.file_name).cmp(&(&b.field, &b.file_name)));
    Ok(files)
}

fn collect_into(
    root: &Path,
    dir: &Path,
    default_field: &str,
    files: &mut Vec<UploadFile>,
) -> Result<(), UploadError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| UploadError::Io { path, source }
    };
    for entry in std::fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_err(&path))?;
        if file_type.is_dir() {
            collect_into(root, &path, default_field, files)?;
            continue;
        }
        // Links are uploaded only when they point at a regular file.
        if file_type.is_symlink() && !path.is_file() {
            continue;
        }
        let field = if dir == root {
            default_field.to_string()
        } else {
            dir.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| default_field.to_string())
        };
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let content = std::fs::read(&path).map_err(io_err(&path))?;
        files.push(UploadFile {
            field,
            file_name,
            content,
        });
    }
    Ok(())
}
