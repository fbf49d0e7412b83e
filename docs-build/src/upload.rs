#![doc = "HTTP transport for documentation uploads: implements the core `Uploader` trait with reqwest multipart posts."]
//
//! # Upload client
//!
//! [`HttpUploader`] posts one file per request to `http://<server>/upload` as a
//! multipart form. The form field is the file's category (its folder) and the
//! part carries the file name. The server answers `{"status":"ok"}` on success;
//! any other status or body is a rejection.
//!
//! The server address comes from, in order: an explicit `--server`, the
//! `DOCS_SERVER` environment variable, then the upload settings file
//! (`serverIP` / `PORT`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use docs_build_core::config::{load_json, save_json};
use docs_build_core::contract::Uploader;
use docs_build_core::upload::{ServerAddress, UploadError, UploadSettings};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::env;
use std::path::Path;

/// Environment variable overriding the upload server address.
pub const SERVER_ENV: &str = "DOCS_SERVER";

#[derive(Debug, Deserialize)]
struct UploadAck {
    status: String,
}

#[derive(Debug, Clone, Default)]
pub struct HttpUploader {
    client: reqwest::Client,
}

impl HttpUploader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Uploader for HttpUploader {
    async fn upload_one(
        &self,
        server: &ServerAddress,
        field: &str,
        file_name: &str,
        content: Vec<u8>,
    ) -> Result<(), UploadError> {
        let url = server.upload_url();
        tracing::debug!(%url, field, file_name, bytes = content.len(), "[UPLOAD] Posting file");

        let part = Part::bytes(content).file_name(file_name.to_string());
        let form = Form::new().part(field.to_string(), part);
        let network = |e: reqwest::Error| UploadError::Network {
            file_name: file_name.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(network)?;
        let status = response.status();
        let body = response.text().await.map_err(network)?;

        let acknowledged = status.is_success()
            && serde_json::from_str::<UploadAck>(&body)
                .map(|ack| ack.status == "ok")
                .unwrap_or(false);
        if !acknowledged {
            tracing::error!(file_name, status = status.as_u16(), %body, "[UPLOAD] Server rejected file");
            return Err(UploadError::Rejected {
                file_name: file_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        tracing::info!(file_name, "[UPLOAD] File accepted");
        Ok(())
    }
}

/// Picks the upload server: `explicit`, then `DOCS_SERVER`, then the settings file
/// at `settings_file` (relative to `root`).
pub fn resolve_server(
    explicit: Option<&str>,
    root: &Path,
    settings_file: &str,
) -> Result<ServerAddress> {
    if let Some(raw) = explicit {
        return ServerAddress::parse(raw).context("Invalid --server value");
    }
    if let Ok(raw) = env::var(SERVER_ENV) {
        if !raw.trim().is_empty() {
            tracing::info!(env = SERVER_ENV, "Using upload server from environment");
            return ServerAddress::parse(&raw).with_context(|| format!("Invalid {SERVER_ENV} value"));
        }
    }
    let settings: UploadSettings = load_json(root, settings_file)
        .with_context(|| format!("Failed to load upload settings from {settings_file}"))?;
    settings
        .server()
        .context("Invalid server address in upload settings")?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No upload server configured: pass --server, set {SERVER_ENV} or add serverIP to {settings_file}"
            )
        })
}

/// Stores `server` in the settings file so later uploads can omit it.
pub fn remember_server(server: &ServerAddress, root: &Path, settings_file: &str) -> Result<()> {
    let (ip, port) = match server.as_str().rsplit_once(':') {
        Some((ip, port)) => (ip.to_string(), Some(port.to_string())),
        None => (server.as_str().to_string(), None),
    };
    let settings = UploadSettings {
        server_ip: Some(ip),
        port,
    };
    save_json(root, settings_file, &settings)
        .with_context(|| format!("Failed to save upload settings to {settings_file}"))
}
