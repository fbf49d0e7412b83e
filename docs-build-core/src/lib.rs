#![doc = "docs-build-core: core logic library for docs-build."]

//! This crate contains the filter state, generator invocations, process streaming,
//! bounded batch scheduling and upload pipeline behind the `docs-build` CLI.
//! Nothing here renders output for a user; callers supply log sinks and hooks.
//!
//! # Usage
//! Add this as a dependency for anything that drives documentation builds or uploads.

pub mod batch;
pub mod command;
pub mod config;
pub mod contract;
pub mod filter;
pub mod glossary;
pub mod orchestrator;
pub mod preview;
pub mod process;
pub mod upload;
pub mod variant;
