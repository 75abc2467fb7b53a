//! Demo catalog: small but real pre-compile plugins.
//!
//! | Id | Tags | Requires |
//! |----|------|----------|
//! | `cleaner` | clean | |
//! | `required-files` | validation, presence | |
//! | `manifest` | generate | `cleaner` |
//! | `license-headers` | license, header | `required-files` |
//! | `trailing-whitespace` | lint, style | |
//!
//! Each plugin reads its settings from a section of the configuration map
//! named after the plugin (e.g. `license_headers`).

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use preflight_plugin::compat::HostComponent;
use preflight_plugin::{HookError, MetaError, Plugin, PluginMeta, PreCompileContext};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Minimum orchestrator version the demo plugins declare.
const REQUIRED_ORCHESTRATOR: &str = "2.0.0";

fn demo_meta(id: &str, name: &str, description: &str, tags: &[&str]) -> Result<PluginMeta, MetaError> {
    Ok(PluginMeta::new(id, name, "1.0.0")?
        .with_description(description)
        .with_author("preflight")
        .with_tags(tags)
        .with_requirement(HostComponent::Orchestrator, REQUIRED_ORCHESTRATOR))
}

/// Reads the settings section `key`, falling back to defaults on absence or
/// a malformed section.
fn section<T: DeserializeOwned + Default>(ctx: &PreCompileContext, key: &str) -> T {
    let Some(value) = ctx.config().get(key) else {
        return T::default();
    };
    serde_json::from_value(value.clone()).unwrap_or_else(|error| {
        tracing::warn!(section = key, %error, "ignoring malformed plugin settings");
        T::default()
    })
}

fn relative<'a>(ctx: &PreCompileContext, path: &'a Path) -> &'a Path {
    path.strip_prefix(ctx.project_root()).unwrap_or(path)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Joins at most `limit` paths for an error message.
fn preview(paths: &[PathBuf], limit: usize) -> String {
    let mut shown: Vec<String> = paths
        .iter()
        .take(limit)
        .map(|p| p.display().to_string())
        .collect();
    if paths.len() > limit {
        shown.push(format!("and {} more", paths.len() - limit));
    }
    shown.join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Cleaner
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CleanerSettings {
    patterns: Vec<String>,
}

impl Default for CleanerSettings {
    fn default() -> Self {
        Self {
            patterns: vec!["**/*.pyc".into(), "**/*.tmp".into(), "**/*~".into()],
        }
    }
}

/// Deletes build leftovers matching the `cleaner.patterns` globs.
pub struct Cleaner {
    meta: PluginMeta,
}

impl Cleaner {
    /// Creates the plugin.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            meta: demo_meta("cleaner", "Cleaner", "Remove stale build leftovers", &["clean"])?,
        })
    }
}

impl Plugin for Cleaner {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        if !ctx.is_workspace_valid() {
            tracing::warn!(root = %ctx.project_root().display(), "workspace is not a directory, nothing to clean");
            return Ok(());
        }

        let settings: CleanerSettings = section(ctx, "cleaner");
        let mut removed = 0usize;
        for path in ctx.iter_files(&settings.patterns, &ctx.exclude_patterns()).iter() {
            match fs::remove_file(path) {
                Ok(()) => removed += 1,
                Err(error) => {
                    tracing::warn!(path = %relative(ctx, path).display(), %error, "failed to remove file");
                }
            }
        }

        tracing::info!(workspace = %ctx.workspace_name(), removed, "workspace cleaned");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequiredFiles
// ─────────────────────────────────────────────────────────────────────────────

/// Fails when a file listed under `required_files` is missing.
pub struct RequiredFiles {
    meta: PluginMeta,
}

impl RequiredFiles {
    /// Creates the plugin.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            meta: demo_meta(
                "required-files",
                "Required files",
                "Check that every required file exists",
                &["validation", "presence"],
            )?,
        })
    }
}

impl Plugin for RequiredFiles {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        let missing: Vec<String> = ctx
            .required_files()
            .into_iter()
            .filter(|name| !ctx.has_required_file(name))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HookError::msg(format!("missing required files: {}", missing.join(", "))))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Manifest
// ─────────────────────────────────────────────────────────────────────────────

/// Where [`Manifest`] writes its output, relative to the project root.
pub const MANIFEST_PATH: &str = ".preflight/manifest.json";

#[derive(Debug, serde::Serialize)]
struct ManifestEntry {
    path: String,
    bytes: u64,
}

/// Writes a JSON listing of the project files selected by `file_patterns`.
pub struct Manifest {
    meta: PluginMeta,
}

impl Manifest {
    /// Creates the plugin.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            meta: demo_meta("manifest", "Manifest", "Write a manifest of project files", &["generate"])?,
        })
    }
}

impl Plugin for Manifest {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn requires(&self) -> Vec<String> {
        vec!["cleaner".into()]
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        let mut exclude = ctx.exclude_patterns();
        exclude.push(".preflight/**".into());

        let mut entries = Vec::new();
        for path in ctx.iter_files(&ctx.file_patterns(), &exclude).iter() {
            let bytes = fs::metadata(path)?.len();
            entries.push(ManifestEntry {
                path: relative(ctx, path).to_string_lossy().replace('\\', "/"),
                bytes,
            });
        }

        let target = ctx.project_root().join(MANIFEST_PATH);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&entries).map_err(HookError::other)?;
        fs::write(&target, json)?;

        tracing::info!(files = entries.len(), path = MANIFEST_PATH, "manifest written");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LicenseHeaders
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HeaderSettings {
    marker: String,
    extensions: Vec<String>,
    lines: usize,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            marker: "SPDX-License-Identifier".into(),
            extensions: vec!["rs".into(), "py".into()],
            lines: 5,
        }
    }
}

/// Fails when a source file lacks the license marker near its top.
pub struct LicenseHeaders {
    meta: PluginMeta,
}

impl LicenseHeaders {
    /// Creates the plugin.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            meta: demo_meta(
                "license-headers",
                "License headers",
                "Check that source files carry a license header",
                &["license", "header"],
            )?,
        })
    }
}

fn head_contains(path: &Path, marker: &str, lines: usize) -> std::io::Result<bool> {
    let reader = BufReader::new(fs::File::open(path)?);
    for line in reader.lines().take(lines) {
        if line?.contains(marker) {
            return Ok(true);
        }
    }
    Ok(false)
}

impl Plugin for LicenseHeaders {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn requires(&self) -> Vec<String> {
        vec!["required-files".into()]
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        let settings: HeaderSettings = section(ctx, "license_headers");

        let mut missing = Vec::new();
        for path in ctx.iter_files(&ctx.file_patterns(), &ctx.exclude_patterns()).iter() {
            if ctx.is_cancelled() {
                return Err(HookError::msg("cancelled"));
            }
            if !has_extension(path, &settings.extensions) {
                continue;
            }
            match head_contains(path, &settings.marker, settings.lines) {
                Ok(true) => {}
                Ok(false) => missing.push(relative(ctx, path).to_path_buf()),
                // Binary or unreadable files cannot carry a header.
                Err(error) => tracing::debug!(path = %path.display(), %error, "skipping unreadable file"),
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HookError::msg(format!(
                "{} file(s) without license header: {}",
                missing.len(),
                preview(&missing, 5)
            )))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TrailingWhitespace
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WhitespaceSettings {
    extensions: Vec<String>,
}

impl Default for WhitespaceSettings {
    fn default() -> Self {
        Self {
            extensions: ["rs", "py", "toml", "md"].map(String::from).to_vec(),
        }
    }
}

/// Fails when a text file has lines ending in spaces or tabs.
pub struct TrailingWhitespace {
    meta: PluginMeta,
}

impl TrailingWhitespace {
    /// Creates the plugin.
    pub fn new() -> Result<Self, MetaError> {
        Ok(Self {
            meta: demo_meta(
                "trailing-whitespace",
                "Trailing whitespace",
                "Report lines with trailing whitespace",
                &["lint", "style"],
            )?,
        })
    }
}

impl Plugin for TrailingWhitespace {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn on_pre_compile(&self, ctx: &PreCompileContext) -> Result<(), HookError> {
        let settings: WhitespaceSettings = section(ctx, "trailing_whitespace");

        let mut offenders = Vec::new();
        let mut lines = 0usize;
        for path in ctx.iter_files(&ctx.file_patterns(), &ctx.exclude_patterns()).iter() {
            if ctx.is_cancelled() {
                return Err(HookError::msg("cancelled"));
            }
            if !has_extension(path, &settings.extensions) {
                continue;
            }
            let Ok(text) = fs::read_to_string(path) else {
                continue;
            };
            let count = text
                .lines()
                .filter(|line| line.ends_with([' ', '\t']))
                .count();
            if count > 0 {
                lines += count;
                offenders.push(relative(ctx, path).to_path_buf());
            }
        }

        if offenders.is_empty() {
            Ok(())
        } else {
            Err(HookError::msg(format!(
                "{lines} line(s) with trailing whitespace in {}",
                preview(&offenders, 5)
            )))
        }
    }
}
