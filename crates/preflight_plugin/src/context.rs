//! The project view handed to every hook.
//!
//! [`PreCompileContext`] carries the project root and the merged
//! configuration map. It also offers a few workspace helpers plugins
//! commonly need, most notably [`iter_files`](PreCompileContext::iter_files),
//! a glob-based file walker whose results are cached per pattern set for the
//! lifetime of the context.
//!
//! # Configuration keys
//!
//! | Key | Type | Meaning |
//! |-----|------|---------|
//! | `file_patterns` | `[string]` | Include globs, default `["**/*"]` |
//! | `exclude_patterns` | `[string]` | Exclude globs |
//! | `required_files` | `[string]` | Files the workspace must contain |
//! | `options.iter_files_cache` | `bool` | Disable the file cache when `false` |

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// A loaded configuration map.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Include pattern used when none is configured.
const DEFAULT_FILE_PATTERN: &str = "**/*";

type CacheKey = (Vec<String>, Vec<String>);

/// Context passed to [`Plugin::on_pre_compile`](crate::Plugin::on_pre_compile).
///
/// Shared by every hook of a run. Hooks only receive `&self`; the file cache
/// uses interior mutability.
///
/// Long-running hooks should check [`is_cancelled`](Self::is_cancelled)
/// between units of work: a hook running on a thread worker cannot be
/// killed, so on timeout it is asked to stop through this token.
///
/// # Example
///
/// ```
/// use preflight_plugin::{ConfigMap, PreCompileContext};
/// use serde_json::json;
///
/// let config: ConfigMap = serde_json::from_value(json!({
///     "required_files": ["Cargo.toml"],
///     "options": { "sandbox": false }
/// }))
/// .unwrap();
///
/// let ctx = PreCompileContext::new("/work/app").with_config(config);
/// assert_eq!(ctx.workspace_name(), "app");
/// assert_eq!(ctx.required_files(), ["Cargo.toml"]);
/// assert_eq!(ctx.file_patterns(), ["**/*"]);
/// ```
#[derive(Debug)]
pub struct PreCompileContext {
    project_root: PathBuf,
    config: ConfigMap,
    file_cache: Mutex<HashMap<CacheKey, Arc<[PathBuf]>>>,
    cancel: CancellationToken,
}

impl Clone for PreCompileContext {
    /// Clones root, configuration and cancellation token. The clone starts
    /// with an empty cache.
    fn clone(&self) -> Self {
        Self {
            project_root: self.project_root.clone(),
            config: self.config.clone(),
            file_cache: Mutex::default(),
            cancel: self.cancel.clone(),
        }
    }
}

impl PreCompileContext {
    /// Creates a context for a project root with an empty configuration.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config: ConfigMap::new(),
            file_cache: Mutex::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the configuration map.
    #[must_use]
    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }

    /// Replaces the cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` once the hook has been asked to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Layers this context's configuration over `base`.
    ///
    /// Top-level keys present in the context win over those in `base`.
    #[must_use]
    pub fn merged_with(mut self, base: &ConfigMap) -> Self {
        let mut merged = base.clone();
        for (key, value) in core::mem::take(&mut self.config) {
            merged.insert(key, value);
        }
        self.config = merged;
        self.file_cache.get_mut().clear();
        self
    }

    /// Returns the project root.
    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Returns the full configuration map.
    #[must_use]
    pub fn config(&self) -> &ConfigMap {
        &self.config
    }

    /// Returns the `options` section, if present.
    #[must_use]
    pub fn options(&self) -> Option<&ConfigMap> {
        self.config.get("options").and_then(Value::as_object)
    }

    /// Returns one entry of the `options` section.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options().and_then(|o| o.get(key))
    }

    /// Returns the workspace name (the last component of the root).
    #[must_use]
    pub fn workspace_name(&self) -> String {
        self.project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Returns `true` if the root exists and is a directory.
    #[must_use]
    pub fn is_workspace_valid(&self) -> bool {
        self.project_root.is_dir()
    }

    /// Include globs from `file_patterns`, or `["**/*"]`.
    #[must_use]
    pub fn file_patterns(&self) -> Vec<String> {
        let patterns = self.string_list("file_patterns");
        if patterns.is_empty() {
            vec![DEFAULT_FILE_PATTERN.to_string()]
        } else {
            patterns
        }
    }

    /// Exclude globs from `exclude_patterns`.
    #[must_use]
    pub fn exclude_patterns(&self) -> Vec<String> {
        self.string_list("exclude_patterns")
    }

    /// Files listed under `required_files`.
    #[must_use]
    pub fn required_files(&self) -> Vec<String> {
        self.string_list("required_files")
    }

    /// Returns `true` if `name` is a required file and exists under the root.
    #[must_use]
    pub fn has_required_file(&self, name: &str) -> bool {
        self.required_files().iter().any(|f| f == name) && self.project_root.join(name).is_file()
    }

    /// Summarizes the workspace for display or serialization.
    #[must_use]
    pub fn workspace_metadata(&self) -> WorkspaceMetadata {
        WorkspaceMetadata {
            workspace_name: self.workspace_name(),
            workspace_path: self.project_root.clone(),
            file_patterns: self.string_list("file_patterns"),
            exclude_patterns: self.exclude_patterns(),
            required_files: self.required_files(),
        }
    }

    /// Files under the root matching a single glob.
    #[must_use]
    pub fn workspace_files(&self, pattern: &str) -> Arc<[PathBuf]> {
        self.iter_files(&[pattern], &[] as &[&str])
    }

    /// Files under the root matching any `include` glob and no `exclude` glob.
    ///
    /// Globs are matched against `/`-separated paths relative to the root; `*`
    /// does not cross directory boundaries, `**` does. An empty `include`
    /// means `**/*`. Invalid patterns are skipped with a warning. The result
    /// is sorted and cached per pattern set unless `options.iter_files_cache`
    /// is `false`.
    pub fn iter_files<I, E>(&self, include: &[I], exclude: &[E]) -> Arc<[PathBuf]>
    where
        I: AsRef<str>,
        E: AsRef<str>,
    {
        let mut inc: Vec<String> = include.iter().map(|p| p.as_ref().to_string()).collect();
        if inc.is_empty() {
            inc.push(DEFAULT_FILE_PATTERN.to_string());
        }
        let exc: Vec<String> = exclude.iter().map(|p| p.as_ref().to_string()).collect();

        let use_cache = self
            .option("iter_files_cache")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let key = {
            let mut inc = inc.clone();
            let mut exc = exc.clone();
            inc.sort();
            exc.sort();
            (inc, exc)
        };

        if use_cache && let Some(hit) = self.file_cache.lock().get(&key) {
            return Arc::clone(hit);
        }

        let files: Arc<[PathBuf]> = self.walk(&build_globset(&inc), &build_globset(&exc)).into();
        if use_cache {
            self.file_cache.lock().insert(key, Arc::clone(&files));
        }
        files
    }

    fn walk(&self, include: &GlobSet, exclude: &GlobSet) -> Vec<PathBuf> {
        WalkDir::new(&self.project_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let rel = entry.path().strip_prefix(&self.project_root).ok()?;
                (include.is_match(rel) && !exclude.is_match(rel)).then(|| entry.path().to_path_buf())
            })
            .collect()
    }

    fn string_list(&self, key: &str) -> Vec<String> {
        match self.config.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }
}

fn build_globset(patterns: &[String]) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(error) => tracing::warn!(pattern = %pattern, %error, "skipping invalid glob"),
        }
    }
    builder.build().unwrap_or_else(|error| {
        tracing::warn!(%error, "failed to compile glob set");
        GlobSet::empty()
    })
}

/// Workspace summary returned by [`PreCompileContext::workspace_metadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkspaceMetadata {
    /// Last component of the project root.
    pub workspace_name: String,
    /// The project root.
    pub workspace_path: PathBuf,
    /// Configured include globs (empty when unset).
    pub file_patterns: Vec<String>,
    /// Configured exclude globs.
    pub exclude_patterns: Vec<String>,
    /// Configured required files.
    pub required_files: Vec<String>,
}
