//! Tag-based execution phases.
//!
//! Category tags group plugins into coarse phases: cleanup runs before
//! validation, validation before preparation, and so on. A plugin's phase
//! score is the lowest score among its recognized tags, or
//! [`DEFAULT_PHASE_SCORE`] when none is recognized.
//!
//! | Score | Phase | Tags |
//! |-------|-------|------|
//! | 0 | Cleanup | `clean`, `cleanup`, `sanitize`, `prune`, `tidy` |
//! | 10 | Validation | `validation`, `presence`, `check`, `requirements`, `verify` |
//! | 20 | Preparation | `prepare`, `codegen`, `generate`, `fetch`, `resources`, `download`, `install`, `bootstrap`, `configure`, `setup` |
//! | 30 | Compliance | `license`, `header`, `normalize`, `inject`, `spdx`, `banner`, `copyright`, `metadata` |
//! | 40 | Linting | `lint`, `format`, `typecheck`, `mypy`, `flake8`, `ruff`, `pep8`, `black`, `isort`, `sort-imports`, `style` |
//! | 50 | Obfuscation | `obfuscation`, `obfuscate`, `transpile`, `protect`, `encrypt`, `minify` |
//! | 100 | Default | anything else |
//!
//! # Example
//!
//! ```
//! use preflight_plugin::TagPhases;
//!
//! let phases = TagPhases::new();
//! assert_eq!(phases.score(&["format", "check"]), 10);
//! assert_eq!(
//!     phases.describe("ruff", &["lint", "format"]),
//!     "ruff (lint, format) -> Phase 40: Linting"
//! );
//! ```

use hashbrown::HashMap;
use serde_json::Value;

use crate::context::ConfigMap;

/// Score given to plugins without any recognized tag.
pub const DEFAULT_PHASE_SCORE: i32 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Phase
// ─────────────────────────────────────────────────────────────────────────────

/// A named execution phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Workspace hygiene.
    Cleanup,
    /// Prerequisite checks.
    Validation,
    /// Resource generation and setup.
    Preparation,
    /// License headers and metadata injection.
    Compliance,
    /// Linters, formatters and type checkers.
    Linting,
    /// Obfuscation, transpilation and other last passes.
    Obfuscation,
    /// No recognized tag.
    Default,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 7] = [
        Phase::Cleanup,
        Phase::Validation,
        Phase::Preparation,
        Phase::Compliance,
        Phase::Linting,
        Phase::Obfuscation,
        Phase::Default,
    ];

    /// Returns the phase score.
    #[must_use]
    pub const fn score(self) -> i32 {
        match self {
            Phase::Cleanup => 0,
            Phase::Validation => 10,
            Phase::Preparation => 20,
            Phase::Compliance => 30,
            Phase::Linting => 40,
            Phase::Obfuscation => 50,
            Phase::Default => DEFAULT_PHASE_SCORE,
        }
    }

    /// Returns the phase with exactly this score, if any.
    #[must_use]
    pub fn from_score(score: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.score() == score)
    }

    /// Returns the display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Phase::Cleanup => "Cleanup",
            Phase::Validation => "Validation",
            Phase::Preparation => "Preparation",
            Phase::Compliance => "Compliance",
            Phase::Linting => "Linting",
            Phase::Obfuscation => "Obfuscation",
            Phase::Default => "Default",
        }
    }

    /// Returns the built-in tags of this phase.
    #[must_use]
    pub const fn tags(self) -> &'static [&'static str] {
        match self {
            Phase::Cleanup => &["clean", "cleanup", "sanitize", "prune", "tidy"],
            Phase::Validation => &["validation", "presence", "check", "requirements", "verify"],
            Phase::Preparation => &[
                "prepare",
                "codegen",
                "generate",
                "fetch",
                "resources",
                "download",
                "install",
                "bootstrap",
                "configure",
                "setup",
            ],
            Phase::Compliance => &[
                "license",
                "header",
                "normalize",
                "inject",
                "spdx",
                "banner",
                "copyright",
                "metadata",
            ],
            Phase::Linting => &[
                "lint",
                "format",
                "typecheck",
                "mypy",
                "flake8",
                "ruff",
                "pep8",
                "black",
                "isort",
                "sort-imports",
                "style",
            ],
            Phase::Obfuscation => &[
                "obfuscation",
                "obfuscate",
                "transpile",
                "protect",
                "encrypt",
                "minify",
            ],
            Phase::Default => &[],
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TagPhases
// ─────────────────────────────────────────────────────────────────────────────

/// Lookup table from tag to phase score.
///
/// Starts from the built-in table; entries can be overridden or added, e.g.
/// from the `tag_phases` section of the configuration.
#[derive(Debug, Clone)]
pub struct TagPhases {
    scores: HashMap<String, i32>,
}

impl Default for TagPhases {
    fn default() -> Self {
        let mut scores = HashMap::new();
        for phase in Phase::ALL {
            for tag in phase.tags() {
                scores.insert((*tag).to_string(), phase.score());
            }
        }
        Self { scores }
    }
}

impl TagPhases {
    /// Creates the built-in table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the built-in table with overrides from the `tag_phases`
    /// section of a configuration map (`{ "tag": score }`).
    ///
    /// Non-integer scores are ignored with a warning.
    #[must_use]
    pub fn from_config(config: &ConfigMap) -> Self {
        let mut phases = Self::new();
        let Some(Value::Object(overrides)) = config.get("tag_phases") else {
            return phases;
        };
        for (tag, score) in overrides {
            match score.as_i64().and_then(|s| i32::try_from(s).ok()) {
                Some(score) => phases.insert(tag, score),
                None => tracing::warn!(tag = %tag, value = %score, "ignoring non-integer tag phase"),
            }
        }
        phases
    }

    /// Sets the score of a tag, returning the table.
    #[must_use]
    pub fn with_override(mut self, tag: impl AsRef<str>, score: i32) -> Self {
        self.insert(tag, score);
        self
    }

    /// Sets the score of a tag.
    pub fn insert(&mut self, tag: impl AsRef<str>, score: i32) {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() {
            self.scores.insert(tag, score);
        }
    }

    /// Returns the score of a single tag.
    #[must_use]
    pub fn tag_score(&self, tag: &str) -> i32 {
        self.scores
            .get(tag.trim().to_lowercase().as_str())
            .copied()
            .unwrap_or(DEFAULT_PHASE_SCORE)
    }

    /// Returns the lowest score among `tags`, or [`DEFAULT_PHASE_SCORE`].
    #[must_use]
    pub fn score<S: AsRef<str>>(&self, tags: &[S]) -> i32 {
        tags.iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(|t| self.tag_score(t))
            .min()
            .unwrap_or(DEFAULT_PHASE_SCORE)
    }

    /// Returns a readable name for a score.
    #[must_use]
    pub fn phase_name(score: i32) -> String {
        match Phase::from_score(score) {
            Some(phase) => phase.name().to_string(),
            None => format!("Phase {score}"),
        }
    }

    /// Renders `"id (tag, tag) -> Phase N: Name"`.
    #[must_use]
    pub fn describe<S: AsRef<str>>(&self, plugin_id: &str, tags: &[S]) -> String {
        if tags.is_empty() {
            return format!(
                "{plugin_id} (no tags) -> Phase {DEFAULT_PHASE_SCORE}: {}",
                Phase::Default.name()
            );
        }
        let listed = tags
            .iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        let score = self.score(tags);
        format!("{plugin_id} ({listed}) -> Phase {score}: {}", Self::phase_name(score))
    }
}
