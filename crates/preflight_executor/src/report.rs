//! Execution results.

use core::fmt;
use core::time::Duration;

use serde::Serialize;

/// Outcome of one plugin in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionItem {
    /// Plugin id.
    pub plugin_id: String,
    /// Plugin display name.
    pub name: String,
    /// Whether the hook succeeded.
    pub success: bool,
    /// Wall time in milliseconds.
    pub duration_ms: f64,
    /// Failure message, empty on success.
    pub error: String,
}

impl ExecutionItem {
    pub(crate) fn succeeded(plugin_id: String, name: String, elapsed: Duration) -> Self {
        Self {
            plugin_id,
            name,
            success: true,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            error: String::new(),
        }
    }

    pub(crate) fn failed(plugin_id: String, name: String, elapsed: Duration, error: String) -> Self {
        Self {
            plugin_id,
            name,
            success: false,
            duration_ms: elapsed.as_secs_f64() * 1000.0,
            error,
        }
    }

    pub(crate) fn from_result(
        plugin_id: String,
        name: String,
        elapsed: Duration,
        result: Result<(), String>,
    ) -> Self {
        match result {
            Ok(()) => Self::succeeded(plugin_id, name, elapsed),
            Err(error) => Self::failed(plugin_id, name, elapsed, error),
        }
    }
}

/// Ordered results of a run.
///
/// Sequential runs list items in scheduler order, parallel runs in
/// completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionReport {
    items: Vec<ExecutionItem>,
}

impl ExecutionReport {
    pub(crate) fn push(&mut self, item: ExecutionItem) {
        self.items.push(item);
    }

    /// Returns `true` if every item succeeded (also for an empty report).
    #[must_use]
    pub fn ok(&self) -> bool {
        self.items.iter().all(|i| i.success)
    }

    /// All items.
    #[must_use]
    pub fn items(&self) -> &[ExecutionItem] {
        &self.items
    }

    /// Iterates over the items.
    pub fn iter(&self) -> core::slice::Iter<'_, ExecutionItem> {
        self.items.iter()
    }

    /// The failed items.
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionItem> {
        self.items.iter().filter(|i| !i.success)
    }

    /// Returns the item of a plugin.
    #[must_use]
    pub fn get(&self, plugin_id: &str) -> Option<&ExecutionItem> {
        self.items.iter().find(|i| i.plugin_id == plugin_id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing ran.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of item durations in milliseconds.
    #[must_use]
    pub fn total_duration_ms(&self) -> f64 {
        self.items.iter().fold(0.0, |acc, i| acc + i.duration_ms)
    }

    /// Plugin ids in report order.
    #[must_use]
    pub fn plugin_ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.plugin_id.as_str()).collect()
    }

    /// One-line summary of the run.
    #[must_use]
    pub fn summary(&self) -> String {
        let total = self.items.len();
        let ok = self.items.iter().filter(|i| i.success).count();
        format!(
            "Plugins: {ok}/{total} ok, {} failed, total time {:.1} ms",
            total - ok,
            self.total_duration_ms()
        )
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl<'a> IntoIterator for &'a ExecutionReport {
    type Item = &'a ExecutionItem;
    type IntoIter = core::slice::Iter<'a, ExecutionItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
