//! Configuration discovery and task path derivation.

use crate::errors::TaskError;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Task directory of a relaxation, relative to its configuration.
pub const RELAX_TASK_DIR: &str = "relaxation/relax_task";

/// An ordered list of task directories.
///
/// Always sorted in lexical path order and free of duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskList(Vec<PathBuf>);

impl TaskList {
    /// Creates a task list, sorting the paths.
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths: Vec<PathBuf> = paths.into_iter().collect();
        paths.sort();
        paths.dedup();
        Self(paths)
    }

    /// Wraps paths that must already be in lexical order.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Unordered` at the first path that breaks the order.
    pub fn from_sorted(paths: Vec<PathBuf>) -> Result<Self, TaskError> {
        if let Some(pair) = paths.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(TaskError::Unordered {
                path: pair[1].display().to_string(),
            });
        }
        Ok(Self(paths))
    }

    /// Returns the paths.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the paths, consuming the list.
    #[must_use]
    pub fn into_paths(self) -> Vec<PathBuf> {
        self.0
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, TaskError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|err| TaskError::Pattern {
                pattern: pattern.clone(),
                reason: err.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|err| TaskError::Pattern {
        pattern: patterns.join(","),
        reason: err.to_string(),
    })
}

/// Finds the configuration directories matching `patterns` under `root`.
///
/// Patterns are matched against paths relative to `root`; `*` does not
/// cross a path separator. The result holds `root`-joined paths.
///
/// # Errors
///
/// Returns `TaskError::Pattern` for an invalid glob and `TaskError::Scan`
/// if `root` is not a directory.
pub fn discover_configurations(root: &Path, patterns: &[String]) -> Result<TaskList, TaskError> {
    if !root.is_dir() {
        return Err(TaskError::Scan {
            root: root.display().to_string(),
            reason: "not a directory".to_string(),
        });
    }
    let globset = build_globset(patterns)?;

    let found = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(root).ok()?;
            globset.is_match(rel).then(|| entry.path().to_path_buf())
        });

    let confs = TaskList::new(found);
    debug!(root = %root.display(), count = confs.len(), "Discovered configurations");
    Ok(confs)
}

/// Returns the relaxation task directory of every configuration.
#[must_use]
pub fn relax_task_paths(confs: &TaskList) -> TaskList {
    TaskList::new(confs.paths().iter().map(|conf| conf.join(RELAX_TASK_DIR)))
}

/// Derives property task directory names from the `properties` entries.
///
/// Each kept entry yields `<type>_<suffix>`. Entries with `skip: true` are
/// dropped. The suffix is `output_suffix` if present, `reprod` when
/// `reproduce` is true, and `00` otherwise.
#[must_use]
pub fn property_suffixes(properties: &[serde_json::Value]) -> Vec<String> {
    properties
        .iter()
        .filter(|prop| !prop.get("skip").and_then(serde_json::Value::as_bool).unwrap_or(false))
        .filter_map(|prop| {
            let Some(kind) = prop.get("type").and_then(serde_json::Value::as_str) else {
                warn!(entry = %prop, "Property entry without a type");
                return None;
            };
            let suffix = if let Some(suffix) = prop.get("output_suffix").and_then(serde_json::Value::as_str) {
                suffix
            } else if prop.get("reproduce").and_then(serde_json::Value::as_bool) == Some(true) {
                "reprod"
            } else {
                "00"
            };
            Some(format!("{kind}_{suffix}"))
        })
        .collect()
}

/// Returns one task per configuration and property.
///
/// Component-wise path ordering keeps all tasks of a configuration together.
#[must_use]
pub fn property_task_paths(confs: &TaskList, properties: &[String]) -> TaskList {
    TaskList::new(
        confs
            .paths()
            .iter()
            .flat_map(|conf| properties.iter().map(move |prop| conf.join(prop))),
    )
}
