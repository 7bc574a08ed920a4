//! Fan-out expansion of Calculate templates.
//!
//! A template carries a placeholder for its width. Once Make has reported how
//! many tasks it produced, the expander turns the template into one instance
//! per task, keyed `<template>-<index>` with the index in Make's task order.

use super::node::StageNode;
use crate::core::{FanOutMode, OutputValue, StageOutputs};
use crate::errors::GraphError;
use crate::profiles::ExecutorProfile;
use serde::Serialize;
use std::sync::Arc;

/// One concrete execution of a Calculate template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FanOutInstance {
    /// Template stage name.
    pub stage: String,
    /// Stable instance key, e.g. `RelaxLAMMPS-Cal-3`.
    pub key: String,
    /// Position in Make's task order.
    pub index: usize,
    /// Task name for name-list engines.
    pub task_name: Option<String>,
    /// Shared executor profile of the template.
    #[serde(skip)]
    pub executor: Option<Arc<ExecutorProfile>>,
}

impl FanOutInstance {
    /// Picks this instance's element from a per-task list.
    #[must_use]
    pub fn select<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.get(self.index)
    }
}

/// Width of a fan-out as reported by Make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanOutWidth {
    /// A plain task count.
    Count(usize),
    /// One name per task.
    Names(Vec<String>),
}

impl FanOutWidth {
    /// Returns the number of instances.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Count(n) => *n,
            Self::Names(names) => names.len(),
        }
    }

    /// Returns true if no instance will run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expands Calculate templates into instances.
#[derive(Debug, Clone, Copy, Default)]
pub struct FanOutExpander;

impl FanOutExpander {
    /// Expands a template into `count` instances.
    ///
    /// A count of zero yields no instances; that is not an error.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NotFanOut` if the node is not a template.
    pub fn expand(template: &StageNode, count: usize) -> Result<Vec<FanOutInstance>, GraphError> {
        Self::expand_width(template, &FanOutWidth::Count(count))
    }

    /// Expands a template into one instance per task name.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NotFanOut` if the node is not a template.
    pub fn expand_named(
        template: &StageNode,
        names: &[String],
    ) -> Result<Vec<FanOutInstance>, GraphError> {
        Self::expand_width(template, &FanOutWidth::Names(names.to_vec()))
    }

    /// Expands a template for a resolved width.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::NotFanOut` if the node is not a template.
    pub fn expand_width(
        template: &StageNode,
        width: &FanOutWidth,
    ) -> Result<Vec<FanOutInstance>, GraphError> {
        let spec = template
            .fan_out
            .as_ref()
            .ok_or_else(|| GraphError::NotFanOut {
                name: template.name.clone(),
            })?;

        let instances = (0..width.len())
            .map(|index| FanOutInstance {
                stage: template.name.clone(),
                key: spec.instance_key(index),
                index,
                task_name: match width {
                    FanOutWidth::Names(names) => names.get(index).cloned(),
                    FanOutWidth::Count(_) => None,
                },
                executor: template.executor.clone(),
            })
            .collect();
        Ok(instances)
    }

    /// Reads the width of a template from its producer's outputs.
    ///
    /// # Errors
    ///
    /// Returns `GraphError::FanOutWidth` if the slot is missing or has the
    /// wrong shape for the template's mode.
    pub fn resolve_width(
        template: &StageNode,
        producer_outputs: &StageOutputs,
    ) -> Result<FanOutWidth, GraphError> {
        let spec = template
            .fan_out
            .as_ref()
            .ok_or_else(|| GraphError::NotFanOut {
                name: template.name.clone(),
            })?;
        let width_error = |reason: String| GraphError::FanOutWidth {
            stage: template.name.clone(),
            reason,
        };

        let value = producer_outputs
            .get(&spec.width_source.slot)
            .and_then(OutputValue::as_value)
            .ok_or_else(|| width_error(format!("'{}' was not produced", spec.width_source)))?;

        match spec.mode {
            FanOutMode::Count => value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(FanOutWidth::Count)
                .ok_or_else(|| width_error(format!("expected a task count, got {value}"))),
            FanOutMode::NameList => value
                .as_array()
                .and_then(|items| {
                    items
                        .iter()
                        .map(|item| item.as_str().map(str::to_string))
                        .collect::<Option<Vec<_>>>()
                })
                .map(FanOutWidth::Names)
                .ok_or_else(|| width_error(format!("expected a list of task names, got {value}"))),
        }
    }
}
