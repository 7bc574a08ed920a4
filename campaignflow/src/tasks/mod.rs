//! Task-list helpers shared by Make and Post stage adapters.
//!
//! Make stages discover configuration directories and derive one task
//! directory per unit of work. The order of that list is the fan-out order,
//! so it is always lexical path order. Post stages gather per-task results
//! back into the same order.

mod aggregate;
mod discovery;

pub use aggregate::aggregate_results;
pub use discovery::{
    discover_configurations, property_suffixes, property_task_paths, relax_task_paths, TaskList,
    RELAX_TASK_DIR,
};
