use crate::errors::TaskError;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Collects per-task results back into task order.
///
/// Every index in `0..expected` must have a result; one missing entry fails
/// the whole aggregation. Zero expected tasks aggregate to an empty list.
///
/// # Errors
///
/// Returns `TaskError::MissingResult` for the first index without a result.
pub fn aggregate_results<I>(expected: usize, results: I) -> Result<Vec<PathBuf>, TaskError>
where
    I: IntoIterator<Item = (usize, PathBuf)>,
{
    let mut by_index: BTreeMap<usize, PathBuf> = results.into_iter().collect();
    (0..expected)
        .map(|index| {
            by_index
                .remove(&index)
                .ok_or(TaskError::MissingResult { index, expected })
        })
        .collect()
}
