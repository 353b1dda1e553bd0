//! The publish-then-commit saga helper.
//!
//! Every state transition with an externally observable notification runs
//! through [`publish_then_commit`], so the ordering contract lives in one
//! place instead of being re-implemented (and eventually forgotten) in each
//! transition path.

use std::future::Future;

use gavel_types::Result;

/// Run the side effect; commit only if it succeeded.
///
/// - `effect` resolves to `Some(value)` when the external send went through,
///   `None` when it failed.
/// - `commit` performs the durable state transition (typically a staged
///   [`StoreTx`] commit). It runs only on `Some`.
///
/// Returns `Ok(Some(value))` when both sides completed, `Ok(None)` when the
/// effect failed and nothing was committed (the caller retries on a later
/// pass), and an error only when the commit itself failed — at which point
/// the notification has already gone out once; the entity's unchanged
/// persisted state makes the next pass re-send and re-attempt.
///
/// [`StoreTx`]: gavel_store::StoreTx
pub async fn publish_then_commit<T, Fut, C>(effect: Fut, commit: C) -> Result<Option<T>>
where
    Fut: Future<Output = Option<T>>,
    C: FnOnce(&T) -> Result<()>,
{
    match effect.await {
        Some(value) => {
            commit(&value)?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}
