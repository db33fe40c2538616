//! Delivery of deferred run results back to the owning property.
//!
//! Each property owns an unbounded channel. Deferred evaluations are
//! spawned as tokio tasks that send exactly one [`Completion`] each,
//! whether they finish, are cancelled, or panic; the property drains the
//! channel from `pump` / `settle`. Exactly-once delivery is what keeps
//! the in-flight counter balanced.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use veris_constraint::ValidationResult;

/// Which validation record a completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompletionTarget {
    /// The property's own constraints.
    Property,
    /// An element record, identified by its property-unique id.
    Element(u64),
}

/// How a deferred run ended.
pub(crate) enum Outcome<D> {
    Finished(ValidationResult<D>),
    Cancelled,
}

/// One deferred run's terminal report.
pub(crate) struct Completion<D> {
    pub target: CompletionTarget,
    /// Constraint index within the target's slot list.
    pub index: usize,
    /// Run counter value at spawn time; stale completions are dropped.
    pub run: u64,
    pub outcome: Outcome<D>,
}

/// Spawns a deferred evaluation.
///
/// The task resolves either the future or the cancellation token,
/// whichever wins, and always reports back. A panicking constraint is
/// logged and reported as cancelled; it never takes the property down.
pub(crate) fn spawn_run<D: Send + 'static>(
    future: BoxFuture<'static, ValidationResult<D>>,
    token: CancellationToken,
    tx: UnboundedSender<Completion<D>>,
    target: CompletionTarget,
    index: usize,
    run: u64,
) {
    tokio::spawn(async move {
        let guarded = AssertUnwindSafe(future).catch_unwind();
        let outcome = tokio::select! {
            () = token.cancelled() => Outcome::Cancelled,
            result = guarded => match result {
                Ok(result) => Outcome::Finished(result),
                Err(_) => {
                    tracing::error!(index, run, "constraint panicked during deferred validation");
                    Outcome::Cancelled
                }
            },
        };
        // The receiver is gone when the property was dropped; nothing to do.
        let _ = tx.send(Completion { target, index, run, outcome });
    });
}
