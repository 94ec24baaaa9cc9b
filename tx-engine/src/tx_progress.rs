//! Watches one submitted extrinsic until the node reports a terminal outcome.
//!
//! [`SubmissionWatcher`] is the state machine: it consumes one status at a time and
//! decides whether the submission is still pending, succeeded or failed. [`submit`]
//! drives it against a live subscription, releases the subscription on the first
//! terminal status and hands the outcome to exactly one of two callbacks.
use std::sync::Arc;

use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::task::JoinHandle;

use crate::config::InclusionPolicy;
use crate::error::{Error, LifecycleStatus};
use crate::node_client::NodeClient;
use crate::status::{BlockInclusion, StatusNotification};

/// Where a submission is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No terminal status seen yet.
    Watching,
    /// A clean inclusion was accepted.
    Succeeded,
    /// A terminal failure was observed.
    Failed,
}

/// Result of feeding one status to the watcher.
#[derive(Debug)]
pub enum Transition {
    /// Keep watching.
    Pending,
    /// The submission succeeded with this inclusion.
    Succeeded(BlockInclusion),
    /// The submission failed.
    Failed(Error),
    /// A terminal status was already acted upon; this one is discarded.
    Ignored,
}

/// Status state machine for a single submission.
#[derive(Debug)]
pub struct SubmissionWatcher {
    /// Which inclusion counts as success.
    policy: InclusionPolicy,
    /// Current state.
    state: WatchState,
}

impl SubmissionWatcher {
    /// Creates a watcher in the [`WatchState::Watching`] state.
    pub fn new(policy: InclusionPolicy) -> Self {
        Self {
            policy,
            state: WatchState::Watching,
        }
    }

    /// The current state.
    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Consumes one status notification.
    pub fn on_notification(&mut self, notification: StatusNotification) -> Transition {
        if self.state != WatchState::Watching {
            debug!(
                "Ignoring {} after terminal state {:?}",
                notification.name(),
                self.state
            );
            return Transition::Ignored;
        }

        if let Some((status, message)) = notification.lifecycle_failure() {
            warn!("⚠️ Extrinsic reached terminal status {status}");
            return self.fail(Error::Lifecycle { status, message });
        }

        match notification {
            StatusNotification::InBlock(inclusion) if self.policy == InclusionPolicy::InBlock => {
                info!("📦 Extrinsic included in block {:?}", inclusion.block_hash);
                self.conclude(inclusion)
            }
            StatusNotification::InBlock(inclusion) => {
                debug!(
                    "Extrinsic in block {:?}, waiting for finalization",
                    inclusion.block_hash
                );
                Transition::Pending
            }
            StatusNotification::Finalized(inclusion) => {
                info!("✅ Extrinsic finalized in block {:?}", inclusion.block_hash);
                self.conclude(inclusion)
            }
            pending => {
                debug!("Extrinsic status: {}", pending.name());
                Transition::Pending
            }
        }
    }

    /// Consumes an error reported by the status stream.
    pub fn on_transport_error(&mut self, err: Error) -> Transition {
        if self.state != WatchState::Watching {
            return Transition::Ignored;
        }
        error!("❌ Error while watching extrinsic: {err}");
        self.fail(err)
    }

    /// Called when the node closes the subscription.
    pub fn on_stream_end(&mut self) -> Transition {
        if self.state != WatchState::Watching {
            return Transition::Ignored;
        }
        warn!("⚠️ Status subscription closed before a terminal status");
        self.fail(Error::Lifecycle {
            status: LifecycleStatus::SubscriptionClosed,
            message: None,
        })
    }

    /// Applies the dispatch outcome of an accepted inclusion.
    fn conclude(&mut self, inclusion: BlockInclusion) -> Transition {
        match inclusion.dispatch_error {
            Some(source) => {
                error!("❌ Extrinsic dispatch failed: {source}");
                self.fail(Error::Dispatch { source })
            }
            None => {
                self.state = WatchState::Succeeded;
                Transition::Succeeded(inclusion)
            }
        }
    }

    /// Moves to [`WatchState::Failed`].
    fn fail(&mut self, err: Error) -> Transition {
        self.state = WatchState::Failed;
        Transition::Failed(err)
    }
}

/// Handle to a running submission.
///
/// Dropping the handle does not stop the watcher: it keeps running until a
/// terminal status arrives so the subscription is always released.
#[derive(Debug)]
pub struct SubmissionHandle {
    /// The task driving the watcher.
    task: JoinHandle<()>,
}

impl SubmissionHandle {
    /// Whether the submission has reached its outcome and released its subscription.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the watcher task to end.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.task.await
    }
}

/// Submits `transaction` and watches it in a background task.
///
/// Exactly one of `on_success` / `on_failure` is called, and the subscription is
/// released before the callback runs.
///
/// # Arguments
///
/// * `client` - The node connection, shared with other submissions.
/// * `transaction` - A signed extrinsic.
/// * `policy` - Whether `InBlock` or `Finalized` completes the submission.
/// * `on_success` - Called with the inclusion of a successfully dispatched extrinsic.
/// * `on_failure` - Called with the first failure of any stage.
///
/// # Returns
///
/// Returns a handle to the background watcher task.
pub fn submit<C, S, F>(
    client: Arc<C>,
    transaction: C::Transaction,
    policy: InclusionPolicy,
    on_success: S,
    on_failure: F,
) -> SubmissionHandle
where
    C: NodeClient + 'static,
    S: FnOnce(BlockInclusion) + Send + 'static,
    F: FnOnce(Error) + Send + 'static,
{
    let task = tokio::spawn(async move {
        match watch(client.as_ref(), transaction, policy).await {
            Ok(inclusion) => on_success(inclusion),
            Err(err) => on_failure(err),
        }
    });

    SubmissionHandle { task }
}

/// Submits `transaction` and waits in place for its terminal outcome.
///
/// # Arguments
///
/// * `client` - The node connection.
/// * `transaction` - A signed extrinsic.
/// * `policy` - Whether `InBlock` or `Finalized` completes the submission.
///
/// # Returns
///
/// Returns the inclusion that completed the submission, after the subscription has
/// been released, or the error that ended it.
pub async fn watch<C: NodeClient>(
    client: &C,
    transaction: C::Transaction,
    policy: InclusionPolicy,
) -> Result<BlockInclusion, Error> {
    let mut subscription = client
        .submit_and_subscribe(transaction)
        .await
        .inspect_err(|err| error!("❌ Failed to submit extrinsic: {err}"))?;
    let mut watcher = SubmissionWatcher::new(policy);

    loop {
        let transition = match subscription.next().await {
            Some(Ok(notification)) => watcher.on_notification(notification),
            Some(Err(err)) => watcher.on_transport_error(err),
            None => watcher.on_stream_end(),
        };

        match transition {
            Transition::Pending | Transition::Ignored => continue,
            Transition::Succeeded(inclusion) => {
                client.unsubscribe(subscription).await;
                return Ok(inclusion);
            }
            Transition::Failed(err) => {
                client.unsubscribe(subscription).await;
                return Err(err);
            }
        }
    }
}
