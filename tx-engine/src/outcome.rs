//! Single-result futures over the callback based submission watcher.
use std::sync::Arc;

use snafu::OptionExt;
use tokio::sync::mpsc;

use crate::config::InclusionPolicy;
use crate::error::{Result, WatcherDroppedSnafu};
use crate::extract::ExtractionSet;
use crate::node_client::NodeClient;
use crate::status::BlockInclusion;
use crate::tx_progress::submit;

/// Submits `transaction`, waits for its terminal outcome and extracts `specs` from it.
///
/// Resolves with the decoded values in spec order, or with the first error among the
/// watcher's failure and the extractions. The watcher keeps running if this future is
/// dropped early, so a late terminal status still releases the subscription.
///
/// # Arguments
///
/// * `client` - The node connection, shared with other submissions.
/// * `transaction` - A signed extrinsic.
/// * `policy` - Whether `InBlock` or `Finalized` completes the submission.
/// * `specs` - One spec or a tuple of specs to decode from the inclusion events.
///
/// # Returns
///
/// Returns the decoded values, or the first error among the watcher's failure and
/// the extractions.
pub async fn submit_and_await<C, S>(
    client: &Arc<C>,
    transaction: C::Transaction,
    policy: InclusionPolicy,
    specs: S,
) -> Result<S::Output>
where
    C: NodeClient + 'static,
    S: ExtractionSet,
{
    let (tx, mut rx) = mpsc::channel::<Result<BlockInclusion>>(1);
    let on_failure = tx.clone();

    // Only one of the callbacks ever runs, so the single slot is always free.
    submit(
        Arc::clone(client),
        transaction,
        policy,
        move |inclusion| {
            let _ = tx.try_send(Ok(inclusion));
        },
        move |err| {
            let _ = on_failure.try_send(Err(err));
        },
    );

    let inclusion = rx.recv().await.context(WatcherDroppedSnafu)??;
    specs.extract_all(&inclusion)
}

/// Signs `call` with `signer`, then behaves like [`submit_and_await`].
///
/// # Arguments
///
/// * `client` - The node connection, shared with other submissions.
/// * `call` - The unsigned call.
/// * `signer` - Key used to sign `call`.
/// * `policy` - Whether `InBlock` or `Finalized` completes the submission.
/// * `specs` - One spec or a tuple of specs to decode from the inclusion events.
///
/// # Returns
///
/// Returns the decoded values, or the first error of signing, watching or extraction.
pub async fn sign_submit_and_await<C, S>(
    client: &Arc<C>,
    call: &C::Call,
    signer: &C::Signer,
    policy: InclusionPolicy,
    specs: S,
) -> Result<S::Output>
where
    C: NodeClient + 'static,
    S: ExtractionSet,
{
    let transaction = client.create_signed_transaction(call, signer).await?;
    submit_and_await(client, transaction, policy, specs).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use codec::Encode;

    use super::*;
    use crate::error::{Error, LifecycleStatus};
    use crate::extract::ExtractionSpec;
    use crate::mock::{block, MockNodeClient};
    use crate::status::{LedgerEvent, StatusNotification};

    const FUNDED: ExtractionSpec<u32> = ExtractionSpec::scale("Creditcoin", "DealOrderFunded");
    const PROCESSED: ExtractionSpec<[u8; 32]> =
        ExtractionSpec::scale("Creditcoin", "TransferProcessed");

    fn funding_block() -> BlockInclusion {
        BlockInclusion::success(
            block(3),
            vec![
                LedgerEvent::new("Creditcoin", "DealOrderFunded", 42u32.encode()),
                LedgerEvent::new("Balances", "Withdraw", vec![]),
                LedgerEvent::new("Creditcoin", "TransferProcessed", [7u8; 32].encode()),
            ],
        )
    }

    #[tokio::test]
    async fn we_can_await_two_events_in_spec_order() {
        let client = Arc::new(MockNodeClient::default());
        let feed = client.expect_submission();
        feed.send(Ok(StatusNotification::Ready)).unwrap();
        feed.send(Ok(StatusNotification::InBlock(funding_block())))
            .unwrap();

        let (deal, transfer) =
            submit_and_await(&client, 1, InclusionPolicy::InBlock, (FUNDED, PROCESSED))
                .await
                .unwrap();

        assert_eq!(deal, 42);
        assert_eq!(transfer, [7u8; 32]);
    }

    #[tokio::test]
    async fn we_cannot_await_a_partial_result() {
        let client = Arc::new(MockNodeClient::default());
        let feed = client.expect_submission();
        feed.send(Ok(StatusNotification::InBlock(BlockInclusion::success(
            block(3),
            vec![LedgerEvent::new(
                "Creditcoin",
                "DealOrderFunded",
                42u32.encode(),
            )],
        ))))
        .unwrap();

        let result =
            submit_and_await(&client, 1, InclusionPolicy::InBlock, (FUNDED, PROCESSED)).await;

        match result {
            Err(Error::EventNotFound { pallet, event }) => {
                assert_eq!(pallet, "Creditcoin");
                assert_eq!(event, "TransferProcessed");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[tokio::test]
    async fn watcher_failures_reject_the_future() {
        let client = Arc::new(MockNodeClient::default());
        let feed = client.expect_submission();
        feed.send(Ok(StatusNotification::Invalid {
            message: Some("bad signature".into()),
        }))
        .unwrap();

        let result = submit_and_await(&client, 1, InclusionPolicy::InBlock, FUNDED).await;

        assert!(matches!(
            result,
            Err(Error::Lifecycle {
                status: LifecycleStatus::Invalid,
                ..
            })
        ));
        assert_eq!(client.unsubscribe_count(), 1);
    }

    #[tokio::test]
    async fn we_can_sign_and_await_a_call() {
        let client = Arc::new(MockNodeClient::default());
        let feed = client.expect_submission();
        feed.send(Ok(StatusNotification::Finalized(funding_block())))
            .unwrap();

        let deal = sign_submit_and_await(
            &client,
            &"fund_deal_order".to_string(),
            &(),
            InclusionPolicy::Finalized,
            FUNDED,
        )
        .await
        .unwrap();

        assert_eq!(deal, 42);
    }

    #[tokio::test]
    async fn a_caller_timeout_does_not_leak_the_subscription() {
        let client = Arc::new(MockNodeClient::default());
        let feed = client.expect_submission();

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            submit_and_await(&client, 1, InclusionPolicy::InBlock, FUNDED),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(client.unsubscribe_count(), 0);

        // The terminal status arrives after the caller gave up.
        feed.send(Ok(StatusNotification::InBlock(funding_block())))
            .unwrap();

        for _ in 0..100 {
            if client.unsubscribe_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(client.unsubscribe_count(), 1);
    }
}
