//! substrate node client backed by `subxt`
use core::pin::Pin;
use core::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use snafu::ResultExt;
use subxt::config::polkadot::PolkadotExtrinsicParamsBuilder as Params;
use subxt::tx::{DynamicPayload, SubmittableExtrinsic, TxInBlock, TxStatus};
use subxt::utils::H256;
use subxt::{Metadata, OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::Keypair;
use url::Url;

use crate::dispatch::DispatchFailure;
use crate::error::{
    ChainConnectionSnafu, CreateTransactionSnafu, Error, FetchEventsSnafu, Result, TransportSnafu,
};
use crate::node_client::NodeClient;
use crate::status::{BlockInclusion, LedgerEvent, StatusNotification};

/// The `API` type represents a connected Substrate client.
pub type API = OnlineClient<PolkadotConfig>;

/// A signed extrinsic ready for submission.
pub type SignedExtrinsic = SubmittableExtrinsic<PolkadotConfig, API>;

/// Message the legacy backend reports, as `Invalid`, for a usurped extrinsic.
const USURPED_MESSAGE: &str = "Transaction was usurped by another with the same nonce";

/// Message the legacy backend reports, as `Invalid`, for a finality timeout.
const FINALITY_TIMEOUT_MESSAGE: &str = "Finality timeout";

/// Node client that signs dynamic calls with sr25519 keys and watches them over websockets.
#[derive(Clone, Debug)]
pub struct SubxtNodeClient {
    /// A client for interacting with the blockchain.
    api: API,
}

impl SubxtNodeClient {
    /// Connects to the node at `rpc_url`.
    ///
    /// # Arguments
    ///
    /// * `rpc_url` - Websocket or http endpoint of the node. Plain `ws://` is accepted for
    ///   remote hosts too.
    ///
    /// # Returns
    ///
    /// Returns the connected client, or `ChainConnection` if the node cannot be reached.
    pub async fn connect(rpc_url: &Url) -> Result<Self> {
        info!("🔌 Connecting to node at {rpc_url}");

        let api = API::from_insecure_url(rpc_url.as_str())
            .await
            .context(ChainConnectionSnafu {
                url: rpc_url.as_str(),
            })?;

        info!("✅ Connected to node");
        Ok(Self::new(api))
    }

    /// Wraps an existing client.
    pub fn new(api: API) -> Self {
        Self { api }
    }

    /// The underlying `subxt` client.
    pub fn api(&self) -> &API {
        &self.api
    }
}

#[async_trait]
impl NodeClient for SubxtNodeClient {
    type Call = DynamicPayload;
    type Signer = Keypair;
    type Transaction = SignedExtrinsic;
    type Subscription = SubxtSubscription;

    async fn create_signed_transaction(
        &self,
        call: &DynamicPayload,
        signer: &Keypair,
    ) -> Result<SignedExtrinsic> {
        // No explicit nonce: the client fetches the next one for the signer.
        let tx_params = Params::new().build();

        self.api
            .tx()
            .create_signed(call, signer, tx_params)
            .await
            .context(CreateTransactionSnafu)
    }

    async fn submit_and_subscribe(
        &self,
        transaction: SignedExtrinsic,
    ) -> Result<SubxtSubscription> {
        let progress = transaction.submit_and_watch().await.context(TransportSnafu)?;
        let extrinsic_hash = progress.extrinsic_hash();
        info!("📤 Submitted extrinsic {extrinsic_hash:?}");

        let metadata = self.api.metadata();
        let statuses = progress
            .filter_map(move |status| {
                let metadata = metadata.clone();
                async move { notification_from(status, &metadata).await }
            })
            .boxed();

        Ok(SubxtSubscription {
            extrinsic_hash,
            statuses,
        })
    }

    async fn unsubscribe(&self, subscription: SubxtSubscription) {
        debug!(
            "Releasing status subscription for {:?}",
            subscription.extrinsic_hash
        );
        // Dropping the underlying `TxProgress` closes the RPC subscription.
        drop(subscription);
    }
}

/// Status subscription for one extrinsic submitted through [`SubxtNodeClient`].
pub struct SubxtSubscription {
    /// Hash of the watched extrinsic.
    extrinsic_hash: H256,
    /// Converted status stream.
    statuses: BoxStream<'static, Result<StatusNotification>>,
}

impl SubxtSubscription {
    /// Hash of the watched extrinsic.
    pub fn extrinsic_hash(&self) -> H256 {
        self.extrinsic_hash
    }
}

impl Stream for SubxtSubscription {
    type Item = Result<StatusNotification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.statuses.poll_next_unpin(cx)
    }
}

/// A `subxt` status, split by whether it still needs the including block's events.
enum Progress {
    /// Maps directly onto a notification.
    Notification(StatusNotification),
    /// Included in the best block.
    InBestBlock(TxInBlock<PolkadotConfig, API>),
    /// Included in a finalized block.
    InFinalizedBlock(TxInBlock<PolkadotConfig, API>),
}

/// Maps a `subxt` status onto a notification, leaving inclusions to be resolved.
///
/// The legacy backend folds `Usurped` and `FinalityTimeout` into `Invalid` with a fixed
/// message; those two messages are mapped back to their own variants. `Future` and
/// `Retracted` never reach this point.
fn classify(status: TxStatus<PolkadotConfig, API>) -> Result<Progress> {
    let notification = match status {
        TxStatus::Validated => StatusNotification::Ready,
        TxStatus::Broadcasted { num_peers } => StatusNotification::Broadcast {
            num_peers: Some(num_peers),
        },
        TxStatus::NoLongerInBestBlock => StatusNotification::Retracted,
        TxStatus::InBestBlock(details) => return Ok(Progress::InBestBlock(details)),
        TxStatus::InFinalizedBlock(details) => return Ok(Progress::InFinalizedBlock(details)),
        TxStatus::Invalid { message } if message == USURPED_MESSAGE => StatusNotification::Usurped,
        TxStatus::Invalid { message } if message == FINALITY_TIMEOUT_MESSAGE => {
            StatusNotification::FinalityTimeout
        }
        TxStatus::Invalid { message } => StatusNotification::Invalid {
            message: Some(message),
        },
        TxStatus::Dropped { message } => StatusNotification::Dropped {
            message: Some(message),
        },
        TxStatus::Error { message } => {
            return Err(Error::Transport {
                source: subxt::Error::Other(message),
            })
        }
    };

    Ok(Progress::Notification(notification))
}

/// Maps a `subxt` status onto a [`StatusNotification`], fetching events for inclusions.
///
/// Returns `None` for a best-block inclusion whose events could not be fetched.
async fn notification_from(
    status: Result<TxStatus<PolkadotConfig, API>, subxt::Error>,
    metadata: &Metadata,
) -> Option<Result<StatusNotification>> {
    let progress = match status.context(TransportSnafu).and_then(classify) {
        Ok(progress) => progress,
        Err(err) => return Some(Err(err)),
    };

    match progress {
        Progress::Notification(notification) => Some(Ok(notification)),
        Progress::InBestBlock(details) => {
            best_block_notification(inclusion_from(details, metadata).await)
        }
        Progress::InFinalizedBlock(details) => Some(
            inclusion_from(details, metadata)
                .await
                .map(StatusNotification::Finalized),
        ),
    }
}

/// Turns a best-block inclusion into an `InBlock` notification.
///
/// A best block can still be retracted, so a failed event fetch is not fatal: the status
/// is skipped and the finalized block decides instead.
fn best_block_notification(
    inclusion: Result<BlockInclusion>,
) -> Option<Result<StatusNotification>> {
    match inclusion {
        Ok(inclusion) => Some(Ok(StatusNotification::InBlock(inclusion))),
        Err(err) => {
            warn!("⚠️ Skipping best block inclusion: {err}");
            None
        }
    }
}

/// Collects the extrinsic's events and dispatch outcome for a block it was included in.
async fn inclusion_from(
    details: TxInBlock<PolkadotConfig, API>,
    metadata: &Metadata,
) -> Result<BlockInclusion> {
    let block_hash = details.block_hash();

    match details.wait_for_success().await {
        Ok(events) => {
            let events = events
                .iter()
                .map(|event| {
                    event.map(|event| {
                        LedgerEvent::new(
                            event.pallet_name(),
                            event.variant_name(),
                            event.field_bytes().to_vec(),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .context(FetchEventsSnafu)?;

            Ok(BlockInclusion::success(block_hash, events))
        }
        Err(subxt::Error::Runtime(dispatch_error)) => Ok(BlockInclusion::failed(
            block_hash,
            DispatchFailure::from_subxt(&dispatch_error, metadata),
        )),
        Err(source) => Err(Error::FetchEvents { source }),
    }
}
