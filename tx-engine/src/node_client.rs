//! The seam between the submission engine and the node connection.
use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;
use crate::status::StatusNotification;

/// The three node operations the submission engine relies on.
///
/// Implementations own the connection and are responsible for multiplexing
/// subscriptions over it; they are shared between concurrent submissions.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Unsigned call understood by the node.
    type Call: Send + Sync;
    /// Key used to sign calls.
    type Signer: Send + Sync;
    /// A signed extrinsic, ready to submit.
    type Transaction: Send + 'static;
    /// Live status subscription for one submitted extrinsic.
    type Subscription: Stream<Item = Result<StatusNotification>> + Send + Unpin + 'static;

    /// Builds and signs an extrinsic for `call`.
    async fn create_signed_transaction(
        &self,
        call: &Self::Call,
        signer: &Self::Signer,
    ) -> Result<Self::Transaction>;

    /// Submits `transaction` and opens its status subscription.
    async fn submit_and_subscribe(
        &self,
        transaction: Self::Transaction,
    ) -> Result<Self::Subscription>;

    /// Releases a subscription.
    async fn unsubscribe(&self, subscription: Self::Subscription);
}
