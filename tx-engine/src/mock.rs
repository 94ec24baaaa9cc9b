//! Channel backed node client used by the unit tests.
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use subxt::utils::H256;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::node_client::NodeClient;
use crate::status::StatusNotification;

/// Sender side of a scripted status subscription.
pub type StatusFeed = mpsc::UnboundedSender<Result<StatusNotification>>;

/// Block hash with every byte set to `n`.
pub fn block(n: u8) -> H256 {
    H256::repeat_byte(n)
}

/// A node client whose subscriptions are fed by the test.
///
/// Every call to [`MockNodeClient::expect_submission`] queues one subscription;
/// submitting with an empty queue fails like a refused connection.
#[derive(Default)]
pub struct MockNodeClient {
    /// Subscriptions waiting to be handed out, in order.
    pending: Mutex<VecDeque<mpsc::UnboundedReceiver<Result<StatusNotification>>>>,
    /// Number of times `unsubscribe` was called.
    unsubscribes: AtomicUsize,
}

impl MockNodeClient {
    /// Queues a subscription and returns the feed that drives it.
    pub fn expect_submission(&self) -> StatusFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }

    /// How many subscriptions have been released.
    pub fn unsubscribe_count(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

/// Subscription handed out by [`MockNodeClient`].
pub struct MockSubscription {
    /// Scripted statuses.
    rx: mpsc::UnboundedReceiver<Result<StatusNotification>>,
}

impl Stream for MockSubscription {
    type Item = Result<StatusNotification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl NodeClient for MockNodeClient {
    type Call = String;
    type Signer = ();
    type Transaction = u32;
    type Subscription = MockSubscription;

    async fn create_signed_transaction(&self, call: &String, _signer: &()) -> Result<u32> {
        Ok(call.len() as u32)
    }

    async fn submit_and_subscribe(&self, _transaction: u32) -> Result<MockSubscription> {
        let rx = self.pending.lock().unwrap().pop_front();
        rx.map(|rx| MockSubscription { rx })
            .ok_or_else(|| Error::Transport {
                source: subxt::Error::Other("connection refused".into()),
            })
    }

    async fn unsubscribe(&self, subscription: MockSubscription) {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        drop(subscription);
    }
}
