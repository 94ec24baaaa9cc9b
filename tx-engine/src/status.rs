//! Status notifications emitted by the node while an extrinsic is being watched.
use subxt::utils::H256;

use crate::dispatch::DispatchFailure;
use crate::error::LifecycleStatus;

/// One entry of a block's event list, with its fields still SCALE encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEvent {
    /// Name of the pallet that emitted the event.
    pub pallet: String,
    /// Name of the event variant.
    pub event: String,
    /// SCALE encoded event fields.
    pub fields: Vec<u8>,
}

impl LedgerEvent {
    /// Creates a new event entry.
    pub fn new(pallet: impl Into<String>, event: impl Into<String>, fields: Vec<u8>) -> Self {
        Self {
            pallet: pallet.into(),
            event: event.into(),
            fields,
        }
    }

    /// Whether this event has the given (pallet, event) tag.
    pub fn is(&self, pallet: &str, event: &str) -> bool {
        self.pallet == pallet && self.event == event
    }
}

/// Inclusion of the watched extrinsic in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInclusion {
    /// Hash of the including block.
    pub block_hash: H256,
    /// Events emitted while dispatching the extrinsic, in order.
    pub events: Vec<LedgerEvent>,
    /// Set when the runtime rejected the extrinsic.
    pub dispatch_error: Option<DispatchFailure>,
}

impl BlockInclusion {
    /// Inclusion with a clean dispatch outcome.
    pub fn success(block_hash: H256, events: Vec<LedgerEvent>) -> Self {
        Self {
            block_hash,
            events,
            dispatch_error: None,
        }
    }

    /// Inclusion whose dispatch was rejected.
    pub fn failed(block_hash: H256, dispatch_error: DispatchFailure) -> Self {
        Self {
            block_hash,
            events: Vec::new(),
            dispatch_error: Some(dispatch_error),
        }
    }
}

/// A status update for one submitted extrinsic.
///
/// Not every variant occurs for every submission, and which ones a node emits
/// depends on the RPC flavour it speaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusNotification {
    /// Waiting in the pool for an earlier nonce.
    Future,
    /// Validated and ready to be included.
    Ready,
    /// Gossiped to peers.
    Broadcast {
        /// Number of peers the extrinsic was sent to, when known.
        num_peers: Option<u32>,
    },
    /// The block that included the extrinsic is no longer the best block.
    Retracted,
    /// Included in a (best) block.
    InBlock(BlockInclusion),
    /// Included in a finalized block.
    Finalized(BlockInclusion),
    /// Invalid for the current chain state.
    Invalid {
        /// Reason given by the node.
        message: Option<String>,
    },
    /// Dropped from the pool.
    Dropped {
        /// Reason given by the node.
        message: Option<String>,
    },
    /// Replaced by another extrinsic with the same nonce.
    Usurped,
    /// The including block was not finalized in time.
    FinalityTimeout,
}

impl StatusNotification {
    /// Short name of the variant, used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            StatusNotification::Future => "Future",
            StatusNotification::Ready => "Ready",
            StatusNotification::Broadcast { .. } => "Broadcast",
            StatusNotification::Retracted => "Retracted",
            StatusNotification::InBlock(_) => "InBlock",
            StatusNotification::Finalized(_) => "Finalized",
            StatusNotification::Invalid { .. } => "Invalid",
            StatusNotification::Dropped { .. } => "Dropped",
            StatusNotification::Usurped => "Usurped",
            StatusNotification::FinalityTimeout => "FinalityTimeout",
        }
    }

    /// The lifecycle status for terminal variants that carry no block, with the node's message.
    pub fn lifecycle_failure(&self) -> Option<(LifecycleStatus, Option<String>)> {
        match self {
            StatusNotification::Invalid { message } => {
                Some((LifecycleStatus::Invalid, message.clone()))
            }
            StatusNotification::Dropped { message } => {
                Some((LifecycleStatus::Dropped, message.clone()))
            }
            StatusNotification::Usurped => Some((LifecycleStatus::Usurped, None)),
            StatusNotification::FinalityTimeout => Some((LifecycleStatus::FinalityTimeout, None)),
            _ => None,
        }
    }
}
