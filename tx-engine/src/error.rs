use core::fmt;

use snafu::Snafu;

use crate::dispatch::DispatchFailure;

/// Represents every way a single extrinsic submission can fail, from the transport
/// up to decoding the events of an otherwise successful block.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Error when attempting to connect to the node.
    #[snafu(display("Error connecting to chain at {url}: {source}"))]
    ChainConnection {
        /// The RPC url that was dialed.
        url: String,
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node client could not build or sign the extrinsic.
    #[snafu(display("Error creating signed extrinsic: {source}"))]
    CreateTransaction {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The subscription could not be opened, or the status stream reported an error.
    ///
    /// When the subscribe call itself rejects there is no subscription to release.
    #[snafu(display("Error watching extrinsic status: {source}"))]
    Transport {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// Error when fetching the events of the including block.
    #[snafu(display("Error fetching extrinsic events: {source}"))]
    FetchEvents {
        /// The underlying error from the `subxt` library.
        source: subxt::Error,
    },

    /// The node reported a terminal status that will never lead to inclusion.
    #[snafu(display(
        "Extrinsic reached terminal status {status}{}",
        message.as_ref().map(|m| format!(": {m}")).unwrap_or_default()
    ))]
    Lifecycle {
        /// The terminal status variant that was observed.
        status: LifecycleStatus,
        /// Extra detail supplied by the node, if any.
        message: Option<String>,
    },

    /// The extrinsic was included in a block but the runtime rejected it.
    #[snafu(display("Extrinsic dispatch failed: {source}"))]
    Dispatch {
        /// The decoded dispatch error.
        source: DispatchFailure,
    },

    /// The block was successful but did not contain the expected event.
    #[snafu(display("Expected event {pallet}.{event} was not found in the block"))]
    EventNotFound {
        /// Pallet the event was expected from.
        pallet: String,
        /// Name of the expected event.
        event: String,
    },

    /// The expected event was found but its fields could not be decoded.
    #[snafu(display("Failed to decode event {pallet}.{event}: {source}"))]
    Decode {
        /// Pallet of the offending event.
        pallet: String,
        /// Name of the offending event.
        event: String,
        /// The decoder's own error.
        source: DecodeError,
    },

    /// The watcher task ended without ever reporting an outcome.
    #[snafu(display("Submission watcher stopped before reporting an outcome"))]
    WatcherDropped,
}

/// Terminal statuses that carry no dispatch data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    /// The extrinsic is invalid for the current chain state.
    Invalid,
    /// The extrinsic was dropped from the pool.
    Dropped,
    /// Another extrinsic with the same sender and nonce replaced this one.
    Usurped,
    /// The including block was not finalized within the node's timeout.
    FinalityTimeout,
    /// The node closed the subscription without a terminal status.
    SubscriptionClosed,
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleStatus::Invalid => "Invalid",
            LifecycleStatus::Dropped => "Dropped",
            LifecycleStatus::Usurped => "Usurped",
            LifecycleStatus::FinalityTimeout => "FinalityTimeout",
            LifecycleStatus::SubscriptionClosed => "SubscriptionClosed",
        };
        f.write_str(name)
    }
}

/// Errors produced by event decoders.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DecodeError {
    /// The raw field bytes are not a valid SCALE encoding of the target type.
    #[snafu(display("invalid SCALE encoding: {source}"))]
    Scale {
        /// The underlying codec error.
        source: codec::Error,
    },

    /// The target type decoded but bytes were left over.
    #[snafu(display("{remaining} trailing bytes after decoding"))]
    TrailingBytes {
        /// Number of bytes that were not consumed.
        remaining: usize,
    },

    /// The fields decoded but do not have the expected shape.
    #[snafu(display("unexpected event shape: {reason}"))]
    Unexpected {
        /// Description of the mismatch.
        reason: String,
    },
}

/// Type alias for results that return a `Result<T, Error>`, simplifying error handling.
pub type Result<T, E = Error> = std::result::Result<T, E>;
