//! # Extrinsic Submission Engine
//!
//! This library submits signed extrinsics to a Substrate based chain, follows their
//! status until a terminal outcome, and extracts typed domain events from the including
//! block.

/// Configuration module.
///
/// Command line and environment arguments for the node connection and the inclusion
/// policy.
pub mod config;

/// Thin bindings for creditcoin extrinsics built on the engine.
pub mod creditcoin;

/// Dispatch error module.
///
/// Turns the runtime's dispatch errors into readable pallet and error names.
pub mod dispatch;

/// Error handling module.
///
/// Defines the structured `snafu` error type shared by every stage of a submission.
pub mod error;

/// Event extraction module.
///
/// Finds expected events in an included extrinsic and decodes their fields.
pub mod extract;

/// The seam between the engine and a concrete node connection.
pub mod node_client;

/// Awaitable single-result adapter over the submission watcher.
pub mod outcome;

/// Status notifications as seen by the engine.
pub mod status;

/// Tx progress module.
///
/// Watches a submitted extrinsic and reports exactly one terminal outcome.
pub mod tx_progress;

/// Transaction submission module.
///
/// A `subxt` backed node client that signs, submits and watches extrinsics.
pub mod tx_submitter;

#[cfg(test)]
mod mock;

pub use config::{InclusionPolicy, NodeArgs, SubmissionArgs};
pub use error::{Error, Result};
pub use extract::{ExtractionSet, ExtractionSpec};
pub use node_client::NodeClient;
pub use outcome::{sign_submit_and_await, submit_and_await};
pub use status::{BlockInclusion, LedgerEvent, StatusNotification};
pub use tx_progress::{submit, SubmissionHandle};
pub use tx_submitter::SubxtNodeClient;
