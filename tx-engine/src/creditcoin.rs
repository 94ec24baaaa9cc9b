//! Bindings for the creditcoin extrinsics used by the CLI.
//!
//! Each binding builds a dynamic call, signs and submits it, and extracts the events that
//! describe its effect into a named outcome type.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use clap::ValueEnum;
use codec::{Decode, Encode};
use subxt::dynamic::Value;
use subxt::tx::DynamicPayload;
use subxt::utils::AccountId32;
use subxt_signer::sr25519::Keypair;

use crate::config::InclusionPolicy;
use crate::error::Result;
use crate::extract::{decode_scale, DecoderRegistry, ExtractionSpec};
use crate::node_client::NodeClient;
use crate::outcome::sign_submit_and_await;

/// Identifier of a deal order: its expiration block and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct DealOrderId {
    /// Block number at which the order expires.
    pub expiration_block: u32,
    /// Hash of the order.
    pub hash: [u8; 32],
}

impl fmt::Display for DealOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/0x{}", self.expiration_block, hex::encode(self.hash))
    }
}

/// Identifier of a registered external transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct TransferId(pub [u8; 32]);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// `Creditcoin.DealOrderFunded`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct DealOrderFunded {
    /// The funded deal order.
    pub deal_order_id: DealOrderId,
}

/// `Creditcoin.TransferProcessed`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct TransferProcessed {
    /// The transfer that was marked as part of a loan.
    pub transfer_id: TransferId,
}

/// `Staking.Bonded`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Bonded {
    /// The stash account that bonded.
    pub stash: AccountId32,
    /// Amount bonded, in the smallest unit.
    pub amount: u128,
}

/// `Balances.Transfer`
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Transfer {
    /// Sender.
    pub from: AccountId32,
    /// Recipient.
    pub to: AccountId32,
    /// Amount sent, in the smallest unit.
    pub amount: u128,
}

/// Spec for `Creditcoin.DealOrderFunded`.
pub const DEAL_ORDER_FUNDED: ExtractionSpec<DealOrderFunded> =
    ExtractionSpec::scale("Creditcoin", "DealOrderFunded");
/// Spec for `Creditcoin.TransferProcessed`.
pub const TRANSFER_PROCESSED: ExtractionSpec<TransferProcessed> =
    ExtractionSpec::scale("Creditcoin", "TransferProcessed");
/// Spec for `Staking.Bonded`.
pub const BONDED: ExtractionSpec<Bonded> = ExtractionSpec::scale("Staking", "Bonded");
/// Spec for `Balances.Transfer`.
pub const TRANSFER: ExtractionSpec<Transfer> = ExtractionSpec::scale("Balances", "Transfer");

/// Every event the bindings know how to decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditcoinEvent {
    /// See [`DealOrderFunded`].
    DealOrderFunded(DealOrderFunded),
    /// See [`TransferProcessed`].
    TransferProcessed(TransferProcessed),
    /// See [`Bonded`].
    Bonded(Bonded),
    /// See [`Transfer`].
    Transfer(Transfer),
}

/// Registry of decoders for [`CreditcoinEvent`].
pub fn creditcoin_events() -> DecoderRegistry<CreditcoinEvent> {
    DecoderRegistry::new()
        .register(DEAL_ORDER_FUNDED.pallet, DEAL_ORDER_FUNDED.event, |bytes| {
            decode_scale(bytes).map(CreditcoinEvent::DealOrderFunded)
        })
        .register(TRANSFER_PROCESSED.pallet, TRANSFER_PROCESSED.event, |bytes| {
            decode_scale(bytes).map(CreditcoinEvent::TransferProcessed)
        })
        .register(BONDED.pallet, BONDED.event, |bytes| {
            decode_scale(bytes).map(CreditcoinEvent::Bonded)
        })
        .register(TRANSFER.pallet, TRANSFER.event, |bytes| {
            decode_scale(bytes).map(CreditcoinEvent::Transfer)
        })
}

/// The two effects of funding a deal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealOrderFundedOutcome {
    /// The deal order that is now funded.
    pub deal_order: DealOrderFunded,
    /// The transfer consumed by the funding.
    pub transfer: TransferProcessed,
}

/// Where staking rewards are paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RewardDestination {
    /// Paid into the stash and added to the bond.
    Staked,
    /// Paid into the stash, not bonded.
    Stash,
    /// Paid into the controller account.
    Controller,
}

impl RewardDestination {
    /// Runtime variant name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RewardDestination::Staked => "Staked",
            RewardDestination::Stash => "Stash",
            RewardDestination::Controller => "Controller",
        }
    }
}

impl FromStr for RewardDestination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| {
            "Invalid reward destination, must be one of 'Staked', 'Stash', or 'Controller'"
                .to_string()
        })
    }
}

/// `MultiAddress::Id` for `account`.
fn multi_address(account: &AccountId32) -> Value {
    Value::unnamed_variant("Id", [Value::from_bytes(account.0)])
}

/// `Creditcoin.fund_deal_order(deal_order_id, transfer_id)`
pub fn fund_deal_order_call(
    deal_order_id: DealOrderId,
    transfer_id: TransferId,
) -> DynamicPayload {
    subxt::dynamic::tx(
        "Creditcoin",
        "fund_deal_order",
        vec![
            Value::unnamed_composite([
                Value::u128(deal_order_id.expiration_block.into()),
                Value::from_bytes(deal_order_id.hash),
            ]),
            Value::from_bytes(transfer_id.0),
        ],
    )
}

/// `Staking.bond(controller, value, payee)`
pub fn bond_call(
    controller: &AccountId32,
    amount: u128,
    reward_destination: RewardDestination,
) -> DynamicPayload {
    subxt::dynamic::tx(
        "Staking",
        "bond",
        vec![
            multi_address(controller),
            Value::u128(amount),
            Value::unnamed_variant(reward_destination.as_str(), Vec::<Value>::new()),
        ],
    )
}

/// `Staking.bond_extra(max_additional)`
pub fn bond_extra_call(amount: u128) -> DynamicPayload {
    subxt::dynamic::tx("Staking", "bond_extra", vec![Value::u128(amount)])
}

/// `Balances.transfer(dest, value)`
pub fn transfer_call(dest: &AccountId32, amount: u128) -> DynamicPayload {
    subxt::dynamic::tx(
        "Balances",
        "transfer",
        vec![multi_address(dest), Value::u128(amount)],
    )
}

/// Funds a deal order with a registered transfer, signed by the lender.
pub async fn fund_deal_order<C>(
    client: &Arc<C>,
    deal_order_id: DealOrderId,
    transfer_id: TransferId,
    lender: &Keypair,
    policy: InclusionPolicy,
) -> Result<DealOrderFundedOutcome>
where
    C: NodeClient<Call = DynamicPayload, Signer = Keypair> + 'static,
{
    let call = fund_deal_order_call(deal_order_id, transfer_id);
    let (deal_order, transfer) = sign_submit_and_await(
        client,
        &call,
        lender,
        policy,
        (DEAL_ORDER_FUNDED, TRANSFER_PROCESSED),
    )
    .await?;

    Ok(DealOrderFundedOutcome {
        deal_order,
        transfer,
    })
}

/// Bonds `amount` from the stash account of `stash`.
pub async fn bond<C>(
    client: &Arc<C>,
    controller: &AccountId32,
    amount: u128,
    reward_destination: RewardDestination,
    stash: &Keypair,
    policy: InclusionPolicy,
) -> Result<Bonded>
where
    C: NodeClient<Call = DynamicPayload, Signer = Keypair> + 'static,
{
    let call = bond_call(controller, amount, reward_destination);
    sign_submit_and_await(client, &call, stash, policy, BONDED).await
}

/// Adds `amount` to an existing bond.
pub async fn bond_extra<C>(
    client: &Arc<C>,
    amount: u128,
    stash: &Keypair,
    policy: InclusionPolicy,
) -> Result<Bonded>
where
    C: NodeClient<Call = DynamicPayload, Signer = Keypair> + 'static,
{
    sign_submit_and_await(client, &bond_extra_call(amount), stash, policy, BONDED).await
}

/// Sends `amount` to `dest`.
pub async fn transfer<C>(
    client: &Arc<C>,
    dest: &AccountId32,
    amount: u128,
    sender: &Keypair,
    policy: InclusionPolicy,
) -> Result<Transfer>
where
    C: NodeClient<Call = DynamicPayload, Signer = Keypair> + 'static,
{
    let call = transfer_call(dest, amount);
    sign_submit_and_await(client, &call, sender, policy, TRANSFER).await
}
