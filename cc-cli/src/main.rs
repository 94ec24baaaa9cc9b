//! Command line bindings for submitting creditcoin extrinsics and printing the events
//! they produced.
use std::process;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Error};
use clap::{Parser, Subcommand};
use log::error;
use subxt::utils::AccountId32;
use subxt_signer::sr25519::Keypair;
use subxt_signer::SecretUri;
use tx_engine::creditcoin::{self, DealOrderId, RewardDestination, TransferId};
use tx_engine::{NodeArgs, SubmissionArgs, SubxtNodeClient};

/// CLI entrypoint
#[derive(Parser, Debug)]
#[command(
    name = "cc-cli",
    version,
    about = "Submit creditcoin extrinsics and print their events"
)]
struct Cli {
    /// Node connection
    #[command(flatten)]
    node: NodeArgs,

    /// Inclusion policy
    #[command(flatten)]
    submission: SubmissionArgs,

    /// Secret URI of the signing account (e.g. //Alice or a mnemonic)
    #[arg(long, env = "CC_SECRET_URI")]
    secret_uri: String,

    /// What to submit
    #[command(subcommand)]
    command: Commands,
}

/// Supported extrinsics
#[derive(Subcommand, Debug)]
enum Commands {
    /// Transfer funds to another account
    Send {
        /// SS58 address of the recipient
        #[arg(long)]
        to: String,

        /// Amount in the smallest unit
        #[arg(long)]
        amount: u128,
    },

    /// Bond funds for staking
    Bond {
        /// Amount in the smallest unit
        #[arg(long)]
        amount: u128,

        /// Where staking rewards are paid
        #[arg(
            long,
            value_enum,
            ignore_case = true,
            default_value_t = RewardDestination::Staked
        )]
        reward_destination: RewardDestination,

        /// SS58 address of the controller, defaults to the signer
        #[arg(long)]
        controller: Option<String>,

        /// Add to an existing bond instead of creating one
        #[arg(long)]
        extra: bool,
    },

    /// Fund a deal order with a registered transfer
    FundDealOrder {
        /// Expiration block of the deal order
        #[arg(long)]
        expiration_block: u32,

        /// Hash of the deal order (0x-prefixed)
        #[arg(long, value_parser = parse_hash)]
        deal_order_hash: [u8; 32],

        /// Id of the registered transfer (0x-prefixed)
        #[arg(long, value_parser = parse_hash)]
        transfer_id: [u8; 32],
    },
}

/// Parses a 32 byte hex string, with or without a `0x` prefix.
fn parse_hash(value: &str) -> Result<[u8; 32], Error> {
    let bytes = hex::decode(value.trim_start_matches("0x"))?;
    <[u8; 32]>::try_from(bytes.as_slice())
        .map_err(|_| anyhow!("expected 32 bytes, got {}", bytes.len()))
}

/// Parses an SS58 address.
fn parse_account(value: &str) -> Result<AccountId32, Error> {
    AccountId32::from_str(value).map_err(|e| anyhow!("invalid address {value}: {e}"))
}

/// Submits the requested extrinsic and prints its outcome.
async fn run(cli: Cli) -> Result<(), Error> {
    let signer = Keypair::from_uri(&SecretUri::from_str(&cli.secret_uri)?)?;
    let client = Arc::new(SubxtNodeClient::connect(&cli.node.rpc_url).await?);
    let policy = cli.submission.inclusion_policy;

    match cli.command {
        Commands::Send { to, amount } => {
            let dest = parse_account(&to)?;
            let transfer = creditcoin::transfer(&client, &dest, amount, &signer, policy).await?;
            println!(
                "Transferred {} from {} to {}",
                transfer.amount, transfer.from, transfer.to
            );
        }
        Commands::Bond {
            amount,
            reward_destination,
            controller,
            extra,
        } => {
            let bonded = if extra {
                creditcoin::bond_extra(&client, amount, &signer, policy).await?
            } else {
                let controller = match controller {
                    Some(address) => parse_account(&address)?,
                    None => AccountId32::from(signer.public_key().0),
                };
                creditcoin::bond(
                    &client,
                    &controller,
                    amount,
                    reward_destination,
                    &signer,
                    policy,
                )
                .await?
            };
            println!("Bonded {} from {}", bonded.amount, bonded.stash);
        }
        Commands::FundDealOrder {
            expiration_block,
            deal_order_hash,
            transfer_id,
        } => {
            let deal_order_id = DealOrderId {
                expiration_block,
                hash: deal_order_hash,
            };
            let outcome = creditcoin::fund_deal_order(
                &client,
                deal_order_id,
                TransferId(transfer_id),
                &signer,
                policy,
            )
            .await?;
            println!(
                "Funded deal order {} with transfer {}",
                outcome.deal_order.deal_order_id, outcome.transfer.transfer_id
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("❌ {e}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn we_can_parse_hashes_with_and_without_prefix() {
        let hex = "ab".repeat(32);
        assert_eq!(parse_hash(&hex).unwrap(), [0xab; 32]);
        assert_eq!(parse_hash(&format!("0x{hex}")).unwrap(), [0xab; 32]);
    }

    #[test]
    fn we_cannot_parse_short_hashes() {
        assert!(parse_hash("0xabcd").is_err());
        assert!(parse_hash("0xzz").is_err());
    }

    #[test]
    fn we_can_parse_a_bond_command() {
        let cli = Cli::try_parse_from([
            "cc-cli",
            "--secret-uri",
            "//Alice",
            "bond",
            "--amount",
            "1000",
            "--reward-destination",
            "STASH",
        ])
        .unwrap();

        match cli.command {
            Commands::Bond {
                amount,
                reward_destination,
                controller,
                extra,
            } => {
                assert_eq!(amount, 1000);
                assert_eq!(reward_destination, RewardDestination::Stash);
                assert!(controller.is_none());
                assert!(!extra);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn we_can_parse_a_fund_deal_order_command() {
        let hash = format!("0x{}", "01".repeat(32));
        let cli = Cli::try_parse_from([
            "cc-cli",
            "--secret-uri",
            "//Alice",
            "--inclusion-policy",
            "finalized",
            "fund-deal-order",
            "--expiration-block",
            "100",
            "--deal-order-hash",
            hash.as_str(),
            "--transfer-id",
            hash.as_str(),
        ])
        .unwrap();

        assert_eq!(
            cli.submission.inclusion_policy,
            tx_engine::InclusionPolicy::Finalized
        );
        assert!(matches!(
            cli.command,
            Commands::FundDealOrder {
                expiration_block: 100,
                ..
            }
        ));
    }
}
