use anyhow::Result;
use clap::{Parser, Subcommand};
use client_core::{
    load_settings,
    rewards::{claim_blockers, estimate_reward},
    ContractClient,
};
use serde_json::json;
use shared::domain::AccountName;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "invitono", about = "Inspect and prepare invitono contract interactions")]
struct Args {
    #[arg(long, default_value = "mainnet")]
    network: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Refresh and print invite data, global stats and contract config.
    Status { account: String },
    /// Print a `registeruser` action ready for a wallet to sign.
    Register { account: String, inviter: String },
    /// Print a `claimreward` action ready for a wallet to sign.
    Claim { account: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings(&args.network)?;
    let client = ContractClient::new(&settings)?;

    match args.command {
        Command::Status { account } => {
            let account = AccountName::parse(&account)?;
            client.refresh_all_data(&account).await;

            let invite = client.invite_data().get();
            let config = client.contract_config().get();
            let estimate = invite
                .as_ref()
                .zip(config.as_ref())
                .and_then(|(invite, config)| estimate_reward(invite, config));
            let payload = json!({
                "network": settings.name,
                "contract": client.contract_account(),
                "account": account,
                "inviteData": invite,
                "globalStats": client.global_stats().get(),
                "contractConfig": config,
                "rewardEstimate": estimate,
                "claimBlockers": claim_blockers(invite.as_ref(), config.as_ref()),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Command::Register { account, inviter } => {
            let account = AccountName::parse(&account)?;
            let inviter = AccountName::parse(&inviter)?;
            info!(account = account.as_str(), inviter = inviter.as_str(), "cli: register action");
            let action = client.actions().register(&account, &inviter);
            println!("{}", serde_json::to_string_pretty(&[action])?);
        }
        Command::Claim { account } => {
            let account = AccountName::parse(&account)?;
            info!(account = account.as_str(), "cli: claim action");
            let action = client.actions().claim(&account);
            println!("{}", serde_json::to_string_pretty(&[action])?);
        }
    }

    Ok(())
}
