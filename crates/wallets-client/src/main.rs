use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;
use wallets_client::{ClientError, WalletsClient};
use wallets_contract::Contract;

#[derive(Parser, Debug)]
#[command(name = "wallets-client", about = "Contract-validating client for the Wallets API")]
struct Cli {
    /// API root
    #[arg(long, env = "WALLETS_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// OpenAPI document to validate against (defaults to the embedded one)
    #[arg(long)]
    contract: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a wallet. Omitted fields are left out of the payload.
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "type")]
        wallet_type: Option<String>,
        #[arg(long)]
        colour_code: Option<String>,
    },
    /// Fetch a wallet by id
    Get { id: u64 },
    /// Send one valid and one invalid create request
    Demo,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let contract = Contract::load(cli.contract.as_deref()).context("failed to load OpenAPI contract")?;
    let client = WalletsClient::new(&cli.base_url, Arc::new(contract))?;

    match cli.command {
        Command::Create {
            name,
            wallet_type,
            colour_code,
        } => {
            let mut body = Map::new();
            for (key, value) in [("name", name), ("type", wallet_type), ("colour_code", colour_code)] {
                if let Some(value) = value {
                    body.insert(key.to_string(), Value::String(value));
                }
            }
            post(&client, Value::Object(body)).await?;
        }
        Command::Get { id } => match client.get_wallet(id).await {
            Ok(wallet) => println!("{}", serde_json::to_string_pretty(&wallet)?),
            Err(ClientError::NotFound(id)) => println!("wallet {} not found", id),
            Err(e) => return Err(e.into()),
        },
        Command::Demo => {
            post(&client, json!({"name": "test", "type": "Event", "colour_code": "Green"})).await?;
            post(&client, json!({"name": "test", "body": "test", "description": "Yellow"})).await?;
        }
    }

    Ok(())
}

/// Prints the response status, or the local rejection when the contract
/// refused the request.
async fn post(client: &WalletsClient, body: Value) -> anyhow::Result<()> {
    match client.send(Method::POST, "/wallets", Some(&body)).await {
        Ok(response) => println!("{}", response.status().as_u16()),
        Err(ClientError::Validation(failure)) => {
            eprintln!("request rejected before sending:");
            eprintln!("{}", serde_json::to_string_pretty(&failure)?);
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
